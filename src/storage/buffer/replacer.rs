use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::{AccessType, FrameId, Replacer};

#[derive(Debug, Eq, PartialEq)]
struct KDistance {
    frame_id: FrameId,
    /// True when the frame has fewer than k recorded accesses.
    infinite: bool,
    distance: usize,
}

impl PartialOrd for KDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KDistance {
    // Best victim first: the infinite class before any finite distance,
    // larger distances before smaller, lowest frame id on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .infinite
            .cmp(&self.infinite)
            .then(other.distance.cmp(&self.distance))
            .then(self.frame_id.cmp(&other.frame_id))
    }
}

struct LRUKNode {
    k: usize,
    frame_id: FrameId,
    is_evictable: bool,
    /// Up to the last k access timestamps, oldest at the front.
    history: VecDeque<usize>,
}

impl LRUKNode {
    fn new(frame_id: FrameId, k: usize) -> Self {
        assert!(k > 0, "replacer k must be larger than zero");
        LRUKNode { history: VecDeque::with_capacity(k), k, frame_id, is_evictable: true }
    }

    fn record_access(&mut self, timestamp: usize) {
        if self.history.len() == self.k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp)
    }

    fn k_distance(&self, now: usize) -> KDistance {
        // The front of the history is the k-th most recent access once k
        // accesses exist, and the earliest access before that.
        let oldest = self.history.front().copied().unwrap_or(0);
        KDistance {
            frame_id: self.frame_id,
            infinite: self.history.len() < self.k,
            distance: now - oldest,
        }
    }
}

/// LRUKReplacer implements the LRU-k replacement policy.
///
/// The LRU-k algorithm evicts the frame whose backward k-distance is the
/// maximum over all evictable frames. Backward k-distance is computed as
/// the difference between the current timestamp and the timestamp of the
/// k-th previous access.
///
/// A frame with fewer than k recorded accesses is given +inf as its
/// backward k-distance and is preferred over any fully-observed frame;
/// among those, the one whose earliest access is oldest goes first.
pub struct LRUKReplacer {
    nodes: HashMap<FrameId, LRUKNode>,
    current_timestamp: usize,
    curr_size: usize,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        LRUKReplacer {
            nodes: HashMap::new(),
            current_timestamp: 0,
            curr_size: 0,
            replacer_size: num_frames,
            k,
        }
    }

    fn record_access(&mut self, frame_id: FrameId) {
        if !self.nodes.contains_key(&frame_id) && self.nodes.len() >= self.replacer_size {
            panic!("lru-k replacer is full: cannot track frame {}", frame_id);
        }
        let node = self.nodes.entry(frame_id).or_insert_with(|| {
            // New frames start evictable; the pool pins them right after
            // recording the first access.
            self.curr_size += 1;
            LRUKNode::new(frame_id, self.k)
        });
        node.record_access(self.current_timestamp);
        self.current_timestamp += 1;
    }

    fn evict(&mut self) -> Option<FrameId> {
        let mut distances = vec![];
        for node in self.nodes.values() {
            if !node.is_evictable {
                continue;
            }
            distances.push(node.k_distance(self.current_timestamp));
        }
        distances.sort();

        let victim = distances.first()?.frame_id;
        self.nodes.remove(&victim);
        self.curr_size -= 1;
        Some(victim)
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let node = match self.nodes.get_mut(&frame_id) {
            Some(node) => node,
            None => return,
        };
        if node.is_evictable == evictable {
            return;
        }
        node.is_evictable = evictable;
        if evictable {
            self.curr_size += 1;
        } else {
            self.curr_size -= 1;
        }
    }

    fn is_evictable(&self, frame_id: FrameId) -> bool {
        match self.nodes.get(&frame_id) {
            Some(node) => node.is_evictable,
            None => true,
        }
    }

    fn remove(&mut self, frame_id: FrameId) {
        match self.nodes.get(&frame_id) {
            Some(node) if node.is_evictable => {
                self.nodes.remove(&frame_id);
                self.curr_size -= 1;
            }
            _ => {}
        }
    }

    fn size(&self) -> usize {
        self.curr_size
    }
}

/// SyncLRUKReplacer is the thread-safe version of the LRU-k replacement
/// policy; all the heavy lifting happens in the LRUKReplacer.
pub struct SyncLRUKReplacer {
    inner: Mutex<LRUKReplacer>,
}

impl SyncLRUKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        SyncLRUKReplacer { inner: Mutex::new(LRUKReplacer::new(num_frames, k)) }
    }
}

impl Replacer for SyncLRUKReplacer {
    fn record_access(&self, frame_id: FrameId, _access_type: AccessType) {
        self.inner.lock().record_access(frame_id)
    }

    fn evict(&self) -> Option<FrameId> {
        self.inner.lock().evict()
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.inner.lock().set_evictable(frame_id, evictable)
    }

    fn is_evictable(&self, frame_id: FrameId) -> bool {
        self.inner.lock().is_evictable(frame_id)
    }

    fn remove(&self, frame_id: FrameId) {
        self.inner.lock().remove(frame_id)
    }

    fn size(&self) -> usize {
        self.inner.lock().size()
    }
}
