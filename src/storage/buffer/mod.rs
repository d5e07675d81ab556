pub mod bufferpool;
pub mod guard;
pub mod replacer;

/// Index of a frame slot in the buffer pool's page array.
pub type FrameId = usize;

/// How a page access was made. The LRU-K policy currently treats all access
/// types alike; the parameter rides along for future policy hooks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AccessType {
    #[default]
    Unknown,
    Lookup,
    Scan,
    Index,
}

/// Replacer tracks page usage for replacement in case the buffer pool is
/// full. Implementations latch internally; the buffer pool calls through a
/// shared reference.
pub trait Replacer: Send + Sync {
    /// Record the event that the given frame id is accessed at the current
    /// timestamp. Create a new entry for access history if the frame id has
    /// not been seen before.
    fn record_access(&self, frame_id: FrameId, access_type: AccessType);

    /// Find the frame to evict under the replacement policy. Only frames
    /// that are marked as evictable are candidates for eviction.
    ///
    /// Successful eviction of a frame decrements the size of the replacer
    /// and removes the frame's access history.
    ///
    /// Return the frame id if a frame is evicted successfully, None if no
    /// frame can be evicted.
    fn evict(&self) -> Option<FrameId>;

    /// Toggle whether a frame is evictable or non-evictable. This function
    /// also controls the replacer's size: size equals the number of
    /// evictable entries, so flipping the flag adjusts it by one. A no-op
    /// if the frame is not tracked or the flag does not change.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Check if a frame is evictable. If the frame is not found, return true.
    fn is_evictable(&self, frame_id: FrameId) -> bool;

    /// Remove an evictable frame from the replacer, along with its access
    /// history, decrementing the size. Unlike evict, this removes a caller-
    /// chosen frame regardless of its backward k-distance.
    ///
    /// A no-op if the frame is not found or is not evictable; callers must
    /// make sure the frame is evictable before removing it.
    fn remove(&self, frame_id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}
