use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Values are type-erased and shared between trie versions; `get` recovers
/// the concrete type at runtime.
type Value = Arc<dyn Any + Send + Sync>;

/// A node of the copy-on-write trie. Nodes are immutable once published:
/// mutating operations clone the nodes on the path they touch and share
/// everything else with the previous version.
#[derive(Clone, Default)]
struct TrieNode {
    /// Children keyed by the next key byte, in byte order.
    children: BTreeMap<u8, Arc<TrieNode>>,
    value: Option<Value>,
}

/// An immutable ordered map from byte-string keys to shared values. Every
/// mutating operation returns a new trie; existing versions are never
/// changed, so concurrent readers of different versions need no
/// coordination. Cloning a trie is O(1).
///
/// A node with neither value nor children is never reachable: `remove`
/// prunes such nodes bottom-up, and removing the last key leaves a trie
/// with no root at all.
#[derive(Clone, Default)]
pub struct Trie {
    root: Option<Arc<TrieNode>>,
}

impl Trie {
    /// An empty trie.
    pub fn new() -> Trie {
        Trie { root: None }
    }

    /// Look up the value stored at `key`. Returns None if no node exists at
    /// the key, the node stores no value, or the stored value is not a `T`.
    pub fn get<T: Any>(&self, key: &[u8]) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        for unit in key {
            node = node.children.get(unit)?.as_ref();
        }
        node.value.as_ref()?.downcast_ref::<T>()
    }

    /// Store `value` at `key`, returning the new trie. The value may be
    /// non-copyable: ownership moves into the trie and is shared by every
    /// version containing it from then on. An empty key stores the value at
    /// the root, keeping the root's children.
    pub fn put<T: Any + Send + Sync>(&self, key: &[u8], value: T) -> Trie {
        let root = put_node(self.root.as_deref(), key, Arc::new(value));
        Trie { root: Some(Arc::new(root)) }
    }

    /// Remove the value at `key`, returning the new trie. If the key holds
    /// no value the trie is returned unchanged. Nodes left with neither
    /// value nor children are pruned bottom-up along the key's path.
    pub fn remove(&self, key: &[u8]) -> Trie {
        let root = match &self.root {
            Some(root) => root,
            None => return self.clone(),
        };
        match remove_node(root, key) {
            // Key absent: the new version is the old one.
            None => self.clone(),
            Some(root) => Trie { root },
        }
    }
}

/// Rebuild the path from `node` along `key`, ending in a node carrying
/// `value`. Untouched children are shared with the source node.
fn put_node(node: Option<&TrieNode>, key: &[u8], value: Value) -> TrieNode {
    match key.split_first() {
        None => TrieNode {
            children: node.map(|n| n.children.clone()).unwrap_or_default(),
            value: Some(value),
        },
        Some((unit, rest)) => {
            let mut next = node.cloned().unwrap_or_default();
            let child = put_node(next.children.get(unit).map(Arc::as_ref), rest, value);
            next.children.insert(*unit, Arc::new(child));
            next
        }
    }
}

/// Remove the value at `key` below `node`. The outer Option distinguishes
/// "key absent, nothing to do" (None); the inner one is the replacement
/// node, or None when the subtree pruned away entirely.
fn remove_node(node: &TrieNode, key: &[u8]) -> Option<Option<Arc<TrieNode>>> {
    match key.split_first() {
        None => {
            node.value.as_ref()?;
            if node.children.is_empty() {
                Some(None)
            } else {
                Some(Some(Arc::new(TrieNode { children: node.children.clone(), value: None })))
            }
        }
        Some((unit, rest)) => {
            let child = node.children.get(unit)?;
            let replacement = remove_node(child, rest)?;
            let mut next = node.clone();
            match replacement {
                Some(child) => {
                    next.children.insert(*unit, child);
                }
                None => {
                    next.children.remove(unit);
                }
            }
            if next.children.is_empty() && next.value.is_none() {
                Some(None)
            } else {
                Some(Some(Arc::new(next)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_put_basic() {
        let trie = Trie::new().put(b"hello", 42u32);
        assert_eq!(Some(&42), trie.get::<u32>(b"hello"));

        // Neither a prefix of the key nor an extension of it is present.
        assert_eq!(None, trie.get::<u32>(b"hell"));
        assert_eq!(None, trie.get::<u32>(b"helloo"));
        assert_eq!(None, trie.get::<u32>(b""));
    }

    #[test]
    fn test_get_type_mismatch_is_absent() {
        let trie = Trie::new().put(b"key", 7u32);
        assert_eq!(None, trie.get::<u64>(b"key"));
        assert_eq!(None, trie.get::<String>(b"key"));
        assert_eq!(Some(&7), trie.get::<u32>(b"key"));
    }

    #[test]
    fn test_put_is_persistent() {
        let t0 = Trie::new();
        let t1 = t0.put(b"a", 1u32);
        let t2 = t1.put(b"b", 2u32);

        // Older versions are unchanged by later puts.
        assert_eq!(None, t0.get::<u32>(b"a"));
        assert_eq!(Some(&1), t1.get::<u32>(b"a"));
        assert_eq!(None, t1.get::<u32>(b"b"));
        assert_eq!(Some(&1), t2.get::<u32>(b"a"));
        assert_eq!(Some(&2), t2.get::<u32>(b"b"));
    }

    #[test]
    fn test_put_overwrites_value() {
        let trie = Trie::new().put(b"k", 1u32).put(b"k", 2u32);
        assert_eq!(Some(&2), trie.get::<u32>(b"k"));

        // Overwriting keeps the children of the old node.
        let trie = Trie::new().put(b"ab", 1u32).put(b"a", 2u32).put(b"a", 3u32);
        assert_eq!(Some(&3), trie.get::<u32>(b"a"));
        assert_eq!(Some(&1), trie.get::<u32>(b"ab"));
    }

    #[test]
    fn test_empty_key() {
        let trie = Trie::new().put(b"", 7u32);
        assert_eq!(Some(&7), trie.get::<u32>(b""));

        // A root value coexists with ordinary keys.
        let trie = trie.put(b"x", 8u32);
        assert_eq!(Some(&7), trie.get::<u32>(b""));
        assert_eq!(Some(&8), trie.get::<u32>(b"x"));

        let trie = trie.remove(b"");
        assert_eq!(None, trie.get::<u32>(b""));
        assert_eq!(Some(&8), trie.get::<u32>(b"x"));
    }

    #[test]
    fn test_non_copyable_value() {
        let trie = Trie::new().put(b"boxed", Box::new(9u32));
        assert_eq!(Some(&Box::new(9u32)), trie.get::<Box<u32>>(b"boxed"));
    }

    #[test]
    fn test_heterogeneous_values() {
        let trie = Trie::new().put(b"int", 5u64).put(b"str", "five".to_string());
        assert_eq!(Some(&5), trie.get::<u64>(b"int"));
        assert_eq!(Some(&"five".to_string()), trie.get::<String>(b"str"));
    }

    #[test]
    fn test_remove_basic() {
        let trie = Trie::new().put(b"a", 1u32).put(b"b", 2u32);

        let removed = trie.remove(b"a");
        assert_eq!(None, removed.get::<u32>(b"a"));
        assert_eq!(Some(&2), removed.get::<u32>(b"b"));

        // The source version still holds both keys.
        assert_eq!(Some(&1), trie.get::<u32>(b"a"));
        assert_eq!(Some(&2), trie.get::<u32>(b"b"));
    }

    #[test]
    fn test_remove_absent_key_is_identity() {
        let trie = Trie::new().put(b"abc", 1u32);
        let same = trie.remove(b"abd");
        assert!(Arc::ptr_eq(trie.root.as_ref().unwrap(), same.root.as_ref().unwrap()));

        // A node on the path without a value is just as absent.
        let same = trie.remove(b"ab");
        assert!(Arc::ptr_eq(trie.root.as_ref().unwrap(), same.root.as_ref().unwrap()));

        // Removing from an empty trie stays empty.
        assert!(Trie::new().remove(b"x").root.is_none());
    }

    #[test]
    fn test_remove_prunes_dead_path() {
        // Removing "abc" must prune the now-useless "b" and "c" nodes but
        // keep "a", which still holds a value.
        let trie = Trie::new().put(b"a", 1u32).put(b"abc", 2u32);
        let removed = trie.remove(b"abc");
        assert_eq!(Some(&1), removed.get::<u32>(b"a"));
        assert_eq!(None, removed.get::<u32>(b"abc"));
        let a = removed.root.as_ref().unwrap().children.get(&b'a').unwrap();
        assert!(a.children.is_empty());

        // Removing a value from a node with children keeps the node.
        let trie = Trie::new().put(b"a", 1u32).put(b"abc", 2u32);
        let removed = trie.remove(b"a");
        assert_eq!(None, removed.get::<u32>(b"a"));
        assert_eq!(Some(&2), removed.get::<u32>(b"abc"));

        // Removing the last key leaves a trie with no root.
        let trie = Trie::new().put(b"abc", 1u32);
        assert!(trie.remove(b"abc").root.is_none());
    }

    #[test]
    fn test_structural_sharing() {
        // Subtrees off the put path keep their identity across versions.
        let t1 = Trie::new().put(b"ax", 1u32).put(b"by", 2u32);
        let t2 = t1.put(b"az", 3u32);

        let b1 = t1.root.as_ref().unwrap().children.get(&b'b').unwrap();
        let b2 = t2.root.as_ref().unwrap().children.get(&b'b').unwrap();
        assert!(Arc::ptr_eq(b1, b2));

        // The same holds for remove.
        let t3 = t2.remove(b"ax");
        let b3 = t3.root.as_ref().unwrap().children.get(&b'b').unwrap();
        assert!(Arc::ptr_eq(b2, b3));

        // The value itself is shared, not cloned, between versions.
        let v1: &u32 = t1.get(b"ax").unwrap();
        let v2: &u32 = t2.get(b"ax").unwrap();
        assert!(std::ptr::eq(v1, v2));
    }

    #[test]
    fn test_concurrent_readers() {
        let base = Trie::new().put(b"shared", 1u32);
        let mut handles = vec![];
        for i in 0..8u32 {
            let version = base.put(b"own", i);
            handles.push(std::thread::spawn(move || {
                assert_eq!(Some(&1), version.get::<u32>(b"shared"));
                assert_eq!(Some(&i), version.get::<u32>(b"own"));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(None, base.get::<u32>(b"own"));
    }
}
