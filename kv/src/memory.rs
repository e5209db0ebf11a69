//! In-memory key-value store, used by tests and dry runs.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use crate::{KVError, KVResult, KVStore, Op};

/// An in-memory ordered store backed by a `BTreeMap`.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let data = self.data.lock().map_err(|_| KVError::Poisoned)?;
        Ok(data.get(key).cloned())
    }

    fn write(&self, ops: &[Op]) -> KVResult<()> {
        // The whole batch is applied under one lock, so readers never see a
        // half-applied batch.
        let mut data = self.data.lock().map_err(|_| KVError::Poisoned)?;
        for op in ops {
            match op {
                Op::Set(k, v) => {
                    data.insert(k.clone(), v.clone());
                }
                Op::Delete(k) => {
                    data.remove(k);
                }
            }
        }
        Ok(())
    }

    fn scan_after(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>> {
        let data = self.data.lock().map_err(|_| KVError::Poisoned)?;
        let lower = match after {
            Some(a) if a >= prefix => Bound::Excluded(a.to_string()),
            _ => Bound::Included(prefix.to_string()),
        };

        let mut out = Vec::new();
        for (k, v) in data.range((lower, Bound::Unbounded)) {
            if !k.starts_with(prefix) {
                break;
            }
            out.push((k.clone(), v.clone()));
            if limit > 0 && out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();

        store.set("key1", b"value1").unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get("nonexistent").unwrap(), None);

        store.delete("key1").unwrap();
        assert_eq!(store.get("key1").unwrap(), None);
        store.delete("key1").unwrap();
    }

    #[test]
    fn test_scan_is_ordered_and_prefix_bounded() {
        let store = MemoryStore::new();
        store.set("rec:0003", b"3").unwrap();
        store.set("rec:0001", b"1").unwrap();
        store.set("rec:0002", b"2").unwrap();
        store.set("red:0000", b"x").unwrap();
        store.set("other:c", b"y").unwrap();

        let keys: Vec<String> = store.scan("rec:").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["rec:0001", "rec:0002", "rec:0003"]);
    }

    #[test]
    fn test_scan_after_pages() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.set(&format!("p:{i:02}"), b"v").unwrap();
        }

        let page1 = store.scan_after("p:", None, 2).unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[1].0, "p:01");

        let page2 = store.scan_after("p:", Some(&page1[1].0), 2).unwrap();
        assert_eq!(page2[0].0, "p:02");
        assert_eq!(page2[1].0, "p:03");

        let page3 = store.scan_after("p:", Some("p:03"), 2).unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].0, "p:04");
    }

    #[test]
    fn test_write_mixed_batch() {
        let store = MemoryStore::new();
        store.set("a", b"1").unwrap();

        store
            .write(&[Op::delete("a"), Op::set("b", b"2".to_vec()), Op::set("c", b"3".to_vec())])
            .unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clones_share_data() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", b"v").unwrap();
        assert_eq!(b.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
