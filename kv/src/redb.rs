//! Redb-based persistent key-value store.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{KVError, KVResult, KVStore, Op};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: std::fmt::Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// A persistent key-value store backed by redb.
///
/// Each [`KVStore::write`] is one redb write transaction; an error before
/// commit aborts the transaction and nothing is persisted.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a redb store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> KVResult<Self> {
        let db = Database::create(path).map_err(storage)?;

        // Create the table if it doesn't exist
        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(TABLE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;
        Ok(table.get(key).map_err(storage)?.map(|v| v.value().to_vec()))
    }

    fn write(&self, ops: &[Op]) -> KVResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            for op in ops {
                match op {
                    Op::Set(k, v) => {
                        table.insert(k.as_str(), v.as_slice()).map_err(storage)?;
                    }
                    Op::Delete(k) => {
                        table.remove(k.as_str()).map_err(storage)?;
                    }
                }
            }
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }

    fn scan_after(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;

        let start = match after {
            Some(a) if a >= prefix => a,
            _ => prefix,
        };

        let mut results = Vec::new();
        for item in table.range(start..).map_err(storage)? {
            let (key, value) = item.map_err(storage)?;
            let key_str = key.value();
            if after == Some(key_str) {
                continue;
            }
            if !key_str.starts_with(prefix) {
                break;
            }
            results.push((key_str.to_string(), value.value().to_vec()));
            if limit > 0 && results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_redb_basic() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store.set("key1", b"value1").unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));

        store.delete("key1").unwrap();
        assert_eq!(store.get("key1").unwrap(), None);
    }

    #[test]
    fn test_redb_scan_after() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store
            .write(&[
                Op::set("rec:02", b"2".to_vec()),
                Op::set("rec:01", b"1".to_vec()),
                Op::set("rec:03", b"3".to_vec()),
                Op::set("rez:00", b"z".to_vec()),
            ])
            .unwrap();

        let all = store.scan("rec:").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].0, "rec:01");

        let page = store.scan_after("rec:", Some("rec:01"), 1).unwrap();
        assert_eq!(page, vec![("rec:02".to_string(), b"2".to_vec())]);
    }

    #[test]
    fn test_redb_reopen_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.write(&[Op::set("a", b"1".to_vec()), Op::set("b", b"2".to_vec())]).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("b").unwrap(), Some(b"2".to_vec()));
    }
}
