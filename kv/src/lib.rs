//! Ordered key-value storage for the tag pipeline.
//!
//! Both the record store and the vector store are laid out on top of a
//! [`KVStore`]. Keys are compared bytewise, so scans return entries in
//! lexicographic key order; callers zero-pad numeric ids to make that order
//! match numeric order.
//!
//! Every mutating call is atomic: [`KVStore::write`] applies a mixed batch of
//! sets and deletes in a single transaction, so a failed batch leaves the
//! store exactly as it was before the call.

pub mod memory;
pub mod redb;

use std::fmt;
use thiserror::Error;

/// Errors that can occur in KV store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: storage error: {0}")]
    Storage(String),

    #[error("kv: lock poisoned")]
    Poisoned,
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// A single mutation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Set(String, Vec<u8>),
    Delete(String),
}

impl Op {
    pub fn set(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Op::Set(key.into(), value.into())
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Op::Delete(key.into())
    }

    pub fn key(&self) -> &str {
        match self {
            Op::Set(k, _) | Op::Delete(k) => k,
        }
    }
}

/// Ordered key-value store.
///
/// Implementations must be safe for concurrent use.
pub trait KVStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Apply all operations in one transaction, in order.
    fn write(&self, ops: &[Op]) -> KVResult<()>;

    /// Return up to `limit` entries whose key starts with `prefix` and sorts
    /// strictly after `after` (when given), in ascending key order.
    /// A `limit` of 0 means no limit.
    fn scan_after(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        self.write(&[Op::set(key, value)])
    }

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> KVResult<()> {
        self.write(&[Op::delete(key)])
    }

    /// Return every entry whose key starts with `prefix`, in key order.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        self.scan_after(prefix, None, 0)
    }
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}

pub use self::memory::MemoryStore;
pub use self::redb::RedbStore;
