//! Storage for the tag pipeline.
//!
//! Two stores, queried independently:
//!
//! - [`RecordStore`]: records, the current sample set and edge records.
//! - [`VectorStore`]: tags and per-record embeddings with match results.
//!
//! Both are implemented over [`tagloop_kv::KVStore`] with MessagePack values.
//! In production each lives in its own redb file; tests use
//! [`tagloop_kv::MemoryStore`].

pub mod error;
pub mod ingest;
pub mod keys;
pub mod record;
pub mod types;
pub mod vector;

pub use error::{StoreError, StoreResult};
pub use ingest::{IngestReport, RawFeedback};
pub use record::{KvRecordStore, RecordStore};
pub use types::*;
pub use vector::{KvVectorStore, VectorStore};

pub(crate) fn encode<T: serde::Serialize + ?Sized>(v: &T) -> StoreResult<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(v)?)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> StoreResult<T> {
    Ok(rmp_serde::from_slice(data)?)
}
