use std::collections::HashSet;

use tagloop_kv::{KVStore, Op};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::keys::{
    DIMENSION, EMBEDDING_PREFIX, NEXT_TAG_ID, TAG_LABEL_PREFIX, TAG_PREFIX, embedding_key,
    parse_id, tag_key, tag_label_key,
};
use crate::types::{MatchUpdate, NewTag, RecordEmbedding, Tag, TagCounts, TagOrigin};
use crate::{decode, encode};

/// Vector side of the pipeline: tags and per-record embeddings.
///
/// All vectors share one dimension, fixed by the first vectors written.
/// Tag labels are unique across origins. Every method that writes commits a
/// single atomic batch.
pub trait VectorStore: Send + Sync {
    /// The fixed vector dimension, or `None` before anything was written.
    fn dimension(&self) -> StoreResult<Option<usize>>;

    /// Ids of records that already have an embedding row.
    fn embedded_ids(&self) -> StoreResult<HashSet<u64>>;

    /// Insert or update embedding rows keyed by record id. Existing match
    /// fields are kept.
    fn upsert_embeddings(&self, rows: &[(u64, String, Vec<f32>)]) -> StoreResult<()>;

    /// Embedding rows with record id greater than `after`. `limit` 0 means all.
    fn list_embeddings(&self, after: Option<u64>, limit: usize)
    -> StoreResult<Vec<RecordEmbedding>>;

    /// Set or clear the match fields of existing embedding rows.
    fn record_matches(&self, updates: &[MatchUpdate]) -> StoreResult<()>;

    /// All tags, in id order.
    fn tags(&self) -> StoreResult<Vec<Tag>>;

    /// All tag labels.
    fn labels(&self) -> StoreResult<HashSet<String>>;

    /// Delete every `initial` tag and insert `tags` as the new initial set.
    /// Labels already held by an `iterative` tag, and repeated labels within
    /// `tags`, are skipped. Returns the number inserted.
    fn replace_initial_tags(&self, tags: &[NewTag]) -> StoreResult<usize>;

    /// Insert `tags` as `iterative`, silently skipping labels that already
    /// exist. Returns the number inserted.
    fn insert_iterative_tags(&self, tags: &[NewTag]) -> StoreResult<usize>;

    fn tag_counts(&self) -> StoreResult<TagCounts>;
}

/// [`VectorStore`] over a [`KVStore`].
#[derive(Debug)]
pub struct KvVectorStore {
    kv: Box<dyn KVStore>,
}

impl KvVectorStore {
    pub fn new(kv: Box<dyn KVStore>) -> Self {
        Self { kv }
    }

    fn next_tag_id(&self) -> StoreResult<u64> {
        match self.kv.get(NEXT_TAG_ID)? {
            Some(data) => decode(&data),
            None => Ok(1),
        }
    }

    /// Check every vector against the stored dimension. When none is stored
    /// yet, the first vector fixes it and a meta write is appended to `ops`.
    fn check_dimension<'a>(
        &self,
        vectors: impl IntoIterator<Item = &'a [f32]>,
        ops: &mut Vec<Op>,
    ) -> StoreResult<()> {
        let stored = self.dimension()?;
        let mut want = stored;
        for v in vectors {
            if v.is_empty() {
                return Err(StoreError::InvalidInput("empty vector".into()));
            }
            match want {
                Some(w) if w != v.len() => {
                    return Err(StoreError::DimensionMismatch {
                        got: v.len(),
                        want: w,
                    });
                }
                Some(_) => {}
                None => want = Some(v.len()),
            }
        }
        if let (None, Some(w)) = (stored, want) {
            ops.push(Op::set(DIMENSION, encode(&(w as u64))?));
        }
        Ok(())
    }

    /// Build insert ops for `tags`, skipping labels in `taken`.
    fn tag_inserts(
        &self,
        tags: &[NewTag],
        origin: TagOrigin,
        taken: &mut HashSet<String>,
        ops: &mut Vec<Op>,
    ) -> StoreResult<usize> {
        let mut next = self.next_tag_id()?;
        let mut inserted = 0;
        for t in tags {
            if !taken.insert(t.label.clone()) {
                debug!(label = %t.label, %origin, "tag label exists, skipped");
                continue;
            }
            let tag = Tag {
                id: next,
                label: t.label.clone(),
                embedding: t.embedding.clone(),
                origin,
                cluster_id: t.cluster_id,
            };
            ops.push(Op::set(tag_key(next), encode(&tag)?));
            ops.push(Op::set(tag_label_key(&t.label), encode(&next)?));
            next += 1;
            inserted += 1;
        }
        ops.push(Op::set(NEXT_TAG_ID, encode(&next)?));
        Ok(inserted)
    }
}

impl VectorStore for KvVectorStore {
    fn dimension(&self) -> StoreResult<Option<usize>> {
        match self.kv.get(DIMENSION)? {
            Some(data) => Ok(Some(decode::<u64>(&data)? as usize)),
            None => Ok(None),
        }
    }

    fn embedded_ids(&self) -> StoreResult<HashSet<u64>> {
        Ok(self
            .kv
            .scan(EMBEDDING_PREFIX)?
            .iter()
            .filter_map(|(k, _)| parse_id(k, EMBEDDING_PREFIX))
            .collect())
    }

    fn upsert_embeddings(&self, rows: &[(u64, String, Vec<f32>)]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut ops = Vec::with_capacity(rows.len() + 1);
        self.check_dimension(rows.iter().map(|(_, _, v)| v.as_slice()), &mut ops)?;
        for (id, text, vector) in rows {
            let key = embedding_key(*id);
            let row = match self.kv.get(&key)? {
                Some(data) => {
                    let mut row: RecordEmbedding = decode(&data)?;
                    row.content_clean = text.clone();
                    row.embedding = vector.clone();
                    row
                }
                None => RecordEmbedding {
                    record_id: *id,
                    content_clean: text.clone(),
                    embedding: vector.clone(),
                    tag_id: None,
                    similarity: None,
                },
            };
            ops.push(Op::set(key, encode(&row)?));
        }
        self.kv.write(&ops)?;
        Ok(())
    }

    fn list_embeddings(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> StoreResult<Vec<RecordEmbedding>> {
        let after_key = after.map(embedding_key);
        self.kv
            .scan_after(EMBEDDING_PREFIX, after_key.as_deref(), limit)?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    fn record_matches(&self, updates: &[MatchUpdate]) -> StoreResult<()> {
        let mut ops = Vec::with_capacity(updates.len());
        for u in updates {
            let key = embedding_key(u.record_id);
            let mut row: RecordEmbedding = match self.kv.get(&key)? {
                Some(data) => decode(&data)?,
                None => return Err(StoreError::NotFound(key)),
            };
            row.tag_id = u.best.map(|(id, _)| id);
            row.similarity = u.best.map(|(_, s)| s);
            ops.push(Op::set(key, encode(&row)?));
        }
        self.kv.write(&ops)?;
        Ok(())
    }

    fn tags(&self) -> StoreResult<Vec<Tag>> {
        self.kv
            .scan(TAG_PREFIX)?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    fn labels(&self) -> StoreResult<HashSet<String>> {
        Ok(self
            .kv
            .scan(TAG_LABEL_PREFIX)?
            .into_iter()
            .filter_map(|(k, _)| k.strip_prefix(TAG_LABEL_PREFIX).map(str::to_string))
            .collect())
    }

    fn replace_initial_tags(&self, tags: &[NewTag]) -> StoreResult<usize> {
        let mut ops = Vec::new();
        self.check_dimension(tags.iter().map(|t| t.embedding.as_slice()), &mut ops)?;

        let mut taken = HashSet::new();
        let mut removed = 0;
        for t in self.tags()? {
            match t.origin {
                TagOrigin::Initial => {
                    ops.push(Op::delete(tag_key(t.id)));
                    ops.push(Op::delete(tag_label_key(&t.label)));
                    removed += 1;
                }
                TagOrigin::Iterative => {
                    taken.insert(t.label);
                }
            }
        }
        let inserted = self.tag_inserts(tags, TagOrigin::Initial, &mut taken, &mut ops)?;
        self.kv.write(&ops)?;
        debug!(removed, inserted, "initial tags replaced");
        Ok(inserted)
    }

    fn insert_iterative_tags(&self, tags: &[NewTag]) -> StoreResult<usize> {
        if tags.is_empty() {
            return Ok(0);
        }
        let mut ops = Vec::new();
        self.check_dimension(tags.iter().map(|t| t.embedding.as_slice()), &mut ops)?;
        let mut taken = self.labels()?;
        let inserted = self.tag_inserts(tags, TagOrigin::Iterative, &mut taken, &mut ops)?;
        self.kv.write(&ops)?;
        Ok(inserted)
    }

    fn tag_counts(&self) -> StoreResult<TagCounts> {
        let mut counts = TagCounts::default();
        for t in self.tags()? {
            match t.origin {
                TagOrigin::Initial => counts.initial += 1,
                TagOrigin::Iterative => counts.iterative += 1,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagloop_kv::MemoryStore;

    fn store() -> KvVectorStore {
        KvVectorStore::new(Box::new(MemoryStore::new()))
    }

    fn tag(label: &str, v: [f32; 2]) -> NewTag {
        NewTag {
            label: label.into(),
            embedding: v.to_vec(),
            cluster_id: None,
        }
    }

    #[test]
    fn first_write_fixes_dimension() {
        let s = store();
        assert_eq!(s.dimension().unwrap(), None);
        s.upsert_embeddings(&[(1, "a".into(), vec![1.0, 0.0])]).unwrap();
        assert_eq!(s.dimension().unwrap(), Some(2));
        let err = s
            .upsert_embeddings(&[(2, "b".into(), vec![1.0, 0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { got: 3, want: 2 }));
        assert!(!s.embedded_ids().unwrap().contains(&2));
    }

    #[test]
    fn mixed_dimensions_in_one_batch_rejected() {
        let s = store();
        let err = s
            .insert_iterative_tags(&[
                NewTag {
                    label: "a-b-c".into(),
                    embedding: vec![1.0],
                    cluster_id: None,
                },
                tag("d-e-f", [1.0, 0.0]),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
        assert!(s.tags().unwrap().is_empty());
        assert_eq!(s.dimension().unwrap(), None);
    }

    #[test]
    fn upsert_is_idempotent_and_keeps_match() {
        let s = store();
        s.upsert_embeddings(&[(1, "a".into(), vec![1.0, 0.0])]).unwrap();
        s.record_matches(&[MatchUpdate {
            record_id: 1,
            best: Some((3, 0.8)),
        }])
        .unwrap();
        s.upsert_embeddings(&[(1, "a".into(), vec![1.0, 0.0])]).unwrap();
        let rows = s.list_embeddings(None, 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tag_id, Some(3));
        assert_eq!(rows[0].similarity, Some(0.8));
    }

    #[test]
    fn record_matches_clears() {
        let s = store();
        s.upsert_embeddings(&[(1, "a".into(), vec![1.0, 0.0])]).unwrap();
        s.record_matches(&[MatchUpdate {
            record_id: 1,
            best: Some((3, 0.8)),
        }])
        .unwrap();
        s.record_matches(&[MatchUpdate {
            record_id: 1,
            best: None,
        }])
        .unwrap();
        let row = &s.list_embeddings(None, 0).unwrap()[0];
        assert_eq!(row.tag_id, None);
        assert_eq!(row.similarity, None);
    }

    #[test]
    fn iterative_insert_skips_existing_labels() {
        let s = store();
        assert_eq!(
            s.insert_iterative_tags(&[tag("a-b-c", [1.0, 0.0]), tag("a-b-c", [0.0, 1.0])])
                .unwrap(),
            1
        );
        assert_eq!(
            s.insert_iterative_tags(&[tag("a-b-c", [1.0, 0.0]), tag("x-y-z", [0.0, 1.0])])
                .unwrap(),
            1
        );
        let labels: Vec<_> = s.tags().unwrap().into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["a-b-c", "x-y-z"]);
    }

    #[test]
    fn replace_initial_keeps_iterative() {
        let s = store();
        s.replace_initial_tags(&[tag("a-a-a", [1.0, 0.0]), tag("b-b-b", [0.0, 1.0])])
            .unwrap();
        s.insert_iterative_tags(&[tag("c-c-c", [1.0, 1.0])]).unwrap();

        let inserted = s
            .replace_initial_tags(&[tag("a-a-a", [1.0, 0.0]), tag("c-c-c", [1.0, 1.0])])
            .unwrap();
        assert_eq!(inserted, 1);

        let tags = s.tags().unwrap();
        let mut labels: Vec<_> = tags.iter().map(|t| t.label.as_str()).collect();
        labels.sort();
        assert_eq!(labels, vec!["a-a-a", "c-c-c"]);
        assert_eq!(
            s.tag_counts().unwrap(),
            TagCounts {
                initial: 1,
                iterative: 1
            }
        );
        let ids: Vec<_> = tags.iter().map(|t| t.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn replace_initial_with_empty_set_clears_initial() {
        let s = store();
        s.replace_initial_tags(&[tag("a-a-a", [1.0, 0.0])]).unwrap();
        s.replace_initial_tags(&[]).unwrap();
        assert!(s.tags().unwrap().is_empty());
        assert!(s.labels().unwrap().is_empty());
    }
}
