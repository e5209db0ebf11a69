use std::collections::BTreeMap;

use chrono::NaiveDate;
use tagloop_kv::{KVStore, Op};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::keys::{
    EDGE_PREFIX, NEXT_RECORD_ID, RECORD_PREFIX, SAMPLE_PREFIX, edge_key, record_key, sample_key,
};
use crate::types::{
    EdgeRecord, MatchStatus, NewRecord, Outcome, Record, RecordStats, Sample, Stratum,
};
use crate::{decode, encode};

const SCAN_PAGE: usize = 1000;

/// Relational side of the pipeline: records, samples and edge records.
///
/// Every method that writes commits a single atomic batch, so a failed call
/// leaves the store unchanged.
pub trait RecordStore: Send + Sync {
    /// Insert records, assigning ascending ids. Returns the new ids.
    fn insert_records(&self, records: &[NewRecord]) -> StoreResult<Vec<u64>>;

    fn get_record(&self, id: u64) -> StoreResult<Option<Record>>;

    /// Records with id greater than `after`, in id order. `limit` 0 means all.
    fn list_records(&self, after: Option<u64>, limit: usize) -> StoreResult<Vec<Record>>;

    /// Record ids grouped by (product, channel).
    fn strata(&self) -> StoreResult<BTreeMap<Stratum, Vec<u64>>>;

    /// Replace the whole sample set (truncate then insert).
    fn replace_samples(&self, samples: &[Sample]) -> StoreResult<()>;

    fn samples(&self) -> StoreResult<Vec<Sample>>;

    /// Set labels on existing samples.
    fn set_sample_labels(&self, labels: &[(u64, String)]) -> StoreResult<()>;

    /// Apply match outcomes. Matched outcomes set tag and status and drop an
    /// unlabeled edge record; edge outcomes clear the tag, set status `edge`
    /// and upsert the edge record, keeping any label it already carries.
    fn apply_outcomes(&self, outcomes: &[Outcome]) -> StoreResult<()>;

    /// Edge records without a label, in record id order.
    fn unresolved_edges(&self) -> StoreResult<Vec<EdgeRecord>>;

    /// Set labels on existing edge records.
    fn set_edge_labels(&self, labels: &[(u64, String)]) -> StoreResult<()>;

    fn edges(&self) -> StoreResult<Vec<EdgeRecord>>;

    fn stats(&self, today: NaiveDate) -> StoreResult<RecordStats>;
}

/// [`RecordStore`] over a [`KVStore`].
#[derive(Debug)]
pub struct KvRecordStore {
    kv: Box<dyn KVStore>,
}

impl KvRecordStore {
    pub fn new(kv: Box<dyn KVStore>) -> Self {
        Self { kv }
    }

    fn next_record_id(&self) -> StoreResult<u64> {
        match self.kv.get(NEXT_RECORD_ID)? {
            Some(data) => decode(&data),
            None => Ok(1),
        }
    }

    fn scan_all<T: serde::de::DeserializeOwned>(&self, prefix: &str) -> StoreResult<Vec<T>> {
        self.kv
            .scan(prefix)?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    /// Visit every record in id order, one page at a time.
    fn for_each_record(&self, mut f: impl FnMut(Record)) -> StoreResult<()> {
        let mut after = None;
        loop {
            let page = self.list_records(after, SCAN_PAGE)?;
            let done = page.len() < SCAN_PAGE;
            after = page.last().map(|r| r.id);
            page.into_iter().for_each(&mut f);
            if done {
                return Ok(());
            }
        }
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> StoreResult<T> {
        match self.kv.get(key)? {
            Some(data) => decode(&data),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

impl RecordStore for KvRecordStore {
    fn insert_records(&self, records: &[NewRecord]) -> StoreResult<Vec<u64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let first = self.next_record_id()?;
        let mut ops = Vec::with_capacity(records.len() + 1);
        let mut ids = Vec::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            let id = first + i as u64;
            let rec = Record {
                id,
                product: r.product.clone(),
                channel: r.channel.clone(),
                content: r.content.clone(),
                content_clean: r.content_clean.clone(),
                create_time: r.create_time,
                tag: None,
                match_status: MatchStatus::Unset,
            };
            ops.push(Op::set(record_key(id), encode(&rec)?));
            ids.push(id);
        }
        ops.push(Op::set(NEXT_RECORD_ID, encode(&(first + records.len() as u64))?));
        self.kv.write(&ops)?;
        debug!(count = ids.len(), first_id = first, "records inserted");
        Ok(ids)
    }

    fn get_record(&self, id: u64) -> StoreResult<Option<Record>> {
        match self.kv.get(&record_key(id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    fn list_records(&self, after: Option<u64>, limit: usize) -> StoreResult<Vec<Record>> {
        let after_key = after.map(record_key);
        self.kv
            .scan_after(RECORD_PREFIX, after_key.as_deref(), limit)?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    fn strata(&self) -> StoreResult<BTreeMap<Stratum, Vec<u64>>> {
        let mut out: BTreeMap<Stratum, Vec<u64>> = BTreeMap::new();
        self.for_each_record(|r| out.entry(r.stratum()).or_default().push(r.id))?;
        Ok(out)
    }

    fn replace_samples(&self, samples: &[Sample]) -> StoreResult<()> {
        let mut ops: Vec<Op> = self
            .kv
            .scan(SAMPLE_PREFIX)?
            .into_iter()
            .map(|(k, _)| Op::Delete(k))
            .collect();
        let removed = ops.len();
        for s in samples {
            ops.push(Op::set(sample_key(s.record_id), encode(s)?));
        }
        self.kv.write(&ops)?;
        debug!(removed, inserted = samples.len(), "sample set replaced");
        Ok(())
    }

    fn samples(&self) -> StoreResult<Vec<Sample>> {
        self.scan_all(SAMPLE_PREFIX)
    }

    fn set_sample_labels(&self, labels: &[(u64, String)]) -> StoreResult<()> {
        let mut ops = Vec::with_capacity(labels.len());
        for (id, label) in labels {
            let key = sample_key(*id);
            let mut sample: Sample = self.load(&key)?;
            sample.label = Some(label.clone());
            ops.push(Op::set(key, encode(&sample)?));
        }
        self.kv.write(&ops)?;
        Ok(())
    }

    fn apply_outcomes(&self, outcomes: &[Outcome]) -> StoreResult<()> {
        let mut ops = Vec::with_capacity(outcomes.len() * 2);
        for outcome in outcomes {
            let key = record_key(outcome.record_id());
            let mut rec: Record = self.load(&key)?;
            match outcome {
                Outcome::Matched {
                    record_id, label, ..
                } => {
                    rec.tag = Some(label.clone());
                    rec.match_status = MatchStatus::Matched;
                    // Unlabeled edge rows go; labeled ones stay as history.
                    let ekey = edge_key(*record_id);
                    let unlabeled = match self.kv.get(&ekey)? {
                        Some(data) => decode::<EdgeRecord>(&data)?.label.is_none(),
                        None => false,
                    };
                    if unlabeled {
                        ops.push(Op::Delete(ekey));
                    }
                }
                Outcome::Edge {
                    record_id,
                    content_clean,
                    ..
                } => {
                    rec.tag = None;
                    rec.match_status = MatchStatus::Edge;
                    let ekey = edge_key(*record_id);
                    let label = match self.kv.get(&ekey)? {
                        Some(data) => decode::<EdgeRecord>(&data)?.label,
                        None => None,
                    };
                    let edge = EdgeRecord {
                        record_id: *record_id,
                        content_clean: content_clean.clone(),
                        label,
                    };
                    ops.push(Op::set(ekey, encode(&edge)?));
                }
            }
            ops.push(Op::set(key, encode(&rec)?));
        }
        self.kv.write(&ops)?;
        Ok(())
    }

    fn unresolved_edges(&self) -> StoreResult<Vec<EdgeRecord>> {
        Ok(self
            .edges()?
            .into_iter()
            .filter(|e| e.label.is_none())
            .collect())
    }

    fn set_edge_labels(&self, labels: &[(u64, String)]) -> StoreResult<()> {
        let mut ops = Vec::with_capacity(labels.len());
        for (id, label) in labels {
            let key = edge_key(*id);
            let mut edge: EdgeRecord = self.load(&key)?;
            edge.label = Some(label.clone());
            ops.push(Op::set(key, encode(&edge)?));
        }
        self.kv.write(&ops)?;
        Ok(())
    }

    fn edges(&self) -> StoreResult<Vec<EdgeRecord>> {
        self.scan_all(EDGE_PREFIX)
    }

    fn stats(&self, today: NaiveDate) -> StoreResult<RecordStats> {
        let mut stats = RecordStats::default();
        self.for_each_record(|r| {
            stats.total += 1;
            if r.create_time.date() == today {
                stats.today += 1;
            }
            stats.by_status.add(r.match_status);
        })?;
        let edges = self.edges()?;
        stats.edges = edges.len();
        stats.unresolved_edges = edges.iter().filter(|e| e.label.is_none()).count();
        stats.samples = self.kv.scan(SAMPLE_PREFIX)?.len();
        Ok(stats)
    }
}
