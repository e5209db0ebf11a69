//! Validation and cleaning of raw feedback before it becomes a [`Record`].
//!
//! [`Record`]: crate::Record

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::record::RecordStore;
use crate::types::NewRecord;

/// Maximum number of items accepted by one [`ingest`] call.
pub const MAX_BATCH: usize = 1000;

/// Format of `create_time` in raw feedback.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Product or channel used when the raw value is missing.
pub const UNKNOWN: &str = "unknown";

const PHONE_MASK: &str = "1**********";

/// One feedback item as submitted by a producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeedback {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub skipped: usize,
    pub ids: Vec<u64>,
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"1[3-9]\d{9}").expect("phone pattern is valid"))
}

/// Trim, drop line breaks and mask mobile phone numbers.
pub fn clean_content(raw: &str) -> String {
    let flat: String = raw.trim().chars().filter(|c| *c != '\n' && *c != '\r').collect();
    phone_pattern().replace_all(&flat, PHONE_MASK).into_owned()
}

/// Parse `create_time`, falling back to `now` when missing or malformed.
pub fn parse_create_time(raw: Option<&str>, now: NaiveDateTime) -> NaiveDateTime {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };
    match NaiveDateTime::parse_from_str(s, TIME_FORMAT) {
        Ok(t) => t,
        Err(e) => {
            warn!(create_time = s, error = %e, "malformed create_time, using now");
            now
        }
    }
}

fn or_unknown(v: &Option<String>) -> String {
    match v.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Validate and clean a batch. Items whose cleaned content is empty are
/// dropped. Returns the records and the number dropped.
pub fn prepare(items: &[RawFeedback], now: NaiveDateTime) -> StoreResult<(Vec<NewRecord>, usize)> {
    if items.is_empty() {
        return Err(StoreError::InvalidInput("empty batch".into()));
    }
    if items.len() > MAX_BATCH {
        return Err(StoreError::InvalidInput(format!(
            "batch of {} exceeds the limit of {MAX_BATCH}",
            items.len()
        )));
    }

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (i, item) in items.iter().enumerate() {
        let content_clean = clean_content(&item.content);
        if content_clean.is_empty() {
            warn!(index = i, "empty content, item skipped");
            skipped += 1;
            continue;
        }
        records.push(NewRecord {
            product: or_unknown(&item.product),
            channel: or_unknown(&item.channel),
            content: item.content.clone(),
            content_clean,
            create_time: parse_create_time(item.create_time.as_deref(), now),
        });
    }
    if records.is_empty() {
        return Err(StoreError::InvalidInput("no valid items in batch".into()));
    }
    Ok((records, skipped))
}

/// Clean, validate and insert a batch of raw feedback.
pub fn ingest(
    store: &dyn RecordStore,
    items: &[RawFeedback],
    now: NaiveDateTime,
) -> StoreResult<IngestReport> {
    let (records, skipped) = prepare(items, now)?;
    let ids = store.insert_records(&records)?;
    info!(accepted = ids.len(), skipped, "feedback ingested");
    Ok(IngestReport {
        accepted: ids.len(),
        skipped,
        ids,
    })
}
