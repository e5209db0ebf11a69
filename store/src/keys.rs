//! KV key layout.
//!
//! Numeric ids are zero-padded to 20 digits so lexicographic scans return
//! rows in id order.

pub const RECORD_PREFIX: &str = "rec:";
pub const SAMPLE_PREFIX: &str = "smp:";
pub const EDGE_PREFIX: &str = "edge:";
pub const NEXT_RECORD_ID: &str = "meta:next_record_id";

pub const TAG_PREFIX: &str = "tag:";
pub const TAG_LABEL_PREFIX: &str = "tlabel:";
pub const EMBEDDING_PREFIX: &str = "emb:";
pub const NEXT_TAG_ID: &str = "meta:next_tag_id";
pub const DIMENSION: &str = "meta:dimension";

/// Format: `rec:{id_20d}`
pub fn record_key(id: u64) -> String {
    format!("{RECORD_PREFIX}{id:020}")
}

/// Format: `smp:{record_id_20d}`
pub fn sample_key(record_id: u64) -> String {
    format!("{SAMPLE_PREFIX}{record_id:020}")
}

/// Format: `edge:{record_id_20d}`
pub fn edge_key(record_id: u64) -> String {
    format!("{EDGE_PREFIX}{record_id:020}")
}

/// Format: `tag:{id_20d}`
pub fn tag_key(id: u64) -> String {
    format!("{TAG_PREFIX}{id:020}")
}

/// Label uniqueness index. Format: `tlabel:{label}`
pub fn tag_label_key(label: &str) -> String {
    format!("{TAG_LABEL_PREFIX}{label}")
}

/// Format: `emb:{record_id_20d}`
pub fn embedding_key(record_id: u64) -> String {
    format!("{EMBEDDING_PREFIX}{record_id:020}")
}

/// Parse the id suffix of a key built by one of the functions above.
pub fn parse_id(key: &str, prefix: &str) -> Option<u64> {
    key.strip_prefix(prefix)?.parse().ok()
}
