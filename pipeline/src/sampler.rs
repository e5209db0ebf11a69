//! Stratified sampling over (product, channel).

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};

use tagloop_store::{RecordStore, Sample, StoreError, Stratum};

use crate::error::Result;

/// `max(1, round(n * rate))`, capped at `n`. Zero for an empty stratum.
pub fn sample_size(n: usize, rate: f64) -> usize {
    if n == 0 {
        return 0;
    }
    ((n as f64 * rate).round() as usize).clamp(1, n)
}

pub(crate) fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StratumSample {
    pub product: String,
    pub channel: String,
    pub size: usize,
    pub sampled: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleReport {
    pub strata: Vec<StratumSample>,
    pub sampled: usize,
}

/// Draw a fresh sample set and replace the stored one.
///
/// Nothing is written unless every stratum was drawn, so a store error
/// leaves the previous sample set in place.
pub fn draw_samples(
    records: &dyn RecordStore,
    rate: f64,
    seed: Option<u64>,
) -> Result<SampleReport> {
    let mut rng = rng(seed);
    let strata = records.strata()?;

    let mut report = SampleReport::default();
    let mut samples = Vec::new();
    for (Stratum { product, channel }, ids) in strata {
        let k = sample_size(ids.len(), rate);
        if k == 0 {
            continue;
        }
        for &id in ids.choose_multiple(&mut rng, k) {
            let rec = records
                .get_record(id)?
                .ok_or_else(|| StoreError::NotFound(format!("record {id}")))?;
            samples.push(Sample {
                record_id: id,
                content_clean: rec.content_clean,
                label: None,
            });
        }
        debug!(%product, %channel, size = ids.len(), sampled = k, "stratum sampled");
        report.strata.push(StratumSample {
            product,
            channel,
            size: ids.len(),
            sampled: k,
        });
    }
    samples.sort_by_key(|s| s.record_id);

    records.replace_samples(&samples)?;
    report.sampled = samples.len();
    info!(
        strata = report.strata.len(),
        sampled = report.sampled,
        "sample set replaced"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_size_rounds_with_floor_of_one() {
        assert_eq!(sample_size(70, 0.1), 7);
        assert_eq!(sample_size(30, 0.1), 3);
        assert_eq!(sample_size(3, 0.01), 1);
        assert_eq!(sample_size(25, 0.1), 3);
        assert_eq!(sample_size(0, 0.5), 0);
    }

    #[test]
    fn sample_size_never_exceeds_stratum() {
        for n in 1..50 {
            for rate in [0.01, 0.1, 0.5, 1.0] {
                let k = sample_size(n, rate);
                assert!((1..=n).contains(&k), "n={n} rate={rate} k={k}");
            }
        }
    }
}
