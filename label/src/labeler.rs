use std::time::Duration;

use tracing::warn;

use crate::error::LabelError;

/// Sentinel returned whenever a label cannot be produced.
pub const UNKNOWN_LABEL: &str = "unknown-unknown-unknown";

/// Separator between the `product-issue-detail` parts of a label.
pub const LABEL_DELIMITER: char = '-';

const UNKNOWN_PART: &str = "unknown";

/// Produces a short `product-issue-detail` label for one feedback text.
#[async_trait::async_trait]
pub trait Labeler: Send + Sync {
    /// Ask the backing service for a label. Errors are surfaced here and
    /// folded into [`UNKNOWN_LABEL`] by [`generate_label`].
    async fn try_generate(&self, text: &str) -> Result<String, LabelError>;

    /// Short backend name used in logs.
    fn name(&self) -> &str;
}

/// Normalize a raw label: trim it, and pad labels missing the delimiter to
/// `unknown-<label>-unknown`. Returns the label and whether it was padded.
pub fn pad_label(raw: &str) -> (String, bool) {
    let label = raw.trim();
    if label.is_empty() {
        return (UNKNOWN_LABEL.to_string(), false);
    }
    if label.contains(LABEL_DELIMITER) {
        return (label.to_string(), false);
    }
    (
        format!("{UNKNOWN_PART}{LABEL_DELIMITER}{label}{LABEL_DELIMITER}{UNKNOWN_PART}"),
        true,
    )
}

/// Generate a label for `text`, never failing.
///
/// Empty input, backend errors and timeouts all yield [`UNKNOWN_LABEL`].
pub async fn generate_label(labeler: &dyn Labeler, text: &str, timeout: Duration) -> String {
    if text.trim().is_empty() {
        warn!(backend = labeler.name(), "empty content, skipping label generation");
        return UNKNOWN_LABEL.to_string();
    }

    let raw = match tokio::time::timeout(timeout, labeler.try_generate(text)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!(backend = labeler.name(), error = %e, "label generation failed");
            return UNKNOWN_LABEL.to_string();
        }
        Err(_) => {
            warn!(
                backend = labeler.name(),
                timeout_secs = timeout.as_secs(),
                "label generation timed out"
            );
            return UNKNOWN_LABEL.to_string();
        }
    };

    let (label, padded) = pad_label(&raw);
    if padded {
        warn!(backend = labeler.name(), raw = %raw.trim(), %label, "label missing delimiter, padded");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, ()>);

    #[async_trait::async_trait]
    impl Labeler for Fixed {
        async fn try_generate(&self, _text: &str) -> Result<String, LabelError> {
            self.0
                .map(|s| s.to_string())
                .map_err(|_| LabelError::Api("boom".into()))
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Slow;

    #[async_trait::async_trait]
    impl Labeler for Slow {
        async fn try_generate(&self, _text: &str) -> Result<String, LabelError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("app-slow-never".into())
        }
        fn name(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn pad_label_keeps_well_formed() {
        assert_eq!(pad_label("  app-refund-slow \n"), ("app-refund-slow".to_string(), false));
    }

    #[test]
    fn pad_label_pads_missing_delimiter() {
        assert_eq!(pad_label("refund"), ("unknown-refund-unknown".to_string(), true));
    }

    #[test]
    fn pad_label_empty_is_unknown() {
        assert_eq!(pad_label("   "), (UNKNOWN_LABEL.to_string(), false));
    }

    #[tokio::test]
    async fn generate_label_ok() {
        let l = Fixed(Ok("app-login-timeout"));
        let got = generate_label(&l, "cannot log in", Duration::from_secs(1)).await;
        assert_eq!(got, "app-login-timeout");
    }

    #[tokio::test]
    async fn generate_label_error_is_unknown() {
        let l = Fixed(Err(()));
        let got = generate_label(&l, "anything", Duration::from_secs(1)).await;
        assert_eq!(got, UNKNOWN_LABEL);
    }

    #[tokio::test]
    async fn generate_label_empty_input_is_unknown() {
        let l = Fixed(Ok("should-not-be-used"));
        let got = generate_label(&l, "  ", Duration::from_secs(1)).await;
        assert_eq!(got, UNKNOWN_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_label_timeout_is_unknown() {
        let got = generate_label(&Slow, "anything", Duration::from_secs(30)).await;
        assert_eq!(got, UNKNOWN_LABEL);
    }

    #[tokio::test]
    async fn generate_label_pads_missing_delimiter() {
        let l = Fixed(Ok("refund"));
        let got = generate_label(&l, "refund pls", Duration::from_secs(1)).await;
        assert_eq!(got, "unknown-refund-unknown");
    }
}
