//! Label generation for feedback text.
//!
//! A [`Labeler`] talks to an external service; [`generate_label`] wraps any
//! labeler with a timeout, delimiter padding and the [`UNKNOWN_LABEL`]
//! fallback so callers never see an error for a single text.

pub mod chat;
pub mod coze;
pub mod error;
pub mod labeler;

use serde::{Deserialize, Serialize};

pub use chat::{ChatConfig, ChatLabeler};
pub use coze::{CozeConfig, CozeLabeler};
pub use error::LabelError;
pub use labeler::{LABEL_DELIMITER, Labeler, UNKNOWN_LABEL, generate_label, pad_label};

/// Labeler backend selection, as read from a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LabelerConfig {
    Openai(ChatConfig),
    Coze(CozeConfig),
}

impl Default for LabelerConfig {
    fn default() -> Self {
        LabelerConfig::Openai(ChatConfig::default())
    }
}

impl LabelerConfig {
    pub fn build(self) -> Result<Box<dyn Labeler>, LabelError> {
        Ok(match self {
            LabelerConfig::Openai(cfg) => Box::new(ChatLabeler::new(cfg)?),
            LabelerConfig::Coze(cfg) => Box::new(CozeLabeler::new(cfg)?),
        })
    }
}
