use thiserror::Error;

use super::links::InvalidLink;
use crate::llm::ChatError;

/// Links quoted in a `BrokenLinks` error message.
pub const BROKEN_LINK_SAMPLE: usize = 3;

#[derive(Error, Debug)]
pub enum IntelError {
    /// Bad generation settings or an unusable override fixture. Never retried.
    #[error("Intel configuration error: {0}")]
    Config(String),

    /// Transport, status or empty-content failure from the chat provider. Never retried.
    #[error(transparent)]
    Upstream(#[from] ChatError),

    #[error("Model reply failed schema validation: {0}")]
    Schema(String),

    #[error("{}", format_broken_links(.sample, .total))]
    BrokenLinks {
        sample: Vec<InvalidLink>,
        total: usize,
    },
}

impl IntelError {
    pub(crate) fn broken_links(invalid: &[InvalidLink]) -> Self {
        IntelError::BrokenLinks {
            sample: invalid.iter().take(BROKEN_LINK_SAMPLE).cloned().collect(),
            total: invalid.len(),
        }
    }
}

fn format_broken_links(sample: &[InvalidLink], total: &usize) -> String {
    let listed = sample
        .iter()
        .map(|link| format!("{} ({})", link.url, link.reason))
        .collect::<Vec<_>>()
        .join("; ");
    format!("Generated intel contains {total} unreachable URL(s): {listed}")
}
