use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PickerError {
    #[error("invalid picker option {option}: {reason}")]
    InvalidOption { option: String, reason: String },
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error("failed to run preview command: {0}")]
    Preview(#[source] io::Error),
}

impl PickerError {
    pub(crate) fn invalid(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
