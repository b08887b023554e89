use std::path::PathBuf;

use kcnf_picker::PickerError;
use thiserror::Error;

use crate::candidate::MalformedLine;
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::scanner::ScanError;

/// Failures of the interactive selection step.
#[derive(Debug, Error)]
pub enum UiError {
    #[error(transparent)]
    Picker(#[from] PickerError),
    #[error(transparent)]
    MalformedSelection(#[from] MalformedLine),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("directory does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("no kubeconfigs with a current-context found in {}", .0.display())]
    NoCandidates(PathBuf),
    #[error(transparent)]
    Scan(ScanError),
    #[error("selection failed: {0}")]
    Ui(#[from] UiError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<ScanError> for AppError {
    fn from(error: ScanError) -> Self {
        match error {
            ScanError::NotFound(path) => Self::NotFound(path),
            other => Self::Scan(other),
        }
    }
}

impl From<PickerError> for AppError {
    fn from(error: PickerError) -> Self {
        Self::Ui(UiError::Picker(error))
    }
}

impl From<MalformedLine> for AppError {
    fn from(error: MalformedLine) -> Self {
        Self::Ui(UiError::MalformedSelection(error))
    }
}
