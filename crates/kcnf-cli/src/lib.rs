//! Kubeconfig context switcher.
//!
//! - `config`: run options resolved from defaults, environment and flags.
//! - `scanner`: kubeconfig discovery and `current-context` extraction.
//! - `candidate`: the (context, kubeconfig) pair and its channel encoding.
//! - `selector`: picker configuration and the selection seam.
//! - `pipeline`: producer/consumer threads around the interactive picker.
//! - `dispatch`: subshell, print, clipboard and symlink actions.

pub mod candidate;
pub mod clipboard;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod scanner;
pub mod selector;

pub use candidate::{Candidate, sort_candidates};
pub use config::{ConfigError, OutputMode, Overrides, RunOptions};
pub use dispatch::{DispatchError, Dispatcher};
pub use error::{AppError, UiError};
pub use pipeline::Selector;
pub use scanner::{ScanError, scan};
