//! Inline fuzzy-selection picker.
//!
//! - `options`: fzf-style option parsing (`--height=40%`, `--bind=tab:toggle-preview`, ...).
//! - `state`: candidate buffer, query editing, fuzzy ranking and cursor movement.
//! - `preview`: placeholder expansion and preview command execution.
//! - `terminal`: the interactive event loop rendered inline on stderr.
//!
//! Candidates arrive on a channel while the picker is already running; the
//! accepted line, if any, is sent on the output channel after the terminal
//! has been restored.

pub mod error;
pub mod options;
pub mod preview;
pub mod state;
pub mod terminal;

pub use error::PickerError;
pub use options::{Action, Height, KeyBinding, Layout, PickerOptions, PreviewPosition, PreviewWindow};
pub use state::PickerState;
pub use terminal::run;
