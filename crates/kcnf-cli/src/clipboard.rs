use std::io::{self, Write};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::dispatch::DispatchError;

/// Clipboard mechanism chosen once at startup from the platform and, on
/// Linux, the display-server session type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardBackend {
    /// A program that reads the clipboard contents from stdin.
    Program { program: String, args: Vec<String> },
    Unsupported { reason: String },
}

impl ClipboardBackend {
    pub fn detect(os: &str, session_type: &str) -> Self {
        match (os, session_type) {
            ("macos", _) => Self::program("pbcopy", &[]),
            ("windows", _) => Self::program("clip", &[]),
            ("linux", "x11") => Self::program("xsel", &["--input", "--clipboard", "--trim"]),
            ("linux", "wayland") => Self::program("wl-copy", &["--trim-newline"]),
            ("linux", session) => Self::Unsupported {
                reason: format!("session type {session}"),
            },
            (platform, _) => Self::Unsupported {
                reason: format!("platform {platform}"),
            },
        }
    }

    pub fn program(program: &str, args: &[&str]) -> Self {
        Self::Program {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn copy_text(&self, text: &str) -> Result<(), DispatchError> {
        let (program, args) = match self {
            Self::Program { program, args } => (program, args),
            Self::Unsupported { reason } => {
                return Err(DispatchError::UnsupportedPlatform(reason.clone()));
            }
        };
        debug!(program = %program, "copying to clipboard");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|error| {
                let message = if error.kind() == io::ErrorKind::NotFound {
                    format!("failed to locate clipboard program {program}")
                } else {
                    format!("failed to start {program}: {error}")
                };
                DispatchError::Clipboard(message)
            })?;

        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Err(io::Error::other("stdin was not captured")),
        };

        let status = child
            .wait()
            .map_err(|error| DispatchError::Clipboard(format!("failed to wait for {program}: {error}")))?;
        written.map_err(|error| {
            DispatchError::Clipboard(format!("failed to write to {program}: {error}"))
        })?;

        if !status.success() {
            return Err(DispatchError::Clipboard(format!("{program} exited with {status}")));
        }
        Ok(())
    }
}
