use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::candidate::Candidate;
use crate::clipboard::ClipboardBackend;
use crate::config::{OutputMode, RunOptions};

pub const KUBECONFIG_ENV: &str = "KUBECONFIG";
pub const KUBECONTEXT_ENV: &str = "KUBECONTEXT";

const SELECTED_MARK: &str = "⮺";
const ENTER_MARK: &str = "⇲";
const EXIT_MARK: &str = "⇱";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to launch shell {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: io::Error,
    },
    #[error("clipboard copy is not supported on this {0}")]
    UnsupportedPlatform(String),
    #[error("failed to copy to clipboard: {0}")]
    Clipboard(String),
    #[error("failed to symlink {}: {source}", path.display())]
    Symlink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Performs the configured action for a selected kubeconfig.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pub mode: OutputMode,
    pub quiet: bool,
    pub shell: String,
    pub symlink_path: PathBuf,
    pub clipboard: ClipboardBackend,
}

impl Dispatcher {
    pub fn new(options: &RunOptions) -> Self {
        Self {
            mode: options.mode,
            quiet: options.quiet,
            shell: options.shell.clone(),
            symlink_path: options.symlink_path.clone(),
            clipboard: options.clipboard.clone(),
        }
    }

    pub fn dispatch<W: Write>(&self, candidate: &Candidate, out: &mut W) -> Result<(), DispatchError> {
        debug!(mode = ?self.mode, context = %candidate.label, "dispatching selection");

        match self.mode {
            OutputMode::Subshell => return launch_shell(&self.shell, candidate, self.quiet, out),
            OutputMode::Print => {
                self.announce(candidate, out)?;
                writeln!(out, "{}", export_line(&candidate.source))?;
            }
            OutputMode::Clipboard => {
                self.announce(candidate, out)?;
                out.flush()?;
                self.clipboard.copy_text(&export_line(&candidate.source))?;
            }
            OutputMode::Symlink => {
                self.announce(candidate, out)?;
                symlink_kubeconfig(&self.symlink_path, &candidate.source)?;
            }
        }

        out.flush()?;
        Ok(())
    }

    fn announce<W: Write>(&self, candidate: &Candidate, out: &mut W) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(out, "{SELECTED_MARK} {}", candidate.label)
    }
}

/// `export KUBECONFIG='<path>'`, quoted for POSIX shells.
pub fn export_line(source: &Path) -> String {
    let path = source.display().to_string().replace('\'', r"'\''");
    format!("export {KUBECONFIG_ENV}='{path}'")
}

/// Runs an interactive `shell` with the selection exported and waits for it.
///
/// The variables are set on the child only; this process never reads them
/// back. The shell's own exit status is not an error.
pub fn launch_shell<W: Write>(
    shell: &str,
    candidate: &Candidate,
    quiet: bool,
    out: &mut W,
) -> Result<(), DispatchError> {
    if !quiet {
        writeln!(out, "{ENTER_MARK} {}", candidate.label)?;
    }
    out.flush()?;

    let status = Command::new(shell)
        .env(KUBECONFIG_ENV, &candidate.source)
        .env(KUBECONTEXT_ENV, &candidate.label)
        .status()
        .map_err(|source| DispatchError::Spawn {
            shell: shell.to_string(),
            source,
        })?;
    if !status.success() {
        info!(%status, "subshell exited unsuccessfully");
    }

    if !quiet {
        writeln!(out, "{EXIT_MARK} {}", candidate.label)?;
    }
    out.flush()?;
    Ok(())
}

/// Replaces the symlink at `link` with one pointing at `target`.
///
/// A regular file at `link` is left alone and reported as an error.
pub fn symlink_kubeconfig(link: &Path, target: &Path) -> Result<(), DispatchError> {
    let symlink_error = |source| DispatchError::Symlink {
        path: link.to_path_buf(),
        source,
    };

    if let Some(parent) = link.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(symlink_error)?;
    }

    match fs::symlink_metadata(link) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            fs::remove_file(link).map_err(symlink_error)?;
        }
        Ok(_) => {
            return Err(symlink_error(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "refusing to replace a file that is not a symlink",
            )));
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(symlink_error(error)),
    }

    let target = std::path::absolute(target).map_err(symlink_error)?;
    create_symlink(&target, link).map_err(symlink_error)?;
    debug!(link = %link.display(), target = %target.display(), "kubeconfig symlink updated");
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
