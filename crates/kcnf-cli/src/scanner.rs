use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::candidate::Candidate;

/// Files above this size are not kubeconfigs worth parsing.
pub const MAX_CONFIG_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Debug, Deserialize)]
struct KubeconfigHead {
    #[serde(rename = "current-context")]
    current_context: Option<Value>,
}

/// Collects one candidate per file under `directory` that names a
/// non-empty `current-context`. Order is unspecified.
///
/// Paths that are not valid UTF-8 are skipped: the picker exchanges
/// candidates as text and could not hand them back unchanged.
pub fn scan(directory: &Path) -> Result<Vec<Candidate>, ScanError> {
    match fs::symlink_metadata(directory) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(ScanError::NotFound(directory.to_path_buf()));
        }
        Err(source) => {
            return Err(ScanError::Metadata {
                path: directory.to_path_buf(),
                source,
            });
        }
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(directory) {
        let entry = entry.map_err(|source| ScanError::Walk {
            root: directory.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path().to_str().is_none() {
            debug!(path = %entry.path().display(), "skipping path that is not valid UTF-8");
            continue;
        }

        match read_current_context(entry.path()).and_then(|label| Candidate::new(label, entry.path())) {
            Some(candidate) => candidates.push(candidate),
            None => debug!(path = %entry.path().display(), "skipping file without current-context"),
        }
    }

    debug!(count = candidates.len(), directory = %directory.display(), "scan finished");
    Ok(candidates)
}

/// Reads the `current-context` scalar of a kubeconfig, verbatim. Anything
/// that is not a readable YAML mapping with a non-blank scalar there yields
/// `None`.
pub fn read_current_context(path: &Path) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() || metadata.len() > MAX_CONFIG_BYTES {
        return None;
    }

    let body = fs::read_to_string(path).ok()?;
    let document: Value = serde_yaml::from_str(&body).ok()?;
    if !document.is_mapping() {
        return None;
    }
    let head: KubeconfigHead = serde_yaml::from_value(document).ok()?;

    let value = match head.current_context? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };

    (!value.trim().is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, body).expect("write file");
    }

    #[test]
    fn reads_current_context_from_kubeconfig() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("kubeconfig");
        write(
            &path,
            "apiVersion: v1\nkind: Config\ncurrent-context: testing-eu-01\ncontexts: []\n",
        );

        assert_eq!(read_current_context(&path), Some("testing-eu-01".to_string()));
    }

    #[test]
    fn missing_empty_or_unparsable_context_is_absent() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let cases = [
            ("no-field", "apiVersion: v1\nkind: Config\n"),
            ("empty-field", "current-context: \"\"\n"),
            ("null-field", "current-context:\n"),
            ("nested-field", "current-context:\n  name: prod\n"),
            ("not-yaml", "{{{ definitely: [not yaml\n"),
            ("sequence", "- current-context\n"),
            ("plain-text", "just some notes\n"),
            ("empty-file", ""),
        ];

        for (name, body) in cases {
            let path = temp.path().join(name);
            write(&path, body);
            assert_eq!(read_current_context(&path), None, "{name} should be skipped");
        }
    }

    #[test]
    fn scalar_contexts_are_rendered_as_text() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("numeric");
        write(&path, "current-context: 42\n");

        assert_eq!(read_current_context(&path), Some("42".to_string()));
    }

    #[test]
    fn context_is_returned_as_written() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("padded");
        write(&path, "current-context: \" prod \"\n");

        assert_eq!(read_current_context(&path), Some(" prod ".to_string()));
    }

    #[test]
    fn non_utf8_contents_are_absent() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("binary");
        fs::write(&path, b"\xff\xfe\x00junk\ncurrent-context: prod\n").expect("write file");

        assert_eq!(read_current_context(&path), None);
    }

    #[test]
    fn size_limit_is_inclusive() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let header = "current-context: big\n";
        let padded = |len: u64| {
            let filler = usize::try_from(len).expect("fits usize") - header.len() - 1;
            format!("{header}{}\n", "#".repeat(filler))
        };

        let at_limit = temp.path().join("at-limit");
        write(&at_limit, &padded(MAX_CONFIG_BYTES));
        assert_eq!(read_current_context(&at_limit), Some("big".to_string()));

        let over_limit = temp.path().join("over-limit");
        write(&over_limit, &padded(MAX_CONFIG_BYTES + 1));
        assert_eq!(read_current_context(&over_limit), None);
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_paths_that_are_not_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();
        write(&root.join("prod"), "current-context: prod\n");
        let odd = root.join(OsStr::from_bytes(b"prod-\xff"));
        if fs::write(&odd, "current-context: odd\n").is_err() {
            // Filesystem rejects non-UTF-8 names; nothing to skip.
            return;
        }

        let candidates = scan(root).expect("scan should succeed");

        assert_eq!(
            candidates,
            vec![Candidate::new("prod", root.join("prod")).expect("candidate")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn inaccessible_directory_is_not_reported_as_missing() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let locked = temp.path().join("locked");
        let configs = locked.join("configs");
        fs::create_dir_all(&configs).expect("create configs dir");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("lock dir");

        let accessible_anyway = fs::symlink_metadata(&configs).is_ok();
        let result = scan(&configs);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("unlock dir");

        if !accessible_anyway {
            assert!(matches!(result, Err(ScanError::Metadata { path, .. }) if path == configs));
        }
    }

    #[test]
    fn scan_returns_one_candidate_per_usable_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();
        write(&root.join("prod"), "current-context: prod-eu-01\n");
        write(&root.join("nested/deeper/staging"), "current-context: staging-us-01\n");
        write(&root.join("nested/README.md"), "# notes about clusters\n");
        write(&root.join("empty"), "current-context: ''\n");

        let mut candidates = scan(root).expect("scan should succeed");
        crate::candidate::sort_candidates(&mut candidates);

        assert_eq!(
            candidates,
            vec![
                Candidate::new("prod-eu-01", root.join("prod")).expect("candidate"),
                Candidate::new("staging-us-01", root.join("nested/deeper/staging"))
                    .expect("candidate"),
            ]
        );
    }

    #[test]
    fn scan_of_empty_directory_is_empty_not_an_error() {
        let temp = tempfile::tempdir().expect("create temp dir");

        let candidates = scan(temp.path()).expect("empty dir should scan");
        assert!(candidates.is_empty());
    }

    #[test]
    fn scan_of_missing_directory_is_not_found() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let missing = temp.path().join("missing");

        let err = scan(&missing).expect_err("missing dir should fail");
        assert!(matches!(err, ScanError::NotFound(path) if path == missing));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_aborts_the_scan() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let locked = temp.path().join("locked");
        write(&temp.path().join("prod"), "current-context: prod\n");
        fs::create_dir(&locked).expect("create locked dir");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("lock dir");

        // Privileged users can read the directory anyway; nothing to assert then.
        let readable_anyway = fs::read_dir(&locked).is_ok();
        let result = scan(temp.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("unlock dir");

        if !readable_anyway {
            assert!(matches!(result, Err(ScanError::Walk { .. })));
        }
    }
}
