use std::path::PathBuf;

use thiserror::Error;

const FIELD_SEPARATOR: char = '\t';

/// A kubeconfig file and the context it currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub source: PathBuf,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed selection line: {0:?}")]
pub struct MalformedLine(pub String);

impl Candidate {
    /// Returns `None` for an empty or whitespace-only label. Other labels are
    /// kept as written.
    pub fn new(label: impl Into<String>, source: impl Into<PathBuf>) -> Option<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return None;
        }

        Some(Self {
            label,
            source: source.into(),
        })
    }

    /// Encodes the candidate as a picker line: `label<TAB>source`.
    pub fn to_line(&self) -> String {
        format!("{}{FIELD_SEPARATOR}{}", self.label, self.source.to_string_lossy())
    }

    pub fn from_line(line: &str) -> Result<Self, MalformedLine> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let (label, source) = line
            .split_once(FIELD_SEPARATOR)
            .ok_or_else(|| MalformedLine(line.to_string()))?;

        Candidate::new(label, source)
            .filter(|candidate| !candidate.source.as_os_str().is_empty())
            .ok_or_else(|| MalformedLine(line.to_string()))
    }
}

/// Orders candidates by label, then by source path for equal labels.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|left, right| {
        left.label
            .cmp(&right.label)
            .then_with(|| left.source.cmp(&right.source))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_encoding_round_trips_label_and_source() {
        let candidate = Candidate::new(
            "testing-eu-01",
            "/home/johndoe/.kube/configs/testing eu 01.yaml",
        )
        .expect("label is non-empty");

        let line = candidate.to_line();
        assert_eq!(
            line,
            "testing-eu-01\t/home/johndoe/.kube/configs/testing eu 01.yaml"
        );
        assert_eq!(Candidate::from_line(&line), Ok(candidate));
    }

    #[test]
    fn from_line_rejects_lines_without_both_fields() {
        for line in ["no-separator", "\t/path/only", "label-only\t", ""] {
            assert_eq!(
                Candidate::from_line(line),
                Err(MalformedLine(line.to_string())),
                "line {line:?} should be rejected"
            );
        }
    }

    #[test]
    fn empty_labels_are_not_candidates() {
        assert_eq!(Candidate::new("  ", "/tmp/config"), None);
    }

    #[test]
    fn labels_keep_surrounding_whitespace() {
        let candidate = Candidate::new(" prod ", "/tmp/config").expect("label is not blank");
        assert_eq!(candidate.label, " prod ");
    }

    #[test]
    fn sort_orders_by_label_then_source() {
        let mut candidates = vec![
            Candidate::new("staging", "/b").expect("candidate"),
            Candidate::new("dev", "/z").expect("candidate"),
            Candidate::new("staging", "/a").expect("candidate"),
            Candidate::new("prod", "/m").expect("candidate"),
        ];

        sort_candidates(&mut candidates);

        let ordered: Vec<(&str, &str)> = candidates
            .iter()
            .map(|candidate| {
                (
                    candidate.label.as_str(),
                    candidate.source.to_str().expect("utf-8 path"),
                )
            })
            .collect();
        assert_eq!(
            ordered,
            vec![("dev", "/z"), ("prod", "/m"), ("staging", "/a"), ("staging", "/b")]
        );
    }
}
