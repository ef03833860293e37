use crate::sanitize::SanitizedFilename;
use crate::utils::format_bytes;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_LABEL: &str = "Upload file";

/// What the rules get to see of an upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadCandidate<'a> {
    pub name: &'a SanitizedFilename,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// Passes when the extension is one of `allowed` (exact, case-sensitive).
    Extension { allowed: Vec<String>, label: String },
    /// Passes when the upload is at most `max_bytes` long.
    Size { max_bytes: u64, label: String },
}

impl ValidationRule {
    pub fn extension<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValidationRule::Extension {
            allowed: allowed.into_iter().map(Into::into).collect(),
            label: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn size(max_bytes: u64) -> Self {
        ValidationRule::Size {
            max_bytes,
            label: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn evaluate(&self, candidate: &UploadCandidate<'_>) -> Option<RuleViolation> {
        match self {
            ValidationRule::Extension { allowed, label } => {
                let extension = candidate.name.extension();
                if allowed.iter().any(|ext| ext == extension) {
                    None
                } else {
                    Some(RuleViolation::Extension {
                        label: label.clone(),
                        allowed: allowed.clone(),
                    })
                }
            }
            ValidationRule::Size { max_bytes, label } => {
                if candidate.size <= *max_bytes {
                    None
                } else {
                    Some(RuleViolation::Size {
                        label: label.clone(),
                        max_bytes: *max_bytes,
                    })
                }
            }
        }
    }
}

/// A failed check. Carries the parameters of its message rather than the
/// rendered text; `Display` gives the default English wording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleViolation {
    Extension { label: String, allowed: Vec<String> },
    Size { label: String, max_bytes: u64 },
    AlreadyExists { name: String },
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleViolation::Extension { label, allowed } => write!(
                f,
                "The file for field '{}' was not uploaded. It should be a valid file type. Allowed are {}.",
                label,
                allowed.join(", ")
            ),
            RuleViolation::Size { label, max_bytes } => write!(
                f,
                "The file for field '{}' was not uploaded. The upload can have a maximum filesize of {}.",
                label,
                format_bytes(*max_bytes)
            ),
            RuleViolation::AlreadyExists { name } => write!(
                f,
                "The file '{}' was not uploaded. A file with that name already exists.",
                name
            ),
        }
    }
}

/// Run every rule, in order, and collect all violations. An empty result
/// means the candidate is accepted.
pub fn evaluate(candidate: &UploadCandidate<'_>, rules: &[ValidationRule]) -> Vec<RuleViolation> {
    rules
        .iter()
        .filter_map(|rule| rule.evaluate(candidate))
        .collect()
}
