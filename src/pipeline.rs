//! Upload pipeline: sanitize the client filename, run the rules, then move
//! the staged bytes into place without ever replacing an existing file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::Config;
use crate::errors::{LocationError, UploadError};
use crate::rules::{RuleViolation, UploadCandidate, ValidationRule, evaluate};
use crate::sanitize::{SanitizeOptions, sanitize_filename};
use crate::state::detect_media_kind;
use crate::thumbnails::public_url;
use crate::utils::{relative_url_path, resolve_sub_path};

const STAGING_PREFIX: &str = ".upload-";

/// Uploaded bytes waiting in a temporary file in the location root.
/// Dropping it removes the temporary file.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    size: u64,
}

impl StagedUpload {
    /// Create the empty temporary file that incoming bytes are written to.
    /// `dir` must be on the same filesystem as the destination so the final
    /// move is a rename. The dot-prefixed name keeps it out of listings.
    pub fn create_in(dir: &Path) -> Result<NamedTempFile, UploadError> {
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(dir)
            .map_err(UploadError::Staging)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(UploadError::Staging)?;
        }

        Ok(file)
    }

    pub fn new(file: NamedTempFile, size: u64) -> Self {
        Self { file, size }
    }

    #[cfg(test)]
    pub fn from_bytes(dir: &Path, bytes: &[u8]) -> Result<Self, UploadError> {
        use std::io::Write;

        let mut file = Self::create_in(dir)?;
        file.write_all(bytes).map_err(UploadError::Staging)?;
        file.flush().map_err(UploadError::Staging)?;
        Ok(Self::new(file, bytes.len() as u64))
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[derive(Debug)]
pub struct UploadRequest {
    /// Filename as sent by the client. Untrusted.
    pub file_name: String,
    pub staged: StagedUpload,
}

/// Where an upload goes: `dir` is always `root` or below it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    root: PathBuf,
    dir: PathBuf,
}

impl UploadTarget {
    pub fn new(root: impl Into<PathBuf>, sub_path: &str) -> Result<Self, LocationError> {
        let root = root.into();
        let dir = resolve_sub_path(&root, sub_path)?;
        Ok(Self { root, dir })
    }

    /// The location root. Staging happens here, never in the client
    /// supplied sub-path, so a rejected upload creates no directories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the target directory if needed.
    pub fn prepare(&self) -> Result<(), UploadError> {
        fs::create_dir_all(&self.dir).map_err(|source| UploadError::TargetDirectory {
            path: self.dir.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub rules: Vec<ValidationRule>,
    pub sanitize: SanitizeOptions,
    pub thumbnail_profile: String,
}

impl UploadPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rules: config.upload_rules(),
            sanitize: config.sanitize_options(),
            thumbnail_profile: config.image.thumbnail.clone(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum UploadOutcome {
    Success { stored_path: PathBuf, public_url: String },
    /// Nothing was written below the location root.
    Rejected { messages: Vec<RuleViolation> },
}

pub fn process(
    request: UploadRequest,
    target: &UploadTarget,
    policy: &UploadPolicy,
) -> Result<UploadOutcome, UploadError> {
    let name = sanitize_filename(&request.file_name, policy.sanitize);
    let candidate = UploadCandidate {
        name: &name,
        size: request.staged.size(),
    };

    let violations = evaluate(&candidate, &policy.rules);
    if !violations.is_empty() {
        tracing::warn!(
            "Rejected upload {} ({} bytes): {} rule violation(s)",
            name,
            request.staged.size(),
            violations.len()
        );
        return Ok(UploadOutcome::Rejected {
            messages: violations,
        });
    }

    target.prepare()?;
    let file_name = name.to_string();
    let stored_path = target.dir.join(&file_name);

    // persist_noclobber fails instead of replacing, so the existence check
    // and the move are a single filesystem operation.
    if let Err(err) = request.staged.file.persist_noclobber(&stored_path) {
        if err.error.kind() == io::ErrorKind::AlreadyExists {
            tracing::warn!("Rejected upload {}: file already exists", file_name);
            return Ok(UploadOutcome::Rejected {
                messages: vec![RuleViolation::AlreadyExists { name: file_name }],
            });
        }
        return Err(UploadError::Persist {
            path: stored_path,
            source: err.error,
        });
    }

    let relative = relative_url_path(&target.root, &stored_path).unwrap_or(file_name);
    let public_url = public_url(
        detect_media_kind(name.extension()),
        &policy.thumbnail_profile,
        &relative,
    );

    Ok(UploadOutcome::Success {
        stored_path,
        public_url,
    })
}
