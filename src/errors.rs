use std::path::PathBuf;
use thiserror::Error;
use warp::reject::Reject;

/// Failures while mapping a location key and sub-path onto a directory.
#[derive(Error, Debug, PartialEq)]
pub enum LocationError {
    #[error("Unknown location '{0}'")]
    UnknownLocation(String),
    #[error("Path '{0}' points outside of its location")]
    Traversal(String),
}

/// Operational upload failures. Rule violations are not errors, they end up
/// in `UploadOutcome::Rejected`.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to prepare target directory {path}: {source}")]
    TargetDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),
    #[error("Failed to store upload at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors surfaced through warp rejections and turned into JSON by the
/// recover handler.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Access denied")]
    Forbidden,
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("Multipart error")]
    MultipartError,
    #[error("Template rendering error: {0}")]
    RenderError(#[from] askama::Error),
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl Reject for AppError {}
