use crate::config::Config;
use crate::thumbnails::{ThumbnailPaths, Thumbnailer};
use std::sync::Arc;

pub const IMAGE_TYPES: &[&str] = &["gif", "png", "jpg", "jpeg", "svg", "avif", "webp"];
pub const FILE_TYPES: &[&str] = &["doc", "docx", "txt", "pdf", "xls", "xlsx", "zip", "tgz", "gz"];

#[derive(Clone, Debug, PartialEq, Eq, Copy)]
pub enum MediaKind {
    Image,
    Generic,
}

impl MediaKind {
    /// Extensions shown by the listing for this kind.
    pub fn listing_types(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_TYPES,
            MediaKind::Generic => FILE_TYPES,
        }
    }
}

pub fn detect_media_kind(extension: &str) -> MediaKind {
    if IMAGE_TYPES.contains(&extension) {
        MediaKind::Image
    } else {
        MediaKind::Generic
    }
}

/// Read-only state shared by every request.
pub struct AppState {
    pub config: Config,
    pub thumbnailer: Arc<dyn Thumbnailer>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            thumbnailer: Arc::new(ThumbnailPaths),
        }
    }
}

pub type SharedState = Arc<AppState>;
