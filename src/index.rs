//! Point-in-time listings of a location, used by the editor's image and file
//! pickers.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::errors::IndexError;
use crate::state::MediaKind;
use crate::thumbnails::{Fit, Thumbnailer, public_url};
use crate::utils::{format_bytes, relative_url_path};

/// Deepest directory level that is listed; 0 is the root itself.
pub const MAX_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    /// `/`-separated path relative to the listed root.
    pub relative_path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDetail {
    Thumbnail(String),
    Size(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub relative_path: String,
    pub url: String,
    pub detail: EntryDetail,
}

// Images serialize as {thumb, url}, other files as {title, url, size}.
impl Serialize for ListingEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.detail {
            EntryDetail::Thumbnail(thumb) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("thumb", thumb)?;
                map.serialize_entry("url", &self.url)?;
                map.end()
            }
            EntryDetail::Size(size) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("title", &self.relative_path)?;
                map.serialize_entry("url", &self.url)?;
                map.serialize_entry("size", size)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingOptions<'a> {
    pub kind: MediaKind,
    pub max_depth: usize,
    pub thumbnail_profile: &'a str,
    pub thumb_width: u32,
    pub thumb_height: u32,
}

fn log_and_skip_walkdir_err(result: Result<DirEntry, walkdir::Error>) -> Option<DirEntry> {
    match result {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Skipping unreadable entry while listing: {}", e);
            None
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

// Directories first, then by file name.
fn directories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.file_type()
        .is_dir()
        .cmp(&a.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Regular files under `root`, at most `max_depth` directories deep, whose
/// extension (case-insensitive) is in `extensions`.
///
/// Hidden entries are skipped and symlinks are not followed. Entries that
/// cannot be read are logged and skipped; only an unusable root is an error.
pub fn index_files(
    root: &Path,
    max_depth: usize,
    extensions: &[&str],
) -> Result<Vec<IndexedFile>, IndexError> {
    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => IndexError::RootNotFound(root.to_path_buf()),
        _ => IndexError::IoError(e),
    })?;
    if !metadata.is_dir() {
        return Err(IndexError::NotADirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth + 1)
        .sort_by(directories_first)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    let mut files = Vec::new();
    for entry in walker.filter_map(log_and_skip_walkdir_err) {
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let Some(relative_path) = relative_url_path(root, entry.path()) else {
            warn!("Skipping non UTF-8 path while listing: {}", entry.path().display());
            continue;
        };

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };

        files.push(IndexedFile {
            relative_path,
            size,
        });
    }

    Ok(files)
}

pub fn list_files(
    root: &Path,
    options: &ListingOptions<'_>,
    thumbnailer: &dyn Thumbnailer,
) -> Result<Vec<ListingEntry>, IndexError> {
    let files = index_files(root, options.max_depth, options.kind.listing_types())?;

    let entries = files
        .into_iter()
        .map(|file| {
            let url = public_url(options.kind, options.thumbnail_profile, &file.relative_path);
            let detail = match options.kind {
                MediaKind::Image => EntryDetail::Thumbnail(thumbnailer.thumbnail_url(
                    &file.relative_path,
                    options.thumb_width,
                    options.thumb_height,
                    Fit::Crop,
                )),
                MediaKind::Generic => EntryDetail::Size(format_bytes(file.size)),
            };

            ListingEntry {
                relative_path: file.relative_path,
                url,
                detail,
            }
        })
        .collect();

    Ok(entries)
}
