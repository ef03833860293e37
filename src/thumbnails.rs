use crate::state::MediaKind;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

// Characters that may not appear raw inside a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// How a thumbnail fills its box. Listings only ever ask for crops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fit {
    Crop,
}

impl Fit {
    pub fn code(self) -> &'static str {
        match self {
            Fit::Crop => "c",
        }
    }
}

/// Produces thumbnail URLs. Rendering the thumbnail happens elsewhere.
pub trait Thumbnailer: Send + Sync {
    fn thumbnail_url(&self, relative_path: &str, width: u32, height: u32, fit: Fit) -> String;
}

/// `/thumbs/<w>×<h>×<fit>/<path>` URLs.
pub struct ThumbnailPaths;

impl Thumbnailer for ThumbnailPaths {
    fn thumbnail_url(&self, relative_path: &str, width: u32, height: u32, fit: Fit) -> String {
        format!(
            "/thumbs/{}×{}×{}/{}",
            width,
            height,
            fit.code(),
            encode_path(relative_path)
        )
    }
}

/// Percent-encode every `/`-separated segment of a relative path.
pub fn encode_path(relative_path: &str) -> String {
    relative_path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Public URL of a stored file: images go through the thumbnail profile,
/// everything else is served from `/files/`.
pub fn public_url(kind: MediaKind, thumbnail_profile: &str, relative_path: &str) -> String {
    match kind {
        MediaKind::Image => format!("/thumbs/{}/{}", thumbnail_profile, encode_path(relative_path)),
        MediaKind::Generic => format!("/files/{}", encode_path(relative_path)),
    }
}
