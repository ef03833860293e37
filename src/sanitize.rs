use deunicode::deunicode;
use std::fmt;

const MAX_STEM_LEN: usize = 200;
const MAX_EXTENSION_LEN: usize = 16;
const FALLBACK_STEM: &str = "unnamed";

#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizeOptions {
    /// Fold the stem to lower case. The extension is always lower-cased.
    pub lowercase: bool,
}

/// A filename that is safe to use both on disk and inside a public URL.
///
/// The stem only holds ASCII alphanumerics separated by single hyphens, the
/// extension only lower-case ASCII alphanumerics. Neither can contain a dot
/// or a path separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedFilename {
    stem: String,
    extension: String,
}

impl SanitizedFilename {
    #[cfg(test)]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl fmt::Display for SanitizedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extension.is_empty() {
            f.write_str(&self.stem)
        } else {
            write!(f, "{}.{}", self.stem, self.extension)
        }
    }
}

/// Turn an untrusted client filename into a flat, slugged filename.
///
/// Only the last path component is considered, so `../../etc/passwd` ends up
/// as `passwd`. The result is stable under repeated application.
pub fn sanitize_filename(raw: &str, options: SanitizeOptions) -> SanitizedFilename {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let (stem, extension) = match base.rfind('.') {
        Some(idx) => (&base[..idx], &base[idx + 1..]),
        None => (base, ""),
    };

    let mut stem = slugify_stem(stem, options.lowercase);
    stem.truncate(MAX_STEM_LEN);
    while stem.ends_with('-') {
        stem.pop();
    }
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }

    let mut extension = slugify_extension(extension);
    extension.truncate(MAX_EXTENSION_LEN);

    SanitizedFilename { stem, extension }
}

// Runs of anything outside [A-Za-z0-9] collapse into one hyphen; leading and
// trailing runs are dropped.
fn slugify_stem(input: &str, lowercase: bool) -> String {
    let ascii = deunicode(input);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(if lowercase { ch.to_ascii_lowercase() } else { ch });
        } else {
            pending_separator = true;
        }
    }

    slug
}

fn slugify_extension(input: &str) -> String {
    deunicode(input)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(raw: &str) -> String {
        sanitize_filename(raw, SanitizeOptions::default()).to_string()
    }

    #[test]
    fn test_slugs_stem_and_lowercases_extension() {
        assert_eq!(sanitize("My Report (final).PDF"), "My-Report-final.pdf");
        assert_eq!(sanitize("photo.PNG"), "photo.png");
        assert_eq!(sanitize("archive.tar.gz"), "archive-tar.gz");
    }

    #[test]
    fn test_strips_directories() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("..\\..\\windows\\win.ini"), "win.ini");
        assert_eq!(sanitize("uploads/2024/cat.jpg"), "cat.jpg");
    }

    #[test]
    fn test_transliterates_unicode() {
        assert_eq!(sanitize("Crème brûlée.JPG"), "Creme-brulee.jpg");
        assert_eq!(sanitize("Straße.png"), "Strasse.png");
    }

    #[test]
    fn test_extension_keeps_only_alphanumerics() {
        let name = sanitize_filename("evil.p h-p", SanitizeOptions::default());
        assert_eq!(name.extension(), "php");

        let name = sanitize_filename("file.Ĵpg", SanitizeOptions::default());
        assert_eq!(name.extension(), "jpg");
    }

    #[test]
    fn test_hidden_and_empty_names_get_fallback_stem() {
        assert_eq!(sanitize(".htaccess"), "unnamed.htaccess");
        assert_eq!(sanitize(""), "unnamed");
        assert_eq!(sanitize(".."), "unnamed");
        assert_eq!(sanitize("???.png"), "unnamed.png");
        assert_eq!(sanitize("dir/"), "unnamed");
    }

    #[test]
    fn test_missing_extension_has_no_trailing_dot() {
        assert_eq!(sanitize("README"), "README");
        assert_eq!(sanitize("notes."), "notes");
        assert_eq!(sanitize("notes.!!"), "notes");
    }

    #[test]
    fn test_lowercase_option() {
        let options = SanitizeOptions { lowercase: true };
        assert_eq!(
            sanitize_filename("My Holiday.JPEG", options).to_string(),
            "my-holiday.jpeg"
        );
    }

    #[test]
    fn test_truncates_long_names() {
        let raw = format!("{}.{}", "a".repeat(300), "x".repeat(40));
        let name = sanitize_filename(&raw, SanitizeOptions::default());
        assert_eq!(name.stem().len(), MAX_STEM_LEN);
        assert_eq!(name.extension().len(), MAX_EXTENSION_LEN);

        let raw = format!("{} b.txt", "a".repeat(MAX_STEM_LEN - 1));
        let name = sanitize_filename(&raw, SanitizeOptions::default());
        assert!(!name.stem().ends_with('-'));
    }

    #[test]
    fn test_output_is_flat_and_idempotent() {
        let inputs = [
            "",
            ".",
            "..",
            "...",
            "../../etc/passwd",
            "a/b\\c/../d.tar.gz",
            "..\\..\\boot.ini",
            "My Report (final).PDF",
            "  spaced   out  .Txt ",
            "日本語のファイル.png",
            "emoji 🎉 party.gif",
            "multi..dot...name....jpg",
            ".hidden.",
            "trailing-.-.PnG",
            "-leading-hyphen.pdf",
        ];

        for lowercase in [false, true] {
            let options = SanitizeOptions { lowercase };
            for raw in inputs {
                let once = sanitize_filename(raw, options);
                let rendered = once.to_string();

                assert!(!rendered.is_empty(), "{raw:?}");
                assert!(!rendered.contains('/'), "{raw:?} -> {rendered}");
                assert!(!rendered.contains('\\'), "{raw:?} -> {rendered}");
                assert!(!rendered.contains(".."), "{raw:?} -> {rendered}");
                assert!(!rendered.starts_with('.'), "{raw:?} -> {rendered}");
                assert!(
                    once.extension()
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
                    "{raw:?} -> {rendered}"
                );

                let twice = sanitize_filename(&rendered, options);
                assert_eq!(once, twice, "{raw:?}");
            }
        }
    }
}
