use crate::errors::LocationError;
use humansize::{BINARY, format_size};
use std::path::{Component, Path, PathBuf};

/// Resolve a client supplied sub-path below `base`.
///
/// Root and prefix components are ignored so an absolute-looking path is
/// still taken relative to `base`. A `..` that would climb above `base` is
/// rejected instead of being clamped.
pub fn resolve_sub_path(base: &Path, user_path: &str) -> Result<PathBuf, LocationError> {
    let mut virtual_depth = 0usize;
    let mut resolved_path = PathBuf::new();

    for component in Path::new(user_path).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => continue,
            Component::ParentDir => {
                if virtual_depth == 0 {
                    return Err(LocationError::Traversal(user_path.to_string()));
                }
                resolved_path.pop();
                virtual_depth -= 1;
            }
            Component::Normal(component) => {
                resolved_path.push(component);
                virtual_depth += 1;
            }
        }
    }

    Ok(base.join(resolved_path))
}

/// Human readable byte count, binary units with one decimal (`1.5 KiB`).
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, BINARY.decimal_places(1))
}

/// Path relative to `root` with `/` separators, as used in public URLs.
pub fn relative_url_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_sub_path() {
        let base = Path::new("uploads");

        assert_eq!(resolve_sub_path(base, ""), Ok(PathBuf::from("uploads")));
        assert_eq!(
            resolve_sub_path(base, "2024/march"),
            Ok(PathBuf::from("uploads/2024/march"))
        );
        assert_eq!(
            resolve_sub_path(base, "/2024/./march/"),
            Ok(PathBuf::from("uploads/2024/march"))
        );
        assert_eq!(
            resolve_sub_path(base, "2024/../2025"),
            Ok(PathBuf::from("uploads/2025"))
        );
    }

    #[test]
    fn test_resolve_sub_path_rejects_traversal() {
        let base = Path::new("uploads");

        assert_eq!(
            resolve_sub_path(base, "../etc"),
            Err(LocationError::Traversal("../etc".to_string()))
        );
        assert!(resolve_sub_path(base, "a/../../etc/passwd").is_err());
        assert!(resolve_sub_path(base, "/../secret").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
    }

    #[test]
    fn test_relative_url_path() {
        let root = Path::new("/srv/files");

        assert_eq!(
            relative_url_path(root, Path::new("/srv/files/2024/cat.png")),
            Some("2024/cat.png".to_string())
        );
        assert_eq!(relative_url_path(root, Path::new("/srv/files")), None);
        assert_eq!(relative_url_path(root, Path::new("/elsewhere/cat.png")), None);
    }
}
