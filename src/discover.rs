// Route discovery: directory walk and file-path-to-URL derivation

use crate::Error;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Collect every route source file beneath `root`, recursively.
///
/// When `extensions` is non-empty only files carrying one of those
/// extensions are treated as route sources; an empty list accepts every
/// file. Ordering is whatever the walk yields - callers must not rely on
/// it, which is why overlapping routes should carry distinct weights.
pub fn scan_route_files(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => Error::Io(io),
            None => Error::Io(std::io::Error::other("walk cycle detected")),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if !extensions.is_empty() {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !extensions.iter().any(|allowed| allowed == ext) {
                continue;
            }
        }
        files.push(path);
    }
    debug!(root = %root.display(), count = files.len(), "scanned route files");
    Ok(files)
}

/// Derive a URL pattern from a route file's path beneath the routes root.
///
/// Rules, in order: strip the root prefix; strip the final component's
/// source extension; drop every segment literally named `index` at any
/// depth; translate bracketed segments `[name]` to `:name` parameters;
/// an empty result is the root pattern `/`.
///
/// A derived pattern containing `?` is rejected: optional parameters
/// cannot be ranked unambiguously against static routes, so they are
/// unsupported in filenames.
pub fn derive_uri_path(root: &Path, file: &Path) -> Result<String, Error> {
    let relative = file
        .strip_prefix(root)
        .map_err(|_| Error::OutsideRoot {
            path: file.to_path_buf(),
        })?;

    // A silently dropped component would produce a pattern that collides
    // with its UTF-8 sibling while evading the duplicate check.
    let components: Vec<&str> = relative
        .iter()
        .map(|c| {
            c.to_str().ok_or_else(|| Error::NonUtf8Path {
                path: file.to_path_buf(),
            })
        })
        .collect::<Result<_, _>>()?;

    let mut segments: Vec<String> = Vec::with_capacity(components.len());
    for (i, component) in components.iter().copied().enumerate() {
        let last = i + 1 == components.len();
        let name = if last {
            // Only the final component carries a source extension.
            match component.rsplit_once('.') {
                Some((stem, _ext)) if !stem.is_empty() => stem,
                _ => component,
            }
        } else {
            component
        };

        if name == "index" {
            continue;
        }

        segments.push(translate_segment(name));
    }

    let uri_path = if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    };

    if uri_path.contains('?') {
        return Err(Error::UnsupportedPattern {
            pattern: uri_path,
            source_path: file.to_path_buf(),
        });
    }

    Ok(uri_path)
}

/// Bracketed filename segments are the on-disk spelling of parameters:
/// `[id]` becomes `:id`. Anything else passes through untouched.
fn translate_segment(segment: &str) -> String {
    match segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        Some(inner) if !inner.is_empty() => format!(":{inner}"),
        _ => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn root() -> PathBuf {
        PathBuf::from("/srv/routes")
    }

    #[test]
    fn test_plain_file() {
        let uri = derive_uri_path(&root(), Path::new("/srv/routes/about.rs")).unwrap();
        assert_eq!(uri, "/about");
    }

    #[test]
    fn test_root_index_maps_to_slash() {
        let uri = derive_uri_path(&root(), Path::new("/srv/routes/index.rs")).unwrap();
        assert_eq!(uri, "/");
    }

    #[test]
    fn test_nested_index_collapses() {
        let uri = derive_uri_path(&root(), Path::new("/srv/routes/users/index.rs")).unwrap();
        assert_eq!(uri, "/users");
    }

    #[test]
    fn test_index_directory_collapses_at_any_depth() {
        let uri =
            derive_uri_path(&root(), Path::new("/srv/routes/api/index/users.rs")).unwrap();
        assert_eq!(uri, "/api/users");
    }

    #[test]
    fn test_bracket_segment_becomes_param() {
        let uri = derive_uri_path(&root(), Path::new("/srv/routes/users/[id].rs")).unwrap();
        assert_eq!(uri, "/users/:id");
    }

    #[test]
    fn test_bracket_directory_becomes_param() {
        let uri =
            derive_uri_path(&root(), Path::new("/srv/routes/users/[id]/posts.rs")).unwrap();
        assert_eq!(uri, "/users/:id/posts");
    }

    #[test]
    fn test_no_trailing_slash_except_root() {
        let uri = derive_uri_path(&root(), Path::new("/srv/routes/a/b/index.rs")).unwrap();
        assert_eq!(uri, "/a/b");
        assert!(!uri.ends_with('/'));
    }

    #[test]
    fn test_optional_marker_is_rejected() {
        let err =
            derive_uri_path(&root(), Path::new("/srv/routes/users/[id]?.rs")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPattern { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_component_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let file = root().join(OsStr::from_bytes(b"us\xffers")).join("list.rs");
        let err = derive_uri_path(&root(), &file).unwrap_err();
        assert!(matches!(err, Error::NonUtf8Path { .. }));
    }

    #[test]
    fn test_file_outside_root_is_rejected() {
        let err = derive_uri_path(&root(), Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, Error::OutsideRoot { .. }));
    }

    #[test]
    fn test_extension_only_stripped_from_final_component() {
        let uri = derive_uri_path(&root(), Path::new("/srv/routes/v1.2/status.rs")).unwrap();
        assert_eq!(uri, "/v1.2/status");
    }

    #[test]
    fn test_scan_finds_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        fs::write(dir.path().join("index.rs"), "").unwrap();
        fs::write(dir.path().join("users/index.rs"), "").unwrap();
        fs::write(dir.path().join("users/[id].rs"), "").unwrap();

        let files = scan_route_files(dir.path(), &[]).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_scan_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.rs"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let files = scan_route_files(dir.path(), &["rs".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("index.rs"));
    }

    #[test]
    fn test_scan_missing_root_is_an_error() {
        let err = scan_route_files(Path::new("/does/not/exist/ever"), &[]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
