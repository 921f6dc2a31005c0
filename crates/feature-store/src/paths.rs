use std::path::{Component, Path, PathBuf};

/// Raw feature store, kept next to the media it describes.
pub const RAW_STORE_FILE_NAME: &str = "raw_features.json";
/// Compressed library, the artifact mirrored to the playback device.
pub const LIBRARY_FILE_NAME: &str = "library.json";
/// Optional per-library configuration file.
pub const CONFIG_FILE_NAME: &str = "pipod.toml";

#[must_use]
pub fn raw_store_path_for_root(root: &Path) -> PathBuf {
    root.join(RAW_STORE_FILE_NAME)
}

#[must_use]
pub fn library_path_for_root(root: &Path) -> PathBuf {
    root.join(LIBRARY_FILE_NAME)
}

#[must_use]
pub fn is_pipod_artifact_name(name: &str) -> bool {
    name == RAW_STORE_FILE_NAME
        || name == LIBRARY_FILE_NAME
        || name == CONFIG_FILE_NAME
        || name.ends_with(".json.tmp")
}

/// Turn an absolute or root-prefixed path into the store key form: relative to `root`,
/// `/`-separated, no `.` components. Returns `None` for paths outside `root` and for
/// names that are not valid UTF-8, which could not round-trip back to the file.
#[must_use]
pub fn normalize_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Basename of a store key.
#[must_use]
pub fn key_basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_nested_keys() {
        let root = Path::new("/music");
        assert_eq!(
            normalize_key(root, Path::new("/music/Artist/./song.mp3")).as_deref(),
            Some("Artist/song.mp3")
        );
        assert_eq!(normalize_key(root, Path::new("/music")), None);
        assert_eq!(normalize_key(root, Path::new("../escape.mp3")), None);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_components_have_no_key() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/music");
        let path = root.join("Artist").join(OsStr::from_bytes(b"bad\xff.mp3"));
        assert_eq!(normalize_key(root, &path), None);
    }

    #[test]
    fn basename_of_key() {
        assert_eq!(key_basename("a/b/Song.flac"), "Song.flac");
        assert_eq!(key_basename("top.mp3"), "top.mp3");
    }
}
