use crate::error::McpSyncError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Reads a file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>, McpSyncError> {
    match fs::read_to_string(path) {
        Ok(value) => Ok(Some(value)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(McpSyncError::io(path, error)),
    }
}

/// Writes through a sibling temp file and a rename so readers never observe
/// a half-written config. Existing permissions are carried over.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), McpSyncError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|error| McpSyncError::io(parent, error))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| String::from("config"));
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp = parent.join(format!(".{file_name}.tmp.{nanos}"));

    {
        let mut file = fs::File::create(&tmp).map_err(|error| McpSyncError::io(&tmp, error))?;
        file.write_all(data)
            .map_err(|error| McpSyncError::io(&tmp, error))?;
        file.flush().map_err(|error| McpSyncError::io(&tmp, error))?;
    }

    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&tmp, meta.permissions());
    }

    #[cfg(windows)]
    {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }

    fs::rename(&tmp, path).map_err(|error| {
        let _ = fs::remove_file(&tmp);
        McpSyncError::io(path, error)
    })
}

#[cfg(test)]
mod tests {
    use super::{atomic_write, read_optional};

    #[test]
    fn atomic_write_creates_parents_and_replaces_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.json");
        atomic_write(&path, b"{}\n").expect("first write");
        atomic_write(&path, b"{\"a\":1}\n").expect("second write");
        assert_eq!(
            read_optional(&path).expect("read").as_deref(),
            Some("{\"a\":1}\n")
        );
        let leftovers = std::fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .filter_map(Result::ok)
            .count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn read_optional_maps_missing_to_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(read_optional(&temp.path().join("absent.json"))
            .expect("read")
            .is_none());
    }
}
