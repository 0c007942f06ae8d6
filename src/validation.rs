use crate::error::{Result, StorefrontError};
use crate::upload::source::ChunkSource;
use std::path::{Component, Path, PathBuf};

/// Validate that a local path is safe to upload from
///
/// Rejects:
/// - paths with ".." components (checked before canonicalization)
/// - paths that do not resolve
/// - anything that is not a regular file after following symlinks
pub fn validate_local_path(path: &Path) -> Result<PathBuf> {
    for component in path.components() {
        if let Component::ParentDir = component {
            return Err(StorefrontError::Validation(format!(
                "Path contains '..' component: {}",
                path.display()
            )));
        }
    }

    let canonical = path.canonicalize().map_err(|e| {
        StorefrontError::Validation(format!(
            "Failed to resolve path '{}': {}",
            path.display(),
            e
        ))
    })?;

    if !canonical.is_file() {
        return Err(StorefrontError::Validation(format!(
            "Not a regular file: {}",
            canonical.display()
        )));
    }

    Ok(canonical)
}

/// Validate the name the server will see for an upload
pub fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(StorefrontError::Validation("File name is empty".to_string()));
    }

    if file_name.contains('/') || file_name.contains('\\') {
        return Err(StorefrontError::Validation(format!(
            "File name must not contain path separators: {}",
            file_name
        )));
    }

    Ok(())
}

/// Validate size is within the specified limit
pub fn validate_size(file_name: &str, size: u64, max_size: u64) -> Result<()> {
    if size > max_size {
        return Err(StorefrontError::Validation(format!(
            "File size ({} bytes) exceeds maximum allowed size ({} bytes): {}",
            size, max_size, file_name
        )));
    }
    Ok(())
}

/// Validate both name and size of a source before it is queued
pub fn validate_upload_source(source: &dyn ChunkSource, max_size: u64) -> Result<()> {
    validate_file_name(source.file_name())?;
    validate_size(source.file_name(), source.size(), max_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::source::BytesSource;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_validate_path_with_parent_dir() {
        let path = PathBuf::from("../etc/passwd");
        let result = validate_local_path(&path);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("'..' component"));
    }

    #[test]
    fn test_validate_path_rejects_directory_and_missing() {
        let temp_dir = tempdir().unwrap();
        assert!(validate_local_path(temp_dir.path()).is_err());
        assert!(validate_local_path(&temp_dir.path().join("missing.jpg")).is_err());
    }

    #[test]
    fn test_validate_path_accepts_regular_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("photo.jpg");
        fs::write(&file_path, b"jpeg").unwrap();

        let canonical = validate_local_path(&file_path).unwrap();
        assert!(canonical.is_absolute());
        assert!(canonical.ends_with("photo.jpg"));
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("photo.jpg").is_ok());
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("   ").is_err());
        assert!(validate_file_name("a/b.jpg").is_err());
        assert!(validate_file_name("a\\b.jpg").is_err());
    }

    #[test]
    fn test_validate_upload_source_size_limit() {
        let small = BytesSource::new("small.bin", vec![0u8; 10]);
        assert!(validate_upload_source(&small, 10).is_ok());

        let large = BytesSource::new("large.bin", vec![0u8; 11]);
        let err = validate_upload_source(&large, 10).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_empty_source_is_valid() {
        let empty = BytesSource::new("empty.txt", Vec::<u8>::new());
        assert!(validate_upload_source(&empty, 10).is_ok());
    }
}
