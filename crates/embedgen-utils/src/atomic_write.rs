//! Atomic file writes: temp file in the target directory, fsync, rename.
//!
//! Content is written byte-for-byte. Manifest hashes are computed over the
//! same bytes, so no newline or encoding normalization happens here.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically write `content` to `path`, creating parent directories.
///
/// Returns the number of bytes written.
pub fn write_file_atomic(path: &Path, content: &[u8]) -> Result<u64> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {}", parent.display()))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {}", parent.display()))?;

    temp_file
        .write_all(content)
        .with_context(|| "Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    temp_file
        .persist(path)
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically write file: {}", path.display()))?;

    Ok(content.len() as u64)
}

/// Convenience wrapper for text content.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<u64> {
    write_file_atomic(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a/b/c.txt");

        let bytes = write_text_atomic(&target, "hello").unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_write_preserves_crlf_bytes() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("crlf.c");

        write_text_atomic(&target, "int a;\r\nint b;\r\n").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"int a;\r\nint b;\r\n");
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("manifest.lock.json");

        write_text_atomic(&target, "first version").unwrap();
        write_text_atomic(&target, "second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
    }
}
