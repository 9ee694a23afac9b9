//! Atomic file primitives.
//!
//! Ledgers and reports are rewritten at the end of every crawl. Writes go to a
//! sibling temporary file first and are renamed into place, so an interrupted
//! run never leaves a half-written JSON document behind.

mod error;

pub use error::{Error, Result};

use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug)]
pub struct AtomicWriteOptions {
    sync: bool,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self { Self::new() }
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self { sync: false }
    }

    /// Flush the temporary file to disk before renaming it into place.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    create_dir_all(parent)?;

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    fs::write(&tmp_path, content).map_err(|source| Error::Write {
        path: tmp_path.clone(),
        source,
    })?;

    if options.sync {
        let file = fs::File::open(&tmp_path).map_err(|source| Error::Write {
            path: tmp_path.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| Error::Write {
            path: tmp_path.clone(),
            source,
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        Error::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`atomic_read`], but a missing file is `Ok(None)`.
pub fn read_if_exists(path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|source| Error::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.json");
        atomic_write(&path, b"[]", AtomicWriteOptions::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"[]");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        atomic_write(&path, b"{}", AtomicWriteOptions::new().sync(true)).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["report.json".to_string()]);
    }

    #[test]
    fn test_read_if_exists_missing() {
        let dir = tempdir().unwrap();
        assert!(read_if_exists(dir.path().join("absent")).unwrap().is_none());
    }
}
