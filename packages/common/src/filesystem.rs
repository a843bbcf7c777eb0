use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File system abstraction for write-back and testing
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the file's contents; readers never observe a partial write
    async fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    async fn exists(&self, path: &Path) -> bool;
}

/// Real file system implementation
pub struct RealFileSystem;

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mut temp_name = std::ffi::OsString::from(".");
        temp_name.push(file_name);
        temp_name.push(".onlook-tmp");
        let temp = path.with_file_name(temp_name);

        tokio::fs::write(&temp, contents).await?;
        if let Err(err) = tokio::fs::rename(&temp, path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err);
        }
        tracing::debug!(path = ?path, bytes = contents.len(), "wrote file");
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }
}

/// In-memory file system for testing
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    read_only: Mutex<HashSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), contents.into());
        }
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every later write to `path` fail with `PermissionDenied`
    pub fn set_read_only(&self, path: impl Into<PathBuf>) {
        if let Ok(mut read_only) = self.read_only.lock() {
            read_only.insert(path.into());
        }
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory file system lock poisoned")
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .map_err(|_| poisoned())?
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if self.read_only.lock().map_err(|_| poisoned())?.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                path.display().to_string(),
            ));
        }
        self.files
            .lock()
            .map_err(|_| poisoned())?
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_real_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tsx");
        let fs = RealFileSystem;

        fs.write(&path, "one").await.unwrap();
        fs.write(&path, "two").await.unwrap();

        assert_eq!(fs.read_to_string(&path).await.unwrap(), "two");
        // temp file is renamed away
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_memory_read_only() {
        let fs = MemoryFileSystem::new();
        fs.insert("/a.tsx", "x");
        fs.set_read_only("/a.tsx");

        let err = fs.write(Path::new("/a.tsx"), "y").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(fs.contents(Path::new("/a.tsx")).as_deref(), Some("x"));
        assert!(fs.exists(Path::new("/a.tsx")).await);
        assert!(!fs.exists(Path::new("/b.tsx")).await);
    }
}
