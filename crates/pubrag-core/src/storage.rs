use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Backend-independent file access by logical path (`dir/name.ext`).
pub trait Storage: Send + Sync {
    /// Logical paths of files under `dir`, sorted; `extension` filters by suffix.
    fn list(&self, dir: &str, extension: Option<&str>) -> Result<Vec<String>>;
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;
}

/// Structured helpers available on every storage, including `dyn Storage`.
pub trait StorageExt: Storage {
    fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let bytes = self.read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write(path, &bytes)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Local filesystem storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, logical: &str) -> Result<PathBuf> {
        let rel = Path::new(logical);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::Validation(format!("storage path '{logical}' must be relative")));
        }
        Ok(self.root.join(rel))
    }

    fn logical(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Storage for LocalStorage {
    fn list(&self, dir: &str, extension: Option<&str>) -> Result<Vec<String>> {
        let base = self.resolve(dir)?;
        if !base.is_dir() {
            return Err(Error::NotFound(format!("directory {}", base.display())));
        }
        let mut files: Vec<String> = walkdir::WalkDir::new(&base)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| match extension {
                Some(ext) => e.path().extension().and_then(|s| s.to_str()) == Some(ext),
                None => true,
            })
            .map(|e| self.logical(e.path()))
            .collect();
        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(format!("file {}", full.display())),
            _ => Error::Io(e),
        })
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, bytes)?;
        Ok(())
    }
}
