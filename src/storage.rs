//! Storage provider abstraction and the file-system implementation.
//!
//! The resolver never touches the file system directly: every source read,
//! output write, existence check and timestamp goes through a
//! [`StorageProvider`]. Paths handed to a provider are storage paths
//! (`/`-separated, relative to the provider's root); public URLs are what
//! browsers see.
//!
//! ## FileSystemStorage
//!
//! ```text
//! storage root:  media/
//! public url:    /media
//!
//! storage path   img/a.jpg                 ↔  public url  /media/img/a.jpg
//! storage path   _Profiles/1a2b/3c4d/a.jpg ↔  public url  /media/_Profiles/1a2b/3c4d/a.jpg
//! ```
//!
//! Storage paths containing `..` are rejected so a crafted public URL cannot
//! reach outside the root.

use crate::paths;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
}

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFile {
    pub path: String,
    pub last_updated: SystemTime,
    pub size: u64,
}

/// A file opened for writing. `path` is where the provider actually put it,
/// which may differ from the requested path.
pub struct StorageWriter {
    pub path: String,
    pub writer: Box<dyn Write + Send>,
}

/// File store used by the resolver.
pub trait StorageProvider: Send + Sync {
    /// Join two storage path fragments.
    fn combine(&self, first: &str, second: &str) -> String {
        paths::combine(first, second)
    }

    fn file_exists(&self, path: &str) -> bool;

    fn get_file(&self, path: &str) -> Result<StorageFile, StorageError>;

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError>;

    /// Create (or truncate) a file, creating parent folders as needed.
    fn open_or_create(&self, path: &str) -> Result<StorageWriter, StorageError>;

    fn get_public_url(&self, path: &str) -> String;

    /// Map a public URL back to a storage path. `None` when the URL is not
    /// served by this provider.
    fn get_storage_path(&self, url: &str) -> Option<String>;

    /// Remove a folder and everything below it; returns the number of files
    /// removed. A missing folder is not an error.
    fn delete_folder(&self, path: &str) -> Result<usize, StorageError>;
}

/// Storage provider backed by a local directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
    public_url: String,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage path to a path on disk, rejecting traversal.
    fn map_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches(['/', '\\']));
        let mut mapped = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => mapped.push(part),
                Component::CurDir => {}
                _ => return Err(StorageError::InvalidPath(path.to_string())),
            }
        }
        Ok(mapped)
    }
}

impl StorageProvider for FileSystemStorage {
    fn file_exists(&self, path: &str) -> bool {
        self.map_path(path).is_ok_and(|p| p.is_file())
    }

    fn get_file(&self, path: &str) -> Result<StorageFile, StorageError> {
        let full = self.map_path(path)?;
        let metadata = match fs::metadata(&full) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(StorageError::NotFound(path.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        Ok(StorageFile {
            path: path.to_string(),
            last_updated: metadata.modified()?,
            size: metadata.len(),
        })
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let full = self.map_path(path)?;
        let file = File::open(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e),
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_or_create(&self, path: &str) -> Result<StorageWriter, StorageError> {
        let full = self.map_path(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&full)?;
        Ok(StorageWriter {
            path: path.trim_start_matches('/').to_string(),
            writer: Box::new(BufWriter::new(file)),
        })
    }

    fn get_public_url(&self, path: &str) -> String {
        paths::combine(&self.public_url, &paths::url_encode_path(&path.replace('\\', "/")))
    }

    fn get_storage_path(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(self.public_url.as_str())?;
        // "/media" must not match "/mediafiles/a.jpg"
        if !self.public_url.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(paths::url_decode(rest.trim_start_matches('/')))
    }

    fn delete_folder(&self, path: &str) -> Result<usize, StorageError> {
        let full = self.map_path(path)?;
        if !full.is_dir() {
            return Ok(0);
        }
        let removed = WalkDir::new(&full)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        fs::remove_dir_all(&full)?;
        Ok(removed)
    }
}
