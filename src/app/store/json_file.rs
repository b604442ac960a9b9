//! Durable JSON documents with atomic replacement
//!
//! Each document lives in its own file guarded by its own async mutex. A
//! writer serializes the complete document into a sibling temp file and
//! renames it over the target, so a reader sees either the previous or the
//! new document and never a partial one.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::constants::files;
use crate::errors::{StoreError, StoreResult};

/// One JSON document on disk
#[derive(Debug)]
pub struct JsonFile<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Open the document, creating it as `{}` if it does not exist
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            ensure_directory_exists(parent).await?;
        }

        if !fs::try_exists(&path).await.unwrap_or(false) {
            fs::write(&path, b"{}")
                .await
                .map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
            debug!("Created state file: {}", path.display());
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
            _marker: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document
    pub async fn load(&self) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the document, falling back to the default on any failure
    pub async fn load_or_default(&self) -> T {
        match self.load().await {
            Ok(value) => value,
            Err(e) => {
                error!("{}; starting from an empty document", e);
                T::default()
            }
        }
    }

    /// Replace the document atomically
    pub async fn save(&self, value: &T) -> StoreResult<()> {
        let content = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        let _guard = self.lock.lock().await;
        let temp_path = temp_path_for(&self.path);

        fs::write(&temp_path, &content)
            .await
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;

        if let Err(source) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::Io {
                path: self.path.clone(),
                source,
            });
        }

        debug!("Persisted {}", self.path.display());
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(files::TEMP_FILE_SUFFIX);
    path.with_file_name(name)
}

/// Ensure a directory exists, creating it if necessary
pub async fn ensure_directory_exists(path: &Path) -> StoreResult<()> {
    if path.as_os_str().is_empty() || fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }
    fs::create_dir_all(path).await.map_err(|e| {
        error!("Failed to create state directory: {}", e);
        StoreError::DirectoryNotAccessible {
            path: path.to_path_buf(),
        }
    })?;
    debug!("Created state directory: {}", path.display());
    Ok(())
}
