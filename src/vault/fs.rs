// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vault rooted at a directory on the local filesystem.

use super::{Vault, VaultError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Filesystem-backed vault.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault-relative path onto the root, refusing anything that
    /// could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, VaultError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(VaultError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str, source: std::io::Error) -> VaultError {
    match source.kind() {
        ErrorKind::NotFound => VaultError::NotFound(path.to_string()),
        ErrorKind::AlreadyExists => VaultError::AlreadyExists(path.to_string()),
        _ => VaultError::Io {
            path: path.to_string(),
            source,
        },
    }
}

#[async_trait]
impl Vault for FsVault {
    async fn exists(&self, path: &str) -> Result<bool, VaultError> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn is_folder(&self, path: &str) -> Result<bool, VaultError> {
        let full = self.resolve(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir(&full)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn create(&self, path: &str, contents: &str) -> Result<(), VaultError> {
        let full = self.resolve(path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| io_error(path, e))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| io_error(path, e))?;
        file.flush().await.map_err(|e| io_error(path, e))
    }

    async fn delete(&self, path: &str) -> Result<(), VaultError> {
        let full = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| io_error(path, e))?;
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(&full).await
        } else {
            tokio::fs::remove_file(&full).await
        };
        result.map_err(|e| io_error(path, e))
    }

    async fn read(&self, path: &str) -> Result<String, VaultError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| io_error(path, e))
    }
}
