// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer (note vault).
//!
//! The sync engine only needs a handful of folder/file operations on
//! vault-relative, `/`-separated paths. `FsVault` maps them onto a directory
//! on disk; `MemoryVault` keeps everything in memory for tests.

pub mod fs;
pub mod memory;

pub use fs::FsVault;
pub use memory::MemoryVault;

use async_trait::async_trait;

/// File names used inside each activity folder.
pub mod files {
    pub const SUMMARY_NOTE: &str = "Summary";
    pub const DETAILED_NOTE: &str = "Detailed";
    pub const NOTE_EXTENSION: &str = "md";
    pub const MAP_FILE: &str = "map.geojson";
}

/// Narrow filesystem interface consumed by the materializer and reconciler.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Whether a file or folder exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, VaultError>;

    /// Whether `path` exists and is a folder.
    async fn is_folder(&self, path: &str) -> Result<bool, VaultError>;

    /// Create a single folder. The parent must already exist.
    async fn create_folder(&self, path: &str) -> Result<(), VaultError>;

    /// Create a new file. Fails if something already exists at `path`.
    async fn create(&self, path: &str, contents: &str) -> Result<(), VaultError>;

    /// Delete a file (or folder, recursively).
    async fn delete(&self, path: &str) -> Result<(), VaultError>;

    /// Read a file as UTF-8 text.
    async fn read(&self, path: &str) -> Result<String, VaultError>;
}

/// Errors from vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Not a folder: {0}")]
    NotAFolder(String),

    #[error("Invalid vault path: {0}")]
    InvalidPath(String),
}

/// Join path segments with `/`, skipping empty ones.
pub fn join_path<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref().trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parent folder of a vault path (`""` for top-level entries).
pub fn parent_path(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .unwrap_or("")
}

/// Create every missing folder along `path`. Existing folders are left alone.
pub async fn ensure_folder(vault: &dyn Vault, path: &str) -> Result<(), VaultError> {
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);

        if vault.is_folder(&current).await? {
            continue;
        }
        if vault.exists(&current).await? {
            return Err(VaultError::NotAFolder(current));
        }
        tracing::debug!(path = %current, "Creating folder");
        vault.create_folder(&current).await?;
    }
    Ok(())
}

/// Replace a file: delete whatever is there, then create it fresh.
pub async fn replace_file(vault: &dyn Vault, path: &str, contents: &str) -> Result<(), VaultError> {
    if vault.exists(path).await? {
        vault.delete(path).await?;
    }
    vault.create(path, contents).await
}
