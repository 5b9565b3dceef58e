// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory vault for tests and dry runs.

use super::{parent_path, Vault, VaultError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Folder,
    File(String),
}

/// Vault backed by a sorted map of paths.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All file paths with their contents, sorted by path.
    pub fn files(&self) -> Vec<(String, String)> {
        self.entries()
            .iter()
            .filter_map(|(path, entry)| match entry {
                Entry::File(contents) => Some((path.clone(), contents.clone())),
                Entry::Folder => None,
            })
            .collect()
    }

    /// All folder paths, sorted.
    pub fn folders(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|(_, entry)| **entry == Entry::Folder)
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn check_parent(entries: &BTreeMap<String, Entry>, path: &str) -> Result<(), VaultError> {
        let parent = parent_path(path);
        match entries.get(parent) {
            _ if parent.is_empty() => Ok(()),
            Some(Entry::Folder) => Ok(()),
            Some(Entry::File(_)) => Err(VaultError::NotAFolder(parent.to_string())),
            None => Err(VaultError::NotFound(parent.to_string())),
        }
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn exists(&self, path: &str) -> Result<bool, VaultError> {
        Ok(self.entries().contains_key(path))
    }

    async fn is_folder(&self, path: &str) -> Result<bool, VaultError> {
        Ok(self.entries().get(path) == Some(&Entry::Folder))
    }

    async fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        let mut entries = self.entries();
        if entries.contains_key(path) {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        Self::check_parent(&entries, path)?;
        entries.insert(path.to_string(), Entry::Folder);
        Ok(())
    }

    async fn create(&self, path: &str, contents: &str) -> Result<(), VaultError> {
        let mut entries = self.entries();
        if entries.contains_key(path) {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        Self::check_parent(&entries, path)?;
        entries.insert(path.to_string(), Entry::File(contents.to_string()));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), VaultError> {
        let mut entries = self.entries();
        if entries.remove(path).is_none() {
            return Err(VaultError::NotFound(path.to_string()));
        }
        let prefix = format!("{}/", path);
        entries.retain(|p, _| !p.starts_with(&prefix));
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<String, VaultError> {
        match self.entries().get(path) {
            Some(Entry::File(contents)) => Ok(contents.clone()),
            Some(Entry::Folder) => Err(VaultError::InvalidPath(path.to_string())),
            None => Err(VaultError::NotFound(path.to_string())),
        }
    }
}
