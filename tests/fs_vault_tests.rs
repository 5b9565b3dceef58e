// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notes and settings on a real filesystem.

use std::sync::Arc;
use strava_vault::config::{Config, JsonFileStore};
use strava_vault::events::EventBus;
use strava_vault::services::{FileMaterializer, NoteLayout, SyncService};
use strava_vault::vault::fs::FsVault;
use strava_vault::vault::{Vault, VaultError};

mod common;
use common::{activity_with_route, FakeStrava};

#[tokio::test]
async fn test_batch_lands_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Arc::new(FsVault::new(dir.path()));
    let materializer = FileMaterializer::new(vault.clone(), NoteLayout::default(), EventBus::new());

    let batch = vec![activity_with_route(42, "2024-03-05T08:00:00Z")];
    materializer.materialize_batch(&batch).await.unwrap();

    let folder = dir.path().join("Strava").join("2024-03-05").join("42");
    let note = std::fs::read_to_string(folder.join("Summary.md")).unwrap();
    assert!(note.starts_with("---\nid: 42\n"));

    let geojson: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(folder.join("map.geojson")).unwrap())
            .unwrap();
    assert_eq!(geojson["type"], "FeatureCollection");
    assert_eq!(geojson["features"][0]["properties"]["stroke"], "#FC4C02");

    // Second write replaces in place
    materializer.materialize_batch(&batch).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(folder.join("Summary.md")).unwrap(),
        note
    );
}

#[tokio::test]
async fn test_paths_cannot_escape_root() {
    let dir = tempfile::tempdir().unwrap();
    let vault = FsVault::new(dir.path().join("vault"));

    assert!(matches!(
        vault.read("../secret.txt").await,
        Err(VaultError::InvalidPath(_))
    ));
    assert!(matches!(
        vault.create("/etc/passwd", "x").await,
        Err(VaultError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn test_create_does_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let vault = FsVault::new(dir.path());

    vault.create("note.md", "first").await.unwrap();
    assert!(matches!(
        vault.create("note.md", "second").await,
        Err(VaultError::AlreadyExists(_))
    ));
    vault.delete("note.md").await.unwrap();
    assert!(!vault.exists("note.md").await.unwrap());
}

#[tokio::test]
async fn test_service_loads_partial_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    std::fs::write(
        &settings_path,
        r#"{"authSettings": {"client_id": 113274, "client_secret": "shh"},
            "syncSettings": {"rootFolder": "Training", "folderFormat": "YYYY/MM"}}"#,
    )
    .unwrap();

    let mut config = Config::test_default();
    config.strava_client_id = None;
    config.strava_client_secret = None;

    let service = SyncService::load(
        &config,
        Arc::new(JsonFileStore::new(&settings_path)),
        Arc::new(FsVault::new(dir.path())),
        FakeStrava::new(),
    )
    .await
    .unwrap();

    let settings = service.settings();
    assert_eq!(settings.auth_settings.client_id, "113274");
    assert_eq!(settings.sync_settings.root_folder, "Training");
    assert_eq!(settings.sync_settings.folder_format.as_deref(), Some("YYYY/MM"));
    assert_eq!(settings.sync_settings.last_synced_at, "");
    assert!(!service.is_signed_in().await);
}
