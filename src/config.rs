//! Application configuration.
//!
//! Two layers:
//! - [`Config`]: process settings read once from the environment (and `.env`).
//! - [`Settings`]: the persisted JSON blob holding OAuth app details, the
//!   sync watermark, naming options and the saved credential. Saved blobs
//!   may be partial or from an older version; [`Settings::reconcile`] fills
//!   every missing field explicitly.

use crate::models::Token;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Current settings layout version.
pub const SETTINGS_VERSION: u32 = 1;

pub const DEFAULT_ROOT_FOLDER: &str = "Strava";
pub const DEFAULT_REDIRECT_URI: &str = "obsidian://strava-sync";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
pub const STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";

/// Process configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the notes are written into
    pub vault_path: PathBuf,
    /// JSON file holding the persisted [`Settings`]
    pub settings_path: PathBuf,
    /// Overrides for the OAuth app details stored in settings
    pub strava_client_id: Option<String>,
    pub strava_client_secret: Option<String>,
    pub strava_redirect_uri: Option<String>,
    /// Activities requested per page
    pub page_size: u32,
    pub api_base_url: String,
    pub oauth_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let vault_path = PathBuf::from(env::var("VAULT_PATH").unwrap_or_else(|_| ".".to_string()));
        let settings_path = env::var("SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| vault_path.join(".strava-sync.json"));

        let page_size = match env::var("STRAVA_PAGE_SIZE") {
            Ok(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid(format!("STRAVA_PAGE_SIZE={}", v)))?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            vault_path,
            settings_path,
            strava_client_id: non_empty_var("STRAVA_CLIENT_ID"),
            strava_client_secret: non_empty_var("STRAVA_CLIENT_SECRET"),
            strava_redirect_uri: non_empty_var("STRAVA_REDIRECT_URI"),
            page_size,
            api_base_url: env::var("STRAVA_API_URL").unwrap_or_else(|_| STRAVA_API_URL.to_string()),
            oauth_base_url: env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| STRAVA_OAUTH_URL.to_string()),
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            vault_path: PathBuf::from("."),
            settings_path: PathBuf::from(".strava-sync.json"),
            strava_client_id: Some("test_client_id".to_string()),
            strava_client_secret: Some("test_secret".to_string()),
            strava_redirect_uri: None,
            page_size: DEFAULT_PAGE_SIZE,
            api_base_url: STRAVA_API_URL.to_string(),
            oauth_base_url: STRAVA_OAUTH_URL.to_string(),
        }
    }

    /// Environment overrides win over values stored in settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(id) = &self.strava_client_id {
            settings.auth_settings.client_id = id.clone();
        }
        if let Some(secret) = &self.strava_client_secret {
            settings.auth_settings.client_secret = secret.clone();
        }
        if let Some(uri) = &self.strava_redirect_uri {
            settings.auth_settings.redirect_uri = uri.clone();
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// OAuth application details. `access_token` mirrors the live credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

/// How activity note files are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilenameFormat {
    /// Fixed `Summary.md`
    #[default]
    Summary,
    /// Sanitized activity name
    ActivityName,
}

impl FilenameFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "summary" => Some(Self::Summary),
            "activity-name" => Some(Self::ActivityName),
            _ => None,
        }
    }
}

/// Watermark plus note naming options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// RFC3339 instant of the last fully materialized sync, or empty
    pub last_synced_at: String,
    /// Reserved for detail backfill
    pub activity_details_retrieved_until: String,
    pub root_folder: String,
    pub filename_format: FilenameFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_format: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            last_synced_at: String::new(),
            activity_details_retrieved_until: String::new(),
            root_folder: DEFAULT_ROOT_FOLDER.to_string(),
            filename_format: FilenameFormat::Summary,
            folder_format: None,
        }
    }
}

/// Persisted settings blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub version: u32,
    pub auth_settings: AuthConfig,
    pub sync_settings: SyncSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_token: Option<Token>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            auth_settings: AuthConfig::default(),
            sync_settings: SyncSettings::default(),
            saved_token: None,
        }
    }
}

/// Saved blob as it may appear on disk: every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedSettings {
    version: Option<u32>,
    auth_settings: Option<SavedAuth>,
    sync_settings: Option<SavedSync>,
    saved_token: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SavedAuth {
    access_token: Option<String>,
    client_id: Option<Value>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedSync {
    last_synced_at: Option<String>,
    activity_details_retrieved_until: Option<String>,
    root_folder: Option<String>,
    filename_format: Option<String>,
    folder_format: Option<String>,
}

impl Settings {
    /// Build settings from a saved blob, filling each missing field with its
    /// default. `None` (nothing saved yet) yields the defaults.
    pub fn reconcile(saved: Option<Value>) -> Result<Self, ConfigError> {
        let Some(saved) = saved else {
            return Ok(Self::default());
        };
        let saved: SavedSettings = serde_json::from_value(saved)
            .map_err(|e| ConfigError::Invalid(format!("settings: {}", e)))?;

        if let Some(version) = saved.version.filter(|v| *v > SETTINGS_VERSION) {
            tracing::warn!(version, "Settings written by a newer version, loading anyway");
        }

        let defaults = Self::default();
        let auth = saved.auth_settings.unwrap_or_default();
        let sync = saved.sync_settings.unwrap_or_default();

        let auth_settings = AuthConfig {
            access_token: auth.access_token.unwrap_or(defaults.auth_settings.access_token),
            client_id: auth
                .client_id
                .and_then(|v| match v {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or(defaults.auth_settings.client_id),
            client_secret: auth.client_secret.unwrap_or(defaults.auth_settings.client_secret),
            redirect_uri: auth
                .redirect_uri
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.auth_settings.redirect_uri),
        };

        let filename_format = match sync.filename_format.as_deref() {
            None => defaults.sync_settings.filename_format,
            Some(raw) => FilenameFormat::parse(raw).unwrap_or_else(|| {
                tracing::warn!(value = raw, "Unknown filename format, using default");
                defaults.sync_settings.filename_format
            }),
        };

        let sync_settings = SyncSettings {
            last_synced_at: sync
                .last_synced_at
                .unwrap_or(defaults.sync_settings.last_synced_at),
            activity_details_retrieved_until: sync
                .activity_details_retrieved_until
                .unwrap_or(defaults.sync_settings.activity_details_retrieved_until),
            root_folder: sync
                .root_folder
                .map(|s| s.trim().trim_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.sync_settings.root_folder),
            filename_format,
            folder_format: sync
                .folder_format
                .filter(|s| !s.trim().is_empty())
                .or(defaults.sync_settings.folder_format),
        };

        let saved_token = saved.saved_token.and_then(|value| {
            serde_json::from_value::<Token>(value)
                .map_err(|e| tracing::warn!(error = %e, "Ignoring unreadable saved token"))
                .ok()
        });

        Ok(Self {
            version: SETTINGS_VERSION,
            auth_settings,
            sync_settings,
            saved_token,
        })
    }

    pub fn to_value(&self) -> Result<Value, ConfigError> {
        serde_json::to_value(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Host-side persistence of the opaque settings blob.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the saved blob, `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<Value>, ConfigError>;

    async fn save(&self, blob: &Value) -> Result<(), ConfigError>;
}

/// Settings stored as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Value>, ConfigError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::Io(format!("{}: {}", self.path.display(), e))),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", self.path.display(), e)))
    }

    async fn save(&self, blob: &Value) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(blob)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        // Write next to the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.path.display(), e)))
    }
}

/// Settings kept in memory (tests, one-off runs).
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    blob: Mutex<Option<Value>>,
}

impl MemorySettingsStore {
    pub fn new(initial: Option<Value>) -> Self {
        Self {
            blob: Mutex::new(initial),
        }
    }

    /// Last saved blob.
    pub fn snapshot(&self) -> Option<Value> {
        self.blob.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Option<Value>, ConfigError> {
        Ok(self.snapshot())
    }

    async fn save(&self, blob: &Value) -> Result<(), ConfigError> {
        *self.blob.lock().unwrap_or_else(|e| e.into_inner()) = Some(blob.clone());
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Settings I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reconcile_nothing_saved() {
        let settings = Settings::reconcile(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sync_settings.root_folder, "Strava");
        assert_eq!(settings.auth_settings.redirect_uri, DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn test_reconcile_partial_blob() {
        let saved = json!({
            "authSettings": {"client_id": 113274, "client_secret": "shh"},
            "syncSettings": {"lastSyncedAt": "2024-05-01T00:00:00Z", "folderFormat": "YYYY/MM"}
        });
        let settings = Settings::reconcile(Some(saved)).unwrap();

        assert_eq!(settings.auth_settings.client_id, "113274");
        assert_eq!(settings.auth_settings.client_secret, "shh");
        assert_eq!(settings.auth_settings.access_token, "");
        assert_eq!(settings.auth_settings.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(settings.sync_settings.last_synced_at, "2024-05-01T00:00:00Z");
        assert_eq!(settings.sync_settings.activity_details_retrieved_until, "");
        assert_eq!(settings.sync_settings.root_folder, "Strava");
        assert_eq!(settings.sync_settings.folder_format.as_deref(), Some("YYYY/MM"));
        assert_eq!(settings.sync_settings.filename_format, FilenameFormat::Summary);
        assert_eq!(settings.version, SETTINGS_VERSION);
    }

    #[test]
    fn test_reconcile_unknown_filename_format_falls_back() {
        let saved = json!({"syncSettings": {"filenameFormat": "shouting"}});
        let settings = Settings::reconcile(Some(saved)).unwrap();
        assert_eq!(settings.sync_settings.filename_format, FilenameFormat::Summary);

        let saved = json!({"syncSettings": {"filenameFormat": "activity-name"}});
        let settings = Settings::reconcile(Some(saved)).unwrap();
        assert_eq!(settings.sync_settings.filename_format, FilenameFormat::ActivityName);
    }

    #[test]
    fn test_reconcile_drops_unreadable_token() {
        let saved = json!({"savedToken": {"access_token": 5}});
        let settings = Settings::reconcile(Some(saved)).unwrap();
        assert!(settings.saved_token.is_none());
    }

    #[test]
    fn test_reconcile_rejects_non_object() {
        assert!(matches!(
            Settings::reconcile(Some(json!("nope"))),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_settings_round_trip_through_reconcile() {
        let mut settings = Settings::default();
        settings.sync_settings.filename_format = FilenameFormat::ActivityName;
        settings.sync_settings.last_synced_at = "2024-05-01T00:00:00Z".to_string();
        settings.saved_token = Some(Token {
            token_type: "Bearer".to_string(),
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 1,
            expires_in: 2,
            athlete: None,
        });

        let blob = settings.to_value().unwrap();
        assert_eq!(blob["syncSettings"]["filenameFormat"], "activity-name");
        assert_eq!(Settings::reconcile(Some(blob)).unwrap(), settings);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::test_default();
        config.strava_redirect_uri = Some("obsidian://custom".to_string());
        let mut settings = Settings::default();
        config.apply_overrides(&mut settings);

        assert_eq!(settings.auth_settings.client_id, "test_client_id");
        assert_eq!(settings.auth_settings.redirect_uri, "obsidian://custom");
    }

    #[tokio::test]
    async fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));
        assert!(store.load().await.unwrap().is_none());

        let blob = Settings::default().to_value().unwrap();
        store.save(&blob).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(blob));
    }
}
