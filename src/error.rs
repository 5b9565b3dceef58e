// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

use crate::config::ConfigError;
use crate::services::geometry::GeometryError;
use crate::vault::VaultError;

/// Application error type raised by every component.
///
/// The sync orchestrator is the only place that turns these into
/// notifications, via [`SyncError::user_message`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Insufficient permissions granted: {granted:?}")]
    Scope { granted: String },

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Storage error: {0}")]
    Storage(#[from] VaultError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Marker message used when Strava answers 429.
    pub const STRAVA_RATE_LIMIT: &'static str = "Rate limit exceeded";

    /// Marker message used when Strava rejects the access token (401).
    pub const STRAVA_TOKEN_ERROR: &'static str = "Invalid access token";

    /// Returned by `ensure_valid` when no credential is loaded.
    pub const NOT_SIGNED_IN: &'static str = "not signed in";

    /// Returned by `ensure_valid` when the refresh call fails.
    pub const REFRESH_FAILED: &'static str = "refresh failed";

    /// Whether Strava reported its rate limit as exhausted.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SyncError::StravaApi(msg) if msg == Self::STRAVA_RATE_LIMIT)
    }

    /// Text shown to the user when a command fails.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Auth(msg) if msg == Self::NOT_SIGNED_IN => {
                "Please authenticate with Strava before syncing.".to_string()
            }
            SyncError::Auth(msg) if msg == Self::REFRESH_FAILED => {
                "Failed to refresh authentication token. Please re-authenticate.".to_string()
            }
            SyncError::Auth(msg) => format!("Could not authenticate user: {}", msg),
            SyncError::Scope { .. } => "Please authorize the required permissions.".to_string(),
            SyncError::StravaApi(_) if self.is_rate_limited() => {
                "Strava rate limit reached, try again in 15 minutes.".to_string()
            }
            SyncError::StravaApi(msg) => format!("Failed synchronizing Strava activities: {}", msg),
            SyncError::Storage(err) => {
                tracing::error!(error = %err, "Storage error");
                format!("Failed writing activity notes: {}", err)
            }
            SyncError::Geometry(err) => format!("Could not decode activity map: {}", err),
            SyncError::Config(err) => format!(
                "{}. Please make sure to set Client ID and Client Secret first.",
                err
            ),
            SyncError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                "Unexpected error, see logs for details.".to_string()
            }
        }
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
