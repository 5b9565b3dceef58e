// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use strava_vault::config::ConfigError;
use strava_vault::error::SyncError;
use strava_vault::services::geometry::GeometryError;
use strava_vault::vault::VaultError;

#[test]
fn test_rate_limited() {
    assert!(SyncError::StravaApi(SyncError::STRAVA_RATE_LIMIT.to_string()).is_rate_limited());
    assert!(!SyncError::StravaApi("HTTP 500: oops".to_string()).is_rate_limited());
}

#[test]
fn test_user_messages() {
    assert_eq!(
        SyncError::Auth(SyncError::NOT_SIGNED_IN.to_string()).user_message(),
        "Please authenticate with Strava before syncing."
    );
    assert_eq!(
        SyncError::Auth(SyncError::REFRESH_FAILED.to_string()).user_message(),
        "Failed to refresh authentication token. Please re-authenticate."
    );
    assert_eq!(
        SyncError::Scope {
            granted: "read".to_string()
        }
        .user_message(),
        "Please authorize the required permissions."
    );
    assert_eq!(
        SyncError::StravaApi(SyncError::STRAVA_RATE_LIMIT.to_string()).user_message(),
        "Strava rate limit reached, try again in 15 minutes."
    );
    assert!(SyncError::StravaApi("HTTP 502: Bad Gateway".to_string())
        .user_message()
        .starts_with("Failed synchronizing Strava activities"));
}

#[test]
fn test_conversions() {
    let err: SyncError = VaultError::NotFound("Strava/x.md".to_string()).into();
    assert!(matches!(err, SyncError::Storage(_)));
    assert!(err.user_message().contains("Strava/x.md"));

    let err: SyncError = ConfigError::Missing("client_id").into();
    assert!(err.user_message().contains("Client ID"));

    let err: SyncError = GeometryError::MissingPolyline(7).into();
    assert!(matches!(err, SyncError::Geometry(_)));

    let err: SyncError = anyhow::anyhow!("boom").into();
    assert_eq!(err.user_message(), "Unexpected error, see logs for details.");
}
