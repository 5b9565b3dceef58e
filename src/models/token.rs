// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth credential model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Strava OAuth credential, persisted by the host as `savedToken`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry (Unix timestamp, seconds)
    pub expires_at: i64,
    /// Validity window reported at issue time (seconds)
    #[serde(default)]
    pub expires_in: i64,
    /// Athlete summary embedded in the token exchange response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete: Option<Value>,
}

impl Token {
    /// Expiry as a UTC timestamp.
    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default()
    }

    /// Time left before the access token expires (negative once expired).
    pub fn remaining_validity(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at_utc() - now
    }

    /// Strava athlete ID from the embedded athlete summary, if present.
    pub fn athlete_id(&self) -> Option<u64> {
        self.athlete.as_ref()?.get("id")?.as_u64()
    }

    /// Apply a refresh response. Fields the response omits keep their value.
    pub fn merge(&mut self, update: TokenResponse) {
        if let Some(token_type) = update.token_type {
            self.token_type = token_type;
        }
        if let Some(access_token) = update.access_token {
            self.access_token = access_token;
        }
        if let Some(refresh_token) = update.refresh_token {
            self.refresh_token = refresh_token;
        }
        if let Some(expires_at) = update.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(expires_in) = update.expires_in {
            self.expires_in = expires_in;
        }
        if update.athlete.is_some() {
            self.athlete = update.athlete;
        }
    }
}

/// Token exchange / refresh response from Strava. Every field is optional
/// because refresh responses may omit unchanged fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub token_type: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub expires_in: Option<i64>,
    pub athlete: Option<Value>,
}

impl TokenResponse {
    /// Build a full credential from a code exchange response.
    ///
    /// Returns `None` when a required field is missing.
    pub fn into_token(self) -> Option<Token> {
        Some(Token {
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            access_token: self.access_token?,
            refresh_token: self.refresh_token?,
            expires_at: self.expires_at?,
            expires_in: self.expires_in.unwrap_or_default(),
            athlete: self.athlete,
        })
    }
}
