// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava credential lifecycle.
//!
//! [`TokenManager`] owns the single credential of the synced account:
//! - builds the authorization URL and hands it to a [`Browser`]
//! - validates the redirect callback and exchanges the code for a token
//! - refreshes the access token before it expires
//! - decides whether the current rate-limit usage leaves room for a request

use crate::config::{AuthConfig, ConfigError};
use crate::error::{Result, SyncError};
use crate::events::{EventBus, SyncEvent};
use crate::models::Token;
use crate::services::strava::OAuthApi;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Scope requested from Strava. The callback must grant exactly this.
pub const REQUIRED_SCOPE: &str = "read,activity:read_all";

/// Refresh when fewer than this many seconds of validity remain.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 10;

/// Usage fraction at which requests are held back for a cooldown.
const RATE_BUDGET_THRESHOLD: f64 = 0.8;

/// Where the credential lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    AuthorizationRequested,
    Authenticated,
    Refreshing,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBudget {
    Ok,
    /// Wait out the cooldown before the next request
    Throttled,
}

/// Opens the authorization URL for the user.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Shows the URL on stderr for the user to open.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!(url = %url, "Authorization URL ready");
        eprintln!("Open this URL to authorize Strava access:\n\n  {}\n", url);
        Ok(())
    }
}

/// Parameters of the OAuth redirect callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackArgs {
    pub code: Option<String>,
    pub scope: Option<String>,
    /// Set by Strava when the user denied access
    pub error: Option<String>,
}

impl CallbackArgs {
    /// Parse a redirect URI such as `obsidian://strava-sync?code=..&scope=..`.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let url = url::Url::parse(uri.trim())
            .map_err(|e| SyncError::Auth(format!("invalid redirect URI: {}", e)))?;

        let mut args = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => args.code = Some(value.into_owned()),
                "scope" => args.scope = Some(value.into_owned()),
                "error" => args.error = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(args)
    }
}

struct Inner {
    config: AuthConfig,
    token: Option<Token>,
    state: AuthState,
}

/// Owner of the account credential.
pub struct TokenManager {
    inner: Mutex<Inner>,
    oauth: Arc<dyn OAuthApi>,
    events: Arc<EventBus>,
}

impl TokenManager {
    pub fn new(config: AuthConfig, oauth: Arc<dyn OAuthApi>, events: Arc<EventBus>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                config,
                token: None,
                state: AuthState::Unauthenticated,
            }),
            oauth,
            events,
        }
    }

    /// Restore a credential persisted by an earlier run.
    pub fn with_saved_token(mut self, token: Option<Token>) -> Self {
        let inner = self.inner.get_mut();
        match token.filter(|t| !t.access_token.is_empty()) {
            Some(token) => {
                tracing::debug!(expires_at = token.expires_at, "Restored saved token");
                inner.config.access_token = token.access_token.clone();
                inner.token = Some(token);
                inner.state = AuthState::Authenticated;
            }
            None => {
                tracing::debug!("No saved token, authentication required");
                inner.token = None;
                inner.state = AuthState::Unauthenticated;
            }
        }
        self
    }

    pub async fn state(&self) -> AuthState {
        self.inner.lock().await.state
    }

    pub async fn token(&self) -> Option<Token> {
        self.inner.lock().await.token.clone()
    }

    pub async fn auth_config(&self) -> AuthConfig {
        self.inner.lock().await.config.clone()
    }

    /// A usable credential is held. A failed refresh signs the user out even
    /// though the old token is kept for a retry.
    pub async fn is_signed_in(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.state != AuthState::Unauthenticated
            && inner
                .token
                .as_ref()
                .is_some_and(|t| !t.access_token.is_empty() && t.expires_in > 0)
    }

    /// URL the user visits to grant access.
    pub async fn authorization_url(&self) -> Result<String> {
        let inner = self.inner.lock().await;
        require_app_credentials(&inner.config)?;
        Ok(self.oauth.authorization_url(&inner.config, REQUIRED_SCOPE))
    }

    /// Start the authorization flow. The credential is untouched until the
    /// redirect callback arrives.
    pub async fn authenticate(&self, browser: &dyn Browser) -> Result<()> {
        let url = self.authorization_url().await?;
        browser.open(&url)?;
        self.inner.lock().await.state = AuthState::AuthorizationRequested;
        tracing::info!("Authorization requested");
        Ok(())
    }

    /// Finish the authorization flow from the redirect callback.
    pub async fn complete_authorization(&self, callback: &CallbackArgs) -> Result<Token> {
        if let Some(error) = &callback.error {
            tracing::warn!(error = %error, "Strava returned an authorization error");
        }

        let granted = callback.scope.clone().unwrap_or_default();
        if granted != REQUIRED_SCOPE {
            tracing::warn!(granted = %granted, "Required permissions were not granted");
            return Err(SyncError::Scope { granted });
        }

        let code = callback
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| SyncError::Auth("authorization code missing".to_string()))?;

        let mut inner = self.inner.lock().await;
        require_app_credentials(&inner.config)?;

        let response = self
            .oauth
            .exchange_code(&inner.config, code)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Authorization code exchange failed");
                SyncError::Auth(format!("token exchange failed: {}", e))
            })?;

        let token = response
            .into_token()
            .ok_or_else(|| SyncError::Auth("incomplete token response".to_string()))?;

        tracing::info!(athlete_id = ?token.athlete_id(), "Authenticated with Strava");
        self.store_token(&mut inner, token.clone());
        Ok(token)
    }

    /// Access token valid for at least the refresh margin, refreshing first
    /// if needed.
    pub async fn ensure_valid(&self) -> Result<String> {
        self.ensure_valid_at(Utc::now()).await
    }

    async fn ensure_valid_at(&self, now: DateTime<Utc>) -> Result<String> {
        let mut inner = self.inner.lock().await;

        let Some(mut token) = inner
            .token
            .clone()
            .filter(|t| !t.access_token.is_empty())
        else {
            return Err(SyncError::Auth(SyncError::NOT_SIGNED_IN.to_string()));
        };

        let remaining = token.remaining_validity(now);
        if remaining >= Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(token.access_token);
        }

        tracing::info!(
            remaining_secs = remaining.num_seconds(),
            "Access token expiring, refreshing"
        );
        inner.state = AuthState::Refreshing;

        let refreshed = self
            .oauth
            .refresh_token(&inner.config, &token.refresh_token)
            .await;

        match refreshed {
            Ok(update) => {
                token.merge(update);
                let access_token = token.access_token.clone();
                self.store_token(&mut inner, token);
                tracing::info!("Token refreshed");
                Ok(access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                inner.state = AuthState::Unauthenticated;
                Err(SyncError::Auth(SyncError::REFRESH_FAILED.to_string()))
            }
        }
    }

    /// Whether the reported usage fraction leaves room for another request.
    /// Unknown usage (NaN) counts as room.
    pub fn check_rate_budget(&self, fraction: f64) -> RateBudget {
        tracing::debug!(fraction, "Strava API usage fraction reached");
        if fraction.is_nan() || fraction < RATE_BUDGET_THRESHOLD {
            RateBudget::Ok
        } else {
            RateBudget::Throttled
        }
    }

    fn store_token(&self, inner: &mut Inner, token: Token) {
        inner.config.access_token = token.access_token.clone();
        inner.token = Some(token.clone());
        inner.state = AuthState::Authenticated;
        self.events.publish(&SyncEvent::TokenUpdated(token));
    }
}

fn require_app_credentials(config: &AuthConfig) -> std::result::Result<(), ConfigError> {
    if config.client_id.trim().is_empty() {
        return Err(ConfigError::Missing("client_id"));
    }
    if config.client_secret.trim().is_empty() {
        return Err(ConfigError::Missing("client_secret"));
    }
    Ok(())
}
