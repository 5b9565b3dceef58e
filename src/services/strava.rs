// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching activities and managing OAuth tokens.
//!
//! Handles:
//! - Paginated activity listing and detailed activity fetches
//! - Authorization code exchange and token refresh
//! - Rate limit tracking from response headers

use crate::config::{AuthConfig, STRAVA_API_URL, STRAVA_OAUTH_URL};
use crate::error::{Result, SyncError};
use crate::models::{ActivityRecord, TokenResponse};
use crate::services::rate_limit::RateLimiting;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Query for one page of the athlete activity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
    /// Only activities starting after this Unix timestamp
    pub after: Option<i64>,
}

/// Strava OAuth endpoints.
#[async_trait]
pub trait OAuthApi: Send + Sync {
    /// URL the user opens to grant access.
    fn authorization_url(&self, auth: &AuthConfig, scope: &str) -> String;

    /// Exchange an authorization code for a credential.
    async fn exchange_code(&self, auth: &AuthConfig, code: &str) -> Result<TokenResponse>;

    /// Refresh an expiring access token.
    async fn refresh_token(&self, auth: &AuthConfig, refresh_token: &str) -> Result<TokenResponse>;
}

/// Strava activity endpoints.
#[async_trait]
pub trait ActivityApi: Send + Sync {
    async fn list_activities(
        &self,
        access_token: &str,
        query: ListQuery,
    ) -> Result<Vec<ActivityRecord>>;

    async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
        include_all_efforts: bool,
    ) -> Result<ActivityRecord>;

    /// Fraction of the rate limit used so far, NaN when unknown.
    fn rate_usage(&self) -> f64;
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    rate_limits: Arc<RateLimiting>,
}

impl Default for StravaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StravaClient {
    /// Create a client pointing at the public Strava API.
    pub fn new() -> Self {
        Self::with_base_urls(STRAVA_API_URL, STRAVA_OAUTH_URL)
    }

    /// Create a client against custom endpoints (tests, proxies).
    pub fn with_base_urls(base_url: &str, oauth_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            rate_limits: Arc::new(RateLimiting::new()),
        }
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(form)
            .send()
            .await
            .map_err(|e| SyncError::StravaApi(format!("Token request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        self.rate_limits.update_from_headers(response.headers());

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(SyncError::StravaApi(SyncError::STRAVA_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(SyncError::StravaApi(
                    SyncError::STRAVA_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(SyncError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl OAuthApi for StravaClient {
    fn authorization_url(&self, auth: &AuthConfig, scope: &str) -> String {
        format!(
            "{}/authorize?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             approval_prompt=auto&\
             scope={}",
            self.oauth_url,
            urlencoding::encode(&auth.client_id),
            urlencoding::encode(&auth.redirect_uri),
            scope
        )
    }

    async fn exchange_code(&self, auth: &AuthConfig, code: &str) -> Result<TokenResponse> {
        self.post_token_form(&[
            ("client_id", auth.client_id.as_str()),
            ("client_secret", auth.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh_token(&self, auth: &AuthConfig, refresh_token: &str) -> Result<TokenResponse> {
        self.post_token_form(&[
            ("client_id", auth.client_id.as_str()),
            ("client_secret", auth.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }
}

#[async_trait]
impl ActivityApi for StravaClient {
    async fn list_activities(
        &self,
        access_token: &str,
        query: ListQuery,
    ) -> Result<Vec<ActivityRecord>> {
        let url = format!("{}/athlete/activities", self.base_url);

        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(after) = query.after {
            params.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| SyncError::StravaApi(e.to_string()))?;

        let documents: Vec<Value> = self.check_response_json(response).await?;
        documents.into_iter().map(parse_activity).collect()
    }

    async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
        include_all_efforts: bool,
    ) -> Result<ActivityRecord> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("include_all_efforts", include_all_efforts.to_string())])
            .send()
            .await
            .map_err(|e| SyncError::StravaApi(e.to_string()))?;

        let document: Value = self.check_response_json(response).await?;
        parse_activity(document)
    }

    fn rate_usage(&self) -> f64 {
        self.rate_limits.fraction_reached()
    }
}

fn parse_activity(document: Value) -> Result<ActivityRecord> {
    ActivityRecord::from_json(document)
        .map_err(|e| SyncError::StravaApi(format!("JSON parse error: {}", e)))
}
