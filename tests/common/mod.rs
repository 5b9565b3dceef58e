// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use strava_vault::config::{AuthConfig, Config, MemorySettingsStore, Settings};
use strava_vault::error::{Result, SyncError};
use strava_vault::events::EventBus;
use strava_vault::models::{ActivityMap, ActivityRecord, Token, TokenResponse};
use strava_vault::services::{ActivityApi, ListQuery, OAuthApi, SyncService, TokenManager};
use strava_vault::vault::memory::MemoryVault;

/// Google's reference polyline, three points across California.
#[allow(dead_code)]
pub const REFERENCE_POLYLINE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

/// In-process stand-in for the Strava API.
///
/// Listings are keyed by the `after` filter. A listing with an `after` that
/// has no exact entry is served from `backfill`.
#[derive(Default)]
pub struct FakeStrava {
    pub listings: Mutex<HashMap<Option<i64>, Vec<ActivityRecord>>>,
    pub backfill: Mutex<Vec<ActivityRecord>>,
    pub details: Mutex<HashMap<u64, ActivityRecord>>,
    pub queries: Mutex<Vec<ListQuery>>,
    pub usage: Mutex<f64>,
    pub refreshes: Mutex<usize>,
    pub fail_listing: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl FakeStrava {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        *fake.usage.lock().unwrap() = f64::NAN;
        Arc::new(fake)
    }

    pub fn set_listing(&self, after: Option<i64>, activities: Vec<ActivityRecord>) {
        self.listings.lock().unwrap().insert(after, activities);
    }

    pub fn set_backfill(&self, activities: Vec<ActivityRecord>) {
        *self.backfill.lock().unwrap() = activities;
    }

    pub fn set_detail(&self, activity: ActivityRecord) {
        self.details.lock().unwrap().insert(activity.id, activity);
    }

    pub fn set_usage(&self, fraction: f64) {
        *self.usage.lock().unwrap() = fraction;
    }

    pub fn queries(&self) -> Vec<ListQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }
}

#[async_trait]
impl ActivityApi for FakeStrava {
    async fn list_activities(
        &self,
        _access_token: &str,
        query: ListQuery,
    ) -> Result<Vec<ActivityRecord>> {
        self.queries.lock().unwrap().push(query);
        if let Some(message) = self.fail_listing.lock().unwrap().clone() {
            return Err(SyncError::StravaApi(message));
        }

        let all = match self.listings.lock().unwrap().get(&query.after) {
            Some(listing) => listing.clone(),
            None => self.backfill.lock().unwrap().clone(),
        };
        let start = ((query.page - 1) * query.per_page) as usize;
        Ok(all
            .into_iter()
            .skip(start)
            .take(query.per_page as usize)
            .collect())
    }

    async fn get_activity(
        &self,
        _access_token: &str,
        activity_id: u64,
        _include_all_efforts: bool,
    ) -> Result<ActivityRecord> {
        self.details
            .lock()
            .unwrap()
            .get(&activity_id)
            .cloned()
            .ok_or_else(|| SyncError::StravaApi("HTTP 404 Not Found: Record Not Found".to_string()))
    }

    fn rate_usage(&self) -> f64 {
        *self.usage.lock().unwrap()
    }
}

#[async_trait]
impl OAuthApi for FakeStrava {
    fn authorization_url(&self, auth: &AuthConfig, scope: &str) -> String {
        format!(
            "https://www.strava.com/oauth/authorize?client_id={}&scope={}",
            auth.client_id, scope
        )
    }

    async fn exchange_code(&self, _auth: &AuthConfig, code: &str) -> Result<TokenResponse> {
        Ok(TokenResponse {
            token_type: Some("Bearer".to_string()),
            access_token: Some(format!("access_{}", code)),
            refresh_token: Some(format!("refresh_{}", code)),
            expires_at: Some(Utc::now().timestamp() + 21600),
            expires_in: Some(21600),
            athlete: Some(serde_json::json!({"id": 1234})),
        })
    }

    async fn refresh_token(&self, _auth: &AuthConfig, _refresh_token: &str) -> Result<TokenResponse> {
        let mut refreshes = self.refreshes.lock().unwrap();
        *refreshes += 1;
        Ok(TokenResponse {
            access_token: Some(format!("refreshed_{}", *refreshes)),
            expires_at: Some(Utc::now().timestamp() + 21600),
            expires_in: Some(21600),
            ..Default::default()
        })
    }
}

/// Activity with a name and local start time.
#[allow(dead_code)]
pub fn activity(id: u64, start_local: &str) -> ActivityRecord {
    let mut activity = ActivityRecord::new(id);
    activity.name = Some(format!("Activity {}", id));
    activity.sport_type = Some("Ride".to_string());
    activity.start_date = Some(start_local.to_string());
    activity.start_date_local = Some(start_local.to_string());
    activity.distance = Some(12345.6);
    activity.moving_time = Some(2700);
    activity
}

/// Same as [`activity`] with a summary polyline.
#[allow(dead_code)]
pub fn activity_with_route(id: u64, start_local: &str) -> ActivityRecord {
    let mut activity = activity(id, start_local);
    activity.map = Some(ActivityMap {
        id: Some(format!("a{}", id)),
        polyline: None,
        summary_polyline: Some(REFERENCE_POLYLINE.to_string()),
        extra: serde_json::Map::new(),
    });
    activity
}

/// Token valid for `secs` more seconds.
#[allow(dead_code)]
pub fn token_expiring_in(secs: i64) -> Token {
    Token {
        token_type: "Bearer".to_string(),
        access_token: "saved_access".to_string(),
        refresh_token: "saved_refresh".to_string(),
        expires_at: Utc::now().timestamp() + secs,
        expires_in: secs.max(1),
        athlete: None,
    }
}

/// Settings of a signed-in user with the given watermark.
#[allow(dead_code)]
pub fn signed_in_settings(last_synced_at: &str) -> Settings {
    let mut settings = Settings::default();
    settings.auth_settings.client_id = "113274".to_string();
    settings.auth_settings.client_secret = "secret".to_string();
    settings.auth_settings.access_token = "saved_access".to_string();
    settings.sync_settings.last_synced_at = last_synced_at.to_string();
    settings.saved_token = Some(token_expiring_in(6 * 3600));
    settings
}

#[allow(dead_code)]
pub struct TestHarness {
    pub service: SyncService,
    pub strava: Arc<FakeStrava>,
    pub vault: Arc<MemoryVault>,
    pub store: Arc<MemorySettingsStore>,
}

/// Sync service over a fake Strava, an in-memory vault and settings store.
#[allow(dead_code)]
pub fn harness(settings: Settings, page_size: u32) -> TestHarness {
    let strava = FakeStrava::new();
    let vault = Arc::new(MemoryVault::new());
    let store = Arc::new(MemorySettingsStore::new(None));

    let mut config = Config::test_default();
    config.page_size = page_size;

    let service = SyncService::new(&config, settings, store.clone(), vault.clone(), strava.clone());
    TestHarness {
        service,
        strava,
        vault,
        store,
    }
}

/// Token manager over a fake Strava holding the given token.
#[allow(dead_code)]
pub fn token_manager(strava: Arc<FakeStrava>, token: Option<Token>) -> Arc<TokenManager> {
    let auth = AuthConfig {
        client_id: "113274".to_string(),
        client_secret: "secret".to_string(),
        ..Default::default()
    };
    Arc::new(TokenManager::new(auth, strava, EventBus::new()).with_saved_token(token))
}
