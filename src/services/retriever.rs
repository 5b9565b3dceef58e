// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Paginated, rate-aware activity retrieval.

use crate::config::ConfigError;
use crate::error::{Result, SyncError};
use crate::events::{ActivitySink, EventBus, SyncEvent};
use crate::models::ActivityRecord;
use crate::services::auth::{RateBudget, TokenManager};
use crate::services::strava::{ActivityApi, ListQuery};
use crate::time_utils::watermark_to_epoch;
use std::sync::Arc;
use std::time::Duration;

/// How long to hold back once the rate budget is spent.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// A detailed activity and the note it was written to.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDetail {
    pub activity: ActivityRecord,
    pub note_path: String,
}

/// Fetches activities from Strava on behalf of the synced account.
pub struct ActivityRetriever {
    api: Arc<dyn ActivityApi>,
    tokens: Arc<TokenManager>,
    events: Arc<EventBus>,
    sink: Arc<dyn ActivitySink>,
}

impl ActivityRetriever {
    pub fn new(
        api: Arc<dyn ActivityApi>,
        tokens: Arc<TokenManager>,
        events: Arc<EventBus>,
        sink: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            api,
            tokens,
            events,
            sink,
        }
    }

    /// Fetch every activity starting after `since` (RFC3339), page by page.
    ///
    /// A full page means there may be more; a short or empty page ends the
    /// listing. Pages are concatenated in the order Strava returns them.
    pub async fn list_activities(
        &self,
        page_size: u32,
        since: Option<&str>,
    ) -> Result<Vec<ActivityRecord>> {
        if page_size == 0 {
            return Err(ConfigError::Invalid("page size must be positive".to_string()).into());
        }

        let after = match since {
            Some(since) => watermark_to_epoch(since).map_err(|e| {
                SyncError::Config(ConfigError::Invalid(format!(
                    "sync watermark {:?}: {}",
                    since, e
                )))
            })?,
            None => None,
        };

        let mut activities = Vec::new();
        let mut page = 1;
        loop {
            let access_token = self.prepare_request().await?;
            let batch = self
                .api
                .list_activities(
                    &access_token,
                    ListQuery {
                        page,
                        per_page: page_size,
                        after,
                    },
                )
                .await?;

            let fetched = batch.len();
            tracing::debug!(page, fetched, after = ?after, "Fetched activity page");
            activities.extend(batch);

            if fetched < page_size as usize {
                break;
            }
            page += 1;
        }

        tracing::info!(
            count = activities.len(),
            pages = page,
            "Activity listing complete"
        );
        Ok(activities)
    }

    /// Fetch one activity with all segment efforts and write its detail note.
    pub async fn get_activity_detail(
        &self,
        activity_id: u64,
        hint_path: Option<&str>,
    ) -> Result<RetrievedDetail> {
        let access_token = self.prepare_request().await?;
        let activity = self
            .api
            .get_activity(&access_token, activity_id, true)
            .await?;

        tracing::info!(activity_id, "Fetched activity detail");
        self.events.publish(&SyncEvent::ActivityRetrieved {
            id: activity.id,
            hint_path: hint_path.map(String::from),
        });
        let note_path = self.sink.activity_retrieved(&activity, hint_path).await?;

        Ok(RetrievedDetail {
            activity,
            note_path,
        })
    }

    /// Valid access token, after waiting out a cooldown if the rate budget
    /// is spent.
    async fn prepare_request(&self) -> Result<String> {
        let access_token = self.tokens.ensure_valid().await?;

        let usage = self.api.rate_usage();
        if self.tokens.check_rate_budget(usage) == RateBudget::Ok {
            return Ok(access_token);
        }

        tracing::warn!(
            usage,
            cooldown_secs = RATE_LIMIT_COOLDOWN.as_secs(),
            "Strava rate budget spent, cooling down"
        );
        tokio::time::sleep(RATE_LIMIT_COOLDOWN).await;

        // The token may have aged past the refresh margin while waiting
        self.tokens.ensure_valid().await
    }
}
