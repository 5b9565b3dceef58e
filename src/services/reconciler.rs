// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decides which activities a sync writes.
//!
//! A regular sync fetches everything since the watermark. Activities that
//! were uploaded late (after a later sync already ran) would be missed that
//! way, so a sync that has a watermark also re-lists the last 30 days and
//! keeps those activities whose note does not exist yet.

use crate::error::Result;
use crate::events::{EventBus, SyncEvent};
use crate::models::ActivityRecord;
use crate::services::layout::NoteLayout;
use crate::services::retriever::ActivityRetriever;
use crate::time_utils::format_utc_rfc3339;
use crate::vault::Vault;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// How far back the backfill listing reaches.
const BACKFILL_WINDOW_DAYS: i64 = 30;

/// Activities selected by one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub activities: Vec<ActivityRecord>,
    pub total: usize,
    /// How many of `activities` came from the backfill listing only
    pub backfilled: usize,
}

pub struct SyncReconciler {
    retriever: Arc<ActivityRetriever>,
    vault: Arc<dyn Vault>,
    layout: NoteLayout,
    events: Arc<EventBus>,
    page_size: u32,
}

impl SyncReconciler {
    pub fn new(
        retriever: Arc<ActivityRetriever>,
        vault: Arc<dyn Vault>,
        layout: NoteLayout,
        events: Arc<EventBus>,
        page_size: u32,
    ) -> Self {
        Self {
            retriever,
            vault,
            layout,
            events,
            page_size,
        }
    }

    /// Reconcile against the `last_synced_at` watermark (empty = never).
    pub async fn reconcile(&self, last_synced_at: &str) -> Result<ReconcileOutcome> {
        self.reconcile_at(last_synced_at, Utc::now()).await
    }

    /// Full-history resync: the watermark is ignored and nothing is
    /// backfilled.
    pub async fn force(&self) -> Result<ReconcileOutcome> {
        self.reconcile("").await
    }

    async fn reconcile_at(&self, last_synced_at: &str, now: DateTime<Utc>) -> Result<ReconcileOutcome> {
        let watermark = last_synced_at.trim();
        let since = (!watermark.is_empty()).then_some(watermark);

        let recent = self.retriever.list_activities(self.page_size, since).await?;
        tracing::info!(count = recent.len(), since = ?since, "Recent activities listed");

        let backfill = match since {
            Some(_) => {
                let window_start = format_utc_rfc3339(now - Duration::days(BACKFILL_WINDOW_DAYS));
                let listed = self
                    .retriever
                    .list_activities(self.page_size, Some(&window_start))
                    .await?;
                let missing = self.without_existing_notes(listed).await?;
                tracing::info!(
                    count = missing.len(),
                    window_start = %window_start,
                    "Backfill candidates without notes"
                );
                missing
            }
            None => Vec::new(),
        };

        let recent_count = recent.len();
        let activities = merge_unique(recent, backfill);
        let total = activities.len();
        let backfilled = total.saturating_sub(recent_count);

        self.events
            .publish(&SyncEvent::ActivitiesRetrieved { count: total });

        Ok(ReconcileOutcome {
            activities,
            total,
            backfilled,
        })
    }

    /// Keep only activities whose summary note is not in the vault yet.
    async fn without_existing_notes(
        &self,
        activities: Vec<ActivityRecord>,
    ) -> Result<Vec<ActivityRecord>> {
        let mut missing = Vec::with_capacity(activities.len());
        for activity in activities {
            let path = self.layout.note_path(&activity);
            if !self.vault.exists(&path).await? {
                missing.push(activity);
            }
        }
        Ok(missing)
    }
}

/// Concatenate two lists, dropping repeated ids. The first occurrence of an
/// id wins and order is otherwise preserved.
pub fn merge_unique(first: Vec<ActivityRecord>, second: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    let mut seen = HashSet::with_capacity(first.len() + second.len());
    first
        .into_iter()
        .chain(second)
        .filter(|activity| seen.insert(activity.id))
        .collect()
}
