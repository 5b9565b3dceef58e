// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync notifications and the activity delivery seam.
//!
//! Notifications (`SyncEvent`) go through an [`EventBus`] whose listeners run
//! synchronously, in subscription order. Activity records themselves are
//! handed to an explicit [`ActivitySink`], wired at construction time.

use crate::error::Result;
use crate::models::{ActivityRecord, Token};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Something that happened during a sync.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A reconciled batch is about to be materialized.
    ActivitiesRetrieved { count: usize },
    /// A single detailed activity was fetched.
    ActivityRetrieved { id: u64, hint_path: Option<String> },
    /// Every activity in the batch has been written.
    ActivitiesSynced { count: usize },
    /// A new or refreshed credential was issued.
    TokenUpdated(Token),
}

type Listener = Box<dyn Fn(&SyncEvent) + Send + Sync>;

/// In-process publish/subscribe channel.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(listener));
    }

    /// Deliver an event to every listener before returning.
    pub fn publish(&self, event: &SyncEvent) {
        tracing::debug!(event = event_name(event), "Publishing sync event");
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(event);
        }
    }
}

fn event_name(event: &SyncEvent) -> &'static str {
    match event {
        SyncEvent::ActivitiesRetrieved { .. } => "activities_retrieved",
        SyncEvent::ActivityRetrieved { .. } => "activity_retrieved",
        SyncEvent::ActivitiesSynced { .. } => "activities_synced",
        SyncEvent::TokenUpdated(_) => "token_updated",
    }
}

/// Receiver of retrieved activity records.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    /// Materialize a reconciled batch. Returns the written note paths.
    async fn activities_retrieved(&self, activities: &[ActivityRecord]) -> Result<Vec<String>>;

    /// Materialize a single detailed activity, optionally into `hint_path`.
    async fn activity_retrieved(
        &self,
        activity: &ActivityRecord,
        hint_path: Option<&str>,
    ) -> Result<String>;
}
