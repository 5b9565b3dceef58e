// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Top-level sync commands.
//!
//! [`SyncService`] wires the token manager, retriever, reconciler and
//! materializer together, keeps the settings blob current and is the one
//! place where errors are turned into messages for the user.

use crate::config::{Config, Settings, SettingsStore};
use crate::error::{Result, SyncError};
use crate::events::{ActivitySink, EventBus, SyncEvent};
use crate::models::Token;
use crate::services::auth::{Browser, CallbackArgs, TokenManager};
use crate::services::layout::NoteLayout;
use crate::services::materializer::FileMaterializer;
use crate::services::reconciler::{ReconcileOutcome, SyncReconciler};
use crate::services::retriever::ActivityRetriever;
use crate::services::strava::{ActivityApi, OAuthApi};
use crate::time_utils::format_utc_rfc3339;
use crate::vault::{parent_path, Vault};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

/// User-facing commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Authenticate,
    /// Finish authorization with the redirect URI Strava sent back
    CompleteAuth(String),
    Sync,
    ForceSync,
    /// Fetch the detailed activity behind an existing note
    Detail(String),
}

/// Result of a sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub total: usize,
    pub backfilled: usize,
    pub notes: Vec<String>,
}

pub struct SyncService {
    settings: Arc<Mutex<Settings>>,
    store: Arc<dyn SettingsStore>,
    vault: Arc<dyn Vault>,
    tokens: Arc<TokenManager>,
    retriever: Arc<ActivityRetriever>,
    reconciler: SyncReconciler,
    sink: Arc<dyn ActivitySink>,
    events: Arc<EventBus>,
}

impl SyncService {
    /// Load saved settings from `store` and build the service.
    pub async fn load<A>(
        config: &Config,
        store: Arc<dyn SettingsStore>,
        vault: Arc<dyn Vault>,
        strava: Arc<A>,
    ) -> Result<Self>
    where
        A: ActivityApi + OAuthApi + 'static,
    {
        let saved = store.load().await?;
        let mut settings = Settings::reconcile(saved)?;
        config.apply_overrides(&mut settings);
        Ok(Self::new(config, settings, store, vault, strava))
    }

    pub fn new<A>(
        config: &Config,
        settings: Settings,
        store: Arc<dyn SettingsStore>,
        vault: Arc<dyn Vault>,
        strava: Arc<A>,
    ) -> Self
    where
        A: ActivityApi + OAuthApi + 'static,
    {
        let events = EventBus::new();
        let layout = NoteLayout::from_settings(&settings.sync_settings);
        let saved_token = settings.saved_token.clone();
        let auth_config = settings.auth_settings.clone();
        let settings = Arc::new(Mutex::new(settings));

        // Keep the settings blob in step with the live credential
        let tracked = settings.clone();
        events.subscribe(move |event| {
            if let SyncEvent::TokenUpdated(token) = event {
                let mut settings = tracked.lock().unwrap_or_else(|e| e.into_inner());
                settings.auth_settings.access_token = token.access_token.clone();
                settings.saved_token = Some(token.clone());
            }
        });

        let oauth: Arc<dyn OAuthApi> = strava.clone();
        let api: Arc<dyn ActivityApi> = strava;

        let tokens = Arc::new(
            TokenManager::new(auth_config, oauth, events.clone()).with_saved_token(saved_token),
        );
        let sink: Arc<dyn ActivitySink> = Arc::new(FileMaterializer::new(
            vault.clone(),
            layout.clone(),
            events.clone(),
        ));
        let retriever = Arc::new(ActivityRetriever::new(
            api,
            tokens.clone(),
            events.clone(),
            sink.clone(),
        ));
        let reconciler = SyncReconciler::new(
            retriever.clone(),
            vault.clone(),
            layout,
            events.clone(),
            config.page_size,
        );

        Self {
            settings,
            store,
            vault,
            tokens,
            retriever,
            reconciler,
            sink,
            events,
        }
    }

    /// Event bus for extra listeners (progress output, tests).
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Current settings.
    pub fn settings(&self) -> Settings {
        self.lock_settings().clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.tokens.is_signed_in().await
    }

    /// Run a command and describe the outcome for the user.
    pub async fn execute(
        &self,
        command: Command,
        browser: &dyn Browser,
    ) -> std::result::Result<String, String> {
        let result = match command {
            Command::Authenticate => self
                .authenticate(browser)
                .await
                .map(|_| "Opened Strava authorization page.".to_string()),
            Command::CompleteAuth(uri) => self
                .complete_authorization(&uri)
                .await
                .map(|_| "Authenticated with Strava".to_string()),
            Command::Sync => self.sync_now().await.map(|r| describe_sync(&r)),
            Command::ForceSync => self.force_resync().await.map(|r| describe_sync(&r)),
            Command::Detail(note) => self
                .detail_for_note(&note)
                .await
                .map(|path| format!("Detailed activity written to {}", path)),
        };

        result.map_err(|e| {
            tracing::warn!(error = %e, "Command failed");
            e.user_message()
        })
    }

    pub async fn authenticate(&self, browser: &dyn Browser) -> Result<()> {
        self.tokens.authenticate(browser).await
    }

    /// Complete authorization from the redirect URI and persist the token.
    pub async fn complete_authorization(&self, uri: &str) -> Result<Token> {
        let callback = CallbackArgs::from_uri(uri)?;
        let token = self.tokens.complete_authorization(&callback).await?;
        self.persist().await?;
        Ok(token)
    }

    /// Incremental sync from the saved watermark.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        let watermark = self.lock_settings().sync_settings.last_synced_at.clone();
        tracing::info!(watermark = %watermark, "Starting sync");
        let outcome = self.reconciler.reconcile(&watermark).await;
        self.complete_sync(outcome).await
    }

    /// Rewrite every activity regardless of the watermark.
    pub async fn force_resync(&self) -> Result<SyncReport> {
        tracing::info!("Starting full resync");
        let outcome = self.reconciler.force().await;
        self.complete_sync(outcome).await
    }

    async fn complete_sync(&self, outcome: Result<ReconcileOutcome>) -> Result<SyncReport> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                // A refreshed token is still worth keeping
                self.persist_best_effort().await;
                return Err(e);
            }
        };

        let notes = match self.sink.activities_retrieved(&outcome.activities).await {
            Ok(notes) => notes,
            Err(e) => {
                self.persist_best_effort().await;
                return Err(e);
            }
        };

        let watermark = format_utc_rfc3339(Utc::now());
        self.lock_settings().sync_settings.last_synced_at = watermark.clone();
        self.persist().await?;

        tracing::info!(
            total = outcome.total,
            backfilled = outcome.backfilled,
            watermark = %watermark,
            "Sync complete"
        );
        Ok(SyncReport {
            total: outcome.total,
            backfilled: outcome.backfilled,
            notes,
        })
    }

    /// Fetch the detailed activity for an existing note and write
    /// `Detailed.md` next to it. Returns the path written.
    pub async fn detail_for_note(&self, note_path: &str) -> Result<String> {
        let note_path = note_path.trim().trim_matches('/');
        let contents = self.vault.read(note_path).await?;
        let activity_id = activity_id_for_note(note_path, &contents).ok_or_else(|| {
            SyncError::Internal(anyhow::anyhow!("No activity id found for {}", note_path))
        })?;

        let folder = parent_path(note_path);
        let hint = (!folder.is_empty()).then_some(folder);
        let result = self.retriever.get_activity_detail(activity_id, hint).await;
        self.persist_best_effort().await;
        Ok(result?.note_path)
    }

    fn lock_settings(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn persist(&self) -> Result<()> {
        let blob = self.lock_settings().to_value()?;
        self.store.save(&blob).await?;
        Ok(())
    }

    async fn persist_best_effort(&self) {
        if let Err(e) = self.persist().await {
            tracing::warn!(error = %e, "Failed to save settings");
        }
    }
}

fn describe_sync(report: &SyncReport) -> String {
    if report.backfilled > 0 {
        format!(
            "Synced {} activities ({} backfilled)",
            report.total, report.backfilled
        )
    } else {
        format!("Synced {} activities", report.total)
    }
}

/// Activity id from the note's frontmatter `id:` line, or else from the name
/// of the folder holding the note.
pub fn activity_id_for_note(note_path: &str, contents: &str) -> Option<u64> {
    frontmatter_id(contents).or_else(|| {
        parent_path(note_path)
            .rsplit('/')
            .next()
            .and_then(|folder| folder.parse().ok())
    })
}

fn frontmatter_id(contents: &str) -> Option<u64> {
    let mut lines = contents.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }
    lines
        .take_while(|line| line.trim() != "---")
        .find_map(|line| line.strip_prefix("id:"))
        .and_then(|value| value.trim().trim_matches('"').parse().ok())
}
