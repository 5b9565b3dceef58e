// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod geometry;
pub mod layout;
pub mod materializer;
pub mod note;
pub mod rate_limit;
pub mod reconciler;
pub mod retriever;
pub mod strava;
pub mod sync;

pub use auth::{AuthState, Browser, CallbackArgs, RateBudget, SystemBrowser, TokenManager};
pub use layout::NoteLayout;
pub use materializer::FileMaterializer;
pub use reconciler::{ReconcileOutcome, SyncReconciler};
pub use retriever::{ActivityRetriever, RetrievedDetail};
pub use strava::{ActivityApi, ListQuery, OAuthApi, StravaClient};
pub use sync::{Command, SyncReport, SyncService};
