// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Vault: keep a folder of Markdown notes in step with Strava
//!
//! This crate syncs one athlete's Strava activities into a vault of
//! Markdown notes, one folder per activity, with the route saved as GeoJSON.

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod time_utils;
pub mod vault;
