// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model as returned by the list and detail endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An activity document from Strava.
///
/// Only fields the sync engine reads are named. Everything else lands in
/// `extra` so it can be written back out verbatim in the raw block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Strava activity ID
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sport type (Ride, Run, Hike, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport_type: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    /// Start date/time in UTC (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Start date/time in the athlete's local time zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_local: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Distance in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Moving time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving_time: Option<u64>,
    /// Elapsed time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_elevation_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elev_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elev_low: Option<f64>,
    /// Meters per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_heartrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_heartrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_watts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kilojoules: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kudos_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievement_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gear_id: Option<String>,
    /// Device name (e.g. "Garmin Edge 530")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commute: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<ActivityMap>,
    /// Upstream fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Document exactly as Strava sent it, when the record came off the wire.
    #[serde(skip)]
    pub raw: Option<Value>,
}

impl ActivityRecord {
    /// Minimal record, mostly useful for tests and fixtures.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: None,
            sport_type: None,
            activity_type: None,
            start_date: None,
            start_date_local: None,
            timezone: None,
            distance: None,
            moving_time: None,
            elapsed_time: None,
            total_elevation_gain: None,
            elev_high: None,
            elev_low: None,
            average_speed: None,
            max_speed: None,
            average_heartrate: None,
            max_heartrate: None,
            average_watts: None,
            kilojoules: None,
            calories: None,
            kudos_count: None,
            comment_count: None,
            achievement_count: None,
            pr_count: None,
            athlete_count: None,
            photo_count: None,
            gear_id: None,
            device_name: None,
            commute: None,
            trainer: None,
            manual: None,
            private: None,
            map: None,
            extra: Map::new(),
            raw: None,
        }
    }

    /// Parse a Strava document, keeping the original alongside the typed view.
    pub fn from_json(document: Value) -> Result<Self, serde_json::Error> {
        let mut activity: ActivityRecord = serde_json::from_value(document.clone())?;
        activity.raw = Some(document);
        Ok(activity)
    }

    /// The original document, or the typed fields re-serialized for records
    /// built locally.
    pub fn raw_document(&self) -> Result<Value, serde_json::Error> {
        match &self.raw {
            Some(raw) => Ok(raw.clone()),
            None => serde_json::to_value(self),
        }
    }

    /// Get the detailed polyline, falling back to summary if not available.
    pub fn get_polyline(&self) -> Option<&str> {
        let map = self.map.as_ref()?;
        non_empty(map.polyline.as_deref()).or(non_empty(map.summary_polyline.as_deref()))
    }

    /// Summary polyline only (list endpoint).
    pub fn summary_polyline(&self) -> Option<&str> {
        non_empty(self.map.as_ref()?.summary_polyline.as_deref())
    }

    /// Detailed polyline only (detail endpoint).
    pub fn detailed_polyline(&self) -> Option<&str> {
        non_empty(self.map.as_ref()?.polyline.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Activity map data with polylines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_polyline: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
