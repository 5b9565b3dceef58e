// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Markdown rendering of activity notes.
//!
//! A note has four parts: YAML frontmatter with a fixed set of scalar
//! fields, a readable summary, an optional Leaflet map block and the full
//! record as a JSON block. The same record always renders the same bytes.

use crate::error::{Result, SyncError};
use crate::models::ActivityRecord;
use crate::services::geometry;
use crate::services::layout::activity_date;
use serde_json::Value;
use std::fmt::Write as _;

/// Which note is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Summary,
    Detailed,
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Text,
    Meters,
    Kilometers,
    Seconds,
    Speed,
    BeatsPerMinute,
    Watts,
    Kilojoules,
    Calories,
    Count,
    Flag,
}

/// Frontmatter fields, in output order, with their display label.
const FIELDS: &[(&str, &str, Unit)] = &[
    ("id", "Activity ID", Unit::Count),
    ("name", "Name", Unit::Text),
    ("sport_type", "Sport", Unit::Text),
    ("type", "Type", Unit::Text),
    ("start_date", "Start (UTC)", Unit::Text),
    ("start_date_local", "Start (local)", Unit::Text),
    ("timezone", "Timezone", Unit::Text),
    ("distance", "Distance", Unit::Kilometers),
    ("moving_time", "Moving time", Unit::Seconds),
    ("elapsed_time", "Elapsed time", Unit::Seconds),
    ("total_elevation_gain", "Elevation gain", Unit::Meters),
    ("elev_high", "Highest point", Unit::Meters),
    ("elev_low", "Lowest point", Unit::Meters),
    ("average_speed", "Average speed", Unit::Speed),
    ("max_speed", "Max speed", Unit::Speed),
    ("average_heartrate", "Average heart rate", Unit::BeatsPerMinute),
    ("max_heartrate", "Max heart rate", Unit::BeatsPerMinute),
    ("average_watts", "Average power", Unit::Watts),
    ("kilojoules", "Energy", Unit::Kilojoules),
    ("calories", "Calories", Unit::Calories),
    ("kudos_count", "Kudos", Unit::Count),
    ("comment_count", "Comments", Unit::Count),
    ("achievement_count", "Achievements", Unit::Count),
    ("pr_count", "PRs", Unit::Count),
    ("athlete_count", "Athletes", Unit::Count),
    ("photo_count", "Photos", Unit::Count),
    ("gear_id", "Gear", Unit::Text),
    ("device_name", "Device", Unit::Text),
    ("commute", "Commute", Unit::Flag),
    ("trainer", "Trainer", Unit::Flag),
    ("manual", "Manual", Unit::Flag),
    ("private", "Private", Unit::Flag),
];

/// Render the Markdown note for an activity.
pub fn render_note(activity: &ActivityRecord, kind: NoteKind) -> Result<String> {
    let record = activity
        .raw_document()
        .map_err(|e| SyncError::Internal(anyhow::anyhow!("serializing activity: {}", e)))?;
    let raw = serde_json::to_string_pretty(&record)
        .map_err(|e| SyncError::Internal(anyhow::anyhow!("serializing activity: {}", e)))?;

    let present: Vec<(&str, &str, Unit, &Value)> = FIELDS
        .iter()
        .filter_map(|(key, label, unit)| {
            record
                .get(*key)
                .filter(|v| is_scalar(v))
                .map(|v| (*key, *label, *unit, v))
        })
        .collect();

    let mut note = String::from("---\n");
    for (key, _, _, value) in &present {
        let _ = writeln!(note, "{}: {}", key, value);
    }
    note.push_str("---\n\n");

    let title = activity.name.as_deref().unwrap_or("Untitled activity");
    match kind {
        NoteKind::Summary => {
            let _ = writeln!(note, "# {}\n", title);
        }
        NoteKind::Detailed => {
            let _ = writeln!(note, "# {} (detailed)\n", title);
        }
    }
    let _ = writeln!(note, "{}\n", summary_line(activity));

    for (key, label, unit, value) in &present {
        if *key == "name" {
            continue;
        }
        let _ = writeln!(note, "- **{}:** {}", label, display(value, *unit));
    }

    if activity.get_polyline().is_some() {
        match geometry::leaflet_block(activity) {
            Ok(block) => {
                let _ = write!(note, "\n{}\n", block);
            }
            Err(e) => {
                tracing::warn!(activity_id = activity.id, error = %e, "Skipping map block");
            }
        }
    }

    let _ = write!(note, "\n~~~json\n{}\n~~~\n", raw);
    Ok(note)
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// One-line overview: sport, date, distance and moving time.
fn summary_line(activity: &ActivityRecord) -> String {
    let sport = activity
        .sport_type
        .as_deref()
        .or(activity.activity_type.as_deref())
        .unwrap_or("Activity");

    let mut line = match activity_date(activity) {
        Some(date) => format!("{} on {}", sport, date.format("%A, %-d %B %Y")),
        None => sport.to_string(),
    };
    if let Some(distance) = activity.distance {
        let _ = write!(line, ", {:.2} km", distance / 1000.0);
    }
    if let Some(moving) = activity.moving_time {
        let _ = write!(line, " in {}", format_duration(moving));
    }
    line
}

fn display(value: &Value, unit: Unit) -> String {
    let number = value.as_f64();
    match (unit, number) {
        (Unit::Kilometers, Some(m)) => format!("{:.2} km", m / 1000.0),
        (Unit::Meters, Some(m)) => format!("{:.0} m", m),
        (Unit::Seconds, Some(s)) => format_duration(s.max(0.0) as u64),
        (Unit::Speed, Some(mps)) => format!("{:.1} km/h", mps * 3.6),
        (Unit::BeatsPerMinute, Some(bpm)) => format!("{:.0} bpm", bpm),
        (Unit::Watts, Some(w)) => format!("{:.0} W", w),
        (Unit::Kilojoules, Some(kj)) => format!("{:.0} kJ", kj),
        (Unit::Calories, Some(kcal)) => format!("{:.0} kcal", kcal),
        (Unit::Flag, _) => match value.as_bool() {
            Some(true) => "yes".to_string(),
            Some(false) => "no".to_string(),
            None => value.to_string(),
        },
        (_, _) => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// `h:mm:ss`, or `m:ss` under an hour.
fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
