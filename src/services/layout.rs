// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Where activity notes live in the vault.
//!
//! ```text
//! <root>/<date folder>/<activity id>/<note name>.md
//! ```
//!
//! The date folder is `YYYY-MM-DD` unless a folder template with date
//! tokens is configured.

use crate::config::{FilenameFormat, SyncSettings};
use crate::models::ActivityRecord;
use crate::time_utils::{expand_date_format, local_date};
use crate::vault::{files, join_path};
use chrono::NaiveDate;

/// Longest file stem kept after sanitizing, in characters.
const MAX_FILE_STEM_CHARS: usize = 200;

/// Folder for activities without a usable start date.
const UNDATED_FOLDER: &str = "undated";

/// Characters that are unsafe in vault file names.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// Note naming options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLayout {
    pub root_folder: String,
    pub folder_format: Option<String>,
    pub filename_format: FilenameFormat,
}

impl Default for NoteLayout {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

impl NoteLayout {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            root_folder: settings.root_folder.clone(),
            folder_format: settings.folder_format.clone(),
            filename_format: settings.filename_format,
        }
    }

    /// Folder holding every activity that started on `date`.
    pub fn date_folder(&self, date: Option<NaiveDate>) -> String {
        let Some(date) = date else {
            return join_path(&[self.root_folder.as_str(), UNDATED_FOLDER]);
        };

        let expanded = self
            .folder_format
            .as_deref()
            .and_then(|template| expand_date_format(template, date));

        match expanded {
            Some(folder) => join_path(&[self.root_folder.as_str(), folder.as_str()]),
            None => join_path(&[
                self.root_folder.clone(),
                date.format("%Y-%m-%d").to_string(),
            ]),
        }
    }

    /// `<date folder>/<id>` for an activity.
    pub fn activity_folder(&self, activity: &ActivityRecord) -> String {
        join_path(&[
            self.date_folder(activity_date(activity)),
            activity.id.to_string(),
        ])
    }

    /// File name of the summary note, with extension.
    pub fn note_file_name(&self, activity: &ActivityRecord) -> String {
        let stem = match self.filename_format {
            FilenameFormat::Summary => files::SUMMARY_NOTE.to_string(),
            FilenameFormat::ActivityName => {
                sanitize_file_name(activity.name.as_deref().unwrap_or_default())
            }
        };
        format!("{}.{}", stem, files::NOTE_EXTENSION)
    }

    /// Full vault path of the summary note.
    pub fn note_path(&self, activity: &ActivityRecord) -> String {
        join_path(&[self.activity_folder(activity), self.note_file_name(activity)])
    }
}

/// Local start date of an activity, falling back to the UTC start date.
pub fn activity_date(activity: &ActivityRecord) -> Option<NaiveDate> {
    activity
        .start_date_local
        .as_deref()
        .and_then(local_date)
        .or_else(|| activity.start_date.as_deref().and_then(local_date))
}

/// Turn an activity name into a safe file stem.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
            '-'
        } else {
            c
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out
        .trim_start_matches('.')
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    let truncated: String = trimmed.chars().take(MAX_FILE_STEM_CHARS).collect();
    // Truncation can expose a new trailing dot or space
    let truncated = truncated.trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    if truncated.is_empty() {
        files::SUMMARY_NOTE.to_string()
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: u64, start_local: &str) -> ActivityRecord {
        let mut activity = ActivityRecord::new(id);
        activity.name = Some("Lunch Run".to_string());
        activity.start_date_local = Some(start_local.to_string());
        activity
    }

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_file_name("My/Run:2024*Fast"), "My-Run-2024-Fast");
        assert_eq!(sanitize_file_name("a//b"), "a-b");
        assert_eq!(sanitize_file_name("[Tempo] #3 ^"), "-Tempo- -3 -");
        assert_eq!(sanitize_file_name("..hidden."), "hidden");
        assert_eq!(sanitize_file_name("tab\there"), "tab-here");
    }

    #[test]
    fn test_sanitize_empty_falls_back() {
        assert_eq!(sanitize_file_name(""), "Summary");
        assert_eq!(sanitize_file_name("..."), "Summary");
        assert_eq!(sanitize_file_name("  "), "Summary");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long = "x".repeat(300);
        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized.chars().count(), 200);

        let multibyte = "é".repeat(250);
        assert_eq!(sanitize_file_name(&multibyte).chars().count(), 200);
    }

    #[test]
    fn test_default_layout() {
        let layout = NoteLayout::default();
        let activity = run(42, "2024-03-05T07:12:00Z");
        assert_eq!(layout.activity_folder(&activity), "Strava/2024-03-05/42");
        assert_eq!(layout.note_path(&activity), "Strava/2024-03-05/42/Summary.md");
    }

    #[test]
    fn test_templated_folder_and_named_file() {
        let layout = NoteLayout {
            root_folder: "Sport".to_string(),
            folder_format: Some("YYYY/MM/DD".to_string()),
            filename_format: FilenameFormat::ActivityName,
        };
        let activity = run(42, "2024-03-05T07:12:00Z");
        assert_eq!(layout.note_path(&activity), "Sport/2024/03/05/42/Lunch Run.md");
    }

    #[test]
    fn test_template_without_tokens_uses_iso_date() {
        let layout = NoteLayout {
            folder_format: Some("Activities".to_string()),
            ..NoteLayout::default()
        };
        let activity = run(1, "2024-03-05T23:59:00Z");
        assert_eq!(layout.activity_folder(&activity), "Strava/2024-03-05/1");
    }

    #[test]
    fn test_local_date_preferred_over_utc() {
        let mut activity = run(9, "2024-03-05T23:30:00Z");
        activity.start_date = Some("2024-03-06T07:30:00Z".to_string());
        assert_eq!(activity_date(&activity), NaiveDate::from_ymd_opt(2024, 3, 5));

        activity.start_date_local = None;
        assert_eq!(activity_date(&activity), NaiveDate::from_ymd_opt(2024, 3, 6));
    }

    #[test]
    fn test_undated_activity() {
        let layout = NoteLayout::default();
        assert_eq!(
            layout.activity_folder(&ActivityRecord::new(3)),
            "Strava/undated/3"
        );
    }
}
