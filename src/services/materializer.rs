// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Writes activity notes and route maps into the vault.

use crate::error::{Result, SyncError};
use crate::events::{ActivitySink, EventBus, SyncEvent};
use crate::models::ActivityRecord;
use crate::services::geometry;
use crate::services::layout::{activity_date, NoteLayout};
use crate::services::note::{render_note, NoteKind};
use crate::vault::{ensure_folder, files, join_path, replace_file, Vault};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// Materializes activity records as files. Writing the same record twice
/// produces identical files.
pub struct FileMaterializer {
    vault: Arc<dyn Vault>,
    layout: NoteLayout,
    events: Arc<EventBus>,
}

impl FileMaterializer {
    pub fn new(vault: Arc<dyn Vault>, layout: NoteLayout, events: Arc<EventBus>) -> Self {
        Self {
            vault,
            layout,
            events,
        }
    }

    /// Write summary notes for a batch, grouped by start date.
    ///
    /// Returns the note paths in write order. `ActivitiesSynced` is only
    /// published once every note in the batch has been written.
    pub async fn materialize_batch(&self, activities: &[ActivityRecord]) -> Result<Vec<String>> {
        if activities.is_empty() {
            return Ok(Vec::new());
        }

        let mut written = Vec::with_capacity(activities.len());
        for (date, group) in group_by_date(activities) {
            let base = self.layout.date_folder(date);
            ensure_folder(self.vault.as_ref(), &base).await?;

            for activity in group {
                let folder = join_path(&[base.clone(), activity.id.to_string()]);
                ensure_folder(self.vault.as_ref(), &folder).await?;

                if activity.summary_polyline().is_some() {
                    self.write_map(&folder, activity, false).await?;
                }

                let path = join_path(&[folder, self.layout.note_file_name(activity)]);
                let note = render_note(activity, NoteKind::Summary)?;
                replace_file(self.vault.as_ref(), &path, &note).await?;

                tracing::debug!(activity_id = activity.id, path = %path, "Wrote activity note");
                written.push(path);
            }
        }

        tracing::info!(count = written.len(), "Activity notes written");
        self.events.publish(&SyncEvent::ActivitiesSynced {
            count: written.len(),
        });
        Ok(written)
    }

    /// Write `Detailed.md` for one activity into `hint_path`, or into the
    /// activity's own folder when no hint is given.
    pub async fn materialize_detail(
        &self,
        activity: &ActivityRecord,
        hint_path: Option<&str>,
    ) -> Result<String> {
        let folder = match hint_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(hint) => hint.trim_matches('/').to_string(),
            None => self.layout.activity_folder(activity),
        };
        ensure_folder(self.vault.as_ref(), &folder).await?;

        if activity.detailed_polyline().is_some() {
            self.write_map(&folder, activity, true).await?;
        }

        let path = join_path(&[
            folder,
            format!("{}.{}", files::DETAILED_NOTE, files::NOTE_EXTENSION),
        ]);
        let note = render_note(activity, NoteKind::Detailed)?;
        replace_file(self.vault.as_ref(), &path, &note).await?;

        tracing::info!(activity_id = activity.id, path = %path, "Wrote detailed note");
        Ok(path)
    }

    /// Write `map.geojson`. A polyline that does not decode only costs the
    /// map; the note is still written.
    async fn write_map(
        &self,
        folder: &str,
        activity: &ActivityRecord,
        detailed: bool,
    ) -> Result<()> {
        let collection = match geometry::to_feature_collection(activity, detailed) {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!(
                    activity_id = activity.id,
                    error = %e,
                    "Skipping map for activity"
                );
                return Ok(());
            }
        };

        let contents = serde_json::to_string_pretty(&collection)
            .map_err(|e| SyncError::Internal(anyhow::anyhow!("serializing GeoJSON: {}", e)))?;
        let path = join_path(&[folder, files::MAP_FILE]);
        replace_file(self.vault.as_ref(), &path, &contents).await?;
        Ok(())
    }
}

/// Group activities by start date, keeping the order in which each date
/// and each activity was first seen.
fn group_by_date(activities: &[ActivityRecord]) -> Vec<(Option<NaiveDate>, Vec<&ActivityRecord>)> {
    let mut groups: Vec<(Option<NaiveDate>, Vec<&ActivityRecord>)> = Vec::new();
    for activity in activities {
        let date = activity_date(activity);
        match groups.iter_mut().find(|(d, _)| *d == date) {
            Some((_, group)) => group.push(activity),
            None => groups.push((date, vec![activity])),
        }
    }
    groups
}

#[async_trait]
impl ActivitySink for FileMaterializer {
    async fn activities_retrieved(&self, activities: &[ActivityRecord]) -> Result<Vec<String>> {
        self.materialize_batch(activities).await
    }

    async fn activity_retrieved(
        &self,
        activity: &ActivityRecord,
        hint_path: Option<&str>,
    ) -> Result<String> {
        self.materialize_detail(activity, hint_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilenameFormat;
    use crate::models::ActivityMap;
    use crate::vault::memory::MemoryVault;
    use serde_json::Map;
    use std::sync::Mutex;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn activity(id: u64, start_local: &str, polyline: Option<&str>) -> ActivityRecord {
        let mut activity = ActivityRecord::new(id);
        activity.name = Some(format!("Ride {}", id));
        activity.start_date_local = Some(start_local.to_string());
        activity.map = polyline.map(|p| ActivityMap {
            id: None,
            polyline: None,
            summary_polyline: Some(p.to_string()),
            extra: Map::new(),
        });
        activity
    }

    fn materializer(vault: Arc<MemoryVault>, layout: NoteLayout) -> (FileMaterializer, Arc<Mutex<Vec<SyncEvent>>>) {
        let events = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        events.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        (FileMaterializer::new(vault, layout, events), seen)
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let vault = Arc::new(MemoryVault::new());
        let (materializer, events) = materializer(vault.clone(), NoteLayout::default());

        assert!(materializer.materialize_batch(&[]).await.unwrap().is_empty());
        assert!(vault.files().is_empty());
        assert!(vault.folders().is_empty());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_layout_and_event() {
        let vault = Arc::new(MemoryVault::new());
        let (materializer, events) = materializer(vault.clone(), NoteLayout::default());

        let batch = vec![
            activity(2, "2024-03-06T08:00:00Z", Some(REFERENCE)),
            activity(1, "2024-03-05T08:00:00Z", None),
            activity(3, "2024-03-06T18:00:00Z", None),
        ];
        let paths = materializer.materialize_batch(&batch).await.unwrap();

        // Dates in first-seen order, activities in input order within a date
        assert_eq!(
            paths,
            vec![
                "Strava/2024-03-06/2/Summary.md",
                "Strava/2024-03-06/3/Summary.md",
                "Strava/2024-03-05/1/Summary.md",
            ]
        );
        assert!(vault.exists("Strava/2024-03-06/2/map.geojson").await.unwrap());
        assert!(!vault.exists("Strava/2024-03-05/1/map.geojson").await.unwrap());
        assert_eq!(
            *events.lock().unwrap(),
            vec![SyncEvent::ActivitiesSynced { count: 3 }]
        );
    }

    #[tokio::test]
    async fn test_rewrite_is_byte_identical() {
        let vault = Arc::new(MemoryVault::new());
        let (materializer, _) = materializer(vault.clone(), NoteLayout::default());
        let batch = vec![activity(7, "2024-03-05T08:00:00Z", Some(REFERENCE))];

        materializer.materialize_batch(&batch).await.unwrap();
        let first = vault.files();
        materializer.materialize_batch(&batch).await.unwrap();
        assert_eq!(vault.files(), first);
    }

    #[tokio::test]
    async fn test_bad_polyline_still_writes_note() {
        let vault = Arc::new(MemoryVault::new());
        let (materializer, _) = materializer(vault.clone(), NoteLayout::default());
        let batch = vec![activity(8, "2024-03-05T08:00:00Z", Some("invalid!!!"))];

        let paths = materializer.materialize_batch(&batch).await.unwrap();
        assert_eq!(paths, vec!["Strava/2024-03-05/8/Summary.md"]);
        assert!(!vault.exists("Strava/2024-03-05/8/map.geojson").await.unwrap());
    }

    #[tokio::test]
    async fn test_named_notes_under_template() {
        let vault = Arc::new(MemoryVault::new());
        let layout = NoteLayout {
            root_folder: "Strava".to_string(),
            folder_format: Some("YYYY/MM".to_string()),
            filename_format: FilenameFormat::ActivityName,
        };
        let (materializer, _) = materializer(vault.clone(), layout);
        let mut ride = activity(5, "2024-03-05T08:00:00Z", None);
        ride.name = Some("Hill/Repeats: 6x".to_string());

        let paths = materializer.materialize_batch(&[ride]).await.unwrap();
        assert_eq!(paths, vec!["Strava/2024/03/5/Hill-Repeats- 6x.md"]);
    }

    #[tokio::test]
    async fn test_detail_uses_hint_folder() {
        let vault = Arc::new(MemoryVault::new());
        let (materializer, _) = materializer(vault.clone(), NoteLayout::default());
        let mut ride = activity(9, "2024-03-05T08:00:00Z", None);
        ride.map = Some(ActivityMap {
            id: None,
            polyline: Some(REFERENCE.to_string()),
            summary_polyline: None,
            extra: Map::new(),
        });

        let path = materializer
            .materialize_detail(&ride, Some("Elsewhere/9"))
            .await
            .unwrap();
        assert_eq!(path, "Elsewhere/9/Detailed.md");
        assert!(vault.exists("Elsewhere/9/map.geojson").await.unwrap());

        let path = materializer.materialize_detail(&ride, None).await.unwrap();
        assert_eq!(path, "Strava/2024-03-05/9/Detailed.md");
    }
}
