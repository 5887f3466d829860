//! Recently viewed hymns, readings and program items.
//!
//! Each category is a rolling window: most recent first, de-duplicated by
//! entity key, capped at a fixed capacity. Entries carry the stable id and a
//! title snapshot; titles are re-resolved through the [`Library`] when shown
//! so renamed records display their current name.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::library::{Library, LibraryResult};
use crate::models::{Hymn, Program, ProgramItem, Reading};
use crate::store::{keys, load_json, save_json, KeyValueStore, StoreResult};

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Hymn,
    Reading,
    ProgramItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRef {
    /// Hymn id, reading id, or `{programId}:{itemId}`.
    pub key: String,
    /// Title at the time of viewing, used when the record no longer exists.
    pub title: String,
}

impl ActivityRef {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    #[serde(default)]
    pub hymns: Vec<ActivityRef>,
    #[serde(default)]
    pub readings: Vec<ActivityRef>,
    #[serde(default)]
    pub program_items: Vec<ActivityRef>,
}

impl UserActivity {
    pub fn window(&self, kind: ActivityKind) -> &[ActivityRef] {
        match kind {
            ActivityKind::Hymn => &self.hymns,
            ActivityKind::Reading => &self.readings,
            ActivityKind::ProgramItem => &self.program_items,
        }
    }

    fn window_mut(&mut self, kind: ActivityKind) -> &mut Vec<ActivityRef> {
        match kind {
            ActivityKind::Hymn => &mut self.hymns,
            ActivityKind::Reading => &mut self.readings,
            ActivityKind::ProgramItem => &mut self.program_items,
        }
    }

    /// Put `entry` at the front, dropping any older entry with the same key
    /// and anything past `capacity`.
    pub fn record(&mut self, kind: ActivityKind, entry: ActivityRef, capacity: usize) {
        let window = self.window_mut(kind);
        window.retain(|existing| existing.key != entry.key);
        window.insert(0, entry);
        window.truncate(capacity);
    }

    pub fn is_empty(&self) -> bool {
        self.hymns.is_empty() && self.readings.is_empty() && self.program_items.is_empty()
    }
}

/// Display titles for the three windows, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentTitles {
    pub hymns: Vec<String>,
    pub readings: Vec<String>,
    pub program_items: Vec<String>,
}

impl RecentTitles {
    pub fn is_empty(&self) -> bool {
        self.hymns.is_empty() && self.readings.is_empty() && self.program_items.is_empty()
    }
}

pub struct ActivityTracker {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    activity: UserActivity,
}

impl ActivityTracker {
    /// Rehydrate from the store. An unreadable blob starts empty.
    pub fn load(store: Arc<dyn KeyValueStore>, capacity: usize) -> StoreResult<Self> {
        let activity = load_json(store.as_ref(), keys::USER_ACTIVITY)?.unwrap_or_default();
        Ok(Self {
            store,
            capacity: capacity.max(1),
            activity,
        })
    }

    pub fn activity(&self) -> &UserActivity {
        &self.activity
    }

    pub fn record(&mut self, kind: ActivityKind, entry: ActivityRef) -> StoreResult<()> {
        tracing::debug!(?kind, key = %entry.key, "Recording activity");
        self.activity.record(kind, entry, self.capacity);
        self.persist()
    }

    pub fn record_hymn(&mut self, hymn: &Hymn) -> StoreResult<()> {
        self.record(
            ActivityKind::Hymn,
            ActivityRef::new(&hymn.id, hymn.display_title()),
        )
    }

    pub fn record_reading(&mut self, reading: &Reading) -> StoreResult<()> {
        self.record(
            ActivityKind::Reading,
            ActivityRef::new(&reading.id, &reading.title),
        )
    }

    pub fn record_program_item(&mut self, program: &Program, item: &ProgramItem) -> StoreResult<()> {
        self.record(
            ActivityKind::ProgramItem,
            ActivityRef::new(program_item_key(&program.id, &item.id), item.title.display_name()),
        )
    }

    pub fn clear(&mut self) -> StoreResult<()> {
        self.activity = UserActivity::default();
        self.persist()
    }

    fn persist(&self) -> StoreResult<()> {
        save_json(self.store.as_ref(), keys::USER_ACTIVITY, &self.activity)
    }

    /// Current display titles, falling back to the stored snapshot.
    pub fn resolve_titles(&self, library: &Library) -> LibraryResult<RecentTitles> {
        let hymns = library.hymns()?;
        let readings = library.readings()?;
        let programs = library.programs()?;

        let resolve_hymn = |r: &ActivityRef| {
            hymns
                .iter()
                .find(|h| h.id == r.key)
                .map(|h| h.display_title().to_string())
                .unwrap_or_else(|| r.title.clone())
        };
        let resolve_reading = |r: &ActivityRef| {
            readings
                .iter()
                .find(|x| x.id == r.key)
                .map(|x| x.title.clone())
                .unwrap_or_else(|| r.title.clone())
        };
        let resolve_item = |r: &ActivityRef| {
            r.key
                .split_once(':')
                .and_then(|(program_id, item_id)| {
                    programs
                        .iter()
                        .find(|p| p.id == program_id)
                        .and_then(|p| p.item(item_id))
                })
                .map(|item| item.title.display_name().to_string())
                .unwrap_or_else(|| r.title.clone())
        };

        Ok(RecentTitles {
            hymns: self.activity.hymns.iter().map(resolve_hymn).collect(),
            readings: self.activity.readings.iter().map(resolve_reading).collect(),
            program_items: self.activity.program_items.iter().map(resolve_item).collect(),
        })
    }
}

pub fn program_item_key(program_id: &str, item_id: &str) -> String {
    format!("{}:{}", program_id, item_id)
}
