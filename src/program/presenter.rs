//! One-item-at-a-time walk through a program.

use crate::activity::ActivityTracker;
use crate::library::{Library, LibraryResult};
use crate::models::{Hymn, Language, Program, ProgramItem, Reading};
use crate::store::StoreResult;

use super::notes::NoteStore;

/// What an item links to, resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkedContent {
    Hymn {
        hymn: Hymn,
        language: Option<Language>,
        lyrics: Option<String>,
    },
    Reading(Reading),
    /// Free text such as a scripture reference or sermon title.
    Text(String),
    /// The hymn or reading id no longer resolves.
    Missing { kind: &'static str, id: String },
    None,
}

pub struct ProgramPresenter {
    program: Program,
    current: usize,
    notes: NoteStore,
    activity: ActivityTracker,
    note: Option<String>,
}

impl ProgramPresenter {
    /// Open on the first item, recording the view.
    pub fn open(program: Program, notes: NoteStore, activity: ActivityTracker) -> Self {
        let mut presenter = Self {
            program,
            current: 0,
            notes,
            activity,
            note: None,
        };
        presenter.on_index_change();
        presenter
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.program.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.items.is_empty()
    }

    pub fn current_item(&self) -> Option<&ProgramItem> {
        self.program.items.get(self.current)
    }

    pub fn prev_item(&self) -> Option<&ProgramItem> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.program.items.get(i))
    }

    pub fn next_item(&self) -> Option<&ProgramItem> {
        self.program.items.get(self.current + 1)
    }

    /// Note shown for the current item after the personal-note overlay.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len()
    }

    /// Move to `index`, clamped to the item range. Returns whether it moved.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.is_empty() {
            return false;
        }
        let target = index.min(self.len() - 1);
        if target == self.current {
            return false;
        }
        self.current = target;
        self.on_index_change();
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current + 1)
    }

    pub fn prev(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    pub fn first(&mut self) -> bool {
        self.go_to(0)
    }

    pub fn last(&mut self) -> bool {
        self.go_to(self.len().saturating_sub(1))
    }

    fn on_index_change(&mut self) {
        let Some(item) = self.program.items.get(self.current).cloned() else {
            self.note = None;
            return;
        };

        if let Err(e) = self.activity.record_program_item(&self.program, &item) {
            tracing::warn!(error = %e, item = %item.id, "Failed to record program item view");
        }
        self.refresh_note(&item);
    }

    fn refresh_note(&mut self, item: &ProgramItem) {
        self.note = match self.notes.resolve(&self.program.id, item) {
            Ok(note) => note,
            Err(e) => {
                tracing::warn!(error = %e, item = %item.id, "Failed to read personal note");
                item.notes.clone()
            }
        };
    }

    /// Personal note for the current item, if one is stored.
    pub fn personal_note(&self) -> StoreResult<Option<String>> {
        match self.current_item() {
            Some(item) => self.notes.personal(&self.program.id, &item.id),
            None => Ok(None),
        }
    }

    pub fn save_note(&mut self, text: &str) -> StoreResult<()> {
        let Some(item) = self.current_item().cloned() else {
            return Ok(());
        };
        self.notes.save(&self.program.id, &item.id, text)?;
        self.refresh_note(&item);
        Ok(())
    }

    pub fn delete_note(&mut self) -> StoreResult<()> {
        let Some(item) = self.current_item().cloned() else {
            return Ok(());
        };
        self.notes.delete(&self.program.id, &item.id)?;
        self.refresh_note(&item);
        Ok(())
    }

    /// Hymn or reading the current item points at.
    pub fn linked_content(&self, library: &Library) -> LibraryResult<LinkedContent> {
        let Some(item) = self.current_item() else {
            return Ok(LinkedContent::None);
        };
        resolve_linked_content(item, library)
    }
}

pub fn resolve_linked_content(item: &ProgramItem, library: &Library) -> LibraryResult<LinkedContent> {
    if let Some(hymn_id) = &item.hymn_id {
        return Ok(match library.hymn(hymn_id)? {
            Some(hymn) => {
                let (language, lyrics) = match hymn.primary_lyrics() {
                    Some((language, lyrics)) => (Some(language), Some(lyrics.to_string())),
                    None => (None, None),
                };
                LinkedContent::Hymn {
                    hymn,
                    language,
                    lyrics,
                }
            }
            None => LinkedContent::Missing {
                kind: "hymn",
                id: hymn_id.clone(),
            },
        });
    }

    if let Some(reading_id) = &item.reading_id {
        return Ok(match library.reading(reading_id)? {
            Some(reading) => LinkedContent::Reading(reading),
            None => LinkedContent::Missing {
                kind: "reading",
                id: reading_id.clone(),
            },
        });
    }

    Ok(match item.content.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => LinkedContent::Text(text.to_string()),
        _ => LinkedContent::None,
    })
}
