use std::sync::Arc;

use crate::models::ProgramItem;
use crate::store::{keys, KeyValueStore, StoreResult};

/// Personal notes keyed by (program, item), stored as raw strings.
#[derive(Clone)]
pub struct NoteStore {
    store: Arc<dyn KeyValueStore>,
}

impl NoteStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn personal(&self, program_id: &str, item_id: &str) -> StoreResult<Option<String>> {
        self.store.get(&keys::note(program_id, item_id))
    }

    /// Always writes, even an empty note: a blank note hides the authored one.
    pub fn save(&self, program_id: &str, item_id: &str, text: &str) -> StoreResult<()> {
        tracing::debug!(program_id, item_id, "Saving personal note");
        self.store.set(&keys::note(program_id, item_id), text)
    }

    pub fn delete(&self, program_id: &str, item_id: &str) -> StoreResult<()> {
        tracing::debug!(program_id, item_id, "Deleting personal note");
        self.store.remove(&keys::note(program_id, item_id))
    }

    /// The note to display for an item.
    pub fn resolve(&self, program_id: &str, item: &ProgramItem) -> StoreResult<Option<String>> {
        let personal = self.personal(program_id, &item.id)?;
        Ok(resolve_note(personal.as_deref(), item.notes.as_deref()))
    }
}

/// A personal note wins; a blank personal note shows nothing; without one the
/// authored note shows.
pub fn resolve_note(personal: Option<&str>, authored: Option<&str>) -> Option<String> {
    match personal {
        Some(note) if note.trim().is_empty() => None,
        Some(note) => Some(note.to_string()),
        None => authored
            .filter(|note| !note.trim().is_empty())
            .map(str::to_string),
    }
}
