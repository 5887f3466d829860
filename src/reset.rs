//! Wipe everything the app has stored.

use crate::store::{keys, KeyValueStore, StoreResult};

/// Remove every fixed key plus all personal notes and uploaded documents.
/// The next load re-seeds hymns, readings and programs. Returns the number
/// of keys that were present.
pub fn reset_all(store: &dyn KeyValueStore) -> StoreResult<usize> {
    let mut doomed: Vec<String> = keys::FIXED.iter().map(|k| k.to_string()).collect();
    doomed.extend(store.keys_with_prefix(keys::NOTE_PREFIX)?);
    doomed.extend(store.keys_with_prefix(keys::FILE_PREFIX)?);

    let mut removed = 0;
    for key in &doomed {
        if store.get(key)?.is_some() {
            removed += 1;
        }
        store.remove(key)?;
    }

    tracing::warn!(removed, "Reset all local data");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityTracker, DEFAULT_CAPACITY};
    use crate::documents::DocumentStore;
    use crate::library::test_library;
    use crate::program::NoteStore;
    use crate::seed;
    use crate::settings::{SettingsStore, Theme};

    #[test]
    fn test_reset_clears_everything_and_reseeds() {
        let (store, library) = test_library();

        library.trash_hymns(&["2"]).unwrap();
        library.delete_reading("r2").unwrap();
        NoteStore::new(store.clone()).save("100", "100-1", "Stand").unwrap();
        DocumentStore::new(store.clone()).import_text("a.txt", "hello").unwrap();
        SettingsStore::new(store.clone()).set_theme(Theme::Dark).unwrap();
        let program = library.program("100").unwrap().unwrap();
        ActivityTracker::load(store.clone(), DEFAULT_CAPACITY)
            .unwrap()
            .record_program_item(&program, &program.items[0])
            .unwrap();
        store.set("unrelated", "kept").unwrap();

        let removed = reset_all(store.as_ref()).unwrap();
        assert!(removed >= 8);

        for key in keys::FIXED {
            assert_eq!(store.get(key).unwrap(), None, "{} survived reset", key);
        }
        assert!(store.keys_with_prefix(keys::NOTE_PREFIX).unwrap().is_empty());
        assert!(store.keys_with_prefix(keys::FILE_PREFIX).unwrap().is_empty());
        assert_eq!(store.get("unrelated").unwrap().as_deref(), Some("kept"));

        assert_eq!(library.hymns().unwrap(), seed::hymns());
        assert_eq!(library.readings().unwrap(), seed::readings());
        assert_eq!(library.programs().unwrap(), seed::programs());
        assert!(library.trash().unwrap().is_empty());
    }
}
