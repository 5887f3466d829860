use super::{next_numeric_id, upsert, Library, LibraryError, LibraryResult};
use crate::models::Hymn;
use crate::seed;
use crate::store::keys;

impl Library {
    pub fn hymns(&self) -> LibraryResult<Vec<Hymn>> {
        self.load(keys::HYMNS, seed::hymns)
    }

    pub fn hymn(&self, id: &str) -> LibraryResult<Option<Hymn>> {
        Ok(self.hymns()?.into_iter().find(|h| h.id == id))
    }

    /// Replace the hymn with the same id, appending it when none matches.
    pub fn put_hymn(&self, hymn: Hymn) -> LibraryResult<()> {
        let id = hymn.id.clone();
        let replaced = self.update(keys::HYMNS, seed::hymns, |hymns| {
            Ok(upsert(hymns, hymn, |h| h.id.as_str()))
        })?;
        if !replaced {
            tracing::warn!(id = %id, "Updated hymn had no stored match, appended instead");
        }
        Ok(())
    }

    /// Add a hymn from the add/edit form. A blank id gets the next numeric id.
    pub fn add_hymn(&self, mut hymn: Hymn) -> LibraryResult<Hymn> {
        hymn.validate_for_edit().map_err(|reason| LibraryError::Invalid {
            kind: "hymn",
            reason,
        })?;

        self.update(keys::HYMNS, seed::hymns, |hymns| {
            if hymn.id.trim().is_empty() {
                hymn.id = next_numeric_id(hymns.iter().map(|h| h.id.as_str()));
            } else if hymns.iter().any(|h| h.id == hymn.id) {
                return Err(LibraryError::AlreadyExists {
                    kind: "hymn",
                    id: hymn.id.clone(),
                });
            }
            hymns.push(hymn.clone());
            tracing::info!(id = %hymn.id, title = hymn.display_title(), "Hymn added");
            Ok(hymn)
        })
    }

    /// Set or clear (with an empty string) a hymn's audio URL.
    pub fn set_hymn_audio(&self, id: &str, url: &str) -> LibraryResult<Hymn> {
        let url = url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(LibraryError::Invalid {
                kind: "audio url",
                reason: format!("'{}' is not an http(s) URL", url),
            });
        }

        self.update(keys::HYMNS, seed::hymns, |hymns| {
            let hymn = hymns
                .iter_mut()
                .find(|h| h.id == id)
                .ok_or_else(|| LibraryError::not_found("hymn", id))?;
            hymn.external_url = (!url.is_empty()).then(|| url.to_string());
            Ok(hymn.clone())
        })
    }

    pub fn search_hymns(&self, query: &str) -> LibraryResult<Vec<Hymn>> {
        Ok(self
            .hymns()?
            .into_iter()
            .filter(|h| h.matches(query))
            .collect())
    }

    /// Hymnal index: by page number, unnumbered hymns last, then by title.
    pub fn hymn_index(&self) -> LibraryResult<Vec<Hymn>> {
        let mut hymns = self.hymns()?;
        hymns.sort_by(|a, b| {
            let page = |h: &Hymn| h.page_number.unwrap_or(u32::MAX);
            page(a)
                .cmp(&page(b))
                .then_with(|| a.display_title().to_lowercase().cmp(&b.display_title().to_lowercase()))
        });
        Ok(hymns)
    }
}

#[cfg(test)]
mod tests {
    use crate::library::test_library;
    use crate::models::Hymn;

    #[test]
    fn test_find_update_find_keeps_length() {
        let (_store, library) = test_library();
        let before = library.hymns().unwrap();

        for original in &before {
            let mut updated = original.clone();
            updated.key = Some("Eb".to_string());
            updated.title_english = Some(format!("{} (revised)", original.display_title()));
            library.put_hymn(updated.clone()).unwrap();

            assert_eq!(library.hymn(&original.id).unwrap(), Some(updated));
            assert_eq!(library.hymns().unwrap().len(), before.len());
        }
    }

    #[test]
    fn test_put_unknown_hymn_appends() {
        let (_store, library) = test_library();
        let count = library.hymns().unwrap().len();
        library
            .put_hymn(Hymn {
                id: "999".to_string(),
                title_english: Some("New".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(library.hymns().unwrap().len(), count + 1);
    }

    #[test]
    fn test_add_hymn_assigns_next_id_and_requires_hiligaynon_title() {
        let (_store, library) = test_library();

        let missing_title = Hymn {
            title_english: Some("Only English".to_string()),
            ..Default::default()
        };
        assert!(library.add_hymn(missing_title).is_err());

        let added = library
            .add_hymn(Hymn {
                title_hiligaynon: Some("Bag-o nga Himno".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(added.id, "8");
        assert!(library.hymn("8").unwrap().is_some());

        let duplicate = Hymn {
            id: "8".to_string(),
            title_hiligaynon: Some("Liwat".to_string()),
            ..Default::default()
        };
        assert!(library.add_hymn(duplicate).is_err());
    }

    #[test]
    fn test_set_hymn_audio() {
        let (_store, library) = test_library();
        let hymn = library.set_hymn_audio("1", "https://example.org/doxology.mp3").unwrap();
        assert_eq!(hymn.external_url.as_deref(), Some("https://example.org/doxology.mp3"));

        let cleared = library.set_hymn_audio("1", "").unwrap();
        assert_eq!(cleared.external_url, None);

        assert!(library.set_hymn_audio("1", "ftp://nope").is_err());
        assert!(library.set_hymn_audio("404", "https://x.org/a.mp3").unwrap_err().is_not_found());
    }

    #[test]
    fn test_search_and_index() {
        let (_store, library) = test_library();
        let found = library.search_hymns("grace").unwrap();
        assert!(found.iter().any(|h| h.id == "4"));

        let index = library.hymn_index().unwrap();
        let pages: Vec<_> = index.iter().filter_map(|h| h.page_number).collect();
        let mut sorted = pages.clone();
        sorted.sort();
        assert_eq!(pages, sorted);
    }
}
