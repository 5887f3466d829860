//! Seed datasets compiled into the binary.
//!
//! These are the fallback of record whenever the store has no (or no
//! readable) copy of a collection.

use serde::de::DeserializeOwned;

use crate::models::{Hymn, Program, Reading};

const HYMNS_JSON: &str = include_str!("../data/hymns.json");
const READINGS_JSON: &str = include_str!("../data/readings.json");
const PROGRAMS_JSON: &str = include_str!("../data/programs.json");

fn parse<T: DeserializeOwned>(name: &str, raw: &str) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::error!(dataset = name, error = %e, "Seed dataset is malformed");
        Vec::new()
    })
}

pub fn hymns() -> Vec<Hymn> {
    parse("hymns", HYMNS_JSON)
}

pub fn readings() -> Vec<Reading> {
    parse("readings", READINGS_JSON)
}

pub fn programs() -> Vec<Program> {
    parse("programs", PROGRAMS_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_datasets_parse() {
        assert!(!hymns().is_empty());
        assert!(!readings().is_empty());
        assert!(!programs().is_empty());
    }

    #[test]
    fn test_seed_hymns_have_content_and_unique_ids() {
        let hymns = hymns();
        let ids: HashSet<_> = hymns.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), hymns.len());
        assert!(hymns.iter().all(|h| h.has_content()));
    }

    #[test]
    fn test_seed_program_references_resolve() {
        let hymns = hymns();
        let readings = readings();
        for program in programs() {
            for item in &program.items {
                if let Some(hymn_id) = &item.hymn_id {
                    assert!(hymns.iter().any(|h| &h.id == hymn_id), "missing hymn {}", hymn_id);
                }
                if let Some(reading_id) = &item.reading_id {
                    assert!(readings.iter().any(|r| &r.id == reading_id), "missing reading {}", reading_id);
                }
            }
        }
    }
}
