use super::{upsert, Library, LibraryError, LibraryResult};
use crate::models::{Reading, ReadingCategory};
use crate::seed;
use crate::store::keys;

impl Library {
    pub fn readings(&self) -> LibraryResult<Vec<Reading>> {
        self.load(keys::READINGS, seed::readings)
    }

    pub fn reading(&self, id: &str) -> LibraryResult<Option<Reading>> {
        Ok(self.readings()?.into_iter().find(|r| r.id == id))
    }

    pub fn readings_by_category(&self, category: ReadingCategory) -> LibraryResult<Vec<Reading>> {
        Ok(self
            .readings()?
            .into_iter()
            .filter(|r| r.category == category)
            .collect())
    }

    pub fn put_reading(&self, reading: Reading) -> LibraryResult<()> {
        self.update(keys::READINGS, seed::readings, |readings| {
            upsert(readings, reading, |r| r.id.as_str());
            Ok(())
        })
    }

    pub fn delete_reading(&self, id: &str) -> LibraryResult<Reading> {
        let removed = self.update(keys::READINGS, seed::readings, |readings| {
            let index = readings
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| LibraryError::not_found("reading", id))?;
            Ok(readings.remove(index))
        })?;
        tracing::info!(id, title = %removed.title, "Reading deleted");
        Ok(removed)
    }
}
