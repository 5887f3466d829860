use super::{upsert, Library, LibraryError, LibraryResult};
use crate::models::Program;
use crate::seed;
use crate::store::keys;

impl Library {
    pub fn programs(&self) -> LibraryResult<Vec<Program>> {
        self.load(keys::PROGRAMS, seed::programs)
    }

    pub fn program(&self, id: &str) -> LibraryResult<Option<Program>> {
        Ok(self.programs()?.into_iter().find(|p| p.id == id))
    }

    /// Replace a program with the same id, or append it.
    pub fn put_program(&self, program: Program) -> LibraryResult<()> {
        self.update(keys::PROGRAMS, seed::programs, |programs| {
            upsert(programs, program, |p| p.id.as_str());
            Ok(())
        })
    }

    /// Store a new program at the front of the collection.
    pub fn insert_program(&self, program: Program) -> LibraryResult<()> {
        self.update(keys::PROGRAMS, seed::programs, |programs| {
            if programs.iter().any(|p| p.id == program.id) {
                return Err(LibraryError::AlreadyExists {
                    kind: "program",
                    id: program.id.clone(),
                });
            }
            programs.insert(0, program);
            Ok(())
        })
    }

    /// Allocate an id and store the program in one locked step.
    pub(crate) fn insert_program_with<F>(&self, build: F) -> LibraryResult<Program>
    where
        F: FnOnce(&[Program]) -> LibraryResult<Program>,
    {
        self.update(keys::PROGRAMS, seed::programs, |programs| {
            let program = build(programs)?;
            if programs.iter().any(|p| p.id == program.id) {
                return Err(LibraryError::AlreadyExists {
                    kind: "program",
                    id: program.id.clone(),
                });
            }
            programs.insert(0, program.clone());
            Ok(program)
        })
    }

    pub fn delete_program(&self, id: &str) -> LibraryResult<Program> {
        self.update(keys::PROGRAMS, seed::programs, |programs| {
            let index = programs
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| LibraryError::not_found("program", id))?;
            Ok(programs.remove(index))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::library::test_library;
    use crate::models::Program;
    use chrono::NaiveDate;

    fn program(id: &str) -> Program {
        Program {
            id: id.to_string(),
            title: "Evening Service".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
            items: Vec::new(),
        }
    }

    #[test]
    fn test_insert_program_goes_first() {
        let (_store, library) = test_library();
        library.insert_program(program("500")).unwrap();
        assert_eq!(library.programs().unwrap()[0].id, "500");
        assert!(library.insert_program(program("500")).is_err());
    }

    #[test]
    fn test_delete_program() {
        let (_store, library) = test_library();
        library.delete_program("100").unwrap();
        assert!(library.program("100").unwrap().is_none());
        assert!(library.delete_program("100").unwrap_err().is_not_found());
    }

    #[test]
    fn test_put_program_replaces_in_place() {
        let (_store, library) = test_library();
        let before = library.programs().unwrap().len();

        let mut edited = library.program("100").unwrap().unwrap();
        edited.title = "Communion Sunday".to_string();
        library.put_program(edited).unwrap();

        let programs = library.programs().unwrap();
        assert_eq!(programs.len(), before);
        assert_eq!(library.program("100").unwrap().unwrap().title, "Communion Sunday");

        library.put_program(program("600")).unwrap();
        assert_eq!(library.programs().unwrap().last().unwrap().id, "600");
    }
}
