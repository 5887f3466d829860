//! Building, annotating and presenting Sunday programs.

pub mod builder;
pub mod notes;
pub mod presenter;

pub use builder::{next_program_id, BuilderError, BuilderStep, ItemDetails, ProgramBuilder};
pub use notes::{resolve_note, NoteStore};
pub use presenter::{resolve_linked_content, LinkedContent, ProgramPresenter};
