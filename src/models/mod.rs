//! Records shared by the store, the library and the front end.
//!
//! Everything serializes as camelCase JSON so stored collections keep the
//! same shape regardless of which store backs them.

pub mod chat;
pub mod hymn;
pub mod program;
pub mod reading;

pub use chat::{ChatMessage, Conversation, Sender};
pub use hymn::{Hymn, Language};
pub use program::{ItemTitle, Program, ProgramItem};
pub use reading::{Reading, ReadingCategory, ReadingLine, Speaker};
