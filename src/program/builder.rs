//! Multi-step program builder.
//!
//! Steps run strictly in order, `Details → Items → FillDetails → Preview →
//! Success`, and stepping back keeps everything already filled in.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::library::{Library, LibraryError};
use crate::models::{ItemTitle, Program, ProgramItem};

/// Lowest id handed out, and the end (exclusive) of the range scanned for
/// existing program ids.
pub const PROGRAM_ID_FLOOR: u64 = 100;
pub const PROGRAM_ID_CEILING: u64 = 1_000_000;

pub const DEFAULT_PROGRAM_TITLE: &str = "Sunday Service";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderStep {
    Details,
    Items,
    FillDetails,
    Preview,
    Success,
}

impl BuilderStep {
    pub fn label(&self) -> &'static str {
        match self {
            BuilderStep::Details => "details",
            BuilderStep::Items => "items",
            BuilderStep::FillDetails => "fill details",
            BuilderStep::Preview => "preview",
            BuilderStep::Success => "success",
        }
    }
}

impl std::fmt::Display for BuilderStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("select a date for the program")]
    MissingDate,

    #[error("choose at least one program item")]
    NoItemsSelected,

    #[error("'{0}' is not part of this program")]
    UnknownItem(ItemTitle),

    #[error("'{0}' does not take a hymn")]
    NotAHymnItem(ItemTitle),

    #[error("'{0}' does not take a responsive reading")]
    NotAReadingItem(ItemTitle),

    #[error("cannot {action} from the {step} step")]
    WrongStep {
        action: &'static str,
        step: BuilderStep,
    },

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Optional per-item fields filled in before preview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetails {
    pub hymn_id: Option<String>,
    pub reading_id: Option<String>,
    pub content: Option<String>,
    pub notes: Option<String>,
    pub usher: Option<String>,
    pub special_number: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    step: BuilderStep,
    title: String,
    date: Option<NaiveDate>,
    customize: bool,
    selected: BTreeSet<ItemTitle>,
    details: BTreeMap<ItemTitle, ItemDetails>,
    created: Option<Program>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            step: BuilderStep::Details,
            title: DEFAULT_PROGRAM_TITLE.to_string(),
            date: None,
            customize: false,
            selected: BTreeSet::new(),
            details: BTreeMap::new(),
            created: None,
        }
    }

    pub fn step(&self) -> BuilderStep {
        self.step
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        self.title = if title.trim().is_empty() {
            DEFAULT_PROGRAM_TITLE.to_string()
        } else {
            title.trim().to_string()
        };
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Opt in to choosing a subset of items instead of the full order.
    pub fn set_customize(&mut self, customize: bool) {
        self.customize = customize;
    }

    pub fn toggle_item(&mut self, title: ItemTitle) {
        if !self.selected.remove(&title) {
            self.selected.insert(title);
        }
    }

    pub fn select_items(&mut self, titles: impl IntoIterator<Item = ItemTitle>) {
        self.selected = titles.into_iter().collect();
    }

    /// Items the program will contain, in service order.
    pub fn item_titles(&self) -> Vec<ItemTitle> {
        if self.customize {
            self.selected.iter().copied().collect()
        } else {
            ItemTitle::ALL.to_vec()
        }
    }

    /// Fields for one item. Errors when the item is not in the program.
    pub fn details_mut(&mut self, title: ItemTitle) -> Result<&mut ItemDetails, BuilderError> {
        if !self.item_titles().contains(&title) {
            return Err(BuilderError::UnknownItem(title));
        }
        Ok(self.details.entry(title).or_default())
    }

    pub fn details(&self, title: ItemTitle) -> Option<&ItemDetails> {
        self.details.get(&title)
    }

    pub fn assign_hymn(&mut self, title: ItemTitle, hymn_id: impl Into<String>) -> Result<(), BuilderError> {
        if !title.takes_hymn() {
            return Err(BuilderError::NotAHymnItem(title));
        }
        self.details_mut(title)?.hymn_id = Some(hymn_id.into());
        Ok(())
    }

    pub fn assign_reading(&mut self, title: ItemTitle, reading_id: impl Into<String>) -> Result<(), BuilderError> {
        if !title.takes_reading() {
            return Err(BuilderError::NotAReadingItem(title));
        }
        self.details_mut(title)?.reading_id = Some(reading_id.into());
        Ok(())
    }

    pub fn set_content(&mut self, title: ItemTitle, content: impl Into<String>) -> Result<(), BuilderError> {
        self.details_mut(title)?.content = Some(content.into());
        Ok(())
    }

    pub fn set_notes(&mut self, title: ItemTitle, notes: impl Into<String>) -> Result<(), BuilderError> {
        self.details_mut(title)?.notes = Some(notes.into());
        Ok(())
    }

    pub fn set_usher(&mut self, title: ItemTitle, usher: impl Into<String>) -> Result<(), BuilderError> {
        self.details_mut(title)?.usher = Some(usher.into());
        Ok(())
    }

    pub fn set_special_number(&mut self, title: ItemTitle, performer: impl Into<String>) -> Result<(), BuilderError> {
        self.details_mut(title)?.special_number = Some(performer.into());
        Ok(())
    }

    fn check_items(&self) -> Result<(), BuilderError> {
        if self.customize && self.selected.is_empty() {
            return Err(BuilderError::NoItemsSelected);
        }
        Ok(())
    }

    /// Advance one step after validating the current one.
    pub fn next(&mut self) -> Result<BuilderStep, BuilderError> {
        self.step = match self.step {
            BuilderStep::Details => {
                if self.date.is_none() {
                    return Err(BuilderError::MissingDate);
                }
                BuilderStep::Items
            }
            BuilderStep::Items => {
                self.check_items()?;
                BuilderStep::FillDetails
            }
            BuilderStep::FillDetails => BuilderStep::Preview,
            step @ (BuilderStep::Preview | BuilderStep::Success) => {
                return Err(BuilderError::WrongStep {
                    action: "advance",
                    step,
                });
            }
        };
        Ok(self.step)
    }

    /// Step back one step. Nothing filled in is discarded.
    pub fn back(&mut self) -> BuilderStep {
        self.step = match self.step {
            BuilderStep::Details | BuilderStep::Items => BuilderStep::Details,
            BuilderStep::FillDetails => BuilderStep::Items,
            BuilderStep::Preview => BuilderStep::FillDetails,
            BuilderStep::Success => BuilderStep::Success,
        };
        self.step
    }

    /// Program as it would be created, with the given id.
    pub fn draft(&self, program_id: &str) -> Result<Program, BuilderError> {
        let date = self.date.ok_or(BuilderError::MissingDate)?;
        self.check_items()?;
        Ok(self.build(program_id, date))
    }

    fn build(&self, program_id: &str, date: NaiveDate) -> Program {
        let items = self
            .item_titles()
            .into_iter()
            .enumerate()
            .map(|(n, title)| {
                let details = self.details.get(&title).cloned().unwrap_or_default();
                ProgramItem {
                    id: format!("{}-{}", program_id, n + 1),
                    title,
                    content: non_blank(details.content),
                    hymn_id: non_blank(details.hymn_id),
                    reading_id: non_blank(details.reading_id),
                    usher: non_blank(details.usher),
                    special_number: non_blank(details.special_number),
                    notes: non_blank(details.notes),
                }
            })
            .collect();

        Program {
            id: program_id.to_string(),
            title: self.title.clone(),
            date,
            items,
        }
    }

    /// Assign an id, store the program at the front of the collection and
    /// move to `Success`. Only valid from `Preview`.
    pub fn create(&mut self, library: &Library) -> Result<Program, BuilderError> {
        if self.step != BuilderStep::Preview {
            return Err(BuilderError::WrongStep {
                action: "create",
                step: self.step,
            });
        }
        let date = self.date.ok_or(BuilderError::MissingDate)?;
        self.check_items()?;

        let program = library.insert_program_with(|existing| {
            let id = next_program_id(existing).ok_or(LibraryError::Invalid {
                kind: "program",
                reason: "every program id is already in use".to_string(),
            })?;
            Ok(self.build(&id, date))
        })?;

        tracing::info!(id = %program.id, items = program.items.len(), date = %program.date, "Program created");
        self.created = Some(program.clone());
        self.step = BuilderStep::Success;
        Ok(program)
    }

    pub fn created(&self) -> Option<&Program> {
        self.created.as_ref()
    }

    /// Start a fresh form after `Success`.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// One past the largest id inside the reserved range, or the floor. Once
/// the top of the range is taken, the lowest free id is reused. `None` when
/// every id in the range is in use.
pub fn next_program_id(existing: &[Program]) -> Option<String> {
    let used: BTreeSet<u64> = existing
        .iter()
        .filter_map(|p| p.id.parse::<u64>().ok())
        .filter(|id| (PROGRAM_ID_FLOOR..PROGRAM_ID_CEILING).contains(id))
        .collect();

    let next = match used.last() {
        None => Some(PROGRAM_ID_FLOOR),
        Some(&max) if max + 1 < PROGRAM_ID_CEILING => Some(max + 1),
        Some(_) => (PROGRAM_ID_FLOOR..PROGRAM_ID_CEILING).find(|id| !used.contains(id)),
    };
    next.map(|id| id.to_string())
}
