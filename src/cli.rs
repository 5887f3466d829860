//! Command-line parsing.

use chrono::NaiveDate;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::export::{ExportFormat, ExportKind};
use crate::models::{ItemTitle, ReadingCategory};
use crate::settings::{FontStyle, PrimaryColor, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    Theme(Theme),
    Color(PrimaryColor),
    Font(FontStyle),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewHymnArgs {
    pub title: String,
    pub title_filipino: Option<String>,
    pub title_english: Option<String>,
    pub lyrics_file: Option<PathBuf>,
    pub page_number: Option<u32>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProgramArgs {
    pub date: Option<NaiveDate>,
    pub title: Option<String>,
    /// Empty means every item.
    pub items: Vec<ItemTitle>,
    pub hymns: Vec<(ItemTitle, String)>,
    pub readings: Vec<(ItemTitle, String)>,
    pub contents: Vec<(ItemTitle, String)>,
    pub notes: Vec<(ItemTitle, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Hymns { query: Option<String> },
    Hymn { id: String },
    Index,
    AddHymn(NewHymnArgs),
    SetAudio { id: String, url: String },
    TrashHymn { ids: Vec<String> },
    Trash,
    Restore { id: String },
    PurgeTrash,
    Readings { category: Option<ReadingCategory> },
    Reading { id: String },
    DeleteReading { id: String },
    Programs,
    Program { id: String },
    Present { id: String },
    NewProgram(NewProgramArgs),
    Note { program_id: String, item_id: String, text: String },
    DeleteNote { program_id: String, item_id: String },
    Activity,
    Suggest,
    Chat { prompt: String },
    Conversations,
    Settings { change: Option<SettingChange> },
    Import { path: PathBuf },
    Files,
    File { id: String },
    Export { kind: ExportKind, format: ExportFormat, path: PathBuf },
    Reset { confirmed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

struct Args {
    items: Vec<String>,
    pos: usize,
}

impl Args {
    fn next(&mut self) -> Option<String> {
        let item = self.items.get(self.pos).cloned();
        self.pos += 1;
        item
    }

    fn required(&mut self, what: &str) -> Result<String, String> {
        self.next().ok_or_else(|| format!("missing {}", what))
    }

    fn rest(&mut self) -> Vec<String> {
        let rest = self.items[self.pos.min(self.items.len())..].to_vec();
        self.pos = self.items.len();
        rest
    }

    fn finish(&self) -> Result<(), String> {
        match self.items.get(self.pos) {
            Some(extra) => Err(format!("unexpected argument: {}", extra)),
            None => Ok(()),
        }
    }
}

fn parse_assignment(value: &str) -> Result<(ItemTitle, String), String> {
    let (item, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected Item=value, got '{}'", value))?;
    Ok((item.parse()?, rest.to_string()))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

fn parse_new_program(args: &mut Args) -> Result<NewProgramArgs, String> {
    let mut parsed = NewProgramArgs::default();
    while let Some(flag) = args.next() {
        let value = args.required(&format!("value for {}", flag))?;
        match flag.as_str() {
            "--date" => parsed.date = Some(parse_date(&value)?),
            "--title" => parsed.title = Some(value),
            "--items" => {
                parsed.items = value
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.parse::<ItemTitle>())
                    .collect::<Result<Vec<_>, String>>()?;
            }
            "--hymn" => parsed.hymns.push(parse_assignment(&value)?),
            "--reading" => parsed.readings.push(parse_assignment(&value)?),
            "--content" => parsed.contents.push(parse_assignment(&value)?),
            "--note" => parsed.notes.push(parse_assignment(&value)?),
            other => return Err(format!("unknown option for new-program: {}", other)),
        }
    }
    Ok(parsed)
}

fn parse_new_hymn(args: &mut Args) -> Result<NewHymnArgs, String> {
    let mut parsed = NewHymnArgs::default();
    while let Some(flag) = args.next() {
        let value = args.required(&format!("value for {}", flag))?;
        match flag.as_str() {
            "--title" => parsed.title = value,
            "--title-fil" => parsed.title_filipino = Some(value),
            "--title-en" => parsed.title_english = Some(value),
            "--lyrics-file" => parsed.lyrics_file = Some(PathBuf::from(value)),
            "--page" => {
                parsed.page_number = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid page number '{}'", value))?,
                )
            }
            "--key" => parsed.key = Some(value),
            other => return Err(format!("unknown option for add-hymn: {}", other)),
        }
    }
    Ok(parsed)
}

fn parse_command(name: &str, args: &mut Args) -> Result<Command, String> {
    let command = match name {
        "hymns" => {
            let query = args.rest().join(" ");
            Command::Hymns {
                query: (!query.trim().is_empty()).then_some(query),
            }
        }
        "hymn" => Command::Hymn { id: args.required("hymn id")? },
        "index" => Command::Index,
        "add-hymn" => Command::AddHymn(parse_new_hymn(args)?),
        "set-audio" => Command::SetAudio {
            id: args.required("hymn id")?,
            url: args.next().unwrap_or_default(),
        },
        "trash-hymn" => {
            let ids = args.rest();
            if ids.is_empty() {
                return Err("missing hymn id".to_string());
            }
            Command::TrashHymn { ids }
        }
        "trash" => Command::Trash,
        "restore" => Command::Restore { id: args.required("hymn id")? },
        "purge-trash" => Command::PurgeTrash,
        "readings" => Command::Readings {
            category: args.next().map(|c| c.parse::<ReadingCategory>()).transpose()?,
        },
        "reading" => Command::Reading { id: args.required("reading id")? },
        "delete-reading" => Command::DeleteReading { id: args.required("reading id")? },
        "programs" => Command::Programs,
        "program" => Command::Program { id: args.required("program id")? },
        "present" => Command::Present { id: args.required("program id")? },
        "new-program" => Command::NewProgram(parse_new_program(args)?),
        "note" => Command::Note {
            program_id: args.required("program id")?,
            item_id: args.required("item id")?,
            text: args.rest().join(" "),
        },
        "delete-note" => Command::DeleteNote {
            program_id: args.required("program id")?,
            item_id: args.required("item id")?,
        },
        "activity" => Command::Activity,
        "suggest" => Command::Suggest,
        "chat" => {
            let prompt = args.rest().join(" ");
            if prompt.trim().is_empty() {
                return Err("missing prompt".to_string());
            }
            Command::Chat { prompt }
        }
        "conversations" => Command::Conversations,
        "settings" => {
            let change = match args.next() {
                None => None,
                Some(setting) => {
                    let value = args.required(&format!("value for {}", setting))?;
                    Some(match setting.as_str() {
                        "theme" => SettingChange::Theme(value.parse()?),
                        "color" => SettingChange::Color(value.parse()?),
                        "font" => SettingChange::Font(value.parse()?),
                        other => return Err(format!("unknown setting: {}", other)),
                    })
                }
            };
            Command::Settings { change }
        }
        "import" => Command::Import {
            path: PathBuf::from(args.required("path")?),
        },
        "files" => Command::Files,
        "file" => Command::File { id: args.required("file id")? },
        "export" => Command::Export {
            kind: args.required("collection")?.parse()?,
            format: args.required("format")?.parse()?,
            path: PathBuf::from(args.required("output path")?),
        },
        "reset" => {
            let confirmed = match args.next().as_deref() {
                Some("--yes") => true,
                None => false,
                Some(other) => return Err(format!("unexpected argument: {}", other)),
            };
            Command::Reset { confirmed }
        }
        other => return Err(format!("unknown command: {}", other)),
    };
    args.finish()?;
    Ok(command)
}

/// Parse arguments, excluding the program name.
pub fn parse<I, S>(argv: I) -> Result<Cli, String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = Args {
        items: argv.into_iter().map(Into::into).collect(),
        pos: 0,
    };
    let mut config_path = None;

    while let Some(arg) = args.next() {
        let command = match arg.as_str() {
            "--help" | "-h" | "help" => Command::Help,
            "--version" | "-V" => Command::Version,
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config requires a path argument".to_string())?;
                config_path = Some(PathBuf::from(path));
                continue;
            }
            flag if flag.starts_with('-') => return Err(format!("unknown argument: {}", flag)),
            name => parse_command(name, &mut args)?,
        };
        return Ok(Cli { config_path, command });
    }

    Ok(Cli {
        config_path,
        command: Command::Help,
    })
}

const HELP: &str = r#"hymnbook - hymnal, responsive readings and Sunday programs

USAGE:
    hymnbook [OPTIONS] <COMMAND> [ARGS]

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

HYMNAL:
    hymns [QUERY]                   List or search hymns
    hymn ID                         Show a hymn
    index                           Hymnal index by page
    add-hymn --title T [--title-fil T] [--title-en T]
             [--lyrics-file PATH] [--page N] [--key K]
    set-audio ID [URL]              Set or clear a hymn's audio link
    trash-hymn ID...                Move hymns to the trash
    trash                           List trashed hymns
    restore ID                      Restore a trashed hymn
    purge-trash                     Delete trash older than the retention

READINGS:
    readings [CATEGORY]             List readings
    reading ID                      Show a reading
    delete-reading ID               Delete a reading

PROGRAMS:
    programs                        List programs
    program ID                      Show a program
    present ID                      Present a program full screen
    new-program --date YYYY-MM-DD [--title T] [--items "A,B"]
                [--hymn Item=ID] [--reading Item=ID]
                [--content Item=TEXT] [--note Item=TEXT]
    note PROGRAM ITEM TEXT          Save a personal note (empty hides the printed note)
    delete-note PROGRAM ITEM        Remove a personal note

ASSISTANT:
    activity                        Recently viewed items
    suggest                         Suggest readings and hymns
    chat PROMPT                     Ask the assistant
    conversations                   List saved conversations

OTHER:
    settings [theme|color|font VALUE]
    import PATH                     Import .txt/.md documents
    files                           List imported documents
    file ID                         Show a document
    export hymns|readings|programs json|csv PATH
    reset --yes                     Delete all local data

ENVIRONMENT:
    HYMNBOOK_CONFIG     Path to config file (overrides default location)
    HYMNBOOK_LOG        Log filter (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/hymnbook/config.toml"#;

pub fn write_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", HELP)
}

pub fn print_help() {
    println!("{}", HELP);
}
