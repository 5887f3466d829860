use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::activity::ActivityTracker;
use crate::cli::{self, Command, NewHymnArgs, NewProgramArgs, SettingChange};
use crate::config::Config;
use crate::documents::DocumentStore;
use crate::export;
use crate::library::Library;
use crate::llm::{create_provider, split_lyrics, Assistant, ChatSession, LlmProvider, Suggestions};
use crate::models::{Hymn, Language, Program, Reading};
use crate::program::{NoteStore, ProgramBuilder, ProgramPresenter};
use crate::reset;
use crate::settings::SettingsStore;
use crate::store::{KeyValueStore, SqliteStore};
use crate::ui;

/// Everything a command needs: configuration, the shared store and library,
/// and the model provider behind the assistant.
pub struct App {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    library: Arc<Library>,
    provider: Arc<dyn LlmProvider>,
}

impl App {
    /// Open the SQLite store named by the config.
    pub fn open(config: Config) -> Result<Self> {
        let store = SqliteStore::open(&config.store_path)
            .with_context(|| format!("Failed to open store {}", config.store_path.display()))?;
        tracing::info!(path = %config.store_path.display(), "Store opened");
        let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&config.llm));
        Ok(Self::with_parts(config, Arc::new(store), provider))
    }

    pub fn with_parts(config: Config, store: Arc<dyn KeyValueStore>, provider: Arc<dyn LlmProvider>) -> Self {
        let library = Arc::new(Library::new(Arc::clone(&store)));
        Self {
            config,
            store,
            library,
            provider,
        }
    }

    fn activity(&self) -> Result<ActivityTracker> {
        Ok(ActivityTracker::load(self.store.clone(), self.config.activity.capacity)?)
    }

    fn assistant(&self) -> Arc<Assistant> {
        Arc::new(Assistant::new(
            Arc::clone(&self.provider),
            self.config.llm.max_tool_rounds,
        ))
    }

    pub async fn run<W: Write>(&self, command: Command, out: &mut W) -> Result<()> {
        tracing::debug!(?command, "Running command");
        match command {
            Command::Help => cli::write_help(out)?,
            Command::Version => writeln!(out, "hymnbook {}", env!("CARGO_PKG_VERSION"))?,

            Command::Hymns { query } => {
                let hymns = match query.as_deref() {
                    Some(q) => self.library.search_hymns(q)?,
                    None => self.library.hymns()?,
                };
                if hymns.is_empty() {
                    writeln!(out, "No hymns found")?;
                }
                for hymn in &hymns {
                    writeln!(out, "{:>4}  {}{}", hymn.id, hymn.display_title(), page_suffix(hymn.page_number))?;
                }
            }
            Command::Hymn { id } => {
                let hymn = self
                    .library
                    .hymn(&id)?
                    .with_context(|| format!("Hymn {} not found", id))?;
                if let Err(e) = self.activity()?.record_hymn(&hymn) {
                    tracing::warn!(error = %e, "Failed to record hymn activity");
                }
                write_hymn(out, &hymn)?;
            }
            Command::Index => {
                for hymn in self.library.hymn_index()? {
                    let page = hymn.page_number.map(|p| p.to_string()).unwrap_or_default();
                    writeln!(out, "{:>4}  {}", page, hymn.display_title())?;
                }
            }
            Command::AddHymn(args) => {
                let hymn = self.library.add_hymn(new_hymn(args)?)?;
                writeln!(out, "Added hymn {}: {}", hymn.id, hymn.display_title())?;
            }
            Command::SetAudio { id, url } => {
                let hymn = self.library.set_hymn_audio(&id, &url)?;
                match hymn.external_url {
                    Some(url) => writeln!(out, "Audio for hymn {} set to {}", hymn.id, url)?,
                    None => writeln!(out, "Audio cleared for hymn {}", hymn.id)?,
                }
            }
            Command::TrashHymn { ids } => {
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                let outcome = self.library.trash_hymns(&ids)?;
                for id in &outcome.trashed {
                    writeln!(out, "Moved hymn {} to trash", id)?;
                }
                for id in &outcome.missing {
                    writeln!(out, "No hymn with id {}", id)?;
                }
            }
            Command::Trash => {
                let trash = self.library.trash()?;
                if trash.is_empty() {
                    writeln!(out, "Trash is empty")?;
                }
                let now = Utc::now();
                for item in &trash {
                    writeln!(
                        out,
                        "{:>4}  {}  ({} days ago)",
                        item.original_id,
                        item.data.display_title(),
                        item.age_days(now)
                    )?;
                }
            }
            Command::Restore { id } => {
                let hymn = self.library.restore_hymn(&id)?;
                writeln!(out, "Restored hymn {}: {}", hymn.id, hymn.display_title())?;
            }
            Command::PurgeTrash => {
                let purged = self
                    .library
                    .purge_trash(self.config.trash.max_age_days, Utc::now())?;
                writeln!(
                    out,
                    "Purged {} hymn(s) older than {} days",
                    purged.len(),
                    self.config.trash.max_age_days
                )?;
            }

            Command::Readings { category } => {
                let readings = match category {
                    Some(category) => self.library.readings_by_category(category)?,
                    None => self.library.readings()?,
                };
                for reading in &readings {
                    writeln!(
                        out,
                        "{:>4}  {}  [{}]",
                        reading.id,
                        reading.title,
                        reading.category.display_name()
                    )?;
                }
            }
            Command::Reading { id } => {
                let reading = self
                    .library
                    .reading(&id)?
                    .with_context(|| format!("Reading {} not found", id))?;
                if let Err(e) = self.activity()?.record_reading(&reading) {
                    tracing::warn!(error = %e, "Failed to record reading activity");
                }
                write_reading(out, &reading)?;
            }
            Command::DeleteReading { id } => {
                let reading = self.library.delete_reading(&id)?;
                writeln!(out, "Deleted reading {}: {}", reading.id, reading.title)?;
            }

            Command::Programs => {
                for program in self.library.programs()? {
                    writeln!(
                        out,
                        "{:>6}  {}  {}  ({} items)",
                        program.id,
                        program.date,
                        program.title,
                        program.items.len()
                    )?;
                }
            }
            Command::Program { id } => {
                let program = self.program(&id)?;
                self.write_program(out, &program)?;
            }
            Command::Present { id } => {
                let program = self.program(&id)?;
                let presenter = ProgramPresenter::open(
                    program,
                    NoteStore::new(self.store.clone()),
                    self.activity()?,
                );
                ui::run_presenter(presenter, Arc::clone(&self.library)).await?;
            }
            Command::NewProgram(args) => {
                let program = self.create_program(args)?;
                writeln!(out, "Created program {}", program.id)?;
                self.write_program(out, &program)?;
            }
            Command::Note {
                program_id,
                item_id,
                text,
            } => {
                let program = self.program(&program_id)?;
                if program.item(&item_id).is_none() {
                    bail!("Program {} has no item {}", program_id, item_id);
                }
                NoteStore::new(self.store.clone()).save(&program_id, &item_id, &text)?;
                writeln!(out, "Saved note for {}", item_id)?;
            }
            Command::DeleteNote { program_id, item_id } => {
                NoteStore::new(self.store.clone()).delete(&program_id, &item_id)?;
                writeln!(out, "Deleted note for {}", item_id)?;
            }

            Command::Activity => {
                let recent = self.activity()?.resolve_titles(&self.library)?;
                write_titles(out, "Hymns", &recent.hymns)?;
                write_titles(out, "Readings", &recent.readings)?;
                write_titles(out, "Program items", &recent.program_items)?;
            }
            Command::Suggest => {
                let recent = self.activity()?.resolve_titles(&self.library)?;
                let assistant = self.assistant();
                let suggestions = tokio::task::spawn_blocking(move || assistant.suggest(&recent)).await?;
                match suggestions {
                    Suggestions::Empty => {
                        writeln!(out, "Open a few hymns or readings first to get suggestions.")?
                    }
                    Suggestions::Failed(message) => writeln!(out, "{}", message)?,
                    Suggestions::Ready(suggestion) => {
                        write_titles(out, "Readings", &suggestion.readings)?;
                        write_titles(out, "Hymns", &suggestion.hymns)?;
                        if !suggestion.reason.is_empty() {
                            writeln!(out, "\n{}", suggestion.reason)?;
                        }
                    }
                }
            }
            Command::Chat { prompt } => {
                let mut session = ChatSession::load(self.store.clone())?;
                let Some(reply) = session.send(self.assistant(), &prompt).await? else {
                    return Ok(());
                };
                let split = split_lyrics(&reply.text);
                if !split.talk.is_empty() {
                    writeln!(out, "{}", split.talk)?;
                }
                if let Some(lyrics) = split.lyrics {
                    writeln!(out, "\n{}", lyrics)?;
                }
            }
            Command::Conversations => {
                let session = ChatSession::load(self.store.clone())?;
                for conversation in session.conversations() {
                    writeln!(
                        out,
                        "{}  {}  {}  ({} messages)",
                        conversation.created_at.format("%Y-%m-%d %H:%M"),
                        conversation.id,
                        conversation.title,
                        conversation.messages.len()
                    )?;
                }
            }

            Command::Settings { change } => {
                let settings = SettingsStore::new(self.store.clone());
                match change {
                    Some(SettingChange::Theme(theme)) => settings.set_theme(theme)?,
                    Some(SettingChange::Color(color)) => settings.set_primary_color(color)?,
                    Some(SettingChange::Font(font)) => settings.set_font_style(font)?,
                    None => {}
                }
                writeln!(out, "{}", settings.load()?)?;
            }
            Command::Import { path } => {
                let imported = DocumentStore::new(self.store.clone()).import_path(&path)?;
                if imported.is_empty() {
                    writeln!(out, "No text documents found under {}", path.display())?;
                }
                for file in &imported {
                    writeln!(out, "Imported {} ({} bytes) as {}", file.name, file.size, file.id)?;
                }
            }
            Command::Files => {
                for file in DocumentStore::new(self.store.clone()).list()? {
                    writeln!(
                        out,
                        "{}  {:>8}  {}  {}",
                        file.id,
                        file.size,
                        file.uploaded_at.format("%Y-%m-%d"),
                        file.name
                    )?;
                }
            }
            Command::File { id } => {
                let content = DocumentStore::new(self.store.clone())
                    .content(&id)?
                    .with_context(|| format!("Document {} not found", id))?;
                write!(out, "{}", content)?;
            }
            Command::Export { kind, format, path } => {
                let (count, written) = export::export(&self.library, kind, format, &path)?;
                writeln!(out, "Exported {} record(s) as {} to {}", count, format.name(), written.display())?;
            }
            Command::Reset { confirmed } => {
                if !confirmed {
                    writeln!(
                        out,
                        "This deletes every hymn edit, program, note, setting and document.\n\
                         Run `hymnbook reset --yes` to confirm."
                    )?;
                    return Ok(());
                }
                let removed = reset::reset_all(self.store.as_ref())?;
                writeln!(out, "Reset complete ({} keys removed)", removed)?;
            }
        }
        Ok(())
    }

    fn program(&self, id: &str) -> Result<Program> {
        self.library
            .program(id)?
            .with_context(|| format!("Program {} not found", id))
    }

    fn create_program(&self, args: NewProgramArgs) -> Result<Program> {
        let mut builder = ProgramBuilder::new();
        if let Some(title) = args.title {
            builder.set_title(title);
        }
        if let Some(date) = args.date {
            builder.set_date(date);
        }
        builder.next()?;

        if !args.items.is_empty() {
            builder.set_customize(true);
            builder.select_items(args.items);
        }
        builder.next()?;

        for (title, hymn_id) in args.hymns {
            if self.library.hymn(&hymn_id)?.is_none() {
                bail!("Hymn {} not found", hymn_id);
            }
            builder.assign_hymn(title, hymn_id)?;
        }
        for (title, reading_id) in args.readings {
            if self.library.reading(&reading_id)?.is_none() {
                bail!("Reading {} not found", reading_id);
            }
            builder.assign_reading(title, reading_id)?;
        }
        for (title, content) in args.contents {
            builder.set_content(title, content)?;
        }
        for (title, notes) in args.notes {
            builder.set_notes(title, notes)?;
        }
        builder.next()?;

        Ok(builder.create(&self.library)?)
    }

    fn write_program<W: Write>(&self, out: &mut W, program: &Program) -> Result<()> {
        let notes = NoteStore::new(self.store.clone());
        writeln!(out, "{} ({})", program.title, program.date)?;
        for (n, item) in program.items.iter().enumerate() {
            let mut line = format!("{:>2}. {}", n + 1, item.title.display_name());
            if let Some(hymn_id) = &item.hymn_id {
                match self.library.hymn(hymn_id)? {
                    Some(hymn) => line.push_str(&format!(" - {}", hymn.display_title())),
                    None => line.push_str(&format!(" - hymn {} (missing)", hymn_id)),
                }
            }
            if let Some(reading_id) = &item.reading_id {
                match self.library.reading(reading_id)? {
                    Some(reading) => line.push_str(&format!(" - {}", reading.title)),
                    None => line.push_str(&format!(" - reading {} (missing)", reading_id)),
                }
            }
            if let Some(content) = &item.content {
                line.push_str(&format!(" - {}", content));
            }
            if let Some(usher) = &item.usher {
                line.push_str(&format!(" [usher: {}]", usher));
            }
            if let Some(performer) = &item.special_number {
                line.push_str(&format!(" [special number: {}]", performer));
            }
            writeln!(out, "{}", line)?;
            writeln!(out, "    id: {}", item.id)?;
            if let Some(note) = notes.resolve(&program.id, item)? {
                writeln!(out, "    note: {}", note)?;
            }
        }
        Ok(())
    }
}

fn page_suffix(page: Option<u32>) -> String {
    page.map(|p| format!("  (p. {})", p)).unwrap_or_default()
}

fn new_hymn(args: NewHymnArgs) -> Result<Hymn> {
    let lyrics = match args.lyrics_file {
        Some(path) => Some(read_lyrics(&path)?),
        None => None,
    };
    Ok(Hymn {
        title_hiligaynon: Some(args.title),
        title_filipino: args.title_filipino,
        title_english: args.title_english,
        lyrics_hiligaynon: lyrics,
        page_number: args.page_number,
        key: args.key,
        ..Hymn::default()
    })
}

fn read_lyrics(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read lyrics from {}", path.display()))
}

fn write_hymn<W: Write>(out: &mut W, hymn: &Hymn) -> Result<()> {
    writeln!(out, "{}. {}", hymn.id, hymn.display_title())?;
    for language in Language::ALL {
        if let Some(title) = hymn.title(language) {
            if title != hymn.display_title() {
                writeln!(out, "    {}: {}", language.name(), title)?;
            }
        }
    }
    let mut meta = Vec::new();
    if let Some(page) = hymn.page_number {
        meta.push(format!("page {}", page));
    }
    if let Some(key) = &hymn.key {
        meta.push(format!("key of {}", key));
    }
    if !meta.is_empty() {
        writeln!(out, "    {}", meta.join(", "))?;
    }
    if let Some(url) = &hymn.external_url {
        writeln!(out, "    audio: {}", url)?;
    }

    let languages = hymn.languages();
    if languages.is_empty() {
        writeln!(out, "\n(no lyrics)")?;
    }
    for language in languages {
        if let Some(lyrics) = hymn.lyrics(language) {
            writeln!(out, "\n[{}]\n{}", language.name(), lyrics.trim_end())?;
        }
    }
    Ok(())
}

fn write_reading<W: Write>(out: &mut W, reading: &Reading) -> Result<()> {
    writeln!(out, "{}", reading.title)?;
    if let Some(source) = &reading.source {
        writeln!(out, "({})", source)?;
    }
    writeln!(out)?;
    for line in reading.lines() {
        match line.speaker {
            Some(speaker) => writeln!(out, "{:>7}: {}", speaker.label(), line.text)?,
            None => writeln!(out, "         {}", line.text)?,
        }
    }
    Ok(())
}

fn write_titles<W: Write>(out: &mut W, heading: &str, titles: &[String]) -> Result<()> {
    writeln!(out, "{}:", heading)?;
    if titles.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for title in titles {
        writeln!(out, "  {}", title)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::assistant::testing::{lookup, text, ScriptedProvider};
    use crate::llm::APOLOGY;
    use crate::models::ItemTitle;
    use crate::program::BuilderError;
    use crate::store::MemoryStore;

    fn test_app(provider: Arc<ScriptedProvider>) -> (Arc<MemoryStore>, App) {
        let store = Arc::new(MemoryStore::new());
        let app = App::with_parts(Config::default(), store.clone(), provider);
        (store, app)
    }

    async fn run(app: &App, command: Command) -> String {
        let mut out = Vec::new();
        app.run(command, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_hymn_view_records_activity() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        let output = run(&app, Command::Hymn { id: "1".to_string() }).await;
        assert!(output.contains("Praise God"));

        let recent = app.activity().unwrap().resolve_titles(&app.library).unwrap();
        assert_eq!(recent.hymns.len(), 1);
    }

    #[tokio::test]
    async fn test_trash_reports_missing_ids() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        let output = run(
            &app,
            Command::TrashHymn {
                ids: vec!["2".to_string(), "nope".to_string()],
            },
        )
        .await;
        assert!(output.contains("Moved hymn 2 to trash"));
        assert!(output.contains("No hymn with id nope"));
        assert!(app.library.hymn("2").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_program_from_arguments() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        let before = app.library.programs().unwrap().len();
        let args = NewProgramArgs {
            date: chrono::NaiveDate::from_ymd_opt(2026, 11, 1),
            title: Some("Harvest Sunday".to_string()),
            items: vec![ItemTitle::Doxology, ItemTitle::OpeningHymn],
            hymns: vec![(ItemTitle::OpeningHymn, "3".to_string())],
            ..NewProgramArgs::default()
        };

        let output = run(&app, Command::NewProgram(args)).await;
        assert!(output.contains("Harvest Sunday"));

        let programs = app.library.programs().unwrap();
        assert_eq!(programs.len(), before + 1);
        assert_eq!(programs[0].items.len(), 2);
        assert_eq!(programs[0].items[1].hymn_id.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_new_program_rejects_unknown_hymn() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        let args = NewProgramArgs {
            date: chrono::NaiveDate::from_ymd_opt(2026, 11, 1),
            hymns: vec![(ItemTitle::OpeningHymn, "999".to_string())],
            ..NewProgramArgs::default()
        };
        let mut out = Vec::new();
        assert!(app.run(Command::NewProgram(args), &mut out).await.is_err());
    }

    #[tokio::test]
    async fn test_new_program_requires_date() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        let before = app.library.programs().unwrap().len();

        let mut out = Vec::new();
        let err = app
            .run(Command::NewProgram(NewProgramArgs::default()), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuilderError>(),
            Some(BuilderError::MissingDate)
        ));
        assert_eq!(app.library.programs().unwrap().len(), before);
    }

    #[tokio::test]
    async fn test_new_program_rejects_hymn_on_spoken_item() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        let args = NewProgramArgs {
            date: chrono::NaiveDate::from_ymd_opt(2026, 11, 1),
            hymns: vec![(ItemTitle::Sermon, "1".to_string())],
            ..NewProgramArgs::default()
        };
        let mut out = Vec::new();
        let err = app.run(Command::NewProgram(args), &mut out).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuilderError>(),
            Some(BuilderError::NotAHymnItem(ItemTitle::Sermon))
        ));
    }

    #[tokio::test]
    async fn test_help_goes_to_writer() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        let output = run(&app, Command::Help).await;
        assert!(output.starts_with("hymnbook - "));
        assert!(output.contains("new-program --date"));
    }

    #[tokio::test]
    async fn test_program_shows_personal_note_over_authored() {
        let (_, app) = test_app(ScriptedProvider::new(vec![]));
        run(
            &app,
            Command::Note {
                program_id: "100".to_string(),
                item_id: "100-6".to_string(),
                text: "Pray for the youth camp".to_string(),
            },
        )
        .await;

        let output = run(&app, Command::Program { id: "100".to_string() }).await;
        assert!(output.contains("note: Pray for the youth camp"));
        assert!(!output.contains("Pray for missions"));
    }

    #[tokio::test]
    async fn test_chat_prints_lyrics_block() {
        let provider = ScriptedProvider::new(vec![
            lookup("Doxology"),
            text("Here it is:\n[START_LYRICS]\nPraise God\n[END_LYRICS]"),
        ]);
        let (_, app) = test_app(provider);

        let output = run(
            &app,
            Command::Chat {
                prompt: "lyrics for the doxology".to_string(),
            },
        )
        .await;
        assert_eq!(output, "Here it is:\n\nPraise God\n");

        let session = ChatSession::load(app.store.clone()).unwrap();
        assert_eq!(session.conversations().len(), 1);
        assert_eq!(session.conversations()[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_suggest_without_activity_skips_the_model() {
        let provider = ScriptedProvider::new(vec![]);
        let (_, app) = test_app(provider.clone());
        let output = run(&app, Command::Suggest).await;
        assert!(output.contains("Open a few hymns"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_suggest_failure_shows_apology() {
        let provider = ScriptedProvider::new(vec![text("not json")]);
        let (_, app) = test_app(provider);
        run(&app, Command::Reading { id: "r1".to_string() }).await;

        let output = run(&app, Command::Suggest).await;
        assert!(output.contains(APOLOGY));
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation() {
        let (store, app) = test_app(ScriptedProvider::new(vec![]));
        run(&app, Command::TrashHymn { ids: vec!["2".to_string()] }).await;

        let output = run(&app, Command::Reset { confirmed: false }).await;
        assert!(output.contains("--yes"));
        assert!(store.get(crate::store::keys::HYMN_TRASH).unwrap().is_some());

        run(&app, Command::Reset { confirmed: true }).await;
        assert!(store.get(crate::store::keys::HYMN_TRASH).unwrap().is_none());
    }
}
