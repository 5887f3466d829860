use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::library::Library;
use crate::models::{Hymn, Program, Reading};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {} (expected json or csv)", other)),
        }
    }
}

/// Which collection to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Hymns,
    Readings,
    Programs,
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hymns" => Ok(ExportKind::Hymns),
            "readings" => Ok(ExportKind::Readings),
            "programs" => Ok(ExportKind::Programs),
            other => Err(format!(
                "unknown collection: {} (expected hymns, readings or programs)",
                other
            )),
        }
    }
}

/// Where an export lands: the given path, with the format's extension
/// added when it has none.
pub fn output_path(path: &Path, format: ExportFormat) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(format.extension())
    }
}

/// Export a collection to a file. Returns the number of records written and
/// the path actually used.
pub fn export(library: &Library, kind: ExportKind, format: ExportFormat, path: &Path) -> Result<(usize, PathBuf)> {
    let output_path = output_path(path, format);
    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let count = export_to(library, kind, format, file)?;
    tracing::info!(?kind, format = format.name(), count, path = %output_path.display(), "Exported");
    Ok((count, output_path))
}

pub fn export_to<W: Write>(library: &Library, kind: ExportKind, format: ExportFormat, writer: W) -> Result<usize> {
    match kind {
        ExportKind::Hymns => {
            let hymns = library.hymns()?;
            match format {
                ExportFormat::Json => write_json(&hymns, writer)?,
                ExportFormat::Csv => hymns_csv(&hymns, writer)?,
            }
            Ok(hymns.len())
        }
        ExportKind::Readings => {
            let readings = library.readings()?;
            match format {
                ExportFormat::Json => write_json(&readings, writer)?,
                ExportFormat::Csv => readings_csv(&readings, writer)?,
            }
            Ok(readings.len())
        }
        ExportKind::Programs => {
            let programs = library.programs()?;
            match format {
                ExportFormat::Json => write_json(&programs, writer)?,
                ExportFormat::Csv => programs_csv(&programs, writer)?,
            }
            Ok(programs.len())
        }
    }
}

fn write_json<T: serde::Serialize, W: Write>(records: &[T], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn hymns_csv<W: Write>(hymns: &[Hymn], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record([
        "id",
        "page_number",
        "title_hiligaynon",
        "title_filipino",
        "title_english",
        "key",
        "author",
        "composer",
        "category",
        "external_url",
        "lyrics_hiligaynon",
        "lyrics_filipino",
        "lyrics_english",
    ])?;

    for hymn in hymns {
        wtr.write_record([
            hymn.id.as_str(),
            &hymn.page_number.map(|v| v.to_string()).unwrap_or_default(),
            opt(&hymn.title_hiligaynon),
            opt(&hymn.title_filipino),
            opt(&hymn.title_english),
            opt(&hymn.key),
            opt(&hymn.author),
            opt(&hymn.composer),
            opt(&hymn.category),
            opt(&hymn.external_url),
            opt(&hymn.lyrics_hiligaynon),
            opt(&hymn.lyrics_filipino),
            opt(&hymn.lyrics_english),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn readings_csv<W: Write>(readings: &[Reading], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["id", "title", "category", "source", "page_number", "lyrics"])?;

    for reading in readings {
        wtr.write_record([
            reading.id.as_str(),
            reading.title.as_str(),
            reading.category.slug(),
            opt(&reading.source),
            &reading.page_number.map(|v| v.to_string()).unwrap_or_default(),
            reading.lyrics.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// One row per program item.
fn programs_csv<W: Write>(programs: &[Program], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "program_id",
        "program_title",
        "date",
        "item_id",
        "item_title",
        "hymn_id",
        "reading_id",
        "content",
        "usher",
        "special_number",
        "notes",
    ])?;

    for program in programs {
        let date = program.date.format("%Y-%m-%d").to_string();
        for item in &program.items {
            wtr.write_record([
                program.id.as_str(),
                program.title.as_str(),
                date.as_str(),
                item.id.as_str(),
                item.title.display_name(),
                opt(&item.hymn_id),
                opt(&item.reading_id),
                opt(&item.content),
                opt(&item.usher),
                opt(&item.special_number),
                opt(&item.notes),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::test_library;
    use tempfile::tempdir;

    #[test]
    fn test_programs_csv_has_row_per_item() {
        let (_store, library) = test_library();
        let mut out = Vec::new();
        let count = export_to(&library, ExportKind::Programs, ExportFormat::Csv, &mut out).unwrap();
        assert_eq!(count, 1);

        let text = String::from_utf8(out).unwrap();
        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 11);
        assert_eq!(&rows[5][4], "Pastoral Prayer");
        assert_eq!(&rows[5][10], "Pray for missions");
    }

    #[test]
    fn test_hymns_json_export_reads_back() {
        let (_store, library) = test_library();
        let dir = tempdir().unwrap();
        let path = dir.path().join("hymns.json");

        let (count, written) = export(&library, ExportKind::Hymns, ExportFormat::Json, &path).unwrap();
        assert_eq!(written, path);
        let parsed: Vec<Hymn> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(count, parsed.len());
        assert_eq!(parsed, library.hymns().unwrap());
    }

    #[test]
    fn test_missing_extension_is_added() {
        let (_store, library) = test_library();
        let dir = tempdir().unwrap();

        let (_, written) = export(&library, ExportKind::Readings, ExportFormat::Csv, &dir.path().join("readings")).unwrap();
        assert_eq!(written, dir.path().join("readings.csv"));
        assert!(written.exists());

        assert_eq!(
            output_path(Path::new("out/programs.txt"), ExportFormat::Json),
            PathBuf::from("out/programs.txt")
        );
    }

    #[test]
    fn test_readings_csv_uses_category_slug() {
        let (_store, library) = test_library();
        let mut out = Vec::new();
        export_to(&library, ExportKind::Readings, ExportFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("id,title,category"));
        assert!(text.contains("call-to-worship"));
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("programs".parse::<ExportKind>().unwrap(), ExportKind::Programs);
        assert!("html".parse::<ExportFormat>().is_err());
    }
}
