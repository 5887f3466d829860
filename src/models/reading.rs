use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingCategory {
    #[default]
    ResponsiveReading,
    CallToWorship,
    OffertorySentence,
}

impl ReadingCategory {
    pub fn slug(&self) -> &'static str {
        match self {
            ReadingCategory::ResponsiveReading => "responsive-reading",
            ReadingCategory::CallToWorship => "call-to-worship",
            ReadingCategory::OffertorySentence => "offertory-sentence",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ReadingCategory::ResponsiveReading => "Responsive Reading",
            ReadingCategory::CallToWorship => "Call to Worship",
            ReadingCategory::OffertorySentence => "Offertory Sentence",
        }
    }
}

impl fmt::Display for ReadingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ReadingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "responsive-reading" | "responsive" => Ok(ReadingCategory::ResponsiveReading),
            "call-to-worship" | "call" => Ok(ReadingCategory::CallToWorship),
            "offertory-sentence" | "offertory" => Ok(ReadingCategory::OffertorySentence),
            other => Err(format!("unknown reading category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: String,
    pub title: String,
    pub lyrics: String,
    #[serde(default)]
    pub category: ReadingCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// Who reads a line aloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Leader,
    People,
    All,
}

impl Speaker {
    const PREFIXES: [(&'static str, Speaker); 3] = [
        ("Leader:", Speaker::Leader),
        ("People:", Speaker::People),
        ("All:", Speaker::All),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Leader => "Leader",
            Speaker::People => "People",
            Speaker::All => "All",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingLine {
    pub speaker: Option<Speaker>,
    pub text: String,
}

impl Reading {
    /// Split the call-and-response text into speaker-tagged lines.
    /// Unprefixed lines continue the previous speaker.
    pub fn lines(&self) -> Vec<ReadingLine> {
        let mut current = None;
        let mut lines = Vec::new();

        for raw in self.lyrics.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let prefixed = Speaker::PREFIXES
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix));

            let text = match prefixed {
                Some((prefix, speaker)) => {
                    current = Some(*speaker);
                    line[prefix.len()..].trim()
                }
                None => line,
            };

            lines.push(ReadingLine {
                speaker: current,
                text: text.to_string(),
            });
        }

        lines
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.lyrics.to_lowercase().contains(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_tracks_speakers() {
        let reading = Reading {
            id: "r1".to_string(),
            title: "Psalm 100".to_string(),
            lyrics: "Intro line\nLeader: Make a joyful noise\nunto the Lord\n\nPeople: Serve the Lord with gladness\nAll: Amen".to_string(),
            category: ReadingCategory::ResponsiveReading,
            source: None,
            page_number: None,
        };

        let lines = reading.lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].speaker, None);
        assert_eq!(lines[1].speaker, Some(Speaker::Leader));
        assert_eq!(lines[1].text, "Make a joyful noise");
        assert_eq!(lines[2].speaker, Some(Speaker::Leader));
        assert_eq!(lines[3].speaker, Some(Speaker::People));
        assert_eq!(lines[4].speaker, Some(Speaker::All));
        assert_eq!(lines[4].text, "Amen");
    }

    #[test]
    fn test_category_round_trips_as_kebab_case() {
        let json = serde_json::to_string(&ReadingCategory::OffertorySentence).unwrap();
        assert_eq!(json, "\"offertory-sentence\"");
        assert_eq!("call".parse::<ReadingCategory>().unwrap(), ReadingCategory::CallToWorship);
        assert!("sermon".parse::<ReadingCategory>().is_err());
    }
}
