use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages a hymn can carry a title and lyrics in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hiligaynon,
    Filipino,
    English,
}

impl Language {
    /// Canonical order: Hiligaynon first.
    pub const ALL: [Language; 3] = [Language::Hiligaynon, Language::Filipino, Language::English];

    pub fn name(&self) -> &'static str {
        match self {
            Language::Hiligaynon => "Hiligaynon",
            Language::Filipino => "Filipino",
            Language::English => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hymn {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_hiligaynon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_filipino: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_hiligaynon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_filipino: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Audio recording of the hymn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Hymn {
    pub fn title(&self, language: Language) -> Option<&str> {
        match language {
            Language::Hiligaynon => non_blank(&self.title_hiligaynon),
            Language::Filipino => non_blank(&self.title_filipino),
            Language::English => non_blank(&self.title_english),
        }
    }

    pub fn lyrics(&self, language: Language) -> Option<&str> {
        match language {
            Language::Hiligaynon => non_blank(&self.lyrics_hiligaynon),
            Language::Filipino => non_blank(&self.lyrics_filipino),
            Language::English => non_blank(&self.lyrics_english),
        }
    }

    /// Title shown in lists. Hiligaynon is canonical when present.
    pub fn display_title(&self) -> &str {
        Language::ALL
            .iter()
            .find_map(|lang| self.title(*lang))
            .unwrap_or("Untitled hymn")
    }

    /// First language with lyrics, in canonical order.
    pub fn primary_lyrics(&self) -> Option<(Language, &str)> {
        Language::ALL
            .iter()
            .find_map(|lang| self.lyrics(*lang).map(|l| (*lang, l)))
    }

    /// Languages carrying either a title or lyrics.
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|lang| self.title(*lang).is_some() || self.lyrics(*lang).is_some())
            .collect()
    }

    /// True when at least one language has both a title and lyrics.
    pub fn has_content(&self) -> bool {
        Language::ALL
            .iter()
            .any(|lang| self.title(*lang).is_some() && self.lyrics(*lang).is_some())
    }

    /// The edit form only insists on the Hiligaynon title.
    pub fn validate_for_edit(&self) -> Result<(), String> {
        if self.title(Language::Hiligaynon).is_none() {
            return Err("Hiligaynon title is required".to_string());
        }
        Ok(())
    }

    /// Case-insensitive match against titles, lyrics, author and page number.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        if let (Ok(page), Some(own)) = (query.parse::<u32>(), self.page_number) {
            if page == own {
                return true;
            }
        }
        let fields = [
            &self.title_hiligaynon,
            &self.title_filipino,
            &self.title_english,
            &self.lyrics_hiligaynon,
            &self.lyrics_filipino,
            &self.lyrics_english,
            &self.author,
        ];
        fields
            .iter()
            .filter_map(|f| f.as_deref())
            .any(|f| f.to_lowercase().contains(&query))
    }
}
