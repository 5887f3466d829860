use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Liturgical roles a program item can fill, in service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemTitle {
    #[serde(rename = "Doxology")]
    Doxology,
    #[serde(rename = "Call to Worship")]
    CallToWorship,
    #[serde(rename = "Opening Hymn")]
    OpeningHymn,
    #[serde(rename = "Invocation")]
    Invocation,
    #[serde(rename = "Responsive Reading")]
    ResponsiveReading,
    #[serde(rename = "Gloria Patri")]
    GloriaPatri,
    #[serde(rename = "Pastoral Prayer")]
    PastoralPrayer,
    #[serde(rename = "Hymn of Preparation")]
    HymnOfPreparation,
    #[serde(rename = "Scripture Reading")]
    ScriptureReading,
    #[serde(rename = "Special Number")]
    SpecialNumber,
    #[serde(rename = "Sermon")]
    Sermon,
    #[serde(rename = "Hymn of Response")]
    HymnOfResponse,
    #[serde(rename = "Offertory Sentence")]
    OffertorySentence,
    #[serde(rename = "Offertory Hymn")]
    OffertoryHymn,
    #[serde(rename = "Prayer of Dedication")]
    PrayerOfDedication,
    #[serde(rename = "Announcements")]
    Announcements,
    #[serde(rename = "Closing Hymn")]
    ClosingHymn,
    #[serde(rename = "Prayer of Benediction")]
    PrayerOfBenediction,
}

impl ItemTitle {
    pub const ALL: [ItemTitle; 18] = [
        ItemTitle::Doxology,
        ItemTitle::CallToWorship,
        ItemTitle::OpeningHymn,
        ItemTitle::Invocation,
        ItemTitle::ResponsiveReading,
        ItemTitle::GloriaPatri,
        ItemTitle::PastoralPrayer,
        ItemTitle::HymnOfPreparation,
        ItemTitle::ScriptureReading,
        ItemTitle::SpecialNumber,
        ItemTitle::Sermon,
        ItemTitle::HymnOfResponse,
        ItemTitle::OffertorySentence,
        ItemTitle::OffertoryHymn,
        ItemTitle::PrayerOfDedication,
        ItemTitle::Announcements,
        ItemTitle::ClosingHymn,
        ItemTitle::PrayerOfBenediction,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ItemTitle::Doxology => "Doxology",
            ItemTitle::CallToWorship => "Call to Worship",
            ItemTitle::OpeningHymn => "Opening Hymn",
            ItemTitle::Invocation => "Invocation",
            ItemTitle::ResponsiveReading => "Responsive Reading",
            ItemTitle::GloriaPatri => "Gloria Patri",
            ItemTitle::PastoralPrayer => "Pastoral Prayer",
            ItemTitle::HymnOfPreparation => "Hymn of Preparation",
            ItemTitle::ScriptureReading => "Scripture Reading",
            ItemTitle::SpecialNumber => "Special Number",
            ItemTitle::Sermon => "Sermon",
            ItemTitle::HymnOfResponse => "Hymn of Response",
            ItemTitle::OffertorySentence => "Offertory Sentence",
            ItemTitle::OffertoryHymn => "Offertory Hymn",
            ItemTitle::PrayerOfDedication => "Prayer of Dedication",
            ItemTitle::Announcements => "Announcements",
            ItemTitle::ClosingHymn => "Closing Hymn",
            ItemTitle::PrayerOfBenediction => "Prayer of Benediction",
        }
    }

    /// Items that are normally sung and take a hymn assignment.
    pub fn takes_hymn(&self) -> bool {
        matches!(
            self,
            ItemTitle::Doxology
                | ItemTitle::OpeningHymn
                | ItemTitle::GloriaPatri
                | ItemTitle::HymnOfPreparation
                | ItemTitle::HymnOfResponse
                | ItemTitle::OffertoryHymn
                | ItemTitle::ClosingHymn
        )
    }

    /// Items that are normally read responsively and take a reading assignment.
    pub fn takes_reading(&self) -> bool {
        matches!(
            self,
            ItemTitle::CallToWorship | ItemTitle::ResponsiveReading | ItemTitle::OffertorySentence
        )
    }
}

impl fmt::Display for ItemTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ItemTitle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ItemTitle::ALL
            .into_iter()
            .find(|t| t.display_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown program item: {}", wanted))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramItem {
    pub id: String,
    pub title: ItemTitle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hymn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_number: Option<String>,
    /// Note authored with the program. Personal notes overlay it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProgramItem {
    pub fn new(id: impl Into<String>, title: ItemTitle) -> Self {
        Self {
            id: id.into(),
            title,
            content: None,
            hymn_id: None,
            reading_id: None,
            usher: None,
            special_number: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub items: Vec<ProgramItem>,
}

impl Program {
    pub fn item(&self, item_id: &str) -> Option<&ProgramItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}
