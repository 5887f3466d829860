//! Appearance preferences, stored as bare strings under their own keys.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::store::{keys, KeyValueStore, StoreResult};

/// A setting with a fixed set of stored string values.
pub trait Choice: Copy + Default + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;
}

fn parse_choice<T: Choice>(s: &str) -> Result<T, String> {
    let s = s.trim();
    T::ALL
        .iter()
        .copied()
        .find(|v| v.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| {
            let options: Vec<&str> = T::ALL.iter().map(|v| v.as_str()).collect();
            format!("unknown value '{}', expected one of: {}", s, options.join(", "))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Choice for Theme {
    const ALL: &'static [Self] = &[Theme::Light, Theme::Dark, Theme::System];

    fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimaryColor {
    #[default]
    Blue,
    Green,
    Purple,
    Rose,
    Orange,
}

impl Choice for PrimaryColor {
    const ALL: &'static [Self] = &[
        PrimaryColor::Blue,
        PrimaryColor::Green,
        PrimaryColor::Purple,
        PrimaryColor::Rose,
        PrimaryColor::Orange,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            PrimaryColor::Blue => "blue",
            PrimaryColor::Green => "green",
            PrimaryColor::Purple => "purple",
            PrimaryColor::Rose => "rose",
            PrimaryColor::Orange => "orange",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Sans,
    Serif,
    Mono,
}

impl Choice for FontStyle {
    const ALL: &'static [Self] = &[FontStyle::Sans, FontStyle::Serif, FontStyle::Mono];

    fn as_str(&self) -> &'static str {
        match self {
            FontStyle::Sans => "sans",
            FontStyle::Serif => "serif",
            FontStyle::Mono => "mono",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s)
    }
}

impl FromStr for PrimaryColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s)
    }
}

impl FromStr for FontStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub theme: Theme,
    pub primary_color: PrimaryColor,
    pub font_style: FontStyle,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "theme = {}", self.theme.as_str())?;
        writeln!(f, "color = {}", self.primary_color.as_str())?;
        write!(f, "font  = {}", self.font_style.as_str())
    }
}

pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

fn read<T: Choice>(store: &dyn KeyValueStore, key: &str) -> StoreResult<T> {
    Ok(match store.get(key)? {
        Some(raw) => parse_choice(&raw).unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unknown setting value, using default");
            T::default()
        }),
        None => T::default(),
    })
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> StoreResult<Settings> {
        let store = self.store.as_ref();
        Ok(Settings {
            theme: read(store, keys::THEME)?,
            primary_color: read(store, keys::PRIMARY_COLOR)?,
            font_style: read(store, keys::FONT_STYLE)?,
        })
    }

    pub fn set_theme(&self, theme: Theme) -> StoreResult<()> {
        self.store.set(keys::THEME, theme.as_str())
    }

    pub fn set_primary_color(&self, color: PrimaryColor) -> StoreResult<()> {
        self.store.set(keys::PRIMARY_COLOR, color.as_str())
    }

    pub fn set_font_style(&self, font: FontStyle) -> StoreResult<()> {
        self.store.set(keys::FONT_STYLE, font.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_defaults_when_unset() {
        let settings = SettingsStore::new(Arc::new(MemoryStore::new()));
        let loaded = settings.load().unwrap();
        assert_eq!(loaded, Settings::default());
        assert_eq!(loaded.theme.as_str(), "system");
        assert_eq!(loaded.primary_color.as_str(), "blue");
        assert_eq!(loaded.font_style.as_str(), "sans");
    }

    #[test]
    fn test_values_are_raw_strings() {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsStore::new(store.clone());
        settings.set_theme(Theme::Dark).unwrap();
        settings.set_primary_color(PrimaryColor::Rose).unwrap();
        settings.set_font_style(FontStyle::Serif).unwrap();

        assert_eq!(store.get(keys::THEME).unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get(keys::PRIMARY_COLOR).unwrap().as_deref(), Some("rose"));

        let loaded = settings.load().unwrap();
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.primary_color, PrimaryColor::Rose);
        assert_eq!(loaded.font_style, FontStyle::Serif);
    }

    #[test]
    fn test_unknown_stored_value_falls_back() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::THEME, "\"dark\"").unwrap();
        store.set(keys::FONT_STYLE, "comic").unwrap();
        let loaded = SettingsStore::new(store).load().unwrap();
        assert_eq!(loaded.theme, Theme::System);
        assert_eq!(loaded.font_style, FontStyle::Sans);
    }

    #[test]
    fn test_parse() {
        assert_eq!("DARK".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" purple ".parse::<PrimaryColor>().unwrap(), PrimaryColor::Purple);
        assert!("teal".parse::<PrimaryColor>().unwrap_err().contains("blue, green"));
    }
}
