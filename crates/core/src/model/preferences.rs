use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParsePreferenceError {
    #[error("unknown preference field: {0}")]
    UnknownField(String),

    #[error("invalid {field} value: {raw}")]
    InvalidValue { field: &'static str, raw: String },
}

//
// ─── PROFILE & DISPLAY SETTINGS ────────────────────────────────────────────────
//

/// Accessibility profile the reader is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderMode {
    /// Attention support: short blocks, minimal distraction.
    #[default]
    Adhd,
    /// Dyslexia support: warm background, roomier line height.
    Dyslexia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    #[default]
    Base,
    Large,
    XLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterSpacing {
    #[default]
    Normal,
    Wide,
    Wider,
}

impl ReaderMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReaderMode::Adhd => "adhd",
            ReaderMode::Dyslexia => "dyslexia",
        }
    }
}

impl FontSize {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FontSize::Base => "base",
            FontSize::Large => "large",
            FontSize::XLarge => "xlarge",
        }
    }
}

impl LetterSpacing {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LetterSpacing::Normal => "normal",
            LetterSpacing::Wide => "wide",
            LetterSpacing::Wider => "wider",
        }
    }
}

impl fmt::Display for ReaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderMode::Adhd => write!(f, "ADHD"),
            ReaderMode::Dyslexia => write!(f, "Dyslexia"),
        }
    }
}

impl FromStr for ReaderMode {
    type Err = ParsePreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adhd" => Ok(Self::Adhd),
            "dyslexia" => Ok(Self::Dyslexia),
            _ => Err(ParsePreferenceError::InvalidValue {
                field: "mode",
                raw: s.to_string(),
            }),
        }
    }
}

impl FromStr for FontSize {
    type Err = ParsePreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "large" => Ok(Self::Large),
            "xlarge" => Ok(Self::XLarge),
            _ => Err(ParsePreferenceError::InvalidValue {
                field: "font-size",
                raw: s.to_string(),
            }),
        }
    }
}

impl FromStr for LetterSpacing {
    type Err = ParsePreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "wide" => Ok(Self::Wide),
            "wider" => Ok(Self::Wider),
            _ => Err(ParsePreferenceError::InvalidValue {
                field: "letter-spacing",
                raw: s.to_string(),
            }),
        }
    }
}

//
// ─── PREFERENCES ───────────────────────────────────────────────────────────────
//

/// Display settings that survive content changes and restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadingPreferences {
    pub mode: ReaderMode,
    pub font_size: FontSize,
    pub letter_spacing: LetterSpacing,
    pub high_contrast: bool,
    /// Only meaningful in `ReaderMode::Dyslexia`.
    pub dyslexia_large_text: bool,
}

/// A change to exactly one preference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceUpdate {
    Mode(ReaderMode),
    FontSize(FontSize),
    LetterSpacing(LetterSpacing),
    HighContrast(bool),
    DyslexiaLargeText(bool),
}

impl ReadingPreferences {
    pub fn apply(&mut self, update: PreferenceUpdate) {
        match update {
            PreferenceUpdate::Mode(mode) => self.mode = mode,
            PreferenceUpdate::FontSize(size) => self.font_size = size,
            PreferenceUpdate::LetterSpacing(spacing) => self.letter_spacing = spacing,
            PreferenceUpdate::HighContrast(on) => self.high_contrast = on,
            PreferenceUpdate::DyslexiaLargeText(on) => self.dyslexia_large_text = on,
        }
    }
}

impl PreferenceUpdate {
    /// Build an update from a field name and a textual value.
    ///
    /// Field names: `mode`, `font-size`, `letter-spacing`, `high-contrast`,
    /// `large-text`.
    ///
    /// # Errors
    ///
    /// Returns `ParsePreferenceError` for an unknown field or an invalid value.
    pub fn parse(field: &str, value: &str) -> Result<Self, ParsePreferenceError> {
        match field {
            "mode" => Ok(Self::Mode(value.parse()?)),
            "font-size" => Ok(Self::FontSize(value.parse()?)),
            "letter-spacing" => Ok(Self::LetterSpacing(value.parse()?)),
            "high-contrast" => parse_flag("high-contrast", value).map(Self::HighContrast),
            "large-text" => parse_flag("large-text", value).map(Self::DyslexiaLargeText),
            _ => Err(ParsePreferenceError::UnknownField(field.to_string())),
        }
    }
}

fn parse_flag(field: &'static str, raw: &str) -> Result<bool, ParsePreferenceError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(ParsePreferenceError::InvalidValue {
            field,
            raw: raw.to_string(),
        }),
    }
}
