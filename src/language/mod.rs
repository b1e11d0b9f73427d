//! Prompt/schema locale, selected once per process.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    De,
    En,
}

impl Language {
    /// `de*` and `en*` (case-insensitive) select a locale; anything else is German.
    pub fn from_setting(value: &str) -> Self {
        let v = value.trim().to_ascii_lowercase();
        if v.starts_with("en") {
            Self::En
        } else {
            Self::De
        }
    }
}
