//! Multilingual resource strings
//!
//! Report titles, sheet prefixes, axis labels and row labels are looked up by
//! reference key in a table with one column per language.

use crate::error::PivotError;
use crate::types::ResourceString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Languages a report can be rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    #[default]
    En,
    De,
    Fr,
    It,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::De, Language::Fr, Language::It];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::De => "DE",
            Language::Fr => "FR",
            Language::It => "IT",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EN" => Ok(Language::En),
            "DE" => Ok(Language::De),
            "FR" => Ok(Language::Fr),
            "IT" => Ok(Language::It),
            other => Err(PivotError::Config(format!(
                "Unsupported language '{}' (expected one of EN, DE, FR, IT)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Language {
    type Error = PivotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.code().to_string()
    }
}

/// Lookup of display strings by reference key
pub trait ResourceStrings {
    /// The string for `key` in `language`, falling back to English when the
    /// requested translation is blank. None when nothing usable exists.
    fn lookup(&self, key: &str, language: Language) -> Option<String>;

    /// Like [`lookup`](Self::lookup), with a warning when the string is missing
    fn get_resource_string(&self, key: &str, language: Language) -> Option<String> {
        let found = self.lookup(key, language);
        if found.is_none() {
            warn!(key, language = %language, "Resource string not found");
        }
        found
    }

    /// [`get_resource_string`](Self::get_resource_string), or `fallback`
    fn resource_or(&self, key: &str, language: Language, fallback: &str) -> String {
        self.get_resource_string(key, language)
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// In-memory resource table keyed by `Ref`
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: HashMap<String, ResourceString>,
}

impl ResourceTable {
    pub fn new(resources: Vec<ResourceString>) -> Self {
        let entries = resources
            .into_iter()
            .map(|r| (r.reference.trim().to_string(), r))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn translation(entry: &ResourceString, language: Language) -> Option<String> {
    match language {
        Language::En => non_blank(&entry.en),
        Language::De => non_blank(&entry.de),
        Language::Fr => non_blank(&entry.fr),
        Language::It => non_blank(&entry.it),
    }
}

impl ResourceStrings for ResourceTable {
    fn lookup(&self, key: &str, language: Language) -> Option<String> {
        let entry = self.entries.get(key)?;
        translation(entry, language).or_else(|| translation(entry, Language::En))
    }
}
