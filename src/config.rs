//! Project configuration
//!
//! A project is described by a YAML file:
//!
//! ```yaml
//! project:
//!   properties:
//!     name: league
//!     language: DE
//!   dirs:
//!     input: input
//!     output: "[input]/../output"
//!   paths:
//!     data_file: "[input]/criteria.yaml"
//! ```
//!
//! Values may reference other `dirs`, `paths` or `properties` entries with
//! `[name]` placeholders.

use crate::error::{PivotError, PivotResult};
use crate::resources::Language;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MAX_SUBSTITUTION_DEPTH: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectProperties {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Any further free-form properties, usable as placeholders
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default)]
    pub properties: ProjectProperties,
    #[serde(default)]
    pub dirs: BTreeMap<String, String>,
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    project: ProjectSection,
}

/// Loaded and resolved project configuration
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    /// Directory of the configuration file; relative paths resolve against it
    pub base_dir: PathBuf,
    pub language: Language,
}

impl ProjectConfig {
    /// Load a configuration file from disk
    pub fn load(path: &Path) -> PivotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PivotError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_yaml(&content, base_dir)
    }

    /// Parse configuration text; `base_dir` anchors relative paths
    pub fn from_yaml(content: &str, base_dir: PathBuf) -> PivotResult<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let language = match file.project.properties.language.as_deref() {
            Some(code) if !code.trim().is_empty() => code.parse()?,
            _ => Language::default(),
        };

        let mut config = Self {
            project: file.project,
            base_dir,
            language,
        };
        config.resolve_placeholders()?;
        Ok(config)
    }

    pub fn name(&self) -> &str {
        self.project
            .properties
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("project")
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// A `dirs` entry resolved against the base directory
    pub fn dir(&self, key: &str) -> Option<PathBuf> {
        self.project.dirs.get(key).map(|d| self.resolve_path(d))
    }

    /// A `paths` entry resolved against the base directory
    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.project.paths.get(key).map(|p| self.resolve_path(p))
    }

    /// The dataset to load
    pub fn data_file(&self) -> PivotResult<PathBuf> {
        self.path("data_file").ok_or_else(|| {
            PivotError::Config("Missing 'project.paths.data_file' in configuration".to_string())
        })
    }

    /// Directory reports are written to (`dirs.output`, else the base directory)
    pub fn output_dir(&self) -> PathBuf {
        self.dir("output").unwrap_or_else(|| self.base_dir.clone())
    }

    /// `{output_dir}/{name}_pivots_{LANG}_{YYYYMMDD_HHMMSS}.xlsx`
    pub fn output_file(&self, now: DateTime<Local>) -> PathBuf {
        self.output_dir().join(format!(
            "{}_pivots_{}_{}.xlsx",
            self.name(),
            self.language,
            now.format("%Y%m%d_%H%M%S")
        ))
    }

    fn resolve_path(&self, value: &str) -> PathBuf {
        let path = PathBuf::from(value);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    /// Substitute `[name]` placeholders in dirs and paths
    fn resolve_placeholders(&mut self) -> PivotResult<()> {
        let values = self.placeholder_values();
        let pattern = Regex::new(r"\[([^\]]+)\]")
            .map_err(|e| PivotError::Config(format!("Invalid placeholder pattern: {}", e)))?;

        for map in [&mut self.project.dirs, &mut self.project.paths] {
            for (key, value) in map.iter_mut() {
                let resolved = substitute(&pattern, value, &values).map_err(|name| {
                    PivotError::Config(format!(
                        "Cannot resolve '{}' in '{}': unknown or cyclic placeholder [{}]",
                        value, key, name
                    ))
                })?;
                *value = resolved;
            }
        }
        Ok(())
    }

    /// Lookup table for placeholders: dirs, then paths, then properties
    fn placeholder_values(&self) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        let props = &self.project.properties;
        let named = [
            ("name", &props.name),
            ("description", &props.description),
            ("version", &props.version),
            ("language", &props.language),
        ];
        for (key, value) in named {
            if let Some(v) = value {
                values.insert(key.to_string(), v.clone());
            }
        }
        for (key, value) in &props.extra {
            let text = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            values.insert(key.clone(), text);
        }
        // dirs take precedence over paths, which take precedence over properties
        for (key, value) in &self.project.paths {
            values.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.project.dirs {
            values.insert(key.clone(), value.clone());
        }
        values
    }
}

/// Replace placeholders until none are left; Err carries the offending name
fn substitute(
    pattern: &Regex,
    value: &str,
    values: &BTreeMap<String, String>,
) -> Result<String, String> {
    let mut current = value.to_string();
    for _ in 0..MAX_SUBSTITUTION_DEPTH {
        let Some(caps) = pattern.captures(&current) else {
            return Ok(current);
        };
        let name = caps[1].to_string();
        let replacement = values.get(&name).ok_or_else(|| name.clone())?;
        current = current.replacen(&format!("[{}]", name), replacement, 1);
    }

    match pattern.captures(&current) {
        Some(caps) => Err(caps[1].to_string()),
        None => Ok(current),
    }
}
