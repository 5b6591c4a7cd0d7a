// SPDX-License-Identifier: MIT OR Apache-2.0

//! The strongly-typed configuration surface consumed by [`Broker::configure`](crate::Broker::configure).
//!
//! These types are plain data. They deserialize with serde from whatever
//! document format the host application prefers, support `${var}` placeholder
//! substitution against a parameter map, and are validated when handed to the
//! broker. Validation failures are synchronous, name the offending key or
//! field, and leave the broker on its previous configuration generation.
//!
//! Backend configurations form a closed tagged union discriminated by a
//! `type` field:
//!
//! ```json
//! {
//!   "rules": [
//!     { "min_level": "Warning", "targets": ["errors"] }
//!   ],
//!   "backends": [
//!     { "type": "file", "key": "errors", "folder": "/var/log/app", "size": 5242880, "count": 5 }
//!   ]
//! }
//! ```

use crate::{Level, LevelWindow, RoutingRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

const MEGABYTE: u64 = 1024 * 1024;

/// A configuration rejected by [`Broker::configure`](crate::Broker::configure).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate backend key '{0}'")]
    DuplicateKey(String),
    #[error("backend '{key}': missing required field '{field}'")]
    MissingField { key: String, field: &'static str },
    #[error("backend '{key}': {reason}")]
    InvalidField { key: String, reason: String },
    #[error("rule {index}: bad {field} pattern: {source}")]
    BadPattern {
        index: usize,
        field: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// One configuration generation: the rule list and the backends it routes to.
///
/// An empty rule list is legal and means no backend ever receives events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl BrokerConfig {
    /**
    Replaces `${var}` occurrences in every declared string field with the
    matching value from `params`.

    The fields visited are a fixed, hand-written list per config type: rule
    patterns, backend keys, and the file backend's folder and file-name
    prefix. References to variables absent from `params` are left intact.
    */
    pub fn substitute(&mut self, params: &HashMap<String, String>) {
        for rule in &mut self.rules {
            for pattern in [&mut rule.thread_pattern, &mut rule.tag_pattern] {
                if let Some(value) = pattern {
                    substitute_value(value, params);
                }
            }
        }
        for backend in &mut self.backends {
            for field in backend.string_fields_mut() {
                substitute_value(field, params);
            }
        }
    }
}

/// The serializable form of a [`RoutingRule`], carrying pattern *strings*.
///
/// Patterns are compiled during `configure`; a malformed pattern is a
/// configuration error, not a silent wildcard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_min_level")]
    pub min_level: Level,
    #[serde(default = "default_max_level")]
    pub max_level: Level,
    #[serde(default)]
    pub thread_pattern: Option<String>,
    #[serde(default)]
    pub tag_pattern: Option<String>,
    pub targets: Vec<String>,
}

fn default_min_level() -> Level {
    Level::Verbose
}

fn default_max_level() -> Level {
    Level::Assert
}

impl RuleConfig {
    /// A rule admitting everything in `[min, max]`, routed to `targets`.
    pub fn new(min_level: Level, max_level: Level, targets: Vec<String>) -> Self {
        Self {
            min_level,
            max_level,
            thread_pattern: None,
            tag_pattern: None,
            targets,
        }
    }

    pub(crate) fn compile(&self, index: usize) -> Result<RoutingRule, ConfigError> {
        let mut rule = RoutingRule::new(
            LevelWindow::new(self.min_level, self.max_level),
            self.targets.clone(),
        );
        if let Some(pattern) = &self.thread_pattern {
            rule = rule
                .thread_pattern(pattern)
                .map_err(|source| ConfigError::BadPattern {
                    index,
                    field: "thread",
                    source,
                })?;
        }
        if let Some(pattern) = &self.tag_pattern {
            rule = rule
                .tag_pattern(pattern)
                .map_err(|source| ConfigError::BadPattern {
                    index,
                    field: "tag",
                    source,
                })?;
        }
        Ok(rule)
    }
}

/// Backend configurations, discriminated by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Console(ConsoleConfig),
    File(FileConfig),
    Memory(MemoryConfig),
}

impl BackendConfig {
    pub fn key(&self) -> &str {
        match self {
            BackendConfig::Console(config) => &config.key,
            BackendConfig::File(config) => &config.key,
            BackendConfig::Memory(config) => &config.key,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.key().is_empty() {
            return Err(ConfigError::MissingField {
                key: String::new(),
                field: "key",
            });
        }
        match self {
            BackendConfig::Console(_) | BackendConfig::Memory(_) => Ok(()),
            BackendConfig::File(config) => config.validate(),
        }
    }

    /// The static accessor list backing [`BrokerConfig::substitute`].
    fn string_fields_mut(&mut self) -> Vec<&mut String> {
        match self {
            BackendConfig::Console(config) => vec![&mut config.key],
            BackendConfig::Memory(config) => vec![&mut config.key],
            BackendConfig::File(config) => {
                let mut fields = vec![&mut config.key, &mut config.folder];
                if let Some(file_name) = &mut config.file_name {
                    fields.push(file_name);
                }
                fields
            }
        }
    }
}

/// Configuration of the stdout/stderr backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub key: String,
    #[serde(default)]
    pub window: LevelWindow,
}

impl ConsoleConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            window: LevelWindow::all(),
        }
    }
}

/// Configuration of the rotating file backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub key: String,
    #[serde(default)]
    pub window: LevelWindow,
    /// Directory the log file set lives in. Created on init if absent.
    pub folder: String,
    /// File-name prefix; defaults to `logger-{key}`.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Rotation threshold in bytes.
    #[serde(default = "FileConfig::default_size")]
    pub size: u64,
    /// Number of retained files (active file plus archives).
    #[serde(default = "FileConfig::default_count")]
    pub count: u32,
}

impl FileConfig {
    pub fn new(key: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            window: LevelWindow::all(),
            folder: folder.into(),
            file_name: None,
            size: Self::default_size(),
            count: Self::default_count(),
        }
    }

    fn default_size() -> u64 {
        10 * MEGABYTE
    }

    fn default_count() -> u32 {
        10
    }

    /// The effective file-name prefix.
    pub fn file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("logger-{}", self.key))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.folder.is_empty() {
            return Err(ConfigError::MissingField {
                key: self.key.clone(),
                field: "folder",
            });
        }
        if self.size < MEGABYTE {
            return Err(ConfigError::InvalidField {
                key: self.key.clone(),
                reason: format!("file size must be >= 1 MB, got {}", self.size),
            });
        }
        if self.count < 3 {
            return Err(ConfigError::InvalidField {
                key: self.key.clone(),
                reason: format!("rotation count must be >= 3, got {}", self.count),
            });
        }
        Ok(())
    }
}

/// Configuration of the in-memory backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub key: String,
    #[serde(default)]
    pub window: LevelWindow,
}

impl MemoryConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            window: LevelWindow::all(),
        }
    }
}

pub(crate) fn compile_rules(rules: &[RuleConfig]) -> Result<Vec<RoutingRule>, ConfigError> {
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| rule.compile(index))
        .collect()
}

fn substitute_value(value: &mut String, params: &HashMap<String, String>) {
    if !value.contains("${") {
        return;
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value.as_str();
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match params.get(name) {
                    Some(replacement) => out.push_str(replacement),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated reference; keep the tail verbatim.
                out.push_str("${");
                rest = after;
                break;
            }
        }
    }
    out.push_str(rest);
    *value = out;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_backends_with_defaults() {
        let json = r#"{
            "rules": [
                { "min_level": "Warning", "targets": ["errors", "console"] }
            ],
            "backends": [
                { "type": "console", "key": "console" },
                { "type": "file", "key": "errors", "folder": "/var/log/app" }
            ]
        }"#;
        let config: BrokerConfig = serde_json::from_str(json).expect("valid config");
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].min_level, Level::Warning);
        assert_eq!(config.rules[0].max_level, Level::Assert);
        assert_eq!(config.backends.len(), 2);

        let BackendConfig::File(file) = &config.backends[1] else {
            panic!("expected a file backend");
        };
        assert_eq!(file.size, 10 * MEGABYTE);
        assert_eq!(file.count, 10);
        assert_eq!(file.file_name(), "logger-errors");
    }

    #[test]
    fn substitute_replaces_known_variables_only() {
        let mut config = BrokerConfig {
            rules: vec![{
                let mut rule = RuleConfig::new(Level::Verbose, Level::Assert, vec![]);
                rule.tag_pattern = Some("${app}-.*".into());
                rule
            }],
            backends: vec![BackendConfig::File(FileConfig::new(
                "file-${app}",
                "${root}/logs/${missing}",
            ))],
        };
        let params = HashMap::from([
            ("app".to_string(), "shop".to_string()),
            ("root".to_string(), "/srv".to_string()),
        ]);
        config.substitute(&params);

        assert_eq!(config.rules[0].tag_pattern.as_deref(), Some("shop-.*"));
        let BackendConfig::File(file) = &config.backends[0] else {
            panic!("expected a file backend");
        };
        assert_eq!(file.key, "file-shop");
        assert_eq!(file.folder, "/srv/logs/${missing}");
    }

    #[test]
    fn file_validation_names_the_offending_key() {
        let mut config = FileConfig::new("errors", "");
        assert!(matches!(
            BackendConfig::File(config.clone()).validate(),
            Err(ConfigError::MissingField { field: "folder", .. })
        ));

        config.folder = "/var/log".into();
        config.size = 1024;
        let error = BackendConfig::File(config.clone()).validate().unwrap_err();
        assert!(error.to_string().contains("errors"));
        assert!(error.to_string().contains(">= 1 MB"));

        config.size = 2 * MEGABYTE;
        config.count = 2;
        let error = BackendConfig::File(config).validate().unwrap_err();
        assert!(error.to_string().contains(">= 3"));
    }

    #[test]
    fn bad_pattern_names_rule_index_and_field() {
        let mut rule = RuleConfig::new(Level::Verbose, Level::Assert, vec!["x".into()]);
        rule.thread_pattern = Some("(unclosed".into());
        let error = rule.compile(3).unwrap_err();
        let rendered = error.to_string();
        assert!(rendered.contains("rule 3"), "got: {rendered}");
        assert!(rendered.contains("thread"), "got: {rendered}");
    }
}
