//! INI file configuration adapter.
//!
//! Values are cleaned before they reach the domain: surrounding
//! whitespace and trailing `;` or `#` comments are removed, and a key
//! left blank counts as unset. A value that is present but does not
//! parse as the requested type falls back to the default with a warning,
//! so a typo in `compression` or `starting_value` shows up in the log.

use crate::ports::config_port::ConfigPort;
use configparser::ini::{Ini, IniDefault};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
    origin: String,
}

/// Inline comments are stripped here rather than by the parser, which
/// would cut a value at any `;` or `#`.
fn parser() -> Ini {
    let mut defaults = IniDefault::default();
    defaults.enable_inline_comments = false;
    Ini::new_from_defaults(defaults)
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = parser();
        config.load(path.as_ref()).map_err(std::io::Error::other)?;
        Ok(Self {
            config,
            origin: path.as_ref().display().to_string(),
        })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = parser();
        config.read(content.to_string())?;
        Ok(Self {
            config,
            origin: "<string>".to_string(),
        })
    }

    /// Cleaned value of `key`, `None` when absent or blank.
    fn value(&self, section: &str, key: &str) -> Option<String> {
        let raw = self.config.get(section, key)?;
        let cleaned = strip_inline_comment(&raw).trim();
        (!cleaned.is_empty()).then(|| cleaned.to_string())
    }

    fn parsed<T: FromStr>(&self, section: &str, key: &str, kind: &str) -> Option<T> {
        let value = self.value(section, key)?;
        match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!(
                    origin = %self.origin,
                    section,
                    key,
                    value = %value,
                    "not a valid {kind}, using default"
                );
                None
            }
        }
    }
}

/// Drops a `;` or `#` comment that follows whitespace.
fn strip_inline_comment(raw: &str) -> &str {
    let mut prev_space = false;
    for (i, c) in raw.char_indices() {
        if prev_space && (c == ';' || c == '#') {
            return &raw[..i];
        }
        prev_space = c.is_whitespace();
    }
    raw
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
struct NotABool;

struct Flag(bool);

impl FromStr for Flag {
    type Err = NotABool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_bool(s).map(Flag).ok_or(NotABool)
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.parsed(section, key, "integer").unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.parsed(section, key, "number").unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.parsed::<Flag>(section, key, "boolean")
            .map_or(default, |Flag(b)| b)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
