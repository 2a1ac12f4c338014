//! Typed section/key lookups over the parsed configuration document

use super::loader::{ConfigError, Result};
use super::types::GlobalSettings;

/// Declared type of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Float,
    Integer,
    String,
}

impl ValueType {
    /// Parse a declared type name. Unrecognized names fall back to `String`.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "boolean" | "bool" => ValueType::Boolean,
            "float" => ValueType::Float,
            "int" | "integer" => ValueType::Integer,
            _ => ValueType::String,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            ValueType::Boolean => "a boolean",
            ValueType::Float => "a float",
            ValueType::Integer => "an integer",
            ValueType::String => "a string",
        }
    }
}

/// A configuration value converted to its declared type
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Boolean(bool),
    Float(f64),
    Integer(i64),
    String(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Read-only access to a section/key configuration space.
///
/// A missing section and a missing key both yield `Ok(None)`: callers treat
/// absence as "use the default or skip the feature". Only a value that is
/// present but cannot be converted to the requested type is an error.
pub trait ConfigLookup: Send + Sync {
    /// Look up `key` in `section`, converted to `value_type`
    fn get(&self, section: &str, key: &str, value_type: ValueType) -> Result<Option<ConfigValue>>;

    /// Names of the tables nested directly in `section`
    fn subsections(&self, section: &str) -> Vec<String>;

    /// Settings from the `[global]` section
    fn global(&self) -> &GlobalSettings;

    fn get_string(&self, section: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(section, key, ValueType::String)?
            .and_then(ConfigValue::into_string))
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>> {
        Ok(self
            .get(section, key, ValueType::Integer)?
            .and_then(|v| v.as_int()))
    }

    fn get_float(&self, section: &str, key: &str) -> Result<Option<f64>> {
        Ok(self
            .get(section, key, ValueType::Float)?
            .and_then(|v| v.as_float()))
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        Ok(self
            .get(section, key, ValueType::Boolean)?
            .and_then(|v| v.as_bool()))
    }
}

/// Configuration backed by a parsed TOML document
#[derive(Debug, Clone)]
pub struct TomlConfig {
    table: toml::Table,
    global: GlobalSettings,
}

impl TomlConfig {
    pub(crate) fn new(table: toml::Table, global: GlobalSettings) -> Self {
        Self { table, global }
    }

    /// Raw access to the parsed document
    pub fn table(&self) -> &toml::Table {
        &self.table
    }

    /// Find a section table. A literal top-level key wins; otherwise the name
    /// is treated as a dotted path (`database.db1`) whose segments may be
    /// quoted (`database."prod.eu"`).
    fn section(&self, section: &str) -> Option<&toml::Table> {
        if let Some(toml::Value::Table(t)) = self.table.get(section) {
            return Some(t);
        }

        let mut current = &self.table;
        for part in section_path(section) {
            match current.get(part) {
                Some(toml::Value::Table(t)) => current = t,
                _ => return None,
            }
        }
        Some(current)
    }
}

impl ConfigLookup for TomlConfig {
    fn get(&self, section: &str, key: &str, value_type: ValueType) -> Result<Option<ConfigValue>> {
        let Some(value) = self.section(section).and_then(|t| t.get(key)) else {
            return Ok(None);
        };

        convert(value, value_type)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                expected: value_type.expected(),
            })
    }

    fn subsections(&self, section: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .section(section)
            .map(|t| {
                t.iter()
                    .filter(|(_, v)| v.is_table())
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    fn global(&self) -> &GlobalSettings {
        &self.global
    }
}

/// Split a section name at the dots outside double quotes
fn section_path(section: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = section;

    loop {
        let (part, tail) = match rest.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((part, tail)) => (part, tail.strip_prefix('.')),
                None => (quoted, None),
            },
            None => match rest.split_once('.') {
                Some((part, tail)) => (part, Some(tail)),
                None => (rest, None),
            },
        };
        parts.push(part);

        match tail {
            Some(tail) => rest = tail,
            None => return parts,
        }
    }
}

fn convert(value: &toml::Value, value_type: ValueType) -> Option<ConfigValue> {
    use toml::Value;

    match value_type {
        ValueType::Boolean => match value {
            Value::Boolean(b) => Some(ConfigValue::Boolean(*b)),
            Value::Integer(1) => Some(ConfigValue::Boolean(true)),
            Value::Integer(0) => Some(ConfigValue::Boolean(false)),
            Value::String(s) => parse_bool(s).map(ConfigValue::Boolean),
            _ => None,
        },
        ValueType::Integer => match value {
            Value::Integer(i) => Some(ConfigValue::Integer(*i)),
            Value::String(s) => s.trim().parse().ok().map(ConfigValue::Integer),
            _ => None,
        },
        ValueType::Float => match value {
            Value::Float(f) => Some(ConfigValue::Float(*f)),
            Value::Integer(i) => Some(ConfigValue::Float(*i as f64)),
            Value::String(s) => s.trim().parse().ok().map(ConfigValue::Float),
            _ => None,
        },
        ValueType::String => match value {
            Value::String(s) => Some(ConfigValue::String(s.clone())),
            Value::Integer(i) => Some(ConfigValue::String(i.to_string())),
            Value::Float(f) => Some(ConfigValue::String(f.to_string())),
            Value::Boolean(b) => Some(ConfigValue::String(b.to_string())),
            Value::Datetime(d) => Some(ConfigValue::String(d.to_string())),
            Value::Array(_) | Value::Table(_) => None,
        },
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}
