//! Configuration access port trait.
//!
//! Implementors only supply raw string lookup. The typed getters are strict:
//! an absent key falls back to the default, a present but malformed one is a
//! `ConfigInvalid` error.

use crate::domain::error::AtfError;
use chrono::NaiveDate;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn has_section(&self, section: &str) -> bool;

    /// Non-blank value of a key that must be present.
    fn require_string(&self, section: &str, key: &str) -> Result<String, AtfError> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AtfError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    }

    fn require_date(&self, section: &str, key: &str) -> Result<NaiveDate, AtfError> {
        let raw = self.require_string(section, key)?;
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            AtfError::invalid(section, key, "invalid date format (expected YYYY-MM-DD)")
        })
    }

    fn get_f64(&self, section: &str, key: &str, default: f64) -> Result<f64, AtfError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AtfError::invalid(section, key, format!("'{raw}' is not a number"))),
        }
    }

    fn get_usize(&self, section: &str, key: &str, default: usize) -> Result<usize, AtfError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                AtfError::invalid(section, key, format!("'{raw}' is not a non-negative integer"))
            }),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, AtfError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(AtfError::invalid(section, key, format!("'{raw}' is not a boolean"))),
            },
        }
    }

    /// Comma-separated list with blank entries dropped.
    fn get_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        self.get_string(section, key).map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}
