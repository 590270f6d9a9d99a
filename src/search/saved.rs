//! Named queries, reusable as `@name` in other queries

use super::Query;
use crate::error::{BiletoError, Result};
use crate::storage::write_atomically;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const SEARCHES_FILE: &str = "searches.yaml";

/// Views available in every project
pub const BUILTIN_SEARCHES: &[(&str, &str)] = &[
    ("owned", "status:open assignee:@me"),
    ("unassigned", "status:open no:assignee"),
    ("involved", "status:open involves:@me"),
    ("all", ""),
];

static REFERENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[\s(])@([A-Za-z0-9_-]+)").expect("saved search reference pattern is valid")
});

/// A saved search definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub name: String,
    pub query: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Saved searches of a project
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SavedSearches {
    pub searches: BTreeMap<String, SavedSearch>,
}

impl SavedSearches {
    fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SEARCHES_FILE)
    }

    /// Load saved searches from the data directory, empty when none were saved
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            BiletoError::ParseError(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        write_atomically(&Self::path(data_dir), &serde_yaml::to_string(self)?)
    }

    fn is_builtin(name: &str) -> bool {
        BUILTIN_SEARCHES.iter().any(|(builtin, _)| *builtin == name)
    }

    /// Add a search after checking its name and query
    pub fn add(
        &mut self,
        name: &str,
        query: &str,
        description: Option<String>,
    ) -> Result<&SavedSearch> {
        let name = name.trim().trim_start_matches('@').to_lowercase();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(BiletoError::InvalidInput(format!(
                "Invalid search name '{name}'. Use letters, digits, '-' and '_'"
            )));
        }
        if Self::is_builtin(&name) || self.searches.contains_key(&name) {
            return Err(BiletoError::AlreadyExists {
                kind: "Saved search",
                name,
            });
        }

        // Fails early on syntax errors and unknown references
        Query::parse(&self.expand(query)?)?;

        let search = SavedSearch {
            name: name.clone(),
            query: query.trim().to_string(),
            description,
            created_at: Utc::now(),
        };
        Ok(self.searches.entry(name).or_insert(search))
    }

    /// Remove a search by name
    pub fn remove(&mut self, name: &str) -> Result<SavedSearch> {
        let name = name.trim_start_matches('@');
        if Self::is_builtin(name) {
            return Err(BiletoError::InvalidInput(format!(
                "'{name}' is a built-in search and cannot be deleted"
            )));
        }
        self.searches
            .remove(name)
            .ok_or_else(|| BiletoError::not_found("Saved search", name))
    }

    /// The query of a saved or built-in search
    pub fn get(&self, name: &str) -> Option<&str> {
        self.searches.get(name).map(|s| s.query.as_str()).or_else(|| {
            BUILTIN_SEARCHES
                .iter()
                .find(|(builtin, _)| *builtin == name)
                .map(|(_, query)| *query)
        })
    }

    /// Replace every `@name` in the query by the referenced query, in parentheses
    ///
    /// `@me` is left alone. References inside saved queries are not expanded
    /// again.
    pub fn expand(&self, query: &str) -> Result<String> {
        let mut unknown = None;
        let expanded = REFERENCE_PATTERN.replace_all(query, |caps: &Captures<'_>| {
            let prefix = &caps[1];
            let name = caps[2].to_lowercase();
            if name == "me" {
                return caps[0].to_string();
            }
            match self.get(&name) {
                Some("") => prefix.to_string(),
                Some(saved) => format!("{prefix}({saved})"),
                None => {
                    unknown.get_or_insert(name);
                    caps[0].to_string()
                },
            }
        });

        match unknown {
            Some(name) => Err(BiletoError::not_found("Saved search", format!("@{name}"))),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Built-in and saved searches as `(name, query, is_builtin)`
    pub fn all(&self) -> Vec<(&str, &str, bool)> {
        BUILTIN_SEARCHES
            .iter()
            .map(|(name, query)| (*name, *query, true))
            .chain(
                self.searches
                    .values()
                    .map(|s| (s.name.as_str(), s.query.as_str(), false)),
            )
            .collect()
    }
}
