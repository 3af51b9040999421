//! Running map from section key to its first page in the merged PDF.

use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Error recording a page-map entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageMapError {
    #[error("section '{0}' is already in the page map")]
    DuplicateKey(String),
    #[error("section '{key}' starts at page {page}, before the previous section at page {previous}")]
    Decreasing { key: String, page: u32, previous: u32 },
}

/// Section key to 1-based starting page, in compile order.
///
/// Keys are never overwritten and values never decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageMap {
    entries: IndexMap<String, u32>,
}

impl PageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the starting page of a section.
    pub fn record(&mut self, key: &str, page: u32) -> Result<(), PageMapError> {
        if self.entries.contains_key(key) {
            return Err(PageMapError::DuplicateKey(key.to_string()));
        }
        if let Some((_, &previous)) = self.entries.last() {
            if page < previous {
                return Err(PageMapError::Decreasing { key: key.to_string(), page, previous });
            }
        }
        self.entries.insert(key.to_string(), page);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Serialize as a JSON object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }

    /// Write the JSON object to `path`.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_json())
    }
}

impl<'a> FromIterator<(&'a str, u32)> for PageMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, u32)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect() }
    }
}
