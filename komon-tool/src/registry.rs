//! The static list of advisory clients (顧問先) the tools search.

use komon_core::{KomonError, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::path::Path;

/// Ordered list of client names with an exact-membership index.
///
/// Input order and duplicates are kept, so a name listed twice is found twice.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    names: Vec<String>,
    index: HashSet<String>,
}

impl ClientRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let index = names.iter().cloned().collect();
        Self { names, index }
    }

    /// Load a registry from disk.
    ///
    /// `.json` files hold an array of strings. Anything else is read as text
    /// with one name per line. Either way a leading BOM is dropped, names are
    /// trimmed, and blank entries or `#` comments are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            KomonError::Config(format!("cannot read client list {}: {}", path.display(), e))
        })?;
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw.as_str());

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let registry = if is_json {
            let names: Vec<String> = serde_json::from_str(raw).map_err(|e| {
                KomonError::Config(format!(
                    "client list {} is not a JSON string array: {}",
                    path.display(),
                    e
                ))
            })?;
            Self::new(names.iter().map(String::as_str).filter_map(listed_name))
        } else {
            Self::new(raw.lines().filter_map(listed_name))
        };

        tracing::info!(path = %path.display(), clients = registry.len(), "loaded client list");
        Ok(registry)
    }

    /// Every entry equal to `query`, byte for byte.
    pub fn exact_matches(&self, query: &str) -> Vec<String> {
        if !self.index.contains(query) {
            return Vec::new();
        }
        self.names.iter().filter(|name| name.as_str() == query).cloned().collect()
    }

    pub fn contains(&self, query: &str) -> bool {
        self.index.contains(query)
    }

    /// Uniformly random entry, `None` when empty.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.names.choose(rng).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// A usable client name from one list entry, or `None` for blanks and comments.
fn listed_name(entry: &str) -> Option<&str> {
    let name = entry.trim();
    (!name.is_empty() && !name.starts_with('#')).then_some(name)
}
