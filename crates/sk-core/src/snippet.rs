use crate::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnippetEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

impl SnippetEntry {
    pub fn tag_line(&self) -> String {
        format!("{} • {}", self.language, self.tags.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnippetMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnippetDetail {
    #[serde(default)]
    pub meta: SnippetMeta,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnippetKey {
    pub language: String,
    pub name: String,
}

impl SnippetKey {
    /// Language comes from the entry, the name from the second segment of
    /// `path` (`"python/structured-output"` → `structured-output`).
    pub fn from_entry(entry: &SnippetEntry) -> Result<Self, CoreError> {
        let name = entry
            .path
            .split('/')
            .nth(1)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| CoreError::InvalidSnippetPath(entry.path.clone()))?;
        Ok(Self {
            language: entry.language.clone(),
            name: name.to_string(),
        })
    }
}

/// Catalog list plus the one detail currently shown. Nothing is cached:
/// every selection issues a fresh fetch and only the latest one may land.
#[derive(Debug, Clone, Default)]
pub struct SnippetBrowser {
    entries: Option<Vec<SnippetEntry>>,
    selected: usize,
    pending: Option<SnippetKey>,
    detail: Option<SnippetDetail>,
    error: Option<String>,
}

impl SnippetBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    pub fn entries(&self) -> &[SnippetEntry] {
        self.entries.as_deref().unwrap_or_default()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn detail(&self) -> Option<&SnippetDetail> {
        self.detail.as_ref()
    }

    pub fn pending(&self) -> Option<&SnippetKey> {
        self.pending.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn apply_entries(&mut self, result: Result<Vec<SnippetEntry>, String>) {
        match result {
            Ok(entries) => {
                if self.selected >= entries.len() {
                    self.selected = entries.len().saturating_sub(1);
                }
                self.entries = Some(entries);
                self.error = None;
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.entries().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + delta).clamp(0, len as isize - 1);
        self.selected = next as usize;
    }

    /// Key for the detail fetch of the highlighted entry.
    pub fn open_selected(&mut self) -> Option<Result<SnippetKey, CoreError>> {
        let entry = self.entries().get(self.selected)?;
        let result = SnippetKey::from_entry(entry);
        match &result {
            Ok(key) => {
                self.pending = Some(key.clone());
                self.error = None;
            }
            Err(err) => {
                self.pending = None;
                self.error = Some(err.to_string());
            }
        }
        Some(result)
    }

    /// Returns false when `key` is no longer the latest requested detail.
    pub fn apply_detail(&mut self, key: &SnippetKey, result: Result<SnippetDetail, String>) -> bool {
        if self.pending.as_ref() != Some(key) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(detail) => {
                self.detail = Some(detail);
                self.error = None;
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
        true
    }
}
