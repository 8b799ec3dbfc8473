use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Which task surface is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    All,
    Starred,
}

impl ViewMode {
    pub fn is_all(self) -> bool {
        self == ViewMode::All
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::All => write!(f, "all"),
            ViewMode::Starred => write!(f, "starred"),
        }
    }
}

/// Per-list shown/hidden flags, keyed by list id.
///
/// Entries may exist for lists that are gone and may be missing for lists
/// that exist; a missing entry reads as "visible under the all view".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityTracker {
    flags: IndexMap<String, bool>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        VisibilityTracker::default()
    }

    pub fn from_map(flags: IndexMap<String, bool>) -> Self {
        VisibilityTracker { flags }
    }

    /// Stored flag, or `true` iff `view` is the all view
    pub fn is_visible(&self, list_id: &str, view: ViewMode) -> bool {
        self.flags.get(list_id).copied().unwrap_or(view.is_all())
    }

    pub fn set_visible(&mut self, list_id: &str, visible: bool) {
        self.flags.insert(list_id.to_string(), visible);
    }

    /// Seed the flag for a just-created list: shown only if created from the all view
    pub fn set_initial_visibility(&mut self, list_id: &str, view: ViewMode) {
        self.set_visible(list_id, view.is_all());
    }

    /// Return the stored flag, inserting `default` first if absent
    pub fn ensure(&mut self, list_id: &str, default: bool) -> bool {
        *self.flags.entry(list_id.to_string()).or_insert(default)
    }

    pub fn remove(&mut self, list_id: &str) -> Option<bool> {
        self.flags.shift_remove(list_id)
    }

    pub fn contains(&self, list_id: &str) -> bool {
        self.flags.contains_key(list_id)
    }

    /// The full map, for rendering and persistence
    pub fn map(&self) -> &IndexMap<String, bool> {
        &self.flags
    }
}
