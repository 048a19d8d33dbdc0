//! Dashboard UI preferences.
//!
//! Preferences are stored as JSON strings under fixed keys in a [`PreferenceStore`]. The
//! default store keeps them in process memory; a persistent backing only has to implement
//! the trait. Values that no longer parse fall back to defaults instead of failing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const SELECTED_REPOS_KEY: &str = "selectedRepos";
const NOTIFICATIONS_KEY: &str = "notifications";

/// A string key/value store.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

#[derive(Default)]
pub struct InMemoryPreferenceStore {
    values: RwLock<HashMap<String, String>>,
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut values = self.values.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key.to_string(), value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub pr_reviews: bool,
    pub issues_assigned: bool,
    pub team_digest: bool,
    pub weekly_summary: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            pr_reviews: true,
            issues_assigned: true,
            team_digest: false,
            weekly_summary: true,
        }
    }
}

/// Everything the settings page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesSnapshot {
    /// Ids of the repositories the user selected for tracking.
    pub selected_repos: Vec<u64>,
    pub notifications: NotificationSettings,
}

/// Typed access to the preference store.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryPreferenceStore::default()))
    }

    pub fn selected_repos(&self) -> Vec<u64> {
        self.read(SELECTED_REPOS_KEY).unwrap_or_default()
    }

    /// Stores the selection, dropping duplicate ids but keeping the first-seen order.
    pub fn set_selected_repos(&self, mut repo_ids: Vec<u64>) -> serde_json::Result<()> {
        let mut seen = std::collections::HashSet::new();
        repo_ids.retain(|id| seen.insert(*id));
        self.write(SELECTED_REPOS_KEY, &repo_ids)
    }

    pub fn notifications(&self) -> NotificationSettings {
        self.read(NOTIFICATIONS_KEY).unwrap_or_default()
    }

    pub fn set_notifications(&self, settings: NotificationSettings) -> serde_json::Result<()> {
        self.write(NOTIFICATIONS_KEY, &settings)
    }

    pub fn snapshot(&self) -> PreferencesSnapshot {
        PreferencesSnapshot {
            selected_repos: self.selected_repos(),
            notifications: self.notifications(),
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unparseable stored preference");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> serde_json::Result<()> {
        self.store.set(key, serde_json::to_string(value)?);
        Ok(())
    }
}
