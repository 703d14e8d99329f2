//! Saved UI panel scripts

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A named panel script kept by the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPanel {
    pub id: String,
    pub name: String,
    /// Lua source of the panel
    pub code: String,
    /// Milliseconds since the Unix epoch
    pub created_at: u64,
}

impl SavedPanel {
    /// New panel stamped with the current time
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let name = name.into();
        let created_at = now_millis();
        Self {
            id: panel_id(&name, created_at),
            name,
            code: code.into(),
            created_at,
        }
    }
}

/// Storage for saved panels
pub trait PanelStore {
    /// Insert or replace a panel by id
    fn save(&mut self, panel: SavedPanel) -> Result<()>;

    /// All panels, oldest first
    fn list(&self) -> Result<Vec<SavedPanel>>;

    fn get(&self, id: &str) -> Result<Option<SavedPanel>>;

    /// Remove a panel; returns whether it existed
    fn delete(&mut self, id: &str) -> Result<bool>;
}

/// Panel id of the form `panel-<slug>-<millis>`
pub fn panel_id(name: &str, created_at: u64) -> String {
    format!("panel-{}-{}", slug(name), created_at)
}

/// Lowercase ASCII alphanumerics with single dashes between words
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("untitled");
    }
    out
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// In-memory [`PanelStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryPanelStore {
    panels: BTreeMap<String, SavedPanel>,
}

impl MemoryPanelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PanelStore for MemoryPanelStore {
    fn save(&mut self, panel: SavedPanel) -> Result<()> {
        self.panels.insert(panel.id.clone(), panel);
        Ok(())
    }

    fn list(&self) -> Result<Vec<SavedPanel>> {
        let mut panels: Vec<_> = self.panels.values().cloned().collect();
        panels.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(panels)
    }

    fn get(&self, id: &str) -> Result<Option<SavedPanel>> {
        Ok(self.panels.get(id).cloned())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        Ok(self.panels.remove(id).is_some())
    }
}
