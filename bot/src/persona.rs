use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{completion::ChatMessage, constants::DEFAULT_PERSONA};

/// Per-guild persona lines. Each line becomes one system-role prompt segment;
/// guilds without an entry (and direct messages) get the hard-coded default.
#[derive(Clone, Default)]
pub struct PersonaStore {
    entries: Arc<Mutex<HashMap<u64, Vec<String>>>>,
}

impl PersonaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line to the guild's persona, returning the new line count.
    pub async fn append(&self, guild_id: u64, line: impl Into<String>) -> usize {
        let mut entries = self.entries.lock().await;
        let lines = entries.entry(guild_id).or_default();
        lines.push(line.into());
        lines.len()
    }

    pub async fn lines(&self, guild_id: u64) -> Option<Vec<String>> {
        self.entries.lock().await.get(&guild_id).cloned()
    }

    /// Replace the guild's persona wholesale.
    pub async fn replace(&self, guild_id: u64, lines: Vec<String>) {
        self.entries.lock().await.insert(guild_id, lines);
    }

    /// Remove the guild's persona so the default applies again. Returns
    /// whether anything was configured.
    pub async fn clear(&self, guild_id: u64) -> bool {
        self.entries.lock().await.remove(&guild_id).is_some()
    }

    /// System messages opening the prompt for a guild. Falls back to the
    /// default persona when the guild (or a direct message, `None`) has
    /// nothing configured.
    pub async fn system_messages(&self, guild_id: Option<u64>) -> Vec<ChatMessage> {
        if let Some(guild_id) = guild_id {
            if let Some(lines) = self.entries.lock().await.get(&guild_id) {
                if !lines.is_empty() {
                    return lines
                        .iter()
                        .map(|line| ChatMessage::system(line.as_str()))
                        .collect();
                }
            }
        }

        vec![ChatMessage::system(DEFAULT_PERSONA)]
    }
}
