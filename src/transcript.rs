// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The append-only transcript of everything said in the channel.
//!
//! The in-memory list is authoritative; a JSON file mirrors it and is
//! rewritten atomically after each append. Disk failures are logged and do
//! not reject the append.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::types::Snowflake;

/// One transcribed utterance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptEntry {
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// Word-level timing from the transcription provider, kept in memory
    /// only; the mirror file stores the flat text.
    #[serde(skip)]
    pub words: Option<Vec<WordInterval>>,
}

/// One word and where it sits inside the utterance audio, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordInterval {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// The on-disk shape of a transcript session file.
#[derive(Debug, Serialize)]
struct TranscriptFile<'a> {
    created_at: DateTime<Utc>,
    transcriptions: &'a [TranscriptEntry],
    user_map: &'a HashMap<String, String>,
}

/// The display name used when a speaker's real name never became known.
pub fn fallback_username(user_id: &str) -> String {
    let start = user_id.len().saturating_sub(4);
    format!("User_{}", &user_id[start..])
}

/// Append-only transcript store with a durable JSON mirror.
#[derive(Debug)]
pub struct TranscriptStore {
    created_at: DateTime<Utc>,
    entries: Vec<TranscriptEntry>,
    user_map: HashMap<String, String>,
    path: PathBuf,
}

impl TranscriptStore {
    /// Creates an empty store mirroring to a fresh file under
    /// `transcript_dir`, named after the creation timestamp.
    pub fn new(transcript_dir: &Path) -> Self {
        let created_at = Utc::now();
        let path = transcript_dir.join(format!(
            "transcript_{}.json",
            created_at.format("%Y%m%d_%H%M%S")
        ));

        Self {
            created_at,
            entries: Vec::new(),
            user_map: HashMap::new(),
            path,
        }
    }

    /// Appends one entry and rewrites the mirror file.
    ///
    /// Never fails: the in-memory list always takes the entry, and a failed
    /// disk write only logs.
    pub async fn append(&mut self, entry: TranscriptEntry) {
        self.user_map
            .insert(entry.user_id.clone(), entry.username.clone());
        self.entries.push(entry);

        if let Err(e) = self.persist().await {
            warn!("Could not mirror transcript to {:?}: {}", self.path, e);
        }
    }

    /// A snapshot of the last `limit` entries, or all of them.
    pub fn tail(&self, limit: Option<usize>) -> Vec<TranscriptEntry> {
        let start = match limit {
            Some(limit) => self.entries.len().saturating_sub(limit),
            None => 0,
        };
        self.entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Where the mirror file lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the whole store to a temp file and renames it over the mirror.
    async fn persist(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = TranscriptFile {
            created_at: self.created_at,
            transcriptions: &self.entries,
            user_map: &self.user_map,
        };

        let json = serde_json::to_vec_pretty(&file)?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod transcript {
    use super::*;

    fn entry(user_id: &str, text: &str) -> TranscriptEntry {
        TranscriptEntry {
            user_id: user_id.to_string(),
            username: fallback_username(user_id),
            text: text.to_string(),
            timestamp: Utc::now(),
            guild_id: None,
            channel_id: None,
            words: None,
        }
    }

    #[test]
    fn test_fallback_username() {
        assert_eq!(fallback_username("107118578684101632"), "User_1632");
        assert_eq!(fallback_username("42"), "User_42");
    }

    #[tokio::test]
    async fn test_append_and_tail() {
        let dir = std::env::temp_dir().join("descant_transcript_test_tail");
        let mut store = TranscriptStore::new(&dir);

        store.append(entry("1001", "first")).await;
        store.append(entry("1002", "second")).await;
        store.append(entry("1001", "third")).await;

        assert_eq!(store.len(), 3);
        let last_two = store.tail(Some(2));
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].text, "second");
        assert_eq!(last_two[1].text, "third");
        assert_eq!(store.tail(None).len(), 3);
        assert_eq!(store.tail(Some(100)).len(), 3);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_mirror_file_shape() {
        let dir = std::env::temp_dir().join("descant_transcript_test_mirror");
        let mut store = TranscriptStore::new(&dir);

        store.append(entry("9876543210", "hello there")).await;

        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(parsed.get("created_at").is_some());
        assert_eq!(parsed["transcriptions"][0]["text"], "hello there");
        assert_eq!(parsed["user_map"]["9876543210"], "User_3210");
        // No temp file left behind
        assert!(!store.path().with_extension("json.tmp").exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
