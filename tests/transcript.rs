// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use chrono::Utc;
use descant::transcript::{fallback_username, TranscriptEntry, TranscriptStore};
use descant::types::Snowflake;

fn entry(user_id: &str, username: &str, text: &str) -> TranscriptEntry {
    TranscriptEntry {
        user_id: user_id.to_string(),
        username: username.to_string(),
        text: text.to_string(),
        timestamp: Utc::now(),
        guild_id: Some(Snowflake(848582562217590824)),
        channel_id: Some(Snowflake(848582562217590825)),
        words: None,
    }
}

#[tokio::test]
async fn test_append_order_and_mirror() {
    let dir = std::env::temp_dir().join("descant_it_transcript");
    let mut store = TranscriptStore::new(&dir);

    store
        .append(entry("1", "muffin", "good morning everyone"))
        .await;
    store.append(entry("2", "barnaby", "morning")).await;

    // Order is insertion order
    let all = store.tail(None);
    assert_eq!(all[0].text, "good morning everyone");
    assert_eq!(all[1].text, "morning");

    // The mirror holds the same entries and the user map
    let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["transcriptions"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["user_map"]["1"], "muffin");
    assert_eq!(parsed["user_map"]["2"], "barnaby");
    assert_eq!(
        parsed["transcriptions"][0]["guild_id"],
        "848582562217590824"
    );

    tokio::fs::remove_dir_all(&dir).await.ok();
}

#[tokio::test]
async fn test_placeholder_speakers_get_fallback_names() {
    let dir = std::env::temp_dir().join("descant_it_transcript_placeholder");
    let mut store = TranscriptStore::new(&dir);

    let speaker_id = "ssrc:93810";
    store
        .append(entry(speaker_id, &fallback_username(speaker_id), "hello"))
        .await;

    let all = store.tail(None);
    assert_eq!(all[0].username, "User_3810");

    tokio::fs::remove_dir_all(&dir).await.ok();
}
