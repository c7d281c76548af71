// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runtime configuration, read once from the environment.

use std::path::PathBuf;

use log::LevelFilter;

/// Configuration of a [crate::client::VoiceClient].
///
/// Every option has a usable default except the provider credentials: without
/// `SESSION_KEY_PROVIDER_API_KEY` transcription stays disabled, and without
/// `PREFERRED_VOICE_ID` playback of text fails with `NotConfigured`. Joining
/// a channel and receiving audio work either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Credential for the speech provider (TTS and STT).
    pub session_key_provider_api_key: Option<String>,
    /// Which provider voice to synthesize speech with.
    pub preferred_voice_id: Option<String>,
    /// Maximum level the library logs at.
    pub log_level: LevelFilter,
    /// Where transcript JSON files are written.
    pub transcript_dir: PathBuf,
    /// How long a speaker has to stay silent before their utterance is flushed.
    pub silence_flush_ms: u64,
    /// Hard cap on the duration of a single utterance.
    pub utterance_max_ms: u64,
    /// Base url of the speech provider.
    pub provider_base_url: String,
}

pub const DEFAULT_SILENCE_FLUSH_MS: u64 = 2000;
pub const DEFAULT_UTTERANCE_MAX_MS: u64 = 10_000;
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.elevenlabs.io";

impl Default for Config {
    fn default() -> Self {
        Self {
            session_key_provider_api_key: None,
            preferred_voice_id: None,
            log_level: LevelFilter::Info,
            transcript_dir: PathBuf::from("./transcripts"),
            silence_flush_ms: DEFAULT_SILENCE_FLUSH_MS,
            utterance_max_ms: DEFAULT_UTTERANCE_MAX_MS,
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Builds a config from the process environment.
    ///
    /// Unset variables fall back to their defaults; values that fail to parse
    /// are logged and ignored rather than treated as fatal.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        config.session_key_provider_api_key = non_empty(env("SESSION_KEY_PROVIDER_API_KEY"));
        config.preferred_voice_id = non_empty(env("PREFERRED_VOICE_ID"));

        if let Some(level) = env("LOG_LEVEL") {
            match parse_log_level(&level) {
                Some(parsed) => config.log_level = parsed,
                None => log::warn!("Unrecognized LOG_LEVEL {:?}, keeping default", level),
            }
        }

        if let Some(dir) = non_empty(env("TRANSCRIPT_DIR")) {
            config.transcript_dir = PathBuf::from(dir);
        }

        if let Some(ms) = env("SILENCE_FLUSH_MS") {
            match ms.parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.silence_flush_ms = parsed,
                _ => log::warn!("Unparseable SILENCE_FLUSH_MS {:?}, keeping default", ms),
            }
        }

        if let Some(ms) = env("UTTERANCE_MAX_MS") {
            match ms.parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.utterance_max_ms = parsed,
                _ => log::warn!("Unparseable UTTERANCE_MAX_MS {:?}, keeping default", ms),
            }
        }

        if let Some(url) = non_empty(env("PROVIDER_BASE_URL")) {
            config.provider_base_url = url.trim_end_matches('/').to_string();
        }

        config
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_lowercase().as_str() {
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        _ => None,
    }
}

#[cfg(test)]
mod config {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(parse_log_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_log_level("WARN"), Some(LevelFilter::Warn));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.silence_flush_ms, 2000);
        assert_eq!(config.utterance_max_ms, 10_000);
        assert_eq!(config.transcript_dir, PathBuf::from("./transcripts"));
        assert!(config.session_key_provider_api_key.is_none());
    }
}
