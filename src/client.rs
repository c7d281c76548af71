// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The packaged voice client: one object tying the gateway connection, the
//! voice session machinery, the speech providers and the transcript store
//! together behind a small operation surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::*;
use tokio::sync::{mpsc, Mutex};

use crate::config::Config;
use crate::errors::{DescantResult, VoiceClientError};
use crate::gateway::{Gateway, GatewayHandle};
use crate::providers::{SttClient, TtsClient};
use crate::providers::transcode;
use crate::transcript::{fallback_username, TranscriptEntry, TranscriptStore};
use crate::types::{GatewayIdentifyPayload, Snowflake};
use crate::voice::handler::{CapturedUtterance, VoiceHandler};

/// How many captured utterances may wait for transcription.
const UTTERANCE_CHANNEL_CAPACITY: usize = 32;

/// What [VoiceClient::get_voice_status] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStatus {
    pub in_voice: bool,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub speaker_count: usize,
    pub transcription_enabled: bool,
}

/// A Discord voice client: joins one voice channel at a time, plays
/// synthesized speech into it and transcribes the other speakers.
#[derive(Debug, Clone)]
pub struct VoiceClient {
    config: Config,
    pub gateway: GatewayHandle,
    pub handler: Arc<VoiceHandler>,
    transcript: Arc<Mutex<TranscriptStore>>,
    transcription_enabled: Arc<AtomicBool>,
    tts: Option<TtsClient>,
}

impl VoiceClient {
    /// Connects and identifies to the gateway, wires the voice handler up
    /// and starts the transcription worker.
    ///
    /// Transcription starts enabled when the provider credential is
    /// configured, otherwise it stays off and only playback-free listening
    /// works.
    pub async fn connect(
        gateway_url: &str,
        token: &str,
        config: Config,
    ) -> DescantResult<Self> {
        let gateway =
            Gateway::spawn(gateway_url)
                .await
                .map_err(|e| VoiceClientError::ConnectionFailed {
                    error: e.to_string(),
                })?;

        let mut identify = GatewayIdentifyPayload::common();
        identify.token = token.to_string();
        gateway.send_identify(identify).await;

        let (utterance_send, utterance_receive) = mpsc::channel(UTTERANCE_CHANNEL_CAPACITY);

        let handler = Arc::new(VoiceHandler::new(
            gateway.clone(),
            utterance_send,
            Duration::from_millis(config.silence_flush_ms),
            Duration::from_millis(config.utterance_max_ms),
        ));
        handler.subscribe_to_gateway().await;

        let transcript = Arc::new(Mutex::new(TranscriptStore::new(&config.transcript_dir)));

        let stt = config
            .session_key_provider_api_key
            .as_ref()
            .map(|key| SttClient::new(config.provider_base_url.clone(), key.clone()));
        let tts = config
            .session_key_provider_api_key
            .as_ref()
            .map(|key| TtsClient::new(config.provider_base_url.clone(), key.clone()));

        let transcription_enabled = Arc::new(AtomicBool::new(stt.is_some()));

        tokio::spawn(transcription_task(
            utterance_receive,
            stt,
            transcript.clone(),
            transcription_enabled.clone(),
        ));

        Ok(Self {
            config,
            gateway,
            handler,
            transcript,
            transcription_enabled,
            tts,
        })
    }

    /// Joins a voice channel; resolves once audio can flow both ways.
    pub async fn join_voice(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> DescantResult<()> {
        self.handler.join_voice(guild_id, channel_id).await
    }

    /// Leaves the current voice channel, flushing pending utterances.
    pub async fn leave_voice(&self) -> DescantResult<()> {
        self.handler.leave_voice().await
    }

    /// Plays encoded audio (mp3, wav, ogg..) into the channel; the input is
    /// transcoded to the pipeline's pcm format first.
    pub async fn play_audio(&self, audio: Vec<u8>) -> DescantResult<()> {
        let pcm = transcode::to_pcm_s16le_48k_stereo(audio)
            .await
            .map_err(|e| VoiceClientError::TransportError {
                error: e.to_string(),
            })?;

        self.handler.play_pcm(pcm).await
    }

    /// Plays raw 48 kHz s16le stereo pcm into the channel.
    pub async fn play_pcm(&self, pcm: Vec<u8>) -> DescantResult<()> {
        self.handler.play_pcm(pcm).await
    }

    /// Synthesizes `text` with the configured voice and plays it.
    pub async fn say(&self, text: &str) -> DescantResult<()> {
        let Some(tts) = &self.tts else {
            return Err(VoiceClientError::NotConfigured {
                missing: "session_key_provider_api_key".to_string(),
            });
        };
        let Some(voice_id) = &self.config.preferred_voice_id else {
            return Err(VoiceClientError::NotConfigured {
                missing: "preferred_voice_id".to_string(),
            });
        };

        let audio = tts
            .synthesize(text, voice_id)
            .await
            .map_err(|e| VoiceClientError::TransportError {
                error: e.to_string(),
            })?;

        self.play_audio(audio).await
    }

    /// Turns transcription on or off. Enabling it without a configured
    /// provider credential has no effect beyond the flag.
    pub fn set_transcription(&self, enabled: bool) {
        self.transcription_enabled.store(enabled, Ordering::Relaxed);
        info!(
            "Transcription {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// The last `limit` transcript entries, oldest first; all of them
    /// without a limit.
    pub async fn get_transcript(&self, limit: Option<usize>) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.tail(limit)
    }

    /// A snapshot of the session state.
    pub async fn get_voice_status(&self) -> VoiceStatus {
        let session = self.handler.status().await;

        VoiceStatus {
            in_voice: session.in_voice,
            guild_id: session.guild_id,
            channel_id: session.channel_id,
            speaker_count: session.speaker_count,
            transcription_enabled: self.transcription_enabled.load(Ordering::Relaxed),
        }
    }
}

/// The transcription worker: submits flushed utterances to the provider and
/// appends results to the transcript.
///
/// Provider failures drop the utterance with a warning; the voice session
/// never notices them.
async fn transcription_task(
    mut utterances: mpsc::Receiver<CapturedUtterance>,
    stt: Option<SttClient>,
    transcript: Arc<Mutex<TranscriptStore>>,
    enabled: Arc<AtomicBool>,
) {
    while let Some(utterance) = utterances.recv().await {
        if !enabled.load(Ordering::Relaxed) {
            continue;
        }

        let Some(stt) = &stt else {
            continue;
        };

        let transcription = match stt.transcribe(utterance.pcm).await {
            Ok(transcription) => transcription,
            Err(e) => {
                warn!("STT: Dropping one utterance, transcription failed: {}", e);
                continue;
            }
        };

        if transcription.text.trim().is_empty() {
            debug!("STT: Provider heard nothing, skipping transcript entry");
            continue;
        }

        let username = utterance
            .display_name
            .clone()
            .unwrap_or_else(|| fallback_username(&utterance.speaker_id));

        let entry = TranscriptEntry {
            user_id: utterance.speaker_id,
            username,
            text: transcription.text,
            timestamp: utterance.ended_at,
            guild_id: utterance.guild_id,
            channel_id: utterance.channel_id,
            words: transcription.words,
        };

        transcript.lock().await.append(entry).await;
    }

    trace!("Transcription task finished");
}
