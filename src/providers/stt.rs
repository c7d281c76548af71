// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use log::*;
use serde::Deserialize;

use crate::errors::ProviderError;
use crate::transcript::WordInterval;

/// The provider model used for transcription.
const STT_MODEL_ID: &str = "scribe_v1";

/// The result of one transcription call.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub words: Option<Vec<WordInterval>>,
}

#[derive(Debug, Deserialize)]
struct SttResponse {
    text: String,
    #[serde(default)]
    words: Option<Vec<SttWord>>,
}

#[derive(Debug, Deserialize)]
struct SttWord {
    text: String,
    start: f64,
    end: f64,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Client for the speech-to-text side of the speech provider.
///
/// Takes raw pcm, ships it as a wav file with word timestamps requested and
/// diarization off (speakers are already separated by ssrc upstream).
#[derive(Debug, Clone)]
pub struct SttClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SttClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Transcribes one utterance of 48 kHz s16le stereo pcm.
    pub async fn transcribe(&self, pcm: Vec<u8>) -> Result<Transcription, ProviderError> {
        let url = format!("{}/v1/speech-to-text", self.base_url);

        let wav = wav_from_pcm(&pcm);

        debug!("STT: Submitting {} bytes of audio", wav.len());

        let file_part = reqwest::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| ProviderError::RequestFailed {
                error: e.to_string(),
            })?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model_id", STT_MODEL_ID)
            .text("timestamps_granularity", "word")
            .text("diarize", "false");

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ReceivedErrorCode {
                error_code: status.as_u16(),
                error: body,
            });
        }

        let parsed: SttResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    error: e.to_string(),
                })?;

        let words = parsed.words.map(|words| {
            words
                .into_iter()
                // The provider interleaves spacing tokens with the words
                .filter(|word| word.kind.as_deref() != Some("spacing"))
                .map(|word| WordInterval {
                    text: word.text,
                    start: word.start,
                    end: word.end,
                })
                .collect()
        });

        Ok(Transcription {
            text: parsed.text,
            words,
        })
    }
}

/// Wraps raw 48 kHz s16le stereo pcm in a minimal wav container.
fn wav_from_pcm(pcm: &[u8]) -> Vec<u8> {
    const SAMPLE_RATE: u32 = 48_000;
    const CHANNELS: u16 = 2;
    const BITS_PER_SAMPLE: u16 = 16;

    let byte_rate = SAMPLE_RATE * CHANNELS as u32 * (BITS_PER_SAMPLE / 8) as u32;
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + pcm.len() as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[cfg(test)]
mod stt {
    use super::*;

    #[test]
    fn test_wav_header_layout() {
        let pcm = vec![0u8; 3840];
        let wav = wav_from_pcm(&pcm);

        assert_eq!(wav.len(), 44 + 3840);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 48 kHz
        assert_eq!(&wav[24..28], &48_000u32.to_le_bytes());
        // stereo
        assert_eq!(&wav[22..24], &2u16.to_le_bytes());
        // data length
        assert_eq!(&wav[40..44], &3840u32.to_le_bytes());
    }

    #[test]
    fn test_response_parsing_filters_spacing() {
        let raw = r#"{
            "text": "hello world",
            "words": [
                {"text": "hello", "start": 0.0, "end": 0.4, "type": "word"},
                {"text": " ", "start": 0.4, "end": 0.5, "type": "spacing"},
                {"text": "world", "start": 0.5, "end": 0.9, "type": "word"}
            ]
        }"#;

        let parsed: SttResponse = serde_json::from_str(raw).unwrap();
        let words: Vec<WordInterval> = parsed
            .words
            .unwrap()
            .into_iter()
            .filter(|word| word.kind.as_deref() != Some("spacing"))
            .map(|word| WordInterval {
                text: word.text,
                start: word.start,
                end: word.end,
            })
            .collect();

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "hello");
        assert_eq!(words[1].text, "world");
    }
}
