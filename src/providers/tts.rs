// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use log::*;
use serde_json::json;

use crate::errors::ProviderError;

/// Client for the text-to-speech side of the speech provider.
///
/// The endpoint is treated as opaque: text and a voice id go in, an encoded
/// audio stream comes out. Decoding to pcm is the encode pipeline's job.
#[derive(Debug, Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TtsClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Synthesizes `text` with the given provider voice, returning the raw
    /// encoded audio bytes.
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);

        debug!("TTS: Requesting synthesis of {} chars", text.len());

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&json!({ "text": text }))
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

        let audio = response.bytes().await?;

        debug!("TTS: Received {} bytes of audio", audio.len());

        Ok(audio.to_vec())
    }
}
