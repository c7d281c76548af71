// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Transcoding of arbitrary encoded audio (the tts output, caller supplied
//! files) to the 48 kHz s16le stereo pcm the voice pipeline speaks, via an
//! ffmpeg subprocess.

use std::process::Stdio;

use log::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::errors::AudioError;

/// Decodes and resamples `input` to raw 48 kHz s16le stereo pcm.
///
/// ffmpeg probes the container/codec itself, so mp3, wav, ogg and friends
/// all work without the caller declaring a format.
pub async fn to_pcm_s16le_48k_stereo(input: Vec<u8>) -> Result<Vec<u8>, AudioError> {
    let mut child = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "pipe:0",
            "-f",
            "s16le",
            "-ar",
            "48000",
            "-ac",
            "2",
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AudioError::TranscodeFailed {
            error: format!("could not spawn ffmpeg: {}", e),
        })?;

    let mut stdin = child.stdin.take().ok_or(AudioError::TranscodeFailed {
        error: "ffmpeg stdin unavailable".to_string(),
    })?;
    let mut stdout = child.stdout.take().ok_or(AudioError::TranscodeFailed {
        error: "ffmpeg stdout unavailable".to_string(),
    })?;
    let mut stderr = child.stderr.take().ok_or(AudioError::TranscodeFailed {
        error: "ffmpeg stderr unavailable".to_string(),
    })?;

    // Write and read concurrently; ffmpeg's pipes deadlock otherwise once
    // its output buffer fills
    let writer = tokio::spawn(async move {
        let result = stdin.write_all(&input).await;
        drop(stdin);
        result
    });

    let mut pcm = Vec::new();
    let read_result = stdout.read_to_end(&mut pcm).await;

    let mut error_output = String::new();
    let _ = stderr.read_to_string(&mut error_output).await;

    let status = child.wait().await.map_err(|e| AudioError::TranscodeFailed {
        error: format!("ffmpeg did not exit cleanly: {}", e),
    })?;

    if writer.await.is_err() {
        debug!("ffmpeg closed stdin early");
    }

    read_result.map_err(|e| AudioError::TranscodeFailed {
        error: format!("could not read ffmpeg output: {}", e),
    })?;

    if !status.success() {
        return Err(AudioError::TranscodeFailed {
            error: format!(
                "ffmpeg exited with {}: {}",
                status,
                error_output.trim()
            ),
        });
    }

    if pcm.is_empty() {
        return Err(AudioError::TranscodeFailed {
            error: "ffmpeg produced no audio".to_string(),
        });
    }

    Ok(pcm)
}
