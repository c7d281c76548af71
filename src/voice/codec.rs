// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Thin adapters around the Opus encoder and decoder.
//!
//! Everything in the voice path is 48 kHz 16 bit stereo pcm in 20 ms frames;
//! these wrappers pin that configuration in one place.

use audiopus::coder;
use audiopus::{Application, Bitrate, Channels, SampleRate};

use log::*;

use crate::errors::AudioError;

/// Samples per channel in one 20 ms frame at 48 kHz.
pub const SAMPLES_PER_FRAME: usize = 960;
/// Samples per frame across both channels.
pub const STEREO_SAMPLES_PER_FRAME: usize = SAMPLES_PER_FRAME * 2;
/// One frame of s16le stereo pcm, in bytes.
pub const FRAME_SIZE_BYTES: usize = STEREO_SAMPLES_PER_FRAME * 2;
/// Sample count added to the rtp timestamp per frame.
pub const TIMESTAMP_STEP: u32 = SAMPLES_PER_FRAME as u32;

/// Voice quality beats bandwidth here, but only up to a point; 96 kbit/s is
/// comfortably transparent for speech.
const ENCODER_BITRATE: i32 = 96_000;

// An opus frame is never larger than 1275 bytes
const MAX_OPUS_FRAME: usize = 1275;

/// Returns one 20 ms frame of pcm silence.
pub fn silence_frame() -> Vec<u8> {
    vec![0; FRAME_SIZE_BYTES]
}

/// Reinterprets s16le bytes as samples. A trailing odd byte is dropped.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Serializes samples back into s16le bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// The session's Opus encoder: 48 kHz stereo, voip tuning, fec off.
#[derive(Debug)]
pub struct OpusEncoder {
    coder: coder::Encoder,
    output: Vec<u8>,
}

impl OpusEncoder {
    pub fn new() -> Result<Self, AudioError> {
        let mut coder = coder::Encoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Voip)
            .map_err(|e| AudioError::CoderInit {
                error: format!("{:?}", e),
            })?;

        coder
            .set_bitrate(Bitrate::BitsPerSecond(ENCODER_BITRATE))
            .map_err(|e| AudioError::CoderInit {
                error: format!("{:?}", e),
            })?;

        // Fec spends bits on redundancy we'd rather spend on the voice itself
        coder.disable_inband_fec().map_err(|e| AudioError::CoderInit {
            error: format!("{:?}", e),
        })?;

        Ok(Self {
            coder,
            output: vec![0; MAX_OPUS_FRAME],
        })
    }

    /// Encodes exactly one 20 ms frame of interleaved stereo samples.
    pub fn encode(&mut self, frame: &[i16; STEREO_SAMPLES_PER_FRAME]) -> Result<Vec<u8>, AudioError> {
        let length = self
            .coder
            .encode(frame.as_slice(), &mut self.output)
            .map_err(|e| AudioError::EncodeFailed {
                error: format!("{:?}", e),
            })?;

        Ok(self.output[0..length].to_vec())
    }
}

/// The session's Opus decoder.
///
/// Decode failures never propagate: a frame that cannot be decoded becomes
/// 20 ms of silence, which keeps the per speaker buffer aligned with wall
/// clock time.
#[derive(Debug)]
pub struct OpusDecoder {
    coder: coder::Decoder,
    output: Vec<i16>,
}

impl OpusDecoder {
    pub fn new() -> Result<Self, AudioError> {
        let coder = coder::Decoder::new(SampleRate::Hz48000, Channels::Stereo).map_err(|e| {
            AudioError::CoderInit {
                error: format!("{:?}", e),
            }
        })?;

        Ok(Self {
            coder,
            output: vec![0; STEREO_SAMPLES_PER_FRAME],
        })
    }

    /// Decodes one opus frame into s16le stereo pcm bytes.
    pub fn decode(&mut self, frame: &[u8]) -> Vec<u8> {
        match self.coder.decode(Some(frame), &mut self.output, false) {
            Ok(samples_per_channel) => samples_to_bytes(&self.output[0..samples_per_channel * 2]),
            Err(e) => {
                debug!("VUDP: Failed to decode an opus frame ({:?}), substituting silence", e);
                silence_frame()
            }
        }
    }
}

#[cfg(test)]
mod codec {
    use super::*;

    #[test]
    fn test_sample_serialization_round_trip() {
        let samples: Vec<i16> = vec![0, -1, 1, i16::MIN, i16::MAX, 256];
        let bytes = samples_to_bytes(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);
        assert_eq!(bytes_to_samples(&bytes), samples);
    }

    #[test]
    fn test_silence_frame_dimensions() {
        let silence = silence_frame();
        assert_eq!(silence.len(), 3840);
        assert!(silence.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn test_encode_decode_frame() {
        let mut encoder = OpusEncoder::new().unwrap();
        let mut decoder = OpusDecoder::new().unwrap();

        // A 440 Hz tone is enough to verify dimensions survive the codec
        let mut frame = [0i16; STEREO_SAMPLES_PER_FRAME];
        for (i, chunk) in frame.chunks_exact_mut(2).enumerate() {
            let value =
                ((i as f32 * 440.0 * std::f32::consts::TAU / 48_000.0).sin() * 8192.0) as i16;
            chunk[0] = value;
            chunk[1] = value;
        }

        let opus = encoder.encode(&frame).unwrap();
        assert!(!opus.is_empty());
        assert!(opus.len() <= MAX_OPUS_FRAME);

        let pcm = decoder.decode(&opus);
        assert_eq!(pcm.len(), FRAME_SIZE_BYTES);
    }

    #[test]
    fn test_decode_failure_substitutes_silence() {
        let mut decoder = OpusDecoder::new().unwrap();
        // 0xFF is not a meaningful TOC sequence long enough to decode
        let pcm = decoder.decode(&[0xFF]);
        assert_eq!(pcm, silence_frame());
    }
}
