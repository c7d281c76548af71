// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The send-side pipeline: a pcm byte stream in, a queue of sealed rtp
//! datagrams out.
//!
//! Every frame of a batch is produced before the first one is transmitted,
//! so codec and crypto cost never eats into the pacer's 20 ms budget.

use crate::errors::AudioError;
use crate::voice::codec::{
    bytes_to_samples, OpusEncoder, FRAME_SIZE_BYTES, STEREO_SAMPLES_PER_FRAME, TIMESTAMP_STEP,
};
use crate::voice::crypto;
use crate::voice::rtp;

/// The send-side counters of one session.
///
/// Sequence and timestamp are the rtp fields and wrap at their natural
/// widths; the nonce keeps its full u32 width so its 4 byte encoding never
/// repeats within a session, even after the sequence wraps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendCounters {
    pub sequence: u16,
    pub timestamp: u32,
    pub nonce: u32,
}

impl SendCounters {
    /// Advances to the next frame, returning the values that frame uses.
    fn step(&mut self) -> (u16, u32, u32) {
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(TIMESTAMP_STEP);
        self.nonce = self.nonce.wrapping_add(1);
        (self.sequence, self.timestamp, self.nonce)
    }
}

/// Encodes, frames and seals outbound audio.
#[derive(Debug)]
pub struct EncodePipeline {
    encoder: OpusEncoder,
}

impl EncodePipeline {
    pub fn new() -> Result<Self, AudioError> {
        Ok(Self {
            encoder: OpusEncoder::new()?,
        })
    }

    /// Turns a whole pcm byte stream into ready-to-send datagrams.
    ///
    /// The stream is partitioned into 20 ms frames, the final partial frame
    /// zero padded. Counters advance once per produced frame; the caller is
    /// expected to write them back to the session under the same lock it
    /// read them from.
    pub fn encode_batch(
        &mut self,
        secret_key: &[u8; 32],
        ssrc: u32,
        counters: &mut SendCounters,
        pcm: &[u8],
    ) -> Result<Vec<Vec<u8>>, AudioError> {
        let mut packets = Vec::with_capacity(pcm.len() / FRAME_SIZE_BYTES + 1);

        for chunk in pcm.chunks(FRAME_SIZE_BYTES) {
            let mut frame = [0i16; STEREO_SAMPLES_PER_FRAME];
            let samples = bytes_to_samples(chunk);
            frame[0..samples.len()].copy_from_slice(&samples);

            let opus_payload = self.encoder.encode(&frame)?;

            let (sequence, timestamp, nonce) = counters.step();

            let sealed = crypto::seal_lite(secret_key, nonce, &opus_payload)
                .map_err(|_| AudioError::SealFailed)?;

            packets.push(rtp::build_packet(sequence, timestamp, ssrc, sealed));
        }

        Ok(packets)
    }
}

#[cfg(test)]
mod encode {
    use super::*;
    use crate::voice::rtp::RTP_HEADER_SIZE;

    fn sine_pcm(millis: usize) -> Vec<u8> {
        let samples = millis * 48 * 2;
        let mut pcm = Vec::with_capacity(samples * 2);
        for i in 0..samples {
            let value = (((i / 2) as f32 * 440.0 * std::f32::consts::TAU / 48_000.0).sin()
                * 8192.0) as i16;
            pcm.extend_from_slice(&value.to_le_bytes());
        }
        pcm
    }

    #[test]
    fn test_one_second_is_fifty_frames() {
        let mut pipeline = EncodePipeline::new().unwrap();
        let mut counters = SendCounters::default();

        let packets = pipeline
            .encode_batch(&[1u8; 32], 777, &mut counters, &sine_pcm(1000))
            .unwrap();

        assert_eq!(packets.len(), 50);
        assert_eq!(counters.sequence, 50);
        assert_eq!(counters.timestamp, 50 * 960);
        assert_eq!(counters.nonce, 50);
    }

    #[test]
    fn test_sequence_and_timestamp_step_per_frame() {
        let mut pipeline = EncodePipeline::new().unwrap();
        let mut counters = SendCounters::default();

        let packets = pipeline
            .encode_batch(&[1u8; 32], 777, &mut counters, &sine_pcm(100))
            .unwrap();

        let mut previous: Option<(u16, u32)> = None;
        for packet in &packets {
            assert!(packet.len() > RTP_HEADER_SIZE + 4);
            let sequence = u16::from_be_bytes([packet[2], packet[3]]);
            let timestamp = u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);
            // The nonce tail tracks the sequence while it has not wrapped
            let tail =
                u32::from_be_bytes([packet[packet.len() - 4], packet[packet.len() - 3], packet[packet.len() - 2], packet[packet.len() - 1]]);
            assert_eq!(tail, sequence as u32);

            if let Some((prev_seq, prev_ts)) = previous {
                assert_eq!(sequence, prev_seq.wrapping_add(1));
                assert_eq!(timestamp, prev_ts.wrapping_add(960));
            }
            previous = Some((sequence, timestamp));
        }
    }

    #[test]
    fn test_partial_tail_frame_is_padded() {
        let mut pipeline = EncodePipeline::new().unwrap();
        let mut counters = SendCounters::default();

        // 30 ms: one full frame plus half a frame
        let packets = pipeline
            .encode_batch(&[1u8; 32], 777, &mut counters, &sine_pcm(30))
            .unwrap();

        assert_eq!(packets.len(), 2);
    }

    #[test]
    fn test_sequence_wrap_keeps_nonce_monotonic() {
        let mut pipeline = EncodePipeline::new().unwrap();
        let mut counters = SendCounters {
            sequence: 0xFFFE,
            timestamp: u32::MAX - 960,
            nonce: 0xFFFE,
        };

        let packets = pipeline
            .encode_batch(&[1u8; 32], 777, &mut counters, &sine_pcm(60))
            .unwrap();
        assert_eq!(packets.len(), 3);

        // 0xFFFF, 0x0000, 0x0001
        assert_eq!(counters.sequence, 1);
        // The nonce kept counting instead of wrapping with the sequence
        assert_eq!(counters.nonce, 0x10001);

        let last = packets.last().unwrap();
        let tail = u32::from_be_bytes([
            last[last.len() - 4],
            last[last.len() - 3],
            last[last.len() - 2],
            last[last.len() - 1],
        ]);
        assert_eq!(tail, 0x10001);
    }
}
