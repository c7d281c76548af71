// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The receive-side pipeline: raw datagrams in, per speaker pcm out.
//!
//! Runs entirely on the UDP receive task. Every accepted frame is handed to
//! the per speaker buffer as one owned byte buffer; nothing downstream
//! touches codec or crypto state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use discortp::demux::{demux, Demuxed};
use discortp::Packet;

use log::*;

use tokio::sync::mpsc;

use crate::errors::AudioError;
use crate::voice::codec::{silence_frame, OpusDecoder};
use crate::voice::crypto;
use crate::voice::rtp;
use crate::voice::udp::discovery;

/// Plaintext at or below this length is a silence / keepalive frame, not
/// opus data worth decoding.
const SILENCE_PLAINTEXT_MAX: usize = 3;

/// One decoded 20 ms frame attributed to an ssrc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub ssrc: u32,
    /// s16le stereo pcm at 48 kHz
    pub pcm: Vec<u8>,
    pub sequence: u16,
    pub timestamp: u32,
}

/// Parses, decrypts and decodes inbound datagrams.
#[derive(Debug)]
pub struct DecodePipeline {
    decoder: OpusDecoder,
    sink: mpsc::Sender<DecodedFrame>,
    /// Packets dropped because their seal would not open.
    dropped_packets: Arc<AtomicU64>,
}

impl DecodePipeline {
    pub fn new(
        sink: mpsc::Sender<DecodedFrame>,
        dropped_packets: Arc<AtomicU64>,
    ) -> Result<Self, AudioError> {
        Ok(Self {
            decoder: OpusDecoder::new()?,
            sink,
            dropped_packets,
        })
    }

    /// Handles one received datagram.
    ///
    /// Anything that is not decryptable audio is dropped here: discovery
    /// responses, rtcp, malformed rtp, packets that arrive before the
    /// session key. None of these abort the receive loop.
    pub async fn handle_datagram(&mut self, buf: &[u8], secret_key: Option<&[u8; 32]>) {
        if discovery::is_discovery(buf) {
            trace!("VUDP: Ignoring stray ip discovery response");
            return;
        }

        if !rtp::is_rtp(buf) {
            trace!("VUDP: Dropping datagram that is not rtp version 2");
            return;
        }

        let parsed = demux(buf);

        match parsed {
            Demuxed::Rtp(rtp_packet) => {
                let Some(key) = secret_key else {
                    warn!("VUDP: Received encrypted voice data, but no session key yet, dropping");
                    return;
                };

                let packet_bytes = rtp_packet.packet();

                let plaintext = match crypto::open_lite(key, packet_bytes) {
                    Ok(plaintext) => plaintext,
                    Err(_) => {
                        self.dropped_packets.fetch_add(1, Ordering::Relaxed);
                        warn!("VUDP: Failed to decrypt voice data, dropping packet");
                        return;
                    }
                };

                let ssrc = rtp_packet.get_ssrc();
                let sequence = rtp_packet.get_sequence().into();
                let timestamp = rtp_packet.get_timestamp().into();

                let pcm = if plaintext.len() <= SILENCE_PLAINTEXT_MAX {
                    // Keepalive / comfort noise; substitute one frame of
                    // silence without waking the decoder
                    silence_frame()
                } else {
                    let opus_payload = rtp::strip_one_byte_extension(&plaintext);
                    if opus_payload.is_empty() {
                        trace!("VUDP: Plaintext was all extension, dropping");
                        return;
                    }
                    self.decoder.decode(opus_payload)
                };

                let frame = DecodedFrame {
                    ssrc,
                    pcm,
                    sequence,
                    timestamp,
                };

                if self.sink.send(frame).await.is_err() {
                    trace!("VUDP: Frame receiver dropped, discarding decoded audio");
                }
            }
            Demuxed::Rtcp(_) => {
                trace!("VUDP: Parsed packet as rtcp, ignoring");
            }
            Demuxed::FailedParse(e) => {
                trace!("VUDP: Failed to parse packet: {:?}", e);
            }
            Demuxed::TooSmall => {
                trace!("VUDP: Packet too small to parse");
            }
        }
    }

    /// How many packets failed to decrypt so far.
    pub fn dropped_packets(&self) -> u64 {
        self.dropped_packets.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod decode {
    use super::*;
    use crate::voice::codec::FRAME_SIZE_BYTES;

    fn sealed_packet(key: &[u8; 32], sequence: u16, ssrc: u32, plaintext: &[u8]) -> Vec<u8> {
        let sealed = crate::voice::crypto::seal_lite(key, sequence as u32, plaintext).unwrap();
        rtp::build_packet(sequence, sequence as u32 * 960, ssrc, sealed)
    }

    #[tokio::test]
    async fn test_silence_plaintext_becomes_silence_frame() {
        let key = [3u8; 32];
        let (sink, mut receive) = mpsc::channel(4);
        let mut pipeline = DecodePipeline::new(sink, Arc::default()).unwrap();

        let packet = sealed_packet(&key, 7, 41, &[0xF8, 0xFF, 0xFE]);
        pipeline.handle_datagram(&packet, Some(&key)).await;

        let frame = receive.recv().await.unwrap();
        assert_eq!(frame.ssrc, 41);
        assert_eq!(frame.pcm.len(), FRAME_SIZE_BYTES);
        assert!(frame.pcm.iter().all(|byte| *byte == 0));
    }

    #[tokio::test]
    async fn test_discovery_and_garbage_are_dropped() {
        let key = [3u8; 32];
        let (sink, mut receive) = mpsc::channel(4);
        let mut pipeline = DecodePipeline::new(sink, Arc::default()).unwrap();

        let response = crate::voice::udp::discovery::build_request(99);
        pipeline.handle_datagram(&response, Some(&key)).await;
        pipeline.handle_datagram(&[0x13, 0x37], Some(&key)).await;

        assert!(receive.try_recv().is_err());
        assert_eq!(pipeline.dropped_packets(), 0);
    }

    #[tokio::test]
    async fn test_bad_seal_increments_counter_and_continues() {
        let key = [3u8; 32];
        let wrong_key = [4u8; 32];
        let (sink, mut receive) = mpsc::channel(4);
        let mut pipeline = DecodePipeline::new(sink, Arc::default()).unwrap();

        let packet = sealed_packet(&wrong_key, 8, 41, &[0xF8, 0xFF, 0xFE]);
        pipeline.handle_datagram(&packet, Some(&key)).await;
        assert_eq!(pipeline.dropped_packets(), 1);

        // The loop keeps accepting well sealed packets afterwards
        let packet = sealed_packet(&key, 9, 41, &[0xF8, 0xFF, 0xFE]);
        pipeline.handle_datagram(&packet, Some(&key)).await;
        assert!(receive.recv().await.is_some());
    }
}
