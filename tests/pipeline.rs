// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end properties of the audio pipelines that hold without a live
//! voice server.

use std::time::Duration;

use descant::voice::codec::FRAME_SIZE_BYTES;
use descant::voice::encode::{EncodePipeline, SendCounters};
use descant::voice::rtp;
use descant::voice::speaker::SpeakerBuffer;
use tokio::time::Instant;

fn sine_pcm(millis: usize) -> Vec<u8> {
    let samples = millis * 48 * 2;
    let mut pcm = Vec::with_capacity(samples * 2);
    for i in 0..samples {
        let value =
            (((i / 2) as f32 * 440.0 * std::f32::consts::TAU / 48_000.0).sin() * 8192.0) as i16;
        pcm.extend_from_slice(&value.to_le_bytes());
    }
    pcm
}

#[test]
fn test_batch_packets_are_valid_rtp() {
    let mut pipeline = EncodePipeline::new().unwrap();
    let mut counters = SendCounters::default();

    let packets = pipeline
        .encode_batch(&[9u8; 32], 4242, &mut counters, &sine_pcm(200))
        .unwrap();

    assert_eq!(packets.len(), 10);
    for packet in &packets {
        assert!(rtp::is_rtp(packet));
        // payload type 120, no marker
        assert_eq!(packet[1], 0x78);
        // our ssrc
        assert_eq!(&packet[8..12], &4242u32.to_be_bytes());
    }
}

#[test]
fn test_counters_survive_across_batches() {
    let mut pipeline = EncodePipeline::new().unwrap();
    let mut counters = SendCounters::default();

    pipeline
        .encode_batch(&[9u8; 32], 4242, &mut counters, &sine_pcm(100))
        .unwrap();
    let after_first = counters;

    pipeline
        .encode_batch(&[9u8; 32], 4242, &mut counters, &sine_pcm(100))
        .unwrap();

    assert_eq!(counters.sequence, after_first.sequence + 5);
    assert_eq!(counters.timestamp, after_first.timestamp + 5 * 960);
    assert_eq!(counters.nonce, after_first.nonce + 5);
}

#[test]
fn test_extension_strip_round_trip() {
    // A one byte extension header wrapped around an opus-looking payload
    let opus = [0xFC, 0xDE, 0xAD, 0xBE, 0xEF];
    let mut payload = vec![0xBE, 0xDE, 0x00, 0x01];
    payload.extend_from_slice(&[0x10, 0xAA, 0x00, 0x00]);
    payload.extend_from_slice(&opus);

    assert_eq!(rtp::strip_one_byte_extension(&payload), &opus);
    // Payloads without the marker pass through untouched
    assert_eq!(rtp::strip_one_byte_extension(&opus), &opus);
}

#[tokio::test]
async fn test_speaker_buffer_flush_cycle() {
    let mut buffer = SpeakerBuffer::new(
        Duration::from_millis(2000),
        Duration::from_millis(10_000),
    );
    let start = Instant::now();

    // Nothing buffered, nothing flushed
    assert!(buffer.flush_due(start).is_empty());

    // ~3 s of speech in 20 ms chunks
    let mut now = start;
    for _ in 0..150 {
        assert!(buffer
            .add_chunk(777, vec![1; FRAME_SIZE_BYTES], now)
            .is_none());
        now += Duration::from_millis(20);
    }

    // Silence follows; the flush fires 2 s after the last chunk
    let flushed = buffer.flush_due(now + Duration::from_millis(2000));
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].ssrc, 777);
    assert_eq!(flushed[0].pcm.len(), 150 * FRAME_SIZE_BYTES);
    assert!(buffer.is_empty());
}
