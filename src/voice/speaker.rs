// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per speaker accumulation of received pcm into utterances.
//!
//! Slots are keyed by ssrc; the speaker's identity is resolved against the
//! ssrc map only when an utterance flushes, so a binding that arrives after
//! the audio but before the flush still attributes the utterance correctly.
//!
//! This type is pure bookkeeping: it computes its own deadlines but never
//! sleeps. A single owner task drives it with [SpeakerBuffer::next_deadline]
//! and [SpeakerBuffer::flush_due], which keeps all slot access serialized.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::voice::codec::FRAME_SIZE_BYTES;

/// One flushed utterance, ready for transcription.
///
/// The pcm bytes are moved out of the slot on flush; the slot is empty
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUtterance {
    pub ssrc: u32,
    /// s16le stereo pcm at 48 kHz
    pub pcm: Vec<u8>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SpeakerSlot {
    chunks: Vec<Vec<u8>>,
    buffered_bytes: usize,
    started_at: DateTime<Utc>,
    /// Monotonic moment of the first chunk, drives the hard cap
    first_chunk_instant: Instant,
    /// Monotonic moment of the latest chunk, drives the silence timeout
    last_chunk_instant: Instant,
}

impl SpeakerSlot {
    fn new(now: Instant) -> Self {
        Self {
            chunks: Vec::new(),
            buffered_bytes: 0,
            started_at: Utc::now(),
            first_chunk_instant: now,
            last_chunk_instant: now,
        }
    }

    fn buffered_duration(&self) -> Duration {
        // 3840 bytes is 20 ms of pcm
        Duration::from_millis((self.buffered_bytes / FRAME_SIZE_BYTES) as u64 * 20)
    }

    fn into_utterance(self, ssrc: u32) -> PendingUtterance {
        let mut pcm = Vec::with_capacity(self.buffered_bytes);
        for chunk in self.chunks {
            pcm.extend_from_slice(&chunk);
        }

        PendingUtterance {
            ssrc,
            pcm,
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }
}

/// Accumulates pcm per ssrc and delimits utterances by silence or duration.
#[derive(Debug)]
pub struct SpeakerBuffer {
    slots: HashMap<u32, SpeakerSlot>,
    silence_flush: Duration,
    utterance_max: Duration,
}

impl SpeakerBuffer {
    pub fn new(silence_flush: Duration, utterance_max: Duration) -> Self {
        Self {
            slots: HashMap::new(),
            silence_flush,
            utterance_max,
        }
    }

    /// Adds one chunk of pcm for an ssrc.
    ///
    /// Resets the speaker's silence timeout. If the chunk would push the
    /// buffered duration past the hard cap, the current utterance is flushed
    /// first and returned; the chunk then opens a fresh one.
    pub fn add_chunk(&mut self, ssrc: u32, pcm: Vec<u8>, now: Instant) -> Option<PendingUtterance> {
        if pcm.is_empty() {
            return None;
        }

        let mut force_flushed = None;

        if let Some(slot) = self.slots.get_mut(&ssrc) {
            let incoming = Duration::from_millis((pcm.len() / FRAME_SIZE_BYTES) as u64 * 20);
            if slot.buffered_duration() + incoming > self.utterance_max {
                let full = self.slots.remove(&ssrc).unwrap();
                force_flushed = Some(full.into_utterance(ssrc));
            }
        }

        let slot = self
            .slots
            .entry(ssrc)
            .or_insert_with(|| SpeakerSlot::new(now));
        slot.buffered_bytes += pcm.len();
        slot.chunks.push(pcm);
        slot.last_chunk_instant = now;

        force_flushed
    }

    /// The earliest moment any slot's silence timeout or hard cap fires.
    ///
    /// None while no audio is buffered.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .values()
            .map(|slot| {
                let silence_deadline = slot.last_chunk_instant + self.silence_flush;
                let hard_cap_deadline = slot.first_chunk_instant + self.utterance_max;
                silence_deadline.min(hard_cap_deadline)
            })
            .min()
    }

    /// Flushes every slot whose deadline has passed. A no-op on an empty
    /// buffer.
    pub fn flush_due(&mut self, now: Instant) -> Vec<PendingUtterance> {
        let due: Vec<u32> = self
            .slots
            .iter()
            .filter(|(_, slot)| {
                now >= slot.last_chunk_instant + self.silence_flush
                    || now >= slot.first_chunk_instant + self.utterance_max
            })
            .map(|(ssrc, _)| *ssrc)
            .collect();

        due.into_iter()
            .map(|ssrc| self.slots.remove(&ssrc).unwrap().into_utterance(ssrc))
            .collect()
    }

    /// Flushes everything, regardless of deadlines. Used on disconnect.
    pub fn flush_all(&mut self) -> Vec<PendingUtterance> {
        let ssrcs: Vec<u32> = self.slots.keys().copied().collect();
        ssrcs
            .into_iter()
            .map(|ssrc| self.slots.remove(&ssrc).unwrap().into_utterance(ssrc))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The transcript identity of an ssrc with no binding yet.
pub fn placeholder_speaker_id(ssrc: u32) -> String {
    format!("ssrc:{}", ssrc)
}

#[cfg(test)]
mod speaker {
    use super::*;

    const SILENCE: Duration = Duration::from_millis(2000);
    const HARD_CAP: Duration = Duration::from_millis(10_000);

    fn frame() -> Vec<u8> {
        vec![1; FRAME_SIZE_BYTES]
    }

    #[test]
    fn test_flush_on_empty_buffer_is_noop() {
        let mut buffer = SpeakerBuffer::new(SILENCE, HARD_CAP);
        assert!(buffer.next_deadline().is_none());
        assert!(buffer.flush_due(Instant::now()).is_empty());
        assert!(buffer.flush_all().is_empty());
    }

    #[test]
    fn test_silence_timeout_flushes_one_utterance() {
        let mut buffer = SpeakerBuffer::new(SILENCE, HARD_CAP);
        let start = Instant::now();

        assert!(buffer.add_chunk(300, frame(), start).is_none());
        assert!(buffer
            .add_chunk(300, frame(), start + Duration::from_millis(20))
            .is_none());

        // Nothing is due before the silence timeout
        assert!(buffer.flush_due(start + Duration::from_millis(500)).is_empty());

        let flushed = buffer.flush_due(start + Duration::from_millis(2500));
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].ssrc, 300);
        assert_eq!(flushed[0].pcm.len(), 2 * FRAME_SIZE_BYTES);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_chunk_resets_silence_timer() {
        let mut buffer = SpeakerBuffer::new(SILENCE, HARD_CAP);
        let start = Instant::now();

        buffer.add_chunk(300, frame(), start);
        let first_deadline = buffer.next_deadline().unwrap();

        buffer.add_chunk(300, frame(), start + Duration::from_millis(1500));
        let second_deadline = buffer.next_deadline().unwrap();

        assert!(second_deadline > first_deadline);
        // The timer moved: at the old deadline nothing flushes yet
        assert!(buffer.flush_due(first_deadline).is_empty());
    }

    #[test]
    fn test_hard_cap_deadline_beats_silence_reset() {
        let mut buffer = SpeakerBuffer::new(SILENCE, HARD_CAP);
        let start = Instant::now();

        // A speaker who never pauses still gets cut off at the cap
        let mut now = start;
        for _ in 0..20 {
            buffer.add_chunk(300, frame(), now);
            now += Duration::from_millis(500);
        }

        let deadline = buffer.next_deadline().unwrap();
        assert_eq!(deadline, start + HARD_CAP);

        let flushed = buffer.flush_due(start + HARD_CAP);
        assert_eq!(flushed.len(), 1);
    }

    #[test]
    fn test_overfull_chunk_forces_flush_first() {
        let mut buffer = SpeakerBuffer::new(SILENCE, HARD_CAP);
        let start = Instant::now();

        // Fill right up to the cap: 500 frames of 20 ms
        for i in 0..500u64 {
            let forced = buffer.add_chunk(300, frame(), start + Duration::from_millis(i));
            assert!(forced.is_none());
        }

        // The 501st frame would exceed 10 s of buffered audio
        let forced = buffer
            .add_chunk(300, frame(), start + Duration::from_millis(500))
            .expect("hard cap should force a flush");
        assert_eq!(forced.pcm.len(), 500 * FRAME_SIZE_BYTES);

        // The overflowing chunk opened a fresh slot
        assert!(!buffer.is_empty());
        let rest = buffer.flush_all();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].pcm.len(), FRAME_SIZE_BYTES);
    }

    #[test]
    fn test_speakers_flush_independently() {
        let mut buffer = SpeakerBuffer::new(SILENCE, HARD_CAP);
        let start = Instant::now();

        buffer.add_chunk(300, frame(), start);
        buffer.add_chunk(400, frame(), start + Duration::from_millis(1000));

        let flushed = buffer.flush_due(start + Duration::from_millis(2100));
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].ssrc, 300);

        let flushed = buffer.flush_due(start + Duration::from_millis(3100));
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].ssrc, 400);
    }

    #[test]
    fn test_placeholder_id_shape() {
        assert_eq!(placeholder_speaker_id(93810), "ssrc:93810");
    }
}
