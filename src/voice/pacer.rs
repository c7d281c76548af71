// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Time-accurate emission of sealed rtp packets, one per 20 ms.
//!
//! Every wakeup is retargeted against `start + i * 20 ms` on a monotonic
//! clock. A cumulative sleep loop would let scheduler jitter accumulate
//! until the server's jitter buffer starts dropping frames.

use std::time::Duration;

use log::*;

use tokio::sync::watch;
use tokio::time::{sleep, Instant};

use crate::errors::VoiceUdpError;
use crate::voice::udp::UdpHandle;

/// The wire cadence of opus voice frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(20);

/// The floor on per-frame delays; keeps a backlogged pacer yielding.
const MIN_DELAY: Duration = Duration::from_millis(1);

/// The result of pacing one batch onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacedBatch {
    pub frames_sent: usize,
    pub cancelled: bool,
}

/// Sends the given pre-sealed packets at one per 20 ms.
///
/// Cancellation (the watch flipping to true) stops further sends and drains
/// the rest of the queue; frames already on the wire are gone and not
/// recalled. Send errors on individual frames are logged and skipped, since
/// real-time audio is expendable; only a fully broken socket aborts.
pub async fn pace_send(
    udp: &UdpHandle,
    packets: Vec<Vec<u8>>,
    cancel: &mut watch::Receiver<bool>,
) -> Result<PacedBatch, VoiceUdpError> {
    let start = Instant::now();
    let mut frames_sent = 0;

    for (i, packet) in packets.iter().enumerate() {
        let target = start + FRAME_INTERVAL * (i as u32);
        let delay = target
            .checked_duration_since(Instant::now())
            .unwrap_or_default()
            .max(MIN_DELAY);

        tokio::select! {
            () = sleep(delay) => {}
            Ok(_) = cancel.wait_for(|cancelled| *cancelled) => {
                debug!("VUDP: Playback cancelled, draining {} queued frames", packets.len() - i);
                return Ok(PacedBatch {
                    frames_sent,
                    cancelled: true,
                });
            }
        }

        match udp.send_encrypted_rtp_packet(packet).await {
            Ok(()) => frames_sent += 1,
            Err(VoiceUdpError::BrokenSocket { error }) => {
                return Err(VoiceUdpError::BrokenSocket { error });
            }
            Err(e) => {
                debug!("VUDP: Dropping one outbound frame ({})", e);
            }
        }
    }

    Ok(PacedBatch {
        frames_sent,
        cancelled: false,
    })
}

#[cfg(test)]
mod pacer {
    use super::*;

    #[test]
    fn test_retargeted_delays_do_not_accumulate() {
        // Pure schedule math: after a late wakeup the next target is still
        // start-relative, so one delay being long shrinks the next instead
        // of shifting the whole schedule.
        let start = Instant::now();
        let late_now = start + Duration::from_millis(27);

        let target_frame_2 = start + FRAME_INTERVAL * 2;
        let delay = target_frame_2
            .checked_duration_since(late_now)
            .unwrap_or_default()
            .max(MIN_DELAY);

        assert_eq!(delay, Duration::from_millis(13));
    }

    #[test]
    fn test_minimum_delay_floor() {
        let start = Instant::now();
        let very_late = start + Duration::from_millis(500);

        let target = start + FRAME_INTERVAL;
        let delay = target
            .checked_duration_since(very_late)
            .unwrap_or_default()
            .max(MIN_DELAY);

        assert_eq!(delay, MIN_DELAY);
    }
}
