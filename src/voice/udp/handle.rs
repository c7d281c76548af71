// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::*;

use tokio::sync::RwLock;

use crate::errors::VoiceUdpError;
use crate::voice::voice_data::VoiceData;

use super::UdpSocket;

/// Handle to a voice UDP connection
///
/// Can be safely cloned and will still correspond to the same connection.
#[derive(Debug, Clone)]
pub struct UdpHandle {
    pub(super) socket: Arc<UdpSocket>,
    pub data: Arc<RwLock<VoiceData>>,
    pub(crate) kill_send: tokio::sync::broadcast::Sender<()>,
    pub(crate) dropped_packets: Arc<AtomicU64>,
}

impl UdpHandle {
    /// Sends an already framed and sealed rtp packet to the connection.
    ///
    /// # Errors
    /// If the Udp socket is broken, this returns a [VoiceUdpError::BrokenSocket] error.
    pub async fn send_encrypted_rtp_packet(&self, packet: &[u8]) -> Result<(), VoiceUdpError> {
        let send_res = self.socket.send(packet).await;
        if let Err(e) = send_res {
            return Err(VoiceUdpError::BrokenSocket {
                error: format!("{:?}", e),
            });
        }

        trace!("VUDP: Sent rtp packet!");

        Ok(())
    }

    /// How many received packets failed to decrypt so far this session.
    pub fn dropped_packets(&self) -> u64 {
        self.dropped_packets.load(Ordering::Relaxed)
    }

    /// Stops the receive loop. The socket itself is dropped once the last
    /// clone of this handle goes away.
    pub fn close(&self) {
        let _ = self.kill_send.send(());
    }
}
