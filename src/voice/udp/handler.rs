// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::errors::VoiceUdpError;
use crate::voice::decode::{DecodedFrame, DecodePipeline};
use crate::voice::udp::discovery;
use crate::voice::voice_data::VoiceData;

use super::UdpBackend;
use super::UdpSocket;

use super::UdpHandle;

use log::*;

/// How many attempts we give the discovery exchange before giving up; non
/// discovery datagrams received in between do not count.
const DISCOVERY_MAX_STRAY_PACKETS: usize = 16;

#[derive(Debug)]
/// The main UDP struct, which owns the receive side of the socket: it
/// performs ip discovery once, then hands every datagram to the decode
/// pipeline until the session dies.
pub struct UdpHandler {
    pub data: Arc<RwLock<VoiceData>>,
    socket: Arc<UdpSocket>,
    pipeline: DecodePipeline,
    kill_receive: tokio::sync::broadcast::Receiver<()>,
}

impl UdpHandler {
    /// Connects a fresh socket to the voice server, performs ip discovery
    /// and spawns the receive loop.
    ///
    /// Mutates the given data_reference with the discovered address.
    /// Decoded frames flow into `frame_sink`.
    pub async fn spawn(
        data_reference: Arc<RwLock<VoiceData>>,
        url: SocketAddr,
        ssrc: u32,
        frame_sink: mpsc::Sender<DecodedFrame>,
    ) -> Result<UdpHandle, VoiceUdpError> {
        let udp_socket = UdpBackend::connect(url).await?;

        // First perform ip discovery
        let request = discovery::build_request(ssrc);

        debug!("VUDP: Sending Ip Discovery {:?}", &request);

        let send_res = udp_socket.send(&request).await;
        if let Err(e) = send_res {
            return Err(VoiceUdpError::BrokenSocket {
                error: format!("{:?}", e),
            });
        }

        debug!("VUDP: Sent packet discovery request");

        // Handle the ip discovery response; the socket is connected, but the
        // server may already interleave other traffic, so skip non discovery
        // datagrams instead of failing on them.
        let mut buf: Vec<u8> = vec![0; 512];
        let mut ip_discovery = None;

        for _ in 0..DISCOVERY_MAX_STRAY_PACKETS {
            let received_size = match udp_socket.recv(&mut buf).await {
                Ok(size) => size,
                Err(e) => {
                    return Err(VoiceUdpError::BrokenSocket {
                        error: format!("{:?}", e),
                    });
                }
            };

            if discovery::is_discovery(&buf[0..received_size]) {
                ip_discovery = Some(discovery::parse_response(&buf[0..received_size])?);
                break;
            }

            trace!("VUDP: Skipping a non discovery datagram while discovering");
        }

        let Some(ip_discovery) = ip_discovery else {
            return Err(VoiceUdpError::MalformedIpDiscovery);
        };

        debug!("VUDP: Received ip discovery: {:?}", ip_discovery);

        let mut data_reference_lock = data_reference.write().await;
        data_reference_lock.ip_discovery = Some(ip_discovery);
        drop(data_reference_lock);

        let socket = Arc::new(udp_socket);

        let dropped_packets = Arc::new(AtomicU64::new(0));
        let pipeline = DecodePipeline::new(frame_sink, dropped_packets.clone())
            .map_err(|e| VoiceUdpError::CannotConnect {
                error: format!("{:?}", e),
            })?;

        let (kill_send, kill_receive) = tokio::sync::broadcast::channel::<()>(16);

        let mut handler = UdpHandler {
            data: data_reference.clone(),
            socket: socket.clone(),
            pipeline,
            kill_receive,
        };

        // Now we can continuously check for messages in a different task
        tokio::spawn(async move {
            handler.listen_task().await;
        });

        Ok(UdpHandle {
            socket,
            data: data_reference,
            kill_send,
            dropped_packets,
        })
    }

    /// The main listen task;
    ///
    /// Receives UDP datagrams and feeds them through the decode pipeline.
    async fn listen_task(&mut self) {
        loop {
            // The theoretical max size of one voice datagram is well under
            // this; see <https://stackoverflow.com/questions/58097580/rtp-packet-maximum-size>
            let mut buf: Vec<u8> = vec![0; 1460];

            let result;
            tokio::select! {
                Ok(_) = self.kill_receive.recv() => {
                    trace!("VUDP: Closing listen task");
                    break;
                }
                received = self.socket.recv(&mut buf) => {
                    result = received;
                }
            }

            match result {
                Ok(size) => {
                    let secret_key = self.data.read().await.secret_key();
                    self.pipeline
                        .handle_datagram(&buf[0..size], secret_key.as_ref())
                        .await;
                }
                Err(e) => {
                    warn!("VUDP: Voice UDP is broken ({:?}), closing connection", e);
                    break;
                }
            }
        }
    }
}
