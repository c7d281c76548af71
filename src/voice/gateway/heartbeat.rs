// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use futures_util::SinkExt;
use log::*;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::{
    mpsc::{Receiver, Sender},
    Mutex,
};
use tokio::task;
use tokio::time::{sleep_until, Instant};

use crate::{
    errors::VoiceGatewayError,
    types::{VoiceGatewaySendPayload, VoiceHeartbeat, VOICE_HEARTBEAT, VOICE_HEARTBEAT_ACK},
    voice::gateway::{VoiceGatewayEvent, VoiceGatewayMessage},
};

use crate::gateway::Sink;

/// Two intervals without an ack and the session is considered dead.
const MAX_MISSED_ACKS: u8 = 2;

/// Handles sending heartbeats to the voice gateway in another thread
#[derive(Debug)]
pub(super) struct VoiceHeartbeatHandler {
    /// The heartbeat interval in milliseconds
    pub heartbeat_interval: Duration,
    /// The send channel for the heartbeat thread
    pub send: Sender<VoiceHeartbeatThreadCommunication>,
}

impl VoiceHeartbeatHandler {
    pub fn new(
        heartbeat_interval: Duration,
        websocket_tx: Arc<Mutex<Sink>>,
        event_sink: Sender<VoiceGatewayEvent>,
        kill_send: tokio::sync::broadcast::Sender<()>,
    ) -> Self {
        let (send, receive) = tokio::sync::mpsc::channel(32);
        let kill_receive = kill_send.subscribe();

        task::spawn(async move {
            Self::heartbeat_task(
                websocket_tx,
                heartbeat_interval,
                receive,
                event_sink,
                kill_send,
                kill_receive,
            )
            .await;
        });

        Self {
            heartbeat_interval,
            send,
        }
    }

    /// The main heartbeat task;
    ///
    /// Sends `{t, seq_ack}` every interval; when two consecutive heartbeats
    /// go unacknowledged, the session is torn down as dead.
    ///
    /// Can be killed by the kill broadcast;
    /// If the websocket is closed, will die out next time it tries to send a heartbeat;
    async fn heartbeat_task(
        websocket_tx: Arc<Mutex<Sink>>,
        heartbeat_interval: Duration,
        mut receive: Receiver<VoiceHeartbeatThreadCommunication>,
        event_sink: Sender<VoiceGatewayEvent>,
        kill_send: tokio::sync::broadcast::Sender<()>,
        mut kill_receive: tokio::sync::broadcast::Receiver<()>,
    ) {
        let mut last_heartbeat_timestamp: Instant = Instant::now();
        let mut missed_acks: u8 = 0;
        let mut seq_ack: Option<u64> = None;

        loop {
            let mut should_send = false;

            tokio::select! {
                () = sleep_until(last_heartbeat_timestamp + heartbeat_interval) => {
                    should_send = true;
                }
                Some(communication) = receive.recv() => {
                    // If we received a seq number update, use that number now
                    if communication.updated_seq.is_some() {
                        seq_ack = communication.updated_seq;
                    }

                    if let Some(op_code) = communication.op_code {
                        match op_code {
                            VOICE_HEARTBEAT => {
                                // As per the api docs, if the server sends us a Heartbeat, that means we need to respond with a heartbeat immediately
                                should_send = true;
                            }
                            VOICE_HEARTBEAT_ACK => {
                                // The server received our heartbeat
                                missed_acks = 0;
                            }
                            _ => {}
                        }
                    }
                }
                Ok(_) = kill_receive.recv() => {
                    trace!("VGW: Closing heartbeat task");
                    break;
                }
            }

            if should_send {
                if missed_acks >= MAX_MISSED_ACKS {
                    warn!(
                        "VGW: Two consecutive heartbeats went unacknowledged, closing session"
                    );
                    let _ = kill_send.send(());
                    let _ = event_sink
                        .send(VoiceGatewayEvent::Closed(
                            VoiceGatewayError::HeartbeatAckMissed,
                        ))
                        .await;
                    break;
                }

                trace!("VGW: Sending Heartbeat..");

                let heartbeat = VoiceHeartbeat {
                    t: Utc::now().timestamp_millis() as u64,
                    seq_ack,
                };

                let payload = VoiceGatewaySendPayload {
                    op_code: VOICE_HEARTBEAT,
                    data: serde_json::to_value(heartbeat).unwrap(),
                };

                let heartbeat_json = serde_json::to_string(&payload).unwrap();

                let msg = VoiceGatewayMessage(heartbeat_json);

                let send_result = websocket_tx.lock().await.send(msg.into()).await;
                if send_result.is_err() {
                    // We couldn't send, the websocket is broken
                    warn!("VGW: Couldnt send heartbeat, websocket seems broken");
                    break;
                }

                last_heartbeat_timestamp = Instant::now();
                missed_acks += 1;
            }
        }
    }
}

/// Used for communications between the voice heartbeat and voice gateway thread.
/// Either signifies a seq_ack update, a heartbeat ACK or a Heartbeat request by the server
#[derive(Clone, Copy, Debug)]
pub(super) struct VoiceHeartbeatThreadCommunication {
    /// The opcode for the communication we received, if relevant
    pub(super) op_code: Option<u8>,
    /// The new seq_ack to send, if any
    pub(super) updated_seq: Option<u64>,
}
