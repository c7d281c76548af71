// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{sync::Arc, time::Duration};

use log::*;

use tokio::sync::{mpsc, Mutex};

use futures_util::{SinkExt, StreamExt};

use crate::gateway::{Sink, Stream, WebSocketBackend};
use crate::{
    errors::VoiceGatewayError,
    types::{
        VoiceGatewayReceivePayload, VoiceHelloData, VOICE_CLIENT_DISCONNECT, VOICE_HEARTBEAT,
        VOICE_HEARTBEAT_ACK, VOICE_HELLO, VOICE_IDENTIFY, VOICE_READY, VOICE_RESUME,
        VOICE_RESUMED, VOICE_SELECT_PROTOCOL, VOICE_SESSION_DESCRIPTION, VOICE_SPEAKING,
    },
};

use super::{
    heartbeat::{VoiceHeartbeatHandler, VoiceHeartbeatThreadCommunication},
    VoiceGatewayCommunication, VoiceGatewayEvent, VoiceGatewayHandle, VoiceGatewayMessage,
};

/// The fallback heartbeat cadence, used when the Hello payload carries a
/// nonsensical interval.
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 5000;

/// How many parsed events may queue up before the reader applies backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct VoiceGateway {
    heartbeat_handler: VoiceHeartbeatHandler,
    event_sink: mpsc::Sender<VoiceGatewayEvent>,
    websocket_send: Arc<Mutex<Sink>>,
    websocket_receive: Stream,
    kill_send: tokio::sync::broadcast::Sender<()>,
    kill_receive: tokio::sync::broadcast::Receiver<()>,
}

impl VoiceGateway {
    /// Connects to a voice gateway endpoint, waits for the Hello and starts
    /// the heartbeat and listener tasks.
    ///
    /// Returns a handle for sending and the receiving end of the parsed
    /// [VoiceGatewayEvent] stream. The Hello itself is the first event the
    /// receiver yields, so the session machine observes the full op sequence.
    #[allow(clippy::new_ret_no_self)]
    pub async fn spawn(
        websocket_url: &str,
    ) -> Result<(VoiceGatewayHandle, mpsc::Receiver<VoiceGatewayEvent>), VoiceGatewayError> {
        // Append the needed things to the websocket url
        let processed_url = format!("wss://{}/?v=8", websocket_url);
        trace!("VGW: Connecting to {}", processed_url);

        let (websocket_send, mut websocket_receive) = WebSocketBackend::connect(&processed_url)
            .await
            .map_err(|e| VoiceGatewayError::CannotConnect {
                error: format!("{:?}", e),
            })?;

        let shared_websocket_send = Arc::new(Mutex::new(websocket_send));

        // Create a shared broadcast channel for killing all gateway tasks
        let (kill_send, _kill_receive) = tokio::sync::broadcast::channel::<()>(16);

        let (event_sink, event_receive) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        // Wait for the first hello and then spawn both tasks so we avoid nested tasks
        // This automatically spawns the heartbeat task, but from the main thread
        let msg: VoiceGatewayMessage = {
            let communication: VoiceGatewayCommunication = websocket_receive
                .next()
                .await
                .ok_or(VoiceGatewayError::CannotConnect {
                    error: "Websocket closed before sending Hello".to_string(),
                })
                .and_then(|result| {
                    result.map_err(|e| VoiceGatewayError::CannotConnect {
                        error: format!("{:?}", e),
                    })
                })?
                .into();

            match communication {
                VoiceGatewayCommunication::Message(message) => message,
                VoiceGatewayCommunication::Error(error) => return Err(error),
            }
        };

        let gateway_payload: VoiceGatewayReceivePayload =
            serde_json::from_str(&msg.0).map_err(|e| VoiceGatewayError::CannotConnect {
                error: format!("Unparseable first message: {}", e),
            })?;

        if gateway_payload.op_code != VOICE_HELLO {
            return Err(VoiceGatewayError::NonHelloOnInitiate {
                opcode: gateway_payload.op_code,
            });
        }

        info!("VGW: Received Hello");

        // The hello data for voice gateways has the interval in float milliseconds
        let gateway_hello: VoiceHelloData = serde_json::from_str(gateway_payload.data.get())
            .map_err(|e| VoiceGatewayError::CannotConnect {
                error: format!("Unparseable Hello: {}", e),
            })?;

        let heartbeat_interval_ms = if gateway_hello.heartbeat_interval.is_finite()
            && gateway_hello.heartbeat_interval >= 1.0
        {
            gateway_hello.heartbeat_interval as u64
        } else {
            DEFAULT_HEARTBEAT_INTERVAL_MS
        };

        // The session machine sees the hello too, so it can record the cadence
        event_sink
            .send(VoiceGatewayEvent::Hello(gateway_hello))
            .await
            .ok();

        let mut gateway = VoiceGateway {
            heartbeat_handler: VoiceHeartbeatHandler::new(
                Duration::from_millis(heartbeat_interval_ms),
                shared_websocket_send.clone(),
                event_sink.clone(),
                kill_send.clone(),
            ),
            event_sink,
            websocket_send: shared_websocket_send.clone(),
            websocket_receive,
            kill_send: kill_send.clone(),
            kill_receive: kill_send.subscribe(),
        };

        // Now we can continuously check for messages in a different task, since we aren't going to receive another hello
        tokio::task::spawn(async move {
            gateway.gateway_listen_task().await;
        });

        Ok((
            VoiceGatewayHandle {
                url: websocket_url.to_string(),
                websocket_send: shared_websocket_send,
                kill_send,
            },
            event_receive,
        ))
    }

    /// The main gateway listener task;
    async fn gateway_listen_task(&mut self) {
        loop {
            let msg;

            tokio::select! {
                Ok(_) = self.kill_receive.recv() => {
                    trace!("VGW: Closing listener task");
                    break;
                }
                message = self.websocket_receive.next() => {
                    msg = message;
                }
            }

            if let Some(Ok(message)) = msg {
                match message.into() {
                    VoiceGatewayCommunication::Message(message) => {
                        self.handle_message(message).await
                    }
                    VoiceGatewayCommunication::Error(close_code) => {
                        self.handle_close(close_code).await;
                        break;
                    }
                }

                continue;
            }

            // We couldn't receive the next message or it was an error, something is wrong with the websocket, close
            warn!("VGW: Websocket is broken, stopping gateway");
            self.handle_close(VoiceGatewayError::default()).await;
            break;
        }
    }

    /// Closes the websocket connection, stops all tasks and tells the
    /// session machine why.
    async fn handle_close(&mut self, error: VoiceGatewayError) {
        warn!("VGW: Received error {:?}, connection will close..", error);
        let _ = self.kill_send.send(());
        let _ = self.websocket_send.lock().await.close().await;
        let _ = self.event_sink.send(VoiceGatewayEvent::Closed(error)).await;
    }

    /// Parses a websocket message into a [VoiceGatewayEvent] and forwards it
    /// to the session machine; heartbeat bookkeeping is handled here.
    async fn handle_message(&mut self, msg: VoiceGatewayMessage) {
        if msg.0.is_empty() {
            return;
        }

        let Ok(gateway_payload) = msg.payload() else {
            if let Some(error) = msg.error() {
                self.handle_close(error).await;
            } else {
                warn!("VGW: Message unrecognised: {:?}", msg.0);
            }
            return;
        };

        // The seq field drives the heartbeat's seq_ack regardless of op
        if gateway_payload.seq.is_some() {
            let _ = self
                .heartbeat_handler
                .send
                .send(VoiceHeartbeatThreadCommunication {
                    updated_seq: gateway_payload.seq,
                    op_code: None,
                })
                .await;
        }

        // See <https://discord.com/developers/docs/topics/voice-connections>
        let event = match gateway_payload.op_code {
            VOICE_READY => {
                trace!("VGW: Received Ready");
                self.parse_event(gateway_payload.data.get(), VoiceGatewayEvent::Ready)
            }
            VOICE_SESSION_DESCRIPTION => {
                trace!("VGW: Received Session Description");
                self.parse_event(
                    gateway_payload.data.get(),
                    VoiceGatewayEvent::SessionDescription,
                )
            }
            VOICE_SPEAKING => {
                trace!("VGW: Received Speaking");
                self.parse_event(gateway_payload.data.get(), VoiceGatewayEvent::Speaking)
            }
            // We received a heartbeat from the server
            // "Discord may send the app a Heartbeat (opcode 3) event, in which case the app should send a Heartbeat event immediately."
            VOICE_HEARTBEAT => {
                trace!("VGW: Received Heartbeat // Heartbeat Request");

                let _ = self
                    .heartbeat_handler
                    .send
                    .send(VoiceHeartbeatThreadCommunication {
                        updated_seq: None,
                        op_code: Some(VOICE_HEARTBEAT),
                    })
                    .await;
                None
            }
            VOICE_HEARTBEAT_ACK => {
                trace!("VGW: Received Heartbeat ACK");

                let _ = self
                    .heartbeat_handler
                    .send
                    .send(VoiceHeartbeatThreadCommunication {
                        updated_seq: None,
                        op_code: Some(VOICE_HEARTBEAT_ACK),
                    })
                    .await;

                self.parse_event(gateway_payload.data.get(), VoiceGatewayEvent::HeartbeatAck)
            }
            VOICE_RESUMED | VOICE_CLIENT_DISCONNECT => {
                trace!("VGW: Ignoring op code ({})", gateway_payload.op_code);
                None
            }
            VOICE_IDENTIFY | VOICE_SELECT_PROTOCOL | VOICE_RESUME => {
                info!(
                    "VGW: Received unexpected opcode ({}) for current state. This might be due to a faulty server implementation.",
                    gateway_payload.op_code
                );
                None
            }
            other => {
                warn!("VGW: Received unrecognized voice gateway op code ({})", other);
                Some(VoiceGatewayEvent::Unknown(other))
            }
        };

        if let Some(event) = event {
            if self.event_sink.send(event).await.is_err() {
                // The session machine is gone, no reason to keep reading
                trace!("VGW: Event receiver dropped, closing listener");
                let _ = self.kill_send.send(());
            }
        }
    }

    /// Deserializes one payload body into an event variant, logging parse
    /// failures instead of propagating them.
    fn parse_event<'a, T: serde::Deserialize<'a>>(
        &self,
        data: &'a str,
        variant: fn(T) -> VoiceGatewayEvent,
    ) -> Option<VoiceGatewayEvent> {
        match serde_json::from_str(data) {
            Ok(parsed) => Some(variant(parsed)),
            Err(e) => {
                warn!("VGW: Failed to parse a voice gateway payload ({})", e);
                None
            }
        }
    }
}
