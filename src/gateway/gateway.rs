// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{sync::Arc, time::Duration};

use log::*;

use pubserve::Publisher;
use tokio::sync::Mutex;

use futures_util::StreamExt;

use crate::{
    errors::GatewayError,
    types::{
        GatewayInvalidSession, GatewayReconnect, HelloData, WebSocketEvent, GATEWAY_DISPATCH,
        GATEWAY_HEARTBEAT, GATEWAY_HEARTBEAT_ACK, GATEWAY_HELLO, GATEWAY_INVALID_SESSION,
        GATEWAY_RECONNECT,
    },
};

use super::{
    events::Events, heartbeat::HeartbeatHandler, GatewayHandle, GatewayMessage,
    HeartbeatThreadCommunication, Sink, Stream, WebSocketBackend,
};

#[derive(Debug)]
pub struct Gateway {
    events: Arc<Mutex<Events>>,
    heartbeat_handler: HeartbeatHandler,
    websocket_send: Arc<Mutex<Sink>>,
    websocket_receive: Stream,
    kill_send: tokio::sync::broadcast::Sender<()>,
    kill_receive: tokio::sync::broadcast::Receiver<()>,
}

impl Gateway {
    #[allow(clippy::new_ret_no_self)]
    pub async fn spawn(websocket_url: &str) -> Result<GatewayHandle, GatewayError> {
        let processed_url = format!("{}/?v=9&encoding=json", websocket_url.trim_end_matches('/'));
        trace!("GW: Connecting to {}", processed_url);

        let (websocket_send, mut websocket_receive) =
            WebSocketBackend::connect(&processed_url).await?;

        let shared_websocket_send = Arc::new(Mutex::new(websocket_send));

        // Create a shared broadcast channel for killing all gateway tasks
        let (kill_send, _kill_receive) = tokio::sync::broadcast::channel::<()>(16);

        // Wait for the first hello and then spawn both tasks so we avoid nested tasks
        // This automatically spawns the heartbeat task, but from the main thread
        let Some(Ok(message)) = websocket_receive.next().await else {
            return Err(GatewayError::CannotConnect {
                error: "Websocket closed before sending Hello".to_string(),
            });
        };
        let message: GatewayMessage = message.into();
        let gateway_payload = message.payload().map_err(|e| GatewayError::CannotConnect {
            error: format!("Unparseable first message: {}", e),
        })?;

        if gateway_payload.op_code != GATEWAY_HELLO {
            return Err(GatewayError::NonHelloOnInitiate {
                opcode: gateway_payload.op_code,
            });
        }

        info!("GW: Received Hello");

        let hello_data = gateway_payload
            .event_data
            .ok_or(GatewayError::CannotConnect {
                error: "Hello carried no data".to_string(),
            })?;
        let gateway_hello: HelloData =
            serde_json::from_str(hello_data.get()).map_err(|e| GatewayError::CannotConnect {
                error: format!("Unparseable Hello: {}", e),
            })?;

        let events = Events::default();
        let shared_events = Arc::new(Mutex::new(events));

        let mut gateway = Gateway {
            events: shared_events.clone(),
            heartbeat_handler: HeartbeatHandler::new(
                Duration::from_millis(gateway_hello.heartbeat_interval),
                shared_websocket_send.clone(),
                kill_send.subscribe(),
            ),
            websocket_send: shared_websocket_send.clone(),
            websocket_receive,
            kill_send: kill_send.clone(),
            kill_receive: kill_send.subscribe(),
        };

        // Now we can continuously check for messages in a different task, since we aren't going to receive another hello
        tokio::task::spawn(async move {
            gateway.gateway_listen_task().await;
        });

        Ok(GatewayHandle {
            url: websocket_url.to_string(),
            events: shared_events,
            websocket_send: shared_websocket_send,
            kill_send,
        })
    }

    /// The main gateway listener task;
    async fn gateway_listen_task(&mut self) {
        loop {
            let msg;

            tokio::select! {
                Ok(_) = self.kill_receive.recv() => {
                    trace!("GW: Closing listener task");
                    break;
                }
                message = self.websocket_receive.next() => {
                    msg = message;
                }
            }

            if let Some(Ok(message)) = msg {
                self.handle_message(message.into()).await;
                continue;
            }

            // We couldn't receive the next message or it was an error, something is wrong with the websocket, close
            warn!("GW: Websocket is broken, stopping gateway");
            self.events
                .lock()
                .await
                .error
                .publish(GatewayError::Unknown)
                .await;
            break;
        }
    }

    /// Closes the websocket connection and stops all tasks
    async fn close(&mut self) {
        let _ = self.kill_send.send(());
        let _ = futures_util::SinkExt::close(&mut *self.websocket_send.lock().await).await;
    }

    /// Deserializes and publishes a dispatched event, when we already know its type;
    /// (Called for every dispatch we consume in handle_message)
    async fn handle_event<'a, T: WebSocketEvent + serde::Deserialize<'a>>(
        data: &'a str,
        event: &mut Publisher<T>,
    ) -> Result<(), serde_json::Error> {
        let data_deserialize_result: Result<T, serde_json::Error> = serde_json::from_str(data);
        event.publish(data_deserialize_result?).await;
        Ok(())
    }

    /// This handles a message as a websocket event and updates its events along with the events' observers
    async fn handle_message(&mut self, msg: GatewayMessage) {
        if msg.0.is_empty() {
            return;
        }

        let Ok(gateway_payload) = msg.payload() else {
            warn!("GW: Message unrecognised: {:?}", msg.0);
            return;
        };

        // The voice core only consumes a handful of dispatches; the rest of
        // the protocol surface is outside this crate.
        match gateway_payload.op_code {
            GATEWAY_DISPATCH => {
                let Some(event_name) = gateway_payload.event_name.as_deref() else {
                    warn!("GW: Received dispatch without event name");
                    return;
                };

                let Some(raw_data) = gateway_payload.event_data else {
                    warn!("GW: Received {} dispatch without data", event_name);
                    return;
                };

                let mut events = self.events.lock().await;

                let result = match event_name {
                    "READY" => {
                        trace!("GW: Received READY");
                        Gateway::handle_event(raw_data.get(), &mut events.ready).await
                    }
                    "VOICE_STATE_UPDATE" => {
                        trace!("GW: Received VOICE_STATE_UPDATE");
                        Gateway::handle_event(raw_data.get(), &mut events.voice_state_update).await
                    }
                    "VOICE_SERVER_UPDATE" => {
                        trace!("GW: Received VOICE_SERVER_UPDATE");
                        Gateway::handle_event(raw_data.get(), &mut events.voice_server_update).await
                    }
                    _ => {
                        trace!("GW: Ignoring dispatch {}", event_name);
                        Ok(())
                    }
                };

                if let Err(e) = result {
                    warn!("GW: Failed to parse {} dispatch ({})", event_name, e);
                }
            }
            GATEWAY_HEARTBEAT => {
                trace!("GW: Received Heartbeat // Heartbeat Request");

                // Tell the heartbeat handler it should send a heartbeat right away
                let heartbeat_communication = HeartbeatThreadCommunication {
                    sequence_number: gateway_payload.sequence_number,
                    op_code: Some(GATEWAY_HEARTBEAT),
                };

                let _ = self
                    .heartbeat_handler
                    .send
                    .send(heartbeat_communication)
                    .await;
            }
            GATEWAY_HEARTBEAT_ACK => {
                trace!("GW: Received Heartbeat ACK");

                let heartbeat_communication = HeartbeatThreadCommunication {
                    sequence_number: None,
                    op_code: Some(GATEWAY_HEARTBEAT_ACK),
                };

                let _ = self
                    .heartbeat_handler
                    .send
                    .send(heartbeat_communication)
                    .await;
            }
            GATEWAY_RECONNECT => {
                info!("GW: Received Reconnect, connection will close..");
                self.close().await;
                self.events
                    .lock()
                    .await
                    .reconnect
                    .publish(GatewayReconnect)
                    .await;
            }
            GATEWAY_INVALID_SESSION => {
                let resumable = gateway_payload
                    .event_data
                    .and_then(|d| serde_json::from_str::<bool>(d.get()).ok())
                    .unwrap_or(false);

                info!(
                    "GW: Received Invalid Session (resumable: {}), connection will close..",
                    resumable
                );
                self.close().await;
                self.events
                    .lock()
                    .await
                    .invalid_session
                    .publish(GatewayInvalidSession { resumable })
                    .await;
            }
            _ => {
                trace!(
                    "GW: Ignoring received op code ({})",
                    gateway_payload.op_code
                );
            }
        }

        // The sequence number drives the heartbeat's seq field regardless of
        // which op carried it.
        if gateway_payload.sequence_number.is_some() {
            let heartbeat_communication = HeartbeatThreadCommunication {
                sequence_number: gateway_payload.sequence_number,
                op_code: None,
            };

            let _ = self
                .heartbeat_handler
                .send
                .send(heartbeat_communication)
                .await;
        }
    }
}
