// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use log::*;

use futures_util::SinkExt;

use tokio::sync::Mutex;

use crate::types::{
    GatewayIdentifyPayload, GatewaySendPayload, LazyRequest, Snowflake, UpdateVoiceState,
    GATEWAY_IDENTIFY, GATEWAY_LAZY_REQUEST, GATEWAY_UPDATE_VOICE_STATE,
};

use super::{events::Events, GatewayMessage, Sink};

/// Represents a handle to a Gateway connection.
/// Using this handle you can send Gateway Events directly.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    pub url: String,
    pub events: Arc<Mutex<Events>>,
    pub websocket_send: Arc<Mutex<Sink>>,
    /// Tells gateway tasks to close
    pub(super) kill_send: tokio::sync::broadcast::Sender<()>,
}

impl GatewayHandle {
    /// Sends json to the gateway with an opcode
    async fn send_json(&self, op_code: u8, to_send: serde_json::Value) {
        let gateway_payload = GatewaySendPayload {
            op_code,
            data: to_send,
            sequence_number: None,
        };

        let payload_json = serde_json::to_string(&gateway_payload).unwrap();
        let message = GatewayMessage(payload_json);

        self.websocket_send
            .lock()
            .await
            .send(message.into())
            .await
            .unwrap();
    }

    /// Sends an identify event to the gateway
    pub async fn send_identify(&self, to_send: GatewayIdentifyPayload) {
        let to_send_value = serde_json::to_value(&to_send).unwrap();

        trace!("GW: Sending Identify..");

        self.send_json(GATEWAY_IDENTIFY, to_send_value).await;
    }

    /// Sends a voice state update (op 4) to the gateway; joining, moving or
    /// leaving a voice channel is done by setting or clearing channel_id.
    pub async fn send_update_voice_state(&self, to_send: UpdateVoiceState) {
        let to_send_value = serde_json::to_value(to_send).unwrap();

        trace!("GW: Sending Update Voice State..");

        self.send_json(GATEWAY_UPDATE_VOICE_STATE, to_send_value)
            .await;
    }

    /// Sends a guild subscribe (op 14 lazy request) for the given guild, so
    /// the server starts delivering that guild's voice state dispatches.
    pub async fn send_guild_subscribe(&self, guild_id: Snowflake) {
        let request = LazyRequest {
            guild_id,
            typing: true,
            activities: true,
            threads: true,
            ..Default::default()
        };
        let to_send_value = serde_json::to_value(&request).unwrap();

        trace!("GW: Sending Lazy Request..");

        self.send_json(GATEWAY_LAZY_REQUEST, to_send_value).await;
    }

    /// Closes the websocket connection and stops all gateway tasks;
    ///
    /// Essentially pulls the plug on the gateway, leaving it possible to resume;
    pub async fn close(&self) {
        let _ = self.kill_send.send(());
        let _ = self.websocket_send.lock().await.close().await;
    }
}
