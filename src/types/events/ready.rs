// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::types::events::WebSocketEvent;
use crate::types::Snowflake;

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
/// Received after identifying, provides initial user information and the
/// session id the voice machinery later authenticates with.
///
/// The full READY payload carries much more; only the fields the voice core
/// needs are deserialized here.
///
/// See <https://discord.com/developers/docs/topics/gateway-events#ready>
pub struct GatewayReady {
    /// The connected user
    pub user: PartialUser,
    /// Unique session ID, used for resuming connections and for the voice
    /// identify
    pub session_id: String,
    /// WebSocket URL for resuming connections
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

impl WebSocketEvent for GatewayReady {}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
/// The subset of a user object the voice core cares about.
pub struct PartialUser {
    pub id: Snowflake,
    #[serde(default)]
    pub username: Option<String>,
}
