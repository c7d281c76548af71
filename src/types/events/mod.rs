// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use serde_json::{value::RawValue, Value};

pub use hello::*;
pub use identify::*;
pub use invalid_session::*;
pub use lazy_request::*;
pub use ready::*;
pub use reconnect::*;
pub use voice::*;
pub use voice_gateway::*;

mod hello;
mod identify;
mod invalid_session;
mod lazy_request;
mod ready;
mod reconnect;
mod voice;
pub mod voice_gateway;

/// Marker trait for types which are sent over or received from a websocket
/// connection.
pub trait WebSocketEvent: Send + Sync + std::fmt::Debug {}

#[derive(Debug, Default, Serialize, Clone)]
/// The payload used for sending events to the gateway.
///
/// Similar to [GatewayReceivePayload], except we send a [Value] for d whilst we receive a [serde_json::value::RawValue]
pub struct GatewaySendPayload {
    #[serde(rename = "op")]
    pub op_code: u8,

    #[serde(rename = "d")]
    pub data: Value,

    #[serde(rename = "s")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
}

impl WebSocketEvent for GatewaySendPayload {}

#[derive(Debug, Deserialize, Clone)]
/// The payload used for receiving events from the gateway.
///
/// Similar to [GatewaySendPayload], except we send a [Value] for d whilst we receive a [serde_json::value::RawValue]
pub struct GatewayReceivePayload<'a> {
    #[serde(rename = "op")]
    pub op_code: u8,

    #[serde(borrow)]
    #[serde(rename = "d")]
    pub event_data: Option<&'a RawValue>,

    #[serde(rename = "s")]
    pub sequence_number: Option<u64>,

    #[serde(rename = "t")]
    pub event_name: Option<String>,
}

impl<'a> WebSocketEvent for GatewayReceivePayload<'a> {}

// The various main gateway opcodes

/// Opcode received when the server dispatches a [WebSocketEvent]
pub const GATEWAY_DISPATCH: u8 = 0;
/// Opcode sent when sending a heartbeat
pub const GATEWAY_HEARTBEAT: u8 = 1;
/// Opcode sent to initiate a session
pub const GATEWAY_IDENTIFY: u8 = 2;
/// Opcode sent to update our state in vc
///
/// Like muting, deafening, leaving, joining..
pub const GATEWAY_UPDATE_VOICE_STATE: u8 = 4;
/// Opcode sent to resume a session
pub const GATEWAY_RESUME: u8 = 6;
/// Opcode received to tell the client to reconnect
pub const GATEWAY_RECONNECT: u8 = 7;
/// Opcode received to tell the client their token / session is invalid
pub const GATEWAY_INVALID_SESSION: u8 = 9;
/// Opcode received when initially connecting to the gateway, starts our heartbeat
pub const GATEWAY_HELLO: u8 = 10;
/// Opcode received to acknowledge a heartbeat
pub const GATEWAY_HEARTBEAT_ACK: u8 = 11;
/// Opcode sent to subscribe to a guild's events (Lazy Loading request)
///
/// Sent by the official client when switching to a server
pub const GATEWAY_LAZY_REQUEST: u8 = 14;
