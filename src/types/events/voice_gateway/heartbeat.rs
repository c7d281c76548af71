// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::types::WebSocketEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
/// The heartbeat the client sends to the voice gateway (op 3).
///
/// See <https://discord.com/developers/docs/topics/voice-connections#heartbeating>
pub struct VoiceHeartbeat {
    /// A strictly increasing unix timestamp in milliseconds, echoed back in
    /// the ack.
    pub t: u64,
    /// The last sequence number we observed on a received payload.
    pub seq_ack: Option<u64>,
}

impl WebSocketEvent for VoiceHeartbeat {}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
/// The ack the voice gateway sends in response to [VoiceHeartbeat] (op 6),
/// echoing the timestamp back.
pub struct VoiceHeartbeatAck {
    pub t: u64,
}

impl WebSocketEvent for VoiceHeartbeatAck {}
