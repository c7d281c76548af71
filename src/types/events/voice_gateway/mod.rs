// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::WebSocketEvent;
use serde::{Deserialize, Serialize};
use serde_json::{value::RawValue, Value};

pub use heartbeat::*;
pub use hello::*;
pub use identify::*;
pub use ready::*;
pub use select_protocol::*;
pub use session_description::*;
pub use speaking::*;

mod heartbeat;
mod hello;
mod identify;
mod ready;
mod select_protocol;
mod session_description;
mod speaking;

#[derive(Debug, Default, Serialize, Clone)]
/// The payload used for sending events to the voice gateway.
///
/// Similar to [VoiceGatewayReceivePayload], except we send a [Value] for d whilst we receive a [serde_json::value::RawValue]
pub struct VoiceGatewaySendPayload {
    #[serde(rename = "op")]
    pub op_code: u8,

    #[serde(rename = "d")]
    pub data: Value,
}

impl WebSocketEvent for VoiceGatewaySendPayload {}

#[derive(Debug, Deserialize, Clone)]
/// The payload used for receiving events from the voice gateway.
///
/// Note that this is similar to the regular gateway, except we have a seq
/// counter instead of s and no t
pub struct VoiceGatewayReceivePayload<'a> {
    #[serde(rename = "op")]
    pub op_code: u8,

    #[serde(borrow)]
    #[serde(rename = "d")]
    pub data: &'a RawValue,

    /// The sequence number of this payload, echoed back in heartbeats as
    /// seq_ack. Only present on payloads the server considers resumable.
    #[serde(default)]
    pub seq: Option<u64>,
}

impl<'a> WebSocketEvent for VoiceGatewayReceivePayload<'a> {}

/// The modes of encryption available in voice UDP connections;
///
/// Only [VoiceEncryptionMode::Xsalsa20Poly1305Lite] is implemented: its
/// nonces are cheap to derive on both directions and every voice backend
/// offers it. The remaining variants exist so a Ready payload listing them
/// still deserializes.
///
/// See <https://discord.com/developers/docs/topics/voice-connections#transport-encryption-modes>
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoiceEncryptionMode {
    /// Use XSalsa20Poly1305 encryption, using the rtp header as a nonce.
    Xsalsa20Poly1305,
    /// Use XSalsa20Poly1305 encryption, using a random 24 byte suffix as a nonce.
    Xsalsa20Poly1305Suffix,
    #[default]
    /// Use XSalsa20Poly1305 encryption, using a 4 byte incremental value as a
    /// nonce, carried inline after the ciphertext.
    Xsalsa20Poly1305Lite,
    Xsalsa20Poly1305LiteRtpsize,
    AeadAes256Gcm,
    AeadAes256GcmRtpsize,
    AeadXchacha20Poly1305Rtpsize,
}

impl VoiceEncryptionMode {
    /// Whether this library can seal and open packets in this mode.
    pub fn is_supported(&self) -> bool {
        *self == VoiceEncryptionMode::Xsalsa20Poly1305Lite
    }
}

// The various voice opcodes
pub const VOICE_IDENTIFY: u8 = 0;
pub const VOICE_SELECT_PROTOCOL: u8 = 1;
pub const VOICE_READY: u8 = 2;
pub const VOICE_HEARTBEAT: u8 = 3;
pub const VOICE_SESSION_DESCRIPTION: u8 = 4;
pub const VOICE_SPEAKING: u8 = 5;
pub const VOICE_HEARTBEAT_ACK: u8 = 6;
pub const VOICE_RESUME: u8 = 7;
pub const VOICE_HELLO: u8 = 8;
pub const VOICE_RESUMED: u8 = 9;
pub const VOICE_CLIENT_DISCONNECT: u8 = 13;
