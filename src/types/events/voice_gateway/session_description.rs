// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::VoiceEncryptionMode;
use crate::types::WebSocketEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
/// Event that seals the handshake: carries the negotiated encryption mode and
/// the session key both directions of the UDP flow are keyed with.
///
/// See <https://discord.com/developers/docs/topics/voice-connections#establishing-a-voice-udp-connection>
pub struct SessionDescription {
    /// The encryption mode to use
    #[serde(rename = "mode")]
    pub encryption_mode: VoiceEncryptionMode,
    /// The secret key we'll use for encryption
    pub secret_key: [u8; 32],
    #[serde(default)]
    pub media_session_id: Option<String>,
}

impl WebSocketEvent for SessionDescription {}
