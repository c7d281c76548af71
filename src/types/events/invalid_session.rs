// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::types::events::WebSocketEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
/// Received when the server invalidates our session (op 9).
///
/// The d field is a lone boolean indicating whether the session is resumable.
/// Any active voice session must be torn down before reconnecting.
///
/// See <https://discord.com/developers/docs/topics/gateway-events#invalid-session>
pub struct GatewayInvalidSession {
    pub resumable: bool,
}

impl WebSocketEvent for GatewayInvalidSession {}
