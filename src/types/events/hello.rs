// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::types::events::WebSocketEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq)]
/// Received on gateway init, tells the client how often to send heartbeats.
pub struct HelloData {
    /// How often a client should send heartbeats, in milliseconds
    pub heartbeat_interval: u64,
}

impl WebSocketEvent for HelloData {}
