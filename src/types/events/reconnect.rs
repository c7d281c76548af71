// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::types::events::WebSocketEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
/// Received when the server wants us to reconnect (op 7) and resume.
///
/// Carries no data; any active voice session must be torn down before
/// reconnecting.
pub struct GatewayReconnect;

impl WebSocketEvent for GatewayReconnect {}
