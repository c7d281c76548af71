// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::types::events::WebSocketEvent;

#[derive(Debug, Deserialize, Serialize, Clone)]
/// The payload sent to authenticate the main gateway connection.
pub struct GatewayIdentifyPayload {
    pub token: String,
    pub properties: GatewayIdentifyConnectionProps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
}

impl GatewayIdentifyPayload {
    /// An identify with sensible connection properties; callers only need to
    /// fill in the token.
    pub fn common() -> Self {
        Self {
            token: String::new(),
            properties: GatewayIdentifyConnectionProps::default(),
            compress: Some(false),
        }
    }
}

impl WebSocketEvent for GatewayIdentifyPayload {}

#[derive(Debug, Deserialize, Serialize, Clone)]
/// The connection properties sent along with an identify.
pub struct GatewayIdentifyConnectionProps {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for GatewayIdentifyConnectionProps {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: String::from("descant"),
            device: String::from("descant"),
        }
    }
}
