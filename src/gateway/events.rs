// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use pubserve::Publisher;

use crate::errors::GatewayError;
use crate::types::{
    GatewayInvalidSession, GatewayReady, GatewayReconnect, VoiceServerUpdate, VoiceStateUpdate,
};

#[derive(Default, Debug)]
/// The observable events of a main gateway connection.
///
/// Only the dispatches the voice core consumes are parsed into full types;
/// everything else is logged and dropped in the listen task.
pub struct Events {
    pub ready: Publisher<GatewayReady>,
    pub voice_state_update: Publisher<VoiceStateUpdate>,
    pub voice_server_update: Publisher<VoiceServerUpdate>,
    pub invalid_session: Publisher<GatewayInvalidSession>,
    pub reconnect: Publisher<GatewayReconnect>,
    pub error: Publisher<GatewayError>,
}
