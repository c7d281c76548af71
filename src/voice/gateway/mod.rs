// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The voice gateway websocket: carries the handshake (identify, ready,
//! select protocol, session description), speaking updates and heartbeats.
//!
//! Every inbound payload is parsed into one [VoiceGatewayEvent] variant and
//! handed to the session machine over a channel; the session machine in
//! [crate::voice::handler] is a state machine over that union.

pub mod gateway;
pub mod handle;
pub mod heartbeat;
pub mod message;

pub use gateway::*;
pub use handle::*;
pub use message::*;

use crate::errors::VoiceGatewayError;
use crate::types::{
    Speaking, SessionDescription, VoiceHeartbeatAck, VoiceHelloData, VoiceReady,
};

/// The inbound half of the voice gateway protocol as a tagged union.
///
/// Ops that this library does not act on (client connect, media sink wants,
/// platform metadata..) surface as [VoiceGatewayEvent::Unknown] so the
/// session machine can log and ignore them in one place.
#[derive(Debug, Clone)]
pub enum VoiceGatewayEvent {
    /// Op 2, in response to our identify
    Ready(VoiceReady),
    /// Op 4, seals the handshake with the session key
    SessionDescription(SessionDescription),
    /// Op 5, a peer's speaking update carrying an ssrc to user binding
    Speaking(Speaking),
    /// Op 8, starts the heartbeat
    Hello(VoiceHelloData),
    /// Op 6
    HeartbeatAck(VoiceHeartbeatAck),
    /// An op this library ignores
    Unknown(u8),
    /// The websocket closed or became unusable; terminal
    Closed(VoiceGatewayError),
}
