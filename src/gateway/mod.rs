// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The main Discord gateway connection: dispatch parsing, heartbeating and
//! the sends the voice core needs (voice state updates and guild subscribes).

pub mod backends;
pub mod events;
pub mod gateway;
pub mod handle;
pub mod heartbeat;
pub mod message;

pub use backends::*;
pub use gateway::*;
pub use handle::*;
pub use message::*;

/// The amount of time we wait for a heartbeat ack before resending our heartbeat in ms
pub(crate) const HEARTBEAT_ACK_TIMEOUT: u64 = 2000;

/// Used for communications between the heartbeat and gateway thread.
/// Either signifies a sequence number update, a heartbeat ACK or a Heartbeat request by the server
#[derive(Clone, Copy, Debug)]
pub(crate) struct HeartbeatThreadCommunication {
    /// The opcode for the communication we received, if relevant
    pub op_code: Option<u8>,
    /// The sequence number we got from discord, if any
    pub sequence_number: Option<u64>,
}
