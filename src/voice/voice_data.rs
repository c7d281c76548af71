// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use crate::types::{
    SessionDescription, Snowflake, VoiceEncryptionMode, VoiceReady, VoiceServerUpdate,
};

/// The lifecycle states of a voice session.
///
/// States only ever advance (or jump to Closed); the session machine in
/// [crate::voice::handler] is the sole writer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoiceSessionState {
    #[default]
    Idle,
    /// Waiting for the VOICE_STATE_UPDATE / VOICE_SERVER_UPDATE pair
    AwaitingGateway,
    /// Voice websocket connect in progress
    WsConnecting,
    /// Identify sent, waiting for Ready
    Identifying,
    /// Udp socket created, ip discovery in flight
    Discovering,
    /// Select protocol sent, waiting for the session description
    Selecting,
    /// Session key sealed; audio may flow both ways
    Active,
    /// Terminal
    Closed,
}

/// The external address and port the voice server sees for our UDP flow,
/// learned through ip discovery and echoed back in Select Protocol.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveredAddress {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Default)]
/// Saves data shared between parts of the voice architecture;
///
/// Holds everything the handshake accumulates, plus the send-side counters
/// the encode pipeline advances per frame.
pub struct VoiceData {
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub session_id: String,
    pub server_data: Option<VoiceServerUpdate>,
    pub ready_data: Option<VoiceReady>,
    pub session_description: Option<SessionDescription>,
    pub encryption_mode: VoiceEncryptionMode,
    pub ip_discovery: Option<DiscoveredAddress>,

    /// The last rtp sequence number we used, incremented by one for every
    /// frame we send. Wraps at u16::MAX.
    pub last_sequence_number: u16,
    /// The last rtp timestamp we used, incremented by 960 for every frame.
    /// Wraps at u32::MAX.
    pub last_rtp_timestamp: u32,
    /// The send nonce counter. Starts aligned with the sequence number but
    /// keeps its full u32 width past the u16 wrap, so no nonce tail repeats
    /// within a session.
    pub nonce_counter: u32,

    /// Whether we currently announce ourselves as speaking.
    pub speaking: bool,
    /// The heartbeat cadence the Hello payload prescribed, in milliseconds.
    pub heartbeat_interval_ms: u64,
}

impl VoiceData {
    /// The session key, once op 4 has sealed the handshake.
    pub fn secret_key(&self) -> Option<[u8; 32]> {
        self.session_description
            .as_ref()
            .map(|description| description.secret_key)
    }

    /// Our assigned ssrc, once op 2 has arrived.
    pub fn ssrc(&self) -> Option<u32> {
        self.ready_data.as_ref().map(|ready| ready.ssrc)
    }
}

/// One resolved speaker identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerBinding {
    pub user_id: Snowflake,
    pub display_name: Option<String>,
}

/// The ssrc to user map, populated from op 5 speaking events.
///
/// Written only by the session machine, read by the receive side; updates
/// are rare enough that a coarse lock around this map is fine.
#[derive(Debug, Default)]
pub struct SsrcMap {
    bindings: HashMap<u32, SpeakerBinding>,
}

impl SsrcMap {
    /// Records or refreshes a binding. A speaking event with speaking == 0
    /// still identifies the ssrc, so every event updates the map.
    pub fn bind(&mut self, ssrc: u32, user_id: Snowflake, display_name: Option<String>) {
        let binding = self.bindings.entry(ssrc).or_insert(SpeakerBinding {
            user_id,
            display_name: None,
        });
        binding.user_id = user_id;
        if display_name.is_some() {
            binding.display_name = display_name;
        }
    }

    pub fn get(&self, ssrc: u32) -> Option<&SpeakerBinding> {
        self.bindings.get(&ssrc)
    }

    /// The number of distinct users currently bound to an ssrc.
    pub fn speaker_count(&self) -> usize {
        let mut users: Vec<Snowflake> = self.bindings.values().map(|b| b.user_id).collect();
        users.sort_unstable();
        users.dedup();
        users.len()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod voice_data {
    use super::*;

    #[test]
    fn test_state_ordering() {
        assert!(VoiceSessionState::Idle < VoiceSessionState::Active);
        assert!(VoiceSessionState::Discovering < VoiceSessionState::Selecting);
        assert!(VoiceSessionState::Active < VoiceSessionState::Closed);
    }

    #[test]
    fn test_ssrc_map_binding() {
        let mut map = SsrcMap::default();
        map.bind(300, Snowflake(1), None);
        map.bind(300, Snowflake(1), Some("muffin".to_string()));
        map.bind(301, Snowflake(1), None);
        map.bind(302, Snowflake(2), None);

        assert_eq!(map.get(300).unwrap().display_name.as_deref(), Some("muffin"));
        // Two ssrcs may point at the same user
        assert_eq!(map.speaker_count(), 2);
    }
}
