// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Ip discovery: the 74 byte UDP handshake by which the client learns the
//! external address and port the voice server sees, for use in Select
//! Protocol.
//!
//! Both directions use the same layout: a big-endian 0x0001 type field, a
//! length field of 70, the ssrc, a NUL terminated ascii address and the
//! port in the final two bytes.

use crate::errors::VoiceUdpError;
use crate::voice::voice_data::DiscoveredAddress;

/// The full packet size, both directions.
pub const DISCOVERY_PACKET_SIZE: usize = 74;

/// The value of the length field: the packet minus type and length.
const DISCOVERY_LENGTH_FIELD: u16 = 70;

/// The type field both the request and the response carry.
const DISCOVERY_TYPE: u16 = 0x0001;

/// Where the ascii address starts.
const ADDRESS_OFFSET: usize = 8;

/// Builds the discovery request for our ssrc.
pub fn build_request(ssrc: u32) -> [u8; DISCOVERY_PACKET_SIZE] {
    let mut packet = [0u8; DISCOVERY_PACKET_SIZE];
    packet[0..2].copy_from_slice(&DISCOVERY_TYPE.to_be_bytes());
    packet[2..4].copy_from_slice(&DISCOVERY_LENGTH_FIELD.to_be_bytes());
    packet[4..8].copy_from_slice(&ssrc.to_be_bytes());
    packet
}

/// Whether a datagram is a discovery packet rather than audio.
///
/// Discovery packets must never reach the rtp path, so this check runs on
/// every received datagram before anything else.
pub fn is_discovery(datagram: &[u8]) -> bool {
    datagram.len() >= DISCOVERY_PACKET_SIZE
        && datagram[0..2] == DISCOVERY_TYPE.to_be_bytes()
}

/// Parses a discovery response into the external address and port.
pub fn parse_response(datagram: &[u8]) -> Result<DiscoveredAddress, VoiceUdpError> {
    if !is_discovery(datagram) {
        return Err(VoiceUdpError::MalformedIpDiscovery);
    }

    let address_bytes = &datagram[ADDRESS_OFFSET..datagram.len() - 2];
    let address_end = address_bytes
        .iter()
        .position(|byte| *byte == 0)
        .ok_or(VoiceUdpError::MalformedIpDiscovery)?;

    let address = std::str::from_utf8(&address_bytes[0..address_end])
        .map_err(|_| VoiceUdpError::MalformedIpDiscovery)?
        .to_string();

    if address.is_empty() {
        return Err(VoiceUdpError::MalformedIpDiscovery);
    }

    let port = u16::from_be_bytes([datagram[datagram.len() - 2], datagram[datagram.len() - 1]]);

    Ok(DiscoveredAddress { address, port })
}

#[cfg(test)]
mod discovery {
    use super::*;

    fn fake_response(address: &str, port: u16, ssrc: u32) -> Vec<u8> {
        let mut packet = build_request(ssrc).to_vec();
        packet[ADDRESS_OFFSET..ADDRESS_OFFSET + address.len()]
            .copy_from_slice(address.as_bytes());
        let len = packet.len();
        packet[len - 2..].copy_from_slice(&port.to_be_bytes());
        packet
    }

    #[test]
    fn test_request_layout() {
        let request = build_request(0xDEADBEEF);
        assert_eq!(request.len(), 74);
        assert_eq!(&request[0..2], &[0x00, 0x01]);
        assert_eq!(&request[2..4], &[0x00, 70]);
        assert_eq!(&request[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(request[8..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn test_response_round_trip() {
        let response = fake_response("203.0.113.7", 50041, 12345);
        let parsed = parse_response(&response).unwrap();
        assert_eq!(parsed.address, "203.0.113.7");
        assert_eq!(parsed.port, 50041);
    }

    #[test]
    fn test_discovery_is_not_audio() {
        let response = fake_response("198.51.100.1", 4000, 1);
        assert!(is_discovery(&response));
        assert!(!crate::voice::rtp::is_rtp(&response));
    }

    #[test]
    fn test_short_packets_are_not_discovery() {
        assert!(!is_discovery(&[0x00, 0x01, 0x00, 70]));
        // Audio is not discovery either
        let rtp = crate::voice::rtp::build_packet(1, 960, 5, vec![0xFC; 80]);
        assert!(!is_discovery(&rtp));
    }

    #[test]
    fn test_response_without_nul_is_malformed() {
        let mut response = fake_response("192.0.2.1", 9, 1);
        for byte in response[ADDRESS_OFFSET..DISCOVERY_PACKET_SIZE - 2].iter_mut() {
            *byte = b'x';
        }
        assert_eq!(
            parse_response(&response),
            Err(VoiceUdpError::MalformedIpDiscovery)
        );
    }
}
