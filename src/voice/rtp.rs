// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rtp framing: the fixed 12 byte header we emit, validation of received
//! headers and stripping of the one byte header extension Discord prepends
//! to some opus payloads.

use discortp::rtp::{MutableRtpPacket, Rtp, RtpType};

/// See <https://discord.com/developers/docs/topics/voice-connections#voice-packet-structure>
/// This always adds up to 12 bytes
pub const RTP_HEADER_SIZE: usize = 12;

/// The rtp version both directions use.
pub const RTP_VERSION: u8 = 2;

/// The dynamic payload type Discord uses for opus audio.
pub const PAYLOAD_TYPE_OPUS: u8 = 120;

/// The one byte header extension profile marker.
///
/// See <https://www.rfc-editor.org/rfc/rfc8285#section-4.2>
const EXTENSION_PROFILE_ONE_BYTE: [u8; 2] = [0xBE, 0xDE];

/// Builds the full unencrypted rtp packet bytes for one opus frame.
///
/// Marker and csrc are always zero; version, payload type, sequence,
/// timestamp and ssrc vary per session and frame.
pub fn build_packet(sequence: u16, timestamp: u32, ssrc: u32, opus_payload: Vec<u8>) -> Vec<u8> {
    let payload_len = opus_payload.len();

    let rtp_data = Rtp {
        // Always the same
        version: RTP_VERSION,
        padding: 0,
        extension: 0,
        csrc_count: 0,
        csrc_list: Vec::new(),
        marker: 0,
        payload_type: RtpType::Dynamic(PAYLOAD_TYPE_OPUS),
        // Actually variable
        sequence: sequence.into(),
        timestamp: timestamp.into(),
        ssrc,
        payload: opus_payload,
    };

    let mut buffer = vec![0; RTP_HEADER_SIZE + payload_len];

    // Safety: the buffer is sized off the payload we are about to write
    let mut rtp_packet = MutableRtpPacket::new(&mut buffer)
        .expect("Mangled rtp packet creation buffer, something is very wrong.");
    rtp_packet.populate(&rtp_data);

    buffer
}

/// Whether a datagram is plausibly rtp audio: long enough for a header and
/// carrying the version this library speaks.
pub fn is_rtp(datagram: &[u8]) -> bool {
    datagram.len() >= RTP_HEADER_SIZE && (datagram[0] >> 6) == RTP_VERSION
}

/// Strips a one byte rtp header extension from a decrypted payload.
///
/// If the payload starts with the 0xBEDE profile marker, the 16 bit length
/// field counts 32 bit words of extension data; those are skipped along with
/// the 4 byte extension header, and any zero padding that follows. Payloads
/// without the marker are returned unchanged.
pub fn strip_one_byte_extension(payload: &[u8]) -> &[u8] {
    if payload.len() < 4 || payload[0..2] != EXTENSION_PROFILE_ONE_BYTE {
        return payload;
    }

    let words = u16::from_be_bytes([payload[2], payload[3]]) as usize;
    let extension_end = 4 + words * 4;
    if extension_end >= payload.len() {
        return &[];
    }

    let mut rest = &payload[extension_end..];
    while let Some((0, tail)) = rest.split_first() {
        rest = tail;
    }
    rest
}

#[cfg(test)]
mod rtp {
    use super::*;

    fn extend_with_extension(opus: &[u8]) -> Vec<u8> {
        let mut payload = vec![0xBE, 0xDE, 0x00, 0x02];
        payload.extend_from_slice(&[0x51, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00]);
        payload.extend_from_slice(opus);
        payload
    }

    #[test]
    fn test_build_packet_layout() {
        let packet = build_packet(0xABCD, 0x01020304, 0x11223344, vec![0xFC; 5]);

        assert_eq!(packet.len(), 17);
        // version 2, no padding, no extension, no csrc
        assert_eq!(packet[0], 0x80);
        // no marker, payload type 120
        assert_eq!(packet[1], 0x78);
        assert_eq!(&packet[2..4], &[0xAB, 0xCD]);
        assert_eq!(&packet[4..8], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&packet[8..12], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(&packet[12..], &[0xFC; 5]);
    }

    #[test]
    fn test_is_rtp() {
        let packet = build_packet(7, 45110, 1, vec![0xFC; 3]);
        assert!(is_rtp(&packet));

        // Too short
        assert!(!is_rtp(&packet[0..11]));

        // Wrong version
        let mut wrong_version = packet.clone();
        wrong_version[0] = 0x40;
        assert!(!is_rtp(&wrong_version));

        // An ip discovery response starts with 0x0001, so version 0
        let mut discovery = vec![0u8; 74];
        discovery[1] = 0x01;
        assert!(!is_rtp(&discovery));
    }

    #[test]
    fn test_strip_extension_round_trip() {
        let opus = [0xFC, 0x01, 0x02, 0x03];
        let payload = extend_with_extension(&opus);
        assert_eq!(strip_one_byte_extension(&payload), &opus);
    }

    #[test]
    fn test_strip_without_marker_is_identity() {
        let opus = [0xFC, 0x01, 0x02, 0x03];
        assert_eq!(strip_one_byte_extension(&opus), &opus);
    }

    #[test]
    fn test_strip_skips_extension_padding() {
        let opus = [0xFC, 0x42];
        let mut payload = vec![0xBE, 0xDE, 0x00, 0x01, 0x10, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&[0x00, 0x00]);
        payload.extend_from_slice(&opus);
        assert_eq!(strip_one_byte_extension(&payload), &opus);
    }

    #[test]
    fn test_strip_truncated_extension_yields_empty() {
        let payload = vec![0xBE, 0xDE, 0x00, 0x08, 0x01, 0x02];
        assert_eq!(strip_one_byte_extension(&payload), &[] as &[u8]);
    }
}
