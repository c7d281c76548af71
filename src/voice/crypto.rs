// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Defines cryptography functions used within the voice implementation.
//!
//! Only the xsalsa20_poly1305_lite construction is implemented. Its 24 byte
//! nonces differ per direction: sends derive the nonce from our packet
//! counter, receives reconstruct it from the rtp header and the 4 byte tail
//! the peer appended after the ciphertext.

use crypto_secretbox::aead::Aead;
use crypto_secretbox::cipher::generic_array::GenericArray;
use crypto_secretbox::{KeyInit, XSalsa20Poly1305};

use crate::errors::VoiceUdpError;
use crate::voice::rtp::RTP_HEADER_SIZE;

/// The length of the inline nonce suffix carried after the ciphertext.
pub(crate) const NONCE_TAIL_SIZE: usize = 4;

/// Gets an `xsalsa20_poly1305_lite` send nonce for the given packet counter.
///
/// The first four bytes are the big-endian counter, the rest is zero. The
/// same four bytes are appended to the packet after the ciphertext, so the
/// receiving side can reconstruct this nonce.
pub(crate) fn get_lite_send_nonce(counter: u32) -> [u8; 24] {
    let mut nonce = [0u8; 24];
    nonce[0..NONCE_TAIL_SIZE].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// Gets an `xsalsa20_poly1305_lite` receive nonce from a full rtp packet.
///
/// The packet's trailing 4 bytes are the peer's counter; the nonce is those
/// bytes followed by zeros, mirroring [get_lite_send_nonce]. Sealing with
/// counter `s` and opening the resulting packet round-trips exactly when
/// the tail is the big-endian encoding of `s`.
pub(crate) fn get_lite_receive_nonce(packet: &[u8]) -> [u8; 24] {
    let mut nonce = [0u8; 24];
    nonce[0..NONCE_TAIL_SIZE]
        .copy_from_slice(&packet[(packet.len() - NONCE_TAIL_SIZE)..packet.len()]);
    nonce
}

/// Seals an rtp payload under the session key, returning ciphertext with the
/// 4 byte nonce tail already appended.
pub(crate) fn seal_lite(
    key: &[u8; 32],
    counter: u32,
    plaintext: &[u8],
) -> Result<Vec<u8>, VoiceUdpError> {
    let nonce_bytes = get_lite_send_nonce(counter);

    let sealer = XSalsa20Poly1305::new(GenericArray::from_slice(key));

    // Note: this may seem like we are throwing away valuable error handling
    // data, but the aead error provides no extra info.
    let mut sealed = sealer
        .encrypt(GenericArray::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| VoiceUdpError::FailedEncryption)?;

    sealed.extend_from_slice(&nonce_bytes[0..NONCE_TAIL_SIZE]);

    Ok(sealed)
}

/// Opens a full rtp packet sealed by a peer, returning the plaintext payload.
///
/// Expects `packet` to be the entire datagram: 12 byte header, ciphertext,
/// 4 byte nonce tail.
pub(crate) fn open_lite(key: &[u8; 32], packet: &[u8]) -> Result<Vec<u8>, VoiceUdpError> {
    if packet.len() < RTP_HEADER_SIZE + NONCE_TAIL_SIZE {
        return Err(VoiceUdpError::FailedDecryption);
    }

    let nonce_bytes = get_lite_receive_nonce(packet);
    let ciphertext = &packet[RTP_HEADER_SIZE..packet.len() - NONCE_TAIL_SIZE];

    let opener = XSalsa20Poly1305::new(GenericArray::from_slice(key));

    opener
        .decrypt(GenericArray::from_slice(&nonce_bytes), ciphertext)
        .map_err(|_| VoiceUdpError::FailedDecryption)
}

#[cfg(test)]
mod crypto {
    use super::*;

    #[test]
    // Asserts the nonce layouts against hand-built packet bytes
    fn test_packet_nonce_derives() {
        let mut test_packet_bytes = vec![
            0x80, 0x78, 0x00, 0x07, 0x00, 0x00, 0xb0, 0x36, 0x00, 0x04, 0x55, 0x24,
        ];
        test_packet_bytes.extend_from_slice(&[0xAA; 32]);
        test_packet_bytes.extend_from_slice(&[0x00, 0x00, 0x01, 0x02]);

        let send_nonce = get_lite_send_nonce(258);
        let mut send_expected = [0u8; 24];
        send_expected[2] = 1;
        send_expected[3] = 2;
        assert_eq!(send_nonce, send_expected);

        let receive_nonce = get_lite_receive_nonce(&test_packet_bytes);
        let mut receive_expected = [0u8; 24];
        receive_expected[0..4].copy_from_slice(&[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(receive_nonce, receive_expected);

        // Sealing with counter s and reading the nonce back off the packet
        // must agree
        assert_eq!(get_lite_send_nonce(258), receive_nonce);
    }

    #[test]
    // A payload sealed with counter s must open under the receive nonce iff
    // the packet's tail is the big-endian encoding of s.
    fn test_seal_open_round_trip() {
        let key = [7u8; 32];
        let payload = vec![0xde, 0xca, 0x12, 0x34, 0x56];

        let sequence: u16 = 0xFFFF;
        let sealed = seal_lite(&key, sequence as u32, &payload).unwrap();
        assert_eq!(&sealed[sealed.len() - 4..], &[0x00, 0x00, 0xFF, 0xFF]);

        // Reassemble the full datagram the way the wire would carry it
        let mut packet = vec![
            0x80, 0x78, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
        ];
        packet.extend_from_slice(&sealed);

        let opened = open_lite(&key, &packet).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn test_open_rejects_wrong_tail() {
        let key = [7u8; 32];
        let sealed = seal_lite(&key, 41, b"frame").unwrap();

        let mut packet = vec![0x80, 0x78, 0, 41, 0, 0, 0, 0, 0, 0, 0, 1];
        packet.extend_from_slice(&sealed);
        let last = packet.len() - 1;
        packet[last] = packet[last].wrapping_add(1);

        assert_eq!(
            open_lite(&key, &packet),
            Err(VoiceUdpError::FailedDecryption)
        );
    }
}
