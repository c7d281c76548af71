// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{errors::VoiceGatewayError, types::VoiceGatewayReceivePayload};

/// Represents a message received from the voice websocket connection.
///
/// This will be either a [VoiceGatewayReceivePayload], containing voice
/// gateway events, or a [VoiceGatewayError].
///
/// This struct is used internally when handling messages.
#[derive(Clone, Debug)]
pub struct VoiceGatewayMessage(pub String);

impl VoiceGatewayMessage {
    /// Parses the message as an error;
    /// Returns the error if successfully parsed, None if the message isn't an error
    pub fn error(&self) -> Option<VoiceGatewayError> {
        // Some error strings have dots on the end, which we don't care about
        let processed_content = self.0.to_lowercase().replace('.', "");

        match processed_content.as_str() {
            "unknown opcode" | "4001" => Some(VoiceGatewayError::UnknownOpcode),
            "decode error" | "failed to decode payload" | "4002" => {
                Some(VoiceGatewayError::FailedToDecodePayload)
            }
            "not authenticated" | "4003" => Some(VoiceGatewayError::NotAuthenticated),
            "authentication failed" | "4004" => Some(VoiceGatewayError::AuthenticationFailed),
            "already authenticated" | "4005" => Some(VoiceGatewayError::AlreadyAuthenticated),
            "session is no longer valid" | "4006" => Some(VoiceGatewayError::SessionNoLongerValid),
            "session timeout" | "4009" => Some(VoiceGatewayError::SessionTimeout),
            "server not found" | "4011" => Some(VoiceGatewayError::ServerNotFound),
            "unknown protocol" | "4012" => Some(VoiceGatewayError::UnknownProtocol),
            "disconnected" | "4014" => Some(VoiceGatewayError::Disconnected),
            "voice server crashed" | "4015" => Some(VoiceGatewayError::VoiceServerCrashed),
            "unknown encryption mode" | "4016" => Some(VoiceGatewayError::UnknownEncryptionMode),
            _ => None,
        }
    }

    /// Parses the message as a payload;
    /// Returns a result of deserializing
    pub fn payload(&self) -> Result<VoiceGatewayReceivePayload, serde_json::Error> {
        serde_json::from_str(&self.0)
    }
}

/// Either a message or a close error from the websocket.
#[derive(Clone, Debug)]
pub enum VoiceGatewayCommunication {
    Message(VoiceGatewayMessage),
    Error(VoiceGatewayError),
}

impl From<tokio_tungstenite::tungstenite::Message> for VoiceGatewayCommunication {
    fn from(value: tokio_tungstenite::tungstenite::Message) -> Self {
        match value {
            tokio_tungstenite::tungstenite::Message::Close(close_frame) => {
                let Some(frame) = close_frame else {
                    return VoiceGatewayCommunication::Error(VoiceGatewayError::default());
                };

                let close_code = u16::from(frame.code);

                VoiceGatewayCommunication::Error(close_code_to_error(close_code))
            }
            other => VoiceGatewayCommunication::Message(VoiceGatewayMessage(other.to_string())),
        }
    }
}

impl From<VoiceGatewayMessage> for tokio_tungstenite::tungstenite::Message {
    fn from(message: VoiceGatewayMessage) -> Self {
        Self::Text(message.0)
    }
}

/// Maps a voice websocket close code to the matching error.
///
/// See <https://discord.com/developers/docs/topics/opcodes-and-status-codes#voice-voice-close-event-codes>
pub fn close_code_to_error(code: u16) -> VoiceGatewayError {
    match code {
        4001 => VoiceGatewayError::UnknownOpcode,
        4002 => VoiceGatewayError::FailedToDecodePayload,
        4003 => VoiceGatewayError::NotAuthenticated,
        4004 => VoiceGatewayError::AuthenticationFailed,
        4005 => VoiceGatewayError::AlreadyAuthenticated,
        4006 => VoiceGatewayError::SessionNoLongerValid,
        4009 => VoiceGatewayError::SessionTimeout,
        4011 => VoiceGatewayError::ServerNotFound,
        4012 => VoiceGatewayError::UnknownProtocol,
        4014 => VoiceGatewayError::Disconnected,
        4015 => VoiceGatewayError::VoiceServerCrashed,
        4016 => VoiceGatewayError::UnknownEncryptionMode,
        _ => VoiceGatewayError::default(),
    }
}

#[cfg(test)]
mod message {
    use super::*;

    #[test]
    fn test_error_string_recognition() {
        let msg = VoiceGatewayMessage("Session is no longer valid.".to_string());
        assert_eq!(msg.error(), Some(VoiceGatewayError::SessionNoLongerValid));

        let msg = VoiceGatewayMessage("4014".to_string());
        assert_eq!(msg.error(), Some(VoiceGatewayError::Disconnected));

        let msg = VoiceGatewayMessage("{\"op\":8}".to_string());
        assert_eq!(msg.error(), None);
    }

    #[test]
    fn test_close_code_mapping() {
        assert_eq!(
            close_code_to_error(4006),
            VoiceGatewayError::SessionNoLongerValid
        );
        assert!(close_code_to_error(4006).is_fatal());
        assert!(!close_code_to_error(4001).is_fatal());
    }
}
