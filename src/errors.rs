// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains all the errors that can be returned by the library.
use custom_error::custom_error;

use crate::types::WebSocketEvent;

pub type DescantResult<T> = std::result::Result<T, VoiceClientError>;

custom_error! {
    /// Errors surfaced to callers of the outer [crate::client::VoiceClient] API.
    ///
    /// These are the only errors a consumer of the packaged client has to
    /// handle; everything transient (UDP send failures, decryption failures,
    /// provider 5xx) is logged and swallowed inside the session.
    #[derive(Clone, Hash, PartialEq, Eq)]
    pub VoiceClientError
    /// The main gateway connection could not be established.
    ConnectionFailed{error: String} = "Could not connect to the gateway: {error}",
    /// The VOICE_STATE_UPDATE / VOICE_SERVER_UPDATE pair did not arrive in time.
    GatewayTimeout = "Timed out waiting for the gateway to acknowledge the voice state update.",
    /// No authenticated main gateway connection is available.
    NotAuthenticated = "No authenticated gateway connection; connect and identify first.",
    /// A voice session already exists; leave it before joining again.
    AlreadyInVoice = "Already connected to a voice channel.",
    /// No voice session exists.
    NotInVoice = "Not connected to a voice channel.",
    /// The voice session has not reached the Active state yet.
    NotReady = "The voice session is not ready to transmit audio yet.",
    /// Another playback is in flight; this implementation does not queue.
    Busy = "Another audio playback is already in progress.",
    /// A credential or voice id required for this operation is missing.
    NotConfigured{missing: String} = "Missing configuration: {missing}",
    /// Sending audio failed at the transport layer.
    TransportError{error: String} = "Could not transmit audio: {error}",
}

custom_error! {
    /// Errors of the main gateway websocket connection.
    ///
    /// See <https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-close-event-codes>
    #[derive(PartialEq, Eq, Default, Clone)]
    pub GatewayError
    #[default]
    Unknown = "We're not sure what went wrong. Try reconnecting?",
    UnknownOpcode = "You sent an invalid Gateway opcode or an invalid payload for an opcode",
    Decode = "Gateway server couldn't decode payload",
    NotAuthenticated = "You sent a payload prior to identifying",
    AuthenticationFailed = "The account token sent with your identify payload is invalid",
    AlreadyAuthenticated = "You've already identified, no need to reauthenticate",
    InvalidSequenceNumber = "The sequence number sent when resuming the session was invalid. Reconnect and start a new session",
    RateLimited = "You are being rate limited!",
    SessionTimedOut = "Your session timed out. Reconnect and start a new one",

    // Errors when initiating a gateway connection
    CannotConnect{error: String} = "Cannot connect due to a tungstenite error: {error}",
    NonHelloOnInitiate{opcode: u8} = "Received non hello on initial gateway connection ({opcode}), something is definitely wrong",

    // Other misc errors
    UnexpectedOpcodeReceived{opcode: u8} = "Received an opcode we weren't expecting to receive: {opcode}",
}

impl WebSocketEvent for GatewayError {}

custom_error! {
    /// Voice gateway errors.
    ///
    /// Similar to [GatewayError].
    ///
    /// See <https://discord.com/developers/docs/topics/opcodes-and-status-codes#voice-voice-close-event-codes>;
    #[derive(Clone, Default, PartialEq, Eq)]
    pub VoiceGatewayError
    // Errors we receive
    #[default]
    UnknownOpcode = "You sent an invalid opcode",
    FailedToDecodePayload = "You sent an invalid payload in your identifying to the (Voice) Gateway",
    NotAuthenticated = "You sent a payload before identifying with the (Voice) Gateway",
    AuthenticationFailed = "The token you sent in your identify payload is incorrect",
    AlreadyAuthenticated = "You sent more than one identify payload",
    SessionNoLongerValid = "Your session is no longer valid",
    SessionTimeout = "Your session has timed out",
    ServerNotFound = "We can't find the server you're trying to connect to",
    UnknownProtocol = "We didn't recognize the protocol you sent",
    Disconnected = "Channel was deleted, you were kicked, voice server changed, or the main gateway session was dropped. Should not reconnect.",
    VoiceServerCrashed = "The server crashed, try resuming",
    UnknownEncryptionMode = "Server failed to decrypt data",

    // Errors raised locally
    HeartbeatAckMissed = "The voice server did not acknowledge two consecutive heartbeats",

    // Errors when initiating a gateway connection
    CannotConnect{error: String} = "Cannot connect due to a tungstenite error: {error}",
    NonHelloOnInitiate{opcode: u8} = "Received non hello on initial gateway connection ({opcode}), something is definitely wrong",

    // Other misc errors
    UnexpectedOpcodeReceived{opcode: u8} = "Received an opcode we weren't expecting to receive: {opcode}",
}

impl WebSocketEvent for VoiceGatewayError {}

impl VoiceGatewayError {
    /// Whether this error ends the session for good, as opposed to one a
    /// caller may recover from by reissuing a join.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VoiceGatewayError::SessionNoLongerValid
                | VoiceGatewayError::SessionTimeout
                | VoiceGatewayError::Disconnected
                | VoiceGatewayError::HeartbeatAckMissed
                | VoiceGatewayError::AuthenticationFailed
        )
    }
}

custom_error! {
    /// Voice UDP errors.
    #[derive(Clone, PartialEq, Eq)]
    pub VoiceUdpError

    // General errors
    BrokenSocket{error: String} = "Could not write / read from UDP socket: {error}",
    NoData = "We have not yet received the necessary data to perform this operation.",

    // Encryption errors
    NoKey = "Tried to encrypt / decrypt rtp data, but no session key has been received yet",
    FailedEncryption = "Tried to encrypt rtp data, but failed",
    FailedDecryption = "Tried to decrypt rtp data, but failed",

    // Ip discovery errors
    MalformedIpDiscovery = "The ip discovery response does not follow the expected 74 byte layout",

    // Errors when initiating a socket connection
    CannotBind{error: String} = "Cannot bind socket due to a UDP error: {error}",
    CannotConnect{error: String} = "Cannot connect due to a UDP error: {error}",
}

impl WebSocketEvent for VoiceUdpError {}

custom_error! {
    /// Errors of the Opus codec and the audio transcode step.
    #[derive(Clone, PartialEq, Eq)]
    pub AudioError
    CoderInit{error: String} = "Could not create an Opus coder: {error}",
    EncodeFailed{error: String} = "Opus encoding failed: {error}",
    SealFailed = "Sealing an encoded frame failed",
    TranscodeFailed{error: String} = "Could not transcode input audio to 48 kHz s16le stereo: {error}",
}

custom_error! {
    /// Errors returned by the external speech providers.
    #[derive(Clone, PartialEq, Eq)]
    pub ProviderError
    MissingCredentials = "No provider api key is configured.",
    RequestFailed{error: String} = "The provider request failed to complete: {error}",
    ReceivedErrorCode{error_code: u16, error: String} = "The provider responded with error code {error_code}: {error}",
    InvalidResponse{error: String} = "The provider response is malformed and cannot be processed: {error}",
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        ProviderError::RequestFailed {
            error: value.to_string(),
        }
    }
}
