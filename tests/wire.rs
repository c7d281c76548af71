// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Asserts the JSON shapes both websockets speak.

use descant::types::*;

#[test]
fn test_voice_identify_serialization() {
    let identify = VoiceIdentify {
        server_id: Snowflake(848582562217590824),
        user_id: Snowflake(107118578684101632),
        session_id: "f61eba13d8dcdba2cdfbf0b4f09d9d63".to_string(),
        token: "super-secret".to_string(),
        video: Some(false),
    };

    let payload = VoiceGatewaySendPayload {
        op_code: VOICE_IDENTIFY,
        data: serde_json::to_value(&identify).unwrap(),
    };

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&payload).unwrap()).unwrap();

    assert_eq!(json["op"], 0);
    assert_eq!(json["d"]["server_id"], "848582562217590824");
    assert_eq!(json["d"]["user_id"], "107118578684101632");
    assert_eq!(json["d"]["session_id"], "f61eba13d8dcdba2cdfbf0b4f09d9d63");
    assert_eq!(json["d"]["token"], "super-secret");
}

#[test]
fn test_select_protocol_serialization() {
    let select = SelectProtocol {
        protocol: VoiceProtocol::Udp,
        data: SelectProtocolData {
            address: "203.0.113.7".to_string(),
            port: 50041,
            mode: VoiceEncryptionMode::Xsalsa20Poly1305Lite,
        },
    };

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&select).unwrap()).unwrap();

    assert_eq!(json["protocol"], "udp");
    assert_eq!(json["data"]["address"], "203.0.113.7");
    assert_eq!(json["data"]["port"], 50041);
    assert_eq!(json["data"]["mode"], "xsalsa20_poly1305_lite");
}

#[test]
fn test_speaking_serialization_omits_user_id() {
    let speaking = Speaking {
        speaking: SpeakingBitflags::MICROPHONE.bits(),
        ssrc: 12345,
        user_id: Some(Snowflake(1)),
        delay: 0,
    };

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&speaking).unwrap()).unwrap();

    assert_eq!(json["speaking"], 1);
    assert_eq!(json["ssrc"], 12345);
    assert_eq!(json["delay"], 0);
    // user_id is only ever sent by the server
    assert!(json.get("user_id").is_none());
}

#[test]
fn test_voice_ready_deserialization() {
    let raw = r#"{
        "ssrc": 98765,
        "ip": "203.0.113.1",
        "port": 50001,
        "modes": [
            "xsalsa20_poly1305",
            "xsalsa20_poly1305_suffix",
            "xsalsa20_poly1305_lite",
            "aead_aes256_gcm"
        ]
    }"#;

    let ready: VoiceReady = serde_json::from_str(raw).unwrap();
    assert_eq!(ready.ssrc, 98765);
    assert_eq!(ready.ip.octets(), [203, 0, 113, 1]);
    assert_eq!(ready.port, 50001);
    assert!(ready
        .modes
        .contains(&VoiceEncryptionMode::Xsalsa20Poly1305Lite));
    assert!(ready.modes.iter().any(VoiceEncryptionMode::is_supported));
}

#[test]
fn test_session_description_deserialization() {
    let raw = r#"{
        "mode": "xsalsa20_poly1305_lite",
        "secret_key": [
            1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,
            17,18,19,20,21,22,23,24,25,26,27,28,29,30,31,32
        ],
        "media_session_id": "af1c0317d6ff4c8ba8e94e3a2e777c1e"
    }"#;

    let description: SessionDescription = serde_json::from_str(raw).unwrap();
    assert!(description.encryption_mode.is_supported());
    assert_eq!(description.secret_key.len(), 32);
    assert_eq!(description.secret_key[31], 32);
}

#[test]
fn test_voice_receive_payload_seq_field() {
    let raw = r#"{"op":5,"d":{"speaking":1,"ssrc":555,"user_id":"42"},"seq":17}"#;

    let payload: VoiceGatewayReceivePayload = serde_json::from_str(raw).unwrap();
    assert_eq!(payload.op_code, VOICE_SPEAKING);
    assert_eq!(payload.seq, Some(17));

    let speaking: Speaking = serde_json::from_str(payload.data.get()).unwrap();
    assert_eq!(speaking.ssrc, 555);
    assert_eq!(speaking.user_id, Some(Snowflake(42)));
}

#[test]
fn test_voice_heartbeat_shape() {
    let heartbeat = VoiceHeartbeat {
        t: 1724668800000,
        seq_ack: Some(10),
    };

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&heartbeat).unwrap()).unwrap();

    assert_eq!(json["t"], 1724668800000u64);
    assert_eq!(json["seq_ack"], 10);
}

#[test]
fn test_gateway_dispatch_deserialization() {
    let raw = r#"{
        "op": 0,
        "s": 4,
        "t": "VOICE_SERVER_UPDATE",
        "d": {"token": "abc", "guild_id": "848582562217590824", "endpoint": "region.discord.media:443"}
    }"#;

    let payload: GatewayReceivePayload = serde_json::from_str(raw).unwrap();
    assert_eq!(payload.op_code, GATEWAY_DISPATCH);
    assert_eq!(payload.sequence_number, Some(4));
    assert_eq!(payload.event_name.as_deref(), Some("VOICE_SERVER_UPDATE"));

    let update: VoiceServerUpdate =
        serde_json::from_str(payload.event_data.unwrap().get()).unwrap();
    assert_eq!(update.endpoint.as_deref(), Some("region.discord.media:443"));
    assert_eq!(update.guild_id, Some(Snowflake(848582562217590824)));
}

#[test]
fn test_update_voice_state_clears_channel_on_leave() {
    let update = UpdateVoiceState {
        guild_id: Some(Snowflake(848582562217590824)),
        channel_id: None,
        self_mute: false,
        self_deaf: false,
        self_video: false,
    };

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&update).unwrap()).unwrap();

    assert_eq!(json["guild_id"], "848582562217590824");
    assert_eq!(json["channel_id"], serde_json::Value::Null);
    assert_eq!(json["self_video"], false);
}
