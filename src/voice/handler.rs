// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Handles inbetween connections between the gateway and udp modules: the
//! join/leave lifecycle, the voice session state machine and the glue that
//! moves audio between the pipelines and the outside world.

use std::collections::HashMap;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use pubserve::Subscriber;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};

use crate::errors::{DescantResult, VoiceClientError};
use crate::gateway::GatewayHandle;
use crate::types::{
    GatewayInvalidSession, GatewayReady, GatewayReconnect, SelectProtocol, SelectProtocolData,
    Snowflake, Speaking, SpeakingBitflags, UpdateVoiceState, VoiceEncryptionMode, VoiceIdentify,
    VoiceServerUpdate, VoiceStateUpdate,
};
use crate::voice::decode::DecodedFrame;
use crate::voice::encode::{EncodePipeline, SendCounters};
use crate::voice::gateway::{VoiceGateway, VoiceGatewayEvent, VoiceGatewayHandle};
use crate::voice::pacer;
use crate::voice::speaker::{placeholder_speaker_id, PendingUtterance, SpeakerBuffer};
use crate::voice::udp::{UdpHandle, UdpHandler};
use crate::voice::voice_data::{SsrcMap, VoiceData, VoiceSessionState};

/// How long JoinVoice waits for the whole handshake.
const JOIN_TIMEOUT: Duration = Duration::from_secs(15);

/// How long PlayAudio blocks waiting for the session to become Active.
const PLAY_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// How long LeaveVoice waits for the buffer task to drain its utterances.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How many decoded frames may sit between the receive loop and the buffer
/// task.
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// An utterance with its speaker identity resolved, handed to the
/// transcription side.
#[derive(Debug, Clone)]
pub struct CapturedUtterance {
    /// The real user id, or an ssrc placeholder when no binding arrived
    /// before the flush
    pub speaker_id: String,
    pub user_id: Option<Snowflake>,
    pub display_name: Option<String>,
    /// s16le stereo pcm at 48 kHz
    pub pcm: Vec<u8>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
}

/// What [VoiceHandler::status] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSessionStatus {
    pub in_voice: bool,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub speaker_count: usize,
}

#[derive(Debug, Default)]
struct OurUser {
    user_id: Option<Snowflake>,
    username: Option<String>,
}

/// The voice session owner: one per process, reused across sessions.
///
/// All fields are shared handles, so the handler can be cloned into the
/// tasks it spawns.
#[derive(Debug, Clone)]
pub struct VoiceHandler {
    pub gateway: GatewayHandle,
    pub data: Arc<RwLock<VoiceData>>,
    pub ssrc_map: Arc<RwLock<SsrcMap>>,
    display_names: Arc<RwLock<HashMap<Snowflake, String>>>,
    our_user: Arc<RwLock<OurUser>>,
    state_send: Arc<watch::Sender<VoiceSessionState>>,
    pub voice_gateway_connection: Arc<Mutex<Option<VoiceGatewayHandle>>>,
    pub voice_udp_connection: Arc<Mutex<Option<UdpHandle>>>,
    encode_pipeline: Arc<Mutex<Option<EncodePipeline>>>,
    playback_cancel: Arc<watch::Sender<bool>>,
    play_lock: Arc<Mutex<()>>,
    buffer_task: Arc<Mutex<Option<(broadcast::Sender<()>, JoinHandle<()>)>>>,
    utterance_sink: mpsc::Sender<CapturedUtterance>,
    silence_flush: Duration,
    utterance_max: Duration,
}

impl VoiceHandler {
    /// Creates a handler bound to an authenticated main gateway connection.
    ///
    /// Flushed utterances are delivered through `utterance_sink`. The caller
    /// still has to subscribe the handler to the gateway's events, see
    /// [VoiceHandler::subscribe_to_gateway].
    pub fn new(
        gateway: GatewayHandle,
        utterance_sink: mpsc::Sender<CapturedUtterance>,
        silence_flush: Duration,
        utterance_max: Duration,
    ) -> Self {
        let (state_send, _) = watch::channel(VoiceSessionState::Idle);
        let (playback_cancel, _) = watch::channel(false);

        Self {
            gateway,
            data: Arc::new(RwLock::new(VoiceData::default())),
            ssrc_map: Arc::new(RwLock::new(SsrcMap::default())),
            display_names: Arc::new(RwLock::new(HashMap::new())),
            our_user: Arc::new(RwLock::new(OurUser::default())),
            state_send: Arc::new(state_send),
            voice_gateway_connection: Arc::new(Mutex::new(None)),
            voice_udp_connection: Arc::new(Mutex::new(None)),
            encode_pipeline: Arc::new(Mutex::new(None)),
            playback_cancel: Arc::new(playback_cancel),
            play_lock: Arc::new(Mutex::new(())),
            buffer_task: Arc::new(Mutex::new(None)),
            utterance_sink,
            silence_flush,
            utterance_max,
        }
    }

    /// Subscribes the handler to the main gateway dispatches it drives the
    /// session from.
    pub async fn subscribe_to_gateway(self: &Arc<Self>) {
        let mut events = self.gateway.events.lock().await;
        events.ready.subscribe(self.clone());
        events.voice_state_update.subscribe(self.clone());
        events.voice_server_update.subscribe(self.clone());
        events.reconnect.subscribe(self.clone());
        events.invalid_session.subscribe(self.clone());
    }

    /// The session's current lifecycle state.
    pub fn state(&self) -> VoiceSessionState {
        *self.state_send.borrow()
    }

    fn set_state(&self, state: VoiceSessionState) {
        trace!("Voice session state -> {:?}", state);
        // send_replace updates the value even while nobody is subscribed
        self.state_send.send_replace(state);
    }

    /// Joins a voice channel and blocks until audio can flow.
    ///
    /// Sends the guild subscribe and the voice state update, then waits for
    /// the handshake driven by the gateway dispatches. On timeout the outer
    /// voice state is rolled back.
    pub async fn join_voice(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> DescantResult<()> {
        if self.our_user.read().await.user_id.is_none() {
            return Err(VoiceClientError::NotAuthenticated);
        }

        match self.state() {
            VoiceSessionState::Idle | VoiceSessionState::Closed => {}
            _ => return Err(VoiceClientError::AlreadyInVoice),
        }

        // Fresh session data; the previous session's components are dead
        {
            let mut data = self.data.write().await;
            *data = VoiceData {
                guild_id: Some(guild_id),
                channel_id: Some(channel_id),
                user_id: self.our_user.read().await.user_id.unwrap_or_default(),
                ..Default::default()
            };
        }
        self.ssrc_map.write().await.clear();
        self.playback_cancel.send_replace(false);

        self.set_state(VoiceSessionState::AwaitingGateway);

        self.gateway.send_guild_subscribe(guild_id).await;
        self.gateway
            .send_update_voice_state(UpdateVoiceState {
                guild_id: Some(guild_id),
                channel_id: Some(channel_id),
                self_mute: false,
                self_deaf: false,
                self_video: false,
            })
            .await;

        let mut state_receive = self.state_send.subscribe();
        let wait_result = timeout(
            JOIN_TIMEOUT,
            state_receive.wait_for(|state| {
                matches!(
                    state,
                    VoiceSessionState::Active | VoiceSessionState::Closed
                )
            }),
        )
        .await;

        match wait_result {
            Ok(Ok(state)) if *state == VoiceSessionState::Active => Ok(()),
            Ok(_) => {
                // The session died mid-handshake; teardown already ran
                Err(VoiceClientError::GatewayTimeout)
            }
            Err(_) => {
                warn!("Timed out waiting for the voice handshake, rolling back");
                self.teardown(true).await;
                Err(VoiceClientError::GatewayTimeout)
            }
        }
    }

    /// Leaves the current voice channel, closing every session component and
    /// force-flushing pending utterances.
    pub async fn leave_voice(&self) -> DescantResult<()> {
        match self.state() {
            VoiceSessionState::Idle | VoiceSessionState::Closed => {
                Err(VoiceClientError::NotInVoice)
            }
            _ => {
                self.teardown(true).await;
                Ok(())
            }
        }
    }

    /// Plays a stream of 48 kHz s16le stereo pcm into the channel.
    ///
    /// Blocks until the session is Active (up to 10 s), fails with `Busy` if
    /// another playback is in flight, and returns after the last frame has
    /// been paced onto the wire.
    pub async fn play_pcm(&self, pcm: Vec<u8>) -> DescantResult<()> {
        self.wait_until_active().await?;

        // One playback at a time; a second call does not queue
        let Ok(_play_guard) = self.play_lock.try_lock() else {
            return Err(VoiceClientError::Busy);
        };

        let voice_gateway = self
            .voice_gateway_connection
            .lock()
            .await
            .clone()
            .ok_or(VoiceClientError::NotReady)?;
        let udp = self
            .voice_udp_connection
            .lock()
            .await
            .clone()
            .ok_or(VoiceClientError::NotReady)?;

        // Encode the whole batch up front, advancing the session counters
        // under one lock so a concurrent session teardown can't interleave
        let packets = {
            let mut data = self.data.write().await;
            let secret_key = data.secret_key().ok_or(VoiceClientError::NotReady)?;
            let ssrc = data.ssrc().ok_or(VoiceClientError::NotReady)?;

            let mut counters = SendCounters {
                sequence: data.last_sequence_number,
                timestamp: data.last_rtp_timestamp,
                nonce: data.nonce_counter,
            };

            let mut pipeline_lock = self.encode_pipeline.lock().await;
            let pipeline = pipeline_lock.as_mut().ok_or(VoiceClientError::NotReady)?;

            let packets = pipeline
                .encode_batch(&secret_key, ssrc, &mut counters, &pcm)
                .map_err(|e| VoiceClientError::TransportError {
                    error: e.to_string(),
                })?;

            data.last_sequence_number = counters.sequence;
            data.last_rtp_timestamp = counters.timestamp;
            data.nonce_counter = counters.nonce;

            packets
        };

        if packets.is_empty() {
            return Ok(());
        }

        let ssrc = self.data.read().await.ssrc().unwrap_or_default();

        self.set_speaking(&voice_gateway, ssrc, true).await;

        let mut cancel = self.playback_cancel.subscribe();
        let pace_result = pacer::pace_send(&udp, packets, &mut cancel).await;

        // The speaking flag is cleared on every path out, cancelled or not
        self.set_speaking(&voice_gateway, ssrc, false).await;

        match pace_result {
            Ok(batch) => {
                debug!(
                    "Playback finished: {} frames sent, cancelled: {}",
                    batch.frames_sent, batch.cancelled
                );
                Ok(())
            }
            Err(e) => Err(VoiceClientError::TransportError {
                error: e.to_string(),
            }),
        }
    }

    /// A snapshot for GetVoiceStatus.
    pub async fn status(&self) -> VoiceSessionStatus {
        let data = self.data.read().await;
        let in_voice = self.state() == VoiceSessionState::Active;

        VoiceSessionStatus {
            in_voice,
            guild_id: if in_voice { data.guild_id } else { None },
            channel_id: if in_voice { data.channel_id } else { None },
            speaker_count: if in_voice {
                self.ssrc_map.read().await.speaker_count()
            } else {
                0
            },
        }
    }

    /// The display name of a user, as far as voice state dispatches have
    /// revealed it.
    pub async fn display_name_of(&self, user_id: Snowflake) -> Option<String> {
        self.display_names.read().await.get(&user_id).cloned()
    }

    async fn wait_until_active(&self) -> DescantResult<()> {
        match self.state() {
            VoiceSessionState::Active => return Ok(()),
            VoiceSessionState::Idle | VoiceSessionState::Closed => {
                return Err(VoiceClientError::NotInVoice)
            }
            _ => {}
        }

        let mut state_receive = self.state_send.subscribe();
        let wait_result = timeout(
            PLAY_READY_TIMEOUT,
            state_receive.wait_for(|state| {
                matches!(
                    state,
                    VoiceSessionState::Active | VoiceSessionState::Closed
                )
            }),
        )
        .await;

        match wait_result {
            Ok(Ok(state)) if *state == VoiceSessionState::Active => Ok(()),
            Ok(_) => Err(VoiceClientError::NotInVoice),
            Err(_) => Err(VoiceClientError::NotReady),
        }
    }

    async fn set_speaking(&self, voice_gateway: &VoiceGatewayHandle, ssrc: u32, speaking: bool) {
        self.data.write().await.speaking = speaking;
        voice_gateway
            .send_speaking(Speaking {
                speaking: if speaking {
                    SpeakingBitflags::default().bits()
                } else {
                    0
                },
                ssrc,
                user_id: None,
                delay: 0,
            })
            .await;
    }

    /// Advances AwaitingGateway -> WsConnecting once both required
    /// dispatches have arrived; their order is not guaranteed.
    async fn try_connect_voice_gateway(&self) {
        if self.state() != VoiceSessionState::AwaitingGateway {
            return;
        }

        let data = self.data.read().await;
        let has_session = !data.session_id.is_empty();
        let has_server = data
            .server_data
            .as_ref()
            .is_some_and(|server| server.endpoint.is_some());
        drop(data);

        if !(has_session && has_server) {
            return;
        }

        self.set_state(VoiceSessionState::WsConnecting);

        let handler = self.clone();
        tokio::spawn(async move {
            handler.connect_voice_gateway().await;
        });
    }

    async fn connect_voice_gateway(&self) {
        let (endpoint, identify) = {
            let data = self.data.read().await;
            let server = data.server_data.clone().unwrap();

            let server_id = data.guild_id.or(server.guild_id).unwrap_or_default();

            (
                server.endpoint.unwrap(),
                VoiceIdentify {
                    server_id,
                    user_id: data.user_id,
                    session_id: data.session_id.clone(),
                    token: server.token,
                    video: Some(false),
                },
            )
        };

        let (voice_gateway, events) = match VoiceGateway::spawn(&endpoint).await {
            Ok(spawned) => spawned,
            Err(e) => {
                warn!("VGW: Could not connect to {}: {}", endpoint, e);
                self.teardown(true).await;
                return;
            }
        };

        *self.voice_gateway_connection.lock().await = Some(voice_gateway.clone());

        self.set_state(VoiceSessionState::Identifying);
        voice_gateway.send_identify(identify).await;

        let handler = self.clone();
        tokio::spawn(async move {
            handler.session_task(events).await;
        });
    }

    /// The session machine: consumes the voice gateway's event union and
    /// walks the handshake states until the session closes.
    async fn session_task(&self, mut events: mpsc::Receiver<VoiceGatewayEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                VoiceGatewayEvent::Hello(hello) => {
                    self.data.write().await.heartbeat_interval_ms =
                        hello.heartbeat_interval as u64;
                }
                VoiceGatewayEvent::Ready(ready) => {
                    if let Err(e) = self.handle_voice_ready(ready).await {
                        warn!("Voice handshake failed at Ready: {}", e);
                        self.teardown(true).await;
                        break;
                    }
                }
                VoiceGatewayEvent::SessionDescription(description) => {
                    if let Err(e) = self.handle_session_description(description).await {
                        warn!("Voice handshake failed at Session Description: {}", e);
                        self.teardown(true).await;
                        break;
                    }
                }
                VoiceGatewayEvent::Speaking(speaking) => {
                    self.handle_peer_speaking(speaking).await;
                }
                VoiceGatewayEvent::HeartbeatAck(_) => {
                    // Liveness bookkeeping lives in the heartbeat task
                }
                VoiceGatewayEvent::Unknown(op) => {
                    debug!("VGW: Ignoring op {} in session machine", op);
                }
                VoiceGatewayEvent::Closed(error) => {
                    if self.state() == VoiceSessionState::Closed {
                        break;
                    }
                    warn!("Voice session closed: {}", error);
                    self.teardown(true).await;
                    break;
                }
            }
        }

        trace!("Voice session machine finished");
    }

    async fn handle_voice_ready(&self, ready: crate::types::VoiceReady) -> DescantResult<()> {
        if self.state() != VoiceSessionState::Identifying {
            debug!("VGW: Ignoring a Ready outside of the Identifying state");
            return Ok(());
        }

        if !ready
            .modes
            .iter()
            .any(VoiceEncryptionMode::is_supported)
        {
            return Err(VoiceClientError::TransportError {
                error: "Server offers no supported encryption mode".to_string(),
            });
        }

        let ssrc = ready.ssrc;
        let server_address = SocketAddr::V4(SocketAddrV4::new(ready.ip, ready.port));

        self.data.write().await.ready_data = Some(ready);
        self.set_state(VoiceSessionState::Discovering);

        // The buffer task must exist before the first datagram can arrive
        let (frame_send, frame_receive) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        self.spawn_buffer_task(frame_receive).await;

        let udp_handle =
            UdpHandler::spawn(self.data.clone(), server_address, ssrc, frame_send)
                .await
                .map_err(|e| VoiceClientError::TransportError {
                    error: e.to_string(),
                })?;

        *self.voice_udp_connection.lock().await = Some(udp_handle);

        let discovered = self
            .data
            .read()
            .await
            .ip_discovery
            .clone()
            .ok_or(VoiceClientError::TransportError {
                error: "Ip discovery produced no address".to_string(),
            })?;

        self.set_state(VoiceSessionState::Selecting);

        let voice_gateway = self
            .voice_gateway_connection
            .lock()
            .await
            .clone()
            .ok_or(VoiceClientError::NotReady)?;

        voice_gateway
            .send_select_protocol(SelectProtocol {
                protocol: Default::default(),
                data: SelectProtocolData {
                    address: discovered.address,
                    port: discovered.port,
                    mode: VoiceEncryptionMode::Xsalsa20Poly1305Lite,
                },
            })
            .await;

        Ok(())
    }

    async fn handle_session_description(
        &self,
        description: crate::types::SessionDescription,
    ) -> DescantResult<()> {
        if self.state() != VoiceSessionState::Selecting {
            debug!("VGW: Ignoring a Session Description outside of the Selecting state");
            return Ok(());
        }

        if !description.encryption_mode.is_supported() {
            return Err(VoiceClientError::TransportError {
                error: format!(
                    "Server selected unsupported encryption mode {:?}",
                    description.encryption_mode
                ),
            });
        }

        {
            let mut data = self.data.write().await;
            data.encryption_mode = description.encryption_mode;
            data.session_description = Some(description);
        }

        *self.encode_pipeline.lock().await = Some(EncodePipeline::new().map_err(|e| {
            VoiceClientError::TransportError {
                error: e.to_string(),
            }
        })?);

        self.playback_cancel.send_replace(false);
        self.set_state(VoiceSessionState::Active);

        info!("Voice session is active");

        Ok(())
    }

    async fn handle_peer_speaking(&self, speaking: Speaking) {
        let Some(user_id) = speaking.user_id else {
            return;
        };

        let display_name = self.display_names.read().await.get(&user_id).cloned();

        self.ssrc_map
            .write()
            .await
            .bind(speaking.ssrc, user_id, display_name);
    }

    /// Spawns the single owner task of the per speaker buffer.
    async fn spawn_buffer_task(&self, mut frames: mpsc::Receiver<DecodedFrame>) {
        let (kill_send, mut kill_receive) = broadcast::channel::<()>(4);

        let handler = self.clone();
        let silence_flush = self.silence_flush;
        let utterance_max = self.utterance_max;

        let join_handle = tokio::spawn(async move {
            let mut buffer = SpeakerBuffer::new(silence_flush, utterance_max);

            loop {
                let deadline = buffer.next_deadline();

                tokio::select! {
                    Ok(_) = kill_receive.recv() => break,
                    maybe_frame = frames.recv() => {
                        let Some(frame) = maybe_frame else { break };
                        if let Some(forced) =
                            buffer.add_chunk(frame.ssrc, frame.pcm, Instant::now())
                        {
                            handler.emit_utterance(forced).await;
                        }
                    }
                    () = async {
                        match deadline {
                            Some(deadline) => sleep_until(deadline).await,
                            None => std::future::pending().await,
                        }
                    } => {
                        for flushed in buffer.flush_due(Instant::now()) {
                            handler.emit_utterance(flushed).await;
                        }
                    }
                }
            }

            // Disconnecting flushes whatever is still buffered
            for flushed in buffer.flush_all() {
                handler.emit_utterance(flushed).await;
            }
        });

        *self.buffer_task.lock().await = Some((kill_send, join_handle));
    }

    /// Resolves an utterance's identity and forwards it for transcription.
    async fn emit_utterance(&self, utterance: PendingUtterance) {
        let binding = self.ssrc_map.read().await.get(utterance.ssrc).cloned();

        let (speaker_id, user_id, display_name) = match binding {
            Some(binding) => (
                binding.user_id.to_string(),
                Some(binding.user_id),
                binding.display_name,
            ),
            None => (placeholder_speaker_id(utterance.ssrc), None, None),
        };

        let (guild_id, channel_id) = {
            let data = self.data.read().await;
            (data.guild_id, data.channel_id)
        };

        let captured = CapturedUtterance {
            speaker_id,
            user_id,
            display_name,
            pcm: utterance.pcm,
            started_at: utterance.started_at,
            ended_at: utterance.ended_at,
            guild_id,
            channel_id,
        };

        if self.utterance_sink.send(captured).await.is_err() {
            warn!("Utterance receiver is gone, dropping captured audio");
        }
    }

    /// Closes every session component. Idempotent; runs for both voluntary
    /// leaves and fatal errors.
    async fn teardown(&self, rollback_outer_state: bool) {
        if self.state() == VoiceSessionState::Closed {
            return;
        }
        self.set_state(VoiceSessionState::Closed);

        // Stop an in-flight playback before anything else
        self.playback_cancel.send_replace(true);

        if let Some(voice_gateway) = self.voice_gateway_connection.lock().await.take() {
            voice_gateway.close().await;
        }

        if let Some(udp) = self.voice_udp_connection.lock().await.take() {
            udp.close();
        }

        // Drain the buffer task so pending utterances still reach the
        // transcription side, best effort
        if let Some((kill_send, join_handle)) = self.buffer_task.lock().await.take() {
            let _ = kill_send.send(());
            if timeout(DRAIN_TIMEOUT, join_handle).await.is_err() {
                warn!("Buffer task did not drain in time");
            }
        }

        *self.encode_pipeline.lock().await = None;
        self.ssrc_map.write().await.clear();

        if rollback_outer_state {
            let guild_id = self.data.read().await.guild_id;
            self.gateway
                .send_update_voice_state(UpdateVoiceState {
                    guild_id,
                    channel_id: None,
                    self_mute: false,
                    self_deaf: false,
                    self_video: false,
                })
                .await;
        }
    }
}

#[async_trait]
// The READY dispatch tells us who we are; the voice identify needs it.
impl Subscriber<GatewayReady> for VoiceHandler {
    async fn update(&self, data: &GatewayReady) {
        let mut our_user = self.our_user.write().await;
        our_user.user_id = Some(data.user.id);
        our_user.username = data.user.username.clone();
    }
}

#[async_trait]
// Voice state updates carry our session id (for our own user) and display
// names (for everyone).
impl Subscriber<VoiceStateUpdate> for VoiceHandler {
    async fn update(&self, update: &VoiceStateUpdate) {
        if let Some(member) = &update.member {
            let name = member
                .nick
                .clone()
                .or_else(|| member.user.as_ref().and_then(|user| user.username.clone()));
            if let Some(name) = name {
                self.display_names.write().await.insert(update.user_id, name);
            }
        }

        let our_user_id = self.our_user.read().await.user_id;
        if Some(update.user_id) != our_user_id {
            return;
        }

        if self.state() != VoiceSessionState::AwaitingGateway {
            return;
        }

        let mut data = self.data.write().await;
        if update.channel_id != data.channel_id {
            // An echo of a rollback or a stale state, not our join
            return;
        }
        data.session_id = update.session_id.clone();
        drop(data);

        self.try_connect_voice_gateway().await;
    }
}

#[async_trait]
// On VoiceServerUpdate we get the endpoint and token for the voice gateway.
impl Subscriber<VoiceServerUpdate> for VoiceHandler {
    async fn update(&self, update: &VoiceServerUpdate) {
        if self.state() != VoiceSessionState::AwaitingGateway {
            return;
        }

        self.data.write().await.server_data = Some(update.clone());

        self.try_connect_voice_gateway().await;
    }
}

#[async_trait]
// A reconnect request invalidates any voice session, see gateway op 7.
impl Subscriber<GatewayReconnect> for VoiceHandler {
    async fn update(&self, _data: &GatewayReconnect) {
        if self.state() != VoiceSessionState::Closed
            && self.state() != VoiceSessionState::Idle
        {
            info!("Gateway requested a reconnect, closing the voice session");
            self.teardown(false).await;
        }
    }
}

#[async_trait]
// Same for an invalidated session, see gateway op 9.
impl Subscriber<GatewayInvalidSession> for VoiceHandler {
    async fn update(&self, _data: &GatewayInvalidSession) {
        if self.state() != VoiceSessionState::Closed
            && self.state() != VoiceSessionState::Idle
        {
            info!("Gateway session invalidated, closing the voice session");
            self.teardown(false).await;
        }
    }
}
