//! Public handle to the call orchestrator
//!
//! [`OrchestratorHandle`] is what every collaborator holds. The presentation
//! layer uses its inherent methods; the call surface, the telephony transport
//! and the push adapter use it through [`SurfaceActionSink`],
//! [`TransportEventSink`] and [`PushEventSink`] respectively.
//!
//! Every method is a message to the orchestrator task. Methods that return a
//! value wait for the task's reply; transport callbacks only enqueue.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ahoy_client_core::{OrchestratorHandle, ClientEvent};
//! use futures::StreamExt;
//!
//! # async fn run(client: OrchestratorHandle) -> ahoy_client_core::ClientResult<()> {
//! let mut events = client.event_stream();
//! let call_id = client.place_call("(555) 123-4567").await?;
//!
//! while let Some(Ok(event)) = events.next().await {
//!     if let ClientEvent::CallRemoved { call } = event {
//!         if call.call_id == call_id {
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    sync::{broadcast, mpsc, oneshot, RwLock},
    task::JoinHandle,
};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::{
    audio::{ensure_record_permission, AudioRouter},
    call::{CallId, CallInvite, CallSnapshot, CancelledCallInvite, InviteSnapshot},
    client::types::{Command, ProviderEvent, Responder, TransportEvent},
    error::{ClientError, ClientResult},
    events::{dispatch, ClientEvent, ClientEventHandler},
    handle::CallHandle,
    registration::{PushEventSink, RegistrationKeepAlive},
    surface::{SurfaceAction, SurfaceActionSink},
    transport::{PushNotification, PushPayload, TransportEventSink},
};

/// Stream of presentation events
///
/// Yields `Err` when the subscriber fell behind and events were dropped.
pub type EventStream = BroadcastStream<ClientEvent>;

/// Cloneable handle to a running orchestrator
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    event_tx: broadcast::Sender<ClientEvent>,
    audio: Arc<dyn AudioRouter>,
    keep_alive: RegistrationKeepAlive,
    dispatcher: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for OrchestratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorHandle")
            .field("running", &!self.command_tx.is_closed())
            .field("subscribers", &self.event_tx.receiver_count())
            .finish()
    }
}

impl OrchestratorHandle {
    pub(crate) fn new(
        command_tx: mpsc::UnboundedSender<Command>,
        event_tx: broadcast::Sender<ClientEvent>,
        audio: Arc<dyn AudioRouter>,
        keep_alive: RegistrationKeepAlive,
    ) -> Self {
        Self {
            command_tx,
            event_tx,
            audio,
            keep_alive,
            dispatcher: Arc::new(RwLock::new(None)),
        }
    }

    /// Send a command and wait for its reply
    async fn request<T>(&self, command: impl FnOnce(Responder<T>) -> Command) -> ClientResult<T> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(command(reply))
            .map_err(|_| ClientError::OrchestratorStopped)?;
        rx.await.map_err(|_| ClientError::OrchestratorStopped)?
    }

    /// Enqueue a command without waiting
    fn notify(&self, command: Command) {
        if self.command_tx.send(command).is_err() {
            warn!("Orchestrator stopped; dropping callback");
        }
    }

    // ===== Presentation intents =====

    /// Dial `remote_address` after checking microphone permission
    ///
    /// Formatting characters are stripped from the address first. If the
    /// user denies the microphone, a [`ClientEvent::MicrophoneAccessRequired`]
    /// event is published and no call is placed; the application can then
    /// offer [`place_call_without_microphone`](Self::place_call_without_microphone).
    ///
    /// The returned id identifies the call once the surface grants it; a
    /// denied request only shows up in the logs.
    pub async fn place_call(&self, remote_address: &str) -> ClientResult<CallId> {
        if !ensure_record_permission(self.audio.as_ref()).await {
            self.notify(Command::MicrophoneAccessRequired {
                remote_address: remote_address.to_string(),
            });
            return Err(ClientError::MicrophonePermissionDenied);
        }
        self.place_call_without_microphone(remote_address).await
    }

    /// Dial `remote_address` regardless of microphone permission
    pub async fn place_call_without_microphone(&self, remote_address: &str) -> ClientResult<CallId> {
        let remote_address = remote_address.to_string();
        self.request(|reply| Command::PlaceCall { remote_address, reply })
            .await
    }

    /// Hang up a call or decline an invite
    pub async fn end_call(&self, call_id: CallId) -> ClientResult<()> {
        self.request(|reply| Command::EndCall { call_id, reply }).await
    }

    /// Request a hold change; fails if no session exists for `call_id`
    pub async fn set_hold(&self, call_id: CallId, on_hold: bool) -> ClientResult<()> {
        self.request(|reply| Command::SetHold { call_id, on_hold, reply })
            .await
    }

    /// Request a mute change; fails if no session exists for `call_id`
    pub async fn set_mute(&self, call_id: CallId, muted: bool) -> ClientResult<()> {
        self.request(|reply| Command::SetMute { call_id, muted, reply })
            .await
    }

    /// Request DTMF playback on a call
    pub async fn play_digits(&self, call_id: CallId, digits: impl Into<String>) -> ClientResult<()> {
        let digits = digits.into();
        self.request(|reply| Command::PlayDigits { call_id, digits, reply })
            .await
    }

    /// Switch audio output between loudspeaker and receiver
    ///
    /// Failures are logged; the call always succeeds.
    pub async fn toggle_audio_route(&self, to_speaker: bool) -> ClientResult<()> {
        self.request(|reply| Command::ToggleAudioRoute { to_speaker, reply })
            .await
    }

    // ===== Queries =====

    pub async fn is_speaker_output(&self) -> ClientResult<bool> {
        self.request(|reply| Command::SpeakerOutput { reply }).await
    }

    /// Whether the call surface has the audio session active
    pub async fn is_audio_enabled(&self) -> ClientResult<bool> {
        self.request(|reply| Command::AudioEnabled { reply }).await
    }

    /// Snapshots of every live session
    pub async fn active_calls(&self) -> ClientResult<Vec<CallSnapshot>> {
        self.request(|reply| Command::ActiveCalls { reply }).await
    }

    /// Snapshot of one session
    pub async fn call(&self, call_id: CallId) -> ClientResult<CallSnapshot> {
        self.request(|reply| Command::GetCall { call_id, reply }).await
    }

    /// Invites waiting to be answered
    pub async fn pending_invites(&self) -> ClientResult<Vec<InviteSnapshot>> {
        self.request(|reply| Command::PendingInvites { reply }).await
    }

    /// Push registration keep-alive backing this orchestrator
    pub fn registration(&self) -> &RegistrationKeepAlive {
        &self.keep_alive
    }

    // ===== Events =====

    /// Subscribe to presentation events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    /// Presentation events as a stream
    pub fn event_stream(&self) -> EventStream {
        BroadcastStream::new(self.event_tx.subscribe())
    }

    /// Deliver events to `handler` on a dedicated task
    ///
    /// Replaces any previously registered handler.
    pub async fn set_event_handler(&self, handler: Arc<dyn ClientEventHandler>) {
        let mut rx = self.event_tx.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => dispatch(handler.as_ref(), event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event handler lagged; {} event(s) dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Event dispatcher stopped");
        });

        if let Some(previous) = self.dispatcher.write().await.replace(task) {
            previous.abort();
        }
    }

    /// Stop the orchestrator
    ///
    /// Pending answers are failed. Later calls on any clone of this handle
    /// return [`ClientError::OrchestratorStopped`].
    pub async fn shutdown(&self) -> ClientResult<()> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Shutdown { reply })
            .map_err(|_| ClientError::OrchestratorStopped)?;
        rx.await.map_err(|_| ClientError::OrchestratorStopped)?;

        if let Some(dispatcher) = self.dispatcher.write().await.take() {
            dispatcher.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl SurfaceActionSink for OrchestratorHandle {
    async fn perform_start(&self, call_id: CallId, handle: CallHandle) -> ClientResult<()> {
        let action = SurfaceAction::Start { call_id, handle };
        self.request(|reply| Command::Perform { action, reply }).await
    }

    async fn perform_answer(&self, call_id: CallId) -> ClientResult<()> {
        let action = SurfaceAction::Answer { call_id };
        self.request(|reply| Command::Perform { action, reply }).await
    }

    async fn perform_end(&self, call_id: CallId) -> ClientResult<()> {
        let action = SurfaceAction::End { call_id };
        self.request(|reply| Command::Perform { action, reply }).await
    }

    async fn perform_set_held(&self, call_id: CallId, on_hold: bool) -> ClientResult<()> {
        let action = SurfaceAction::SetHeld { call_id, on_hold };
        self.request(|reply| Command::Perform { action, reply }).await
    }

    async fn perform_set_muted(&self, call_id: CallId, muted: bool) -> ClientResult<()> {
        let action = SurfaceAction::SetMuted { call_id, muted };
        self.request(|reply| Command::Perform { action, reply }).await
    }

    async fn perform_play_digits(&self, call_id: CallId, digits: String) -> ClientResult<()> {
        let action = SurfaceAction::PlayDigits { call_id, digits };
        self.request(|reply| Command::Perform { action, reply }).await
    }

    async fn did_begin(&self) {
        self.notify(Command::Provider(ProviderEvent::Began));
    }

    async fn did_reset(&self) {
        self.notify(Command::Provider(ProviderEvent::Reset));
    }

    async fn did_activate_audio(&self) {
        self.notify(Command::Provider(ProviderEvent::AudioActivated));
    }

    async fn did_deactivate_audio(&self) {
        self.notify(Command::Provider(ProviderEvent::AudioDeactivated));
    }

    async fn timed_out_performing(&self, action: SurfaceAction) {
        self.notify(Command::Provider(ProviderEvent::TimedOut(action)));
    }
}

impl TransportEventSink for OrchestratorHandle {
    fn call_did_connect(&self, call_id: CallId) {
        self.notify(Command::Transport(TransportEvent::Connected { call_id }));
    }

    fn call_did_start_ringing(&self, call_id: CallId) {
        self.notify(Command::Transport(TransportEvent::Ringing { call_id }));
    }

    fn call_did_fail_to_connect(&self, call_id: CallId, error: String) {
        self.notify(Command::Transport(TransportEvent::FailedToConnect { call_id, error }));
    }

    fn call_did_disconnect(&self, call_id: CallId, error: Option<String>) {
        self.notify(Command::Transport(TransportEvent::Disconnected { call_id, error }));
    }
}

#[async_trait]
impl PushEventSink for OrchestratorHandle {
    async fn push_received(&self, payload: PushPayload) -> ClientResult<()> {
        self.request(|reply| Command::PushPayload { payload, reply }).await
    }

    async fn invite_received(&self, invite: CallInvite) -> ClientResult<()> {
        let notification = PushNotification::Invite(invite);
        self.request(|reply| Command::Push { notification, reply }).await
    }

    async fn invite_cancelled(&self, cancelled: CancelledCallInvite, reason: String) -> ClientResult<()> {
        let notification = PushNotification::Cancelled { cancelled, reason };
        self.request(|reply| Command::Push { notification, reply }).await
    }
}
