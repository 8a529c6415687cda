//! Call session orchestrator
//!
//! The orchestrator keeps the transport's calls, the call surface's calls and
//! the presentation layer's view of them consistent. It is split into:
//!
//! - [`Orchestrator`] - the state owner; runs as a single task and processes
//!   one [`Command`](types::Command) at a time
//! - [`OrchestratorHandle`] - the cheap, cloneable front door; every method
//!   turns into a command sent to that task
//!
//! # Architecture
//!
//! ```text
//!  Presentation ─┐                         ┌─► CallSurface (report / request)
//!  CallSurface  ─┼─► OrchestratorHandle ─► │   Orchestrator task
//!  Transport    ─┤      (mpsc commands)    ├─► TelephonyTransport
//!  Push         ─┘                         └─► broadcast ClientEvent ─► UI
//! ```
//!
//! The handle implements one trait per collaborator role:
//! [`SurfaceActionSink`](crate::surface::SurfaceActionSink),
//! [`TransportEventSink`](crate::transport::TransportEventSink) and
//! [`PushEventSink`](crate::registration::PushEventSink).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{AudioRouter, AudioState},
    call::{CallId, CallInvite, CallSession, InviteSnapshot},
    client::types::{Command, PendingCompletion, ProviderEvent},
    error::ClientError,
    events::ClientEvent,
    handle::format_remote_identity,
    registration::RegistrationKeepAlive,
    surface::{CallSurface, SurfaceAction},
    transport::TelephonyTransport,
};

pub mod builder;
pub mod config;
pub mod manager;

mod calls;
mod events;
mod types;


pub use builder::ClientBuilder;
pub use config::ClientConfig;
pub use manager::{EventStream, OrchestratorHandle};

/// Owner of all call state
///
/// Only the orchestrator task touches `sessions`, `invites` and `pending`,
/// so no locking is needed around them.
pub(crate) struct Orchestrator {
    config: ClientConfig,
    surface: Arc<dyn CallSurface>,
    transport: Arc<dyn TelephonyTransport>,
    audio: Arc<dyn AudioRouter>,
    keep_alive: RegistrationKeepAlive,

    sessions: HashMap<CallId, CallSession>,
    invites: HashMap<CallId, CallInvite>,
    pending: HashMap<CallId, PendingCompletion>,
    audio_state: AudioState,

    event_tx: broadcast::Sender<ClientEvent>,
    /// Used by spawned surface requests to re-enter the loop
    command_tx: mpsc::WeakUnboundedSender<Command>,
}

impl Orchestrator {
    pub(crate) fn new(
        config: ClientConfig,
        surface: Arc<dyn CallSurface>,
        transport: Arc<dyn TelephonyTransport>,
        audio: Arc<dyn AudioRouter>,
        keep_alive: RegistrationKeepAlive,
        event_tx: broadcast::Sender<ClientEvent>,
        command_tx: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            config,
            surface,
            transport,
            audio,
            keep_alive,
            sessions: HashMap::new(),
            invites: HashMap::new(),
            pending: HashMap::new(),
            audio_state: AudioState::default(),
            event_tx,
            command_tx,
        }
    }

    /// Process commands until shutdown or until every handle is dropped
    pub(crate) async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<Command>) {
        info!("Call orchestrator started");

        while let Some(command) = command_rx.recv().await {
            if let Command::Shutdown { reply } = command {
                self.fail_pending("orchestrator shut down");
                let _ = reply.send(());
                break;
            }
            self.handle_command(command).await;
        }

        info!(
            "Call orchestrator stopped with {} session(s) and {} invite(s) outstanding",
            self.sessions.len(),
            self.invites.len()
        );
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlaceCall { remote_address, reply } => {
                let _ = reply.send(self.place_call(&remote_address));
            }
            Command::MicrophoneAccessRequired { remote_address } => {
                warn!("Microphone permission denied; not dialing {}", remote_address);
                self.publish(ClientEvent::MicrophoneAccessRequired { remote_address });
            }
            Command::EndCall { call_id, reply } => {
                self.end_call(call_id).await;
                let _ = reply.send(Ok(()));
            }
            Command::SetHold { call_id, on_hold, reply } => {
                let _ = reply.send(self.request_session_action(SurfaceAction::SetHeld { call_id, on_hold }));
            }
            Command::SetMute { call_id, muted, reply } => {
                let _ = reply.send(self.request_session_action(SurfaceAction::SetMuted { call_id, muted }));
            }
            Command::PlayDigits { call_id, digits, reply } => {
                let _ = reply.send(self.request_session_action(SurfaceAction::PlayDigits { call_id, digits }));
            }
            Command::ToggleAudioRoute { to_speaker, reply } => {
                self.toggle_audio_route(to_speaker).await;
                let _ = reply.send(Ok(()));
            }
            Command::Perform { action, reply } => self.perform(action, reply).await,
            Command::TransactionFinished { action, result } => {
                self.on_transaction_finished(action, result).await;
            }
            Command::Provider(event) => self.on_provider_event(event).await,
            Command::Transport(event) => self.on_transport_event(event).await,
            Command::PushPayload { payload, reply } => {
                let result = match self.transport.decode_notification(&payload) {
                    Ok(notification) => self.on_push_notification(notification).await,
                    Err(e) => {
                        error!("Failed to decode push payload: {}", e);
                        Err(e)
                    }
                };
                let _ = reply.send(result);
            }
            Command::Push { notification, reply } => {
                let _ = reply.send(self.on_push_notification(notification).await);
            }
            Command::ActiveCalls { reply } => {
                let _ = reply.send(Ok(self.sessions.values().map(CallSession::snapshot).collect()));
            }
            Command::GetCall { call_id, reply } => {
                let result = self
                    .sessions
                    .get(&call_id)
                    .map(CallSession::snapshot)
                    .ok_or(ClientError::CallNotFound { call_id });
                let _ = reply.send(result);
            }
            Command::PendingInvites { reply } => {
                let _ = reply.send(Ok(self.invites.values().map(invite_snapshot).collect()));
            }
            Command::SpeakerOutput { reply } => {
                let _ = reply.send(Ok(self.audio_state.speaker_output));
            }
            Command::AudioEnabled { reply } => {
                let _ = reply.send(Ok(self.audio_state.device_enabled));
            }
            // Stopping is the run loop's job
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Ask the surface for a transaction without blocking the loop
    ///
    /// The surface invokes the matching `perform_*` hook before answering, and
    /// that hook needs this loop, so the request runs on its own task. The
    /// outcome comes back as [`Command::TransactionFinished`].
    pub(crate) fn request_transaction(&self, action: SurfaceAction) {
        debug!("Requesting {} transaction for call {}", action.name(), action.call_id());

        let surface = self.surface.clone();
        let command_tx = self.command_tx.clone();
        tokio::spawn(async move {
            let result = surface.request_transaction(action.clone()).await;
            match command_tx.upgrade() {
                Some(tx) => {
                    let _ = tx.send(Command::TransactionFinished { action, result });
                }
                None => debug!("Orchestrator gone before {} transaction finished", action.name()),
            }
        });
    }

    async fn on_provider_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::Began => debug!("Call surface provider began"),
            ProviderEvent::Reset => self.reset().await,
            ProviderEvent::AudioActivated => {
                debug!("Call surface activated audio session");
                self.set_audio_device_enabled(true).await;
            }
            ProviderEvent::AudioDeactivated => {
                debug!("Call surface deactivated audio session");
                self.set_audio_device_enabled(false).await;
            }
            ProviderEvent::TimedOut(action) => {
                warn!("Call surface timed out performing {} for call {}", action.name(), action.call_id());
            }
        }
    }

    /// The surface dropped every call it knew about
    async fn reset(&mut self) {
        info!(
            "Call surface reset; dropping {} session(s) and {} invite(s)",
            self.sessions.len(),
            self.invites.len()
        );
        self.set_audio_device_enabled(false).await;

        for (call_id, invite) in std::mem::take(&mut self.invites) {
            if let Err(e) = self.transport.reject(&invite).await {
                warn!("Failed to reject invite {} during reset: {}", call_id, e);
            }
        }

        for (call_id, session) in std::mem::take(&mut self.sessions) {
            if let Err(e) = self.transport.disconnect(call_id).await {
                warn!("Failed to disconnect call {} during reset: {}", call_id, e);
            }
            self.publish(ClientEvent::CallRemoved { call: session.snapshot() });
        }

        self.fail_pending("call surface reset");
    }

    async fn set_audio_device_enabled(&mut self, enabled: bool) {
        self.audio.set_device_enabled(enabled).await;
        self.audio_state.device_enabled = enabled;
    }

    fn fail_pending(&mut self, reason: &str) {
        for (call_id, pending) in self.pending.drain() {
            if let PendingCompletion::Answer(reply) = pending {
                debug!("Failing pending answer for call {}: {}", call_id, reason);
                let _ = reply.send(Err(ClientError::internal(reason)));
            }
        }
    }

    pub(crate) fn publish(&self, event: ClientEvent) {
        debug!("Publishing {:?} event for call {:?}", event.priority(), event.call_id());
        // No subscribers is fine; the UI may not be up yet
        let _ = self.event_tx.send(event);
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc::now()
    }
}

fn invite_snapshot(invite: &CallInvite) -> InviteSnapshot {
    InviteSnapshot {
        call_id: invite.id,
        correlation_id: invite.correlation_id.clone(),
        remote_address: format_remote_identity(invite.from.as_deref()),
        received_at: invite.received_at,
    }
}
