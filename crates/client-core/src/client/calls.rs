//! Call control for the orchestrator
//!
//! Presentation intents (`place_call`, `end_call`, hold, mute, digits, audio
//! route) turn into surface transaction requests here, and the surface's
//! `perform_*` callbacks are carried out against the transport.

use tracing::{debug, error, info, warn};

use crate::{
    audio::AudioOutput,
    call::{CallId, CallSession, CallState},
    client::types::{PendingCompletion, Responder},
    error::{ClientError, ClientResult},
    events::ClientEvent,
    handle::{format_remote_identity, sanitize_dial_string, CallHandle, CallUpdate},
    surface::SurfaceAction,
    transport::ConnectOptions,
};

use super::Orchestrator;

impl Orchestrator {
    /// Normalize the address and ask the surface to start an outgoing call
    pub(crate) fn place_call(&mut self, remote_address: &str) -> ClientResult<CallId> {
        let address = sanitize_dial_string(remote_address);
        if address.is_empty() {
            warn!("Refusing to dial empty address {:?}", remote_address);
            return Err(ClientError::InvalidAddress {
                address: remote_address.to_string(),
            });
        }

        let call_id = CallId::new_v4();
        info!("Placing call {} to {}", call_id, address);
        self.request_transaction(SurfaceAction::Start {
            call_id,
            handle: CallHandle::new(address),
        });
        Ok(call_id)
    }

    /// Local hang-up or decline
    pub(crate) async fn end_call(&mut self, call_id: CallId) {
        if let Some(invite) = self.invites.remove(&call_id) {
            info!("Declining invite {}", call_id);
            if let Err(e) = self.transport.reject(&invite).await {
                warn!("Failed to reject invite {}: {}", call_id, e);
            }
        } else if let Some(session) = self.sessions.get_mut(&call_id) {
            info!("Ending call {} in state {}", call_id, session.state());
            session.user_initiated_teardown = true;
        } else {
            debug!("Ending unknown call {}", call_id);
        }

        self.request_transaction(SurfaceAction::End { call_id });
    }

    /// Request a surface action that needs an existing session
    pub(crate) fn request_session_action(&mut self, action: SurfaceAction) -> ClientResult<()> {
        let call_id = action.call_id();
        if !self.sessions.contains_key(&call_id) {
            warn!("Cannot request {} for unknown call {}", action.name(), call_id);
            return Err(ClientError::CallNotFound { call_id });
        }
        self.request_transaction(action);
        Ok(())
    }

    pub(crate) async fn toggle_audio_route(&mut self, to_speaker: bool) {
        let output = AudioOutput::from_speaker(to_speaker);
        match self.audio.override_output(output).await {
            Ok(()) => {
                debug!("Audio output set to {:?}", output);
                if self.audio_state.speaker_output != to_speaker {
                    self.audio_state.speaker_output = to_speaker;
                    self.publish(ClientEvent::AudioRouteChanged { speaker: to_speaker });
                }
            }
            Err(e) => error!("Failed to route audio to {:?}: {}", output, e),
        }
    }

    /// Outcome of a transaction request made by [`Orchestrator::request_transaction`]
    pub(crate) async fn on_transaction_finished(&mut self, action: SurfaceAction, result: ClientResult<()>) {
        let call_id = action.call_id();
        let e = match result {
            Ok(()) => {
                debug!("Call surface granted {} for call {}", action.name(), call_id);
                return;
            }
            Err(e) => e,
        };

        error!("Call surface refused {} for call {}: {}", action.name(), call_id, e);

        if let SurfaceAction::End { .. } = action {
            if let Some(session) = self.sessions.get_mut(&call_id) {
                if session.state() != CallState::Disconnecting {
                    session.user_initiated_teardown = false;
                }
            }
        }
    }

    /// Carry out an action the surface granted
    pub(crate) async fn perform(&mut self, action: SurfaceAction, reply: Responder<()>) {
        debug!("Call surface asked to perform {} for call {}", action.name(), action.call_id());

        let result = match action {
            SurfaceAction::Start { call_id, handle } => self.perform_start(call_id, handle).await,
            SurfaceAction::Answer { call_id } => {
                // Answered once the transport connects; see on_transport_event
                return self.perform_answer(call_id, reply).await;
            }
            SurfaceAction::End { call_id } => self.perform_end(call_id).await,
            SurfaceAction::SetHeld { call_id, on_hold } => self.perform_set_held(call_id, on_hold).await,
            SurfaceAction::SetMuted { call_id, muted } => self.perform_set_muted(call_id, muted).await,
            SurfaceAction::PlayDigits { call_id, digits } => self.perform_play_digits(call_id, &digits).await,
        };

        if let Err(e) = &result {
            warn!("Failing surface action: {}", e);
        }
        let _ = reply.send(result);
    }

    async fn perform_start(&mut self, call_id: CallId, handle: CallHandle) -> ClientResult<()> {
        if self.sessions.contains_key(&call_id) || self.invites.contains_key(&call_id) {
            return Err(ClientError::DuplicateCall { call_id });
        }

        self.surface
            .report_outgoing_started_connecting(call_id, Self::now())
            .await;

        let options = ConnectOptions::dial(call_id, self.config.access_token.clone(), handle.value.clone());
        self.transport.connect(options).await.map_err(|e| {
            error!("Transport failed to connect call {}: {}", call_id, e);
            e
        })?;
        self.surface
            .report_call_updated(call_id, CallUpdate::voice(handle.clone()))
            .await;

        let session = CallSession::outbound(call_id, handle.value);
        let snapshot = session.snapshot();
        self.sessions.insert(call_id, session);
        self.pending.insert(call_id, PendingCompletion::Dial);

        info!("Outgoing call {} connecting to {}", call_id, snapshot.remote_address);
        self.publish(ClientEvent::CallAdded { call: snapshot });
        Ok(())
    }

    async fn perform_answer(&mut self, call_id: CallId, reply: Responder<()>) {
        if self.sessions.contains_key(&call_id) {
            let _ = reply.send(Err(ClientError::DuplicateCall { call_id }));
            return;
        }
        let Some(invite) = self.invites.remove(&call_id) else {
            warn!("No pending invite to answer for call {}", call_id);
            let _ = reply.send(Err(ClientError::InviteNotFound { call_id }));
            return;
        };

        if let Err(e) = self.transport.accept(&invite).await {
            error!("Transport failed to accept invite {}: {}", call_id, e);
            let _ = reply.send(Err(e));
            return;
        }

        let session = CallSession::inbound(call_id, format_remote_identity(invite.from.as_deref()));
        let snapshot = session.snapshot();
        self.sessions.insert(call_id, session);
        self.pending.insert(call_id, PendingCompletion::Answer(reply));

        info!("Answered call {} from {}", call_id, snapshot.remote_address);
        self.publish(ClientEvent::CallAdded { call: snapshot });
    }

    async fn perform_end(&mut self, call_id: CallId) -> ClientResult<()> {
        if let Some(invite) = self.invites.remove(&call_id) {
            info!("Rejecting invite {}", call_id);
            return self.transport.reject(&invite).await;
        }

        let Some(state) = self.sessions.get(&call_id).map(CallSession::state) else {
            info!("No call {} to end; nothing to do", call_id);
            return Ok(());
        };
        if state == CallState::Disconnecting {
            debug!("Call {} is already disconnecting", call_id);
            return Ok(());
        }

        self.transport.disconnect(call_id).await?;

        if let Some(session) = self.sessions.get_mut(&call_id) {
            session.user_initiated_teardown = true;
            if let Err(e) = session.transition_to(CallState::Disconnecting) {
                warn!("Dropping transition: {}", e);
                return Ok(());
            }
            let snapshot = session.snapshot();
            self.publish(ClientEvent::CallUpdated { call: snapshot });
        }
        Ok(())
    }

    async fn perform_set_held(&mut self, call_id: CallId, on_hold: bool) -> ClientResult<()> {
        let session = self
            .sessions
            .get_mut(&call_id)
            .ok_or(ClientError::CallNotFound { call_id })?;
        if !session.state().allows_media_controls() {
            warn!("Setting hold on call {} while {}", call_id, session.state());
        }

        session.is_on_hold = on_hold;
        let snapshot = session.snapshot();

        if let Err(e) = self.transport.set_on_hold(call_id, on_hold).await {
            warn!("Transport ignored hold change for call {}: {}", call_id, e);
        }
        self.publish(ClientEvent::CallUpdated { call: snapshot });
        Ok(())
    }

    async fn perform_set_muted(&mut self, call_id: CallId, muted: bool) -> ClientResult<()> {
        let session = self
            .sessions
            .get_mut(&call_id)
            .ok_or(ClientError::CallNotFound { call_id })?;
        if !session.state().allows_media_controls() {
            warn!("Setting mute on call {} while {}", call_id, session.state());
        }

        session.is_muted = muted;
        let snapshot = session.snapshot();

        if let Err(e) = self.transport.set_muted(call_id, muted).await {
            warn!("Transport ignored mute change for call {}: {}", call_id, e);
        }
        self.publish(ClientEvent::CallUpdated { call: snapshot });
        Ok(())
    }

    async fn perform_play_digits(&mut self, call_id: CallId, digits: &str) -> ClientResult<()> {
        if !self.sessions.contains_key(&call_id) {
            return Err(ClientError::CallNotFound { call_id });
        }
        let digits = self.config.dtmf_string(digits);
        debug!("Sending digits {:?} on call {}", digits, call_id);
        self.transport.send_digits(call_id, &digits).await
    }
}
