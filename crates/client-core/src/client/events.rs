//! Transport and push event handling for the orchestrator
//!
//! Transport progress moves sessions through the state machine and resolves
//! pending dial/answer completions. Push notifications create invites or
//! cancel them.

use tracing::{debug, error, info, warn};

use crate::{
    call::{CallId, CallInvite, CallState, CancelledCallInvite, EndedReason},
    client::types::{PendingCompletion, TransportEvent},
    error::{ClientError, ClientResult},
    events::ClientEvent,
    handle::{CallHandle, CallUpdate},
    transport::PushNotification,
};

use super::Orchestrator;

impl Orchestrator {
    pub(crate) async fn on_transport_event(&mut self, event: TransportEvent) {
        debug!("Transport event: {:?}", event);
        match event {
            TransportEvent::Connected { call_id } => self.on_connected(call_id).await,
            TransportEvent::Ringing { call_id } => self.on_ringing(call_id),
            TransportEvent::FailedToConnect { call_id, error } => self.on_failed_to_connect(call_id, error).await,
            TransportEvent::Disconnected { call_id, error } => self.on_disconnected(call_id, error).await,
        }
    }

    async fn on_connected(&mut self, call_id: CallId) {
        let pending = self.pending.remove(&call_id);

        let Some(session) = self.sessions.get_mut(&call_id) else {
            warn!("Transport connected unknown call {}", call_id);
            return;
        };

        if let Err(e) = session.transition_to(CallState::Connected) {
            warn!("Dropping transition: {}", e);
            if let Some(PendingCompletion::Answer(reply)) = pending {
                let _ = reply.send(Err(e));
            }
            return;
        }

        let snapshot = session.snapshot();
        info!("Call {} connected", call_id);

        match pending {
            Some(PendingCompletion::Dial) => {
                self.surface.report_outgoing_connected(call_id, Self::now()).await;
            }
            Some(PendingCompletion::Answer(reply)) => {
                let _ = reply.send(Ok(()));
            }
            None => {}
        }

        self.publish(ClientEvent::CallUpdated { call: snapshot });
    }

    fn on_ringing(&mut self, call_id: CallId) {
        let Some(session) = self.sessions.get_mut(&call_id) else {
            warn!("Transport reported ringing for unknown call {}", call_id);
            return;
        };

        match session.transition_to(CallState::Ringing) {
            Ok(_) => {
                let snapshot = session.snapshot();
                debug!("Call {} ringing", call_id);
                self.publish(ClientEvent::CallUpdated { call: snapshot });
            }
            Err(e) => warn!("Dropping transition: {}", e),
        }
    }

    async fn on_failed_to_connect(&mut self, call_id: CallId, reason: String) {
        error!("Call {} failed to connect: {}", call_id, reason);

        if let Some(PendingCompletion::Answer(reply)) = self.pending.remove(&call_id) {
            let _ = reply.send(Err(ClientError::transport(reason)));
        }

        self.surface
            .report_call_ended(call_id, Self::now(), EndedReason::Failed)
            .await;

        if let Some(session) = self.sessions.remove(&call_id) {
            self.publish(ClientEvent::CallRemoved { call: session.snapshot() });
        }
    }

    async fn on_disconnected(&mut self, call_id: CallId, reason: Option<String>) {
        match &reason {
            Some(reason) => warn!("Call {} disconnected with error: {}", call_id, reason),
            None => info!("Call {} disconnected", call_id),
        }

        if let Some(PendingCompletion::Answer(reply)) = self.pending.remove(&call_id) {
            let message = reason.clone().unwrap_or_else(|| "call disconnected before connecting".to_string());
            let _ = reply.send(Err(ClientError::transport(message)));
        }

        let session = self.sessions.remove(&call_id);
        let surface_knows = session.as_ref().is_some_and(|s| s.user_initiated_teardown);

        if surface_knows {
            debug!("Call {} end already known to the call surface", call_id);
        } else {
            let ended = if reason.is_some() {
                EndedReason::Failed
            } else {
                EndedReason::RemoteEnded
            };
            self.surface.report_call_ended(call_id, Self::now(), ended).await;
        }

        if let Some(session) = session {
            self.publish(ClientEvent::CallRemoved { call: session.snapshot() });
        }
    }

    pub(crate) async fn on_push_notification(&mut self, notification: PushNotification) -> ClientResult<()> {
        match notification {
            PushNotification::Invite(invite) => self.on_invite(invite).await,
            PushNotification::Cancelled { cancelled, reason } => {
                self.on_invite_cancelled(cancelled, reason).await;
                Ok(())
            }
        }
    }

    async fn on_invite(&mut self, invite: CallInvite) -> ClientResult<()> {
        let call_id = invite.id;
        info!("Invite {} received from {:?}", call_id, invite.from);

        // Delivery of a push resets the binding TTL
        if let Err(e) = self.keep_alive.refresh_binding(Self::now()) {
            warn!("Failed to refresh push binding date: {}", e);
        }

        if self.invites.contains_key(&call_id) || self.sessions.contains_key(&call_id) {
            warn!("Ignoring duplicate invite {}", call_id);
            return Err(ClientError::DuplicateCall { call_id });
        }

        let update = CallUpdate::voice(CallHandle::from_remote_identity(invite.from.as_deref()));
        self.invites.insert(call_id, invite);

        if let Err(e) = self.surface.report_new_incoming_call(call_id, update).await {
            error!("Call surface refused incoming call {}: {}", call_id, e);
            if let Some(invite) = self.invites.remove(&call_id) {
                if let Err(e) = self.transport.reject(&invite).await {
                    warn!("Failed to reject invite {}: {}", call_id, e);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn on_invite_cancelled(&mut self, cancelled: CancelledCallInvite, reason: String) {
        let matched = self
            .invites
            .values()
            .find(|invite| invite.correlation_id == cancelled.correlation_id)
            .map(|invite| invite.id);

        match matched {
            Some(call_id) => {
                info!("Invite {} cancelled: {}", call_id, reason);
                self.end_call(call_id).await;
            }
            None => warn!(
                "Ignoring cancellation for unknown invite {} ({})",
                cancelled.correlation_id, reason
            ),
        }
    }
}
