//! Outbound call scenarios through the full surface round trip

mod common;

use ahoy_client_core::{
    audio::RecordPermission,
    surface::SurfaceAction,
    transport::TransportEventSink,
    CallDirection, CallHandle, CallState, CallUpdate, ClientError, ClientEvent, EndedReason,
};
use tokio_test::assert_ok;
use tracing_test::traced_test;

use common::{eventually, MockAudio, SurfaceReport, TestClient, TransportOp};

#[tokio::test]
#[traced_test]
async fn test_place_call_normalizes_address() {
    let mut t = TestClient::start().await;

    let call_id = t.dial("(555) 123-4567").await;

    let start = SurfaceAction::Start {
        call_id,
        handle: CallHandle::new("5551234567"),
    };
    assert!(t.surface.requested().contains(&start));
    assert_eq!(t.transport.connected_to(), vec!["5551234567".to_string()]);

    let call = assert_ok!(t.client.call(call_id).await);
    assert_eq!(call.remote_address, "5551234567");
    assert_eq!(call.direction, CallDirection::Outbound);
    assert_eq!(call.state, CallState::Connecting);
    assert!(t.surface.reports().contains(&SurfaceReport::StartedConnecting(call_id)));
    let updated = SurfaceReport::Updated(call_id, CallUpdate::voice(CallHandle::new("5551234567")));
    assert!(t.surface.reports().contains(&updated));
}

#[tokio::test]
async fn test_outbound_progression_reports_connected() {
    let mut t = TestClient::start().await;
    let call_id = t.dial("5551234567").await;

    t.client.call_did_start_ringing(call_id);
    let ringing = t
        .next_event(|e| matches!(e, ClientEvent::CallUpdated { call } if call.state == CallState::Ringing))
        .await;
    assert_eq!(ringing.call_id(), Some(call_id));

    t.client.call_did_connect(call_id);
    t.next_event(|e| matches!(e, ClientEvent::CallUpdated { call } if call.state == CallState::Connected))
        .await;

    assert!(t.surface.reports().contains(&SurfaceReport::Connected(call_id)));
    let call = assert_ok!(t.client.call(call_id).await);
    assert!(call.connected_at.is_some());
}

#[tokio::test]
#[traced_test]
async fn test_end_call_removes_session_exactly_once() {
    let mut t = TestClient::start().await;
    let call_id = t.connected_call("5551234567").await;

    assert_ok!(t.client.end_call(call_id).await);
    t.next_event(|e| matches!(e, ClientEvent::CallUpdated { call } if call.state == CallState::Disconnecting))
        .await;
    assert!(t.transport.ops().contains(&TransportOp::Disconnect(call_id)));

    t.client.call_did_disconnect(call_id, None);
    t.next_event(|e| matches!(e, ClientEvent::CallRemoved { call } if call.call_id == call_id))
        .await;

    // The surface ended the call itself; no second end report
    assert!(t.surface.ended().is_empty());
    assert!(assert_ok!(t.client.active_calls().await).is_empty());

    // A duplicate disconnect does not publish another removal
    t.client.call_did_disconnect(call_id, None);
    assert_ok!(t.client.active_calls().await);
    let removed = t
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, ClientEvent::CallRemoved { .. }))
        .count();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_remote_hangup_is_reported_to_surface() {
    let mut t = TestClient::start().await;
    let call_id = t.connected_call("5551234567").await;

    t.client.call_did_disconnect(call_id, None);
    t.next_event(|e| matches!(e, ClientEvent::CallRemoved { .. })).await;

    assert_eq!(t.surface.ended(), vec![(call_id, EndedReason::RemoteEnded)]);
}

#[tokio::test]
async fn test_failed_connect_removes_session() {
    let mut t = TestClient::start().await;
    let call_id = t.dial("5551234567").await;

    t.client.call_did_fail_to_connect(call_id, "403 Forbidden".to_string());
    let removed = t.next_event(|e| matches!(e, ClientEvent::CallRemoved { .. })).await;

    assert_eq!(removed.call_id(), Some(call_id));
    assert_eq!(t.surface.ended(), vec![(call_id, EndedReason::Failed)]);
    assert!(matches!(
        t.client.call(call_id).await,
        Err(ClientError::CallNotFound { .. })
    ));
}

#[tokio::test]
#[traced_test]
async fn test_denied_start_creates_nothing() {
    let t = TestClient::start().await;
    t.surface.deny("start");

    let call_id = assert_ok!(t.client.place_call("5551234567").await);

    let surface = t.surface.clone();
    eventually(|| {
        let surface = surface.clone();
        async move { !surface.requested().is_empty() }
    })
    .await;

    assert!(t.transport.ops().is_empty());
    assert!(matches!(
        t.client.call(call_id).await,
        Err(ClientError::CallNotFound { .. })
    ));
}

#[tokio::test]
async fn test_empty_address_is_rejected() {
    let t = TestClient::start().await;
    let result = t.client.place_call("() - ").await;
    assert!(matches!(result, Err(ClientError::InvalidAddress { .. })));
    assert!(t.surface.requested().is_empty());
}

#[tokio::test]
async fn test_denied_microphone_offers_choice() {
    let mut t = TestClient::start_with(MockAudio::with_permission(RecordPermission::Denied, false)).await;

    let result = t.client.place_call("(555) 123-4567").await;
    assert_eq!(result, Err(ClientError::MicrophonePermissionDenied));

    let event = t
        .next_event(|e| matches!(e, ClientEvent::MicrophoneAccessRequired { .. }))
        .await;
    assert_eq!(
        event,
        ClientEvent::MicrophoneAccessRequired {
            remote_address: "(555) 123-4567".to_string()
        }
    );
    assert!(t.surface.requested().is_empty());

    // The user chose to continue without the microphone
    let call_id = assert_ok!(t.client.place_call_without_microphone("(555) 123-4567").await);
    t.next_event(|e| matches!(e, ClientEvent::CallAdded { call } if call.call_id == call_id))
        .await;
}

#[tokio::test]
async fn test_undetermined_microphone_prompts_user() {
    let mut t = TestClient::start_with(MockAudio::with_permission(RecordPermission::Undetermined, true)).await;
    let call_id = t.dial("5551234567").await;
    assert_ok!(t.client.call(call_id).await);
}

#[tokio::test]
async fn test_two_calls_are_tracked_independently() {
    let mut t = TestClient::start().await;
    let first = t.connected_call("5551234567").await;
    let second = t.dial("client:bob").await;

    let calls = assert_ok!(t.client.active_calls().await);
    assert_eq!(calls.len(), 2);

    t.client.call_did_disconnect(first, Some("network lost".to_string()));
    t.next_event(|e| matches!(e, ClientEvent::CallRemoved { call } if call.call_id == first))
        .await;

    let calls = assert_ok!(t.client.active_calls().await);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_id, second);
    assert_eq!(t.surface.ended(), vec![(first, EndedReason::Failed)]);
}
