//! Speakerphone routing while a call is in progress
//!
//! The call registry is the route provider for AudioControl: a call whose
//! connection owns the audio route is switched through the connection, any
//! other state drives the audio service directly.

use std::sync::Arc;

use rcall_audio_core::platform::mock::{AudioCall, MockAudioService};
use rcall_audio_core::AudioCapabilities;
use rcall_call_core::platform::mock::MockConnection;
use rcall_call_core::platform::InAppConnection;
use rcall_call_core::{AudioControl, CallAudioRoute, CallRegistry};
use serial_test::serial;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rcall_call_core=debug,rcall_audio_core=debug")
        .with_test_writer()
        .try_init();
}

fn setup() -> (AudioControl, Arc<MockAudioService>, Arc<CallRegistry>) {
    let audio = Arc::new(MockAudioService::new(AudioCapabilities::modern()));
    let registry = Arc::new(CallRegistry::new());
    let control = AudioControl::new(audio.clone(), registry.clone());
    (control, audio, registry)
}

#[tokio::test]
#[serial]
async fn test_speaker_routed_through_call_connection() {
    init_tracing();

    let (control, audio, registry) = setup();
    let conn = Arc::new(MockConnection::with_route(CallAudioRoute::Bluetooth));
    registry.prepare_new_call("usrBob", conn.clone()).await.unwrap();

    assert!(control.set_speakerphone_on(true).await);
    assert_eq!(conn.current_route(), CallAudioRoute::Speaker);
    assert!(control.is_speakerphone_on().await);

    // Restores the route that was active before the speaker.
    assert!(control.set_speakerphone_on(false).await);
    assert_eq!(conn.current_route(), CallAudioRoute::Bluetooth);
    assert!(!control.is_speakerphone_on().await);

    assert_eq!(audio.count(&AudioCall::RequestFocus), 0);
}

#[tokio::test]
#[serial]
async fn test_speaker_off_without_saved_route_uses_earpiece() {
    init_tracing();

    let (control, _, registry) = setup();
    let conn = Arc::new(MockConnection::with_route(CallAudioRoute::Speaker));
    registry.prepare_new_call("usrBob", conn.clone()).await.unwrap();

    assert!(control.set_speakerphone_on(false).await);
    assert_eq!(conn.current_route(), CallAudioRoute::Earpiece);
}

#[tokio::test]
#[serial]
async fn test_in_app_call_drives_audio_service() {
    init_tracing();

    let (control, audio, registry) = setup();
    registry.prepare_new_call("usrBob", Arc::new(InAppConnection::new())).await.unwrap();

    assert!(control.set_speakerphone_on(true).await);
    assert_eq!(audio.calls()[0], AudioCall::RequestFocus);
    assert_eq!(audio.count(&AudioCall::SetCommunicationDevice(2)), 1);
}

#[tokio::test]
#[serial]
async fn test_ended_call_falls_back_to_audio_service() {
    init_tracing();

    let (control, audio, registry) = setup();
    let conn = Arc::new(MockConnection::new());
    registry.prepare_new_call("usrBob", conn.clone()).await.unwrap();
    registry.set_call_active("usrBob", 42).await.unwrap();
    registry.end_call_in_progress().await;

    assert!(control.set_speakerphone_on(true).await);
    assert_eq!(conn.current_route(), CallAudioRoute::Earpiece);
    assert_eq!(audio.count(&AudioCall::RequestFocus), 1);
}
