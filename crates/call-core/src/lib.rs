//! Call-core: call-session lifecycle for a messaging client
//!
//! This crate sits between the messaging client and the platform telephony
//! framework. It registers the local user as a self-managed calling account,
//! places and accepts calls, keeps track of the one call in progress, and
//! tears calls down when the user or the server ends them.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────────┐   ┌───────────────────┐
//! │ CallManager   │   │ CallSignalHandler│   │ UI / notification │
//! └──────┬────────┘   └────────┬─────────┘   └─────────┬─────────┘
//!        │                     │ close intents         │
//!        │                     ▼                       ▼
//!        │             ┌───────────────┐      ┌────────────────┐
//!        │             │ LocalBroadcast│─────►│ HangUpReceiver │
//!        │             └───────────────┘      └───────┬────────┘
//!        ▼                                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ CallRegistry (one CallSession at a time)                    │
//! └───────────────────────────┬─────────────────────────────────┘
//!                             │ CallRouteProvider
//!                             ▼
//!                  rcall_audio_core::AudioControl
//! ```
//!
//! Platform services (telephony, notifications, permissions, messaging, UI)
//! are traits in [`platform`]; [`platform::mock`] has in-memory versions.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use rcall_call_core::{CallConfig, CallManager, CallPlatform, CallRegistry};
//! use rcall_call_core::platform::mock::*;
//! use rcall_call_core::types::TelecomCapabilities;
//!
//! # tokio_test::block_on(async {
//! let telecom = Arc::new(MockTelecom::new(TelecomCapabilities::modern()));
//! let messaging = Arc::new(MockMessagingSession::new(Some("usrMe"), Some("Alice")));
//! messaging.add_topic("usrBob", Some("Bob"));
//!
//! let platform = CallPlatform {
//!     telecom: telecom.clone(),
//!     notifications: Arc::new(MockNotifications::new()),
//!     permissions: Arc::new(MockPermissions::all_granted()),
//!     messaging,
//!     ui: Arc::new(MockCallUi::new()),
//!     manufacturer: "Google".to_string(),
//! };
//!
//! let config = CallConfig::default();
//! let bus = config.intent_bus();
//! let registry = Arc::new(CallRegistry::new());
//! let manager = CallManager::new(config, platform, registry, bus).await.unwrap();
//!
//! manager.place_outgoing_call("usrBob", false).await;
//! assert_eq!(telecom.placed_calls()[0].0, "tinode:usrBob");
//! # });
//! ```

pub mod call;
pub mod config;
pub mod error;
pub mod events;
pub mod hangup;
pub mod manager;
pub mod platform;
pub mod push;
pub mod registry;
pub mod types;

pub use call::{CallSeq, CallSession};
pub use config::CallConfig;
pub use error::{CallError, CallResult};
pub use events::{CallEvent, CallIntent, CallIntentAction, LocalBroadcast};
pub use hangup::HangUpReceiver;
pub use manager::{CallManager, CallPlatform, PhoneAccountRegistration};
pub use push::{parse_seq_reference, CallSignalHandler, SignalOutcome, WebRtcAction};
pub use registry::CallRegistry;

pub use rcall_audio_core::{AudioControl, CallAudioRoute, CallRouteProvider};

/// Call-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
