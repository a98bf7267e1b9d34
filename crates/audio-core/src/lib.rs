//! Audio-core: speakerphone routing and audio focus for call sessions
//!
//! This crate owns the single audio policy used by the calling layer. It decides
//! how to turn the speakerphone on or off and how to hold audio focus, whether or
//! not the platform telephony framework currently manages a call.
//!
//! ## Layering
//! ```text
//! call-core -> audio-core -> platform audio service (trait)
//! ```
//!
//! While a call is managed by telephony, routing goes through the call connection
//! (reached via [`CallRouteProvider`]). Otherwise the platform audio service is
//! driven directly, using the output routing strategy selected once from
//! [`AudioCapabilities`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rcall_audio_core::{AudioControl, AudioCapabilities, NoCallRouting};
//! use rcall_audio_core::platform::mock::MockAudioService;
//!
//! # tokio_test::block_on(async {
//! let audio = Arc::new(MockAudioService::new(AudioCapabilities::modern()));
//! let control = AudioControl::new(audio.clone(), Arc::new(NoCallRouting));
//!
//! assert!(control.set_speakerphone_on(true).await);
//! assert!(control.is_speakerphone_on().await);
//! # });
//! ```

pub mod control;
pub mod error;
pub mod platform;
pub mod types;

pub use control::{AudioControl, AudioRouteState, CallRouteProvider, NoCallRouting};
pub use error::{AudioError, AudioResult};
pub use platform::{select_output_routing, AudioService, OutputRouting};
pub use types::{
    AudioCapabilities, AudioContentType, AudioMode, AudioUsage, CallAudioRoute, FocusGain,
    FocusRequest, FocusResult, OutputDevice, OutputDeviceType,
};

/// Audio-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
