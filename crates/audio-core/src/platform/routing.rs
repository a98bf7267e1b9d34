//! Output routing strategies

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AudioService, OutputRouting};
use crate::types::OutputDeviceType;

/// Routing through explicit communication-device selection
#[derive(Debug, Default, Clone, Copy)]
pub struct CommunicationDeviceRouting;

#[async_trait]
impl OutputRouting for CommunicationDeviceRouting {
    fn name(&self) -> &'static str {
        "communication-device"
    }

    async fn set_speaker(&self, audio: &dyn AudioService, enable: bool) -> bool {
        if !enable {
            // No way to verify the result of clearing; treat as done unless the platform errors.
            return match audio.clear_communication_device().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Failed to clear communication device");
                    false
                }
            };
        }

        let devices = match audio.output_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate output devices");
                return false;
            }
        };

        let Some(speaker) = devices.iter().find(|d| d.is_builtin_speaker()) else {
            debug!("No built-in speaker among {} output devices", devices.len());
            return false;
        };

        match audio.set_communication_device(speaker).await {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, device_id = speaker.id, "Failed to select speaker");
                false
            }
        }
    }

    async fn is_speaker_on(&self, audio: &dyn AudioService) -> bool {
        match audio.communication_device().await {
            Ok(Some(device)) => device.device_type == OutputDeviceType::BuiltinSpeaker,
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read communication device");
                false
            }
        }
    }
}

/// Routing through the legacy boolean speakerphone flag
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacySpeakerRouting;

#[async_trait]
impl OutputRouting for LegacySpeakerRouting {
    fn name(&self) -> &'static str {
        "legacy-speakerphone"
    }

    async fn set_speaker(&self, audio: &dyn AudioService, enable: bool) -> bool {
        match audio.set_speakerphone_on(enable).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, enable, "Legacy speakerphone toggle failed");
                false
            }
        }
    }

    async fn is_speaker_on(&self, audio: &dyn AudioService) -> bool {
        audio.is_speakerphone_on().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read speakerphone flag");
            false
        })
    }
}
