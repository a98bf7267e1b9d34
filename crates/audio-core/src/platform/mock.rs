//! In-memory audio service for tests and headless runs
//!
//! Behaves like a phone with an earpiece and a built-in speaker. Every call is
//! recorded so tests can assert on what the policy asked of the platform.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::AudioService;
use crate::error::{AudioError, AudioResult};
use crate::types::{
    AudioCapabilities, AudioMode, FocusRequest, FocusResult, OutputDevice, OutputDeviceType,
};

/// Platform calls observed by [`MockAudioService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCall {
    SetMode(AudioMode),
    SetMicrophoneMute(bool),
    RequestFocus,
    AbandonFocus,
    OutputDevices,
    SetCommunicationDevice(u32),
    ClearCommunicationDevice,
    SetSpeakerphoneOn(bool),
}

#[derive(Debug)]
struct MockAudioState {
    mode: AudioMode,
    microphone_muted: bool,
    focus_held: bool,
    devices: Vec<OutputDevice>,
    communication_device: Option<OutputDevice>,
    speakerphone_on: bool,
    focus_response: FocusResult,
    abandon_response: FocusResult,
    refuse_device_selection: bool,
    fail_enumeration: bool,
    calls: Vec<AudioCall>,
}

/// Recording mock of the platform audio manager
#[derive(Debug)]
pub struct MockAudioService {
    capabilities: AudioCapabilities,
    state: Mutex<MockAudioState>,
}

impl MockAudioService {
    /// Phone with earpiece and built-in speaker
    pub fn new(capabilities: AudioCapabilities) -> Self {
        Self::with_devices(
            capabilities,
            vec![
                OutputDevice::new(1, OutputDeviceType::BuiltinEarpiece),
                OutputDevice::new(2, OutputDeviceType::BuiltinSpeaker),
            ],
        )
    }

    pub fn with_devices(capabilities: AudioCapabilities, devices: Vec<OutputDevice>) -> Self {
        Self {
            capabilities,
            state: Mutex::new(MockAudioState {
                mode: AudioMode::Normal,
                microphone_muted: false,
                focus_held: false,
                devices,
                communication_device: None,
                speakerphone_on: false,
                focus_response: FocusResult::Granted,
                abandon_response: FocusResult::Granted,
                refuse_device_selection: false,
                fail_enumeration: false,
                calls: Vec::new(),
            }),
        }
    }

    /// Answer future focus requests with `result`
    pub fn respond_to_focus_with(&self, result: FocusResult) {
        self.state.lock().focus_response = result;
    }

    /// Answer future focus abandons with `result`
    pub fn respond_to_abandon_with(&self, result: FocusResult) {
        self.state.lock().abandon_response = result;
    }

    /// Make `set_communication_device` return `false`
    pub fn refuse_device_selection(&self, refuse: bool) {
        self.state.lock().refuse_device_selection = refuse;
    }

    /// Make `output_devices` return an error
    pub fn fail_enumeration(&self, fail: bool) {
        self.state.lock().fail_enumeration = fail;
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: &AudioCall) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn mode(&self) -> AudioMode {
        self.state.lock().mode
    }

    pub fn is_microphone_muted(&self) -> bool {
        self.state.lock().microphone_muted
    }

    pub fn is_focus_held(&self) -> bool {
        self.state.lock().focus_held
    }
}

#[async_trait]
impl AudioService for MockAudioService {
    fn capabilities(&self) -> AudioCapabilities {
        self.capabilities
    }

    async fn set_mode(&self, mode: AudioMode) -> AudioResult<()> {
        let mut state = self.state.lock();
        state.calls.push(AudioCall::SetMode(mode));
        state.mode = mode;
        Ok(())
    }

    async fn set_microphone_mute(&self, mute: bool) -> AudioResult<()> {
        let mut state = self.state.lock();
        state.calls.push(AudioCall::SetMicrophoneMute(mute));
        state.microphone_muted = mute;
        Ok(())
    }

    async fn request_audio_focus(&self, _request: &FocusRequest) -> FocusResult {
        let mut state = self.state.lock();
        state.calls.push(AudioCall::RequestFocus);
        let result = state.focus_response;
        if result == FocusResult::Granted {
            state.focus_held = true;
        }
        result
    }

    async fn abandon_audio_focus(&self, _request: &FocusRequest) -> FocusResult {
        let mut state = self.state.lock();
        state.calls.push(AudioCall::AbandonFocus);
        let result = state.abandon_response;
        if result == FocusResult::Granted {
            state.focus_held = false;
        }
        result
    }

    async fn output_devices(&self) -> AudioResult<Vec<OutputDevice>> {
        let mut state = self.state.lock();
        state.calls.push(AudioCall::OutputDevices);
        if state.fail_enumeration {
            return Err(AudioError::platform("device enumeration failed"));
        }
        Ok(state.devices.clone())
    }

    async fn set_communication_device(&self, device: &OutputDevice) -> AudioResult<bool> {
        if !self.capabilities.communication_device_selection {
            return Err(AudioError::unsupported("setCommunicationDevice"));
        }
        let mut state = self.state.lock();
        state.calls.push(AudioCall::SetCommunicationDevice(device.id));
        if state.refuse_device_selection {
            return Ok(false);
        }
        state.communication_device = Some(device.clone());
        Ok(true)
    }

    async fn clear_communication_device(&self) -> AudioResult<()> {
        if !self.capabilities.communication_device_selection {
            return Err(AudioError::unsupported("clearCommunicationDevice"));
        }
        let mut state = self.state.lock();
        state.calls.push(AudioCall::ClearCommunicationDevice);
        state.communication_device = None;
        Ok(())
    }

    async fn communication_device(&self) -> AudioResult<Option<OutputDevice>> {
        if !self.capabilities.communication_device_selection {
            return Err(AudioError::unsupported("getCommunicationDevice"));
        }
        Ok(self.state.lock().communication_device.clone())
    }

    async fn set_speakerphone_on(&self, on: bool) -> AudioResult<()> {
        let mut state = self.state.lock();
        state.calls.push(AudioCall::SetSpeakerphoneOn(on));
        state.speakerphone_on = on;
        Ok(())
    }

    async fn is_speakerphone_on(&self) -> AudioResult<bool> {
        Ok(self.state.lock().speakerphone_on)
    }
}
