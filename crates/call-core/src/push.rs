//! Call signals delivered by push notification
//!
//! The server notifies the device of call state changes through push data
//! (`webrtc`, `topic`, `seq`, `replace`, `aonly` fields). When the signal
//! ends a call that this device is showing, [`CallSignalHandler`] puts a close
//! intent on the bus so the [`HangUpReceiver`](crate::HangUpReceiver) tears it down.
//!
//! ```rust
//! use std::collections::HashMap;
//! use rcall_call_core::{CallRegistry, CallSignalHandler, LocalBroadcast, SignalOutcome};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let bus = LocalBroadcast::default();
//! let mut rx = bus.subscribe();
//! let handler = CallSignalHandler::new(Arc::new(CallRegistry::new()), bus);
//!
//! let data: HashMap<String, String> = [
//!     ("webrtc", "missed"), ("topic", "grp1"), ("seq", "43"), ("replace", ":42"),
//! ].into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
//!
//! let outcome = handler.handle(&data).await;
//! assert_eq!(outcome, SignalOutcome::CloseSent { topic: "grp1".into(), seq: 42 });
//! assert_eq!(rx.recv().await.unwrap().seq, Some(42));
//! # });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::{CallIntent, LocalBroadcast};
use crate::registry::CallRegistry;

/// Call state reported in the `webrtc` push field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebRtcAction {
    Started,
    Accepted,
    Busy,
    Declined,
    Disconnected,
    Finished,
    Missed,
}

impl FromStr for WebRtcAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "accepted" => Ok(Self::Accepted),
            "busy" => Ok(Self::Busy),
            "declined" => Ok(Self::Declined),
            "disconnected" => Ok(Self::Disconnected),
            "finished" => Ok(Self::Finished),
            "missed" => Ok(Self::Missed),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for WebRtcAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "started",
            Self::Accepted => "accepted",
            Self::Busy => "busy",
            Self::Declined => "declined",
            Self::Disconnected => "disconnected",
            Self::Finished => "finished",
            Self::Missed => "missed",
        };
        f.write_str(s)
    }
}

/// What the handler did with a push signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Not a call signal, malformed, or nothing to do
    Ignored,
    /// The signal refers to the call this device already accepted
    AlreadyAccepted,
    /// The signal is about a call other than the one in progress
    OtherCall,
    /// A close intent for `(topic, seq)` was broadcast
    CloseSent { topic: String, seq: u32 },
}

/// Parse a message reference: `":123"` or `"123"`. Anything else is 0.
pub fn parse_seq_reference(reference: Option<&str>) -> u32 {
    let Some(reference) = reference.filter(|r| !r.is_empty()) else {
        return 0;
    };
    let digits = match reference.strip_prefix(':') {
        Some(rest) if !rest.is_empty() => rest,
        _ => reference,
    };
    digits.parse::<u32>().unwrap_or(0)
}

/// Turns push call signals into call intents
pub struct CallSignalHandler {
    registry: Arc<CallRegistry>,
    bus: LocalBroadcast,
}

impl CallSignalHandler {
    pub fn new(registry: Arc<CallRegistry>, bus: LocalBroadcast) -> Self {
        Self { registry, bus }
    }

    /// Handle push data given as a JSON object of string fields
    pub async fn handle_json(&self, payload: &str) -> SignalOutcome {
        match serde_json::from_str::<HashMap<String, String>>(payload) {
            Ok(data) => self.handle(&data).await,
            Err(e) => {
                warn!(error = %e, "Malformed push payload");
                SignalOutcome::Ignored
            }
        }
    }

    /// Handle push data
    pub async fn handle(&self, data: &HashMap<String, String>) -> SignalOutcome {
        let Some(webrtc) = data.get("webrtc").filter(|w| !w.is_empty()) else {
            return SignalOutcome::Ignored;
        };

        let seq_field = data.get("seq").map(String::as_str);
        let seq = seq_field.and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
        if seq <= 0 {
            warn!(seq = ?seq_field, "Invalid seq value");
            return SignalOutcome::Ignored;
        }

        let action = match webrtc.parse::<WebRtcAction>() {
            Ok(action) => action,
            Err(unknown) => {
                warn!(action = %unknown, "Unknown webrtc action");
                return SignalOutcome::Ignored;
            }
        };

        let topic = data.get("topic").cloned().unwrap_or_default();
        let replaced = parse_seq_reference(data.get("replace").map(String::as_str));

        // The incoming call itself arrives as a regular data message.
        if action == WebRtcAction::Started || replaced == 0 {
            return SignalOutcome::Ignored;
        }

        if let Some(call) = self.registry.current().await {
            if !call.pertains_to(&topic, replaced) {
                debug!(%action, topic = %topic, seq = replaced, current = %call.topic(), "Signal is for another call");
                return SignalOutcome::OtherCall;
            }
            if action == WebRtcAction::Accepted && call.is_connected().await && call.matches(&topic, replaced) {
                debug!(topic = %topic, seq = replaced, "Call already accepted on this device");
                return SignalOutcome::AlreadyAccepted;
            }
        }

        debug!(%action, topic = %topic, seq = replaced, "Dismissing call");
        self.bus.send(CallIntent::close(topic.clone(), replaced));
        SignalOutcome::CloseSent { topic, seq: replaced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seq_reference() {
        assert_eq!(parse_seq_reference(Some(":123")), 123);
        assert_eq!(parse_seq_reference(Some("123")), 123);
        assert_eq!(parse_seq_reference(Some(":")), 0);
        assert_eq!(parse_seq_reference(Some("abc")), 0);
        assert_eq!(parse_seq_reference(Some(":-5")), 0);
        assert_eq!(parse_seq_reference(Some("")), 0);
        assert_eq!(parse_seq_reference(None), 0);
    }

    #[test]
    fn test_webrtc_action_names() {
        for name in ["started", "accepted", "busy", "declined", "disconnected", "finished", "missed"] {
            let action: WebRtcAction = name.parse().unwrap();
            assert_eq!(action.to_string(), name);
        }
        assert!("ringing".parse::<WebRtcAction>().is_err());
    }
}
