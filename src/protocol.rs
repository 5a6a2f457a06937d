//! Control and notification message types
//!
//! Everything that crosses the control channel (requests, acknowledgements)
//! or the notification channel (envelopes under the fixed topic).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{MAX_TRANSITION_SECS, NOTIFICATION_TOPIC};
use crate::error::ControlError;

/// A director request, decoded from the control channel
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Ramped swap of preview and program
    Transition {
        /// Seconds; the configured cut duration when absent
        #[serde(default)]
        duration: Option<f64>,
    },
    Take,
    Sync,
    SetProgram { feed: u32 },
    SetPreview { feed: u32 },
    ToggleDsk { dsk_id: usize },
    ListFeeds,
    Quit,
    /// Request without an `action` field
    #[serde(skip)]
    Noop,
}

impl Request {
    /// Decode a raw JSON body.
    ///
    /// An object without `action` is a no-op. Unknown actions and missing or
    /// mistyped fields are rejected.
    pub fn from_value(value: Value) -> Result<Self, ControlError> {
        let Some(object) = value.as_object() else {
            return Err(ControlError::InvalidRequest(
                "request must be a JSON object".to_string(),
            ));
        };

        if !object.contains_key("action") {
            return Ok(Request::Noop);
        }

        let request: Request = serde_json::from_value(value)
            .map_err(|e| ControlError::InvalidRequest(e.to_string()))?;

        if let Request::Transition { duration: Some(duration) } = request {
            if !(duration.is_finite() && (0.0..=MAX_TRANSITION_SECS).contains(&duration)) {
                return Err(ControlError::InvalidRequest(format!(
                    "transition duration must be between 0 and {} seconds, got {}",
                    MAX_TRANSITION_SECS, duration
                )));
            }
        }

        Ok(request)
    }

    /// Action name for logging
    pub fn action(&self) -> &'static str {
        match self {
            Request::Transition { .. } => "transition",
            Request::Take => "take",
            Request::Sync => "sync",
            Request::SetProgram { .. } => "set_program",
            Request::SetPreview { .. } => "set_preview",
            Request::ToggleDsk { .. } => "toggle_dsk",
            Request::ListFeeds => "list_feeds",
            Request::Quit => "quit",
            Request::Noop => "none",
        }
    }
}

/// Acknowledgement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

/// Reply sent for every control request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub response: AckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeds: Option<Vec<u32>>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            response: AckStatus::Ok,
            error: None,
            feeds: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            response: AckStatus::Error,
            error: Some(msg.into()),
            feeds: None,
        }
    }

    pub fn with_feeds(feeds: Vec<u32>) -> Self {
        Self {
            feeds: Some(feeds),
            ..Self::ok()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.response == AckStatus::Ok
    }
}

/// A state change observers are told about
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Preview(u32),
    Program(u32),
    FeedsCount(u32),
    ActiveDsks(Vec<usize>),
    Quit,
}

impl Notification {
    /// Name carried in the `update` field
    pub fn target(&self) -> &'static str {
        match self {
            Notification::Preview(_) => "preview",
            Notification::Program(_) => "program",
            Notification::FeedsCount(_) => "feeds_count",
            Notification::ActiveDsks(_) => "active_dsks",
            Notification::Quit => "quit",
        }
    }

    /// Wire envelope for this notification
    pub fn envelope(&self) -> Envelope {
        let value = match self {
            Notification::Preview(feed)
            | Notification::Program(feed)
            | Notification::FeedsCount(feed) => Value::from(*feed),
            Notification::ActiveDsks(ids) => Value::from(ids.clone()),
            Notification::Quit => {
                return Envelope::Action {
                    action: "quit".to_string(),
                }
            }
        };

        Envelope::Update {
            update: self.target().to_string(),
            value,
        }
    }
}

/// JSON envelope published on the notification channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Update { update: String, value: Value },
    Action { action: String },
}

/// An envelope tagged with its topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub topic: String,
    pub message: Envelope,
}

impl Publication {
    pub fn new(notification: &Notification) -> Self {
        Self {
            topic: NOTIFICATION_TOPIC.to_string(),
            message: notification.envelope(),
        }
    }

    /// Serialized text frame
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
