//! JSON-lines wire format between a detector host and the challenge.
//!
//! Inbound, one object per line:
//!
//! ```text
//! {"type":"start"}
//! {"type":"frame","faces":[{"face_id":1,"yaw_angle":24.0,"smiling_probability":0.1}]}
//! {"type":"snapshot"}
//! ```
//!
//! Outbound notifications use the same `type` tag.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluator::LivenessSnapshot;
use crate::observation::{CaptureRequest, FaceObservation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The user asked to start a capture session.
    Start,
    /// One processed camera frame.
    Frame {
        #[serde(default)]
        faces: Vec<FaceObservation>,
    },
    /// Request the current display state.
    Snapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Capture(CaptureRequest),
    Snapshot(LivenessSnapshot),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("blank line")]
    Blank,
    #[error("malformed event on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse one inbound line. `line_no` is only used for error reporting.
pub fn parse_event(line_no: usize, line: &str) -> Result<Event, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Blank);
    }
    serde_json::from_str(trimmed).map_err(|source| ProtocolError::Malformed {
        line: line_no,
        source,
    })
}

/// Encode a notification as a single JSON line (no trailing newline).
pub fn encode(notification: &Notification) -> Result<String, serde_json::Error> {
    serde_json::to_string(notification)
}
