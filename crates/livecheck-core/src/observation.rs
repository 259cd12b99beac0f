use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A face reported by the external detector for one camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    #[serde(alias = "faceID", alias = "faceId")]
    pub face_id: u64,
    /// Head yaw in degrees, 0 = facing the camera.
    #[serde(alias = "yawAngle")]
    pub yaw_angle: f32,
    /// Detector's smile classification, 0.0..=1.0.
    #[serde(alias = "smilingProbability")]
    pub smiling_probability: f32,
}

impl FaceObservation {
    pub fn new(face_id: u64, yaw_angle: f32, smiling_probability: f32) -> Self {
        Self {
            face_id,
            yaw_angle,
            smiling_probability,
        }
    }

    /// Whether both signals carry a usable value.
    pub fn is_usable(&self) -> bool {
        self.yaw_angle.is_finite() && self.smiling_probability.is_finite()
    }
}

/// "Capture now" notification, emitted once when a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub session_id: Uuid,
    pub requested_at: DateTime<Utc>,
    /// Face that completed the challenge.
    pub face_id: u64,
}
