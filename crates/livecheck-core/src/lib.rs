//! livecheck-core — active liveness challenge logic.
//!
//! Frames come in from an external face detector as [`FaceObservation`]s;
//! the [`LivenessEvaluator`] drives a fixed [`Checklist`] (left, right,
//! smile, ahead) and fires a [`CaptureRequest`] through its
//! [`CaptureTrigger`] once every step has succeeded.
//!
//! Detection, camera capture and photo upload are supplied by the host.

pub mod checklist;
pub mod direction;
pub mod evaluator;
pub mod observation;
pub mod protocol;

pub use checklist::{ChallengeStep, Checklist, StepKind, CHALLENGE_ORDER};
pub use direction::{classify, Direction};
pub use evaluator::{
    CaptureTrigger, EvaluatorConfig, FrameOutcome, LivenessEvaluator, LivenessSnapshot,
    SessionPolicy, SessionState, DEFAULT_SMILE_THRESHOLD,
};
pub use observation::{CaptureRequest, FaceObservation};
pub use protocol::{encode, parse_event, Event, Notification, ProtocolError};
