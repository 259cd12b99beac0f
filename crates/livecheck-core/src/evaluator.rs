//! Active liveness challenge state machine.
//!
//! The evaluator consumes one face observation per camera frame and walks the
//! subject through the [`Checklist`]: look left, look right, smile, face
//! ahead. When every step has succeeded it hands a [`CaptureRequest`] to its
//! [`CaptureTrigger`] exactly once and stops evaluating frames until the next
//! session is started.
//!
//! ```text
//!   Idle --start_capture--> AwaitingChallenge --all steps--> Complete
//!                                 ^                              |
//!                                 +---------start_capture--------+
//! ```
//!
//! The evaluator is synchronous and owns all of its state. It makes no
//! threading assumptions; hosts deliver frames from whatever callback,
//! channel or loop they run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checklist::{ChallengeStep, Checklist, StepKind};
use crate::direction::{classify, Direction};
use crate::observation::{CaptureRequest, FaceObservation};

/// Smile probability above which a smile step succeeds.
pub const DEFAULT_SMILE_THRESHOLD: f32 = 0.5;

/// What happens to the checklist when a new session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Every session starts from a cleared checklist at the first step.
    #[default]
    Fresh,
    /// Success flags and the current step survive into the next session.
    CarryOver,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatorConfig {
    pub smile_threshold: f32,
    pub session_policy: SessionPolicy,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            smile_threshold: DEFAULT_SMILE_THRESHOLD,
            session_policy: SessionPolicy::Fresh,
        }
    }
}

/// Receiver of the "capture now" side effect.
///
/// Called synchronously from inside the frame handler, so implementations
/// must hand the request off (channel, spawned task) rather than perform the
/// capture inline.
pub trait CaptureTrigger {
    fn trigger(&mut self, request: CaptureRequest);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingChallenge,
    Complete,
}

/// Result of handing one frame to the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// No session is active; nothing was evaluated.
    Ignored,
    /// The frame carried no usable face.
    NoFace,
    /// The current step was not satisfied by this frame.
    Pending { step: StepKind },
    /// `completed` succeeded; `current` is the step now presented.
    Advanced { completed: StepKind, current: StepKind },
    /// Every step succeeded and a capture was triggered.
    Completed(CaptureRequest),
}

/// Display state of the challenge, readable at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessSnapshot {
    pub session_id: Option<Uuid>,
    pub state: SessionState,
    pub current_step: StepKind,
    pub face_id: u64,
    pub yaw: f32,
    pub facing: Direction,
    pub smile: f32,
    pub smiling: bool,
    pub steps: Vec<ChallengeStep>,
    pub is_lively: bool,
}

pub struct LivenessEvaluator<T> {
    config: EvaluatorConfig,
    trigger: T,
    checklist: Checklist,
    current_step: usize,
    state: SessionState,
    session_id: Uuid,
    latest: FaceObservation,
}

impl<T: CaptureTrigger> LivenessEvaluator<T> {
    pub fn new(config: EvaluatorConfig, trigger: T) -> Self {
        Self {
            config,
            trigger,
            checklist: Checklist::new(),
            current_step: 0,
            state: SessionState::Idle,
            session_id: Uuid::nil(),
            latest: FaceObservation::new(0, 0.0, 0.0),
        }
    }

    /// Begin a new session. Returns its id.
    ///
    /// Under [`SessionPolicy::Fresh`] the checklist and step index are reset;
    /// under [`SessionPolicy::CarryOver`] they are kept as they are.
    pub fn start_capture(&mut self) -> Uuid {
        if self.config.session_policy == SessionPolicy::Fresh {
            self.checklist.reset();
            self.current_step = 0;
        }
        self.session_id = Uuid::new_v4();
        self.state = SessionState::AwaitingChallenge;
        tracing::info!(
            session = %self.session_id,
            policy = ?self.config.session_policy,
            step = %self.current_kind(),
            "liveness session started"
        );
        self.session_id
    }

    /// Evaluate the first face of a detector frame.
    pub fn on_frame(&mut self, faces: &[FaceObservation]) -> FrameOutcome {
        self.on_face_observation(faces.first())
    }

    /// Evaluate one observation against the current step.
    pub fn on_face_observation(&mut self, face: Option<&FaceObservation>) -> FrameOutcome {
        if self.state != SessionState::AwaitingChallenge {
            return FrameOutcome::Ignored;
        }
        let Some(face) = face.filter(|f| f.is_usable()) else {
            return FrameOutcome::NoFace;
        };

        // Reachable when a carried-over checklist was already complete.
        if self.checklist.is_fully_complete() {
            return self.complete(face.face_id);
        }

        self.latest = *face;

        let index = self.current_step;
        let Some(step) = self.checklist.get(index).copied() else {
            return FrameOutcome::NoFace;
        };

        let satisfied = match step.kind.direction() {
            None => face.smiling_probability > self.config.smile_threshold,
            Some(wanted) => classify(face.yaw_angle) == wanted,
        };
        tracing::trace!(
            session = %self.session_id,
            step = %step.kind,
            yaw = face.yaw_angle,
            smile = face.smiling_probability,
            satisfied,
            "frame evaluated"
        );

        if !satisfied || !self.checklist.mark_success(index) {
            return FrameOutcome::Pending { step: step.kind };
        }

        if index + 1 < self.checklist.len() {
            self.current_step = index + 1;
        }
        tracing::debug!(
            session = %self.session_id,
            completed = %step.kind,
            current = %self.current_kind(),
            "challenge step succeeded"
        );

        if self.checklist.is_fully_complete() {
            return self.complete(face.face_id);
        }

        FrameOutcome::Advanced {
            completed: step.kind,
            current: self.current_kind(),
        }
    }

    fn complete(&mut self, face_id: u64) -> FrameOutcome {
        self.state = SessionState::Complete;
        let request = CaptureRequest {
            session_id: self.session_id,
            requested_at: Utc::now(),
            face_id,
        };
        tracing::info!(session = %self.session_id, face_id, "liveness confirmed, requesting capture");
        self.trigger.trigger(request.clone());
        FrameOutcome::Completed(request)
    }

    fn current_kind(&self) -> StepKind {
        self.checklist
            .get(self.current_step)
            .map(|s| s.kind)
            .unwrap_or(StepKind::Ahead)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::AwaitingChallenge
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step
    }

    pub fn current_step(&self) -> StepKind {
        self.current_kind()
    }

    pub fn checklist(&self) -> &Checklist {
        &self.checklist
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    pub fn snapshot(&self) -> LivenessSnapshot {
        LivenessSnapshot {
            session_id: (self.state != SessionState::Idle).then_some(self.session_id),
            state: self.state,
            current_step: self.current_kind(),
            face_id: self.latest.face_id,
            yaw: self.latest.yaw_angle,
            facing: classify(self.latest.yaw_angle),
            smile: self.latest.smiling_probability,
            smiling: self.latest.smiling_probability > self.config.smile_threshold,
            steps: self.checklist.steps().to_vec(),
            is_lively: self.state == SessionState::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        captures: Vec<CaptureRequest>,
    }

    impl CaptureTrigger for Recorder {
        fn trigger(&mut self, request: CaptureRequest) {
            self.captures.push(request);
        }
    }

    fn evaluator(policy: SessionPolicy) -> LivenessEvaluator<Recorder> {
        LivenessEvaluator::new(
            EvaluatorConfig {
                session_policy: policy,
                ..EvaluatorConfig::default()
            },
            Recorder::default(),
        )
    }

    fn yaw(angle: f32) -> FaceObservation {
        FaceObservation::new(1, angle, 0.0)
    }

    fn smile(prob: f32) -> FaceObservation {
        FaceObservation::new(1, 0.0, prob)
    }

    fn run_full_challenge(ev: &mut LivenessEvaluator<Recorder>) -> FrameOutcome {
        ev.on_face_observation(Some(&yaw(25.0)));
        ev.on_face_observation(Some(&yaw(-25.0)));
        ev.on_face_observation(Some(&smile(0.9)));
        ev.on_face_observation(Some(&yaw(0.0)))
    }

    #[test]
    fn test_full_challenge_completes_once() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        let session = ev.start_capture();

        assert_eq!(
            ev.on_face_observation(Some(&yaw(25.0))),
            FrameOutcome::Advanced {
                completed: StepKind::Left,
                current: StepKind::Right
            }
        );
        assert_eq!(ev.current_step_index(), 1);

        assert_eq!(
            ev.on_face_observation(Some(&yaw(-25.0))),
            FrameOutcome::Advanced {
                completed: StepKind::Right,
                current: StepKind::Smile
            }
        );
        assert_eq!(ev.current_step_index(), 2);

        assert_eq!(
            ev.on_face_observation(Some(&smile(0.9))),
            FrameOutcome::Advanced {
                completed: StepKind::Smile,
                current: StepKind::Ahead
            }
        );
        assert_eq!(ev.current_step_index(), 3);

        let outcome = ev.on_face_observation(Some(&yaw(0.0)));
        assert!(matches!(outcome, FrameOutcome::Completed(ref r) if r.session_id == session));
        assert!(ev.is_complete());
        assert!(!ev.is_active());
        assert!(ev.checklist().is_fully_complete());
        assert_eq!(ev.current_step_index(), 3);
        assert_eq!(ev.trigger().captures.len(), 1);
    }

    #[test]
    fn test_observations_ignored_before_start() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        assert_eq!(ev.on_face_observation(Some(&yaw(25.0))), FrameOutcome::Ignored);
        assert_eq!(ev.state(), SessionState::Idle);
        assert_eq!(ev.current_step_index(), 0);
        assert!(!ev.checklist().get(0).unwrap().success);
        assert!(ev.trigger().captures.is_empty());
        assert_eq!(ev.snapshot().session_id, None);
    }

    #[test]
    fn test_no_face_leaves_state_unchanged() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        ev.on_face_observation(Some(&yaw(25.0)));
        let before = ev.checklist().clone();

        assert_eq!(ev.on_face_observation(None), FrameOutcome::NoFace);
        assert_eq!(ev.on_frame(&[]), FrameOutcome::NoFace);
        assert_eq!(ev.current_step_index(), 1);
        assert_eq!(ev.checklist(), &before);
    }

    #[test]
    fn test_non_finite_signal_is_no_face() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        let nan = FaceObservation::new(9, f32::NAN, 0.0);
        assert_eq!(ev.on_face_observation(Some(&nan)), FrameOutcome::NoFace);
        assert_eq!(ev.snapshot().face_id, 0);
        assert_eq!(ev.current_step_index(), 0);
    }

    #[test]
    fn test_wrong_direction_stays_pending() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        assert_eq!(
            ev.on_face_observation(Some(&yaw(-25.0))),
            FrameOutcome::Pending {
                step: StepKind::Left
            }
        );
        assert_eq!(ev.current_step_index(), 0);
        // Looking ahead does not satisfy "left" either.
        ev.on_face_observation(Some(&yaw(0.0)));
        assert_eq!(ev.current_step_index(), 0);
    }

    #[test]
    fn test_smile_threshold_is_exclusive() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        ev.on_face_observation(Some(&yaw(25.0)));
        ev.on_face_observation(Some(&yaw(-25.0)));
        assert_eq!(
            ev.on_face_observation(Some(&smile(0.5))),
            FrameOutcome::Pending {
                step: StepKind::Smile
            }
        );
        assert!(matches!(
            ev.on_face_observation(Some(&smile(0.51))),
            FrameOutcome::Advanced { .. }
        ));
    }

    #[test]
    fn test_only_current_step_is_evaluated() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        // A smile while "left" is requested does nothing.
        ev.on_face_observation(Some(&FaceObservation::new(1, 0.0, 0.99)));
        assert!(!ev.checklist().get(2).unwrap().success);
        assert_eq!(ev.current_step_index(), 0);
    }

    #[test]
    fn test_repeated_success_does_not_advance_twice() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        ev.on_face_observation(Some(&yaw(25.0)));
        // Same frame again: "right" is now current, so this is just pending.
        assert_eq!(
            ev.on_face_observation(Some(&yaw(25.0))),
            FrameOutcome::Pending {
                step: StepKind::Right
            }
        );
        assert_eq!(ev.current_step_index(), 1);
    }

    #[test]
    fn test_complete_ignores_further_frames() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        run_full_challenge(&mut ev);

        for _ in 0..3 {
            assert_eq!(ev.on_face_observation(Some(&yaw(0.0))), FrameOutcome::Ignored);
        }
        assert_eq!(ev.state(), SessionState::Complete);
        assert_eq!(ev.current_step_index(), 3);
        assert_eq!(ev.trigger().captures.len(), 1);
    }

    #[test]
    fn test_last_step_keeps_being_evaluated() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        ev.on_face_observation(Some(&yaw(25.0)));
        ev.on_face_observation(Some(&yaw(-25.0)));
        ev.on_face_observation(Some(&smile(0.9)));

        // A turn holds the last step open; the index stays put.
        for _ in 0..5 {
            assert_eq!(
                ev.on_face_observation(Some(&yaw(30.0))),
                FrameOutcome::Pending {
                    step: StepKind::Ahead
                }
            );
            assert_eq!(ev.current_step_index(), 3);
        }
        assert!(matches!(
            ev.on_face_observation(Some(&yaw(3.0))),
            FrameOutcome::Completed(_)
        ));
    }

    #[test]
    fn test_fresh_policy_resets_between_sessions() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        let first = ev.start_capture();
        run_full_challenge(&mut ev);

        let second = ev.start_capture();
        assert_ne!(first, second);
        assert_eq!(ev.state(), SessionState::AwaitingChallenge);
        assert_eq!(ev.current_step_index(), 0);
        assert!(ev.checklist().steps().iter().all(|s| !s.success));

        // A frame that would have completed a carried-over session does not.
        assert!(matches!(
            ev.on_face_observation(Some(&yaw(0.0))),
            FrameOutcome::Pending { .. }
        ));
        assert_eq!(ev.trigger().captures.len(), 1);
    }

    #[test]
    fn test_carry_over_completes_on_first_face() {
        let mut ev = evaluator(SessionPolicy::CarryOver);
        ev.start_capture();
        run_full_challenge(&mut ev);

        let second = ev.start_capture();
        assert!(ev.checklist().is_fully_complete());
        assert_eq!(ev.current_step_index(), 3);

        assert_eq!(ev.on_face_observation(None), FrameOutcome::NoFace);
        let outcome = ev.on_face_observation(Some(&yaw(-25.0)));
        assert!(matches!(outcome, FrameOutcome::Completed(ref r) if r.session_id == second));
        assert_eq!(ev.trigger().captures.len(), 2);

        ev.on_face_observation(Some(&yaw(0.0)));
        assert_eq!(ev.trigger().captures.len(), 2);
    }

    #[test]
    fn test_carry_over_resumes_partial_progress() {
        let mut ev = evaluator(SessionPolicy::CarryOver);
        ev.start_capture();
        ev.on_face_observation(Some(&yaw(25.0)));
        ev.start_capture();
        assert_eq!(ev.current_step(), StepKind::Right);
        assert!(ev.checklist().get(0).unwrap().success);
    }

    #[test]
    fn test_on_frame_uses_first_face() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        let faces = [
            FaceObservation::new(4, -25.0, 0.0),
            FaceObservation::new(5, 25.0, 0.0),
        ];
        assert!(matches!(ev.on_frame(&faces), FrameOutcome::Pending { .. }));
        assert_eq!(ev.snapshot().face_id, 4);
    }

    #[test]
    fn test_snapshot_tracks_latest_observation() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        let session = ev.start_capture();
        ev.on_face_observation(Some(&FaceObservation::new(42, -25.0, 0.8)));

        let snap = ev.snapshot();
        assert_eq!(snap.session_id, Some(session));
        assert_eq!(snap.state, SessionState::AwaitingChallenge);
        assert_eq!(snap.current_step, StepKind::Left);
        assert_eq!(snap.face_id, 42);
        assert_eq!(snap.yaw, -25.0);
        assert_eq!(snap.facing, Direction::Right);
        assert_eq!(snap.smile, 0.8);
        assert!(snap.smiling);
        assert_eq!(snap.steps.len(), 4);
        assert!(!snap.is_lively);
    }

    #[test]
    fn test_snapshot_after_completion() {
        let mut ev = evaluator(SessionPolicy::Fresh);
        ev.start_capture();
        run_full_challenge(&mut ev);
        let snap = ev.snapshot();
        assert!(snap.is_lively);
        assert_eq!(snap.state, SessionState::Complete);
        assert!(snap.steps.iter().all(|s| s.success));

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "complete");
        assert_eq!(json["current_step"], "ahead");
    }

    #[test]
    fn test_custom_smile_threshold() {
        let mut ev = LivenessEvaluator::new(
            EvaluatorConfig {
                smile_threshold: 0.8,
                ..EvaluatorConfig::default()
            },
            Recorder::default(),
        );
        ev.start_capture();
        ev.on_face_observation(Some(&yaw(25.0)));
        ev.on_face_observation(Some(&yaw(-25.0)));
        ev.on_face_observation(Some(&smile(0.7)));
        assert_eq!(ev.current_step(), StepKind::Smile);
        ev.on_face_observation(Some(&smile(0.85)));
        assert_eq!(ev.current_step(), StepKind::Ahead);
    }
}
