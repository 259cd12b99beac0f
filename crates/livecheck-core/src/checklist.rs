use serde::{Deserialize, Serialize};
use std::fmt;

use crate::direction::Direction;

/// One action the subject has to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Left,
    Right,
    Smile,
    Ahead,
}

impl StepKind {
    /// Head direction this step asks for, or `None` for expression steps.
    pub fn direction(self) -> Option<Direction> {
        match self {
            StepKind::Left => Some(Direction::Left),
            StepKind::Right => Some(Direction::Right),
            StepKind::Ahead => Some(Direction::Ahead),
            StepKind::Smile => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepKind::Left => "left",
            StepKind::Right => "right",
            StepKind::Smile => "smile",
            StepKind::Ahead => "ahead",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A challenge step and whether it has been satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeStep {
    pub kind: StepKind,
    pub success: bool,
}

/// Order in which steps are presented and evaluated.
pub const CHALLENGE_ORDER: [StepKind; 4] = [
    StepKind::Left,
    StepKind::Right,
    StepKind::Smile,
    StepKind::Ahead,
];

/// Fixed, ordered checklist of challenge steps.
///
/// Steps are never added, removed or reordered. A step's `success` flag only
/// moves from `false` to `true`; the only way back is [`Checklist::reset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    steps: [ChallengeStep; 4],
}

impl Checklist {
    pub fn new() -> Self {
        Self {
            steps: CHALLENGE_ORDER.map(|kind| ChallengeStep {
                kind,
                success: false,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChallengeStep> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[ChallengeStep] {
        &self.steps
    }

    /// True iff every step has succeeded.
    pub fn is_fully_complete(&self) -> bool {
        self.steps.iter().all(|step| step.success)
    }

    /// Mark the step at `index` as succeeded.
    ///
    /// Returns `true` if the flag changed. Marking an already-succeeded step
    /// or an out-of-range index is a no-op.
    pub fn mark_success(&mut self, index: usize) -> bool {
        match self.steps.get_mut(index) {
            Some(step) if !step.success => {
                step.success = true;
                true
            }
            _ => false,
        }
    }

    /// Clear every success flag.
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.success = false;
        }
    }
}

impl Default for Checklist {
    fn default() -> Self {
        Self::new()
    }
}
