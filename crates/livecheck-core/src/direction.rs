//! Head direction classification from the detector's yaw angle.
//!
//! The detector reports yaw in degrees with 0 meaning the subject faces the
//! camera. The positive turn band maps to [`Direction::Left`] and the
//! negative one to [`Direction::Right`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction a face is pointing, as seen by the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Ahead,
    Invalid,
}

impl Direction {
    /// Label shown to the subject and written to the snapshot.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Ahead => "ahead",
            Direction::Invalid => "INVALID DIRECTION",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a yaw angle (degrees) into a [`Direction`].
///
/// Bands are checked in order and the first match wins:
///
/// | condition                    | result  |
/// |------------------------------|---------|
/// | `-40 < yaw < -10`            | Right   |
/// | `10 < yaw < 40`              | Left    |
/// | `yaw > -10 \|\| yaw < 10`    | Ahead   |
/// | otherwise                    | Invalid |
///
/// The third band is a disjunction, so every finite yaw outside the two turn
/// bands classifies as `Ahead`, including the band edges (±10, ±40) and
/// extreme values. Only NaN reaches `Invalid`.
pub fn classify(yaw: f32) -> Direction {
    if yaw > -40.0 && yaw < -10.0 {
        Direction::Right
    } else if yaw > 10.0 && yaw < 40.0 {
        Direction::Left
    } else if yaw > -10.0 || yaw < 10.0 {
        Direction::Ahead
    } else {
        Direction::Invalid
    }
}
