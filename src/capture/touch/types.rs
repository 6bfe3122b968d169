use crate::processing::trajectory::Point;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one contact as reported by the touch surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerState {
    Down,
    Move,
    Up,
}

impl FingerState {
    /// True while the finger is still on the surface
    pub fn is_active(self) -> bool {
        matches!(self, FingerState::Down | FingerState::Move)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerRecord {
    /// Surface-assigned identifier, unique while the finger stays in contact
    pub id: i32,
    pub state: FingerState,
    /// Device-normalized position
    pub x: f32,
    pub y: f32,
}

impl FingerRecord {
    pub fn new(id: i32, state: FingerState, x: f32, y: f32) -> Self {
        Self { id, state, x, y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One delivery of touch-surface state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchFrame {
    /// Monotonic driver timestamp in seconds
    pub timestamp: f64,
    /// Finger count as reported by the driver; must match `fingers.len()`
    pub finger_count: i32,
    #[serde(default)]
    pub fingers: Vec<FingerRecord>,
}

impl TouchFrame {
    pub fn new(timestamp: f64, fingers: Vec<FingerRecord>) -> Self {
        Self {
            timestamp,
            finger_count: fingers.len() as i32,
            fingers,
        }
    }

    /// True when the frame carries at least one record and every record is an `Up`
    pub fn is_all_up(&self) -> bool {
        !self.fingers.is_empty() && self.fingers.iter().all(|f| f.state == FingerState::Up)
    }

    pub fn has_active(&self) -> bool {
        self.fingers.iter().any(|f| f.state.is_active())
    }
}
