//! Bearing definitions

use serde::{Deserialize, Serialize};

/// A requested head-pose direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bearing {
    Straight,
    Left,
    Right,
    Up,
    Down,
    LeftUp,
    RightUp,
    LeftDown,
    RightDown,
}

impl Bearing {
    pub const ALL: [Bearing; 9] = [
        Bearing::Straight,
        Bearing::Left,
        Bearing::Right,
        Bearing::Up,
        Bearing::Down,
        Bearing::LeftUp,
        Bearing::RightUp,
        Bearing::LeftDown,
        Bearing::RightDown,
    ];

    /// Turned toward the subject's left (positive yaw)
    pub fn is_left(&self) -> bool {
        matches!(self, Bearing::Left | Bearing::LeftUp | Bearing::LeftDown)
    }

    /// Turned toward the subject's right (negative yaw)
    pub fn is_right(&self) -> bool {
        matches!(self, Bearing::Right | Bearing::RightUp | Bearing::RightDown)
    }

    /// Tilted up (negative pitch)
    pub fn is_up(&self) -> bool {
        matches!(self, Bearing::Up | Bearing::LeftUp | Bearing::RightUp)
    }

    /// Tilted down (positive pitch)
    pub fn is_down(&self) -> bool {
        matches!(self, Bearing::Down | Bearing::LeftDown | Bearing::RightDown)
    }

    /// Prompt shown to the subject
    pub fn prompt(&self) -> &'static str {
        match self {
            Bearing::Straight => "Look straight at the camera",
            Bearing::Left => "Slowly turn your head left",
            Bearing::Right => "Slowly turn your head right",
            Bearing::Up => "Slowly tilt your head up",
            Bearing::Down => "Slowly tilt your head down",
            Bearing::LeftUp => "Slowly turn your head left and up",
            Bearing::RightUp => "Slowly turn your head right and up",
            Bearing::LeftDown => "Slowly turn your head left and down",
            Bearing::RightDown => "Slowly turn your head right and down",
        }
    }
}

impl std::fmt::Display for Bearing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Bearing::Straight => "STRAIGHT",
            Bearing::Left => "LEFT",
            Bearing::Right => "RIGHT",
            Bearing::Up => "UP",
            Bearing::Down => "DOWN",
            Bearing::LeftUp => "LEFT_UP",
            Bearing::RightUp => "RIGHT_UP",
            Bearing::LeftDown => "LEFT_DOWN",
            Bearing::RightDown => "RIGHT_DOWN",
        };
        write!(f, "{}", name)
    }
}
