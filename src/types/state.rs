//! Session state definitions

use serde::{Deserialize, Serialize};

/// States of a liveness session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No face in view
    NoFace,
    /// Face detected, bounds still settling
    FaceFound,
    /// Face held still long enough to evaluate its pose
    Fixed,
    /// Smoothed pose inside the window of the current bearing
    Aligned,
    /// Smoothed pose outside the window of the current bearing
    Misaligned,
    /// Movement inconsistent with a live head; session is being aborted
    SpoofSuspected,
    /// Terminal failure
    Aborted,
    /// All bearings captured
    Complete,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Aborted | SessionState::Complete)
    }

    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            SessionState::NoFace => "\x1b[90m",         // Gray
            SessionState::FaceFound => "\x1b[36m",      // Cyan
            SessionState::Fixed => "\x1b[34m",          // Blue
            SessionState::Aligned => "\x1b[32m",        // Green
            SessionState::Misaligned => "\x1b[33m",     // Yellow
            SessionState::SpoofSuspected => "\x1b[35m", // Magenta
            SessionState::Aborted => "\x1b[31m",        // Red
            SessionState::Complete => "\x1b[1;32m",     // Bold green
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for state
    pub fn emoji(&self) -> &'static str {
        match self {
            SessionState::NoFace => "⏳",
            SessionState::FaceFound => "👤",
            SessionState::Fixed => "📌",
            SessionState::Aligned => "🔒",
            SessionState::Misaligned => "🔶",
            SessionState::SpoofSuspected => "⚠",
            SessionState::Aborted => "🔴",
            SessionState::Complete => "✅",
        }
    }

    /// Per-frame alignment classification, if a face is being tracked
    pub fn alignment_status(&self) -> Option<FaceAlignmentStatus> {
        match self {
            SessionState::FaceFound => Some(FaceAlignmentStatus::Found),
            SessionState::Fixed => Some(FaceAlignmentStatus::Fixed),
            SessionState::Aligned => Some(FaceAlignmentStatus::Aligned),
            SessionState::Misaligned => Some(FaceAlignmentStatus::Misaligned),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::NoFace => "NO_FACE",
            SessionState::FaceFound => "FACE_FOUND",
            SessionState::Fixed => "FIXED",
            SessionState::Aligned => "ALIGNED",
            SessionState::Misaligned => "MISALIGNED",
            SessionState::SpoofSuspected => "SPOOF_SUSPECTED",
            SessionState::Aborted => "ABORTED",
            SessionState::Complete => "COMPLETE",
        };
        write!(f, "{}", name)
    }
}

/// Classification of the face in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceAlignmentStatus {
    Found,
    Fixed,
    Aligned,
    Misaligned,
}
