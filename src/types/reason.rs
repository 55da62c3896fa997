//! Reason codes for per-frame decisions and state changes

use serde::{Deserialize, Serialize};

/// Reason codes attached to every step output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R001: Presence
    // =========================================================================
    /// Face detected in this frame
    R001_FACE_FOUND,
    /// Face missing, still within the grace countdown
    R001_FACE_MISSED,
    /// Face missing beyond the grace countdown, progress reset
    R001_FACE_LOST,

    // =========================================================================
    // R002: Fixation
    // =========================================================================
    /// Bounds still settling
    R002_FIXING,
    /// Bounds stable long enough
    R002_FIXED,
    /// Face does not fill the expected rectangle
    R002_OUT_OF_BOUNDS,

    // =========================================================================
    // R003: Alignment
    // =========================================================================
    /// Pose inside the window of the current bearing
    R003_ALIGNED,
    /// Pose outside the window, guidance offset supplied
    R003_MISALIGNED,

    // =========================================================================
    // R004: Spoof checks
    // =========================================================================
    /// Raw angle changed faster than a live head can turn
    R004_MOVED_TOO_FAST,
    /// Angle moved away from the target between consecutive frames
    R004_MOVED_OPPOSITE,
    /// Target reached without passing through the swept arc
    R004_OFF_ARC,

    // =========================================================================
    // R005: Capture progress
    // =========================================================================
    /// Capture recorded, next bearing requested
    R005_CAPTURED,
    /// Final capture recorded, session complete
    R005_COMPLETE,

    // =========================================================================
    // R006: Session end
    // =========================================================================
    /// Deadline passed before completion
    R006_TIMEOUT,
    /// Missed-frame budget exhausted
    R006_FACE_NOT_FOUND,
    /// Session closed by the caller
    R006_CANCELLED,
    /// Session already ended, frame ignored
    R006_SESSION_ENDED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R001_FACE_FOUND => "R001_FACE_FOUND",
            Self::R001_FACE_MISSED => "R001_FACE_MISSED",
            Self::R001_FACE_LOST => "R001_FACE_LOST",
            Self::R002_FIXING => "R002_FIXING",
            Self::R002_FIXED => "R002_FIXED",
            Self::R002_OUT_OF_BOUNDS => "R002_OUT_OF_BOUNDS",
            Self::R003_ALIGNED => "R003_ALIGNED",
            Self::R003_MISALIGNED => "R003_MISALIGNED",
            Self::R004_MOVED_TOO_FAST => "R004_MOVED_TOO_FAST",
            Self::R004_MOVED_OPPOSITE => "R004_MOVED_OPPOSITE",
            Self::R004_OFF_ARC => "R004_OFF_ARC",
            Self::R005_CAPTURED => "R005_CAPTURED",
            Self::R005_COMPLETE => "R005_COMPLETE",
            Self::R006_TIMEOUT => "R006_TIMEOUT",
            Self::R006_FACE_NOT_FOUND => "R006_FACE_NOT_FOUND",
            Self::R006_CANCELLED => "R006_CANCELLED",
            Self::R006_SESSION_ENDED => "R006_SESSION_ENDED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R001_FACE_FOUND => "Face found",
            Self::R001_FACE_MISSED => "Face missed in frame",
            Self::R001_FACE_LOST => "Face lost - progress reset",
            Self::R002_FIXING => "Hold still",
            Self::R002_FIXED => "Face fixed",
            Self::R002_OUT_OF_BOUNDS => "Move to fill the face outline",
            Self::R003_ALIGNED => "Pose matches bearing",
            Self::R003_MISALIGNED => "Pose does not match bearing",
            Self::R004_MOVED_TOO_FAST => "Moved too fast",
            Self::R004_MOVED_OPPOSITE => "Moved away from target",
            Self::R004_OFF_ARC => "Skipped the expected arc",
            Self::R005_CAPTURED => "Capture recorded",
            Self::R005_COMPLETE => "All bearings captured",
            Self::R006_TIMEOUT => "Session timed out",
            Self::R006_FACE_NOT_FOUND => "Face not found",
            Self::R006_CANCELLED => "Session cancelled",
            Self::R006_SESSION_ENDED => "Session already ended",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matches_serde_name() {
        for reason in [
            ReasonCode::R001_FACE_LOST,
            ReasonCode::R002_OUT_OF_BOUNDS,
            ReasonCode::R004_OFF_ARC,
            ReasonCode::R006_SESSION_ENDED,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.code()));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ReasonCode::R004_MOVED_TOO_FAST.to_string(),
            "R004_MOVED_TOO_FAST: Moved too fast"
        );
    }
}
