//! Per-frame step output

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{Angle, Bearing, ReasonCode, SessionState};

/// Output of one session step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutput {
    /// Wall-clock time the step ran
    pub timestamp: DateTime<Utc>,
    /// Frame sequence index
    pub sequence: u64,
    /// State after the step
    pub state: SessionState,
    /// Reason for the state
    pub reason: ReasonCode,
    /// Bearing currently requested
    pub bearing: Bearing,
    /// Smoothed pose, when a face is tracked
    pub smoothed_angle: Option<Angle>,
    /// Normalized move-toward hint while misaligned
    pub offset: Option<Angle>,
    /// Captures recorded so far
    pub capture_count: usize,
    /// A capture was recorded in this step
    pub captured: bool,
}

impl StepOutput {
    pub fn new(sequence: u64, state: SessionState, reason: ReasonCode, bearing: Bearing) -> Self {
        Self {
            timestamp: Utc::now(),
            sequence,
            state,
            reason,
            bearing,
            smoothed_angle: None,
            offset: None,
            capture_count: 0,
            captured: false,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let color = self.state.color_code();
        let reset = SessionState::color_reset();
        let emoji = self.state.emoji();

        format!(
            "{}{} #{} | state={} | bearing={} | {} | captures={} | {}{}",
            color,
            emoji,
            self.sequence,
            self.state,
            self.bearing,
            format_angle(self.smoothed_angle),
            self.capture_count,
            self.reason.code(),
            reset
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "seq={} | state={} | bearing={} | {} | captures={} | reason={}",
            self.sequence,
            self.state,
            self.bearing,
            format_angle(self.smoothed_angle),
            self.capture_count,
            self.reason.code()
        )
    }
}

fn format_angle(angle: Option<Angle>) -> String {
    match angle {
        Some(a) => format!("yaw={:.1} pitch={:.1}", a.yaw, a.pitch),
        None => "yaw=- pitch=-".to_string(),
    }
}
