//! Session and configuration errors

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::types::ReasonCode;

/// Which spoof heuristic fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpoofKind {
    /// Raw angle delta above the per-frame velocity limit
    MovedTooFast,
    /// Raw angle regressed away from the target
    MovedOpposite,
    /// Target reached from outside the arc between the two bearings
    OffArc,
}

impl SpoofKind {
    pub fn reason(&self) -> ReasonCode {
        match self {
            SpoofKind::MovedTooFast => ReasonCode::R004_MOVED_TOO_FAST,
            SpoofKind::MovedOpposite => ReasonCode::R004_MOVED_OPPOSITE,
            SpoofKind::OffArc => ReasonCode::R004_OFF_ARC,
        }
    }
}

impl std::fmt::Display for SpoofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SpoofKind::MovedTooFast => "moved too fast",
            SpoofKind::MovedOpposite => "moved opposite",
            SpoofKind::OffArc => "off arc",
        };
        write!(f, "{}", name)
    }
}

/// Terminal session failures
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum SessionError {
    #[error("face not found in {missed_frames} consecutive frames")]
    FaceNotFound { missed_frames: u32 },
    #[error("spoof attempt: {0}")]
    SpoofAttempt(SpoofKind),
    #[error("session timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },
    #[error("invalid face template: {0}")]
    InvalidTemplate(String),
    #[error("face comparison failed: {0}")]
    ComparisonFailed(String),
    #[error("session setup failed: {0}")]
    SetupFailed(String),
    #[error("session cancelled")]
    Cancelled,
}

impl SessionError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            SessionError::FaceNotFound { .. } => ReasonCode::R006_FACE_NOT_FOUND,
            SessionError::SpoofAttempt(kind) => kind.reason(),
            SessionError::Timeout { .. } => ReasonCode::R006_TIMEOUT,
            SessionError::Cancelled => ReasonCode::R006_CANCELLED,
            SessionError::InvalidTemplate(_)
            | SessionError::ComparisonFailed(_)
            | SessionError::SetupFailed(_) => ReasonCode::R006_SESSION_ENDED,
        }
    }
}

/// Invalid or unreadable settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}
