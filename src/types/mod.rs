//! Core types for poselock

mod geometry;
mod bearing;
mod measurement;
mod state;
mod reason;
mod error;
mod settings;
mod capture;
mod output;

pub use geometry::{Angle, Axis, Rect, Size};
pub use bearing::Bearing;
pub use measurement::{DetectedFace, FaceMeasurement, FaceTemplate, Frame, ImageBlob};
pub use state::{FaceAlignmentStatus, SessionState};
pub use reason::ReasonCode;
pub use error::{ConfigError, SessionError, SpoofKind};
pub use settings::{FaceExtents, ScorePolicy, SessionSettings};
pub use capture::{AngleWindow, Capture, FaceRequirement, SessionResult, Verdict};
pub use output::StepOutput;
