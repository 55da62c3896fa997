//! Captures, requirements and session results

use serde::{Deserialize, Serialize};
use crate::types::{Angle, Bearing, FaceMeasurement, ImageBlob, Rect};

/// One accepted sample for a satisfied bearing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    /// Index of the bearing period this capture satisfied
    pub step: usize,
    pub bearing: Bearing,
    pub measurement: FaceMeasurement,
    #[serde(default, skip_serializing_if = "ImageBlob::is_empty")]
    pub image: ImageBlob,
}

/// Acceptance window of a bearing; open sides are `None`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleWindow {
    pub min_yaw: Option<f64>,
    pub max_yaw: Option<f64>,
    pub min_pitch: Option<f64>,
    pub max_pitch: Option<f64>,
}

impl AngleWindow {
    pub fn from_bounds(min: Angle, max: Angle) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            min_yaw: finite(min.yaw),
            max_yaw: finite(max.yaw),
            min_pitch: finite(min.pitch),
            max_pitch: finite(max.pitch),
        }
    }
}

/// Pose the subject is currently asked to assume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRequirement {
    pub step: usize,
    pub bearing: Bearing,
    pub prompt: String,
    pub target_angle: Angle,
    pub window: AngleWindow,
    /// Where the face should sit in the image, once the image size is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_bounds: Option<Rect>,
}

/// Outcome of comparing control faces with bearing faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    ScoreBelowThreshold,
}

/// Terminal value of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub captures: Vec<Capture>,
    pub control_captures: Vec<Capture>,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition_score: Option<f32>,
}

impl SessionResult {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}
