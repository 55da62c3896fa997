//! Session settings
//!
//! Fixed at session construction. Loaded from JSON, then optionally
//! overridden by `POSELOCK_*` environment variables.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::types::{Bearing, ConfigError};
use crate::{
    DEFAULT_ALIGNED_FRAMES_REQUIRED, DEFAULT_FACE_BOUNDS_TOLERANCE, DEFAULT_FACE_EXTENT_HEIGHT, DEFAULT_FACE_EXTENT_WIDTH,
    DEFAULT_FIXATION_JITTER, DEFAULT_FIXED_DURATION_MS, DEFAULT_MAX_ANGLE_DELTA_PER_FRAME,
    DEFAULT_MAX_BEARINGS, DEFAULT_MAX_MISSED_FRAMES, DEFAULT_OPPOSITE_MOVEMENT_LIMIT,
    DEFAULT_PITCH_THRESHOLD, DEFAULT_PITCH_TOLERANCE, DEFAULT_PRESENCE_GRACE_FRAMES,
    DEFAULT_RECOGNITION_THRESHOLD, DEFAULT_SMOOTHING_WINDOW, DEFAULT_TIMEOUT_MS,
    DEFAULT_YAW_THRESHOLD, DEFAULT_YAW_TOLERANCE,
};

/// How per-capture recognition scores are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicy {
    #[default]
    Max,
    Mean,
}

/// Expected face size as a proportion of the image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceExtents {
    pub proportion_of_width: f64,
    pub proportion_of_height: f64,
    /// Per-edge slack before a face counts as outside the expected rectangle
    pub bounds_tolerance: f64,
}

impl Default for FaceExtents {
    fn default() -> Self {
        Self {
            proportion_of_width: DEFAULT_FACE_EXTENT_WIDTH,
            proportion_of_height: DEFAULT_FACE_EXTENT_HEIGHT,
            bounds_tolerance: DEFAULT_FACE_BOUNDS_TOLERANCE,
        }
    }
}

/// Immutable configuration of one liveness session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Yaw distance of LEFT*/RIGHT* targets (degrees)
    pub yaw_threshold: f64,
    /// Pitch distance of UP*/DOWN* targets (degrees)
    pub pitch_threshold: f64,
    pub yaw_tolerance: f64,
    pub pitch_tolerance: f64,
    /// Candidate bearings after the initial STRAIGHT
    pub bearings: Vec<Bearing>,
    /// Total bearings per session, including the initial STRAIGHT
    pub max_bearings: usize,
    pub angle_smoothing_window: usize,
    pub bounds_smoothing_window: usize,
    /// Allowed bounds drift between smoothed samples, fraction of face width
    pub fixation_jitter: f64,
    pub fixed_duration_ms: u64,
    pub aligned_frames_required: usize,
    pub presence_grace_frames: u32,
    pub max_missed_frames: u32,
    /// Raw angular velocity limit (degrees per frame)
    pub max_angle_delta_per_frame: f64,
    /// Allowed regression away from the target (degrees)
    pub opposite_movement_limit: f64,
    pub timeout_ms: u64,
    pub recognition_threshold: f32,
    pub score_policy: ScorePolicy,
    pub expected_face_extents: FaceExtents,
    /// Seed for bearing selection; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            yaw_threshold: DEFAULT_YAW_THRESHOLD,
            pitch_threshold: DEFAULT_PITCH_THRESHOLD,
            yaw_tolerance: DEFAULT_YAW_TOLERANCE,
            pitch_tolerance: DEFAULT_PITCH_TOLERANCE,
            bearings: Bearing::ALL.to_vec(),
            max_bearings: DEFAULT_MAX_BEARINGS,
            angle_smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            bounds_smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            fixation_jitter: DEFAULT_FIXATION_JITTER,
            fixed_duration_ms: DEFAULT_FIXED_DURATION_MS,
            aligned_frames_required: DEFAULT_ALIGNED_FRAMES_REQUIRED,
            presence_grace_frames: DEFAULT_PRESENCE_GRACE_FRAMES,
            max_missed_frames: DEFAULT_MAX_MISSED_FRAMES,
            max_angle_delta_per_frame: DEFAULT_MAX_ANGLE_DELTA_PER_FRAME,
            opposite_movement_limit: DEFAULT_OPPOSITE_MOVEMENT_LIMIT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            recognition_threshold: DEFAULT_RECOGNITION_THRESHOLD,
            score_policy: ScorePolicy::default(),
            expected_face_extents: FaceExtents::default(),
            seed: None,
        }
    }
}

impl SessionSettings {
    /// Read settings from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: SessionSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `POSELOCK_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        self.yaw_threshold = env_parse("POSELOCK_YAW_THRESHOLD", self.yaw_threshold);
        self.pitch_threshold = env_parse("POSELOCK_PITCH_THRESHOLD", self.pitch_threshold);
        self.yaw_tolerance = env_parse("POSELOCK_YAW_TOLERANCE", self.yaw_tolerance);
        self.pitch_tolerance = env_parse("POSELOCK_PITCH_TOLERANCE", self.pitch_tolerance);
        self.max_bearings = env_parse("POSELOCK_MAX_BEARINGS", self.max_bearings);
        self.fixed_duration_ms = env_parse("POSELOCK_FIXED_DURATION_MS", self.fixed_duration_ms);
        self.timeout_ms = env_parse("POSELOCK_TIMEOUT_MS", self.timeout_ms);
        self.max_angle_delta_per_frame =
            env_parse("POSELOCK_MAX_ANGLE_DELTA", self.max_angle_delta_per_frame);
        self.recognition_threshold =
            env_parse("POSELOCK_RECOGNITION_THRESHOLD", self.recognition_threshold);
        self.seed = std::env::var("POSELOCK_SEED")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(self.seed);
        self
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, threshold, tolerance) in [
            ("yaw_tolerance", self.yaw_threshold, self.yaw_tolerance),
            ("pitch_tolerance", self.pitch_threshold, self.pitch_tolerance),
        ] {
            if !(tolerance > 0.0 && tolerance < threshold) {
                return Err(invalid(
                    field,
                    format!("must be in (0, {}), got {}", threshold, tolerance),
                ));
            }
        }
        if self.max_bearings == 0 {
            return Err(invalid("max_bearings", "must be at least 1".to_string()));
        }
        if self.max_bearings > 1 && self.bearings.is_empty() {
            return Err(invalid("bearings", "no candidate bearings".to_string()));
        }
        if self.angle_smoothing_window == 0 || self.bounds_smoothing_window == 0 {
            return Err(invalid("smoothing_window", "must be at least 1".to_string()));
        }
        if self.aligned_frames_required == 0 {
            return Err(invalid("aligned_frames_required", "must be at least 1".to_string()));
        }
        if self.max_angle_delta_per_frame <= 0.0 {
            return Err(invalid("max_angle_delta_per_frame", "must be positive".to_string()));
        }
        if self.opposite_movement_limit < 0.0 {
            return Err(invalid("opposite_movement_limit", "must not be negative".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "must be positive".to_string()));
        }
        if !(self.fixation_jitter >= 0.0 && self.fixation_jitter.is_finite()) {
            return Err(invalid(
                "fixation_jitter",
                format!("must be a finite non-negative fraction, got {}", self.fixation_jitter),
            ));
        }
        if !(0.0..=1.0).contains(&self.recognition_threshold) {
            return Err(invalid(
                "recognition_threshold",
                format!("must be in [0, 1], got {}", self.recognition_threshold),
            ));
        }
        let extents = &self.expected_face_extents;
        for (field, value) in [
            ("expected_face_extents.proportion_of_width", extents.proportion_of_width),
            ("expected_face_extents.proportion_of_height", extents.proportion_of_height),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(field, format!("must be in (0, 1], got {}", value)));
            }
        }
        if !(0.0..0.5).contains(&extents.bounds_tolerance) {
            return Err(invalid(
                "expected_face_extents.bounds_tolerance",
                format!("must be in [0, 0.5), got {}", extents.bounds_tolerance),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { field, message }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
