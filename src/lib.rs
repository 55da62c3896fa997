//! poselock: pose-challenge liveness sessions
//!
//! Frame → LivenessSession → captures → SessionResultEvaluator → result

pub mod core;
pub mod types;

// =============================================================================
// POSE THRESHOLDS - Default bearing geometry (degrees)
// =============================================================================

/// Yaw distance from centre for LEFT*/RIGHT* bearings
pub const DEFAULT_YAW_THRESHOLD: f64 = 20.0;

/// Pitch distance from centre for UP*/DOWN* bearings
pub const DEFAULT_PITCH_THRESHOLD: f64 = 15.0;

/// Tolerance applied on both axes when testing window membership
pub const DEFAULT_YAW_TOLERANCE: f64 = 5.0;
pub const DEFAULT_PITCH_TOLERANCE: f64 = 5.0;

// =============================================================================
// SESSION PACING
// =============================================================================

/// Bearings requested per session, including the initial STRAIGHT
pub const DEFAULT_MAX_BEARINGS: usize = 2;

/// Moving-average window for angles and bounds
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// Allowed bounds drift between smoothed samples, as a fraction of face width
pub const DEFAULT_FIXATION_JITTER: f64 = 0.1;

/// How long bounds must stay put before a face counts as fixed (milliseconds)
pub const DEFAULT_FIXED_DURATION_MS: u64 = 500;

/// Consecutive aligned frames needed before a capture is taken
pub const DEFAULT_ALIGNED_FRAMES_REQUIRED: usize = 2;

/// Missed frames tolerated before alignment progress resets
pub const DEFAULT_PRESENCE_GRACE_FRAMES: u32 = 2;

/// Consecutive missed frames after which the session fails
pub const DEFAULT_MAX_MISSED_FRAMES: u32 = 60;

/// Overall session deadline (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// SPOOF LIMITS
// =============================================================================

/// Largest raw angle change a live head can make between two frames (degrees)
pub const DEFAULT_MAX_ANGLE_DELTA_PER_FRAME: f64 = 15.0;

/// Largest regression away from the target between consecutive frames (degrees)
pub const DEFAULT_OPPOSITE_MOVEMENT_LIMIT: f64 = 4.0;

// =============================================================================
// RECOGNITION
// =============================================================================

/// Minimum aggregated control-vs-bearing score for a passing session
pub const DEFAULT_RECOGNITION_THRESHOLD: f32 = 0.5;

/// Expected face size as a proportion of the image (width, height)
pub const DEFAULT_FACE_EXTENT_WIDTH: f64 = 0.65;
pub const DEFAULT_FACE_EXTENT_HEIGHT: f64 = 0.85;

/// How far face bounds may stray from the expected rectangle, per edge,
/// as a fraction of its size
pub const DEFAULT_FACE_BOUNDS_TOLERANCE: f64 = 0.25;

// =============================================================================
// API SESSIONS
// =============================================================================

/// How long a finished server session stays readable (seconds)
pub const SESSION_RETENTION_SECS: u64 = 300;

/// Interval between expiry sweeps in server mode (seconds)
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 5;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
