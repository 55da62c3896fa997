//! Core modules for poselock

pub mod ring_buffer;
pub mod smoothing;
pub mod evaluator;
pub mod sequencer;
pub mod listeners;
pub mod result;
pub mod session;
pub mod driver;
pub mod api;

pub use ring_buffer::RingBuffer;
pub use smoothing::{AngleSmoother, RectSmoother, ScalarSmoother};
pub use evaluator::{expected_face_bounds, face_fits_expected_bounds, AngleBearingEvaluator};
pub use sequencer::{next_bearing, BearingSequencer};
pub use listeners::{ListenerHandle, RequirementListeners};
pub use result::{CosineComparator, FaceComparator, SessionResultEvaluator};
pub use session::LivenessSession;
pub use driver::{
    detect_frame, spawn_session, CaptureResource, FaceDetector, FrameFeed, ResourceGuard,
    SessionEvent, SessionHandle,
};
pub use api::{create_router, create_router_with_retention, run_server, AppState};
