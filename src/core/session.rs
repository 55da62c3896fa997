//! Liveness session: per-frame pose challenge state machine
//!
//! State transitions:
//! - NO_FACE → FACE_FOUND: face detected
//! - FACE_FOUND → FIXED: smoothed bounds steady for `fixed_duration_ms`
//!   and, once the image size is known, inside the expected face rectangle
//! - FIXED → ALIGNED / MISALIGNED: smoothed angle vs. current bearing window
//! - ALIGNED → capture after `aligned_frames_required` frames, then
//!   FACE_FOUND for the next bearing, or COMPLETE when none remain
//! - any → NO_FACE: face missing beyond the grace countdown
//! - any → SPOOF_SUSPECTED → ABORTED: velocity or direction violation
//! - any → ABORTED: timeout, face not found, close

use crate::core::{
    expected_face_bounds, face_fits_expected_bounds, AngleBearingEvaluator, AngleSmoother,
    BearingSequencer, FaceComparator, ListenerHandle, RectSmoother, RequirementListeners,
    SessionResultEvaluator,
};
use crate::types::{
    Angle, Axis, Bearing, Capture, ConfigError, DetectedFace, FaceMeasurement, FaceRequirement,
    Frame, ImageBlob, ReasonCode, Rect, SessionError, SessionResult, SessionSettings,
    SessionState, Size, SpoofKind, StepOutput,
};

/// One pose-challenge session
#[derive(Debug)]
pub struct LivenessSession {
    settings: SessionSettings,
    evaluator: AngleBearingEvaluator,
    sequencer: BearingSequencer,
    listeners: RequirementListeners,

    state: SessionState,
    bearing: Bearing,
    /// Index of the current bearing period
    step: usize,

    angle_smoother: AngleSmoother,
    bounds_smoother: RectSmoother,
    /// Last raw angle seen, kept while the face is missing
    previous_raw: Option<(u64, Angle)>,
    /// Face went missing since `previous_raw` was taken
    face_interrupted: bool,
    previous_smoothed_bounds: Option<Rect>,
    steady_since_ms: Option<u64>,
    fixed: bool,
    aligned_frames: usize,
    missed_frames: u32,

    started_at_ms: Option<u64>,
    image_size: Option<Size>,
    captures: Vec<Capture>,
    control_captures: Vec<Capture>,
    failure: Option<SessionError>,
    closed: bool,
    last_sequence: u64,
}

impl LivenessSession {
    /// Create a session; settings are validated and frozen here
    pub fn new(settings: SessionSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let sequencer = BearingSequencer::from_settings(&settings);
        Ok(Self::with_sequencer(settings, sequencer))
    }

    fn with_sequencer(settings: SessionSettings, mut sequencer: BearingSequencer) -> Self {
        let bearing = sequencer.next().unwrap_or(Bearing::Straight);
        Self {
            evaluator: AngleBearingEvaluator::from_settings(&settings),
            angle_smoother: AngleSmoother::new(settings.angle_smoothing_window),
            bounds_smoother: RectSmoother::new(settings.bounds_smoothing_window),
            settings,
            sequencer,
            listeners: RequirementListeners::new(),
            state: SessionState::NoFace,
            bearing,
            step: 0,
            previous_raw: None,
            face_interrupted: false,
            previous_smoothed_bounds: None,
            steady_since_ms: None,
            fixed: false,
            aligned_frames: 0,
            missed_frames: 0,
            started_at_ms: None,
            image_size: None,
            captures: Vec::new(),
            control_captures: Vec::new(),
            failure: None,
            closed: false,
            last_sequence: 0,
        }
    }

    /// Mark the session start; the deadline runs from here
    ///
    /// Without an explicit start the first frame's timestamp is used.
    pub fn start(&mut self, now_ms: u64) {
        self.started_at_ms.get_or_insert(now_ms);
    }

    /// Consume one frame and advance the state machine
    pub fn process(&mut self, frame: Frame) -> StepOutput {
        let Frame { measurement, image, image_size } = frame;
        let sequence = measurement.sequence;
        let now = measurement.timestamp_ms;

        if self.state.is_terminal() {
            return self.output(sequence, ReasonCode::R006_SESSION_ENDED);
        }
        self.last_sequence = sequence;
        if image_size.is_some() {
            self.image_size = image_size;
        }

        if let Some(expired) = self.check_deadline(sequence, now) {
            return expired;
        }

        match measurement.face {
            None => self.on_face_missing(sequence),
            Some(face) => self.on_face(sequence, now, face, image),
        }
    }

    /// Check the deadline without a frame
    pub fn tick(&mut self, now_ms: u64) -> StepOutput {
        let sequence = self.last_sequence;
        if self.state.is_terminal() {
            return self.output(sequence, ReasonCode::R006_SESSION_ENDED);
        }
        match self.check_deadline(sequence, now_ms) {
            Some(expired) => expired,
            None => self.output(sequence, self.idle_reason()),
        }
    }

    /// Fail with a timeout measured on an external clock
    pub fn expire(&mut self, elapsed_ms: u64) -> StepOutput {
        let sequence = self.last_sequence;
        if self.state.is_terminal() {
            return self.output(sequence, ReasonCode::R006_SESSION_ENDED);
        }
        self.fail(sequence, SessionError::Timeout { elapsed_ms })
    }

    /// Abort the session from outside
    ///
    /// Returns true on the first call only. A session that already ended
    /// keeps its outcome.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        if !self.state.is_terminal() {
            self.fail(self.last_sequence, SessionError::Cancelled);
        }
        self.listeners.clear();
        true
    }

    /// Score the captures of a completed session
    ///
    /// `None` while the session is still running.
    pub fn finish(
        &self,
        comparator: Option<&dyn FaceComparator>,
    ) -> Option<Result<SessionResult, SessionError>> {
        if let Some(err) = &self.failure {
            return Some(Err(err.clone()));
        }
        if self.state != SessionState::Complete {
            return None;
        }
        Some(SessionResultEvaluator::from_settings(&self.settings).evaluate(
            self.captures.clone(),
            self.control_captures.clone(),
            comparator,
        ))
    }

    // =========================================================================
    // Requirement listeners
    // =========================================================================

    /// Register a listener; it immediately receives the current requirement
    pub fn register_requirement_listener(
        &mut self,
        listener: impl FnMut(&FaceRequirement) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let handle = self.listeners.register(listener);
        if !self.state.is_terminal() {
            let requirement = self.current_requirement();
            self.listeners.notify_one(handle, &requirement);
        }
        handle
    }

    pub fn unregister_requirement_listener(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.unregister(handle)
    }

    /// Pose currently requested from the subject
    pub fn current_requirement(&self) -> FaceRequirement {
        self.evaluator.requirement(
            self.step,
            self.bearing,
            self.image_size,
            &self.settings.expected_face_extents,
        )
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bearing(&self) -> Bearing {
        self.bearing
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn evaluator(&self) -> &AngleBearingEvaluator {
        &self.evaluator
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn control_captures(&self) -> &[Capture] {
        &self.control_captures
    }

    pub fn failure(&self) -> Option<&SessionError> {
        self.failure.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn smoothed_angle(&self) -> Option<Angle> {
        self.angle_smoother.current()
    }

    // =========================================================================
    // Frame handling
    // =========================================================================

    fn check_deadline(&mut self, sequence: u64, now: u64) -> Option<StepOutput> {
        let started = *self.started_at_ms.get_or_insert(now);
        let elapsed_ms = now.saturating_sub(started);
        if elapsed_ms >= self.settings.timeout_ms {
            return Some(self.fail(sequence, SessionError::Timeout { elapsed_ms }));
        }
        None
    }

    fn on_face_missing(&mut self, sequence: u64) -> StepOutput {
        self.missed_frames += 1;
        self.face_interrupted = true;
        if self.missed_frames > self.settings.max_missed_frames {
            let missed_frames = self.missed_frames;
            return self.fail(sequence, SessionError::FaceNotFound { missed_frames });
        }
        if self.missed_frames > self.settings.presence_grace_frames {
            if self.state != SessionState::NoFace {
                self.reset_progress();
                self.transition(SessionState::NoFace, ReasonCode::R001_FACE_LOST);
            }
            return self.output(sequence, ReasonCode::R001_FACE_LOST);
        }
        self.output(sequence, ReasonCode::R001_FACE_MISSED)
    }

    fn on_face(&mut self, sequence: u64, now: u64, face: DetectedFace, image: ImageBlob) -> StepOutput {
        self.missed_frames = 0;
        if self.state == SessionState::NoFace {
            self.transition(SessionState::FaceFound, ReasonCode::R001_FACE_FOUND);
        }

        if self.moved_too_fast(sequence, &face.angle) {
            return self.spoof(sequence, SpoofKind::MovedTooFast);
        }
        if let Some(kind) = self.direction_violation(&face.angle) {
            return self.spoof(sequence, kind);
        }
        self.previous_raw = Some((sequence, face.angle));
        self.face_interrupted = false;

        self.angle_smoother.add_sample(face.angle);
        self.bounds_smoother.add_sample(face.bounds);
        let (Some(angle), Some(bounds)) = (self.angle_smoother.current(), self.bounds_smoother.current())
        else {
            return self.output(sequence, ReasonCode::R001_FACE_FOUND);
        };

        // Fixation
        if !self.fixed {
            if !self.within_expected_bounds(&bounds) {
                self.steady_since_ms = None;
                self.previous_smoothed_bounds = None;
                self.transition(SessionState::FaceFound, ReasonCode::R002_OUT_OF_BOUNDS);
                return self.output(sequence, ReasonCode::R002_OUT_OF_BOUNDS);
            }
            self.update_steadiness(now, bounds);
            let steady_ms = self.steady_since_ms.map(|s| now.saturating_sub(s)).unwrap_or(0);
            if steady_ms < self.settings.fixed_duration_ms {
                self.transition(SessionState::FaceFound, ReasonCode::R002_FIXING);
                return self.output(sequence, ReasonCode::R002_FIXING);
            }
            self.fixed = true;
            self.transition(SessionState::Fixed, ReasonCode::R002_FIXED);
            return self.output(sequence, ReasonCode::R002_FIXED);
        }

        // Alignment
        if !self.evaluator.matches(&angle, self.bearing) {
            self.aligned_frames = 0;
            self.transition(SessionState::Misaligned, ReasonCode::R003_MISALIGNED);
            let mut output = self.output(sequence, ReasonCode::R003_MISALIGNED);
            output.offset = Some(self.evaluator.offset_toward(&angle, self.bearing));
            return output;
        }
        self.aligned_frames += 1;
        self.transition(SessionState::Aligned, ReasonCode::R003_ALIGNED);
        if self.aligned_frames < self.settings.aligned_frames_required {
            return self.output(sequence, ReasonCode::R003_ALIGNED);
        }

        let measurement = FaceMeasurement::new(sequence, now, Some(face));
        self.record_capture(measurement, image);
        let reason = self.advance();
        let mut output = self.output(sequence, reason);
        output.captured = true;
        output
    }

    /// Raw angle jumped further than a live head can turn in the elapsed frames
    fn moved_too_fast(&self, sequence: u64, angle: &Angle) -> bool {
        let Some((previous_sequence, previous_angle)) = self.previous_raw else {
            return false;
        };
        let frames = sequence.saturating_sub(previous_sequence).max(1) as f64;
        let delta = angle.distance_to(&previous_angle);
        if delta > self.settings.max_angle_delta_per_frame * frames {
            tracing::warn!(
                sequence,
                delta,
                frames,
                limit = self.settings.max_angle_delta_per_frame,
                "angle changed faster than the velocity limit"
            );
            return true;
        }
        false
    }

    /// Raw angle regressed, or reached the target off the expected arc
    ///
    /// Only applies while moving from a previous bearing toward the current
    /// one, and compares with the immediately previous raw sample. A target
    /// first seen right after the face went missing was reached unobserved
    /// and counts as off the arc.
    fn direction_violation(&self, angle: &Angle) -> Option<SpoofKind> {
        let from = self.sequencer.previous()?;
        let (_, previous) = self.previous_raw?;
        let to = self.bearing;
        if self.evaluator.matches(&previous, to) {
            return None;
        }
        if self.evaluator.matches(angle, to) {
            if self.face_interrupted {
                tracing::warn!(?previous, ?angle, %from, %to, "target reached while the face was missing");
                return Some(SpoofKind::OffArc);
            }
            if !self.evaluator.is_between(&previous, from, to) {
                tracing::warn!(?previous, ?angle, %from, %to, "target reached off the arc");
                return Some(SpoofKind::OffArc);
            }
            return None;
        }
        if self.face_interrupted {
            return None;
        }

        let from_target = self.evaluator.target_angle(from);
        let to_target = self.evaluator.target_angle(to);
        for axis in [Axis::Yaw, Axis::Pitch] {
            let direction = to_target.get(axis) - from_target.get(axis);
            if direction == 0.0 {
                continue;
            }
            let progress = (angle.get(axis) - previous.get(axis)) * direction.signum();
            if -progress > self.settings.opposite_movement_limit {
                tracing::warn!(
                    ?axis,
                    regression = -progress,
                    limit = self.settings.opposite_movement_limit,
                    %to,
                    "moved away from the requested bearing"
                );
                return Some(SpoofKind::MovedOpposite);
            }
        }
        None
    }

    /// Face sits inside the expected face rectangle, when the image size is known
    fn within_expected_bounds(&self, bounds: &Rect) -> bool {
        match self.image_size {
            Some(size) => {
                let extents = &self.settings.expected_face_extents;
                face_fits_expected_bounds(bounds, &expected_face_bounds(size, extents), extents.bounds_tolerance)
            }
            None => true,
        }
    }

    /// Restart the steadiness clock whenever the smoothed bounds jump
    fn update_steadiness(&mut self, now: u64, bounds: Rect) {
        if let Some(previous) = self.previous_smoothed_bounds {
            let jitter = self.settings.fixation_jitter * bounds.width.abs().max(1.0);
            let (cx, cy) = bounds.centre();
            let (px, py) = previous.centre();
            let moved = (cx - px).hypot(cy - py) > jitter
                || (bounds.width - previous.width).abs() > jitter
                || (bounds.height - previous.height).abs() > jitter;
            if moved {
                self.steady_since_ms = Some(now);
            }
        }
        self.steady_since_ms.get_or_insert(now);
        self.previous_smoothed_bounds = Some(bounds);
    }

    fn record_capture(&mut self, measurement: FaceMeasurement, image: ImageBlob) {
        let capture = Capture {
            step: self.step,
            bearing: self.bearing,
            measurement,
            image,
        };
        tracing::info!(
            step = self.step,
            bearing = %self.bearing,
            sequence = capture.measurement.sequence,
            "capture recorded"
        );
        if self.bearing == Bearing::Straight {
            self.control_captures.push(capture.clone());
        }
        self.captures.push(capture);
    }

    /// Move to the next bearing, or complete the session
    fn advance(&mut self) -> ReasonCode {
        match self.sequencer.next() {
            Some(next) => {
                self.bearing = next;
                self.step += 1;
                self.reset_period();
                self.transition(SessionState::FaceFound, ReasonCode::R005_CAPTURED);
                tracing::info!(step = self.step, bearing = %next, "next bearing requested");
                let requirement = self.current_requirement();
                self.listeners.notify_all(&requirement);
                ReasonCode::R005_CAPTURED
            }
            None => {
                self.transition(SessionState::Complete, ReasonCode::R005_COMPLETE);
                tracing::info!(captures = self.captures.len(), "session complete");
                ReasonCode::R005_COMPLETE
            }
        }
    }

    /// Fixation and alignment start over for a new bearing
    fn reset_period(&mut self) {
        self.bounds_smoother.reset();
        self.previous_smoothed_bounds = None;
        self.steady_since_ms = None;
        self.fixed = false;
        self.aligned_frames = 0;
    }

    /// Everything tracked about the face is dropped
    ///
    /// The last raw angle survives so direction checks still see where the
    /// face was before it went missing.
    fn reset_progress(&mut self) {
        self.reset_period();
        self.angle_smoother.reset();
    }

    fn spoof(&mut self, sequence: u64, kind: SpoofKind) -> StepOutput {
        self.transition(SessionState::SpoofSuspected, kind.reason());
        self.fail(sequence, SessionError::SpoofAttempt(kind))
    }

    fn fail(&mut self, sequence: u64, error: SessionError) -> StepOutput {
        tracing::warn!(error = %error, step = self.step, bearing = %self.bearing, "session aborted");
        let reason = error.reason();
        self.transition(SessionState::Aborted, reason);
        self.failure = Some(error);
        self.output(sequence, reason)
    }

    fn transition(&mut self, state: SessionState, reason: ReasonCode) {
        if state != self.state {
            tracing::debug!(from = %self.state, to = %state, reason = reason.code(), "state change");
            self.state = state;
        }
    }

    fn idle_reason(&self) -> ReasonCode {
        match self.state {
            SessionState::NoFace => ReasonCode::R001_FACE_MISSED,
            SessionState::FaceFound => ReasonCode::R002_FIXING,
            SessionState::Fixed => ReasonCode::R002_FIXED,
            SessionState::Aligned => ReasonCode::R003_ALIGNED,
            SessionState::Misaligned => ReasonCode::R003_MISALIGNED,
            _ => ReasonCode::R006_SESSION_ENDED,
        }
    }

    fn output(&self, sequence: u64, reason: ReasonCode) -> StepOutput {
        let mut output = StepOutput::new(sequence, self.state, reason, self.bearing);
        output.smoothed_angle = self.angle_smoother.current();
        output.capture_count = self.captures.len();
        output
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaceTemplate;

    const FRAME_MS: u64 = 33;

    fn settings() -> SessionSettings {
        SessionSettings {
            yaw_threshold: 20.0,
            pitch_threshold: 15.0,
            bearings: vec![Bearing::Left],
            max_bearings: 2,
            fixed_duration_ms: 100,
            seed: Some(1),
            ..SessionSettings::default()
        }
    }

    fn face(yaw: f64, pitch: f64) -> DetectedFace {
        DetectedFace::new(Rect::new(200.0, 100.0, 240.0, 300.0), Angle::new(yaw, pitch))
    }

    struct Feeder {
        sequence: u64,
    }

    impl Feeder {
        fn new() -> Self {
            Self { sequence: 0 }
        }

        fn frame(&mut self, face: Option<DetectedFace>) -> Frame {
            let sequence = self.sequence;
            self.sequence += 1;
            Frame::new(FaceMeasurement::new(sequence, sequence * FRAME_MS, face))
        }

        fn feed(&mut self, session: &mut LivenessSession, yaw: f64, pitch: f64) -> StepOutput {
            session.process(self.frame(Some(face(yaw, pitch))))
        }
    }

    #[test]
    fn test_initial_state() {
        let session = LivenessSession::new(settings()).unwrap();
        assert_eq!(session.state(), SessionState::NoFace);
        assert_eq!(session.bearing(), Bearing::Straight);
        assert!(session.captures().is_empty());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = SessionSettings {
            max_bearings: 0,
            ..settings()
        };
        assert!(LivenessSession::new(bad).is_err());
    }

    #[test]
    fn test_face_found_then_fixed() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        let out = feeder.feed(&mut session, 0.0, 0.0);
        assert_eq!(out.state, SessionState::FaceFound);
        assert_eq!(out.reason, ReasonCode::R002_FIXING);

        let mut fixed_seen = false;
        for _ in 0..5 {
            let out = feeder.feed(&mut session, 0.0, 0.0);
            fixed_seen |= out.state == SessionState::Fixed;
        }
        assert!(fixed_seen);
    }

    #[test]
    fn test_straight_capture_requests_next_bearing() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        let mut captured = None;
        for _ in 0..15 {
            let out = feeder.feed(&mut session, 0.0, 0.0);
            if out.captured {
                captured = Some(out);
                break;
            }
        }
        let out = captured.expect("straight capture");
        assert_eq!(out.reason, ReasonCode::R005_CAPTURED);
        assert_eq!(out.bearing, Bearing::Left);
        assert_eq!(out.state, SessionState::FaceFound);
        assert_eq!(session.control_captures().len(), 1);
        assert_eq!(session.captures()[0].bearing, Bearing::Straight);
    }

    #[test]
    fn test_jittery_bounds_never_fix() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        for i in 0..20 {
            let x = if i % 2 == 0 { 100.0 } else { 300.0 };
            let f = DetectedFace::new(Rect::new(x, 100.0, 240.0, 300.0), Angle::ZERO);
            let out = session.process(feeder.frame(Some(f)));
            assert_eq!(out.state, SessionState::FaceFound);
        }
    }

    #[test]
    fn test_misaligned_gives_offset() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        let mut last = None;
        for _ in 0..10 {
            last = Some(feeder.feed(&mut session, 17.0, 0.0));
        }
        let out = last.unwrap();
        assert_eq!(out.state, SessionState::Misaligned);
        let offset = out.offset.unwrap();
        assert!(offset.yaw < 0.0);
        assert_eq!(offset.pitch, 0.0);
    }

    #[test]
    fn test_single_missed_frame_tolerated() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        feeder.feed(&mut session, 0.0, 0.0);
        let out = session.process(feeder.frame(None));
        assert_eq!(out.reason, ReasonCode::R001_FACE_MISSED);
        assert_eq!(out.state, SessionState::FaceFound);
    }

    #[test]
    fn test_face_lost_resets_progress() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        for _ in 0..4 {
            feeder.feed(&mut session, 0.0, 0.0);
        }
        for _ in 0..3 {
            session.process(feeder.frame(None));
        }
        assert_eq!(session.state(), SessionState::NoFace);
        assert_eq!(session.smoothed_angle(), None);
    }

    #[test]
    fn test_missed_frame_budget() {
        let mut session = LivenessSession::new(SessionSettings {
            max_missed_frames: 5,
            ..settings()
        })
        .unwrap();
        let mut feeder = Feeder::new();
        for _ in 0..5 {
            session.process(feeder.frame(None));
        }
        assert!(!session.is_finished());
        let out = session.process(feeder.frame(None));
        assert_eq!(out.state, SessionState::Aborted);
        assert_eq!(
            session.failure(),
            Some(&SessionError::FaceNotFound { missed_frames: 6 })
        );
    }

    #[test]
    fn test_velocity_scaled_by_dropped_frames() {
        let mut session = LivenessSession::new(SessionSettings {
            max_angle_delta_per_frame: 10.0,
            ..settings()
        })
        .unwrap();
        session.process(Frame::new(FaceMeasurement::new(0, 0, Some(face(0.0, 0.0)))));
        // 18 degrees over 2 frames is within 10 degrees per frame
        let out = session.process(Frame::new(FaceMeasurement::new(2, 66, Some(face(18.0, 0.0)))));
        assert_ne!(out.state, SessionState::Aborted);
    }

    #[test]
    fn test_frames_ignored_after_abort() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        feeder.feed(&mut session, 0.0, 0.0);
        let out = feeder.feed(&mut session, 45.0, 0.0);
        assert_eq!(out.state, SessionState::Aborted);
        let out = feeder.feed(&mut session, 0.0, 0.0);
        assert_eq!(out.reason, ReasonCode::R006_SESSION_ENDED);
        assert_eq!(
            session.failure(),
            Some(&SessionError::SpoofAttempt(SpoofKind::MovedTooFast))
        );
    }

    #[test]
    fn test_tick_times_out() {
        let mut session = LivenessSession::new(SessionSettings {
            timeout_ms: 1000,
            ..settings()
        })
        .unwrap();
        session.start(0);
        assert_eq!(session.tick(999).state, SessionState::NoFace);
        let out = session.tick(1000);
        assert_eq!(out.reason, ReasonCode::R006_TIMEOUT);
        assert!(matches!(session.finish(None), Some(Err(SessionError::Timeout { .. }))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = LivenessSession::new(settings()).unwrap();
        assert!(session.close());
        assert!(!session.close());
        assert_eq!(session.state(), SessionState::Aborted);
        assert_eq!(session.failure(), Some(&SessionError::Cancelled));
    }

    #[test]
    fn test_finish_while_running_is_none() {
        let session = LivenessSession::new(settings()).unwrap();
        assert!(session.finish(None).is_none());
    }

    #[test]
    fn test_listener_gets_current_and_next_requirement() {
        use std::sync::{Arc, Mutex};
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut session = LivenessSession::new(settings()).unwrap();
        session.register_requirement_listener(move |req| sink.lock().unwrap().push(req.bearing));

        let mut feeder = Feeder::new();
        for _ in 0..15 {
            if feeder.feed(&mut session, 0.0, 0.0).captured {
                break;
            }
        }
        assert_eq!(*seen.lock().unwrap(), vec![Bearing::Straight, Bearing::Left]);
    }

    #[test]
    fn test_unregistered_listener_misses_later_bearings() {
        use std::sync::{Arc, Mutex};
        let dropped = Arc::new(Mutex::new(Vec::new()));
        let kept = Arc::new(Mutex::new(Vec::new()));
        let mut session = LivenessSession::new(settings()).unwrap();
        let sink = dropped.clone();
        let handle = session.register_requirement_listener(move |req| sink.lock().unwrap().push(req.bearing));
        let sink = kept.clone();
        session.register_requirement_listener(move |req| sink.lock().unwrap().push(req.bearing));

        let mut feeder = Feeder::new();
        for _ in 0..3 {
            feeder.feed(&mut session, 0.0, 0.0);
        }
        assert!(session.unregister_requirement_listener(handle));
        assert!(!session.unregister_requirement_listener(handle));
        for _ in 0..15 {
            if feeder.feed(&mut session, 0.0, 0.0).captured {
                break;
            }
        }

        assert_eq!(session.bearing(), Bearing::Left);
        assert_eq!(*dropped.lock().unwrap(), vec![Bearing::Straight]);
        assert_eq!(*kept.lock().unwrap(), vec![Bearing::Straight, Bearing::Left]);
    }

    #[test]
    fn test_last_angle_survives_face_loss() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        for _ in 0..15 {
            if feeder.feed(&mut session, 0.0, 0.0).captured {
                break;
            }
        }
        assert_eq!(session.bearing(), Bearing::Left);
        feeder.feed(&mut session, 6.0, 0.0);
        for _ in 0..3 {
            session.process(feeder.frame(None));
        }
        assert_eq!(session.state(), SessionState::NoFace);

        // Landing on the target straight after the gap is off the arc
        let out = feeder.feed(&mut session, 24.0, 0.0);
        assert_eq!(out.reason, ReasonCode::R004_OFF_ARC);
    }

    #[test]
    fn test_capture_keeps_template() {
        let mut session = LivenessSession::new(settings()).unwrap();
        let mut feeder = Feeder::new();
        for _ in 0..15 {
            let f = face(0.0, 0.0).with_template(FaceTemplate(vec![0.5, 0.5]));
            if session.process(feeder.frame(Some(f))).captured {
                break;
            }
        }
        let template = session.captures()[0]
            .measurement
            .face
            .as_ref()
            .and_then(|f| f.template.clone());
        assert_eq!(template, Some(FaceTemplate(vec![0.5, 0.5])));
    }
}
