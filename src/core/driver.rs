//! Async session driver
//!
//! The session step is synchronous. The driver owns the waiting: frames
//! arrive through a [`FrameFeed`] (latest frame wins), the task steps the
//! session and publishes [`SessionEvent`]s, and the wall-clock deadline
//! and close signal end it. The capture resource is released once on
//! every exit path.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::{FaceComparator, LivenessSession};
use crate::types::{
    Capture, DetectedFace, FaceMeasurement, FaceRequirement, Frame, ImageBlob, SessionError,
    SessionResult, SessionSettings, Size, StepOutput,
};

/// External face detector
pub trait FaceDetector {
    fn detect(&mut self, image: &ImageBlob) -> Option<DetectedFace>;
}

/// Run the detector on an image and wrap the result as a frame
pub fn detect_frame(
    detector: &mut dyn FaceDetector,
    sequence: u64,
    timestamp_ms: u64,
    image: ImageBlob,
    image_size: Size,
) -> Frame {
    let face = detector.detect(&image);
    Frame::new(FaceMeasurement::new(sequence, timestamp_ms, face)).with_image(image, image_size)
}

/// Camera or other device held for the lifetime of a session
pub trait CaptureResource: Send {
    fn release(&mut self);
}

/// Releases the wrapped resource exactly once, at the latest on drop
#[derive(Debug)]
pub struct ResourceGuard<R: CaptureResource> {
    resource: Option<R>,
}

impl<R: CaptureResource> ResourceGuard<R> {
    pub fn new(resource: R) -> Self {
        Self { resource: Some(resource) }
    }

    /// Returns false if already released
    pub fn release(&mut self) -> bool {
        match self.resource.take() {
            Some(mut resource) => {
                resource.release();
                tracing::debug!("capture resource released");
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.resource.is_none()
    }
}

impl<R: CaptureResource> Drop for ResourceGuard<R> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Event published by a running session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// New pose requested
    Requirement(FaceRequirement),
    /// One processed frame
    Progress(StepOutput),
    /// Bearing satisfied
    Captured(Capture),
    /// Terminal: the session completed and was scored
    Completed(SessionResult),
    /// Terminal: the session failed
    Failed(SessionError),
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Completed(_) | SessionEvent::Failed(_))
    }
}

/// Producer side of a session
///
/// Submitting replaces any frame the session has not picked up yet.
#[derive(Debug, Clone)]
pub struct FrameFeed {
    frames: Arc<watch::Sender<Option<Frame>>>,
    closed: watch::Receiver<bool>,
}

impl FrameFeed {
    /// Offer a frame; false once the session is closed
    pub fn submit(&self, frame: Frame) -> bool {
        if self.is_closed() {
            return false;
        }
        self.frames.send_replace(Some(frame));
        true
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the session is closed
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        wait_closed(&mut closed).await;
    }
}

/// Consumer side of a spawned session
#[derive(Debug)]
pub struct SessionHandle {
    feed: FrameFeed,
    close_tx: Arc<watch::Sender<bool>>,
    events_tx: broadcast::Sender<SessionEvent>,
    events: broadcast::Receiver<SessionEvent>,
    task: JoinHandle<Result<SessionResult, SessionError>>,
}

impl SessionHandle {
    pub fn feed(&self) -> FrameFeed {
        self.feed.clone()
    }

    /// Receiver subscribed before the session started
    pub fn events(&mut self) -> &mut broadcast::Receiver<SessionEvent> {
        &mut self.events
    }

    /// Additional receiver; only sees events sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Signal the session to stop
    ///
    /// True on the first call only. A session that already ended counts as
    /// closed.
    pub fn close(&self) -> bool {
        self.close_tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.close_tx.borrow()
    }

    /// Wait for the session outcome
    pub async fn join(self) -> Result<SessionResult, SessionError> {
        self.task
            .await
            .map_err(|e| SessionError::SetupFailed(format!("session task failed: {}", e)))?
    }
}

/// Start a session on the tokio runtime
///
/// The resource is released if setup fails, and otherwise when the
/// session ends.
pub fn spawn_session<R: CaptureResource + 'static>(
    settings: SessionSettings,
    resource: R,
    comparator: Option<Arc<dyn FaceComparator + Send + Sync>>,
) -> Result<SessionHandle, SessionError> {
    let guard = ResourceGuard::new(resource);
    let session = LivenessSession::new(settings)
        .map_err(|e| SessionError::SetupFailed(e.to_string()))?;

    let (frames_tx, frames_rx) = watch::channel(None);
    let (close_tx, close_rx) = watch::channel(false);
    let (events_tx, events) = broadcast::channel(256);
    let close_tx = Arc::new(close_tx);

    let feed = FrameFeed {
        frames: Arc::new(frames_tx),
        closed: close_rx,
    };
    let task = tokio::spawn(run_session(
        session,
        guard,
        frames_rx,
        close_tx.clone(),
        events_tx.clone(),
        comparator,
    ));
    tracing::info!("session started");

    Ok(SessionHandle {
        feed,
        close_tx,
        events_tx,
        events,
        task,
    })
}

enum Wake {
    Frame,
    Closed,
}

async fn run_session<R: CaptureResource>(
    mut session: LivenessSession,
    mut guard: ResourceGuard<R>,
    mut frames: watch::Receiver<Option<Frame>>,
    close_tx: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<SessionEvent>,
    comparator: Option<Arc<dyn FaceComparator + Send + Sync>>,
) -> Result<SessionResult, SessionError> {
    let mut close_rx = close_tx.subscribe();
    let started = Instant::now();
    let deadline = started + Duration::from_millis(session.settings().timeout_ms);

    let requirement_tx = events.clone();
    session.register_requirement_listener(move |requirement| {
        let _ = requirement_tx.send(SessionEvent::Requirement(requirement.clone()));
    });

    while !session.is_finished() {
        let wake = tokio::time::timeout_at(deadline, async {
            tokio::select! {
                changed = frames.changed() => match changed {
                    Ok(()) => Wake::Frame,
                    Err(_) => Wake::Closed,
                },
                _ = wait_closed(&mut close_rx) => Wake::Closed,
            }
        })
        .await;

        match wake {
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let output = session.expire(elapsed_ms);
                let _ = events.send(SessionEvent::Progress(output));
            }
            Ok(Wake::Closed) => {
                session.close();
            }
            Ok(Wake::Frame) => {
                let frame = frames.borrow_and_update().clone();
                if let Some(frame) = frame {
                    let output = session.process(frame);
                    if output.captured {
                        if let Some(capture) = session.captures().last() {
                            let _ = events.send(SessionEvent::Captured(capture.clone()));
                        }
                    }
                    let _ = events.send(SessionEvent::Progress(output));
                }
            }
        }
    }

    guard.release();
    close_tx.send_replace(true);
    let outcome = session
        .finish(comparator.as_ref().map(|c| c.as_ref() as &dyn FaceComparator))
        .unwrap_or(Err(SessionError::Cancelled));
    let terminal = match &outcome {
        Ok(result) => SessionEvent::Completed(result.clone()),
        Err(err) => SessionEvent::Failed(err.clone()),
    };
    let _ = events.send(terminal);
    outcome
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}
