//! Session scoring: control faces against bearing faces

use crate::types::{
    Bearing, Capture, FaceTemplate, ScorePolicy, SessionError, SessionResult, SessionSettings,
    Verdict,
};

/// External face-template comparison service
pub trait FaceComparator {
    /// Similarity of two templates; higher is more similar
    fn compare(&self, a: &FaceTemplate, b: &FaceTemplate) -> Result<f32, SessionError>;
}

/// Cosine similarity of embedding templates
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineComparator;

impl FaceComparator for CosineComparator {
    fn compare(&self, a: &FaceTemplate, b: &FaceTemplate) -> Result<f32, SessionError> {
        if a.is_empty() || b.is_empty() {
            return Err(SessionError::InvalidTemplate("empty template".to_string()));
        }
        if a.as_slice().len() != b.as_slice().len() {
            return Err(SessionError::InvalidTemplate(format!(
                "template lengths differ ({} vs {})",
                a.as_slice().len(),
                b.as_slice().len()
            )));
        }
        let dot: f32 = a.as_slice().iter().zip(b.as_slice()).map(|(x, y)| x * y).sum();
        let norm_a = a.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = b.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return Err(SessionError::InvalidTemplate("zero-norm template".to_string()));
        }
        let score = dot / (norm_a * norm_b);
        if !score.is_finite() {
            return Err(SessionError::ComparisonFailed("non-finite similarity".to_string()));
        }
        Ok(score)
    }
}

/// Turns the captures of a completed session into a verdict
#[derive(Debug, Clone)]
pub struct SessionResultEvaluator {
    threshold: f32,
    policy: ScorePolicy,
}

impl SessionResultEvaluator {
    pub fn new(threshold: f32, policy: ScorePolicy) -> Self {
        Self { threshold, policy }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.recognition_threshold, settings.score_policy)
    }

    /// Score bearing captures against control captures
    ///
    /// Each bearing capture keeps its best control score; those are then
    /// aggregated by the policy. Without a comparator, or without anything to compare, the session
    /// passes on liveness alone and carries no score.
    pub fn evaluate(
        &self,
        captures: Vec<Capture>,
        control_captures: Vec<Capture>,
        comparator: Option<&dyn FaceComparator>,
    ) -> Result<SessionResult, SessionError> {
        let score = match comparator {
            Some(comparator) => self.score(&captures, &control_captures, comparator)?,
            None => None,
        };
        let verdict = match score {
            Some(s) if s < self.threshold => Verdict::ScoreBelowThreshold,
            _ => Verdict::Pass,
        };
        tracing::info!(
            captures = captures.len(),
            controls = control_captures.len(),
            score = ?score,
            verdict = ?verdict,
            "session evaluated"
        );
        Ok(SessionResult {
            captures,
            control_captures,
            verdict,
            recognition_score: score,
        })
    }

    fn score(
        &self,
        captures: &[Capture],
        control_captures: &[Capture],
        comparator: &dyn FaceComparator,
    ) -> Result<Option<f32>, SessionError> {
        let mut scores = Vec::new();
        for capture in captures.iter().filter(|c| c.bearing != Bearing::Straight) {
            let template = template_of(capture)?;
            let mut best: Option<f32> = None;
            for control in control_captures {
                let score = comparator.compare(template_of(control)?, template)?;
                best = Some(best.map_or(score, |b| b.max(score)));
            }
            scores.extend(best);
        }
        if scores.is_empty() {
            return Ok(None);
        }
        let aggregated = match self.policy {
            ScorePolicy::Max => scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            ScorePolicy::Mean => scores.iter().sum::<f32>() / scores.len() as f32,
        };
        Ok(Some(aggregated))
    }
}

fn template_of(capture: &Capture) -> Result<&FaceTemplate, SessionError> {
    capture
        .measurement
        .face
        .as_ref()
        .and_then(|face| face.template.as_ref())
        .ok_or_else(|| {
            SessionError::InvalidTemplate(format!(
                "capture {} ({}) has no face template",
                capture.step, capture.bearing
            ))
        })
}
