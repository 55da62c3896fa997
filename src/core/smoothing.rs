//! Moving-average smoothing over a sliding window

use crate::core::RingBuffer;
use crate::types::{Angle, Rect};

/// Sliding-window mean of a scalar
#[derive(Debug, Clone)]
pub struct ScalarSmoother {
    buffer: RingBuffer<f64>,
    current: Option<f64>,
}

impl ScalarSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            buffer: RingBuffer::new(window),
            current: None,
        }
    }

    pub fn add_sample(&mut self, value: f64) {
        self.buffer.push(value);
        self.current = self.mean();
    }

    /// Drop the oldest sample
    pub fn remove_oldest(&mut self) -> Option<f64> {
        let removed = self.buffer.pop_oldest();
        self.current = self.mean();
        removed
    }

    /// Smoothed value; `None` until a sample exists
    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.current = None;
    }

    fn mean(&self) -> Option<f64> {
        self.buffer
            .reduce(|a, b| a + b)
            .map(|sum| sum / self.buffer.len() as f64)
    }
}

/// Smooths yaw and pitch independently
#[derive(Debug, Clone)]
pub struct AngleSmoother {
    yaw: ScalarSmoother,
    pitch: ScalarSmoother,
}

impl AngleSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            yaw: ScalarSmoother::new(window),
            pitch: ScalarSmoother::new(window),
        }
    }

    pub fn add_sample(&mut self, angle: Angle) {
        self.yaw.add_sample(angle.yaw);
        self.pitch.add_sample(angle.pitch);
    }

    pub fn current(&self) -> Option<Angle> {
        Some(Angle::new(self.yaw.current()?, self.pitch.current()?))
    }

    pub fn remove_oldest(&mut self) {
        self.yaw.remove_oldest();
        self.pitch.remove_oldest();
    }

    pub fn reset(&mut self) {
        self.yaw.reset();
        self.pitch.reset();
    }
}

/// Smooths each rectangle field independently
#[derive(Debug, Clone)]
pub struct RectSmoother {
    x: ScalarSmoother,
    y: ScalarSmoother,
    width: ScalarSmoother,
    height: ScalarSmoother,
}

impl RectSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            x: ScalarSmoother::new(window),
            y: ScalarSmoother::new(window),
            width: ScalarSmoother::new(window),
            height: ScalarSmoother::new(window),
        }
    }

    pub fn add_sample(&mut self, rect: Rect) {
        self.x.add_sample(rect.x);
        self.y.add_sample(rect.y);
        self.width.add_sample(rect.width);
        self.height.add_sample(rect.height);
    }

    pub fn current(&self) -> Option<Rect> {
        Some(Rect::new(
            self.x.current()?,
            self.y.current()?,
            self.width.current()?,
            self.height.current()?,
        ))
    }

    pub fn remove_oldest(&mut self) {
        self.x.remove_oldest();
        self.y.remove_oldest();
        self.width.remove_oldest();
        self.height.remove_oldest();
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.width.reset();
        self.height.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_current() {
        let mut s = ScalarSmoother::new(3);
        assert_eq!(s.current(), None);
        s.add_sample(4.5);
        assert_eq!(s.current(), Some(4.5));
    }

    #[test]
    fn test_zero_samples_still_average() {
        let mut s = ScalarSmoother::new(3);
        s.add_sample(0.0);
        s.add_sample(0.0);
        assert_eq!(s.current(), Some(0.0));
    }

    #[test]
    fn test_window_mean() {
        let mut s = ScalarSmoother::new(3);
        for v in [1.0, 2.0, 3.0, 10.0] {
            s.add_sample(v);
        }
        // Window holds 2, 3, 10
        assert!((s.current().unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(s.sample_count(), 3);
    }

    #[test]
    fn test_remove_oldest_and_reset() {
        let mut s = ScalarSmoother::new(3);
        s.add_sample(2.0);
        s.add_sample(4.0);
        assert_eq!(s.remove_oldest(), Some(2.0));
        assert_eq!(s.current(), Some(4.0));
        s.remove_oldest();
        assert_eq!(s.current(), None);
        s.add_sample(1.0);
        s.reset();
        assert_eq!(s.current(), None);
    }

    #[test]
    fn test_angle_smoother() {
        let mut s = AngleSmoother::new(2);
        assert_eq!(s.current(), None);
        s.add_sample(Angle::new(10.0, -2.0));
        s.add_sample(Angle::new(20.0, 2.0));
        assert_eq!(s.current(), Some(Angle::new(15.0, 0.0)));
        s.reset();
        assert_eq!(s.current(), None);
    }

    #[test]
    fn test_rect_smoother() {
        let mut s = RectSmoother::new(2);
        s.add_sample(Rect::new(0.0, 0.0, 100.0, 100.0));
        s.add_sample(Rect::new(10.0, 20.0, 110.0, 120.0));
        assert_eq!(s.current(), Some(Rect::new(5.0, 10.0, 105.0, 110.0)));
        s.remove_oldest();
        assert_eq!(s.current(), Some(Rect::new(10.0, 20.0, 110.0, 120.0)));
    }
}
