//! Angle/bearing geometry
//!
//! Every bearing owns an acceptance window on the yaw/pitch plane. The axis
//! that drives a bearing is open outward (overshoot is accepted); the other
//! axis must stay near centre. STRAIGHT is near centre on both axes.

use crate::types::{
    Angle, AngleWindow, Axis, Bearing, FaceExtents, FaceRequirement, Rect, SessionSettings, Size,
};

/// Pure geometric tests of angles against bearings
#[derive(Debug, Clone)]
pub struct AngleBearingEvaluator {
    yaw_threshold: f64,
    pitch_threshold: f64,
    yaw_tolerance: f64,
    pitch_tolerance: f64,
}

impl AngleBearingEvaluator {
    pub fn new(settings: &SessionSettings, pitch_tolerance: f64, yaw_tolerance: f64) -> Self {
        Self {
            yaw_threshold: settings.yaw_threshold,
            pitch_threshold: settings.pitch_threshold,
            yaw_tolerance,
            pitch_tolerance,
        }
    }

    /// Evaluator using the tolerances configured in the settings
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings, settings.pitch_tolerance, settings.yaw_tolerance)
    }

    pub fn threshold(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Yaw => self.yaw_threshold,
            Axis::Pitch => self.pitch_threshold,
        }
    }

    pub fn tolerance(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Yaw => self.yaw_tolerance,
            Axis::Pitch => self.pitch_tolerance,
        }
    }

    /// Centre of the acceptance window
    pub fn target_angle(&self, bearing: Bearing) -> Angle {
        let pitch = if bearing.is_up() {
            -self.pitch_threshold
        } else if bearing.is_down() {
            self.pitch_threshold
        } else {
            0.0
        };
        let yaw = if bearing.is_left() {
            self.yaw_threshold
        } else if bearing.is_right() {
            -self.yaw_threshold
        } else {
            0.0
        };
        Angle::new(yaw, pitch)
    }

    /// Lower bounds of the acceptance window (exclusive)
    pub fn min_angle(&self, bearing: Bearing) -> Angle {
        let pitch_edge = self.pitch_threshold - self.pitch_tolerance;
        let yaw_edge = self.yaw_threshold - self.yaw_tolerance;
        let pitch = if bearing.is_up() {
            f64::NEG_INFINITY
        } else if bearing.is_down() {
            pitch_edge
        } else {
            -pitch_edge
        };
        let yaw = if bearing.is_left() {
            yaw_edge
        } else if bearing.is_right() {
            f64::NEG_INFINITY
        } else {
            -yaw_edge
        };
        Angle::new(yaw, pitch)
    }

    /// Upper bounds of the acceptance window (exclusive)
    pub fn max_angle(&self, bearing: Bearing) -> Angle {
        let pitch_edge = self.pitch_threshold - self.pitch_tolerance;
        let yaw_edge = self.yaw_threshold - self.yaw_tolerance;
        let pitch = if bearing.is_up() {
            -pitch_edge
        } else if bearing.is_down() {
            f64::INFINITY
        } else {
            pitch_edge
        };
        let yaw = if bearing.is_left() {
            f64::INFINITY
        } else if bearing.is_right() {
            -yaw_edge
        } else {
            yaw_edge
        };
        Angle::new(yaw, pitch)
    }

    /// Strictly inside the window on both axes
    pub fn matches(&self, angle: &Angle, bearing: Bearing) -> bool {
        let min = self.min_angle(bearing);
        let max = self.max_angle(bearing);
        angle.pitch > min.pitch
            && angle.pitch < max.pitch
            && angle.yaw > min.yaw
            && angle.yaw < max.yaw
    }

    /// Whether `angle` lies on the way from one bearing to another
    ///
    /// Either endpoint window counts, as does the capsule swept between the
    /// two targets with radius `max(pitch_threshold, yaw_threshold)`.
    pub fn is_between(&self, angle: &Angle, from: Bearing, to: Bearing) -> bool {
        if self.matches(angle, from) || self.matches(angle, to) {
            return true;
        }
        let from_angle = self.target_angle(from);
        let to_angle = self.target_angle(to);
        let radius = self.pitch_threshold.max(self.yaw_threshold);
        let direction = Angle::new(to_angle.yaw - from_angle.yaw, to_angle.pitch - from_angle.pitch)
            .screen_angle()
            + std::f64::consts::FRAC_PI_2;
        let dx = direction.cos() * radius;
        let dy = direction.sin() * radius;

        let start_right = Angle::new(from_angle.yaw + dx, from_angle.pitch + dy);
        let start_left = Angle::new(from_angle.yaw - dx, from_angle.pitch - dy);
        let end_right = Angle::new(to_angle.yaw + dx, to_angle.pitch + dy);
        let end_left = Angle::new(to_angle.yaw - dx, to_angle.pitch - dy);

        let not_right_of_right = !is_right_of_line(angle, &start_right, &end_right);
        let left_of_left = is_right_of_line(angle, &start_left, &end_left);
        let past_start = is_right_of_line(angle, &start_right, &start_left);
        let inside_start = angle.distance_to(&from_angle) < radius;

        not_right_of_right && left_of_left && (past_start || inside_start)
    }

    /// Normalized hint of how far and which way to move
    ///
    /// Zero when the angle already matches. Otherwise each component is
    /// `(target - angle) / (threshold + tolerance)` for its axis.
    pub fn offset_toward(&self, angle: &Angle, bearing: Bearing) -> Angle {
        if self.matches(angle, bearing) {
            return Angle::ZERO;
        }
        let target = self.target_angle(bearing);
        Angle::new(
            (target.yaw - angle.yaw) / (self.yaw_threshold + self.yaw_tolerance),
            (target.pitch - angle.pitch) / (self.pitch_threshold + self.pitch_tolerance),
        )
    }

    /// Requirement describing a bearing for on-screen guidance
    pub fn requirement(
        &self,
        step: usize,
        bearing: Bearing,
        image_size: Option<Size>,
        extents: &FaceExtents,
    ) -> FaceRequirement {
        FaceRequirement {
            step,
            bearing,
            prompt: bearing.prompt().to_string(),
            target_angle: self.target_angle(bearing),
            window: AngleWindow::from_bounds(self.min_angle(bearing), self.max_angle(bearing)),
            expected_bounds: image_size.map(|size| expected_face_bounds(size, extents)),
        }
    }
}

/// Centred rectangle the face should fill
pub fn expected_face_bounds(size: Size, extents: &FaceExtents) -> Rect {
    let width = size.width * extents.proportion_of_width;
    let height = size.height * extents.proportion_of_height;
    Rect::new(
        (size.width - width) / 2.0,
        (size.height - height) / 2.0,
        width,
        height,
    )
}

/// Face bounds roughly fill the expected rectangle
///
/// Each edge may sit up to `tolerance × size` outside the expected
/// rectangle, and the face must still cover the expected rectangle shrunk
/// by the same amount.
pub fn face_fits_expected_bounds(bounds: &Rect, expected: &Rect, tolerance: f64) -> bool {
    let dx = expected.width * tolerance;
    let dy = expected.height * tolerance;
    expected.inset(-dx, -dy).contains(bounds) && bounds.contains(&expected.inset(dx, dy))
}

/// Point lies on or to the right of the directed line `start -> end`
fn is_right_of_line(point: &Angle, start: &Angle, end: &Angle) -> bool {
    let d = (point.yaw - start.yaw) * (end.pitch - start.pitch)
        - (point.pitch - start.pitch) * (end.yaw - start.yaw);
    d <= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> AngleBearingEvaluator {
        let settings = SessionSettings {
            yaw_threshold: 20.0,
            pitch_threshold: 15.0,
            ..SessionSettings::default()
        };
        AngleBearingEvaluator::new(&settings, 5.0, 5.0)
    }

    #[test]
    fn test_target_angle_signs() {
        let e = evaluator();
        assert_eq!(e.target_angle(Bearing::Straight), Angle::ZERO);
        assert_eq!(e.target_angle(Bearing::Left), Angle::new(20.0, 0.0));
        assert_eq!(e.target_angle(Bearing::Right), Angle::new(-20.0, 0.0));
        assert_eq!(e.target_angle(Bearing::Up), Angle::new(0.0, -15.0));
        assert_eq!(e.target_angle(Bearing::Down), Angle::new(0.0, 15.0));
        assert_eq!(e.target_angle(Bearing::RightDown), Angle::new(-20.0, 15.0));
        assert_eq!(e.target_angle(Bearing::LeftUp), Angle::new(20.0, -15.0));
    }

    #[test]
    fn test_every_target_matches_its_bearing() {
        let e = evaluator();
        for bearing in Bearing::ALL {
            assert!(e.matches(&e.target_angle(bearing), bearing), "{} target", bearing);
        }
    }

    #[test]
    fn test_windows() {
        let e = evaluator();
        assert_eq!(e.min_angle(Bearing::Left), Angle::new(15.0, -10.0));
        assert_eq!(e.max_angle(Bearing::Left), Angle::new(f64::INFINITY, 10.0));
        assert_eq!(e.min_angle(Bearing::Straight), Angle::new(-15.0, -10.0));
        assert_eq!(e.max_angle(Bearing::Straight), Angle::new(15.0, 10.0));
        assert_eq!(e.min_angle(Bearing::Up).pitch, f64::NEG_INFINITY);
        assert_eq!(e.max_angle(Bearing::Up).pitch, -10.0);
    }

    #[test]
    fn test_overshoot_accepted_and_edges_exclusive() {
        let e = evaluator();
        assert!(e.matches(&Angle::new(60.0, 0.0), Bearing::Left));
        assert!(!e.matches(&Angle::new(15.0, 0.0), Bearing::Left));
        assert!(!e.matches(&Angle::new(25.0, 12.0), Bearing::Left));
        assert!(e.matches(&Angle::new(25.0, 12.0), Bearing::LeftDown));
        assert!(!e.matches(&Angle::new(25.0, 8.0), Bearing::LeftDown));
    }

    #[test]
    fn test_offset_zero_iff_matching() {
        let e = evaluator();
        let samples = [
            Angle::new(0.0, 0.0),
            Angle::new(14.9, 0.0),
            Angle::new(15.1, 3.0),
            Angle::new(-30.0, -20.0),
            Angle::new(22.0, 9.0),
        ];
        for bearing in Bearing::ALL {
            for angle in &samples {
                let offset = e.offset_toward(angle, bearing);
                assert_eq!(e.matches(angle, bearing), offset.is_zero(), "{:?} {}", angle, bearing);
            }
        }
    }

    #[test]
    fn test_offset_direction() {
        let e = evaluator();
        let offset = e.offset_toward(&Angle::ZERO, Bearing::Right);
        // Move toward negative yaw, normalised by threshold + tolerance
        assert!((offset.yaw - (-20.0 / 25.0)).abs() < 1e-9);
        assert_eq!(offset.pitch, 0.0);
    }

    #[test]
    fn test_is_between_straight_and_left() {
        let e = evaluator();
        assert!(e.is_between(&Angle::new(10.0, 0.0), Bearing::Straight, Bearing::Left));
        assert!(e.is_between(&Angle::new(17.0, 12.0), Bearing::Straight, Bearing::Left));
        // Behind the start but inside the start circle
        assert!(e.is_between(&Angle::new(-16.0, 5.0), Bearing::Straight, Bearing::Left));
        // Well off the arc
        assert!(!e.is_between(&Angle::new(10.0, 30.0), Bearing::Straight, Bearing::Left));
        assert!(!e.is_between(&Angle::new(-30.0, 0.0), Bearing::Straight, Bearing::Left));
    }

    #[test]
    fn test_is_between_diagonal() {
        let e = evaluator();
        assert!(e.is_between(&Angle::new(-16.0, 9.0), Bearing::Straight, Bearing::RightDown));
        assert!(!e.is_between(&Angle::new(25.0, -20.0), Bearing::Straight, Bearing::RightDown));
    }

    #[test]
    fn test_face_fits_expected_bounds() {
        let expected = expected_face_bounds(Size::new(640.0, 480.0), &FaceExtents::default());
        assert!(face_fits_expected_bounds(&expected, &expected, 0.25));
        // Slightly larger and shifted still fits
        assert!(face_fits_expected_bounds(&expected.inset(-30.0, -20.0), &expected, 0.25));
        // Too small
        assert!(!face_fits_expected_bounds(&expected.inset(150.0, 150.0), &expected, 0.25));
        // Off to one side
        let shifted = Rect { x: expected.x + 200.0, ..expected };
        assert!(!face_fits_expected_bounds(&shifted, &expected, 0.25));
    }

    #[test]
    fn test_requirement_window_and_bounds() {
        let e = evaluator();
        let req = e.requirement(
            1,
            Bearing::Left,
            Some(Size::new(640.0, 480.0)),
            &FaceExtents::default(),
        );
        assert_eq!(req.window.min_yaw, Some(15.0));
        assert_eq!(req.window.max_yaw, None);
        let bounds = req.expected_bounds.unwrap();
        assert!((bounds.width - 416.0).abs() < 1e-9);
        assert!((bounds.x - 112.0).abs() < 1e-9);
    }
}
