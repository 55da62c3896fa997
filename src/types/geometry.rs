//! Angle, rectangle and size value types

use serde::{Deserialize, Serialize};

/// Rotation axis on the yaw/pitch plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Yaw,
    Pitch,
}

/// Head pose in degrees
///
/// Positive yaw turns toward the subject's left, positive pitch looks down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Angle {
    pub yaw: f64,
    pub pitch: f64,
}

impl Angle {
    pub const ZERO: Angle = Angle { yaw: 0.0, pitch: 0.0 };

    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }

    /// Component along an axis
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Yaw => self.yaw,
            Axis::Pitch => self.pitch,
        }
    }

    /// Euclidean distance on the yaw/pitch plane
    pub fn distance_to(&self, other: &Angle) -> f64 {
        (self.yaw - other.yaw).hypot(self.pitch - other.pitch)
    }

    pub fn is_zero(&self) -> bool {
        self.yaw == 0.0 && self.pitch == 0.0
    }

    /// Direction of this angle on the yaw/pitch plane, in radians
    ///
    /// Measured from the positive yaw axis toward positive pitch.
    pub fn screen_angle(&self) -> f64 {
        self.pitch.atan2(self.yaw)
    }
}

/// Image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn centre(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Shrink by `dx` on the left and right and `dy` on the top and bottom
    ///
    /// Negative insets grow the rectangle.
    pub fn inset(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            width: self.width - 2.0 * dx,
            height: self.height - 2.0 * dy,
        }
    }

    /// `other` lies entirely inside this rectangle (edges included)
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// Reflect horizontally inside an image of the given width
    pub fn mirrored(&self, image_width: f64) -> Rect {
        Rect {
            x: image_width - self.x - self.width,
            ..*self
        }
    }
}
