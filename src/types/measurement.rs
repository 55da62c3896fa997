//! Per-frame detector output

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::types::{Angle, Rect, Size};

/// Opaque face recognition template (an embedding vector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceTemplate(pub Vec<f32>);

impl FaceTemplate {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Opaque encoded image bytes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageBlob(pub Vec<u8>);

impl ImageBlob {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 of the image bytes as lowercase hex
    pub fn digest_hex(&self) -> String {
        let digest: [u8; 32] = Sha256::digest(&self.0).into();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// A single face reported by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bounds: Rect,
    pub angle: Angle,
    /// Detector confidence, 0.0-1.0
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<FaceTemplate>,
}

fn full_confidence() -> f32 {
    1.0
}

impl DetectedFace {
    pub fn new(bounds: Rect, angle: Angle) -> Self {
        Self {
            bounds,
            angle,
            confidence: 1.0,
            template: None,
        }
    }

    pub fn with_template(mut self, template: FaceTemplate) -> Self {
        self.template = Some(template);
        self
    }
}

/// Detector output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMeasurement {
    /// Frame sequence index assigned by the producer
    pub sequence: u64,
    /// Producer clock, milliseconds
    pub timestamp_ms: u64,
    /// `None` when no face was detected
    #[serde(default)]
    pub face: Option<DetectedFace>,
}

impl FaceMeasurement {
    pub fn new(sequence: u64, timestamp_ms: u64, face: Option<DetectedFace>) -> Self {
        Self { sequence, timestamp_ms, face }
    }

    pub fn is_present(&self) -> bool {
        self.face.is_some()
    }
}

/// What the producer hands to the session for each frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub measurement: FaceMeasurement,
    #[serde(default, skip_serializing_if = "ImageBlob::is_empty")]
    pub image: ImageBlob,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<Size>,
}

impl Frame {
    pub fn new(measurement: FaceMeasurement) -> Self {
        Self {
            measurement,
            image: ImageBlob::default(),
            image_size: None,
        }
    }

    pub fn with_image(mut self, image: ImageBlob, size: Size) -> Self {
        self.image = image;
        self.image_size = Some(size);
        self
    }

    /// Flip a frame coming from a mirrored (selfie) camera
    ///
    /// Bounds are reflected and yaw changes sign. Returns `None` when the
    /// frame has a face but no image size, since the bounds cannot be
    /// reflected without the image width.
    pub fn mirrored(mut self) -> Option<Self> {
        if let Some(face) = self.measurement.face.as_mut() {
            let size = self.image_size?;
            face.angle.yaw = -face.angle.yaw;
            face.bounds = face.bounds.mirrored(size.width);
        }
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable() {
        let blob = ImageBlob(b"abc".to_vec());
        assert_eq!(
            blob.digest_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_mirrored_frame_flips_yaw_and_bounds() {
        let face = DetectedFace::new(Rect::new(100.0, 50.0, 200.0, 250.0), Angle::new(12.0, 3.0));
        let frame = Frame::new(FaceMeasurement::new(0, 0, Some(face)))
            .with_image(ImageBlob::default(), Size::new(640.0, 480.0))
            .mirrored()
            .unwrap();
        let face = frame.measurement.face.unwrap();
        assert_eq!(face.angle, Angle::new(-12.0, 3.0));
        assert_eq!(face.bounds.x, 340.0);
    }

    #[test]
    fn test_mirroring_needs_image_size() {
        let face = DetectedFace::new(Rect::new(100.0, 50.0, 200.0, 250.0), Angle::new(12.0, 3.0));
        let frame = Frame::new(FaceMeasurement::new(0, 0, Some(face)));
        assert!(frame.mirrored().is_none());

        // Nothing to reflect without a face
        let empty = Frame::new(FaceMeasurement::new(1, 33, None));
        assert_eq!(empty.clone().mirrored(), Some(empty));
    }

    #[test]
    fn test_frame_json_defaults() {
        let json = r#"{"measurement":{"sequence":1,"timestamp_ms":33,"face":{"bounds":{"x":0,"y":0,"width":10,"height":10},"angle":{"yaw":1.5,"pitch":0}}}}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();
        let face = frame.measurement.face.unwrap();
        assert_eq!(face.confidence, 1.0);
        assert!(face.template.is_none());
        assert!(frame.image.is_empty());
    }
}
