use crate::shared::frame::Frame;

/// One face proposal from the detector, coordinates as fractions of the
/// frame size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorRow {
    pub confidence: f32,
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

/// Domain interface for the face bounding-box model.
///
/// Inference mutates internal scratch buffers, hence `&mut self`.
pub trait FaceDetectorModel: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectorRow>, Box<dyn std::error::Error>>;
}
