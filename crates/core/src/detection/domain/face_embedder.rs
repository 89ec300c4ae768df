use crate::shared::frame::Frame;
use crate::shared::rect::PixelRect;

/// Domain interface for the identity embedding model.
pub trait FaceEmbedderModel: Send {
    /// Embeds the face inside `roi` (already clipped to the frame).
    ///
    /// Returns `Ok(None)` when the model output does not have the expected
    /// dimensionality; the caller skips that face. The vector is
    /// L2-normalized.
    fn embed(
        &mut self,
        frame: &Frame,
        roi: &PixelRect,
    ) -> Result<Option<Vec<f32>>, Box<dyn std::error::Error>>;
}
