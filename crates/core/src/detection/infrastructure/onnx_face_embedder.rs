/// ArcFace-style face embedder using ONNX Runtime via `ort`.
use std::path::Path;

use crate::detection::domain::face_embedder::FaceEmbedderModel;
use crate::recognition::domain::recognizer::l2_normalize;
use crate::shared::config::BlobSettings;
use crate::shared::frame::Frame;
use crate::shared::rect::PixelRect;

use super::blob::blob_from_region;
use super::execution_provider::load_session;

pub struct OnnxFaceEmbedder {
    session: ort::session::Session,
    settings: BlobSettings,
    dimension: usize,
}

impl OnnxFaceEmbedder {
    pub fn new(
        model_path: &Path,
        settings: BlobSettings,
        dimension: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        log::info!(
            "Loaded face embedder {} ({} dimensions)",
            model_path.display(),
            dimension
        );
        Ok(Self {
            session,
            settings,
            dimension,
        })
    }
}

impl FaceEmbedderModel for OnnxFaceEmbedder {
    fn embed(
        &mut self,
        frame: &Frame,
        roi: &PixelRect,
    ) -> Result<Option<Vec<f32>>, Box<dyn std::error::Error>> {
        let input_tensor = blob_from_region(frame, roi, &self.settings);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let output = outputs[0].try_extract_array::<f32>()?;
        let shape: Vec<usize> = output.shape().to_vec();
        let data: Vec<f32> = output.iter().copied().collect();
        Ok(embedding_from_output(&shape, &data, self.dimension))
    }
}

/// Accepts a row or column vector of exactly `dimension` elements and
/// returns it L2-normalized. Any other shape yields `None`.
pub fn embedding_from_output(shape: &[usize], data: &[f32], dimension: usize) -> Option<Vec<f32>> {
    if data.len() != dimension {
        return None;
    }
    let mut non_unit = shape.iter().filter(|&&d| d != 1);
    let vector_axis = match (non_unit.next(), non_unit.next()) {
        (Some(&d), None) => d,
        (None, None) => 1,
        _ => return None,
    };
    if vector_axis != dimension {
        return None;
    }
    let mut embedding = data.to_vec();
    l2_normalize(&mut embedding);
    Some(embedding)
}
