/// SSD-style face detector (RetinaFace export) using ONNX Runtime via `ort`.
///
/// The model takes a `[1, 3, S, S]` blob of the whole frame and returns a
/// `[1, 1, N, 7]` tensor of `[batch, class, confidence, x_min, y_min, x_max,
/// y_max]` rows with frame-relative corners.
use std::path::Path;

use crate::detection::domain::face_detector::{DetectorRow, FaceDetectorModel};
use crate::shared::config::BlobSettings;
use crate::shared::frame::Frame;

use super::blob::blob_from_frame;
use super::execution_provider::load_session;

/// Values per detection row.
const ROW_LEN: usize = 7;

pub struct OnnxFaceDetector {
    session: ort::session::Session,
    settings: BlobSettings,
}

impl OnnxFaceDetector {
    pub fn new(model_path: &Path, settings: BlobSettings) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        log::info!(
            "Loaded face detector {} ({}x{} input)",
            model_path.display(),
            settings.input_size,
            settings.input_size
        );
        Ok(Self { session, settings })
    }
}

impl FaceDetectorModel for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectorRow>, Box<dyn std::error::Error>> {
        let input_tensor = blob_from_frame(frame, &self.settings);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let output = outputs[0].try_extract_array::<f32>()?;
        let shape: Vec<usize> = output.shape().to_vec();
        let data: Vec<f32> = output.iter().copied().collect();
        parse_detections(&shape, &data)
    }
}

/// Decode the `[1, 1, N, 7]` output. Anything with fewer than four axes, or
/// with no rows, yields no detections. Short rows are malformed output.
pub fn parse_detections(
    shape: &[usize],
    data: &[f32],
) -> Result<Vec<DetectorRow>, Box<dyn std::error::Error>> {
    if shape.len() < 4 || shape[2] == 0 {
        return Ok(Vec::new());
    }
    let rows = shape[2];
    let row_len = shape[3];
    if row_len < ROW_LEN || data.len() < rows * row_len {
        return Err(format!(
            "malformed detector output: shape {shape:?}, {} values",
            data.len()
        )
        .into());
    }
    Ok(data
        .chunks_exact(row_len)
        .take(rows)
        .map(|r| DetectorRow {
            confidence: r[2],
            x_min: r[3],
            y_min: r[4],
            x_max: r[5],
            y_max: r[6],
        })
        .collect())
}
