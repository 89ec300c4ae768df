use std::sync::Arc;

use crate::recognition::domain::detection::Detection;
use crate::recognition::domain::face_database::FaceDatabase;
use crate::recognition::domain::recognizer::Recognizer;
use crate::shared::config::FaceWatchConfig;
use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::shared::rect::PixelRect;

use super::face_detector::{DetectorRow, FaceDetectorModel};
use super::face_embedder::FaceEmbedderModel;
use super::model_provider::ModelProvider;

/// Detector + embedder + recognizer behind one per-frame call.
///
/// Owns the one-way termination state: any initialization or inference
/// failure terminates the engine, after which every call fails with
/// [`PipelineError::IsTerminated`]. Only a fresh instance resumes inference.
pub struct DetectionEngine {
    config: FaceWatchConfig,
    provider: Box<dyn ModelProvider>,
    detector: Option<Box<dyn FaceDetectorModel>>,
    embedder: Option<Box<dyn FaceEmbedderModel>>,
    database: Arc<FaceDatabase>,
    recognizer: Recognizer,
    terminated: bool,
}

impl DetectionEngine {
    pub fn new(config: FaceWatchConfig, provider: Box<dyn ModelProvider>) -> Self {
        let recognizer = Recognizer::new(config.embedding_dimension, config.recognition_threshold);
        Self {
            config,
            provider,
            detector: None,
            embedder: None,
            database: Arc::new(FaceDatabase::new()),
            recognizer,
            terminated: false,
        }
    }

    /// Uses an already loaded database instead of reading `face_db_dir`.
    /// An empty database is still loaded from disk on initialization.
    pub fn with_database(mut self, database: Arc<FaceDatabase>) -> Self {
        self.database = database;
        self
    }

    pub fn database(&self) -> &Arc<FaceDatabase> {
        &self.database
    }

    pub fn is_initialized(&self) -> bool {
        self.detector.is_some() && self.embedder.is_some() && !self.database.is_empty()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn terminate(&mut self) {
        if !self.terminated {
            log::warn!("Detection engine terminated");
        }
        self.terminated = true;
    }

    /// Loads both models and the face database once. Failures are final.
    pub fn ensure_initialized(&mut self) -> Result<(), PipelineError> {
        if self.terminated {
            return Err(PipelineError::IsTerminated);
        }
        if self.is_initialized() {
            return Ok(());
        }
        let result = self.load();
        if result.is_err() {
            self.terminate();
        }
        result
    }

    pub fn run(&mut self, frame: &Frame) -> Result<Vec<Detection>, PipelineError> {
        self.ensure_initialized()?;
        self.run_impl(frame).map_err(|e| {
            self.terminate();
            PipelineError::Detection(e.to_string())
        })
    }

    fn load(&mut self) -> Result<(), PipelineError> {
        if self.detector.is_none() {
            let detector = self.provider.load_detector(&self.config).map_err(|e| {
                PipelineError::Initialization(format!("loading face detector: {e}"))
            })?;
            self.detector = Some(detector);
        }
        if self.embedder.is_none() {
            let embedder = self.provider.load_embedder(&self.config).map_err(|e| {
                PipelineError::Initialization(format!("loading face embedder: {e}"))
            })?;
            self.embedder = Some(embedder);
        }
        if self.database.is_empty() {
            let mut database = FaceDatabase::new();
            database
                .load(
                    &self.config.face_db_dir,
                    self.config.embedding_dimension,
                    &self.config.embedding_extensions,
                )
                .map_err(|e| PipelineError::Initialization(e.to_string()))?;
            self.database = Arc::new(database);
        }
        Ok(())
    }

    fn run_impl(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (Some(detector), Some(embedder)) = (self.detector.as_mut(), self.embedder.as_mut())
        else {
            return Err("models are not loaded".into());
        };

        let rows = detector.detect(frame)?;
        let (fw, fh) = (frame.width(), frame.height());
        let bounds = PixelRect::full_frame(fw, fh);
        let mut detections = Vec::new();

        for row in rows {
            if !(row.confidence > self.config.confidence_threshold) {
                continue;
            }
            let roi = row_to_pixel_rect(&row, fw, fh).intersect(&bounds);
            if roi.is_empty()
                || roi.width < self.config.min_face_size
                || roi.height < self.config.min_face_size
            {
                continue;
            }

            let Some(embedding) = embedder.embed(frame, &roi)? else {
                log::debug!("No embedding for face at {roi:?}, skipping");
                continue;
            };

            let recognition = self.recognizer.match_embedding(&embedding, &self.database);
            detections.push(Detection::new(
                roi.to_normalized(fw, fh),
                row.confidence,
                embedding,
                recognition,
            ));
        }

        Ok(detections)
    }
}

/// Normalized coordinates are clamped to one frame beyond each edge so the
/// pixel corners stay well inside `i32`.
fn row_to_pixel_rect(row: &DetectorRow, frame_width: u32, frame_height: u32) -> PixelRect {
    let fw = frame_width as f32;
    let fh = frame_height as f32;
    let scale = |v: f32, size: f32| (v.clamp(-1.0, 2.0) * size) as i32;
    PixelRect::from_corners(
        scale(row.x_min, fw),
        scale(row.y_min, fh),
        scale(row.x_max, fw),
        scale(row.y_max, fh),
    )
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    use approx::assert_relative_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::test_support::*;
    use super::*;
    use crate::recognition::domain::detection::Watchlist;

    fn engine_with(provider: FakeProvider) -> (DetectionEngine, TempDir) {
        let db = TempDir::new().unwrap();
        write_database(db.path());
        (
            DetectionEngine::new(config(db.path()), Box::new(provider)),
            db,
        )
    }

    /// Face at x=[0.1, 0.4] of a 200px frame, i.e. crop left edge 20.
    fn face_row(confidence: f32) -> DetectorRow {
        row(confidence, 0.1, 0.2, 0.4, 0.8)
    }

    #[test]
    fn test_recognizes_whitelisted_face() {
        let provider = FakeProvider {
            default_rows: vec![face_row(0.95)],
            embeddings: HashMap::from([(20, unit_vector(1))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        let detections = engine.run(&frame(0)).unwrap();

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.recognized_name, "alice");
        assert_eq!(d.watchlist, Watchlist::Whitelist);
        assert_relative_eq!(d.similarity_score, 1.0, epsilon = 1e-5);
        assert_relative_eq!(d.confidence, 0.95);
        assert!(d.track_id.is_nil());
    }

    #[test]
    fn test_unrelated_face_stays_unknown() {
        let provider = FakeProvider {
            default_rows: vec![face_row(0.95)],
            embeddings: HashMap::from([(20, unit_vector(300))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        let d = &engine.run(&frame(0)).unwrap()[0];
        assert_eq!(d.recognized_name, "unknown");
        assert_eq!(d.watchlist, Watchlist::Unknown);
        assert!(d.similarity_score < 0.7);
    }

    #[test]
    fn test_confidence_must_exceed_threshold() {
        let provider = FakeProvider {
            default_rows: vec![face_row(0.7), face_row(0.5)],
            embeddings: HashMap::from([(20, unit_vector(1))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        assert!(engine.run(&frame(0)).unwrap().is_empty());
    }

    #[test]
    fn test_nan_confidence_rejected() {
        let provider = FakeProvider {
            default_rows: vec![face_row(f32::NAN)],
            embeddings: HashMap::from([(20, unit_vector(1))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        assert!(engine.run(&frame(0)).unwrap().is_empty());
        assert!(!engine.is_terminated());
    }

    #[rstest]
    #[case(row(0.9, -1e10, 0.1, 1e10, 0.9))]
    #[case(row(0.9, f32::NEG_INFINITY, 0.1, f32::INFINITY, 0.9))]
    #[case(row(0.9, -1e30, -1e30, 1e30, 1e30))]
    fn test_out_of_range_box_clipped_to_frame(#[case] detector_row: DetectorRow) {
        let provider = FakeProvider {
            default_rows: vec![detector_row],
            embeddings: HashMap::from([(0, unit_vector(2))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        let detections = engine.run(&frame(0)).unwrap();

        assert_eq!(detections.len(), 1);
        let bbox = detections[0].bounding_box;
        assert_relative_eq!(bbox.x, 0.0);
        assert_relative_eq!(bbox.width, 1.0);
        assert!(!engine.is_terminated());
    }

    #[test]
    fn test_nan_box_discarded() {
        let provider = FakeProvider {
            default_rows: vec![row(0.9, f32::NAN, f32::NAN, f32::NAN, f32::NAN)],
            embeddings: HashMap::from([(0, unit_vector(2))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        assert!(engine.run(&frame(0)).unwrap().is_empty());
    }

    #[test]
    fn test_small_faces_discarded() {
        // 0.04 * 200 = 8px wide.
        let provider = FakeProvider {
            default_rows: vec![row(0.9, 0.1, 0.1, 0.14, 0.9)],
            embeddings: HashMap::from([(20, unit_vector(1))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        assert!(engine.run(&frame(0)).unwrap().is_empty());
    }

    #[test]
    fn test_box_clipped_to_frame() {
        let provider = FakeProvider {
            default_rows: vec![row(0.9, -0.2, 0.5, 0.3, 1.4)],
            embeddings: HashMap::from([(0, unit_vector(2))]),
            ..FakeProvider::default()
        };
        let rois = provider.rois.clone();
        let (mut engine, _db) = engine_with(provider);

        let detections = engine.run(&frame(0)).unwrap();

        assert_eq!(rois.lock().unwrap()[0], PixelRect::new(0, 50, 60, 50));
        let bbox = detections[0].bounding_box;
        assert_relative_eq!(bbox.x, 0.0);
        assert_relative_eq!(bbox.y, 0.5);
        assert_relative_eq!(bbox.width, 0.3);
        assert_relative_eq!(bbox.height, 0.5);
        assert_eq!(detections[0].recognized_name, "bob");
        assert_eq!(detections[0].watchlist, Watchlist::Blacklist);
    }

    #[test]
    fn test_face_without_embedding_skipped() {
        let provider = FakeProvider {
            default_rows: vec![face_row(0.9), row(0.9, 0.6, 0.2, 0.9, 0.8)],
            embeddings: HashMap::from([(120, unit_vector(2))]),
            ..FakeProvider::default()
        };
        let (mut engine, _db) = engine_with(provider);

        let detections = engine.run(&frame(0)).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].recognized_name, "bob");
    }

    #[test]
    fn test_initialization_is_idempotent() {
        let provider = FakeProvider::default();
        let loads = provider.loads.clone();
        let (mut engine, _db) = engine_with(provider);

        engine.ensure_initialized().unwrap();
        engine.ensure_initialized().unwrap();
        engine.run(&frame(0)).unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(engine.is_initialized());
        assert_eq!(engine.database().len(), 2);
    }

    #[test]
    fn test_missing_database_terminates() {
        let mut engine = DetectionEngine::new(
            config(std::path::Path::new("/nonexistent/face_db")),
            Box::new(FakeProvider::default()),
        );

        let err = engine.ensure_initialized().unwrap_err();
        assert!(matches!(err, PipelineError::Initialization(_)));
        assert!(engine.is_terminated());
        assert_eq!(engine.ensure_initialized(), Err(PipelineError::IsTerminated));
    }

    #[test]
    fn test_model_load_failure_not_retried() {
        let provider = FakeProvider {
            fail_detector_load: true,
            ..FakeProvider::default()
        };
        let loads = provider.loads.clone();
        let (mut engine, _db) = engine_with(provider);

        assert!(matches!(
            engine.run(&frame(0)),
            Err(PipelineError::Initialization(_))
        ));
        assert_eq!(engine.run(&frame(1)), Err(PipelineError::IsTerminated));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inference_failure_terminates() {
        let provider = FakeProvider {
            default_rows: vec![face_row(0.9)],
            fail_on: vec![3],
            embeddings: HashMap::from([(20, unit_vector(1))]),
            ..FakeProvider::default()
        };
        let calls = provider.detector_calls.clone();
        let (mut engine, _db) = engine_with(provider);

        assert_eq!(engine.run(&frame(2)).unwrap().len(), 1);
        let err = engine.run(&frame(3)).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Detection("simulated inference failure".into())
        );
        assert!(engine.is_terminated());
        assert_eq!(engine.run(&frame(4)), Err(PipelineError::IsTerminated));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shared_database_skips_disk_load() {
        let db = TempDir::new().unwrap();
        write_database(db.path());
        let mut shared = FaceDatabase::new();
        shared
            .load(db.path(), DIM, &["bin".to_string()])
            .unwrap();
        let shared = Arc::new(shared);

        let mut engine = DetectionEngine::new(
            config(std::path::Path::new("/nonexistent/face_db")),
            Box::new(FakeProvider::default()),
        )
        .with_database(shared.clone());

        engine.ensure_initialized().unwrap();
        assert!(Arc::ptr_eq(engine.database(), &shared));
    }
}
