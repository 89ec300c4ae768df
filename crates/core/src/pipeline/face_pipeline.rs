use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::detection::domain::detection_engine::DetectionEngine;
use crate::detection::domain::model_provider::ModelProvider;
use crate::recognition::domain::detection::Detection;
use crate::recognition::domain::face_database::FaceDatabase;
use crate::shared::config::FaceWatchConfig;
use crate::shared::error::PipelineError;
use crate::shared::event::Event;
use crate::shared::frame::Frame;
use crate::tracking::domain::face_tracker::{FaceTracker, TrackerResult};
use crate::tracking::domain::multi_object_tracker::TrackerFactory;

use super::pipeline_logger::{DiagnosticLevel, PipelineLogger};

/// Everything the pipeline produced for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameOutput {
    pub frame_index: u64,
    pub timestamp_us: i64,
    pub detections: Vec<Detection>,
    pub events: Vec<Event>,
}

impl FrameOutput {
    fn empty(frame: &Frame) -> Self {
        Self {
            frame_index: frame.index(),
            timestamp_us: frame.timestamp_us(),
            detections: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty() && self.events.is_empty()
    }
}

/// Per-session orchestrator: sampling, detection, tracking, alert events
/// and the terminal failure transition.
///
/// [`push_frame`](Self::push_frame) never fails. Errors terminate the
/// detection engine and are reported once through the logger; from then on
/// every frame yields empty output.
pub struct FacePipeline {
    engine: DetectionEngine,
    tracker: FaceTracker,
    tracker_factory: TrackerFactory,
    frame_period: u64,
    previous_size: Option<(u32, u32)>,
    diagnostic_reported: bool,
    format_warned: bool,
    frames_seen: usize,
    logger: Box<dyn PipelineLogger>,
}

impl FacePipeline {
    pub fn new(
        config: &FaceWatchConfig,
        provider: Box<dyn ModelProvider>,
        tracker_factory: TrackerFactory,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let engine = DetectionEngine::new(config.clone(), provider);
        let tracker = FaceTracker::new(tracker_factory());
        Self {
            engine,
            tracker,
            tracker_factory,
            frame_period: config.detection_frame_period.max(1),
            previous_size: None,
            diagnostic_reported: false,
            format_warned: false,
            frames_seen: 0,
            logger,
        }
    }

    /// Shares an already loaded face database with this session.
    pub fn with_database(mut self, database: Arc<FaceDatabase>) -> Self {
        self.engine = self.engine.with_database(database);
        self
    }

    /// Loads models and the face database ahead of the first frame.
    /// Otherwise this happens lazily on the first sampled frame.
    pub fn initialize(&mut self) -> Result<(), PipelineError> {
        if self.engine.is_terminated() {
            self.report_broken_state();
            return Err(PipelineError::IsTerminated);
        }
        let result = self.engine.ensure_initialized();
        if let Err(e) = &result {
            self.fail(e);
        }
        result
    }

    pub fn is_terminated(&self) -> bool {
        self.engine.is_terminated()
    }

    pub fn push_frame(&mut self, frame: &Frame) -> FrameOutput {
        let output = FrameOutput::empty(frame);
        self.frames_seen += 1;
        self.logger.progress(self.frames_seen, None);
        if self.engine.is_terminated() {
            self.report_broken_state();
            return output;
        }

        if !frame.is_bgr() && !self.format_warned {
            self.logger.diagnostic(
                DiagnosticLevel::Warning,
                "Unexpected pixel format",
                &format!("Got {:?}, frames are read as BGR", frame.pixel_format()),
            );
            self.format_warned = true;
        }

        let size = (frame.width(), frame.height());
        if self.previous_size.is_some_and(|previous| previous != size) {
            self.logger.info(&format!(
                "Frame size changed to {}x{}, restarting tracker",
                size.0, size.1
            ));
            self.tracker = FaceTracker::new((self.tracker_factory)());
        }
        self.previous_size = Some(size);

        if frame.index() % self.frame_period != 0 {
            return output;
        }

        match self.process(frame) {
            Ok(result) => FrameOutput {
                detections: result.detections,
                events: result.events,
                ..output
            },
            Err(e) => {
                self.fail(&e);
                output
            }
        }
    }

    pub fn summary(&self) {
        self.logger.summary();
    }

    fn process(&mut self, frame: &Frame) -> Result<TrackerResult, PipelineError> {
        let start = Instant::now();
        let detections = self.engine.run(frame)?;
        self.logger
            .timing("detect", start.elapsed().as_secs_f64() * 1000.0);

        let start = Instant::now();
        let tracked = self.tracker.run(frame, detections)?;
        self.logger
            .timing("track", start.elapsed().as_secs_f64() * 1000.0);
        self.logger
            .metric("faces", tracked.detections.len() as f64);

        let mut events: Vec<Event> = tracked
            .detections
            .iter()
            .filter_map(|d| Event::watchlist_match(frame.timestamp_us(), d))
            .collect();
        events.extend(tracked.events);

        Ok(TrackerResult {
            detections: tracked.detections,
            events,
        })
    }

    fn fail(&mut self, error: &PipelineError) {
        self.engine.terminate();
        if self.diagnostic_reported {
            return;
        }
        self.diagnostic_reported = true;
        self.logger
            .diagnostic(DiagnosticLevel::Error, error.caption(), &error.to_string());
    }

    fn report_broken_state(&mut self) {
        self.fail(&PipelineError::IsTerminated);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::detection::domain::detection_engine::test_support::*;
    use crate::detection::domain::face_detector::DetectorRow;
    use crate::pipeline::pipeline_logger::Diagnostic;
    use crate::recognition::domain::detection::Watchlist;
    use crate::shared::event::EventKind;
    use crate::shared::frame::PixelFormat;
    use crate::tracking::infrastructure::bytetrack_tracker::ByteTracker;

    #[derive(Clone, Default)]
    struct RecordingLogger {
        diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
        timings: Arc<Mutex<Vec<String>>>,
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn diagnostic(&mut self, level: DiagnosticLevel, caption: &str, description: &str) {
            self.diagnostics.lock().unwrap().push(Diagnostic {
                level,
                caption: caption.to_string(),
                description: description.to_string(),
            });
        }
        fn progress(&mut self, _current: usize, _total: Option<usize>) {}
        fn timing(&mut self, stage: &str, _duration_ms: f64) {
            self.timings.lock().unwrap().push(stage.to_string());
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    struct Harness {
        pipeline: FacePipeline,
        logger: RecordingLogger,
        detector_calls: Arc<AtomicUsize>,
        trackers_built: Arc<AtomicUsize>,
        _db: TempDir,
    }

    impl Harness {
        fn diagnostics(&self) -> Vec<Diagnostic> {
            self.logger.diagnostics.lock().unwrap().clone()
        }
    }

    fn harness(provider: FakeProvider, period: u64) -> Harness {
        let db = TempDir::new().unwrap();
        write_database(db.path());
        let config = FaceWatchConfig {
            detection_frame_period: period,
            ..config(db.path())
        };
        let detector_calls = provider.detector_calls.clone();
        let trackers_built = Arc::new(AtomicUsize::new(0));
        let counter = trackers_built.clone();
        let factory: TrackerFactory = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(ByteTracker::new(30))
        });
        let logger = RecordingLogger::default();
        let pipeline = FacePipeline::new(
            &config,
            Box::new(provider),
            factory,
            Box::new(logger.clone()),
        );
        Harness {
            pipeline,
            logger,
            detector_calls,
            trackers_built,
            _db: db,
        }
    }

    /// Normalized face box; left edge at 20px on a 200px-wide frame.
    fn face_row() -> DetectorRow {
        row(0.95, 0.1, 0.2, 0.4, 0.8)
    }

    fn provider_with(embedding: Vec<f32>) -> FakeProvider {
        FakeProvider {
            default_rows: vec![face_row()],
            embeddings: HashMap::from([(20, embedding)]),
            ..FakeProvider::default()
        }
    }

    fn kinds(output: &FrameOutput) -> Vec<EventKind> {
        output.events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_only_sampled_frames_processed() {
        let mut h = harness(provider_with(unit_vector(300)), 3);

        let outputs: Vec<FrameOutput> = (0..7).map(|i| h.pipeline.push_frame(&frame(i))).collect();

        for (i, out) in outputs.iter().enumerate() {
            assert_eq!(out.frame_index, i as u64);
            assert_eq!(out.detections.is_empty(), i % 3 != 0, "frame {i}");
        }
        assert_eq!(h.detector_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_blacklist_alert_precedes_tracker_events() {
        let mut h = harness(provider_with(unit_vector(2)), 1);

        let out = h.pipeline.push_frame(&frame(0));

        assert_eq!(out.detections.len(), 1);
        assert_eq!(out.detections[0].recognized_name, "bob");
        assert_eq!(out.detections[0].watchlist, Watchlist::Blacklist);
        assert!(!out.detections[0].track_id.is_nil());
        assert_eq!(
            kinds(&out),
            vec![
                EventKind::WatchlistMatchBlacklist,
                EventKind::DetectionStarted,
                EventKind::ObjectDetected,
            ]
        );
        assert_eq!(out.events[0].caption, "Blacklisted person: bob");
        assert_eq!(out.events[0].timestamp_us, 0);
    }

    #[test]
    fn test_unknown_face_has_no_alert() {
        let mut h = harness(provider_with(unit_vector(300)), 1);

        let out = h.pipeline.push_frame(&frame(0));

        assert_eq!(
            kinds(&out),
            vec![EventKind::DetectionStarted, EventKind::ObjectDetected]
        );
    }

    #[test]
    fn test_whitelist_alert_every_sampled_frame() {
        let mut h = harness(provider_with(unit_vector(1)), 1);

        h.pipeline.push_frame(&frame(0));
        let second = h.pipeline.push_frame(&frame(1));

        assert_eq!(
            kinds(&second),
            vec![EventKind::WatchlistMatchWhitelist, EventKind::ObjectDetected]
        );
    }

    #[test]
    fn test_track_id_stable_across_frames() {
        let mut h = harness(provider_with(unit_vector(1)), 1);

        let a = h.pipeline.push_frame(&frame(0));
        let b = h.pipeline.push_frame(&frame(1));

        assert_eq!(a.detections[0].track_id, b.detections[0].track_id);
    }

    #[test]
    fn test_detection_finished_when_faces_leave() {
        let mut provider = provider_with(unit_vector(300));
        provider.rows.insert(1, vec![]);
        let mut h = harness(provider, 1);

        h.pipeline.push_frame(&frame(0));
        let out = h.pipeline.push_frame(&frame(1));

        assert!(out.detections.is_empty());
        assert_eq!(kinds(&out), vec![EventKind::DetectionFinished]);
    }

    #[test]
    fn test_tracker_replaced_only_on_resolution_change() {
        let mut provider = provider_with(unit_vector(1));
        // 0.1 * 640 = 64 and 0.1 * 1280 = 128.
        provider.embeddings.insert(64, unit_vector(1));
        provider.embeddings.insert(128, unit_vector(1));
        let mut h = harness(provider, 1);
        assert_eq!(h.trackers_built.load(Ordering::SeqCst), 1);

        let a = h.pipeline.push_frame(&frame_sized(0, 640, 480));
        let b = h.pipeline.push_frame(&frame_sized(1, 640, 480));
        assert_eq!(h.trackers_built.load(Ordering::SeqCst), 1);
        assert_eq!(a.detections[0].track_id, b.detections[0].track_id);

        let c = h.pipeline.push_frame(&frame_sized(2, 1280, 720));
        assert_eq!(h.trackers_built.load(Ordering::SeqCst), 2);
        assert_ne!(b.detections[0].track_id, c.detections[0].track_id);
        assert_eq!(kinds(&c)[1], EventKind::DetectionStarted);
    }

    #[test]
    fn test_resolution_change_on_skipped_frame_still_resets() {
        let mut h = harness(provider_with(unit_vector(1)), 2);

        h.pipeline.push_frame(&frame_sized(0, 200, 100));
        h.pipeline.push_frame(&frame_sized(1, 400, 200));

        assert_eq!(h.trackers_built.load(Ordering::SeqCst), 2);
        assert_eq!(
            *h.logger.messages.lock().unwrap(),
            vec!["Frame size changed to 400x200, restarting tracker".to_string()]
        );
    }

    #[test]
    fn test_detector_failure_terminates_with_single_diagnostic() {
        let mut provider = provider_with(unit_vector(1));
        provider.fail_on = vec![2];
        let mut h = harness(provider, 1);

        assert!(!h.pipeline.push_frame(&frame(1)).is_empty());
        let failed = h.pipeline.push_frame(&frame(2));
        assert!(failed.is_empty());
        assert!(h.pipeline.is_terminated());

        for i in 3..6 {
            let out = h.pipeline.push_frame(&frame(i));
            assert!(out.is_empty());
            assert_eq!(out.frame_index, i);
        }

        let diagnostics = h.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].level, DiagnosticLevel::Error);
        assert_eq!(diagnostics[0].caption, "Face detection error.");
        assert!(diagnostics[0].description.contains("simulated inference failure"));
        assert_eq!(h.detector_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_initialize_failure_reports_once() {
        let provider = FakeProvider {
            fail_detector_load: true,
            ..FakeProvider::default()
        };
        let mut h = harness(provider, 1);

        let err = h.pipeline.initialize().unwrap_err();
        assert!(matches!(err, PipelineError::Initialization(_)));
        assert!(h.pipeline.is_terminated());
        assert!(h.pipeline.push_frame(&frame(0)).is_empty());
        assert_eq!(h.pipeline.initialize(), Err(PipelineError::IsTerminated));

        let diagnostics = h.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].caption, "Face detector initialization error.");
    }

    #[test]
    fn test_lazy_initialization_failure_on_first_sampled_frame() {
        let provider = FakeProvider {
            fail_detector_load: true,
            ..FakeProvider::default()
        };
        let mut h = harness(provider, 2);

        assert!(h.pipeline.push_frame(&frame(1)).is_empty());
        assert!(!h.pipeline.is_terminated());
        assert!(h.pipeline.push_frame(&frame(2)).is_empty());
        assert!(h.pipeline.is_terminated());
        assert_eq!(h.diagnostics().len(), 1);
    }

    #[test]
    fn test_non_bgr_frame_still_processed() {
        let mut h = harness(provider_with(unit_vector(1)), 1);
        let rgb = Frame::new(vec![0; 200 * 100 * 3], 200, 100, 600, PixelFormat::Rgb, 0, 0).unwrap();

        let out = h.pipeline.push_frame(&rgb);
        h.pipeline.push_frame(&rgb);

        assert_eq!(out.detections.len(), 1);
        let diagnostics = h.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].level, DiagnosticLevel::Warning);
        assert_eq!(diagnostics[0].caption, "Unexpected pixel format");
        assert!(!h.pipeline.is_terminated());
    }

    #[test]
    fn test_stage_timings_reported() {
        let mut h = harness(provider_with(unit_vector(1)), 1);
        h.pipeline.push_frame(&frame(0));
        assert_eq!(
            *h.logger.timings.lock().unwrap(),
            vec!["detect".to_string(), "track".to_string()]
        );
    }

    #[test]
    fn test_frame_output_serializes_for_sink() {
        let mut h = harness(provider_with(unit_vector(2)), 1);
        let out = h.pipeline.push_frame(&frame(0));

        let json: serde_json::Value = serde_json::to_value(&out).unwrap();
        let detection = &json["detections"][0];
        assert_eq!(detection["watchlist"], "blacklist");
        assert_eq!(detection["recognized_name"], "bob");
        assert_eq!(detection["class_label"], "face");
        assert!(detection.get("embedding").is_none());
        assert_eq!(
            detection["track_id"].as_str().unwrap(),
            out.detections[0].track_id.to_string()
        );
        assert_eq!(json["events"][0]["type_id"], "facewatch.face.blacklist");
    }
}
