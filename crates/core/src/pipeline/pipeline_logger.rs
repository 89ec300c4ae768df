use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        })
    }
}

/// A user-facing notification about the pipeline's health.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub caption: String,
    pub description: String,
}

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples the orchestrator from where its diagnostics, timings and
/// metrics end up (stdout, a host's diagnostics channel, tests).
pub trait PipelineLogger: Send {
    /// Report the pipeline's health to the operator.
    fn diagnostic(&mut self, level: DiagnosticLevel, caption: &str, description: &str);

    /// Report frame-level progress. `total` is unknown for live streams.
    fn progress(&mut self, current: usize, total: Option<usize>);

    /// Record how long a named pipeline stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-pipeline summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn diagnostic(&mut self, _level: DiagnosticLevel, _caption: &str, _description: &str) {}
    fn progress(&mut self, _current: usize, _total: Option<usize>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tracks per-stage timing, metrics and
/// diagnostics, and provides a summary report at pipeline completion.
///
/// Progress output is throttled to every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    diagnostics: Vec<Diagnostic>,
    start_time: Instant,
    total_frames: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            diagnostics: Vec::new(),
            start_time: Instant::now(),
            total_frames: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.diagnostics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.total_frames;
        let mut lines = vec![format!(
            "Pipeline summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} runs)",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let max = values.iter().copied().fold(0.0, f64::max);
            lines.push(format!("  {name}: avg {:.1}  max {max:.0}", mean(values)));
        }

        for d in &self.diagnostics {
            lines.push(format!("  [{}] {} {}", d.level, d.caption, d.description));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn diagnostic(&mut self, level: DiagnosticLevel, caption: &str, description: &str) {
        match level {
            DiagnosticLevel::Warning => log::warn!("{caption} {description}"),
            DiagnosticLevel::Error => log::error!("{caption} {description}"),
        }
        self.diagnostics.push(Diagnostic {
            level,
            caption: caption.to_string(),
            description: description.to_string(),
        });
    }

    fn progress(&mut self, current: usize, total: Option<usize>) {
        self.total_frames = current;
        if current % self.throttle_frames != 0 && Some(current) != total {
            return;
        }
        match total {
            Some(total) if total > 0 => {
                let pct = current as f64 / total as f64 * 100.0;
                log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
            }
            _ => log::info!("Processing: {current} frames"),
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
