//! JSON exporter for trace runs.
//!
//! Exports per-frame toggle state plus the final geometry of every trace.

use bodytrace_core::{MemoryScene, TraceKind};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Toggle state sampled at one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub collect_enabled: bool,
    pub show_enabled: bool,

    /// Number of dynamic traces created so far
    pub dynamic_traces: usize,

    /// Vertices in the trace currently receiving samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_vertices: Option<usize>,
}

/// A trace as it stood at the end of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedTrace {
    pub id: u64,
    pub kind: TraceKind,
    pub visible: bool,
    pub color: [f32; 4],
    pub line_width: f32,

    /// Path length through all vertices [m]
    pub length: f64,

    pub vertices: Vec<[f64; 3]>,
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Sampled frames
    pub frames: Vec<TraceFrame>,

    /// Final geometry, in id order
    pub traces: Vec<ExportedTrace>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl TraceExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            traces: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: TraceFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Copies every trace attached to `scene`.
    pub fn capture_traces(&mut self, scene: &MemoryScene) {
        self.traces = scene
            .entries()
            .map(|(id, entry)| {
                let c = entry.trace.color();
                ExportedTrace {
                    id: id.0,
                    kind: entry.kind,
                    visible: entry.trace.is_visible(),
                    color: [c.r, c.g, c.b, c.a],
                    line_width: entry.trace.line_width(),
                    length: entry.trace.length(),
                    vertices: entry
                        .trace
                        .vertices()
                        .iter()
                        .map(|p| [p.x, p.y, p.z])
                        .collect(),
                }
            })
            .collect();
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
