//! Rerun visualization for trace simulations.
//!
//! [`RerunScene`] is a [`TraceScene`] that logs every trace as a 3D line
//! strip. Visualization is optional and only available with the
//! `visualization` feature; without it the scene is a no-op.
//!
//! # What Gets Logged
//!
//! - Dynamic traces under `traces/dynamic/<id>`
//! - The static trace under `traces/static/<id>`
//! - Hidden or detached traces are cleared from the viewer

use bodytrace_core::{PolylineTrace, TraceId, TraceKind, TraceScene};
use std::collections::HashMap;

#[cfg(feature = "visualization")]
use rerun::{Clear, Color, LineStrips3D, Radius, RecordingStream};

/// Scene that mirrors traces into a Rerun recording.
pub struct RerunScene {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    kinds: HashMap<TraceId, TraceKind>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunScene {
    /// Creates a scene with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            kinds: HashMap::new(),
            enabled: false,
        }
    }

    /// Spawns a viewer and logs into it.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to see traces");
                Self {
                    rec: Some(rec),
                    kinds: HashMap::new(),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a scene - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the simulation time for subsequent logs.
    #[cfg(feature = "visualization")]
    pub fn set_time(&self, seconds: f64) {
        if let Some(ref rec) = self.rec {
            rec.set_time_seconds("sim_time", seconds);
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn set_time(&self, _seconds: f64) {}

    #[cfg_attr(not(feature = "visualization"), allow(dead_code))]
    fn entity_path(&self, id: TraceId) -> String {
        match self.kinds.get(&id) {
            Some(TraceKind::Static) => format!("traces/static/{}", id.0),
            _ => format!("traces/dynamic/{}", id.0),
        }
    }

    #[cfg(feature = "visualization")]
    fn log_trace(&self, id: TraceId, trace: &PolylineTrace) {
        let Some(ref rec) = self.rec else {
            return;
        };
        let path = self.entity_path(id);

        if !trace.is_visible() || trace.is_empty() {
            let _ = rec.log(path, &Clear::flat());
            return;
        }

        let strip: Vec<[f32; 3]> = trace
            .vertices()
            .iter()
            .map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect();
        let [r, g, b, a] = trace.color().to_rgba8();

        let _ = rec.log(
            path,
            &LineStrips3D::new([strip])
                .with_colors([Color::from_unmultiplied_rgba(r, g, b, a)])
                .with_radii([Radius::new_ui_points(trace.line_width())]),
        );
    }

    #[cfg(not(feature = "visualization"))]
    fn log_trace(&self, _id: TraceId, _trace: &PolylineTrace) {}

    #[cfg(feature = "visualization")]
    fn clear_entity(&self, id: TraceId) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(self.entity_path(id), &Clear::flat());
        }
    }

    #[cfg(not(feature = "visualization"))]
    fn clear_entity(&self, _id: TraceId) {}
}

impl TraceScene for RerunScene {
    fn attach(&mut self, id: TraceId, kind: TraceKind, trace: &PolylineTrace) {
        self.kinds.insert(id, kind);
        if self.enabled {
            self.log_trace(id, trace);
        }
    }

    fn refresh(&mut self, id: TraceId, trace: &PolylineTrace) {
        if self.enabled {
            self.log_trace(id, trace);
        }
    }

    fn detach(&mut self, id: TraceId) {
        if self.enabled {
            self.clear_entity(id);
        }
        self.kinds.remove(&id);
    }
}
