//! Setup parameters for the trace controller.

use crate::error::{TraceError, TraceResult};
use crate::polyline::TraceStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Typed setup inputs, normally filled from the host's command line.
///
/// Empty strings disable the corresponding feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Name of the rigid body to trace (empty = no dynamic traces)
    pub body_to_trace: String,

    /// Path of the point file for the static trace (empty = no static trace)
    pub static_trace_path: String,

    /// Object whose local transform the static trace is expressed in
    /// (empty = world origin)
    pub static_trace_reference: String,

    /// Listen for toggles on the remote channel
    pub remote_toggles: bool,

    /// Start with collection enabled
    pub collect_on_start: bool,

    /// Sample the body every N-th frame while collecting
    pub sample_interval: u32,

    /// Capacity of the remote toggle queue
    pub toggle_queue_capacity: usize,

    pub dynamic_style: TraceStyle,

    pub static_style: TraceStyle,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            body_to_trace: String::new(),
            static_trace_path: String::new(),
            static_trace_reference: String::new(),
            remote_toggles: false,
            collect_on_start: false,
            sample_interval: 1,
            toggle_queue_capacity: 64,
            dynamic_style: TraceStyle::dynamic(),
            static_style: TraceStyle::static_trace(),
        }
    }
}

impl TraceConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> TraceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TraceError::not_found(format!("{} ({})", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Parses a config from JSON text.
    pub fn from_json_str(text: &str) -> TraceResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| TraceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> TraceResult<()> {
        if self.sample_interval == 0 {
            return Err(TraceError::InvalidConfig(
                "sample_interval must be at least 1".into(),
            ));
        }
        for (name, style) in [("dynamic", &self.dynamic_style), ("static", &self.static_style)] {
            if !style.line_width.is_finite() || style.line_width <= 0.0 {
                return Err(TraceError::InvalidConfig(format!(
                    "{} line_width must be positive, got {}",
                    name, style.line_width
                )));
            }
        }
        Ok(())
    }

    pub fn traces_body(&self) -> bool {
        !self.body_to_trace.is_empty()
    }

    pub fn has_static_trace(&self) -> bool {
        !self.static_trace_path.is_empty()
    }
}
