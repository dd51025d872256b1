//! Polyline traces: append-only vertices plus the segments joining them.
//!
//! A trace with N ≥ 1 vertices always holds exactly N−1 segments, and
//! segment `i` joins vertex `i` to vertex `i + 1`. Segments refer to
//! vertices by index, so vertices are never deleted individually; the only
//! removal is a full [`PolylineTrace::clear`] ahead of a rebuild.

use crate::error::{TraceError, TraceResult};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// RGBA line color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl TraceColor {
    /// Default color of dynamic (body) traces.
    pub const CRIMSON: Self = Self::rgb(0.86, 0.08, 0.24);

    /// Default color of the static trace.
    pub const GOLD: Self = Self::rgb(1.0, 0.84, 0.0);

    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    /// Creates an opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Converts to 8-bit RGBA (for viewers that take bytes).
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl Default for TraceColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Display attributes applied to a trace when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceStyle {
    pub color: TraceColor,
    pub line_width: f32,
    /// Let the renderer cache the geometry between draws
    pub cached_rendering: bool,
}

impl TraceStyle {
    /// Style of dynamic traces: crimson, 4 px.
    pub fn dynamic() -> Self {
        Self {
            color: TraceColor::CRIMSON,
            ..Self::default()
        }
    }

    /// Style of the static trace: gold, 4 px.
    pub fn static_trace() -> Self {
        Self {
            color: TraceColor::GOLD,
            ..Self::default()
        }
    }
}

impl Default for TraceStyle {
    fn default() -> Self {
        Self {
            color: TraceColor::WHITE,
            line_width: 4.0,
            cached_rendering: true,
        }
    }
}

/// One continuous path, drawn as line segments between consecutive vertices.
///
/// This is a pure geometry container: attaching it to a scene is up to the
/// owner. Display attributes can change at any time without touching the
/// vertex data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineTrace {
    vertices: Vec<Point3<f64>>,
    segments: Vec<(usize, usize)>,
    color: TraceColor,
    line_width: f32,
    visible: bool,
    cached_rendering: bool,
}

impl PolylineTrace {
    /// Creates an empty, visible trace.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            segments: Vec::new(),
            color: TraceColor::default(),
            line_width: 1.0,
            visible: true,
            cached_rendering: false,
        }
    }

    /// Creates a trace holding a single seed vertex and no segments.
    pub fn seeded(seed: Point3<f64>) -> Self {
        let mut trace = Self::new();
        trace.vertices.push(seed);
        trace
    }

    /// Builds a trace from a non-empty point sequence.
    ///
    /// Equivalent to seeding with the first point and appending the rest
    /// in order.
    pub fn from_points(points: &[Point3<f64>]) -> TraceResult<Self> {
        let mut trace = Self::new();
        trace.rebuild_from(points)?;
        Ok(trace)
    }

    /// Replaces the geometry with `points`, keeping display attributes.
    ///
    /// An empty input is rejected before anything is cleared.
    pub fn rebuild_from(&mut self, points: &[Point3<f64>]) -> TraceResult<()> {
        if points.is_empty() {
            return Err(TraceError::EmptyInput);
        }

        self.clear();
        self.vertices.reserve(points.len());
        self.segments.reserve(points.len() - 1);
        for p in points {
            self.append_vertex(*p);
        }

        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Appends a vertex and, unless it is the first one, the segment that
    /// joins it to its predecessor.
    pub fn append_vertex(&mut self, point: Point3<f64>) {
        self.vertices.push(point);
        let n = self.vertices.len();
        if n > 1 {
            self.segments.push((n - 2, n - 1));
        }
    }

    /// Removes all vertices and segments.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.segments.clear();
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_color(&mut self, color: TraceColor) {
        self.color = color;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    pub fn set_cached_rendering(&mut self, cached: bool) {
        self.cached_rendering = cached;
    }

    /// Applies color, line width and caching from a style.
    pub fn apply_style(&mut self, style: &TraceStyle) {
        self.color = style.color;
        self.line_width = style.line_width;
        self.cached_rendering = style.cached_rendering;
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn segments(&self) -> &[(usize, usize)] {
        &self.segments
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn last_vertex(&self) -> Option<&Point3<f64>> {
        self.vertices.last()
    }

    pub fn color(&self) -> TraceColor {
        self.color
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn uses_cached_rendering(&self) -> bool {
        self.cached_rendering
    }

    /// Checks the N / N−1 segment rule.
    pub fn check_invariant(&self) -> bool {
        let expected = self.vertices.len().saturating_sub(1);
        self.segments.len() == expected
            && self
                .segments
                .iter()
                .enumerate()
                .all(|(i, &(a, b))| a == i && b == i + 1)
    }

    /// Total path length through all vertices.
    pub fn length(&self) -> f64 {
        self.segments
            .iter()
            .map(|&(a, b)| nalgebra::distance(&self.vertices[a], &self.vertices[b]))
            .sum()
    }
}

impl Default for PolylineTrace {
    fn default() -> Self {
        Self::new()
    }
}
