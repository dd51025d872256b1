//! Scene attachment for traces.
//!
//! The renderer owns the scene graph. The trace registry only tells it
//! which traces exist and when one of them changed; the renderer reads the
//! geometry and display attributes on its next draw pass.

use crate::polyline::PolylineTrace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle of a trace inside the scene. Unique per registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraceId(pub u64);

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trace-{}", self.0)
    }
}

/// Which flavor of trace a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceKind {
    /// Loaded from a point file
    Static,
    /// Sampled from a tracked body
    Dynamic,
}

/// Scene-attachment capability supplied by the host.
pub trait TraceScene {
    /// Adds a trace to the scene.
    fn attach(&mut self, id: TraceId, kind: TraceKind, trace: &PolylineTrace);

    /// Notifies the scene that a trace's geometry or attributes changed.
    fn refresh(&mut self, id: TraceId, trace: &PolylineTrace);

    /// Removes a trace from the scene.
    fn detach(&mut self, id: TraceId);
}

impl<S: TraceScene + ?Sized> TraceScene for Box<S> {
    fn attach(&mut self, id: TraceId, kind: TraceKind, trace: &PolylineTrace) {
        (**self).attach(id, kind, trace);
    }

    fn refresh(&mut self, id: TraceId, trace: &PolylineTrace) {
        (**self).refresh(id, trace);
    }

    fn detach(&mut self, id: TraceId) {
        (**self).detach(id);
    }
}

/// A trace as last seen by a [`MemoryScene`].
#[derive(Debug, Clone)]
pub struct SceneEntry {
    pub kind: TraceKind,
    pub trace: PolylineTrace,
}

/// In-memory scene that keeps a snapshot of every attached trace.
///
/// Used headless (tests, the simulation harness) in place of a renderer.
#[derive(Debug, Default)]
pub struct MemoryScene {
    entries: BTreeMap<TraceId, SceneEntry>,
    attach_count: usize,
    refresh_count: usize,
    detach_count: usize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshot of an attached trace.
    pub fn get(&self, id: TraceId) -> Option<&SceneEntry> {
        self.entries.get(&id)
    }

    /// Iterates over attached traces in id order.
    pub fn entries(&self) -> impl Iterator<Item = (TraceId, &SceneEntry)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    /// Number of traces currently attached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of attached traces the renderer would draw.
    pub fn visible_count(&self) -> usize {
        self.entries.values().filter(|e| e.trace.is_visible()).count()
    }

    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_count
    }

    pub fn detach_count(&self) -> usize {
        self.detach_count
    }
}

impl TraceScene for MemoryScene {
    fn attach(&mut self, id: TraceId, kind: TraceKind, trace: &PolylineTrace) {
        self.attach_count += 1;
        self.entries.insert(
            id,
            SceneEntry {
                kind,
                trace: trace.clone(),
            },
        );
    }

    fn refresh(&mut self, id: TraceId, trace: &PolylineTrace) {
        self.refresh_count += 1;
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.trace = trace.clone();
        }
    }

    fn detach(&mut self, id: TraceId) {
        self.detach_count += 1;
        self.entries.remove(&id);
    }
}
