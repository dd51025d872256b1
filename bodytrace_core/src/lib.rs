//! BodyTrace Core - Polyline traces for bodies in a running 3D simulation
//!
//! Two flavors of trace:
//! 1. **Dynamic traces**: grown one vertex per frame from a tracked body's
//!    position while collection is enabled
//! 2. **Static trace**: loaded once from an `x,y,z` point file, optionally
//!    re-expressed in another object's frame, rebuilt on demand
//!
//! Geometry lives in [`PolylineTrace`]; the [`TraceRegistry`] owns every
//! trace, runs the collect/show state machine and tells the host's
//! [`TraceScene`] what to draw.

pub mod config;
pub mod error;
pub mod loader;
pub mod plugin;
pub mod polyline;
pub mod registry;
pub mod scene;
pub mod transform;

// Re-export key types for convenience
pub use config::TraceConfig;
pub use error::{TraceError, TraceResult};
pub use plugin::TracePlugin;
pub use polyline::{PolylineTrace, TraceColor, TraceStyle};
pub use registry::{ReloadOutcome, TraceRegistry};
pub use scene::{MemoryScene, SceneEntry, TraceId, TraceKind, TraceScene};
