//! World interaction traits for the trace controller.

use nalgebra::{Isometry3, Point3};
use std::sync::Arc;

/// A simulated rigid body whose position can be sampled.
///
/// The trace controller never owns the body. It only reads the position
/// once per frame while collection is enabled.
///
/// # Implementations
///
/// - **Production**: wraps the physics engine's rigid body handle
/// - **Simulation**: `SimBody` in `bodytrace_sim`, moved by the harness
pub trait TrackedBody: Send + Sync {
    /// Returns the body's current position in its parent frame.
    fn local_position(&self) -> Point3<f64>;

    /// Returns the body's name (for logging).
    fn name(&self) -> &str;
}

/// Name-based lookup into the host's world.
///
/// This replaces the implicit global world pointer of a plugin host: the
/// controller is handed a lookup at setup time and resolves every name it
/// needs through it.
pub trait WorldLookup {
    /// Finds a rigid body by the name it was given in the scene description.
    fn rigid_body(&self, name: &str) -> Option<Arc<dyn TrackedBody>>;

    /// Returns the local transform of any named object in the scene.
    fn object_transform(&self, name: &str) -> Option<Isometry3<f64>>;
}
