//! BodyTrace Environment Abstraction Layer
//!
//! This crate provides the seams between the trace core and its host:
//! - World lookup (`rigid_body()`, `object_transform()`)
//! - Tracked body position queries
//! - Toggle hand-off from asynchronous channels to the frame thread
//!
//! # Core Concept: Injected Capabilities
//!
//! The trace controller never reaches for a global world or renderer. The
//! host hands it a [`WorldLookup`] at setup and the controller keeps only
//! the handles it resolved. Remote toggles travel through a
//! [`ToggleSender`] / [`ToggleReceiver`] pair and are applied on the next
//! frame.
//!
//! # Example
//!
//! ```ignore
//! use bodytrace_env::{toggle_queue, spawn_remote_bridge, ToggleCommand};
//!
//! let (sender, mut receiver) = toggle_queue(64);
//! spawn_remote_bridge(transport, sender);
//!
//! loop {
//!     for command in receiver.drain() {
//!         controller.apply(command);
//!     }
//!     controller.on_frame_tick();
//! }
//! ```

mod error;
mod queue;
mod remote;
mod types;
mod world;

pub use error::EnvError;
pub use queue::{toggle_queue, ToggleReceiver, ToggleSender};
pub use remote::{spawn_remote_bridge, LoopbackPublisher, LoopbackTransport, ToggleTransport};
pub use types::{RemoteToggle, ToggleCommand, COLLECT_TOPIC, VISIBLE_TOPIC};
pub use world::{TrackedBody, WorldLookup};
