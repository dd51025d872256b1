//! BodyTrace simulation harness
//!
//! Runs the trace plugin headless against a small kinematic world, the way
//! a simulator host would: one graphics update per frame, key presses and
//! remote messages delivered between frames, static trace files edited on
//! disk while the plugin is running.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ScenarioRunner                        │
//! │   timeline ──► KeyBindings ──► TracePlugin::handle       │
//! │   timeline ──► LoopbackPublisher ──► bridge task ──┐     │
//! │                                                    ▼     │
//! │   SimWorld::step ──► TracePlugin::graphics_update (drain)│
//! │                           │                              │
//! │                     HarnessScene                         │
//! │               (MemoryScene + RerunScene)                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use bodytrace_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42)
//!     .with_duration(2.0)
//!     .run(ScenarioId::StaticReload);
//! assert!(result.passed);
//! ```

mod exporter;
mod keys;
mod runner;
pub mod scenarios;
mod visualizer;
mod world;

pub use exporter::{ExportedTrace, TraceExport, TraceFrame};
pub use keys::{Key, KeyBindings, Modifiers};
pub use runner::{HarnessScene, ScenarioMetrics, ScenarioResult, ScenarioRunner, SimError, CUSTOM_RUN};
pub use visualizer::RerunScene;
pub use world::{Motion, SimBody, SimWorld};
