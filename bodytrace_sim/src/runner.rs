//! Scenario runner - drives the trace plugin through scripted frames.

use crate::exporter::{TraceExport, TraceFrame};
use crate::keys::KeyBindings;
use crate::scenarios::{
    ScenarioId, ScriptStep, ScriptedInput, INITIAL_STATIC_POINTS, STATIC_TRACE_FILE,
};
use crate::visualizer::RerunScene;
use crate::world::SimWorld;

use bodytrace_core::loader::parse_points;
use bodytrace_core::transform::apply;
use bodytrace_core::{
    MemoryScene, PolylineTrace, ReloadOutcome, TraceConfig, TraceError, TraceId, TraceKind,
    TracePlugin, TraceRegistry, TraceScene,
};
use bodytrace_env::{
    spawn_remote_bridge, LoopbackPublisher, LoopbackTransport, ToggleCommand, TrackedBody,
    WorldLookup,
};
use nalgebra::Point3;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

/// Name reported for runs driven by a user-supplied config.
pub const CUSTOM_RUN: &str = "custom";

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("plugin setup failed: {0}")]
    Setup(#[from] TraceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{scenario} needs {needed} ticks, duration only allows {got}")]
    TooShort {
        scenario: ScenarioId,
        needed: u64,
        got: u64,
    },

    #[error("invariant violated at tick {tick}: {reason}")]
    Invariant { tick: u64, reason: String },
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Key presses delivered (bound or not)
    pub key_presses: u64,

    /// Key presses with no binding
    pub unbound_keys: u64,

    /// Messages published on the remote transport
    pub remote_messages: u64,

    /// Static trace reloads, in order
    pub reloads: Vec<ReloadOutcome>,

    /// Dynamic traces created
    pub dynamic_traces: usize,

    /// Vertices across all dynamic traces
    pub dynamic_vertices: usize,

    /// Vertices in the static trace, if one exists
    pub static_vertices: Option<usize>,

    pub scene_attaches: usize,
    pub scene_refreshes: usize,
}

/// Scene used by the harness: an in-memory snapshot for checks and export,
/// mirrored into Rerun when visualization is on.
pub struct HarnessScene {
    pub memory: MemoryScene,
    pub rerun: RerunScene,
}

impl TraceScene for HarnessScene {
    fn attach(&mut self, id: TraceId, kind: TraceKind, trace: &PolylineTrace) {
        self.memory.attach(id, kind, trace);
        self.rerun.attach(id, kind, trace);
    }

    fn refresh(&mut self, id: TraceId, trace: &PolylineTrace) {
        self.memory.refresh(id, trace);
        self.rerun.refresh(id, trace);
    }

    fn detach(&mut self, id: TraceId) {
        self.memory.detach(id);
        self.rerun.detach(id);
    }
}

/// State of a finished run, before teardown.
struct Run {
    plugin: TracePlugin<HarnessScene>,
    world: SimWorld,
    work_dir: PathBuf,
    ticks: u64,
    metrics: ScenarioMetrics,
    export: Option<TraceExport>,
}

/// The loopback transport and the runtime its bridge task lives on.
struct RemoteLink {
    runtime: Runtime,
    publisher: LoopbackPublisher,
}

impl RemoteLink {
    /// Publishes and lets the bridge forward the message into the queue.
    fn publish(&self, topic: &str, value: bool) -> bool {
        self.runtime.block_on(async {
            let delivered = self.publisher.publish(topic, value).await;
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            delivered
        })
    }
}

/// Runs trace scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Duration in seconds
    duration_secs: f64,

    /// Std dev of body position jitter [m]
    jitter: f64,

    /// Directory for static trace files; a per-run temp dir if unset
    work_dir: Option<PathBuf>,

    bindings: KeyBindings,

    visualize: bool,
    export_path: Option<String>,

    /// Export a frame every N ticks
    export_interval: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick_rate_hz: 60,
            duration_secs: 2.0,
            jitter: 0.0,
            work_dir: None,
            bindings: KeyBindings::default(),
            visualize: false,
            export_path: None,
            export_interval: 10,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz.max(1);
        self
    }

    /// Sets the duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_jitter(mut self, std_dev: f64) -> Self {
        self.jitter = std_dev;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn with_visualization(mut self, enabled: bool) -> Self {
        self.visualize = enabled;
        self
    }

    /// Writes a JSON export of the run to `path`.
    pub fn with_export(mut self, path: impl Into<String>) -> Self {
        self.export_path = Some(path.into());
        self
    }

    fn target_ticks(&self) -> u64 {
        (self.duration_secs.max(0.0) * f64::from(self.tick_rate_hz)) as u64
    }

    fn dt(&self) -> f64 {
        1.0 / f64::from(self.tick_rate_hz)
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let outcome = self.prepare(scenario).and_then(|(config, work_dir)| {
            self.execute(scenario.name(), &config, &scenario.timeline(), work_dir)
        });
        match outcome {
            Ok(run) => {
                let verdict = verify(scenario, &run, self.jitter);
                self.finish(scenario.name(), run, verdict)
            }
            Err(e) => self.failed(scenario.name(), e),
        }
    }

    /// Runs a user-supplied config with no scripted input.
    ///
    /// Only the per-frame invariants are checked.
    pub fn run_config(&self, config: &TraceConfig) -> ScenarioResult {
        info!("Starting custom run (seed={})", self.seed);

        let work_dir = self.work_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        match self.execute(CUSTOM_RUN, config, &[], work_dir) {
            Ok(run) => self.finish(CUSTOM_RUN, run, Ok(())),
            Err(e) => self.failed(CUSTOM_RUN, e),
        }
    }

    /// Checks the duration and lays out the scenario's work directory.
    fn prepare(&self, scenario: ScenarioId) -> Result<(TraceConfig, PathBuf), SimError> {
        let got = self.target_ticks();
        let needed = scenario.min_ticks();
        if got < needed {
            return Err(SimError::TooShort {
                scenario,
                needed,
                got,
            });
        }

        let work_dir = match &self.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir().join(format!(
                "bodytrace-{}-{}-{}",
                scenario.name(),
                self.seed,
                std::process::id()
            )),
        };
        std::fs::create_dir_all(&work_dir)?;

        let config = scenario.config(&work_dir);
        if config.has_static_trace() {
            std::fs::write(work_dir.join(STATIC_TRACE_FILE), INITIAL_STATIC_POINTS)?;
        }
        Ok((config, work_dir))
    }

    fn execute(
        &self,
        name: &str,
        config: &TraceConfig,
        timeline: &[ScriptStep],
        work_dir: PathBuf,
    ) -> Result<Run, SimError> {
        let mut world = SimWorld::standard(self.seed);
        world.set_position_jitter(self.jitter);

        let rerun = if self.visualize {
            RerunScene::new("bodytrace_sim")
        } else {
            RerunScene::disabled()
        };
        let scene = HarnessScene {
            memory: MemoryScene::new(),
            rerun,
        };
        let mut plugin = TracePlugin::init(config, &world, scene)?;

        let remote = match plugin.toggle_sender() {
            Some(sender) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()?;
                let (publisher, transport) = LoopbackTransport::new(config.toggle_queue_capacity);
                {
                    let _guard = runtime.enter();
                    spawn_remote_bridge(Arc::new(transport), sender);
                }
                Some(RemoteLink { runtime, publisher })
            }
            None => None,
        };

        let mut metrics = ScenarioMetrics::default();
        let mut export = self.export_path.as_ref().map(|_| TraceExport::new(name, self.seed));
        let target_ticks = self.target_ticks();
        let dt = self.dt();
        let mut pending = timeline.iter().peekable();

        for tick in 0..target_ticks {
            while let Some(step) = pending.next_if(|step| step.tick == tick) {
                self.deliver(&step.input, &mut plugin, remote.as_ref(), &work_dir, &mut metrics)?;
            }

            world.step(dt);
            plugin.registry().scene().rerun.set_time(world.time());
            plugin.graphics_update();

            check_invariants(plugin.registry())
                .map_err(|reason| SimError::Invariant { tick, reason })?;

            if let Some(export) = export.as_mut() {
                if tick % self.export_interval == 0 {
                    export.add_frame(snapshot(plugin.registry(), world.time()));
                }
            }

            if tick % 60 == 0 {
                debug!(
                    "  t={:.2}s | collect={} | show={} | traces={}",
                    world.time(),
                    plugin.registry().collect_enabled(),
                    plugin.registry().show_enabled(),
                    plugin.registry().dynamic_count()
                );
            }
        }

        // Shuts down the bridge task with its runtime.
        drop(remote);

        let registry = plugin.registry();
        metrics.dynamic_traces = registry.dynamic_count();
        metrics.dynamic_vertices = registry.dynamic_traces().map(|t| t.vertex_count()).sum();
        metrics.static_vertices = registry.static_trace().map(|t| t.vertex_count());
        metrics.scene_attaches = registry.scene().memory.attach_count();
        metrics.scene_refreshes = registry.scene().memory.refresh_count();

        Ok(Run {
            plugin,
            world,
            work_dir,
            ticks: target_ticks,
            metrics,
            export,
        })
    }

    fn deliver(
        &self,
        input: &ScriptedInput,
        plugin: &mut TracePlugin<HarnessScene>,
        remote: Option<&RemoteLink>,
        work_dir: &Path,
        metrics: &mut ScenarioMetrics,
    ) -> Result<(), SimError> {
        match input {
            ScriptedInput::KeyPress { key, modifiers } => {
                metrics.key_presses += 1;
                match self.bindings.lookup(*key, *modifiers) {
                    Some(ToggleCommand::ReloadStatic) => {
                        let outcome = plugin.registry_mut().reload_static_trace();
                        metrics.reloads.push(outcome);
                    }
                    Some(command) => plugin.handle(command),
                    None => {
                        debug!("No binding for {:?} {:?}", key, modifiers);
                        metrics.unbound_keys += 1;
                    }
                }
            }
            ScriptedInput::Remote { topic, value } => {
                metrics.remote_messages += 1;
                match remote {
                    Some(link) => {
                        if !link.publish(topic, *value) {
                            warn!("Remote transport closed, dropped message on {}", topic);
                        }
                    }
                    None => warn!("Remote toggles disabled, dropped message on {}", topic),
                }
            }
            ScriptedInput::WriteStaticFile(contents) => {
                std::fs::write(work_dir.join(STATIC_TRACE_FILE), contents)?;
            }
            ScriptedInput::RemoveStaticFile => {
                std::fs::remove_file(work_dir.join(STATIC_TRACE_FILE))?;
            }
        }
        Ok(())
    }

    fn finish(&self, name: &str, run: Run, verdict: Result<(), String>) -> ScenarioResult {
        let Run {
            plugin,
            world,
            ticks,
            metrics,
            mut export,
            ..
        } = run;

        let passed = verdict.is_ok();
        let failure_reason = verdict.err();
        if let Some(reason) = &failure_reason {
            warn!("Scenario {} failed: {}", name, reason);
        }

        if let (Some(export), Some(path)) = (export.as_mut(), self.export_path.as_ref()) {
            export.capture_traces(&plugin.registry().scene().memory);
            export.finalize(passed, failure_reason.clone());
            match export.write_to_file(path) {
                Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
                Err(e) => warn!("Failed to write export: {:?}", e),
            }
        }

        let scene = plugin.close();
        debug!("Scene left with {} traces after close", scene.memory.len());

        ScenarioResult {
            scenario: name.to_string(),
            seed: self.seed,
            passed,
            total_ticks: ticks,
            final_time_secs: world.time(),
            failure_reason,
            metrics,
        }
    }

    fn failed(&self, name: &str, error: SimError) -> ScenarioResult {
        warn!("Scenario {} aborted: {}", name, error);
        ScenarioResult {
            scenario: name.to_string(),
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
        }
    }
}

fn snapshot(registry: &TraceRegistry<HarnessScene>, time_sec: f64) -> TraceFrame {
    TraceFrame {
        time_sec,
        collect_enabled: registry.collect_enabled(),
        show_enabled: registry.show_enabled(),
        dynamic_traces: registry.dynamic_count(),
        active_vertices: registry.active_trace().map(|t| t.vertex_count()),
    }
}

/// Checks that hold after every frame, whatever the script did.
fn check_invariants(registry: &TraceRegistry<HarnessScene>) -> Result<(), String> {
    let scene = &registry.scene().memory;
    let in_sync = |id: TraceId, trace: &PolylineTrace| {
        scene.get(id).is_some_and(|entry| entry.trace == *trace)
    };

    for (id, trace) in registry.dynamic_trace_ids().zip(registry.dynamic_traces()) {
        if !trace.check_invariant() {
            return Err(format!("{} breaks the segment invariant", id));
        }
        if trace.is_visible() != registry.show_enabled() {
            return Err(format!("{} visibility differs from the show flag", id));
        }
        if !in_sync(id, trace) {
            return Err(format!("{} out of sync with the scene", id));
        }
    }

    if let (Some(id), Some(trace)) = (registry.static_trace_id(), registry.static_trace()) {
        if !trace.check_invariant() {
            return Err(format!("static {} breaks the segment invariant", id));
        }
        if !in_sync(id, trace) {
            return Err(format!("static {} out of sync with the scene", id));
        }
    }
    Ok(())
}

fn expect<T: PartialEq + std::fmt::Debug>(what: &str, got: T, want: T) -> Result<(), String> {
    if got == want {
        Ok(())
    } else {
        Err(format!("{}: expected {:?}, got {:?}", what, want, got))
    }
}

/// Scenario-specific checks on the final state.
fn verify(scenario: ScenarioId, run: &Run, jitter: f64) -> Result<(), String> {
    let registry = run.plugin.registry();
    let traces: Vec<&PolylineTrace> = registry.dynamic_traces().collect();
    let n = run.ticks as usize;

    match scenario {
        ScenarioId::Basic => {
            expect("dynamic traces", traces.len(), 1)?;
            expect("vertices", traces[0].vertex_count(), 1 + n - 10)?;
            expect("visible", traces[0].is_visible(), true)?;
            expect("static trace", registry.static_trace().is_some(), false)?;

            let tolerance = 1e-9 + 6.0 * jitter;
            let center = Point3::new(0.0, 0.0, 0.5);
            for p in traces[0].vertices() {
                let r = ((p.x - center.x).powi(2) + (p.y - center.y).powi(2)).sqrt();
                if (r - 0.1).abs() > tolerance {
                    return Err(format!("vertex {:?} is off the tip's orbit", p));
                }
            }
        }
        ScenarioId::ToggleCycle => {
            expect("dynamic traces", traces.len(), 2)?;
            expect("first trace vertices", traces[0].vertex_count(), 16)?;
            expect("second trace vertices", traces[1].vertex_count(), 11)?;
            expect("collect", registry.collect_enabled(), false)?;
            expect("show", registry.show_enabled(), true)?;
            expect("unbound keys", run.metrics.unbound_keys, 1)?;
        }
        ScenarioId::StaticReload => {
            expect(
                "reloads",
                run.metrics.reloads.as_slice(),
                &[
                    ReloadOutcome::Rebuilt { vertices: 5 },
                    ReloadOutcome::Kept,
                    ReloadOutcome::Cleared,
                    ReloadOutcome::Rebuilt { vertices: 4 },
                ][..],
            )?;
            expect("dynamic traces", traces.len(), 0)?;
            expect("scene attaches", run.metrics.scene_attaches, 1)?;

            let trace = registry
                .static_trace()
                .ok_or_else(|| "static trace missing".to_string())?;
            expect("static visible", trace.is_visible(), true)?;

            let text = std::fs::read_to_string(run.work_dir.join(STATIC_TRACE_FILE))
                .map_err(|e| e.to_string())?;
            let points = parse_points(&text, STATIC_TRACE_FILE).map_err(|e| e.to_string())?;
            let frame = run
                .world
                .object_transform("phantom")
                .ok_or_else(|| "phantom missing".to_string())?;
            let want = apply(&frame, &points);
            for (got, want) in trace.vertices().iter().zip(&want) {
                if (got - want).norm() > 1e-9 {
                    return Err(format!("static vertex {:?}, expected {:?}", got, want));
                }
            }
            expect("static vertices", trace.vertex_count(), want.len())?;
        }
        ScenarioId::Remote => {
            expect("dynamic traces", traces.len(), 2)?;
            expect("first trace vertices", traces[0].vertex_count(), 26)?;
            expect("second trace vertices", traces[1].vertex_count(), 1 + n - 40)?;
            expect("collect", registry.collect_enabled(), true)?;
            expect("show", registry.show_enabled(), true)?;
            expect("static vertices", run.metrics.static_vertices, Some(3))?;

            let needle = run
                .world
                .body("needle")
                .ok_or_else(|| "needle missing".to_string())?;
            let last = traces[1].last_vertex().copied();
            expect("last sample", last, Some(needle.local_position()))?;
        }
    }
    Ok(())
}
