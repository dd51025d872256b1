//! The trace registry: owns every trace and runs the collect/show state
//! machine.
//!
//! # State
//!
//! Two independent flags, both off at start:
//! - **collect**: append the tracked body's position to the newest dynamic
//!   trace on every (sampled) frame. Arming it starts a fresh trace.
//! - **show**: visibility of all dynamic traces. The static trace is always
//!   shown once loaded.
//!
//! # Frame contract
//!
//! Nothing here returns an error across the frame boundary. Toggles and
//! reloads recover locally and report through `tracing`.

use crate::config::TraceConfig;
use crate::error::{TraceError, TraceResult};
use crate::loader::load_points;
use crate::polyline::{PolylineTrace, TraceStyle};
use crate::scene::{TraceId, TraceKind, TraceScene};
use crate::transform::apply_in_place;
use bodytrace_env::{ToggleCommand, TrackedBody, WorldLookup};
use nalgebra::Isometry3;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a static-trace (re)load did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The static trace now holds the file's points
    Rebuilt { vertices: usize },

    /// No readable source: the static trace (if any) was emptied and hidden
    Cleared,

    /// The file was unusable; the static trace was left as it was
    Kept,
}

/// Owner of the static trace and the dynamic body traces.
pub struct TraceRegistry<S: TraceScene> {
    scene: S,

    dynamic_style: TraceStyle,
    static_style: TraceStyle,

    static_trace: Option<(TraceId, PolylineTrace)>,
    static_source: Option<PathBuf>,
    static_offset: Isometry3<f64>,

    /// One entry per collection arm, oldest first. Never shrinks.
    dynamic_traces: Vec<(TraceId, PolylineTrace)>,
    tracked_body: Option<Arc<dyn TrackedBody>>,

    collect_enabled: bool,
    show_enabled: bool,

    sample_interval: u32,
    /// Eligible ticks since the active trace was armed
    ticks_since_arm: u64,

    next_id: u64,
}

impl<S: TraceScene> TraceRegistry<S> {
    /// Creates an empty registry drawing into `scene`.
    pub fn new(scene: S) -> Self {
        Self {
            scene,
            dynamic_style: TraceStyle::dynamic(),
            static_style: TraceStyle::static_trace(),
            static_trace: None,
            static_source: None,
            static_offset: Isometry3::identity(),
            dynamic_traces: Vec::new(),
            tracked_body: None,
            collect_enabled: false,
            show_enabled: false,
            sample_interval: 1,
            ticks_since_arm: 0,
            next_id: 0,
        }
    }

    /// Sets the styles applied to newly created traces.
    pub fn with_styles(mut self, dynamic_style: TraceStyle, static_style: TraceStyle) -> Self {
        self.dynamic_style = dynamic_style;
        self.static_style = static_style;
        self
    }

    /// Samples the body only every `interval`-th frame (0 is treated as 1).
    pub fn with_sample_interval(mut self, interval: u32) -> Self {
        self.sample_interval = interval.max(1);
        self
    }

    /// Builds a registry from setup parameters.
    ///
    /// # Errors
    /// * `TraceError::NotFound` - the static trace's reference object or the
    ///   body to trace does not exist in `world`
    /// * `TraceError::InvalidConfig` - out-of-range config values
    ///
    /// A static trace file that is missing or malformed is not an error: it
    /// is reported and setup continues without a static trace.
    pub fn setup(config: &TraceConfig, world: &dyn WorldLookup, scene: S) -> TraceResult<Self> {
        config.validate()?;

        let mut registry = Self::new(scene)
            .with_styles(config.dynamic_style, config.static_style)
            .with_sample_interval(config.sample_interval);

        if config.has_static_trace() {
            let offset = if config.static_trace_reference.is_empty() {
                Isometry3::identity()
            } else {
                world
                    .object_transform(&config.static_trace_reference)
                    .ok_or_else(|| {
                        TraceError::not_found(format!(
                            "object '{}' (static trace reference)",
                            config.static_trace_reference
                        ))
                    })?
            };
            registry.set_static_source(Some(PathBuf::from(&config.static_trace_path)), offset);
            registry.reload_static_trace();
        }

        if config.traces_body() {
            let body = world.rigid_body(&config.body_to_trace).ok_or_else(|| {
                TraceError::not_found(format!("rigid body '{}'", config.body_to_trace))
            })?;
            info!("Tracing body: {}", body.name());
            registry.set_tracked_body(body);
        }

        if config.collect_on_start {
            registry.set_collect(true);
        }

        Ok(registry)
    }

    // =========================================================================
    // Toggles
    // =========================================================================

    /// Flips the collect flag. Arming it with a body bound starts a new trace,
    /// seeded with the body's current position and shown per the show flag.
    pub fn toggle_collect(&mut self) {
        self.collect_enabled = !self.collect_enabled;
        if self.collect_enabled && self.tracked_body.is_some() {
            self.arm_new_trace();
        }
        info!("Collect body trace enabled: {}", self.collect_enabled);
    }

    /// Flips the show flag and applies it to every dynamic trace.
    pub fn toggle_show(&mut self) {
        self.show_enabled = !self.show_enabled;
        for (id, trace) in &mut self.dynamic_traces {
            trace.set_visible(self.show_enabled);
            self.scene.refresh(*id, trace);
        }
        info!("Show body trace enabled: {}", self.show_enabled);
    }

    /// Drives the collect flag to `enabled`; no-op if already there.
    pub fn set_collect(&mut self, enabled: bool) {
        if self.collect_enabled != enabled {
            self.toggle_collect();
        }
    }

    /// Drives the show flag to `enabled`; no-op if already there.
    pub fn set_show(&mut self, enabled: bool) {
        if self.show_enabled != enabled {
            self.toggle_show();
        }
    }

    /// Applies a keyboard or remote command.
    pub fn apply(&mut self, command: ToggleCommand) {
        debug!("Applying {}", command);
        match command {
            ToggleCommand::ToggleCollect => self.toggle_collect(),
            ToggleCommand::ToggleShow => self.toggle_show(),
            ToggleCommand::SetCollect(enabled) => self.set_collect(enabled),
            ToggleCommand::SetShow(enabled) => self.set_show(enabled),
            ToggleCommand::ReloadStatic => {
                self.reload_static_trace();
            }
        }
    }

    // =========================================================================
    // Dynamic traces
    // =========================================================================

    /// Binds the body sampled by [`Self::on_frame_tick`]. Does not create a
    /// trace; that only happens when collection is armed.
    pub fn set_tracked_body(&mut self, body: Arc<dyn TrackedBody>) {
        self.tracked_body = Some(body);
    }

    /// Appends the tracked body's position to the newest dynamic trace.
    ///
    /// Returns true if a vertex was added.
    pub fn on_frame_tick(&mut self) -> bool {
        if !self.collect_enabled {
            return false;
        }
        let Some(body) = &self.tracked_body else {
            return false;
        };
        let Some((id, trace)) = self.dynamic_traces.last_mut() else {
            return false;
        };

        self.ticks_since_arm += 1;
        if self.ticks_since_arm % u64::from(self.sample_interval) != 0 {
            return false;
        }

        trace.append_vertex(body.local_position());
        self.scene.refresh(*id, trace);
        true
    }

    fn arm_new_trace(&mut self) {
        let Some(body) = &self.tracked_body else {
            return;
        };
        let mut trace = PolylineTrace::seeded(body.local_position());
        trace.apply_style(&self.dynamic_style);
        trace.set_visible(self.show_enabled);

        let id = self.allocate_id();
        self.scene.attach(id, TraceKind::Dynamic, &trace);
        self.dynamic_traces.push((id, trace));
        self.ticks_since_arm = 0;
        debug!("Started dynamic trace {} ({} total)", id, self.dynamic_traces.len());
    }

    // =========================================================================
    // Static trace
    // =========================================================================

    /// Sets the file and offset the static trace is (re)built from.
    pub fn set_static_source(&mut self, path: Option<PathBuf>, offset: Isometry3<f64>) {
        self.static_source = path;
        self.static_offset = offset;
    }

    /// Clears and rebuilds the static trace from its source file.
    ///
    /// - readable file with points: trace rebuilt (created on first success)
    /// - no source / missing file: trace emptied and hidden
    /// - malformed or empty file: trace left untouched
    pub fn reload_static_trace(&mut self) -> ReloadOutcome {
        let Some(path) = self.static_source.clone() else {
            warn!("No static trace source configured, nothing to load");
            return self.clear_static_trace();
        };

        let mut points = match load_points(&path) {
            Ok(points) => points,
            Err(TraceError::NotFound(what)) => {
                warn!("Could not find file: {} so no static trace was added", what);
                return self.clear_static_trace();
            }
            Err(e) => {
                warn!("Static trace not loaded: {}", e);
                return ReloadOutcome::Kept;
            }
        };
        if points.is_empty() {
            warn!("Static trace not loaded: {}: {}", path.display(), TraceError::EmptyInput);
            return ReloadOutcome::Kept;
        }
        apply_in_place(&self.static_offset, &mut points);

        if let Some((id, trace)) = self.static_trace.as_mut() {
            if let Err(e) = trace.rebuild_from(&points) {
                warn!("Static trace not rebuilt: {}", e);
                return ReloadOutcome::Kept;
            }
            trace.set_visible(true);
            self.scene.refresh(*id, trace);
        } else {
            let mut trace = match PolylineTrace::from_points(&points) {
                Ok(trace) => trace,
                Err(e) => {
                    warn!("Static trace not built: {}", e);
                    return ReloadOutcome::Kept;
                }
            };
            trace.apply_style(&self.static_style);
            let id = self.allocate_id();
            self.scene.attach(id, TraceKind::Static, &trace);
            self.static_trace = Some((id, trace));
        }

        info!("Static trace loaded from {} ({} points)", path.display(), points.len());
        ReloadOutcome::Rebuilt {
            vertices: points.len(),
        }
    }

    fn clear_static_trace(&mut self) -> ReloadOutcome {
        if let Some((id, trace)) = self.static_trace.as_mut() {
            trace.clear();
            trace.set_visible(false);
            self.scene.refresh(*id, trace);
        }
        ReloadOutcome::Cleared
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn collect_enabled(&self) -> bool {
        self.collect_enabled
    }

    pub fn show_enabled(&self) -> bool {
        self.show_enabled
    }

    pub fn has_tracked_body(&self) -> bool {
        self.tracked_body.is_some()
    }

    pub fn static_trace(&self) -> Option<&PolylineTrace> {
        self.static_trace.as_ref().map(|(_, trace)| trace)
    }

    pub fn static_trace_id(&self) -> Option<TraceId> {
        self.static_trace.as_ref().map(|(id, _)| *id)
    }

    /// Dynamic traces, oldest first.
    pub fn dynamic_traces(&self) -> impl Iterator<Item = &PolylineTrace> {
        self.dynamic_traces.iter().map(|(_, trace)| trace)
    }

    pub fn dynamic_trace_ids(&self) -> impl Iterator<Item = TraceId> + '_ {
        self.dynamic_traces.iter().map(|(id, _)| *id)
    }

    pub fn dynamic_count(&self) -> usize {
        self.dynamic_traces.len()
    }

    /// The trace currently receiving samples.
    pub fn active_trace(&self) -> Option<&PolylineTrace> {
        self.dynamic_traces.last().map(|(_, trace)| trace)
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Detaches every trace and hands the scene back.
    pub fn shutdown(mut self) -> S {
        if let Some((id, _)) = self.static_trace.take() {
            self.scene.detach(id);
        }
        for (id, _) in self.dynamic_traces.drain(..) {
            self.scene.detach(id);
        }
        self.scene
    }

    fn allocate_id(&mut self) -> TraceId {
        let id = TraceId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scene::MemoryScene;
    use nalgebra::Point3;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    pub(crate) struct TestBody {
        name: String,
        position: Mutex<Point3<f64>>,
    }

    impl TestBody {
        pub(crate) fn new(name: &str, position: Point3<f64>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                position: Mutex::new(position),
            })
        }

        pub(crate) fn move_to(&self, position: Point3<f64>) {
            *self.position.lock().unwrap() = position;
        }
    }

    impl TrackedBody for TestBody {
        fn local_position(&self) -> Point3<f64> {
            *self.position.lock().unwrap()
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    #[derive(Default)]
    pub(crate) struct TestWorld {
        pub(crate) bodies: HashMap<String, Arc<TestBody>>,
        pub(crate) objects: HashMap<String, Isometry3<f64>>,
    }

    impl WorldLookup for TestWorld {
        fn rigid_body(&self, name: &str) -> Option<Arc<dyn TrackedBody>> {
            self.bodies
                .get(name)
                .map(|b| b.clone() as Arc<dyn TrackedBody>)
        }

        fn object_transform(&self, name: &str) -> Option<Isometry3<f64>> {
            self.objects.get(name).copied()
        }
    }

    fn write_points(dir: &Path, name: &str, text: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path.display().to_string()
    }

    fn static_config(path: &str) -> TraceConfig {
        TraceConfig {
            static_trace_path: path.to_string(),
            ..Default::default()
        }
    }

    fn body_registry(body: &Arc<TestBody>) -> TraceRegistry<MemoryScene> {
        let mut registry = TraceRegistry::new(MemoryScene::new());
        registry.set_tracked_body(body.clone());
        registry
    }

    #[test]
    fn test_empty_config_sets_up_nothing() {
        let registry =
            TraceRegistry::setup(&TraceConfig::default(), &TestWorld::default(), MemoryScene::new())
                .unwrap();
        assert!(!registry.collect_enabled());
        assert!(!registry.show_enabled());
        assert!(registry.static_trace().is_none());
        assert_eq!(registry.dynamic_count(), 0);
        assert!(registry.scene().is_empty());
    }

    #[test]
    fn test_static_trace_with_identity_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n1,1,0\n");

        let registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();

        let trace = registry.static_trace().unwrap();
        assert_eq!(trace.vertex_count(), 3);
        assert_eq!(trace.segments(), &[(0, 1), (1, 2)]);
        assert!(trace.is_visible());

        let id = registry.static_trace_id().unwrap();
        assert_eq!(registry.scene().get(id).unwrap().kind, TraceKind::Static);
    }

    #[test]
    fn test_static_trace_relative_to_reference_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n1,1,0\n");
        let mut world = TestWorld::default();
        world
            .objects
            .insert("phantom".into(), Isometry3::translation(10.0, 0.0, 0.0));

        let config = TraceConfig {
            static_trace_reference: "phantom".into(),
            ..static_config(&path)
        };
        let registry = TraceRegistry::setup(&config, &world, MemoryScene::new()).unwrap();

        assert_eq!(
            registry.static_trace().unwrap().vertices(),
            &[
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(11.0, 0.0, 0.0),
                Point3::new(11.0, 1.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_missing_reference_object_fails_setup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n");
        let config = TraceConfig {
            static_trace_reference: "nowhere".into(),
            ..static_config(&path)
        };

        let result = TraceRegistry::setup(&config, &TestWorld::default(), MemoryScene::new());
        assert!(matches!(result, Err(TraceError::NotFound(_))));
    }

    #[test]
    fn test_missing_body_fails_setup() {
        let config = TraceConfig {
            body_to_trace: "ghost".into(),
            ..Default::default()
        };
        let result = TraceRegistry::setup(&config, &TestWorld::default(), MemoryScene::new());
        assert!(matches!(result, Err(TraceError::NotFound(_))));
    }

    #[test]
    fn test_missing_static_file_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = TestWorld::default();
        world
            .bodies
            .insert("tip".into(), TestBody::new("tip", Point3::origin()));
        let config = TraceConfig {
            body_to_trace: "tip".into(),
            collect_on_start: true,
            ..static_config(&dir.path().join("absent.csv").display().to_string())
        };

        let registry = TraceRegistry::setup(&config, &world, MemoryScene::new()).unwrap();

        assert!(registry.static_trace().is_none());
        assert_eq!(registry.dynamic_count(), 1);
        assert!(registry.collect_enabled());
    }

    #[test]
    fn test_collect_on_start_seeds_first_trace() {
        let mut world = TestWorld::default();
        world.bodies.insert(
            "tip".into(),
            TestBody::new("tip", Point3::new(0.5, 0.5, 0.5)),
        );
        let config = TraceConfig {
            body_to_trace: "tip".into(),
            collect_on_start: true,
            ..Default::default()
        };

        let registry = TraceRegistry::setup(&config, &world, MemoryScene::new()).unwrap();
        assert_eq!(
            registry.active_trace().unwrap().vertices(),
            &[Point3::new(0.5, 0.5, 0.5)]
        );
    }

    #[test]
    fn test_setting_body_does_not_create_trace() {
        let body = TestBody::new("tip", Point3::origin());
        let registry = body_registry(&body);
        assert!(registry.has_tracked_body());
        assert_eq!(registry.dynamic_count(), 0);
    }

    #[test]
    fn test_arm_then_three_ticks() {
        let body = TestBody::new("tip", Point3::new(0.0, 0.0, 0.0));
        let mut registry = body_registry(&body);

        registry.toggle_collect();
        assert_eq!(registry.dynamic_count(), 1);
        assert_eq!(
            registry.active_trace().unwrap().vertices(),
            &[Point3::new(0.0, 0.0, 0.0)]
        );

        for i in 1..=3 {
            body.move_to(Point3::new(i as f64, 0.0, 0.0));
            assert!(registry.on_frame_tick());
        }

        let trace = registry.active_trace().unwrap();
        assert_eq!(registry.dynamic_count(), 1);
        assert_eq!(trace.vertex_count(), 4);
        assert_eq!(trace.segments(), &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(trace.last_vertex(), Some(&Point3::new(3.0, 0.0, 0.0)));

        let id = registry.dynamic_trace_ids().next().unwrap();
        assert_eq!(registry.scene().get(id).unwrap().trace.vertex_count(), 4);
    }

    #[test]
    fn test_tick_is_noop_when_not_collecting() {
        let body = TestBody::new("tip", Point3::origin());
        let mut registry = body_registry(&body);
        assert!(!registry.on_frame_tick());

        registry.toggle_collect();
        registry.toggle_collect();
        assert!(!registry.on_frame_tick());
        assert_eq!(registry.active_trace().unwrap().vertex_count(), 1);
    }

    #[test]
    fn test_collect_without_body_creates_nothing() {
        let mut registry = TraceRegistry::new(MemoryScene::new());
        registry.toggle_collect();
        assert!(registry.collect_enabled());
        assert_eq!(registry.dynamic_count(), 0);
        assert!(!registry.on_frame_tick());
    }

    #[test]
    fn test_rearming_starts_a_fresh_trace() {
        let body = TestBody::new("tip", Point3::origin());
        let mut registry = body_registry(&body);

        registry.toggle_collect();
        body.move_to(Point3::new(1.0, 0.0, 0.0));
        registry.on_frame_tick();
        registry.toggle_collect();

        body.move_to(Point3::new(5.0, 5.0, 5.0));
        registry.toggle_collect();
        registry.on_frame_tick();

        let traces: Vec<&PolylineTrace> = registry.dynamic_traces().collect();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].vertex_count(), 2);
        assert_eq!(traces[1].vertices()[0], Point3::new(5.0, 5.0, 5.0));
        assert_eq!(traces[1].vertex_count(), 2);
        assert_eq!(registry.scene().len(), 2);
    }

    #[test]
    fn test_set_collect_is_idempotent() {
        let body = TestBody::new("tip", Point3::origin());
        let mut registry = body_registry(&body);

        registry.set_collect(true);
        registry.set_collect(true);
        assert_eq!(registry.dynamic_count(), 1);

        registry.set_collect(false);
        registry.set_collect(false);
        assert!(!registry.collect_enabled());
    }

    #[test]
    fn test_show_toggle_twice_restores_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n");
        let body = TestBody::new("tip", Point3::origin());
        let mut world = TestWorld::default();
        world.bodies.insert("tip".into(), body.clone());
        let config = TraceConfig {
            body_to_trace: "tip".into(),
            ..static_config(&path)
        };
        let mut registry = TraceRegistry::setup(&config, &world, MemoryScene::new()).unwrap();

        registry.toggle_collect();
        registry.toggle_collect();
        registry.toggle_collect();
        let before: Vec<bool> = registry.dynamic_traces().map(|t| t.is_visible()).collect();

        registry.toggle_show();
        assert!(registry.show_enabled());
        registry.toggle_show();

        assert!(!registry.show_enabled());
        let after: Vec<bool> = registry.dynamic_traces().map(|t| t.is_visible()).collect();
        assert_eq!(before, after);
        assert!(registry.static_trace().unwrap().is_visible());
    }

    #[test]
    fn test_show_flag_hides_dynamic_traces_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n");
        let body = TestBody::new("tip", Point3::origin());
        let mut registry = TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new()).unwrap();
        registry.set_tracked_body(body);
        registry.toggle_collect();

        registry.set_show(true);
        registry.set_show(false);

        assert!(registry.dynamic_traces().all(|t| !t.is_visible()));
        assert!(registry.static_trace().unwrap().is_visible());
        assert_eq!(registry.scene().visible_count(), 1);
    }

    #[test]
    fn test_reload_twice_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,2,3\n4,5,6\n");
        let mut world = TestWorld::default();
        world.objects.insert(
            "frame".into(),
            Isometry3::new(
                nalgebra::Vector3::new(1.0, -1.0, 0.5),
                nalgebra::Vector3::new(0.0, 0.0, 0.3),
            ),
        );
        let config = TraceConfig {
            static_trace_reference: "frame".into(),
            ..static_config(&path)
        };
        let mut registry = TraceRegistry::setup(&config, &world, MemoryScene::new()).unwrap();
        let id = registry.static_trace_id();

        assert_eq!(
            registry.reload_static_trace(),
            ReloadOutcome::Rebuilt { vertices: 3 }
        );
        let first = registry.static_trace().unwrap().vertices().to_vec();
        registry.reload_static_trace();
        let second = registry.static_trace().unwrap().vertices().to_vec();

        assert_eq!(first, second);
        assert_eq!(registry.static_trace().unwrap().segments(), &[(0, 1), (1, 2)]);
        assert_eq!(registry.static_trace_id(), id);
        assert_eq!(registry.scene().attach_count(), 1);
    }

    #[test]
    fn test_reload_with_malformed_file_keeps_prior_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n");
        let mut registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();
        let before = registry.static_trace().unwrap().clone();

        std::fs::write(&path, "0,0,0\n1,2\n").unwrap();
        assert_eq!(registry.reload_static_trace(), ReloadOutcome::Kept);
        assert_eq!(registry.static_trace(), Some(&before));
    }

    #[test]
    fn test_reload_with_non_utf8_file_keeps_prior_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n");
        let mut registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();
        let before = registry.static_trace().unwrap().clone();

        std::fs::write(&path, b"0,0,0\n1,0,\xff\n").unwrap();
        assert_eq!(registry.reload_static_trace(), ReloadOutcome::Kept);
        assert_eq!(registry.static_trace(), Some(&before));
        assert!(registry.static_trace().unwrap().is_visible());
    }

    #[test]
    fn test_malformed_file_at_setup_gives_no_static_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "1,2\n");
        let registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();
        assert!(registry.static_trace().is_none());
        assert!(registry.scene().is_empty());
    }

    #[test]
    fn test_reload_with_empty_file_keeps_prior_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n");
        let mut registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();

        std::fs::write(&path, "\n\n").unwrap();
        assert_eq!(registry.reload_static_trace(), ReloadOutcome::Kept);
        assert_eq!(registry.static_trace().unwrap().vertex_count(), 2);
    }

    #[test]
    fn test_reload_after_file_removed_clears_and_hides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n");
        let mut registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();

        std::fs::remove_file(&path).unwrap();
        assert_eq!(registry.reload_static_trace(), ReloadOutcome::Cleared);

        let trace = registry.static_trace().unwrap();
        assert!(trace.is_empty());
        assert!(!trace.is_visible());
    }

    #[test]
    fn test_reload_picks_up_file_created_after_setup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.csv").display().to_string();
        let mut registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();
        assert!(registry.static_trace().is_none());

        std::fs::write(&path, "0,0,0\n0,0,1\n").unwrap();
        registry.apply(ToggleCommand::ReloadStatic);

        assert_eq!(registry.static_trace().unwrap().vertex_count(), 2);
        assert_eq!(registry.scene().len(), 1);
    }

    #[test]
    fn test_reload_without_source_is_cleared() {
        let mut registry = TraceRegistry::new(MemoryScene::new());
        assert_eq!(registry.reload_static_trace(), ReloadOutcome::Cleared);
        assert!(registry.static_trace().is_none());
    }

    #[test]
    fn test_reload_does_not_touch_dynamic_traces() {
        let dir = tempfile::tempdir().unwrap();
        let body = TestBody::new("tip", Point3::origin());
        let mut registry = body_registry(&body);
        registry.set_static_source(Some(dir.path().join("absent.csv")), Isometry3::identity());
        registry.toggle_collect();
        body.move_to(Point3::new(0.0, 1.0, 0.0));
        registry.on_frame_tick();

        assert_eq!(registry.reload_static_trace(), ReloadOutcome::Cleared);
        assert_eq!(registry.active_trace().unwrap().vertex_count(), 2);
    }

    #[test]
    fn test_sample_interval_throttles_ticks() {
        let body = TestBody::new("tip", Point3::origin());
        let mut registry = TraceRegistry::new(MemoryScene::new()).with_sample_interval(3);
        registry.set_tracked_body(body.clone());
        registry.toggle_collect();

        let sampled: Vec<bool> = (0..6).map(|_| registry.on_frame_tick()).collect();
        assert_eq!(sampled, vec![false, false, true, false, false, true]);
        assert_eq!(registry.active_trace().unwrap().vertex_count(), 3);
    }

    #[test]
    fn test_new_traces_use_configured_style() {
        let body = TestBody::new("tip", Point3::origin());
        let style = TraceStyle {
            line_width: 7.0,
            ..TraceStyle::dynamic()
        };
        let mut registry = TraceRegistry::new(MemoryScene::new())
            .with_styles(style, TraceStyle::static_trace());
        registry.set_tracked_body(body);
        registry.toggle_collect();

        assert_eq!(registry.active_trace().unwrap().line_width(), 7.0);
    }

    #[test]
    fn test_apply_dispatches_commands() {
        let body = TestBody::new("tip", Point3::origin());
        let mut registry = body_registry(&body);

        registry.apply(ToggleCommand::SetCollect(true));
        registry.apply(ToggleCommand::SetCollect(true));
        registry.apply(ToggleCommand::ToggleShow);
        registry.apply(ToggleCommand::SetShow(true));

        assert!(registry.collect_enabled());
        assert!(registry.show_enabled());
        assert_eq!(registry.dynamic_count(), 1);
    }

    #[test]
    fn test_shutdown_detaches_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), "goal.csv", "0,0,0\n1,0,0\n");
        let body = TestBody::new("tip", Point3::origin());
        let mut registry =
            TraceRegistry::setup(&static_config(&path), &TestWorld::default(), MemoryScene::new())
                .unwrap();
        registry.set_tracked_body(body);
        registry.toggle_collect();
        registry.toggle_collect();
        registry.toggle_collect();

        let scene = registry.shutdown();
        assert!(scene.is_empty());
        assert_eq!(scene.detach_count(), 3);
    }
}
