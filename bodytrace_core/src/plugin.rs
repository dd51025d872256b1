//! Host-facing plugin façade.
//!
//! Mirrors the lifecycle a simulator plugin goes through (init, input
//! events, per-frame graphics update, close) with typed inputs in place of
//! argv and global world pointers.

use crate::config::TraceConfig;
use crate::error::TraceResult;
use crate::registry::TraceRegistry;
use crate::scene::TraceScene;
use bodytrace_env::{toggle_queue, ToggleCommand, ToggleReceiver, ToggleSender, WorldLookup};
use tracing::info;

/// A trace registry plus the optional remote toggle queue feeding it.
pub struct TracePlugin<S: TraceScene> {
    registry: TraceRegistry<S>,
    remote: Option<(ToggleSender, ToggleReceiver)>,
    frame: u64,
}

impl<S: TraceScene> TracePlugin<S> {
    /// Sets up the registry and, if `config.remote_toggles` is set, the
    /// queue remote channels deliver into.
    ///
    /// # Errors
    /// Fails when a named body or reference object is missing from `world`.
    pub fn init(config: &TraceConfig, world: &dyn WorldLookup, scene: S) -> TraceResult<Self> {
        let registry = TraceRegistry::setup(config, world, scene)?;
        let remote = config.remote_toggles.then(|| {
            info!("Remote toggles enabled");
            toggle_queue(config.toggle_queue_capacity)
        });

        Ok(Self {
            registry,
            remote,
            frame: 0,
        })
    }

    /// Sender for remote channels, if remote toggles are enabled.
    pub fn toggle_sender(&self) -> Option<ToggleSender> {
        self.remote.as_ref().map(|(tx, _)| tx.clone())
    }

    /// Applies a command from the keyboard path.
    pub fn handle(&mut self, command: ToggleCommand) {
        self.registry.apply(command);
    }

    /// Per-frame update: applies every queued remote command, then samples
    /// the tracked body.
    ///
    /// Returns true if a vertex was added this frame.
    pub fn graphics_update(&mut self) -> bool {
        if let Some((_, rx)) = self.remote.as_mut() {
            for command in rx.drain() {
                self.registry.apply(command);
            }
        }
        self.frame += 1;
        self.registry.on_frame_tick()
    }

    /// Number of graphics updates so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn registry(&self) -> &TraceRegistry<S> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TraceRegistry<S> {
        &mut self.registry
    }

    /// Tears down every trace and hands the scene back.
    pub fn close(self) -> S {
        self.registry.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{TestBody, TestWorld};
    use crate::scene::MemoryScene;
    use nalgebra::Point3;

    fn world_with_tip(body: &std::sync::Arc<TestBody>) -> TestWorld {
        let mut world = TestWorld::default();
        world.bodies.insert("tip".into(), body.clone());
        world
    }

    #[test]
    fn test_no_sender_without_remote_toggles() {
        let plugin =
            TracePlugin::init(&TraceConfig::default(), &TestWorld::default(), MemoryScene::new())
                .unwrap();
        assert!(plugin.toggle_sender().is_none());
    }

    #[test]
    fn test_remote_commands_apply_before_the_tick() {
        let body = TestBody::new("tip", Point3::origin());
        let world = world_with_tip(&body);
        let config = TraceConfig {
            body_to_trace: "tip".into(),
            remote_toggles: true,
            ..Default::default()
        };
        let mut plugin = TracePlugin::init(&config, &world, MemoryScene::new()).unwrap();
        let sender = plugin.toggle_sender().unwrap();

        sender.try_send(ToggleCommand::SetCollect(true)).unwrap();
        sender.try_send(ToggleCommand::SetCollect(true)).unwrap();
        body.move_to(Point3::new(0.0, 0.0, 2.0));

        assert!(plugin.graphics_update());

        let registry = plugin.registry();
        assert_eq!(registry.dynamic_count(), 1);
        assert_eq!(
            registry.active_trace().unwrap().vertices(),
            &[Point3::new(0.0, 0.0, 2.0), Point3::new(0.0, 0.0, 2.0)]
        );
    }

    #[test]
    fn test_keyboard_and_frames() {
        let body = TestBody::new("tip", Point3::origin());
        let world = world_with_tip(&body);
        let config = TraceConfig {
            body_to_trace: "tip".into(),
            ..Default::default()
        };
        let mut plugin = TracePlugin::init(&config, &world, MemoryScene::new()).unwrap();

        assert!(!plugin.graphics_update());
        plugin.handle(ToggleCommand::ToggleCollect);
        for i in 1..=3 {
            body.move_to(Point3::new(0.0, i as f64, 0.0));
            plugin.graphics_update();
        }

        assert_eq!(plugin.frame(), 4);
        assert_eq!(plugin.registry().active_trace().unwrap().segment_count(), 3);

        let scene = plugin.close();
        assert!(scene.is_empty());
    }
}
