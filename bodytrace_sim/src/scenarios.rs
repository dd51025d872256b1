//! Scripted trace scenarios for the harness.
//!
//! Each scenario is a fixed timeline of inputs (key presses, remote
//! messages, static trace file edits) keyed by the frame they land on.
//! Inputs for frame `n` are delivered before that frame's graphics update.

use crate::keys::{Key, Modifiers};
use bodytrace_core::TraceConfig;
use bodytrace_env::{COLLECT_TOPIC, VISIBLE_TOPIC};
use std::path::Path;

/// File name of the static trace inside the scenario work directory.
pub const STATIC_TRACE_FILE: &str = "static_trace.csv";

/// Three points in the reference frame, as written at scenario start.
pub const INITIAL_STATIC_POINTS: &str = "0,0,0\n1,0,0\n1,1,0\n";

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Show, then collect a single trace of an orbiting body
    Basic,

    /// Collect/show toggled repeatedly from the keyboard
    ToggleCycle,

    /// Static trace rebuilt from a file that changes under it
    StaticReload,

    /// Collect/show driven over the remote topics
    Remote,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Basic,
            ScenarioId::ToggleCycle,
            ScenarioId::StaticReload,
            ScenarioId::Remote,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Basic => "basic",
            ScenarioId::ToggleCycle => "toggle_cycle",
            ScenarioId::StaticReload => "static_reload",
            ScenarioId::Remote => "remote",
        }
    }

    /// Returns the scenario description.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Basic => "Single dynamic trace of the orbiting tip",
            ScenarioId::ToggleCycle => "Re-arming collection starts new traces; show flips all of them",
            ScenarioId::StaticReload => "Reload picks up edits, keeps on bad input, clears on missing file",
            ScenarioId::Remote => "Remote set-collect/set-visible messages applied on the frame thread",
        }
    }

    /// Frames needed before the last scripted input has landed.
    pub fn min_ticks(&self) -> u64 {
        self.timeline()
            .iter()
            .map(|step| step.tick + 1)
            .max()
            .unwrap_or(0)
    }

    /// Setup parameters for this scenario, with files under `work_dir`.
    pub fn config(&self, work_dir: &Path) -> TraceConfig {
        let static_path = work_dir.join(STATIC_TRACE_FILE).to_string_lossy().into_owned();
        match self {
            ScenarioId::Basic | ScenarioId::ToggleCycle => TraceConfig {
                body_to_trace: "tip".into(),
                ..Default::default()
            },
            ScenarioId::StaticReload => TraceConfig {
                static_trace_path: static_path,
                static_trace_reference: "phantom".into(),
                ..Default::default()
            },
            ScenarioId::Remote => TraceConfig {
                body_to_trace: "needle".into(),
                static_trace_path: static_path,
                remote_toggles: true,
                ..Default::default()
            },
        }
    }

    /// The scripted inputs, sorted by tick.
    pub fn timeline(&self) -> Vec<ScriptStep> {
        use ScriptedInput::*;

        let ctrl = |key: Key| KeyPress {
            key,
            modifiers: Modifiers::CTRL,
        };
        let collect = || ctrl(Key::KpMultiply);
        let show = || ctrl(Key::KpSubtract);
        let reload = || ctrl(Key::Kp0);

        let steps = match self {
            ScenarioId::Basic => vec![(5, show()), (10, collect())],
            ScenarioId::ToggleCycle => vec![
                (5, collect()),
                (20, collect()),
                (25, show()),
                (30, show()),
                (35, show()),
                (40, collect()),
                // Not bound without Ctrl
                (
                    45,
                    KeyPress {
                        key: Key::KpMultiply,
                        modifiers: Modifiers::NONE,
                    },
                ),
                (50, collect()),
            ],
            ScenarioId::StaticReload => vec![
                (
                    10,
                    WriteStaticFile("0,0,0\n1,0,0\n1,1,0\n0,1,0\n0,0,1\n".into()),
                ),
                (11, reload()),
                (20, WriteStaticFile("1,2\n".into())),
                (21, reload()),
                (30, RemoveStaticFile),
                (31, reload()),
                (40, WriteStaticFile("2,0,0\n2,2,0\n0,2,0\n0,0,0\n".into())),
                (41, reload()),
            ],
            ScenarioId::Remote => vec![
                (5, remote(COLLECT_TOPIC, true)),
                (6, remote(COLLECT_TOPIC, true)),
                (10, remote(VISIBLE_TOPIC, true)),
                (15, remote("ambf/trace_plugin/unrelated", false)),
                (30, remote(COLLECT_TOPIC, false)),
                (40, remote(COLLECT_TOPIC, true)),
            ],
        };

        steps
            .into_iter()
            .map(|(tick, input)| ScriptStep { tick, input })
            .collect()
    }
}

fn remote(topic: &str, value: bool) -> ScriptedInput {
    ScriptedInput::Remote {
        topic: topic.to_string(),
        value,
    }
}

/// One input the harness delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedInput {
    KeyPress { key: Key, modifiers: Modifiers },
    Remote { topic: String, value: bool },
    WriteStaticFile(String),
    RemoveStaticFile,
}

/// An input scheduled for a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub tick: u64,
    pub input: ScriptedInput,
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "basic" => Ok(ScenarioId::Basic),
            "toggle_cycle" => Ok(ScenarioId::ToggleCycle),
            "static_reload" => Ok(ScenarioId::StaticReload),
            "remote" => Ok(ScenarioId::Remote),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
