//! BodyTrace Simulator CLI
//!
//! Run scripted trace scenarios, or drive the plugin with a custom setup.

use bodytrace_core::TraceConfig;
use bodytrace_sim::scenarios::ScenarioId;
use bodytrace_sim::{ScenarioResult, ScenarioRunner};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Flags that select a custom run instead of the scripted scenarios.
const CUSTOM_RUN_FLAGS: [&str; 7] = [
    "config",
    "name_body_to_trace",
    "csv_filename_static_traces",
    "static_trace_rel_body_name",
    "remote_toggles",
    "collect_on_start",
    "sample_interval",
];

/// BodyTrace simulation CLI
#[derive(Parser, Debug)]
#[command(name = "bodytrace-sim")]
#[command(about = "Run body trace scenarios against a simulated world", long_about = None)]
struct Args {
    /// Seed for body jitter (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (basic, toggle_cycle, static_reload, remote, all)
    #[arg(
        short = 'S',
        long,
        default_value = "all",
        conflicts_with_all = CUSTOM_RUN_FLAGS
    )]
    scenario: String,

    /// Simulation duration in seconds
    #[arg(short, long, default_value = "2")]
    duration: f64,

    /// Frames per second
    #[arg(long, default_value = "60")]
    tick_rate: u32,

    /// Std dev of body position jitter in meters
    #[arg(long, default_value = "0")]
    jitter: f64,

    /// JSON config for a custom run (no script; CLI flags below override it)
    #[arg(long)]
    config: Option<String>,

    /// Body to trace in a custom run
    #[arg(long)]
    name_body_to_trace: Option<String>,

    /// Static trace point file for a custom run
    #[arg(long)]
    csv_filename_static_traces: Option<String>,

    /// Object whose frame the static trace is expressed in
    #[arg(long)]
    static_trace_rel_body_name: Option<String>,

    /// Accept collect/visible toggles over the remote topics
    #[arg(long)]
    remote_toggles: bool,

    /// Start collecting on the first frame
    #[arg(long)]
    collect_on_start: bool,

    /// Sample the body every N frames
    #[arg(long)]
    sample_interval: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the run to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Mirror traces into a Rerun viewer (needs the `visualization` feature)
    #[arg(long)]
    visualize: bool,
}

impl Args {
    fn is_custom_run(&self) -> bool {
        self.config.is_some()
            || self.name_body_to_trace.is_some()
            || self.csv_filename_static_traces.is_some()
            || self.static_trace_rel_body_name.is_some()
            || self.remote_toggles
            || self.collect_on_start
            || self.sample_interval.is_some()
    }

    /// Builds the custom-run config: file first, then flag overrides.
    fn trace_config(&self) -> Result<TraceConfig, String> {
        let mut config = match &self.config {
            Some(path) => TraceConfig::from_json_file(path).map_err(|e| e.to_string())?,
            None => TraceConfig::default(),
        };

        if let Some(body) = &self.name_body_to_trace {
            config.body_to_trace = body.clone();
        }
        if let Some(path) = &self.csv_filename_static_traces {
            config.static_trace_path = path.clone();
        }
        if let Some(reference) = &self.static_trace_rel_body_name {
            config.static_trace_reference = reference.clone();
        }
        if self.remote_toggles {
            config.remote_toggles = true;
        }
        if self.collect_on_start {
            config.collect_on_start = true;
        }
        if let Some(interval) = self.sample_interval {
            config.sample_interval = interval;
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

fn report(result: &ScenarioResult, json: bool) {
    if json {
        return;
    }
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED | traces={} vertices={} static={:?}",
            result.scenario,
            result.seed,
            result.metrics.dynamic_traces,
            result.metrics.dynamic_vertices,
            result.metrics.static_vertices
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario,
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    if !args.json {
        info!("BodyTrace Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let mut runner = ScenarioRunner::new(seed)
        .with_duration(args.duration)
        .with_tick_rate(args.tick_rate)
        .with_jitter(args.jitter)
        .with_visualization(args.visualize);

    let results: Vec<ScenarioResult> = if args.is_custom_run() {
        let config = args.trace_config().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
        if let Some(path) = &args.export {
            runner = runner.with_export(path.clone());
        }
        vec![runner.run_config(&config)]
    } else {
        let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
            ScenarioId::all()
        } else {
            vec![args.scenario.parse().unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: basic, toggle_cycle, static_reload, remote, all");
                std::process::exit(1);
            })]
        };

        if let Some(path) = &args.export {
            if scenarios.len() > 1 {
                eprintln!("Error: --export only supports a single scenario, not 'all'");
                std::process::exit(1);
            }
            info!("Running with export to: {}", path);
            runner = runner.with_export(path.clone());
        }

        scenarios.into_iter().map(|s| runner.run(s)).collect()
    };

    for result in &results {
        report(result, args.json);
    }

    let total = results.len();
    let failed_count = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario,
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "dynamic_traces": r.metrics.dynamic_traces,
                    "dynamic_vertices": r.metrics.dynamic_vertices,
                    "static_vertices": r.metrics.static_vertices,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to encode summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} runs passed!", total);
        } else {
            error!("❌ {}/{} runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
