//! `airhockey` CLI: closed-loop simulation sessions and config tooling.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ah_core::engine::puck_simulation::Score;
use ah_core::{
    build_controller, ControlLoop, ControllerSetup, EngineConfig, JsonLinesSink, LoopStats,
    LoopbackChannel, MalletState, SerialCodec, SimulationConfig, StopHandle, TableSimulation, TickInput,
    WorldModel,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

#[derive(Parser)]
#[command(name = "airhockey", about = "Autonomous air hockey decision loop", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ControllerArg {
    /// Kinematic integration
    Simulated,
    /// Real-robot controller over an in-process firmware stand-in
    Loopback,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a closed-loop session against the table simulator.
    Simulate {
        /// Number of control ticks
        #[arg(long, default_value_t = 3600)]
        ticks: u64,
        /// Random seed for serve directions, noise and dropouts
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Preset name (default, competition, simulation)
        #[arg(long)]
        profile: Option<String>,
        /// YAML configuration file (overrides --profile)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write one JSON telemetry frame per tick
        #[arg(long)]
        telemetry: Option<PathBuf>,
        /// Tracker position noise, standard deviation in metres
        #[arg(long, default_value_t = 0.0)]
        noise: f32,
        /// Per-body probability of a missed detection
        #[arg(long, default_value_t = 0.0)]
        dropout: f64,
        #[arg(long, value_enum, default_value_t = ControllerArg::Simulated)]
        controller: ControllerArg,
        /// Tick on the wall clock instead of as fast as possible
        #[arg(long, default_value_t = false)]
        realtime: bool,
    },
    /// Parse and validate a configuration file.
    CheckConfig {
        path: PathBuf,
    },
    /// Print a preset as YAML.
    PrintConfig {
        #[arg(long)]
        profile: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            ticks,
            seed,
            profile,
            config,
            telemetry,
            noise,
            dropout,
            controller,
            realtime,
        } => {
            let engine = resolve_config(profile.as_deref(), config.as_deref())?;
            let sim_config = SimulationConfig {
                noise_std_m: noise,
                dropout_probability: dropout,
                ..SimulationConfig::default()
            };
            let session = Session { ticks, seed, telemetry, controller, realtime };
            let (stats, score) = run_session(engine, sim_config, session)?;
            print_summary(&stats, &score);
        }
        Commands::CheckConfig { path } => {
            let engine = EngineConfig::load(&path)
                .with_context(|| format!("invalid configuration {}", path.display()))?;
            println!("✅ {} is valid", path.display());
            println!(
                "   Table: {} x {} m, goal {} m",
                engine.table.width_m, engine.table.height_m, engine.table.goal_width_m
            );
            println!(
                "   Strategy: {:?} / {:?}, mode {:?}",
                engine.strategy.offense, engine.strategy.defense, engine.strategy.mode
            );
        }
        Commands::PrintConfig { profile } => {
            let engine = resolve_config(profile.as_deref(), None)?;
            print!("{}", engine.to_yaml_string()?);
        }
    }

    Ok(())
}

fn resolve_config(profile: Option<&str>, path: Option<&Path>) -> Result<EngineConfig> {
    let engine = match (path, profile) {
        (Some(path), _) => EngineConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        (None, Some(name)) => {
            EngineConfig::from_profile(name).ok_or_else(|| anyhow!("unknown profile {name:?}"))?
        }
        (None, None) => EngineConfig::from_env_or_default(),
    };
    engine.validate_all()?;
    Ok(engine)
}

struct Session {
    ticks: u64,
    seed: u64,
    telemetry: Option<PathBuf>,
    controller: ControllerArg,
    realtime: bool,
}

fn run_session(engine: EngineConfig, sim_config: SimulationConfig, session: Session) -> Result<(LoopStats, Score)> {
    let world = Arc::new(WorldModel::from_config(&engine));
    let setup = match session.controller {
        ControllerArg::Simulated => ControllerSetup::Simulated,
        ControllerArg::Loopback => {
            let codec = SerialCodec::default();
            ControllerSetup::Real(Box::new(LoopbackChannel::new(codec)), codec)
        }
    };
    let controller = build_controller(setup, &engine);
    let period_us = engine.control.tick_period_us;

    let mut sim = TableSimulation::new(&engine, sim_config, session.seed)?;
    let mut control = ControlLoop::new(engine, world.clone(), controller);
    if let Some(path) = &session.telemetry {
        let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        control = control.with_telemetry(Box::new(JsonLinesSink::new(BufWriter::new(file))));
    }

    control.initialize(0)?;
    sim.serve();
    info!(ticks = session.ticks, seed = session.seed, realtime = session.realtime, "Session started");

    let stats = if session.realtime {
        let stop = StopHandle::new();
        control.run(&stop, Some(session.ticks), |now_us| {
            let own = world.snapshot(now_us).own_mallet().body;
            sim.set_own_mallet(&MalletState { position: own.position, velocity: own.velocity });
            sim.advance_to(now_us);
            world.ingest_frame(&sim.observe());
            TickInput::default()
        })?
    } else {
        for tick in 1..=session.ticks {
            let now_us = tick * period_us;
            sim.advance_to(now_us);
            world.ingest_frame(&sim.observe());
            let report = control.tick(now_us, &TickInput::default())?;
            sim.set_own_mallet(&report.mallet);
        }
        control.shutdown();
        control.stats().clone()
    };

    Ok((stats, sim.score()))
}

fn print_summary(stats: &LoopStats, score: &Score) {
    println!("🏒 Session finished");
    println!("   Ticks:            {}", stats.ticks);
    println!("   Deadline misses:  {}", stats.deadline_misses);
    println!("   Actuator faults:  {}", stats.actuator_faults);
    println!("   Posture switches: {}", stats.posture_switches);
    println!("   Clamped targets:  {}", stats.clamped_targets);
    println!("   Stale ticks:      {}", stats.stale_ticks);
    println!("   Score:            {} scored / {} conceded", score.scored, score.conceded);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_session_runs() {
        let session = Session {
            ticks: 120,
            seed: 1,
            telemetry: None,
            controller: ControllerArg::Simulated,
            realtime: false,
        };
        let (stats, _) = run_session(EngineConfig::default(), SimulationConfig::default(), session).unwrap();
        assert_eq!(stats.ticks, 120);
        assert_eq!(stats.actuator_faults, 0);
    }

    #[test]
    fn test_loopback_session_writes_telemetry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");
        let session = Session {
            ticks: 30,
            seed: 2,
            telemetry: Some(path.clone()),
            controller: ControllerArg::Loopback,
            realtime: false,
        };
        run_session(EngineConfig::simulation(), SimulationConfig::default(), session).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 30);
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["tick"], 0);
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        assert!(resolve_config(Some("tournament"), None).is_err());
        assert!(resolve_config(Some("competition"), None).is_ok());
    }
}
