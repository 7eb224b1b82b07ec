use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vehicle_dynamics::config::TunableParameters;
use vehicle_dynamics::input::{InputSource, ScriptedDriver};
use vehicle_dynamics::physics::PhysicsWorld;
use vehicle_dynamics::vehicle::GT86;

#[derive(Parser)]
#[command(name = "vehicle-sim")]
#[command(about = "Fixed-step vehicle drivetrain simulation on a flat test pad", version)]
struct Cli {
    /// `key = value` override file applied on top of the default tuning
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of physics ticks to run
    #[arg(long, default_value_t = 1200)]
    ticks: u64,

    /// Physics rate
    #[arg(long, default_value_t = 60)]
    hz: u32,

    /// Emit a telemetry line every N ticks
    #[arg(long, default_value_t = 30)]
    telemetry_every: u64,

    /// Step as fast as possible instead of in real time
    #[arg(long)]
    fast: bool,

    /// Print the effective tuning as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vehicle_dynamics=info,vehicle_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let params = match &cli.config {
        Some(path) => TunableParameters::from_override_file(path)?,
        None => TunableParameters::default(),
    };

    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    let hz = cli.hz.max(1);
    let dt = 1.0 / hz as f32;

    let mut world = PhysicsWorld::new();
    world
        .spawn_vehicle("car", [0.0, 1.0, 0.0], GT86, params)
        .context("failed to build vehicle")?;

    let mut driver = ScriptedDriver::demo();
    info!(hz, ticks = cli.ticks, script_secs = driver.duration(), "starting simulation");

    // Fixed timestep
    let mut ticker = interval(Duration::from_secs_f64(1.0 / f64::from(hz)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    for tick in 0..cli.ticks {
        if !cli.fast {
            ticker.tick().await;
        }

        let input = driver.poll(tick as f32 * dt);
        world.set_input("car", input);
        world.step(dt);

        if cli.telemetry_every > 0 && tick % cli.telemetry_every == 0 {
            let line = world.snapshot(tick).to_json()?;
            info!(telemetry = %line);
        }
    }

    let last = world.snapshot(cli.ticks).to_json()?;
    info!(final_state = %last, "simulation finished");
    Ok(())
}
