use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use murmuration_core::metrics::init_logging;
use murmuration_lib::app::App;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path (defaults are used when it does not exist)
    #[arg(short, long, default_value = "flock.toml")]
    config: PathBuf,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 1000)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.016)]
    dt: f64,

    /// Overrides `world.seed`
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides `world.count`
    #[arg(long)]
    count: Option<usize>,

    /// Continue from a saved simulation instead of starting fresh
    #[arg(short, long)]
    load: Option<PathBuf>,

    /// Save the final state here (`.gz` compresses)
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Also write the final particle state as an rkyv archive
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Extra attractor as `name=x,y,z`; may be repeated
    #[arg(long = "attractor")]
    attractors: Vec<String>,

    /// Log the force breakdown of this particle at the end of the run
    #[arg(long)]
    inspect: Option<usize>,

    /// Watch the config file and apply edited tunables while running
    #[arg(long)]
    watch: bool,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut app = match &args.load {
        Some(path) => App::from_save(path, args.dt)?,
        None => {
            let mut config = App::load_config(&args.config)?;
            if let Some(seed) = args.seed {
                config.world.seed = Some(seed);
            }
            if let Some(count) = args.count {
                config.world.count = count;
            }
            App::new(config, args.dt)?
        }
    };
    if args.watch {
        app = app.with_config_path(args.config.clone());
    }
    for spec in &args.attractors {
        app.set_attractor_spec(spec)?;
    }
    app.flock.set_debug_particle(args.inspect);

    tracing::info!(
        ticks = args.ticks,
        dt = args.dt,
        particles = app.flock.len(),
        "Running headless flock"
    );
    let summary = app.run(args.ticks)?;
    let metrics = app.flock.metrics();
    tracing::info!(
        ticks = metrics.tick_count(),
        wall_ms = metrics.elapsed().as_millis() as u64,
        mean_tick_us = metrics.mean_tick_duration().as_micros() as u64,
        "Run finished"
    );

    if let Some(report) = app.flock.force_report() {
        for sample in &report.forces {
            tracing::info!(
                particle = report.particle,
                rule = %sample.rule,
                force = ?sample.value,
                "Force breakdown"
            );
        }
    }
    if let Some(path) = &args.save {
        app.save(path)?;
    }
    if let Some(path) = &args.archive {
        app.save_state_archive(path)?;
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
