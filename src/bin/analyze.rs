use std::path::PathBuf;

use clap::Parser;
use murmuration_core::metrics::init_logging;
use murmuration_io::persistence::load_simulation;
use murmuration_lib::model::analysis::{render_report, summarize_state};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Saved simulation (`.json` or `.json.gz`)
    #[arg(short, long, default_value = "save.json")]
    input: PathBuf,

    #[arg(short, long, default_value = "report.md")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let saved = load_simulation(&args.input)?;
    let summary = summarize_state(saved.tick, &saved.config, &saved.state)?;
    tracing::info!(
        tick = summary.tick,
        particles = summary.particles,
        occupied_cells = summary.occupied_cells,
        clusters = summary.clusters,
        mean_speed = summary.mean_speed,
        non_finite = summary.non_finite,
        saved_at = %saved.saved_at,
        "Saved flock analyzed"
    );

    std::fs::write(&args.output, render_report(&summary, &saved.config))?;
    println!("Report generated: {}", args.output.display());

    Ok(())
}
