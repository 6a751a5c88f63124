//! Harvest planner command line.
//!
//! Reads a world snapshot, plans a harvest schedule for its goal, prints a
//! summary and writes the plan file.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use harvest_planner::{AstarPlanner, PlanError, PlannerConfig};
use harvest_types::{ResourceAmounts, WorldSnapshot};

/// Command line arguments for the planner
#[derive(Parser, Debug)]
#[command(name = "harvest_planner")]
#[command(about = "Plans resource gathering for a small economy")]
struct Args {
    /// World snapshot (JSON)
    #[arg(long)]
    scenario: PathBuf,

    /// Tuning file (TOML); defaults to tuning.toml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Text plan destination, overriding the tuning file
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write the plan as JSON next to the text plan
    #[arg(long)]
    json: bool,

    /// Never train new workers
    #[arg(long)]
    no_build: bool,

    /// Override the gold goal
    #[arg(long)]
    gold: Option<u32>,

    /// Override the wood goal
    #[arg(long)]
    wood: Option<u32>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "planning failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), PlanError> {
    let mut config = PlannerConfig::load_requested(args.config.as_deref())?;
    if args.no_build {
        config.economy.allow_build = false;
    }
    if let Some(out) = &args.out {
        config.output.plan_path = out.clone();
    }
    if args.json {
        config.output.write_json = true;
    }

    let mut snapshot = WorldSnapshot::load(&args.scenario)?;
    if args.gold.is_some() || args.wood.is_some() {
        snapshot.goal = ResourceAmounts::new(
            args.gold.unwrap_or(snapshot.goal.gold),
            args.wood.unwrap_or(snapshot.goal.wood),
        );
    }

    println!("Harvest Planner");
    println!("===============");
    println!("Scenario: {}", args.scenario.display());
    println!("Goal: {} gold, {} wood", snapshot.goal.gold, snapshot.goal.wood);
    println!("Workers: {}", snapshot.agents.len());
    println!("Training: {}", if config.economy.allow_build { "allowed" } else { "disabled" });
    println!();

    let planner = AstarPlanner::new(config.clone());
    let plan = planner.plan(&snapshot)?;

    println!("Plan ({} steps, cost {:.2}):", plan.len(), plan.expected_cost);
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, step);
    }
    println!(
        "Search: {} expanded, {} generated, {} duplicates, {} reopened",
        plan.stats.expanded, plan.stats.generated, plan.stats.deduplicated, plan.stats.reopened
    );

    let text_path = &config.output.plan_path;
    plan.save_text(text_path)?;
    println!("Wrote {}", text_path.display());

    if config.output.write_json {
        let json_path = text_path.with_extension("json");
        plan.save_json(&json_path)?;
        println!("Wrote {}", json_path.display());
    }

    Ok(())
}
