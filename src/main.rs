//! care-route-optimizer CLI
//!
//! Reads a problem file (entities plus one request), plans the day and
//! prints the result as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use care_route_optimizer::model::Algorithm;
use care_route_optimizer::{OptimizationService, OptimizerConfig, ProblemFile};

#[derive(Parser)]
#[command(name = "care-route-optimizer", about = "Home-hospitalization route optimizer")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize the request contained in a problem file
    Optimize {
        /// Problem file (JSON)
        #[arg(long, short)]
        input: PathBuf,
        /// Override the request's algorithm (solver or heuristic)
        #[arg(long)]
        algorithm: Option<Algorithm>,
        /// Override the request's time budget, in seconds
        #[arg(long)]
        time_budget: Option<u32>,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = OptimizerConfig::from_env().context("invalid optimizer configuration")?;

    match cli.command {
        Command::Optimize {
            input,
            algorithm,
            time_budget,
        } => {
            let problem = ProblemFile::load(&input)?;
            let (resources, mut request) = problem.into_parts();
            if algorithm.is_some() {
                request.algorithm = algorithm;
            }
            if time_budget.is_some() {
                request.max_optimization_time_seconds = time_budget;
            }
            info!(input = %input.display(), date = %request.date, "optimizing");

            let service = OptimizationService::from_config(config, Arc::new(resources))
                .context("failed to set up distance provider")?;
            let result = service.respond(&request);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
