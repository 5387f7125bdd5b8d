#![forbid(unsafe_code)]

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use criteria_ranker::ahp::PairwiseMatrix;
use criteria_ranker::pipeline::{
    self, CandidateSearchRequest, JobFitRequest, MatrixSearchRequest, RankingRequest,
};

#[derive(Parser)]
#[command(name = "ranker", version, about = "AHP criteria weighting and candidate ranking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weights and consistency of a pairwise comparison matrix
    Ahp {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Rank candidates with a given or searched comparison matrix
    Rank {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Search for consistent comparison matrices favouring the best candidate
    OptimizeMatrix {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Evolve ideal candidate profiles under threshold penalties
    OptimizeCandidates {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Score candidate forms against job requirements
    JobFit {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ahp { input, out } => {
            let matrix: PairwiseMatrix = read_json(&input)?;
            let resp = pipeline::run_ahp(&matrix)?;
            write_json(&out, &resp)?;
        }
        Commands::Rank { input, out } => {
            let req: RankingRequest = read_json(&input)?;
            let resp = pipeline::run_ranking(&req)?;
            write_json(&out, &resp)?;
        }
        Commands::OptimizeMatrix { input, out } => {
            let req: MatrixSearchRequest = read_json(&input)?;
            let resp = pipeline::run_matrix_search(&req)?;
            write_json(&out, &resp)?;
        }
        Commands::OptimizeCandidates { input, out } => {
            let req: CandidateSearchRequest = read_json(&input)?;
            let resp = pipeline::run_candidate_search(&req)?;
            write_json(&out, &resp)?;
        }
        Commands::JobFit { input, out } => {
            let req: JobFitRequest = read_json(&input)?;
            let resp = pipeline::run_job_fit(&req)?;
            write_json(&out, &resp)?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
