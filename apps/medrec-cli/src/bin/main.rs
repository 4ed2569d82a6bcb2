use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use medrec_core::config::{Config, Settings, SimilarityStrategy};
use medrec_core::error::Error;
use medrec_hybrid::Recommender;
use medrec_vector::{SimilarityMatrix, Snapshot};

#[derive(Parser)]
#[command(name = "medrec")]
#[command(about = "Medicine recommender\nFinds drugs similar to a selected one by name, condition and rating")]
#[command(version)]
struct Cli {
    /// Raw review dataset (CSV or TSV); overrides data.dataset_path
    #[arg(long, global = true, env = "MEDREC_DATASET")]
    dataset: Option<PathBuf>,
    /// Precomputed snapshot; overrides data.snapshot_path
    #[arg(long, global = true, env = "MEDREC_SNAPSHOT")]
    snapshot: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recommend medicines similar to DRUG
    Recommend {
        drug: String,
        /// Number of recommendations (defaults to recommender.top_n)
        #[arg(short, long)]
        top: Option<usize>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List every known drug name
    List,
    /// Build features and the full similarity matrix, write a snapshot to OUT
    Precompute { out: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let mut settings = config.settings()?;
    apply_overrides(&mut settings, &cli);

    match cli.command {
        Command::Recommend { drug, top, json } => {
            let recommender = Recommender::initialize(&settings, config.base_dir())?;
            let top_n = top.unwrap_or(settings.recommender.top_n);
            match recommender.recommend(&drug, top_n) {
                Ok(results) if json => println!("{}", serde_json::to_string_pretty(&results)?),
                Ok(results) if results.is_empty() => println!("No similar medicines found."),
                Ok(results) => {
                    println!("Top {} similar medicines to {}:", results.len(), drug);
                    for r in &results {
                        println!("\n  Medicine:   {}", r.drug_name);
                        println!("  Condition:  {}", r.condition);
                        println!("  Rating:     {}", r.rating);
                        println!("  Similarity: {:.3}", r.similarity_score);
                        println!("  Review:     {}", r.review_snippet);
                    }
                }
                Err(Error::NotFound(msg)) => {
                    info!(%msg, "query not found");
                    println!("No similar medicines found.");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::List => {
            let recommender = Recommender::initialize(&settings, config.base_dir())?;
            for name in recommender.names() {
                println!("{}", name);
            }
        }
        Command::Precompute { out } => {
            // Always rebuild from the raw dataset; an existing snapshot is what we replace.
            settings.data.snapshot_path = None;
            settings.recommender.strategy = SimilarityStrategy::OnDemand;
            let recommender = Recommender::initialize(&settings, config.base_dir())?;
            let pb = ProgressBar::new(recommender.store().len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%)")?
                    .progress_chars("#>-"),
            );
            let similarity = SimilarityMatrix::compute_with_progress(recommender.features(), &pb);
            let snapshot = Snapshot::new(recommender.store().records().to_vec(), recommender.features().clone(), Some(similarity))?;
            snapshot.save(&out)?;
            println!("Snapshot with {} drugs written to {}", recommender.store().len(), out.display());
        }
    }
    Ok(())
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    settings.data.override_sources(cli.dataset.as_deref(), cli.snapshot.as_deref());
}
