use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use ictal::{ingest, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "classify", about = "EEG seizure classification pipeline")]
struct Args {
    /// EEG recording to analyze (.edf; unreadable input falls back to
    /// synthetic data)
    #[arg(long)]
    input: PathBuf,

    /// Model weight file (default: $GNN_MODEL_PATH or models/gnn.safetensors)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Seizure-detection threshold in standard deviations
    #[arg(long, default_value_t = 2.0)]
    threshold: f32,

    /// Seed for synthetic fallback data and untrained-model init
    #[arg(long)]
    seed: Option<u64>,

    /// Print the full analysis as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let model_path = args
        .model
        .or_else(|| std::env::var_os("GNN_MODEL_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PipelineConfig::default().model_path);

    if !ingest::is_supported_extension(&args.input) {
        eprintln!(
            "note: {} has an unsupported extension (expected .edf/.bdf/.zip/.gz)",
            args.input.display()
        );
    }

    let cfg = PipelineConfig {
        model_path,
        threshold: args.threshold,
        synthetic_seed: args.seed,
        ..PipelineConfig::default()
    };

    let pipeline = Pipeline::new(cfg);
    let analysis = pipeline.analyze(&args.input);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let c = &analysis.classification;
    println!("result: {}", c.label);
    println!(
        "confidence: epileptic {:.1}%  non-epileptic {:.1}%  psychogenic {:.1}%",
        c.confidence.epileptic, c.confidence.non_epileptic, c.confidence.psychogenic
    );
    if !c.seizure_intervals.is_empty() {
        println!("seizure intervals:");
        for iv in &c.seizure_intervals {
            println!("  {} – {}", iv.start(), iv.end());
        }
    }
    for w in &analysis.diagnostics {
        println!("warning: {w}");
    }

    Ok(())
}
