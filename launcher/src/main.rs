//! herd launcher — the thin CLI shell around a group run.
//!
//! Argument parsing, interactive prompting, and logging setup live here; the
//! group itself neither reads nor validates raw input. Values read from the
//! terminal go to the group untouched, and the group's size-agreement step
//! rejects them if they don't fit.

use anyhow::Context;
use clap::Parser;
use herd_core::{KernelSet, RunPlan};
use std::io::Write;

#[derive(Parser, Debug)]
#[command(
    name = "herd",
    about = "Distribute elementwise vector arithmetic across a fixed worker group"
)]
struct Cli {
    /// Number of cooperating workers in the group
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Vector order n; prompted for interactively when omitted
    #[arg(short, long)]
    order: Option<i64>,

    /// Scalar for the scalar-product kernels; prompted for under --extended
    /// when omitted
    #[arg(short, long)]
    scalar: Option<i64>,

    /// Run the extended kernel set: sum, elementwise product, and the scalar
    /// product of each input
    #[arg(long)]
    extended: bool,

    /// Print the generated input vectors before computing
    #[arg(long)]
    preview_inputs: bool,

    /// Seed for the input generator; entropy-seeded when omitted
    #[arg(long)]
    seed: Option<u64>,
}

fn prompt_int(question: &str) -> anyhow::Result<i64> {
    println!("{question}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    line.trim()
        .parse()
        .with_context(|| format!("expected an integer, got {:?}", line.trim()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let n = match cli.order {
        Some(n) => n,
        None => prompt_int("What's the order of the vectors?")?,
    };
    let kernels = if cli.extended {
        KernelSet::Extended
    } else {
        KernelSet::Sum
    };
    let scalar = match (cli.extended, cli.scalar) {
        (true, None) => Some(prompt_int("What scalar do you want to use?")?),
        (_, scalar) => scalar,
    };

    let plan = RunPlan {
        n,
        scalar,
        kernels,
        preview_inputs: cli.preview_inputs,
        seed: cli.seed,
    };

    match herd_core::run(plan, cli.workers).await {
        Ok(()) => Ok(()),
        // The barrier already wrote the one diagnostic line; exit non-zero
        // without a second report.
        Err(e) if e.is_aborted() => std::process::exit(1),
        Err(e) => Err(e.into()),
    }
}
