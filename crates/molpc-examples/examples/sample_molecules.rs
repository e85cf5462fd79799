//! Sample molecular graphs from a configured model.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example sample_molecules --release -- \
//!   --config config/qm9/marg_sort.toml \
//!   --count 5000 \
//!   --chunk-size 2000
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use molpc_core::backend::{init_cpu_device, CpuBackend};
use molpc_core::{HyperParams, RngKey};
use molpc_examples::{render, summarize};
use molpc_models::{build_model, GraphEvidence};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sample_molecules")]
#[command(author, version, about = "Sample molecular graphs from a mixture of circuits")]
struct Args {
    /// Model configuration (TOML)
    #[arg(long, env = "MOLPC_CONFIG", default_value = "config/qm9/marg_sort.toml")]
    config: PathBuf,

    /// Number of graphs to sample
    #[arg(short, long, default_value = "1000")]
    count: usize,

    /// Rows per sampling chunk (defaults to the config value)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Random seed (defaults to the config value, then 0)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of graphs to print
    #[arg(long, default_value = "5")]
    show: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("=== molpc sampling ===\n");

    let params = HyperParams::from_file(&args.config)
        .with_context(|| format!("Failed to load {:?}", args.config))?;
    let device = init_cpu_device();
    let model = build_model::<CpuBackend>(&params, &device).context("Failed to build model")?;
    println!(
        "Model '{}': {} components, {} node slots, {} regime, {} parameters",
        params.name,
        params.model.num_components,
        params.model.max_nodes,
        params.model.regime,
        model.num_parameters()
    );

    let chunk_size = args.chunk_size.unwrap_or(params.sampling.chunk_size);
    let seed = args.seed.or(params.sampling.seed).unwrap_or(0);
    log::debug!("Sampling with seed {} and chunk size {}", seed, chunk_size);
    let mut rng = RngKey::new(seed).into_rng();

    let start = std::time::Instant::now();
    let batch = model
        .sample(args.count, &GraphEvidence::none(), chunk_size, &mut rng)
        .context("Sampling failed")?;
    let graphs = batch.to_graphs()?;
    println!(
        "Sampled {} graphs in {:.2?} (chunks of {})\n",
        graphs.len(),
        start.elapsed(),
        chunk_size
    );

    for graph in graphs.iter().take(args.show) {
        println!("  {}", render(graph, params.model.variant));
    }

    let summary = summarize(&graphs, params.model.variant, params.model.edge_categories);
    println!("\nMean atoms:        {:.2}", summary.mean_atoms);
    println!("Mean bonds:        {:.2}", summary.mean_bonds);
    println!("Connected:         {:.1}%", 100.0 * summary.connected_fraction);
    println!("Atom count histogram: {:?}", summary.atom_counts);
    println!("Bond type histogram:  {:?}", summary.bond_types);

    Ok(())
}
