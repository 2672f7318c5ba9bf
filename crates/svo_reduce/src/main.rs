//! Diffuse-scattering reduction front end.
//!
//! Reads a frame manifest, reduces every frame into a sparse voxel octree on a
//! dedicated worker thread and writes the result as an `.svo` file.
//!
//! ```text
//! svo_reduce reduce frames.toml --config reduce.toml --output crystal.svo
//! svo_reduce inspect crystal.svo
//! ```

mod config;
mod manifest;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use svo_core::{ComputeContext, LogLevel, ReductionEvent, ReductionWorker, SvoStore};

use manifest::ManifestFrameSource;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reduce detector frames into sparse voxel octree files.
#[derive(Parser, Debug)]
#[command(name = "svo_reduce")]
#[command(about = "Reduces diffuse X-ray frames into sparse voxel octrees")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Reduce the frames of a manifest into an .svo file.
	Reduce {
		/// Frame manifest TOML.
		manifest: PathBuf,

		/// Reduction configuration TOML (default: built-in defaults).
		#[arg(short, long)]
		config: Option<PathBuf>,

		/// Output file.
		#[arg(short, long, default_value = "out.svo")]
		output: PathBuf,

		/// Octree depth (overrides the config).
		#[arg(short, long)]
		levels: Option<usize>,

		/// Compute threads, 0 = one per CPU (overrides the config).
		#[arg(short, long)]
		threads: Option<usize>,
	},
	/// Print the header of an .svo file.
	Inspect {
		/// File to inspect.
		path: PathBuf,
	},
}

fn main() -> Result<()> {
	match Cli::parse().command {
		Command::Reduce {
			manifest,
			config,
			output,
			levels,
			threads,
		} => reduce(manifest, config, output, levels, threads),
		Command::Inspect { path } => inspect(path),
	}
}

fn reduce(
	manifest: PathBuf,
	config_path: Option<PathBuf>,
	output: PathBuf,
	levels: Option<usize>,
	threads: Option<usize>,
) -> Result<()> {
	let mut config = config::load(config_path.as_deref())?;
	if levels.is_some() {
		config.levels = levels;
	}
	if let Some(threads) = threads {
		config.threads = threads;
	}
	config.validate().context("Invalid command-line overrides")?;

	println!("Loading manifest from: {}", manifest.display());
	let frames = ManifestFrameSource::open(&manifest)?;

	let ctx = Arc::new(ComputeContext::new(config.threads)?);
	println!("Reducing with {} compute threads", ctx.num_threads());

	let mut worker = ReductionWorker::spawn(frames, config, ctx)?;
	let outcome = loop {
		if let Ok(event) = worker.events().recv_timeout(POLL_INTERVAL) {
			print_event(&event);
		}
		if let Some(outcome) = worker.poll() {
			break outcome;
		}
	};
	for event in worker.events().try_iter() {
		print_event(&event);
	}
	let result = outcome.context("Reduction failed")?;

	result
		.store
		.save(&output)
		.with_context(|| format!("Failed to write {}", output.display()))?;

	println!();
	for stats in &result.level_stats {
		println!(
			"  level {:>2}: {:>8} nodes, {:>8} bricks, radius {:.5}",
			stats.level, stats.nodes, stats.non_empty, stats.search_radius
		);
	}
	println!();
	print!("{}", result.summary);
	println!("\nDone! Output written to: {}", output.display());

	Ok(())
}

fn print_event(event: &ReductionEvent) {
	match event {
		ReductionEvent::Progress { stage, percent } => println!("[{stage:>12}] {percent:>5.1}%"),
		ReductionEvent::Log {
			level: LogLevel::Info,
			message,
		} => println!("{message}"),
		ReductionEvent::Log {
			level: LogLevel::Warn,
			message,
		} => println!("warning: {message}"),
	}
}

fn inspect(path: PathBuf) -> Result<()> {
	let store = SvoStore::open(&path).with_context(|| format!("Failed to read {}", path.display()))?;
	let (major, minor) = store.version();
	let extent = store.extent();
	let [data_min, data_max] = store.minmax();
	let creation = store.creation();

	println!("{}", path.display());
	println!("  version:    {major}.{minor}");
	println!("  levels:     {}", store.levels());
	println!(
		"  bricks:     {} of {}^3 voxels ({} inner), pool power {}",
		store.brick_count(),
		store.brick_outer_dimension(),
		store.brick_inner_dimension(),
		store.brick_pool_power()
	);
	println!("  nodes:      {}", store.node_count());
	println!("  bytes:      {}", store.byte_size());
	println!("  data range: [{data_min}, {data_max}]");
	println!(
		"  extent:     ({:.4}, {:.4}, {:.4}) .. ({:.4}, {:.4}, {:.4})",
		extent.min.x, extent.min.y, extent.min.z, extent.max.x, extent.max.y, extent.max.z
	);
	println!("  created:    {}", creation.date);
	println!("  frames:     {}", creation.files.len());
	if !store.metadata().is_empty() {
		println!("  metadata:   {}", store.metadata());
	}
	Ok(())
}
