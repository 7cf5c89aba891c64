//! Entropy Debias CLI
//!
//! Debiases every matching file in a directory, writing each result next
//! to its input.

use clap::Parser;
use entropy_debias::{
    analysis::SampleSummary,
    config::{DebiasConfig, FileConfig, Mode, Termination},
    files::{process_directory, Stats},
    kaminsky::DiscardPolicy,
    metrics::MetricsRegistry,
    pipeline::CancelToken,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Outputs larger than this are not read back for the entropy estimate.
const ENTROPY_REPORT_LIMIT: u64 = 64 * 1024 * 1024;

/// Von Neumann debiasing of raw entropy samples.
///
/// ```text
/// # plain debiasing of every .bin file
/// entropy-debias ./samples
///
/// # Kaminsky whitening of .wav captures
/// entropy-debias ./samples --ext wav --mode kaminsky
/// ```
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory containing the raw samples.
    dir: PathBuf,

    /// Extension of the files to process, with or without the dot.
    #[arg(long)]
    ext: Option<String>,

    /// Output processing mode.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Input bytes per cipher cycle (Kaminsky only).
    #[arg(long)]
    block_size: Option<u64>,

    /// Maximum bytes handed to the writer at once.
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Key material handling between cipher cycles.
    #[arg(long, value_enum)]
    discard_policy: Option<DiscardPolicy>,

    /// Keep each stream open at end of input until Ctrl-C.
    #[arg(long)]
    hold_open: bool,

    /// TOML configuration file; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics after processing.
    #[arg(long)]
    metrics: bool,
}

impl Cli {
    /// Layers the command-line flags over the file configuration.
    fn resolve(&self) -> Result<(DebiasConfig, String), entropy_debias::DebiasError> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let mut config = file.pipeline;
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(max_chunk_size) = self.max_chunk_size {
            config.max_chunk_size = max_chunk_size;
        }
        if let Some(policy) = self.discard_policy {
            config.discard_policy = policy;
        }
        if self.hold_open {
            config.termination = Termination::HoldOpen;
        }
        config.validate()?;

        let ext = self.ext.clone().unwrap_or(file.input.extension);
        Ok((config, ext))
    }
}

fn print_stats(stats: &Stats) {
    let quality = if stats.bytes_out <= ENTROPY_REPORT_LIMIT {
        match std::fs::read(&stats.output) {
            Ok(data) => {
                let summary = SampleSummary::analyze(&data);
                format!(
                    "entropy ~{} bits ({:.3}/byte), bias {:+.4}",
                    summary.entropy,
                    summary.bits_per_byte(),
                    summary.bit_bias
                )
            }
            Err(e) => {
                warn!("Could not read back {}: {}", stats.output.display(), e);
                "entropy n/a".to_string()
            }
        }
    } else {
        "entropy skipped".to_string()
    };

    println!(
        "{}: {} -> {} bytes ({:.1}%) in {:.3}s, {} -> {}",
        stats.name,
        stats.bytes_in,
        stats.bytes_out,
        stats.yield_ratio() * 100.0,
        stats.duration.as_secs_f64(),
        quality,
        stats.output.display()
    );
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    info!("Entropy Debias v{}", entropy_debias::VERSION);

    let (config, ext) = match cli.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let session = CancelToken::new();
    let handler_token = session.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_token.cancel() {
            warn!("Interrupted, flushing current stream");
        }
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let registry = if cli.metrics {
        match MetricsRegistry::new() {
            Ok(registry) => Some(registry),
            Err(e) => {
                warn!("Metrics disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    info!(
        "Processing *.{} in {} ({:?})",
        ext.trim_start_matches('.'),
        cli.dir.display(),
        config.mode
    );

    let results = match process_directory(&cli.dir, &ext, &config, &session) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Processing failed: {}", e);
            std::process::exit(1);
        }
    };

    for stats in &results {
        print_stats(stats);
        if let Some(registry) = &registry {
            registry.record(stats);
        }
    }

    info!("Done. {} file(s) processed", results.len());

    if let Some(registry) = &registry {
        match registry.encode() {
            Ok(text) => print!("{}", text),
            Err(e) => warn!("Failed to encode metrics: {}", e),
        }
    }
}
