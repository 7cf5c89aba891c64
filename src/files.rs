//! File and directory processing.
//!
//! Each input file is streamed through its own pipeline into a sibling
//! output file named after the mode, e.g. `noise.bin-neumann-debiased.bin`.

use crate::config::{DebiasConfig, Mode};
use crate::error::DebiasError;
use crate::pipeline::{CancelToken, DebiasStream, StreamReport};
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Marker shared by every output suffix.
const OUTPUT_MARKER: &str = "-debiased.bin";

/// Summary of one processed stream.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    /// Input file name.
    pub name: String,
    /// Bytes read from the input.
    pub bytes_in: u64,
    /// Bytes written to the output.
    pub bytes_out: u64,
    /// Wall-clock processing time.
    pub duration: Duration,
    /// Mode the stream ran in.
    pub mode: Mode,
    /// When processing began.
    pub started_at: DateTime<Utc>,
    /// Path of the written output file.
    pub output: PathBuf,
    /// Producer counters.
    pub report: StreamReport,
}

impl Stats {
    /// Output bytes per input byte.
    pub fn yield_ratio(&self) -> f64 {
        if self.bytes_in == 0 {
            return 0.0;
        }
        self.bytes_out as f64 / self.bytes_in as f64
    }
}

/// Returns the output path for `input` under `mode`.
pub fn output_path(input: &Path, mode: Mode) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", name, mode.output_suffix()))
}

/// Debiases a single file into its sibling output file.
pub fn process_file(
    path: &Path,
    config: &DebiasConfig,
    token: CancelToken,
) -> Result<Stats, DebiasError> {
    let started_at = Utc::now();
    let start = Instant::now();

    let input = File::open(path)?;
    let output = output_path(path, config.mode);

    let mut stream = DebiasStream::spawn_with(input, config, token, OsRng)?;
    let mut writer = BufWriter::new(File::create(&output)?);

    // A sink failure drops the reader, which stops the producer.
    let copied = std::io::copy(stream.reader(), &mut writer).and_then(|n| {
        writer.flush()?;
        Ok(n)
    });
    let (reader, handle) = stream.into_parts();
    drop(reader);

    let report = match (copied, handle.join()) {
        (Ok(_), Ok(report)) => report,
        (Err(e), Err(DebiasError::ConsumerClosed)) => return Err(e.into()),
        (_, Err(e)) => return Err(e),
        (Err(e), Ok(_)) => return Err(e.into()),
    };

    let duration = start.elapsed();
    let stats = Stats {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        bytes_in: report.bytes_in,
        bytes_out: report.bytes_out,
        duration,
        mode: config.mode,
        started_at,
        output,
        report,
    };

    tracing::info!(
        file = %stats.name,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        duration_ms = duration.as_millis() as u64,
        output = %stats.output.display(),
        "Processed file"
    );

    Ok(stats)
}

/// Returns true if `path` has extension `ext` and is not one of our outputs.
fn is_candidate(path: &Path, ext: &str) -> bool {
    let name = match path.file_name() {
        Some(n) => n.to_string_lossy(),
        None => return false,
    };
    if name.ends_with(OUTPUT_MARKER) {
        return false;
    }
    path.extension().map(|e| e.to_string_lossy() == ext).unwrap_or(false)
}

/// Debiases every file in `dir` with extension `ext`, in name order.
///
/// A leading dot in `ext` is optional. Each file gets a child of
/// `session`; once `session` is cancelled the current file is flushed and
/// no further files are started.
pub fn process_directory(
    dir: &Path,
    ext: &str,
    config: &DebiasConfig,
    session: &CancelToken,
) -> Result<Vec<Stats>, DebiasError> {
    config.validate()?;
    let ext = ext.trim_start_matches('.');

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_candidate(&path, ext) {
            files.push(path);
        }
    }
    files.sort();

    tracing::debug!(dir = %dir.display(), ext, count = files.len(), "Found input files");

    let mut stats = Vec::with_capacity(files.len());
    for path in files {
        if session.is_cancelled() {
            tracing::warn!("Session cancelled, skipping remaining files");
            break;
        }
        tracing::info!(file = %path.display(), "Processing");
        stats.push(process_file(&path, config, session.child())?);
    }

    Ok(stats)
}
