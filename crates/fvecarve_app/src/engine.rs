use anyhow::{Context, Result};
use chrono::Utc;
use fvecarve_core::{
    scan_source, BatchSink, BlockSource, Emitter, KeySink, Profile, ScanOptions, ScanSummary,
    ValidatedKey,
};
use fvecarve_io::{batch_file, key_file_path, KeyFileSink, Reader};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cli::OutputMode;
use crate::manifest::Manifest;

pub struct ScanJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: OutputMode,
    pub profile: Profile,
    pub chunk_size: usize,
    pub manifest: Option<PathBuf>,
    pub progress: bool,
}

#[derive(Debug)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub written: usize,
    /// Split-mode key files, or the single batch file when anything was written.
    pub outputs: Vec<PathBuf>,
}

enum OutputSink {
    Split(KeyFileSink),
    Batch(BatchSink<File>),
}

impl OutputSink {
    fn open(mode: OutputMode, output: &Path) -> io::Result<Self> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(match mode {
            OutputMode::Split => OutputSink::Split(KeyFileSink::new(output)),
            OutputMode::Batch => OutputSink::Batch(batch_file(output)?),
        })
    }
}

impl KeySink for OutputSink {
    fn write_key(&mut self, index: usize, key: &ValidatedKey) -> io::Result<()> {
        match self {
            OutputSink::Split(sink) => sink.write_key(index, key),
            OutputSink::Batch(sink) => sink.write_key(index, key),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Split(sink) => sink.flush(),
            OutputSink::Batch(sink) => sink.flush(),
        }
    }
}

fn progress_bar(size: Option<u64>, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    match size {
        Some(total) => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:50.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            {
                pb.set_style(style.progress_chars("##-"));
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("[{elapsed_precise}] {spinner} {bytes} read ({bytes_per_sec})")
            {
                pb.set_style(style);
            }
            pb
        }
    }
}

pub fn run_scan(job: &ScanJob, running: Arc<AtomicBool>) -> Result<ScanReport> {
    let start_time = Instant::now();
    let started = Utc::now();
    let source_name = job.input.display().to_string();

    let mut reader = Reader::open(&job.input)
        .with_context(|| format!("Failed to open input: {source_name}"))?;
    let size = reader.size();

    info!(
        input = %source_name,
        reader = reader.kind(),
        size = %size.map_or_else(|| "unknown".to_string(), |s| format_size(s, BINARY)),
        profile = %job.profile.name,
        "starting scan"
    );

    let sink = OutputSink::open(job.mode, &job.output)
        .with_context(|| format!("Failed to prepare output: {}", job.output.display()))?;
    let mut emitter = Emitter::new(sink);
    let mut manifest = job
        .manifest
        .as_ref()
        .map(|_| Manifest::new(&source_name, &job.profile.name, job.mode.name(), started));

    let pb = progress_bar(size, job.progress);
    let options = ScanOptions::default()
        .with_chunk_size(job.chunk_size)
        .with_running_flag(running);

    let scanned = scan_source(
        &mut reader,
        &job.profile,
        &options,
        |key| {
            let index = emitter.written();
            emitter.emit(&key)?;
            if let Some(manifest) = manifest.as_mut() {
                let file = match job.mode {
                    OutputMode::Split => key_file_path(&job.output, index),
                    OutputMode::Batch => job.output.clone(),
                };
                manifest.record(index, &file.display().to_string(), &key);
            }
            Ok(())
        },
        |offset| pb.set_position(offset),
    );
    pb.finish_and_clear();

    let finished = scanned
        .with_context(|| format!("Scan of {source_name} failed"))
        .and_then(|summary| {
            let (sink, written) = emitter
                .finish()
                .with_context(|| format!("Failed to flush output: {}", job.output.display()))?;
            Ok((summary, sink, written))
        });
    let (summary, sink, written) = match finished {
        Ok(done) => done,
        Err(e) => {
            if let (Some(path), Some(manifest)) = (&job.manifest, manifest.as_mut()) {
                manifest.abort(format!("{e:#}"));
                match manifest.write(path) {
                    Ok(()) => warn!(
                        path = %path.display(),
                        keys = manifest.keys.len(),
                        "partial chain-of-custody manifest written"
                    ),
                    Err(write_err) => {
                        warn!("could not write manifest {}: {write_err:#}", path.display());
                    }
                }
            }
            return Err(e);
        }
    };

    let outputs = match sink {
        OutputSink::Split(sink) => sink.into_paths(),
        OutputSink::Batch(_) if written > 0 => vec![job.output.clone()],
        OutputSink::Batch(_) => Vec::new(),
    };

    if let (Some(path), Some(manifest)) = (&job.manifest, manifest.as_mut()) {
        manifest.close(summary);
        manifest
            .write(path)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
        info!(path = %path.display(), "chain-of-custody manifest written");
    }

    if summary.interrupted {
        warn!(offset = summary.bytes_scanned, "scan interrupted, output is partial");
    }

    print_summary(job, &summary, written, start_time);

    Ok(ScanReport {
        summary,
        written,
        outputs,
    })
}

fn print_summary(job: &ScanJob, summary: &ScanSummary, written: usize, start_time: Instant) {
    let elapsed = start_time.elapsed();
    let rejected = summary.rejections.total();

    println!("\n╔════════════════════════════════════════╗");
    if summary.interrupted {
        println!("║       === Scan Interrupted ===         ║");
    } else {
        println!("║         === Scan Finished ===          ║");
    }
    println!("╠════════════════════════════════════════╣");
    println!(
        "║ Elapsed Time:       {:>18} ║",
        format!("{:.1}s", elapsed.as_secs_f64())
    );
    println!(
        "║ Scanned Space:      {:>18} ║",
        format_size(summary.bytes_scanned, BINARY)
    );
    println!("║ Signatures Found:   {:>18} ║", summary.signatures);
    println!("║ Candidates Rejected:{:>18} ║", rejected);
    println!("║ Keys Written:       {:>18} ║", written);
    println!("╠════════════════════════════════════════╣");
    println!("║ Output ({:<5}):     {:<18} ║", job.mode.name(), job.output.display());
    println!("╚════════════════════════════════════════╝");
}
