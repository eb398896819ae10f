//! fvecarve - BitLocker key carver for memory dumps.
//!
//! Scans a raw memory image for FVE metadata and writes the key material
//! that follows it.

mod cli;
mod engine;
mod inspect;
mod manifest;

use anyhow::{Context, Result};
use clap::Parser;
use fvecarve_core::record::decode_records;
use fvecarve_core::{CoreError, Profile};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputMode, ScanArgs};
use engine::{run_scan, ScanJob, ScanReport};

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
/// Exit status for a scan stopped by Ctrl+C.
const EXIT_INTERRUPTED: u8 = 130;

enum Outcome {
    Done,
    Scanned(ScanReport),
}

/// Success covers scans that found nothing; any error is a failure.
fn exit_status(outcome: &Result<Outcome>) -> u8 {
    match outcome {
        Ok(Outcome::Scanned(report)) if report.summary.interrupted => EXIT_INTERRUPTED,
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}

fn report_failure(e: &anyhow::Error) {
    error!("{e:#}");
    if let Some(written) = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<CoreError>())
        .and_then(CoreError::records_written)
    {
        error!("{written} key(s) were written before the failure");
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = run(cli);
    if let Err(e) = &outcome {
        report_failure(e);
    }
    ExitCode::from(exit_status(&outcome))
}

fn run(cli: Cli) -> Result<Outcome> {
    match cli.command {
        Command::Scan(args) => {
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                r.store(false, Ordering::SeqCst);
            })
            .context("Failed to set Ctrl+C handler")?;

            scan(&args, running).map(Outcome::Scanned)
        }
        Command::Profiles { json } => {
            let builtins = Profile::builtin();
            if json {
                println!("{}", serde_json::to_string_pretty(&builtins)?);
            } else {
                print!("{}", inspect::render_profiles(&builtins));
            }
            Ok(Outcome::Done)
        }
        Command::Inspect { path } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
            let records = decode_records(&data)
                .with_context(|| format!("Failed to decode batch file: {}", path.display()))?;
            print!("{}", inspect::render_records(&records));
            info!("{} record(s) in {}", records.len(), path.display());
            Ok(Outcome::Done)
        }
    }
}

fn scan(args: &ScanArgs, running: Arc<AtomicBool>) -> Result<ScanReport> {
    let profile = args.resolve_profile()?;

    let job = ScanJob {
        input: args.input.clone(),
        output: args.output_path(),
        mode: args.mode,
        profile,
        chunk_size: args.chunk_size,
        manifest: args.manifest.clone(),
        progress: !args.no_progress,
    };

    let report = run_scan(&job, running)?;

    if report.written == 0 {
        info!("no valid key found");
    } else if let Some(first) = report.outputs.first() {
        match job.mode {
            OutputMode::Split => {
                info!("try decrypting the volume with the extracted key, for example with dislocker:");
                info!(
                    "sudo dislocker -V /dev/sdX -k {} --dislocker-file your_dislocker.img",
                    first.display()
                );
            }
            OutputMode::Batch => {
                info!(
                    "inspect the records with `fvecarve inspect {}`, or rescan with --mode split for per-key files usable by dislocker",
                    first.display()
                );
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fvecarve_core::profile::{FVE_SIGNATURE, VMK_MARKER};
    use std::fs;
    use std::path::Path;

    fn scan_args(input: &Path, output: &Path, extra: &[&str]) -> ScanArgs {
        let input = input.to_str().unwrap();
        let output = output.to_str().unwrap();
        let mut argv = vec!["fvecarve", "scan", "-i", input, "-o", output, "--no-progress"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Scan(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn dump_file(dir: &Path, with_key: bool) -> std::path::PathBuf {
        let mut dump = vec![0x5Au8; 256];
        if with_key {
            let mut structure = FVE_SIGNATURE.to_vec();
            structure.resize(40, 0);
            structure[12..16].copy_from_slice(&1u32.to_le_bytes());
            structure.extend_from_slice(VMK_MARKER);
            structure.extend(1..=32u8);
            dump.extend(structure);
        }
        let path = dir.join("memory.raw");
        fs::write(&path, dump).unwrap();
        path
    }

    fn status(args: &ScanArgs, running: bool) -> (u8, Result<Outcome>) {
        let outcome = scan(args, Arc::new(AtomicBool::new(running))).map(Outcome::Scanned);
        (exit_status(&outcome), outcome)
    }

    #[test]
    fn scan_with_keys_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let args = scan_args(&dump_file(dir.path(), true), &dir.path().join("fvek"), &[]);

        let (code, outcome) = status(&args, true);
        assert_eq!(code, EXIT_SUCCESS);
        assert!(matches!(outcome, Ok(Outcome::Scanned(report)) if report.written == 1));
    }

    #[test]
    fn scan_without_keys_still_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let args = scan_args(&dump_file(dir.path(), false), &dir.path().join("fvek"), &[]);

        let (code, outcome) = status(&args, true);
        assert_eq!(code, EXIT_SUCCESS);
        assert!(matches!(outcome, Ok(Outcome::Scanned(report)) if report.written == 0));
    }

    #[test]
    fn interrupted_scan_exits_130() {
        let dir = tempfile::tempdir().unwrap();
        let args = scan_args(&dump_file(dir.path(), true), &dir.path().join("fvek"), &[]);

        let (code, _) = status(&args, false);
        assert_eq!(code, EXIT_INTERRUPTED);
    }

    #[test]
    fn unreadable_input_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let args = scan_args(&dir.path().join("absent.raw"), &dir.path().join("fvek"), &[]);

        let (code, outcome) = status(&args, true);
        assert_eq!(code, EXIT_FAILURE);
        assert!(outcome.is_err());
    }

    #[test]
    fn configuration_error_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let input = dump_file(dir.path(), true);
        let args = scan_args(&input, &dir.path().join("fvek"), &["-p", "fve-none"]);

        let (code, _) = status(&args, true);
        assert_eq!(code, EXIT_FAILURE);
        assert!(!dir.path().join("fvek_0").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unwritable_output_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let input = dump_file(dir.path(), true);
        let output = dir.path().join("fvek");
        if !Path::new("/dev/full").exists() {
            return;
        }
        std::os::unix::fs::symlink("/dev/full", dir.path().join("fvek_0")).unwrap();

        let (code, _) = status(&scan_args(&input, &output, &[]), true);
        assert_eq!(code, EXIT_FAILURE);
    }

    #[test]
    fn listing_commands_exit_zero() {
        assert_eq!(exit_status(&Ok(Outcome::Done)), EXIT_SUCCESS);
    }
}
