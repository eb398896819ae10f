use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fvecarve_core::carving::DEFAULT_CHUNK_SIZE;
use fvecarve_core::{Profile, ProfileRegistry};
use std::fs;
use std::path::PathBuf;

/// Profile used when neither `--profile` nor `--profile-file` names one.
pub const DEFAULT_PROFILE: &str = "fve-vmk";

#[derive(Parser, Debug)]
#[command(name = "fvecarve")]
#[command(author, version, about = "Carve BitLocker FVE key material out of memory dumps", long_about = None)]
pub struct Cli {
    /// Log signature hits and rejections (same as RUST_LOG=debug).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a dump and write every plausible key.
    Scan(ScanArgs),

    /// List the built-in format profiles.
    Profiles {
        /// Print the profiles as JSON, usable as a --profile-file template.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Decode and print a batch output file.
    Inspect {
        path: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// One raw key per file, named `<output>_<index>`.
    Split,
    /// All keys in one record stream.
    Batch,
}

impl OutputMode {
    pub fn default_output(self) -> PathBuf {
        match self {
            OutputMode::Split => PathBuf::from("extracted_fvek.bin"),
            OutputMode::Batch => PathBuf::from("bitlocker_keys.bin"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputMode::Split => "split",
            OutputMode::Batch => "batch",
        }
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Memory dump, raw device, or `-` for standard input.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Split-mode base name or batch file path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputMode::Split)]
    pub mode: OutputMode,

    /// Built-in or custom profile name.
    #[arg(short, long)]
    pub profile: Option<String>,

    /// JSON file with an additional profile.
    #[arg(long)]
    pub profile_file: Option<PathBuf>,

    /// Override the profile's marker search window, in bytes.
    #[arg(long)]
    pub window: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Write a chain-of-custody manifest for the recovered keys.
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

impl ScanArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.mode.default_output())
    }

    /// Picks the profile to scan with, after loading any custom profile and
    /// applying `--window`.
    pub fn resolve_profile(&self) -> Result<Profile> {
        ensure!(self.chunk_size > 0, "--chunk-size must be at least 1 byte");

        let mut registry = ProfileRegistry::with_builtins();
        let mut loaded = None;

        if let Some(path) = &self.profile_file {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read profile file: {}", path.display()))?;
            let profile = Profile::from_json(&text)
                .with_context(|| format!("Invalid profile file: {}", path.display()))?;
            loaded = Some(profile.name.clone());
            registry.register(profile)?;
        }

        let name = self
            .profile
            .as_deref()
            .or(loaded.as_deref())
            .unwrap_or(DEFAULT_PROFILE);
        let mut profile = registry.get(name)?.clone();

        if let Some(window) = self.window {
            profile = profile.with_window(window);
            profile.validate()?;
        }

        Ok(profile)
    }
}
