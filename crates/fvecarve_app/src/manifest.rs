//! Chain-of-custody manifest for recovered keys.

use chrono::{DateTime, Utc};
use fvecarve_core::validation::shannon_entropy;
use fvecarve_core::{ScanSummary, ValidatedKey};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct KeyCustody {
    pub index: usize,
    pub file: String,
    pub source_offset: String,
    pub source_offset_decimal: u64,
    pub key_type: String,
    pub key_length: usize,
    pub sha256_hash: String,
    pub entropy: f32,
    pub recovery_timestamp: String,
}

impl KeyCustody {
    pub fn new(index: usize, file: &str, key: &ValidatedKey) -> Self {
        Self {
            index,
            file: file.to_string(),
            source_offset: format!("0x{:016X}", key.offset()),
            source_offset_decimal: key.offset(),
            key_type: key.kind().name().to_string(),
            key_length: key.len(),
            sha256_hash: compute_sha256(key.payload()),
            entropy: shannon_entropy(key.payload()),
            recovery_timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub tool: &'static str,
    pub version: &'static str,
    pub source: String,
    pub profile: String,
    pub mode: &'static str,
    pub started: String,
    pub finished: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScanSummary>,
    /// Set when the scan failed; `keys` then lists only what reached disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub keys: Vec<KeyCustody>,
}

impl Manifest {
    pub fn new(source: &str, profile: &str, mode: &'static str, started: DateTime<Utc>) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            source: source.to_string(),
            profile: profile.to_string(),
            mode,
            started: started.to_rfc3339(),
            finished: String::new(),
            summary: None,
            error: None,
            keys: Vec::new(),
        }
    }

    pub fn record(&mut self, index: usize, file: &str, key: &ValidatedKey) {
        self.keys.push(KeyCustody::new(index, file, key));
    }

    pub fn close(&mut self, summary: ScanSummary) {
        self.summary = Some(summary);
        self.finished = Utc::now().to_rfc3339();
    }

    pub fn abort(&mut self, reason: String) {
        self.error = Some(reason);
        self.finished = Utc::now().to_rfc3339();
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
