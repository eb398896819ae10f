//! Streaming candidate-key carver.
//!
//! The carver keeps a carry buffer whose first byte sits at absolute offset
//! `base`. A signature at `s` is judged only once `[s - lookbehind,
//! s + lookahead)` is buffered or the input has ended, and judging reads
//! nothing outside that range. Chunk size therefore never changes the
//! result: feeding the whole dump at once is just the one-chunk case.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::classify;
use crate::correlate::{Correlation, WindowCorrelator};
use crate::error::{CoreError, Result};
use crate::key::{CandidateKey, Offset, Rejection, RejectionCounts, SignatureMatch, ValidatedKey};
use crate::pattern::PatternMatcher;
use crate::profile::Profile;
use crate::traits::BlockSource;
use crate::validation::PlausibilityFilter;

pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub bytes_scanned: u64,
    pub signatures: u64,
    pub validated: u64,
    pub rejections: RejectionCounts,
    pub interrupted: bool,
}

impl ScanSummary {
    /// Signatures that got as far as a carved payload.
    #[must_use]
    pub fn candidates(&self) -> u64 {
        self.validated + self.rejections.truncated + self.rejections.mostly_zero
    }
}

enum Outcome {
    Deferred,
    Key(ValidatedKey),
    Rejected(Rejection),
}

pub struct Carver<'p> {
    profile: &'p Profile,
    signature: PatternMatcher,
    correlator: WindowCorrelator,
    filter: PlausibilityFilter,
    lookahead: usize,
    lookbehind: usize,
    buf: Vec<u8>,
    base: Offset,
    next_signature: Offset,
    summary: ScanSummary,
}

impl<'p> Carver<'p> {
    pub fn new(profile: &'p Profile) -> Result<Self> {
        profile.validate()?;
        let signature = PatternMatcher::new(&profile.signature).map_err(|_| {
            CoreError::EmptyPattern {
                profile: profile.name.clone(),
                field: "signature",
            }
        })?;
        let correlator = WindowCorrelator::new(profile).map_err(|_| CoreError::EmptyPattern {
            profile: profile.name.clone(),
            field: "marker",
        })?;

        Ok(Self {
            profile,
            signature,
            correlator,
            filter: PlausibilityFilter::default(),
            lookahead: profile.lookahead(),
            lookbehind: profile.lookbehind(),
            buf: Vec::new(),
            base: 0,
            next_signature: 0,
            summary: ScanSummary::default(),
        })
    }

    #[must_use]
    pub fn with_filter(mut self, filter: PlausibilityFilter) -> Self {
        self.filter = filter;
        self
    }

    #[inline]
    #[must_use]
    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    /// Bytes currently held in the carry buffer.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Appends the next chunk of the dump and judges every signature whose
    /// surroundings are now fully buffered.
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_key: F) -> Result<()>
    where
        F: FnMut(ValidatedKey) -> Result<()>,
    {
        self.summary.bytes_scanned += chunk.len() as u64;
        self.buf.extend_from_slice(chunk);
        self.drain(false, &mut on_key)
    }

    /// Judges the signatures still pending at end of input.
    pub fn finish<F>(mut self, mut on_key: F) -> Result<ScanSummary>
    where
        F: FnMut(ValidatedKey) -> Result<()>,
    {
        self.drain(true, &mut on_key)?;
        Ok(self.summary)
    }

    /// Stops without judging pending signatures.
    #[must_use]
    pub fn interrupt(mut self) -> ScanSummary {
        self.summary.interrupted = true;
        self.summary
    }

    fn drain<F>(&mut self, at_eof: bool, on_key: &mut F) -> Result<()>
    where
        F: FnMut(ValidatedKey) -> Result<()>,
    {
        let start = (self.next_signature - self.base) as usize;
        let mut deferred = None;

        for rel in self.signature.find_iter(&self.buf[start..]) {
            let sig = start + rel;
            if !at_eof && sig + self.lookahead > self.buf.len() {
                deferred = Some(sig);
                break;
            }

            let found = SignatureMatch(self.base + sig as u64);
            let outcome = evaluate(
                self.profile,
                &self.correlator,
                &self.filter,
                &self.buf,
                self.base,
                sig,
                !at_eof,
            );

            match outcome {
                Outcome::Deferred => {
                    deferred = Some(sig);
                    break;
                }
                Outcome::Key(key) => {
                    self.summary.signatures += 1;
                    self.summary.validated += 1;
                    info!(
                        "{} key at {:#x} ({} bytes, signature at {:#x})",
                        key.kind(),
                        key.offset(),
                        key.len(),
                        found.offset()
                    );
                    on_key(key)?;
                }
                Outcome::Rejected(rejection) => {
                    self.summary.signatures += 1;
                    self.summary.rejections.record(&rejection);
                    debug!("skipping signature at {:#x}: {}", found.offset(), rejection);
                }
            }
        }

        let next_rel = deferred.unwrap_or_else(|| {
            self.buf
                .len()
                .saturating_sub(self.signature.len() - 1)
                .max(start)
        });
        self.next_signature = self.base + next_rel as u64;

        let keep_from = next_rel.saturating_sub(self.lookbehind);
        if keep_from > 0 {
            self.buf.drain(..keep_from);
            self.base += keep_from as u64;
        }
        Ok(())
    }
}

fn evaluate(
    profile: &Profile,
    correlator: &WindowCorrelator,
    filter: &PlausibilityFilter,
    buf: &[u8],
    base: Offset,
    sig: usize,
    more_input: bool,
) -> Outcome {
    if let Some(check) = profile.version_check {
        let found = check.read(&buf[sig..]);
        if found != Some(check.expected) {
            return Outcome::Rejected(Rejection::VersionMismatch {
                found,
                expected: check.expected,
            });
        }
    }

    let (marker_start, key_start) = match correlator.correlate(buf, sig, more_input) {
        Correlation::Found {
            marker_start,
            key_start,
        } => (marker_start, key_start),
        Correlation::Deferred => return Outcome::Deferred,
        Correlation::Missing => return Outcome::Rejected(Rejection::NoSecondaryMarker),
    };

    let (kind, key_len) = match classify(&profile.layout, buf, marker_start) {
        Ok(classified) => classified,
        Err(rejection) => return Outcome::Rejected(rejection),
    };

    let key_end = key_start.saturating_add(key_len).min(buf.len());
    let payload = buf[key_start.min(key_end)..key_end].to_vec();
    let candidate = CandidateKey::new(base + key_start as u64, payload, kind, key_len);

    match filter.check(candidate) {
        Ok(key) => Outcome::Key(key),
        Err(rejection) => Outcome::Rejected(rejection),
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub chunk_size: usize,
    pub filter: PlausibilityFilter,
    /// Cleared by the caller to stop between chunks.
    pub running: Option<Arc<AtomicBool>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            filter: PlausibilityFilter::default(),
            running: None,
        }
    }
}

impl ScanOptions {
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    #[must_use]
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    fn cancelled(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.load(Ordering::SeqCst))
    }
}

/// Reads `source` chunk by chunk through a [`Carver`].
///
/// `on_progress` receives the absolute offset reached after each chunk.
/// A cancelled scan returns the summary so far with `interrupted` set; keys
/// already handed to `on_key` stay valid.
pub fn scan_source<B, K, P>(
    source: &mut B,
    profile: &Profile,
    options: &ScanOptions,
    mut on_key: K,
    mut on_progress: P,
) -> Result<ScanSummary>
where
    B: BlockSource + ?Sized,
    K: FnMut(ValidatedKey) -> Result<()>,
    P: FnMut(u64),
{
    let mut carver = Carver::new(profile)?.with_filter(options.filter);
    let mut chunk = vec![0u8; options.chunk_size.max(1)];
    let mut offset: u64 = 0;

    debug!(
        profile = %profile.name,
        chunk_size = chunk.len(),
        lookahead = profile.lookahead(),
        "scan started"
    );

    loop {
        if options.cancelled() {
            info!(offset, "scan interrupted");
            return Ok(carver.interrupt());
        }

        let bytes_read = source.read_chunk(offset, &mut chunk).map_err(|e| match e {
            CoreError::Io(source) => CoreError::input(format!("read at offset {offset:#x}"), source),
            other => other,
        })?;
        if bytes_read == 0 {
            break;
        }

        carver.feed(&chunk[..bytes_read], &mut on_key)?;
        offset += bytes_read as u64;
        on_progress(offset);
    }

    carver.finish(&mut on_key)
}

/// Carves a fully materialized dump.
pub fn scan_bytes(dump: &[u8], profile: &Profile) -> Result<(Vec<ValidatedKey>, ScanSummary)> {
    let mut keys = Vec::new();
    let mut carver = Carver::new(profile)?;
    carver.feed(dump, |key| {
        keys.push(key);
        Ok(())
    })?;
    let summary = carver.finish(|key| {
        keys.push(key);
        Ok(())
    })?;
    Ok((keys, summary))
}
