use serde::Serialize;

use crate::encryption::EncryptionType;

pub type Offset = u64;

/// Absolute offset where the primary signature begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignatureMatch(pub Offset);

impl SignatureMatch {
    #[inline]
    #[must_use]
    pub fn offset(&self) -> Offset {
        self.0
    }
}

/// Bytes carved after a marker, not yet judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKey {
    offset: Offset,
    payload: Vec<u8>,
    kind: EncryptionType,
    declared_len: usize,
}

impl CandidateKey {
    #[must_use]
    pub fn new(offset: Offset, payload: Vec<u8>, kind: EncryptionType, declared_len: usize) -> Self {
        Self {
            offset,
            payload,
            kind,
            declared_len,
        }
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> EncryptionType {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn declared_len(&self) -> usize {
        self.declared_len
    }
}

/// A candidate that passed the plausibility filter.
///
/// Only [`crate::validation::PlausibilityFilter`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedKey {
    offset: Offset,
    payload: Vec<u8>,
    kind: EncryptionType,
}

impl ValidatedKey {
    pub(crate) fn from_candidate(candidate: CandidateKey) -> Self {
        Self {
            offset: candidate.offset,
            payload: candidate.payload,
            kind: candidate.kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> EncryptionType {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Why a signature match did not produce a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoSecondaryMarker,
    VersionMismatch { found: Option<u32>, expected: u32 },
    TagUnavailable,
    UnrecognizedTag([u8; 2]),
    Truncated { expected: usize, actual: usize },
    MostlyZero { zeros: usize, len: usize },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSecondaryMarker => write!(f, "no secondary marker within window"),
            Self::VersionMismatch {
                found: Some(found),
                expected,
            } => write!(f, "version mismatch ({found}, expected {expected})"),
            Self::VersionMismatch {
                found: None,
                expected,
            } => write!(f, "version field past end of dump (expected {expected})"),
            Self::TagUnavailable => write!(f, "type tag lies outside the dump"),
            Self::UnrecognizedTag(tag) => write!(f, "unrecognized type tag {:02x}{:02x}", tag[0], tag[1]),
            Self::Truncated { expected, actual } => {
                write!(f, "key truncated ({actual} of {expected} bytes)")
            }
            Self::MostlyZero { zeros, len } => write!(f, "{zeros} of {len} bytes are zero"),
        }
    }
}

/// Per-reason rejection counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub no_secondary_marker: u64,
    pub version_mismatch: u64,
    pub tag_unavailable: u64,
    pub unrecognized_tag: u64,
    pub truncated: u64,
    pub mostly_zero: u64,
}

impl RejectionCounts {
    pub fn record(&mut self, rejection: &Rejection) {
        let slot = match rejection {
            Rejection::NoSecondaryMarker => &mut self.no_secondary_marker,
            Rejection::VersionMismatch { .. } => &mut self.version_mismatch,
            Rejection::TagUnavailable => &mut self.tag_unavailable,
            Rejection::UnrecognizedTag(_) => &mut self.unrecognized_tag,
            Rejection::Truncated { .. } => &mut self.truncated,
            Rejection::MostlyZero { .. } => &mut self.mostly_zero,
        };
        *slot += 1;
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.no_secondary_marker
            + self.version_mismatch
            + self.tag_unavailable
            + self.unrecognized_tag
            + self.truncated
            + self.mostly_zero
    }
}
