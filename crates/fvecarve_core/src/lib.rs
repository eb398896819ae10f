pub mod carving;
pub mod classify;
pub mod correlate;
pub mod emit;
pub mod encryption;
mod error;
pub mod key;
pub mod pattern;
pub mod profile;
pub mod record;
mod traits;
pub mod validation;

pub use carving::{scan_bytes, scan_source, Carver, ScanOptions, ScanSummary};
pub use emit::{BatchSink, Emitter};
pub use encryption::EncryptionType;
pub use error::{CoreError, Result};
pub use key::{CandidateKey, Offset, Rejection, SignatureMatch, ValidatedKey};
pub use pattern::PatternMatcher;
pub use profile::{KeyLayout, Profile, ProfileRegistry};
pub use traits::{BlockSource, KeySink};
pub use validation::PlausibilityFilter;
