use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Input unreadable ({context}): {source}")]
    InputUnreadable {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Output unwritable after {written} record(s): {source}")]
    OutputUnwritable {
        written: usize,
        #[source]
        source: io::Error,
    },

    #[error("Profile `{profile}`: {field} pattern is empty")]
    EmptyPattern {
        profile: String,
        field: &'static str,
    },

    #[error("Profile `{profile}` is invalid: {reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Profile definition could not be parsed: {0}")]
    ProfileFormat(#[from] serde_json::Error),

    #[error("Malformed record at byte {offset}: {reason}")]
    MalformedRecord { offset: u64, reason: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    pub fn input(context: impl Into<String>, source: io::Error) -> Self {
        Self::InputUnreadable {
            context: context.into(),
            source,
        }
    }

    /// Number of records that reached the sink before the run failed, when that is known.
    #[must_use]
    pub fn records_written(&self) -> Option<usize> {
        match self {
            Self::OutputUnwritable { written, .. } => Some(*written),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
