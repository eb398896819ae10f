use serde::{Deserialize, Serialize};

/// Width of the on-disk encryption type tag.
pub const TAG_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionType {
    XtsAes128,
    XtsAes256,
    AesCbc128,
    AesCbc256,
    Unknown,
}

impl EncryptionType {
    pub const KNOWN: [EncryptionType; 4] = [
        Self::AesCbc128,
        Self::AesCbc256,
        Self::XtsAes128,
        Self::XtsAes256,
    ];

    /// Big-endian reading of the two tag bytes as they appear in memory.
    #[must_use]
    pub const fn wire_tag(&self) -> u16 {
        match self {
            Self::AesCbc128 => 0x0280,
            Self::AesCbc256 => 0x0380,
            Self::XtsAes128 => 0x0480,
            Self::XtsAes256 => 0x0580,
            Self::Unknown => 0x0000,
        }
    }

    #[must_use]
    pub fn from_wire_tag(tag: u16) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.wire_tag() == tag)
            .unwrap_or(Self::Unknown)
    }

    /// Bytes of key material for this algorithm. XTS carries two AES keys
    /// (data and tweak), so its length is twice the AES key size.
    ///
    /// `Unknown` has no intrinsic length; the active profile supplies one.
    #[must_use]
    pub const fn key_len(&self) -> Option<usize> {
        match self {
            Self::AesCbc128 => Some(16),
            Self::AesCbc256 => Some(32),
            Self::XtsAes128 => Some(32),
            Self::XtsAes256 => Some(64),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::XtsAes128 => "XTS-AES-128",
            Self::XtsAes256 => "XTS-AES-256",
            Self::AesCbc128 => "AES-CBC-128",
            Self::AesCbc256 => "AES-CBC-256",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for EncryptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
