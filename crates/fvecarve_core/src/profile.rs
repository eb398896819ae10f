//! Named rule sets for the FVE metadata revisions seen in the wild.
//!
//! Each revision differs only in data: which signature opens the structure,
//! which marker precedes the key, how far apart they may be, and whether a
//! type tag declares the key length. A [`Profile`] carries that data and is
//! passed by reference through the pipeline without ever being mutated.

use serde::{Deserialize, Serialize};

use crate::encryption::{EncryptionType, TAG_WIDTH};
use crate::error::{CoreError, Result};

pub const FVE_SIGNATURE: &[u8] = b"-FVE-FS-";
pub const VMK_MARKER: &[u8] = &[0x03, 0x20, 0x01, 0x00];
pub const XTS_128_MARKER: &[u8] = &[0x04, 0x80, 0x00, 0x00];
pub const DEFAULT_KEY_LEN: usize = 32;
pub const DEFAULT_WINDOW: usize = 4096;
const VERSION_FIELD_WIDTH: usize = 4;
/// Upper bound on any distance a profile may ask the carver to buffer.
pub const MAX_REACH: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    #[serde(with = "hex")]
    pub tag: [u8; TAG_WIDTH],
    #[serde(rename = "type")]
    pub kind: EncryptionType,
}

/// Exact lookup from tag bytes to encryption type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable(Vec<TagEntry>);

impl TypeTable {
    #[must_use]
    pub fn new(entries: Vec<TagEntry>) -> Self {
        Self(entries)
    }

    /// Every known type keyed by its wire tag.
    #[must_use]
    pub fn standard() -> Self {
        Self(
            EncryptionType::KNOWN
                .into_iter()
                .map(|kind| TagEntry {
                    tag: kind.wire_tag().to_be_bytes(),
                    kind,
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn lookup(&self, tag: [u8; TAG_WIDTH]) -> EncryptionType {
        self.0
            .iter()
            .find(|entry| entry.tag == tag)
            .map_or(EncryptionType::Unknown, |entry| entry.kind)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TagEntry> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum UnknownTagPolicy {
    Reject,
    Assume { key_len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum KeyLayout {
    /// No type tag; every key has the same length.
    Fixed { key_len: usize },
    /// A two-byte tag at `marker start + tag_offset` selects the type.
    Tagged {
        table: TypeTable,
        tag_offset: isize,
        unknown: UnknownTagPolicy,
    },
}

impl KeyLayout {
    #[must_use]
    pub fn max_key_len(&self) -> usize {
        match self {
            Self::Fixed { key_len } => *key_len,
            Self::Tagged { table, unknown, .. } => {
                let assumed = match unknown {
                    UnknownTagPolicy::Assume { key_len } => *key_len,
                    UnknownTagPolicy::Reject => 0,
                };
                table
                    .entries()
                    .filter_map(|entry| entry.kind.key_len())
                    .fold(assumed, usize::max)
            }
        }
    }

    /// Bytes a tag may sit before the marker start.
    #[must_use]
    pub fn lookbehind(&self) -> usize {
        match self {
            Self::Tagged { tag_offset, .. } if *tag_offset < 0 => tag_offset.unsigned_abs(),
            _ => 0,
        }
    }

    /// Bytes a tag may extend past the end of the marker.
    fn tag_slack(&self, marker_len: usize) -> usize {
        match self {
            Self::Tagged { tag_offset, .. } if *tag_offset >= 0 => {
                (tag_offset.unsigned_abs().saturating_add(TAG_WIDTH)).saturating_sub(marker_len)
            }
            _ => 0,
        }
    }
}

/// Little-endian `u32` at a fixed offset from the signature start that must
/// hold an expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCheck {
    pub offset: usize,
    pub expected: u32,
}

impl VersionCheck {
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset.saturating_add(VERSION_FIELD_WIDTH)
    }

    #[inline]
    #[must_use]
    pub fn read(&self, bytes: &[u8]) -> Option<u32> {
        let field = bytes.get(self.offset..self.end())?;
        Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "hex")]
    pub signature: Vec<u8>,
    #[serde(with = "hex")]
    pub marker: Vec<u8>,
    pub window: usize,
    pub layout: KeyLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_check: Option<VersionCheck>,
}

impl Profile {
    /// VMK-preceded key with a fixed 32-byte length and a version field of 1.
    #[must_use]
    pub fn fve_vmk() -> Self {
        Self {
            name: "fve-vmk".into(),
            description: "fixed 32-byte key after 03 20 01 00, metadata version 1".into(),
            signature: FVE_SIGNATURE.to_vec(),
            marker: VMK_MARKER.to_vec(),
            window: DEFAULT_WINDOW,
            layout: KeyLayout::Fixed {
                key_len: DEFAULT_KEY_LEN,
            },
            version_check: Some(VersionCheck {
                offset: FVE_SIGNATURE.len() + 4,
                expected: 1,
            }),
        }
    }

    /// Type tag in the two bytes before the VMK marker; unknown tags dropped.
    #[must_use]
    pub fn fve_typed() -> Self {
        Self {
            name: "fve-typed".into(),
            description: "type tag before 03 20 01 00 within 100 bytes".into(),
            signature: FVE_SIGNATURE.to_vec(),
            marker: VMK_MARKER.to_vec(),
            window: 100,
            layout: KeyLayout::Tagged {
                table: TypeTable::standard(),
                tag_offset: -(TAG_WIDTH as isize),
                unknown: UnknownTagPolicy::Reject,
            },
            version_check: None,
        }
    }

    /// Marker whose first two bytes are the XTS-AES-128 tag itself.
    #[must_use]
    pub fn fve_tagged_marker() -> Self {
        Self {
            name: "fve-tagged-marker".into(),
            description: "marker 04 80 00 00 carries the type tag in its head".into(),
            signature: FVE_SIGNATURE.to_vec(),
            marker: XTS_128_MARKER.to_vec(),
            window: DEFAULT_WINDOW,
            layout: KeyLayout::Tagged {
                table: TypeTable::standard(),
                tag_offset: 0,
                unknown: UnknownTagPolicy::Assume {
                    key_len: DEFAULT_KEY_LEN,
                },
            },
            version_check: None,
        }
    }

    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![Self::fve_vmk(), Self::fve_typed(), Self::fve_tagged_marker()]
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.signature.is_empty() {
            return Err(CoreError::EmptyPattern {
                profile: self.name.clone(),
                field: "signature",
            });
        }
        if self.marker.is_empty() {
            return Err(CoreError::EmptyPattern {
                profile: self.name.clone(),
                field: "marker",
            });
        }
        if self.window < self.marker.len() {
            return Err(self.invalid(format!(
                "window of {} bytes cannot hold the {}-byte marker",
                self.window,
                self.marker.len()
            )));
        }
        match &self.layout {
            KeyLayout::Fixed { key_len: 0 } => {
                return Err(self.invalid("fixed key length must be non-zero".into()));
            }
            KeyLayout::Tagged { table, unknown, .. } => {
                if table.entries().any(|e| e.kind == EncryptionType::Unknown) {
                    return Err(self.invalid("type table maps a tag to Unknown".into()));
                }
                if matches!(unknown, UnknownTagPolicy::Assume { key_len: 0 }) {
                    return Err(self.invalid("assumed key length must be non-zero".into()));
                }
            }
            KeyLayout::Fixed { .. } => {}
        }
        let reach = [
            self.window,
            self.layout.max_key_len(),
            self.layout.lookbehind(),
            self.layout.tag_slack(self.marker.len()),
            self.version_check.map_or(0, |check| check.end()),
        ];
        if reach.iter().any(|&r| r > MAX_REACH) {
            return Err(self.invalid(format!(
                "profile reaches past the {MAX_REACH}-byte buffering limit"
            )));
        }
        Ok(())
    }

    /// Bytes past the signature start that must be buffered before the
    /// signature can be judged.
    #[must_use]
    pub fn lookahead(&self) -> usize {
        let key_reach =
            self.window + self.layout.max_key_len() + self.layout.tag_slack(self.marker.len());
        let version_reach = self.version_check.map_or(0, |check| check.end());
        key_reach.max(version_reach).max(self.signature.len())
    }

    /// Bytes before the signature start that evaluation may read.
    #[inline]
    #[must_use]
    pub fn lookbehind(&self) -> usize {
        self.layout.lookbehind()
    }

    fn invalid(&self, reason: String) -> CoreError {
        CoreError::InvalidProfile {
            profile: self.name.clone(),
            reason,
        }
    }
}

/// The set of profiles selectable at startup.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Profile>,
}

impl ProfileRegistry {
    #[must_use]
    pub fn with_builtins() -> Self {
        Self {
            profiles: Profile::builtin(),
        }
    }

    pub fn register(&mut self, profile: Profile) -> Result<()> {
        profile.validate()?;
        if self.profiles.iter().any(|p| p.name == profile.name) {
            return Err(CoreError::InvalidProfile {
                profile: profile.name,
                reason: "a profile with this name is already registered".into(),
            });
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CoreError::UnknownProfile(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
