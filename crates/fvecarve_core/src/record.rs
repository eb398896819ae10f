//! Batch-mode record layout.
//!
//! ```text
//! offset   u64 big-endian   absolute key offset in the dump
//! type     u16 big-endian   EncryptionType wire tag
//! length   u32 big-endian   payload length
//! payload  [u8; length]
//! ```

use crate::encryption::EncryptionType;
use crate::error::{CoreError, Result};
use crate::key::{Offset, ValidatedKey};

pub const RECORD_HEADER_LEN: usize = 8 + 2 + 4;

/// A decoded batch record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub offset: Offset,
    pub type_tag: u16,
    pub payload: Vec<u8>,
}

impl KeyRecord {
    #[must_use]
    pub fn kind(&self) -> EncryptionType {
        EncryptionType::from_wire_tag(self.type_tag)
    }
}

impl From<&ValidatedKey> for KeyRecord {
    fn from(key: &ValidatedKey) -> Self {
        Self {
            offset: key.offset(),
            type_tag: key.kind().wire_tag(),
            payload: key.payload().to_vec(),
        }
    }
}

pub fn encode_record(key: &ValidatedKey, out: &mut Vec<u8>) {
    out.reserve(RECORD_HEADER_LEN + key.len());
    out.extend_from_slice(&key.offset().to_be_bytes());
    out.extend_from_slice(&key.kind().wire_tag().to_be_bytes());
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(key.payload());
}

/// Decodes every record in `data`.
///
/// Fails on a trailing partial header or a payload that runs past the end.
pub fn decode_records(data: &[u8]) -> Result<Vec<KeyRecord>> {
    let mut records = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let header = data
            .get(pos..pos + RECORD_HEADER_LEN)
            .ok_or(CoreError::MalformedRecord {
                offset: pos as u64,
                reason: "truncated record header",
            })?;

        let mut offset = [0u8; 8];
        offset.copy_from_slice(&header[0..8]);
        let type_tag = u16::from_be_bytes([header[8], header[9]]);
        let length = u32::from_be_bytes([header[10], header[11], header[12], header[13]]) as usize;

        let start = pos + RECORD_HEADER_LEN;
        let payload = start
            .checked_add(length)
            .and_then(|end| data.get(start..end))
            .ok_or(CoreError::MalformedRecord {
                offset: pos as u64,
                reason: "payload runs past end of stream",
            })?;

        records.push(KeyRecord {
            offset: u64::from_be_bytes(offset),
            type_tag,
            payload: payload.to_vec(),
        });
        pos = start + length;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CandidateKey;
    use crate::validation::PlausibilityFilter;

    fn key(offset: u64, kind: EncryptionType, len: usize) -> ValidatedKey {
        let payload = (0..len).map(|i| (i as u8).wrapping_mul(37) | 0x40).collect();
        PlausibilityFilter::default()
            .check(CandidateKey::new(offset, payload, kind, len))
            .unwrap()
    }

    #[test]
    fn layout_is_big_endian() {
        let mut out = Vec::new();
        encode_record(&key(0x0102_0304_0506_0708, EncryptionType::XtsAes128, 32), &mut out);

        assert_eq!(out.len(), RECORD_HEADER_LEN + 32);
        assert_eq!(&out[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&out[8..10], &[0x04, 0x80]);
        assert_eq!(&out[10..14], &[0, 0, 0, 32]);
    }

    #[test]
    fn decode_restores_offset_tag_length_and_payload() {
        let original = key(0x7FFF_0010, EncryptionType::AesCbc128, 16);
        let mut out = Vec::new();
        encode_record(&original, &mut out);

        let records = decode_records(&out).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], KeyRecord::from(&original));
        assert_eq!(records[0].kind(), EncryptionType::AesCbc128);
        assert_eq!(records[0].payload.len(), 16);
    }

    #[test]
    fn concatenated_records_keep_order() {
        let keys = [
            key(10, EncryptionType::Unknown, 32),
            key(20, EncryptionType::XtsAes256, 64),
            key(30, EncryptionType::AesCbc256, 32),
        ];
        let mut out = Vec::new();
        for k in &keys {
            encode_record(k, &mut out);
        }
        let offsets: Vec<_> = decode_records(&out).unwrap().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![10, 20, 30]);
    }

    #[test]
    fn empty_stream_has_no_records() {
        assert!(decode_records(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_header_is_malformed() {
        let mut out = Vec::new();
        encode_record(&key(1, EncryptionType::Unknown, 32), &mut out);
        out.extend_from_slice(&[0, 0, 0]);
        let err = decode_records(&out).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedRecord { offset: 46, .. }
        ));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut out = Vec::new();
        encode_record(&key(1, EncryptionType::Unknown, 32), &mut out);
        out.truncate(out.len() - 1);
        assert!(decode_records(&out).is_err());
    }
}
