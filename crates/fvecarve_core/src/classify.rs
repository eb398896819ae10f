use crate::encryption::{EncryptionType, TAG_WIDTH};
use crate::key::Rejection;
use crate::profile::{KeyLayout, UnknownTagPolicy};

/// Encryption type and key length for a marker at `marker_start` in `buf`.
///
/// Tagged layouts read the tag bytes at `marker_start + tag_offset` and look
/// them up exactly. Unrecognized bytes classify as `Unknown`, which the
/// layout's policy either rejects or assigns a fixed length.
pub fn classify(
    layout: &KeyLayout,
    buf: &[u8],
    marker_start: usize,
) -> Result<(EncryptionType, usize), Rejection> {
    let (table, tag_offset, unknown) = match layout {
        KeyLayout::Fixed { key_len } => return Ok((EncryptionType::Unknown, *key_len)),
        KeyLayout::Tagged {
            table,
            tag_offset,
            unknown,
        } => (table, *tag_offset, *unknown),
    };

    let tag = marker_start
        .checked_add_signed(tag_offset)
        .and_then(|pos| buf.get(pos..pos + TAG_WIDTH))
        .map(|bytes| [bytes[0], bytes[1]])
        .ok_or(Rejection::TagUnavailable)?;

    let kind = table.lookup(tag);
    match (kind.key_len(), unknown) {
        (Some(len), _) => Ok((kind, len)),
        (None, UnknownTagPolicy::Assume { key_len }) => Ok((EncryptionType::Unknown, key_len)),
        (None, UnknownTagPolicy::Reject) => Err(Rejection::UnrecognizedTag(tag)),
    }
}
