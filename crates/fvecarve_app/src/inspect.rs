//! Human-readable views for `fvecarve inspect` and `fvecarve profiles`.

use fvecarve_core::record::KeyRecord;
use fvecarve_core::validation::shannon_entropy;
use fvecarve_core::{KeyLayout, Profile};
use std::fmt::Write;

pub fn render_records(records: &[KeyRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<18} {:<12} {:>6} {:>8}  KEY",
        "INDEX", "OFFSET", "TYPE", "BYTES", "ENTROPY"
    );
    let _ = writeln!(out, "{}", "-".repeat(72));

    for (index, record) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<6} 0x{:016X} {:<12} {:>6} {:>8.3}  {}",
            index,
            record.offset,
            record.kind().name(),
            record.payload.len(),
            shannon_entropy(&record.payload),
            hex::encode(&record.payload)
        );
    }
    out
}

fn layout_summary(layout: &KeyLayout) -> String {
    match layout {
        KeyLayout::Fixed { key_len } => format!("fixed {key_len}-byte key"),
        KeyLayout::Tagged { tag_offset, .. } => format!("type tag at marker{tag_offset:+}"),
    }
}

pub fn render_profiles<'a>(profiles: impl IntoIterator<Item = &'a Profile>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<10} {:>7}  {:<24} DESCRIPTION",
        "NAME", "MARKER", "WINDOW", "LAYOUT"
    );
    let _ = writeln!(out, "{}", "-".repeat(90));

    for profile in profiles {
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:>7}  {:<24} {}",
            profile.name,
            hex::encode(&profile.marker),
            profile.window,
            layout_summary(&profile.layout),
            profile.description
        );
    }
    out
}
