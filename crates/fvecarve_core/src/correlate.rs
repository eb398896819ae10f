use crate::error::Result;
use crate::pattern::PatternMatcher;
use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// Marker found; offsets are relative to the searched buffer.
    Found { marker_start: usize, key_start: usize },
    /// The window runs past the buffered bytes and more input may follow.
    Deferred,
    /// Whole window (or the rest of the dump) examined without a marker.
    Missing,
}

/// Scoped secondary-marker search following each signature match.
#[derive(Debug, Clone)]
pub struct WindowCorrelator {
    marker: PatternMatcher,
    window: usize,
}

impl WindowCorrelator {
    pub fn new(profile: &Profile) -> Result<Self> {
        Ok(Self {
            marker: PatternMatcher::new(&profile.marker)?,
            window: profile.window,
        })
    }

    /// Searches `buf[signature .. signature + window]` for the marker. The
    /// lowest occurrence wins.
    ///
    /// `more_input` tells whether bytes past the end of `buf` may still
    /// arrive; without it a short window is final.
    #[must_use]
    pub fn correlate(&self, buf: &[u8], signature: usize, more_input: bool) -> Correlation {
        let window_end = signature.saturating_add(self.window);
        let end = window_end.min(buf.len());
        let Some(window) = buf.get(signature..end) else {
            return if more_input {
                Correlation::Deferred
            } else {
                Correlation::Missing
            };
        };

        match self.marker.find_first(window) {
            Some(k) => Correlation::Found {
                marker_start: signature + k,
                key_start: signature + k + self.marker.len(),
            },
            None if more_input && end < window_end => Correlation::Deferred,
            None => Correlation::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlator(window: usize) -> WindowCorrelator {
        WindowCorrelator::new(&Profile::fve_vmk().with_window(window)).unwrap()
    }

    #[test]
    fn key_start_follows_marker() {
        let mut buf = vec![0u8; 64];
        buf[0..8].copy_from_slice(b"-FVE-FS-");
        buf[20..24].copy_from_slice(&[0x03, 0x20, 0x01, 0x00]);
        assert_eq!(
            correlator(64).correlate(&buf, 0, false),
            Correlation::Found {
                marker_start: 20,
                key_start: 24
            }
        );
    }

    #[test]
    fn first_marker_in_window_wins() {
        let mut buf = vec![0u8; 64];
        buf[10..14].copy_from_slice(&[0x03, 0x20, 0x01, 0x00]);
        buf[30..34].copy_from_slice(&[0x03, 0x20, 0x01, 0x00]);
        assert!(matches!(
            correlator(64).correlate(&buf, 0, false),
            Correlation::Found { marker_start: 10, .. }
        ));
    }

    #[test]
    fn marker_must_fit_inside_window() {
        let mut buf = vec![0u8; 64];
        buf[30..34].copy_from_slice(&[0x03, 0x20, 0x01, 0x00]);
        assert_eq!(correlator(33).correlate(&buf, 0, false), Correlation::Missing);
        assert!(matches!(
            correlator(34).correlate(&buf, 0, false),
            Correlation::Found { .. }
        ));
    }

    #[test]
    fn short_window_defers_while_input_remains() {
        let buf = vec![0u8; 16];
        assert_eq!(correlator(64).correlate(&buf, 4, true), Correlation::Deferred);
        assert_eq!(correlator(64).correlate(&buf, 4, false), Correlation::Missing);
    }

    #[test]
    fn full_window_without_marker_is_final() {
        let buf = vec![0u8; 128];
        assert_eq!(correlator(64).correlate(&buf, 0, true), Correlation::Missing);
    }
}
