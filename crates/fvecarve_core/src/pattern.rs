use memchr::memmem::Finder;

use crate::error::{CoreError, Result};

/// Fixed byte-sequence search over a buffer.
///
/// Wraps a `memchr` finder and, unlike `Finder::find_iter`, reports
/// overlapping occurrences.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    finder: Finder<'static>,
}

impl PatternMatcher {
    pub fn new(pattern: &[u8]) -> Result<Self> {
        if pattern.is_empty() {
            return Err(CoreError::EmptyPattern {
                profile: String::from("<inline>"),
                field: "search",
            });
        }
        Ok(Self {
            finder: Finder::new(pattern).into_owned(),
        })
    }

    /// Needle length, never zero.
    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.finder.needle().len()
    }

    #[inline]
    #[must_use]
    pub fn find_first(&self, haystack: &[u8]) -> Option<usize> {
        self.finder.find(haystack)
    }

    /// Every start offset of the pattern in `haystack`, lowest first.
    ///
    /// The iterator borrows both the matcher and the buffer, so calling this
    /// again restarts the search from the beginning.
    #[inline]
    #[must_use]
    pub fn find_iter<'m, 'h>(&'m self, haystack: &'h [u8]) -> Matches<'m, 'h> {
        Matches {
            finder: &self.finder,
            haystack,
            pos: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Matches<'m, 'h> {
    finder: &'m Finder<'static>,
    haystack: &'h [u8],
    pos: usize,
}

impl Iterator for Matches<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let rest = self.haystack.get(self.pos..)?;
        let found = self.pos + self.finder.find(rest)?;
        self.pos = found + 1;
        Some(found)
    }
}

impl std::iter::FusedIterator for Matches<'_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(haystack: &[u8], pattern: &[u8]) -> Vec<usize> {
        if haystack.len() < pattern.len() {
            return Vec::new();
        }
        (0..=haystack.len() - pattern.len())
            .filter(|&i| &haystack[i..i + pattern.len()] == pattern)
            .collect()
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let err = PatternMatcher::new(&[]).unwrap_err();
        assert!(matches!(err, CoreError::EmptyPattern { .. }));
    }

    #[test]
    fn single_match() {
        let matcher = PatternMatcher::new(b"-FVE-FS-").unwrap();
        let buffer = [&[0x00, 0x11, 0x22][..], b"-FVE-FS-", &[0xAA][..]].concat();
        assert_eq!(matcher.find_iter(&buffer).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let matcher = PatternMatcher::new(&[0x03, 0x20, 0x01, 0x00]).unwrap();
        assert_eq!(matcher.find_iter(&[0u8; 64]).count(), 0);
        assert_eq!(matcher.find_iter(&[]).count(), 0);
    }

    #[test]
    fn overlapping_signatures_three_bytes_apart() {
        // "ABCABCAB" overlaps itself at distance 3.
        let pattern = b"ABCABCAB";
        let matcher = PatternMatcher::new(pattern).unwrap();
        let buffer = b"xxABCABCABCABxx";
        assert_eq!(matcher.find_iter(buffer).collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn adjacent_matches() {
        let matcher = PatternMatcher::new(b"ab").unwrap();
        assert_eq!(
            matcher.find_iter(b"ababab").collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
    }

    #[test]
    fn run_of_identical_bytes_reports_every_position() {
        let matcher = PatternMatcher::new(&[0u8; 3]).unwrap();
        let hits: Vec<_> = matcher.find_iter(&[0u8; 6]).collect();
        assert_eq!(hits, naive(&[0u8; 6], &[0u8; 3]));
        assert_eq!(hits, vec![0, 1, 2, 3]);
    }

    #[test]
    fn iterator_is_restartable() {
        let matcher = PatternMatcher::new(b"aa").unwrap();
        let buffer = b"aaa";
        let first: Vec<_> = matcher.find_iter(buffer).collect();
        let second: Vec<_> = matcher.find_iter(buffer).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn find_first_returns_lowest_offset() {
        let matcher = PatternMatcher::new(&[0x03, 0x20]).unwrap();
        let buffer = [0x00, 0x03, 0x20, 0x03, 0x20];
        assert_eq!(matcher.find_first(&buffer), Some(1));
    }

    #[test]
    fn matcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PatternMatcher>();
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn matches_equal_naive_scan(
                haystack in proptest::collection::vec(0u8..4, 0..256),
                pattern in proptest::collection::vec(0u8..4, 1..6),
            ) {
                let matcher = PatternMatcher::new(&pattern).unwrap();
                let found: Vec<_> = matcher.find_iter(&haystack).collect();
                prop_assert_eq!(found, naive(&haystack, &pattern));
            }
        }
    }
}
