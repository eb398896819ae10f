//! Plausibility heuristic for carved key bytes.
//!
//! This is a cheap filter, not a proof: a real key with unusually many zero
//! bytes is rejected, and any non-key data that is not mostly zeros passes.
//! Both outcomes are acceptable for an advisory tool.

use crate::key::{CandidateKey, Rejection, ValidatedKey};

pub const DEFAULT_MAX_ZERO_PERCENT: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlausibilityFilter {
    max_zero_percent: u8,
}

impl PlausibilityFilter {
    #[must_use]
    pub fn new(max_zero_percent: u8) -> Self {
        Self {
            max_zero_percent: max_zero_percent.min(100),
        }
    }

    /// Promotes `candidate` to a [`ValidatedKey`] or says why it was dropped.
    ///
    /// A payload shorter than its declared length is rejected first; then a
    /// payload whose zero-byte share exceeds the threshold.
    pub fn check(&self, candidate: CandidateKey) -> Result<ValidatedKey, Rejection> {
        let payload = candidate.payload();
        if payload.len() != candidate.declared_len() {
            return Err(Rejection::Truncated {
                expected: candidate.declared_len(),
                actual: payload.len(),
            });
        }

        let zeros = payload.iter().filter(|&&b| b == 0).count();
        if zeros * 100 > payload.len() * usize::from(self.max_zero_percent) {
            return Err(Rejection::MostlyZero {
                zeros,
                len: payload.len(),
            });
        }

        Ok(ValidatedKey::from_candidate(candidate))
    }
}

impl Default for PlausibilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ZERO_PERCENT)
    }
}

/// Shannon entropy in bits per byte. Reported alongside keys; it plays no
/// part in [`PlausibilityFilter::check`].
#[must_use]
pub fn shannon_entropy(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }
    let n = data.len() as f32;
    let sum: f32 = freq
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let cf = c as f32;
            cf * cf.log2()
        })
        .sum();
    n.log2() - sum / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::EncryptionType;
    use rstest::rstest;

    fn candidate_with_zeros(len: usize, zeros: usize) -> CandidateKey {
        let payload = (0..len)
            .map(|i| if i < zeros { 0 } else { (i as u8) | 0x01 })
            .collect();
        CandidateKey::new(0x1000, payload, EncryptionType::Unknown, len)
    }

    #[rstest]
    #[case(32, 0, true)]
    #[case(32, 25, true)]
    #[case(32, 26, false)]
    #[case(32, 32, false)]
    #[case(16, 12, true)]
    #[case(16, 13, false)]
    #[case(64, 51, true)]
    #[case(64, 52, false)]
    fn zero_ratio_threshold(#[case] len: usize, #[case] zeros: usize, #[case] accepted: bool) {
        let verdict = PlausibilityFilter::default().check(candidate_with_zeros(len, zeros));
        assert_eq!(verdict.is_ok(), accepted, "{zeros}/{len} zeros");
    }

    #[test]
    fn mostly_zero_reports_counts() {
        let verdict = PlausibilityFilter::default().check(candidate_with_zeros(32, 30));
        assert_eq!(verdict, Err(Rejection::MostlyZero { zeros: 30, len: 32 }));
    }

    #[test]
    fn truncated_payload_is_rejected_before_zero_check() {
        let candidate = CandidateKey::new(0, vec![0xAB; 20], EncryptionType::XtsAes128, 32);
        assert_eq!(
            PlausibilityFilter::default().check(candidate),
            Err(Rejection::Truncated {
                expected: 32,
                actual: 20
            })
        );
    }

    #[test]
    fn accepted_key_keeps_offset_type_and_bytes() {
        let payload: Vec<u8> = (1..=32).collect();
        let candidate = CandidateKey::new(0xDEAD, payload.clone(), EncryptionType::AesCbc256, 32);
        let key = PlausibilityFilter::default().check(candidate).unwrap();
        assert_eq!(key.offset(), 0xDEAD);
        assert_eq!(key.kind(), EncryptionType::AesCbc256);
        assert_eq!(key.payload(), payload.as_slice());
    }

    #[test]
    fn stricter_threshold() {
        let filter = PlausibilityFilter::new(50);
        assert!(filter.check(candidate_with_zeros(32, 16)).is_ok());
        assert!(filter.check(candidate_with_zeros(32, 17)).is_err());
    }

    #[test]
    fn entropy_bounds() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert_eq!(shannon_entropy(&[0u8; 32]), 0.0);
        let distinct: Vec<u8> = (0..32).collect();
        assert!((shannon_entropy(&distinct) - 5.0).abs() < 1e-4);
        let halves: Vec<u8> = (0..32).map(|i| u8::from(i % 2 == 0)).collect();
        assert!((shannon_entropy(&halves) - 1.0).abs() < 1e-4);
    }
}
