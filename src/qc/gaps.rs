// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

pub const GAP: char = '-';
pub const AMBIGUOUS: char = 'N';

pub fn is_gap_or_ambiguous(c: char) -> bool {
    c == GAP || c == AMBIGUOUS
}

/// Fraction of gap or 'N' characters in `sequence`. An empty sequence counts as all gaps.
pub fn gap_fraction(sequence: &str) -> f64 {
    let len = sequence.chars().count();
    if len == 0 {
        return 1.0;
    }
    let gaps = sequence.chars().filter(|&c| is_gap_or_ambiguous(c)).count();
    gaps as f64 / len as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gap_fraction_empty() {
        assert_abs_diff_eq!(gap_fraction(""), 1.0);
    }

    #[test]
    fn test_gap_fraction_all_gaps() {
        assert_abs_diff_eq!(gap_fraction("------"), 1.0);
        assert_abs_diff_eq!(gap_fraction("NN-N"), 1.0);
    }

    #[test]
    fn test_gap_fraction_clean() {
        assert_abs_diff_eq!(gap_fraction("ATGCCCTAA"), 0.0);
    }

    #[test]
    fn test_gap_fraction_mixed() {
        assert_abs_diff_eq!(gap_fraction("AT--"), 0.5);
        assert_abs_diff_eq!(gap_fraction("ATN"), 1.0 / 3.0, epsilon = 1e-12);
        // Only upper-case N counts as ambiguous.
        assert_abs_diff_eq!(gap_fraction("ATn-"), 0.25);
    }

    #[test]
    fn test_gap_fraction_bounds() {
        for s in ["A", "-", "A-N", "NNNNA", "ACGT----", "N"] {
            let f = gap_fraction(s);
            assert!((0.0..=1.0).contains(&f), "{} out of bounds for {}", f, s);
        }
    }
}
