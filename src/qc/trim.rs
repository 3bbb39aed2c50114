// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use log::debug;

use crate::alignment::Alignment;
use crate::qc::gaps::{AMBIGUOUS, GAP};
use crate::seq::record::SeqRecord;

/// Columns with at least this fraction of gaps/'N' are trimmed from the alignment's ends.
pub const EDGE_GAP_THRESHOLD: f64 = 0.8;

/// Fraction of records with a gap or 'N' in each column.
pub fn column_gap_fractions(aln: &Alignment) -> Vec<f64> {
    let n_seqs = aln.num_seq();
    let mut counts = vec![0usize; aln.aln_len()];
    for rec in aln.records() {
        for (col, &b) in rec.sequence.as_bytes().iter().enumerate() {
            if b == GAP as u8 || b == AMBIGUOUS as u8 {
                counts[col] += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|c| c as f64 / n_seqs as f64)
        .collect()
}

/// Removes leading and trailing columns whose gap fraction is not below `gap_threshold`. Interior
/// columns are kept whatever their gap content. Returns None if no column qualifies.
pub fn trim_edges(aln: &Alignment, gap_threshold: f64) -> Option<Alignment> {
    let fractions = column_gap_fractions(aln);
    let start = fractions.iter().position(|&f| f < gap_threshold)?;
    let end = fractions.iter().rposition(|&f| f < gap_threshold)?;
    debug!(
        "Keeping columns {}..={} of {}",
        start,
        end,
        fractions.len()
    );

    let records: Vec<SeqRecord> = aln
        .records()
        .iter()
        .map(|rec| SeqRecord {
            id: rec.id.clone(),
            description: rec.description.clone(),
            sequence: rec.sequence[start..=end].to_string(),
        })
        .collect();
    // Every record was cut to the same column range, so lengths still agree.
    Alignment::new(records).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aln(seqs: &[&str]) -> Alignment {
        let ids = (1..=seqs.len()).map(|i| format!("R{}", i)).collect();
        Alignment::from_vecs(ids, seqs.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_column_gap_fractions() {
        let a = aln(&["A-N", "A--", "AC-", "ACG"]);
        assert_eq!(column_gap_fractions(&a), vec![0.0, 0.5, 0.75]);
    }

    #[test]
    fn test_trim_edges_removes_gappy_ends() {
        let a = aln(&["--ATGCC--", "--ATG-C--", "N-ATGCCA-", "--ATGCC--", "---TGCC--"]);
        let trimmed = trim_edges(&a, EDGE_GAP_THRESHOLD).unwrap();
        // Column 2 has 1/5 gaps, column 7 has 4/5 (not < 0.8), column 6 has 0/5.
        assert_eq!(trimmed.aln_len(), 5);
        assert_eq!(trimmed.records()[0].sequence, "ATGCC");
        assert_eq!(trimmed.records()[1].sequence, "ATG-C");
        assert_eq!(trimmed.records()[4].sequence, "-TGCC");
    }

    #[test]
    fn test_trim_edges_keeps_interior_gaps() {
        let a = aln(&["A---C", "A---C", "A---C"]);
        let trimmed = trim_edges(&a, EDGE_GAP_THRESHOLD).unwrap();
        assert_eq!(trimmed, a);
    }

    #[test]
    fn test_trim_edges_all_gappy() {
        let a = aln(&["---N", "--N-", "----"]);
        assert!(trim_edges(&a, EDGE_GAP_THRESHOLD).is_none());
    }

    #[test]
    fn test_trim_edges_preserves_ids_and_descriptions() {
        let a = Alignment::new(vec![
            SeqRecord::new("dog", "BRCA2 | T1", "-ATG-"),
            SeqRecord::new("fox", "BRCA2 | T2", "-ATG-"),
        ])
        .unwrap();
        let trimmed = trim_edges(&a, EDGE_GAP_THRESHOLD).unwrap();
        assert_eq!(trimmed.records()[0].id, "dog");
        assert_eq!(trimmed.records()[1].description, "BRCA2 | T2");
        assert_eq!(trimmed.records()[1].sequence, "ATG");
    }

    #[test]
    fn test_trim_edges_idempotent() {
        let a = aln(&["--ATGC-A-", "-CATGC---", "--ATGCCA-"]);
        let once = trim_edges(&a, EDGE_GAP_THRESHOLD).unwrap();
        let twice = trim_edges(&once, EDGE_GAP_THRESHOLD).unwrap();
        assert_eq!(once, twice);
    }
}
