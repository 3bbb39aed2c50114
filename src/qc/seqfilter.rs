// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use crate::alignment::Alignment;
use crate::qc::gaps::gap_fraction;
use crate::seq::record::SeqRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRecord {
    pub id: String,
    pub gap_fraction: f64,
}

#[derive(Debug)]
pub struct GapFilterOutcome {
    /// None if fewer than the required number of records survived.
    pub alignment: Option<Alignment>,
    pub dropped: Vec<DroppedRecord>,
    pub kept: usize,
}

/// Drops records whose gap fraction exceeds `max_gap_fraction`, keeping the others in their
/// original order. The alignment length does not change.
pub fn filter_gappy_records(
    aln: Alignment,
    max_gap_fraction: f64,
    min_species: usize,
) -> GapFilterOutcome {
    let mut kept: Vec<SeqRecord> = Vec::with_capacity(aln.num_seq());
    let mut dropped: Vec<DroppedRecord> = Vec::new();

    for rec in aln.into_records() {
        let frac = gap_fraction(&rec.sequence);
        if frac <= max_gap_fraction {
            kept.push(rec);
        } else {
            dropped.push(DroppedRecord {
                id: rec.id,
                gap_fraction: frac,
            });
        }
    }

    let n_kept = kept.len();
    let alignment = if n_kept == 0 || n_kept < min_species {
        None
    } else {
        // Records keep their length, so this only fails when nothing is left.
        Alignment::new(kept).ok()
    };
    GapFilterOutcome {
        alignment,
        dropped,
        kept: n_kept,
    }
}
