// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;
use crate::qc::gaps::GAP;
use crate::seq::codon::{translate, STOP};

/// What to do with a record whose ungapped length is not a multiple of 3.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePolicy {
    /// Skip the stop-codon check for that record
    #[default]
    #[clap(name = "lenient")]
    Lenient,
    /// Reject the whole alignment
    #[clap(name = "strict")]
    Strict,
}

impl fmt::Display for FramePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FramePolicy::Lenient => "lenient",
            FramePolicy::Strict => "strict",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodonIssue {
    LengthNotMultipleOfThree(usize),
    InternalStop { id: String },
    OutOfFrame { id: String, ungapped_len: usize },
    Translation { id: String, msg: String },
}

impl fmt::Display for CodonIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodonIssue::LengthNotMultipleOfThree(len) => {
                write!(f, "Alignment length {} not divisible by 3", len)
            }
            CodonIssue::InternalStop { id } => write!(f, "Internal stop codon in {}", id),
            CodonIssue::OutOfFrame { id, ungapped_len } => write!(
                f,
                "Ungapped length {} of {} not divisible by 3",
                ungapped_len, id
            ),
            CodonIssue::Translation { id, msg } => {
                write!(f, "Translation error in {}: {}", id, msg)
            }
        }
    }
}

/// Checks that the alignment is in frame and that no record has a stop codon before its last
/// codon. Gaps are removed before translation.
pub fn check_codon_alignment(aln: &Alignment, policy: FramePolicy) -> Result<(), CodonIssue> {
    let aln_len = aln.aln_len();
    if aln_len % 3 != 0 {
        return Err(CodonIssue::LengthNotMultipleOfThree(aln_len));
    }

    for rec in aln.records() {
        let ungapped: String = rec.sequence.chars().filter(|&c| c != GAP).collect();
        if ungapped.len() % 3 != 0 {
            match policy {
                FramePolicy::Lenient => continue,
                FramePolicy::Strict => {
                    return Err(CodonIssue::OutOfFrame {
                        id: rec.id.clone(),
                        ungapped_len: ungapped.len(),
                    })
                }
            }
        }
        let protein = translate(&ungapped, false).map_err(|e| CodonIssue::Translation {
            id: rec.id.clone(),
            msg: e.to_string(),
        })?;
        let mut residues = protein.chars();
        // A terminal stop is fine.
        residues.next_back();
        if residues.any(|aa| aa == STOP) {
            return Err(CodonIssue::InternalStop { id: rec.id.clone() });
        }
    }
    Ok(())
}

pub fn is_valid_codon_alignment(aln: &Alignment, policy: FramePolicy) -> bool {
    check_codon_alignment(aln, policy).is_ok()
}
