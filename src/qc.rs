// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Quality-control stages for codon alignments. Each stage takes an alignment and either hands back
// a (possibly smaller) alignment or reports why the alignment cannot be used.

pub mod codon_check;
pub mod gaps;
pub mod seqfilter;
pub mod trim;
