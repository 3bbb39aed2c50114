// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

pub mod codon;
pub mod fasta;
pub mod record;
