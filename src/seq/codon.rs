// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Translation with the standard genetic code (NCBI table 1). IUPAC ambiguity codes are expanded;
// a codon whose expansions all agree translates to that residue, otherwise to 'X'.

use std::collections::BTreeSet;

use log::debug;

use crate::errors::CanidError;

pub const STOP: char = '*';
pub const UNKNOWN_AA: char = 'X';

// Indexed by 16 * first + 4 * second + third, bases ordered T, C, A, G.
const STANDARD_CODE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

fn base_index(base: u8) -> usize {
    match base {
        b'T' => 0,
        b'C' => 1,
        b'A' => 2,
        _ => 3, // G
    }
}

fn expand(base: u8) -> Option<&'static [u8]> {
    let bases: &'static [u8] = match base.to_ascii_uppercase() {
        b'A' => b"A",
        b'C' => b"C",
        b'G' => b"G",
        b'T' | b'U' => b"T",
        b'R' => b"AG",
        b'Y' => b"CT",
        b'S' => b"CG",
        b'W' => b"AT",
        b'K' => b"GT",
        b'M' => b"AC",
        b'B' => b"CGT",
        b'D' => b"AGT",
        b'H' => b"ACT",
        b'V' => b"ACG",
        b'N' => b"ACGT",
        _ => return None,
    };
    Some(bases)
}

pub fn translate_codon(codon: &[u8]) -> Result<char, CanidError> {
    if codon.len() != 3 {
        return Err(CanidError::Format(format!(
            "Codon must have 3 bases, got {}",
            codon.len()
        )));
    }
    let mut expansions: Vec<&[u8]> = Vec::with_capacity(3);
    for &b in codon {
        let bases = expand(b).ok_or_else(|| {
            CanidError::Format(format!(
                "Codon '{}' contains invalid character '{}'",
                String::from_utf8_lossy(codon),
                b as char
            ))
        })?;
        expansions.push(bases);
    }

    let mut residues: BTreeSet<u8> = BTreeSet::new();
    for &b1 in expansions[0] {
        for &b2 in expansions[1] {
            for &b3 in expansions[2] {
                let idx = 16 * base_index(b1) + 4 * base_index(b2) + base_index(b3);
                residues.insert(STANDARD_CODE[idx]);
            }
        }
    }
    if residues.len() == 1 {
        Ok(residues.into_iter().next().map(char::from).unwrap_or(UNKNOWN_AA))
    } else {
        Ok(UNKNOWN_AA)
    }
}

/// Translates a nucleotide sequence. A trailing partial codon is ignored. With `to_stop`,
/// translation ends (exclusively) at the first stop codon.
pub fn translate(seq: &str, to_stop: bool) -> Result<String, CanidError> {
    let bytes = seq.as_bytes();
    if bytes.len() % 3 != 0 {
        debug!(
            "Partial codon: sequence length {} is not a multiple of 3",
            bytes.len()
        );
    }
    let mut protein = String::with_capacity(bytes.len() / 3);
    for codon in bytes.chunks_exact(3) {
        let aa = translate_codon(codon)?;
        if to_stop && aa == STOP {
            break;
        }
        protein.push(aa);
    }
    Ok(protein)
}
