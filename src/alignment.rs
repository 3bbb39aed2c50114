// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use std::path::Path;

use crate::errors::CanidError;
use crate::seq::fasta::{read_fasta_file, write_fasta_file, SeqFile};
use crate::seq::record::SeqRecord;

/// A multiple sequence alignment: at least one record, all records of the same length. Residues
/// are printable ASCII, so that byte offsets are column numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    records: Vec<SeqRecord>,
}

impl Alignment {
    pub fn new(records: Vec<SeqRecord>) -> Result<Self, CanidError> {
        let Some(first) = records.first() else {
            return Err(CanidError::Format(String::from("No sequences found")));
        };
        for rec in &records {
            if let Some(c) = rec.sequence.chars().find(|c| !c.is_ascii_graphic()) {
                return Err(CanidError::Format(format!(
                    "Invalid character {:?} in sequence '{}'",
                    c, rec.id
                )));
            }
        }
        let aln_len = first.len();
        if let Some(bad) = records.iter().find(|rec| rec.len() != aln_len) {
            return Err(CanidError::Format(format!(
                "Sequences must all have the same length: '{}' has {}, expected {}",
                bad.id,
                bad.len(),
                aln_len
            )));
        }
        Ok(Alignment { records })
    }

    pub fn from_file(seq_file: SeqFile) -> Result<Self, CanidError> {
        Alignment::new(seq_file)
    }

    // Mostly for tests: ids double as headers, descriptions are empty.
    pub fn from_vecs(ids: Vec<String>, sequences: Vec<String>) -> Result<Self, CanidError> {
        if ids.len() != sequences.len() {
            return Err(CanidError::Format(format!(
                "{} ids for {} sequences",
                ids.len(),
                sequences.len()
            )));
        }
        let records = ids
            .into_iter()
            .zip(sequences)
            .map(|(id, sequence)| SeqRecord {
                id,
                description: String::new(),
                sequence,
            })
            .collect();
        Alignment::new(records)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, CanidError> {
        Alignment::from_file(read_fasta_file(path)?)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), CanidError> {
        write_fasta_file(path, &self.records)
    }

    pub fn num_seq(&self) -> usize {
        self.records.len()
    }

    pub fn aln_len(&self) -> usize {
        self.records.first().map(SeqRecord::len).unwrap_or(0)
    }

    pub fn records(&self) -> &[SeqRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SeqRecord> {
        self.records
    }

    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|rec| rec.id.as_str()).collect()
    }
}
