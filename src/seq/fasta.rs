// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::CanidError;
use crate::seq::record::SeqRecord;

// For our purposes, a sequence file is just a Vec of sequence records.
pub type SeqFile = Vec<SeqRecord>;

/// Residues per line when writing FastA.
pub const LINE_WIDTH: usize = 60;

pub fn read_fasta_file<P: AsRef<Path>>(path: P) -> Result<SeqFile, CanidError> {
    let file = File::open(path)?;
    read_fasta(BufReader::new(file))
}

pub fn read_fasta<R: BufRead>(reader: R) -> Result<SeqFile, CanidError> {
    let mut result: SeqFile = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in reader.lines() {
        let l = line?;
        let l = l.trim_end();
        if let Some(hdr) = l.strip_prefix('>') {
            if let Some((header, sequence)) = current.take() {
                result.push(SeqRecord::from_header(&header, sequence));
            }
            current = Some((hdr.to_string(), String::new()));
        } else if l.trim().is_empty() {
            continue;
        } else {
            match current.as_mut() {
                // append line to current record's sequence
                Some((_, sequence)) => {
                    sequence.extend(l.chars().filter(|c| !c.is_whitespace()))
                }
                None => {
                    return Err(CanidError::Format(String::from(
                        "Sequence data before first FastA header",
                    )))
                }
            }
        }
    }
    if let Some((header, sequence)) = current {
        result.push(SeqRecord::from_header(&header, sequence));
    }
    Ok(result)
}

pub fn write_fasta_file<P: AsRef<Path>>(path: P, records: &[SeqRecord]) -> Result<(), CanidError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_fasta(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

pub fn write_fasta<W: Write>(writer: &mut W, records: &[SeqRecord]) -> Result<(), CanidError> {
    for record in records {
        writeln!(writer, ">{}", record.header())?;
        let bytes = record.sequence.as_bytes();
        for chunk in bytes.chunks(LINE_WIDTH) {
            writer.write_all(chunk)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}
