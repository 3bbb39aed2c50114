// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Batch driver for codon-alignment filtering. Every input file goes through
//
//   Loaded -> [Trimmed] -> GapFiltered -> LengthChecked -> Validated -> Saved
//
// and may be rejected at any stage. Rejections are per file; only a failure to write output
// aborts the batch.


use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::alignment::Alignment;
use crate::config::FilterSettings;
use crate::errors::CanidError;
use crate::qc::{
    codon_check::{check_codon_alignment, CodonIssue},
    seqfilter::filter_gappy_records,
    trim::{trim_edges, EDGE_GAP_THRESHOLD},
};

pub const INPUT_EXTENSION: &str = ".fa";
pub const OUTPUT_SUFFIX: &str = ".filtered.fa";
const CODON_SUFFIX: &str = ".codon";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Loaded,
    Trimmed,
    GapFiltered,
    LengthChecked,
    Validated,
    Saved,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectionKind {
    ReadError,
    TooGappyAfterTrim,
    TooFewSpecies,
    TooShort,
    InvalidCodonAlignment,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionKind::ReadError => "read error",
            RejectionKind::TooGappyAfterTrim => "too gappy after trimming",
            RejectionKind::TooFewSpecies => "too few species",
            RejectionKind::TooShort => "too short",
            RejectionKind::InvalidCodonAlignment => "invalid codon alignment",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    ReadError(String),
    TooGappyAfterTrim,
    TooFewSpecies { kept: usize, required: usize },
    TooShort { length: usize, min_length: usize },
    InvalidCodonAlignment(CodonIssue),
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::ReadError(_) => RejectionKind::ReadError,
            Rejection::TooGappyAfterTrim => RejectionKind::TooGappyAfterTrim,
            Rejection::TooFewSpecies { .. } => RejectionKind::TooFewSpecies,
            Rejection::TooShort { .. } => RejectionKind::TooShort,
            Rejection::InvalidCodonAlignment(_) => RejectionKind::InvalidCodonAlignment,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ReadError(msg) => write!(f, "Could not read alignment: {}", msg),
            Rejection::TooGappyAfterTrim => write!(f, "Too gappy after edge trimming"),
            Rejection::TooFewSpecies { kept: 0, .. } => {
                write!(f, "No sequences left after gap filtering")
            }
            Rejection::TooFewSpecies { kept, required } => write!(
                f,
                "Too few sequences after gap filtering ({} < {})",
                kept, required
            ),
            Rejection::TooShort { length, .. } => {
                write!(f, "Alignment too short ({} bp)", length)
            }
            Rejection::InvalidCodonAlignment(issue) => {
                write!(f, "Invalid codon alignment: {}", issue)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Saved {
        path: PathBuf,
        num_seq: usize,
        aln_len: usize,
    },
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub gene: String,
    /// Last stage the alignment reached.
    pub stage: Stage,
    pub outcome: Outcome,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Saved { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub rejected: BTreeMap<RejectionKind, usize>,
}

impl BatchSummary {
    pub fn record(&mut self, report: &FileReport) {
        self.total += 1;
        match &report.outcome {
            Outcome::Saved { .. } => self.passed += 1,
            Outcome::Rejected(rejection) => {
                *self.rejected.entry(rejection.kind()).or_insert(0) += 1;
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn rejected_for(&self, kind: RejectionKind) -> usize {
        self.rejected.get(&kind).copied().unwrap_or(0)
    }

    /// Files that could be read, whatever became of them afterwards.
    pub fn processed(&self) -> usize {
        self.total - self.rejected_for(RejectionKind::ReadError)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Summary ===")?;
        writeln!(f, "Alignments found: {}", self.total)?;
        writeln!(f, "Passed filter: {}", self.passed)?;
        write!(f, "Failed filter: {}", self.failed())?;
        for (kind, count) in &self.rejected {
            write!(f, "\n  {}: {}", kind, count)?;
        }
        Ok(())
    }
}

/// Gene name from an alignment path: the file stem, minus a trailing ".codon".
pub fn gene_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_suffix(CODON_SUFFIX) {
        Some(gene) => gene.to_string(),
        None => stem,
    }
}

/// Alignment files (`*.fa`, but not our own `*.filtered.fa`) in `dir`, sorted by file name.
pub fn find_alignment_files(dir: &Path) -> Result<Vec<PathBuf>, CanidError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(INPUT_EXTENSION) && !name.ends_with(OUTPUT_SUFFIX) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Runs the in-memory stages (trim, gap filter, length check, codon check). On rejection, also
/// returns the last stage that was reached.
pub fn run_stages(
    mut aln: Alignment,
    settings: &FilterSettings,
) -> Result<Alignment, (Stage, Rejection)> {
    let mut stage = Stage::Loaded;

    if settings.trim_edges {
        aln = trim_edges(&aln, EDGE_GAP_THRESHOLD).ok_or((stage, Rejection::TooGappyAfterTrim))?;
        stage = Stage::Trimmed;
        println!("  After trimming: {} bp", aln.aln_len());
    }

    let filtered = filter_gappy_records(aln, settings.max_gap_fraction, settings.min_species);
    for dropped in &filtered.dropped {
        println!(
            "  Removing {} (gap fraction: {:.2})",
            dropped.id, dropped.gap_fraction
        );
    }
    let aln = filtered.alignment.ok_or((
        stage,
        Rejection::TooFewSpecies {
            kept: filtered.kept,
            required: settings.min_species,
        },
    ))?;
    stage = Stage::GapFiltered;

    if aln.aln_len() < settings.min_alignment_length {
        return Err((
            stage,
            Rejection::TooShort {
                length: aln.aln_len(),
                min_length: settings.min_alignment_length,
            },
        ));
    }
    stage = Stage::LengthChecked;

    if let Err(issue) = check_codon_alignment(&aln, settings.frame_policy) {
        println!("  WARNING: {}", issue);
        return Err((stage, Rejection::InvalidCodonAlignment(issue)));
    }
    debug!("{:?} passed", Stage::Validated);

    Ok(aln)
}

/// Filters one alignment file, writing `<gene>.filtered.fa` to `output_dir` if it passes. Only an
/// output error is returned as Err; everything else is reported in the FileReport.
pub fn process_alignment_file(
    input: &Path,
    output_dir: &Path,
    settings: &FilterSettings,
) -> Result<FileReport, CanidError> {
    let gene = gene_name(input);

    let aln = match Alignment::read(input) {
        Ok(aln) => aln,
        Err(e) => {
            println!("  ERROR reading {}: {}", gene, e);
            warn!("Skipping {}: {}", input.display(), e);
            return Ok(FileReport {
                gene,
                stage: Stage::Loaded,
                outcome: Outcome::Rejected(Rejection::ReadError(e.to_string())),
            });
        }
    };
    println!(
        "  Original: {} sequences, {} bp",
        aln.num_seq(),
        aln.aln_len()
    );

    let aln = match run_stages(aln, settings) {
        Ok(aln) => aln,
        Err((stage, rejection)) => {
            println!("  FILTERED: {}", rejection);
            info!("{} rejected after {:?}: {}", gene, stage, rejection);
            return Ok(FileReport {
                gene,
                stage,
                outcome: Outcome::Rejected(rejection),
            });
        }
    };

    let path = output_dir.join(format!("{}{}", gene, OUTPUT_SUFFIX));
    aln.write(&path)?;
    println!("  Final: {} sequences, {} bp", aln.num_seq(), aln.aln_len());
    println!("  Saved: {}", path.display());

    Ok(FileReport {
        gene,
        stage: Stage::Saved,
        outcome: Outcome::Saved {
            path,
            num_seq: aln.num_seq(),
            aln_len: aln.aln_len(),
        },
    })
}

pub fn run_filter_batch(
    input_dir: &Path,
    output_dir: &Path,
    settings: &FilterSettings,
) -> Result<BatchSummary, CanidError> {
    fs::create_dir_all(output_dir)?;
    let files = find_alignment_files(input_dir)?;
    let mut summary = BatchSummary::default();

    if files.is_empty() {
        println!("ERROR: No alignment files found in {}", input_dir.display());
        return Ok(summary);
    }

    println!("Found {} alignments to filter", files.len());
    println!("Parameters:");
    println!("  Max gap fraction: {}", settings.max_gap_fraction);
    println!("  Min species: {}", settings.min_species);
    println!("  Min length: {} bp", settings.min_alignment_length);
    println!("  Trim edges: {}", settings.trim_edges);
    println!("  Frame policy: {}", settings.frame_policy);
    println!();

    for (i, file) in files.iter().enumerate() {
        println!("[{}/{}] Processing {}", i + 1, files.len(), gene_name(file));
        let report = process_alignment_file(file, output_dir, settings)?;
        summary.record(&report);
        println!();
    }

    Ok(summary)
}
