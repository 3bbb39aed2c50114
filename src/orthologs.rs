// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Per-gene CDS extraction: an ortholog table (gene, species, transcript) is joined against
// per-species CDS FastA files, and each sufficiently covered gene gets its own directory with
// the CDS and the translated protein sequences.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt, fs,
    path::{Path, PathBuf},
};

use csv::ReaderBuilder;
use log::{debug, info, warn};

use crate::errors::CanidError;
use crate::seq::{
    codon::translate,
    fasta::{read_fasta_file, write_fasta_file},
    record::SeqRecord,
};

pub mod biomart;

const CDS_EXTENSIONS: [&str; 3] = [".cds.fa", ".cds.fasta", ".fa"];
const PROGRESS_EVERY: usize = 100;

/// Transcript id without its version suffix ("ENSCAFT00000001.3" -> "ENSCAFT00000001").
pub fn strip_version(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

/// Species from a CDS file name: "Canis_familiaris.cds.fa" -> "Canis_familiaris".
pub fn species_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_suffix(".cds") {
        Some(species) => species.to_string(),
        None => stem,
    }
}

pub fn find_cds_files(dir: &Path) -> Result<Vec<PathBuf>, CanidError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && CDS_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Keys under which a CDS record can be found: its id with and without version, NCBI protein
/// ids embedded in `|`-separated ids, the Ensembl `gene:` field, and the protein id obtained by
/// turning an Ensembl transcript id (`...T00...`) into `...P00...`.
pub fn lookup_keys(record: &SeqRecord) -> Vec<String> {
    let base = strip_version(&record.id);
    let mut keys: Vec<String> = vec![record.id.clone(), base.to_string()];
    if record.id.contains('|') {
        keys.extend(
            record
                .id
                .split('|')
                .filter(|part| part.starts_with("XP_") || part.starts_with("NP_"))
                .map(|part| strip_version(part).to_string()),
        );
    }
    if let Some((_, rest)) = record.description.split_once("gene:") {
        if let Some(gene) = rest.split_whitespace().next() {
            keys.push(strip_version(gene).to_string());
            keys.push(gene.to_string());
        }
    }
    if base.contains("T00") {
        keys.push(base.replace("T00", "P00"));
    }
    keys
}

#[derive(Debug, Default)]
struct SpeciesCds {
    records: Vec<SeqRecord>,
    index: HashMap<String, usize>,
}

/// CDS records indexed by species, then by any of their lookup keys. A later record takes over
/// the keys it shares with an earlier one.
#[derive(Debug, Default)]
pub struct CdsStore {
    by_species: HashMap<String, SpeciesCds>,
}

impl CdsStore {
    pub fn load_dir(dir: &Path) -> Result<Self, CanidError> {
        let files = find_cds_files(dir)?;
        if files.is_empty() {
            return Err(CanidError::Format(format!(
                "No CDS files found in {} (expected naming: Species_name.cds.fa)",
                dir.display()
            )));
        }
        println!("Loading CDS sequences from {} files...", files.len());
        let mut store = CdsStore::default();
        for file in files {
            let species = species_from_path(&file);
            println!("  Loading {}...", species);
            let records = read_fasta_file(&file)?;
            println!("    Loaded {} sequences", records.len());
            for rec in records {
                store.insert(&species, rec);
            }
        }
        Ok(store)
    }

    pub fn insert(&mut self, species: &str, record: SeqRecord) {
        let cds = self.by_species.entry(species.to_string()).or_default();
        let ndx = cds.records.len();
        for key in lookup_keys(&record) {
            cds.index.insert(key, ndx);
        }
        cds.records.push(record);
    }

    /// Looks up a record by any of its keys (see `lookup_keys`).
    pub fn get(&self, species: &str, key: &str) -> Option<&SeqRecord> {
        let cds = self.by_species.get(species)?;
        cds.index.get(key).map(|&ndx| &cds.records[ndx])
    }

    pub fn num_species(&self) -> usize {
        self.by_species.len()
    }

    /// Species with their number of records, by species name.
    pub fn species_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .by_species
            .iter()
            .map(|(species, cds)| (species.as_str(), cds.records.len()))
            .collect();
        counts.sort();
        counts
    }
}

#[derive(Debug, Clone)]
pub struct OrthologColumns {
    pub id: String,
    pub species: String,
    pub gene: String,
}

impl Default for OrthologColumns {
    fn default() -> Self {
        OrthologColumns {
            id: String::from("transcript_id"),
            species: String::from("species"),
            gene: String::from("gene_name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrthologRow {
    pub gene: String,
    pub species: String,
    pub transcript: String,
}

pub fn read_ortholog_table(
    path: &Path,
    columns: &OrthologColumns,
) -> Result<Vec<OrthologRow>, CanidError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let available: Vec<&str> = headers.iter().collect();
    let index_of = |name: &str| available.iter().position(|h| *h == name);
    let (id_idx, species_idx, gene_idx) = match (
        index_of(&columns.id),
        index_of(&columns.species),
        index_of(&columns.gene),
    ) {
        (Some(i), Some(s), Some(g)) => (i, s, g),
        _ => {
            let missing: Vec<&str> = [&columns.id, &columns.species, &columns.gene]
                .into_iter()
                .filter(|c| index_of(c).is_none())
                .map(|c| c.as_str())
                .collect();
            return Err(CanidError::Format(format!(
                "Missing required columns: {:?}; available columns: {:?}",
                missing, available
            )));
        }
    };

    let mut rows: Vec<OrthologRow> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        rows.push(OrthologRow {
            gene: field(gene_idx),
            species: field(species_idx),
            transcript: field(id_idx),
        });
    }
    info!(
        "Read {} rows from ortholog table {}",
        rows.len(),
        path.display()
    );
    Ok(rows)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub skipped_few_species: usize,
    pub skipped_missing_seqs: usize,
}

impl fmt::Display for ExtractSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Summary ===")?;
        writeln!(
            f,
            "Successfully extracted: {} ortholog groups",
            self.extracted
        )?;
        writeln!(f, "Skipped (too few species): {}", self.skipped_few_species)?;
        write!(
            f,
            "Skipped (missing sequences): {}",
            self.skipped_missing_seqs
        )
    }
}

/// Groups rows by gene (in gene-name order), keeping row order within a gene. Rows without a gene
/// name are dropped.
pub fn group_by_gene(rows: Vec<OrthologRow>) -> BTreeMap<String, Vec<OrthologRow>> {
    let mut groups: BTreeMap<String, Vec<OrthologRow>> = BTreeMap::new();
    for row in rows {
        if row.gene.is_empty() {
            continue;
        }
        groups.entry(row.gene.clone()).or_default().push(row);
    }
    groups
}

fn translate_records(gene: &str, records: &[SeqRecord]) -> Vec<SeqRecord> {
    let mut proteins: Vec<SeqRecord> = Vec::with_capacity(records.len());
    for rec in records {
        match translate(&rec.sequence, true) {
            Ok(protein) => proteins.push(SeqRecord {
                id: rec.id.clone(),
                description: rec.description.clone(),
                sequence: protein,
            }),
            Err(e) => warn!("Could not translate {} in {}: {}", rec.id, gene, e),
        }
    }
    proteins
}

/// Writes `<gene>.cds.fa` and, if at least `min_species` records translate, `<gene>.protein.fa`
/// into `out_dir/<gene>`, and counts the group in `summary`.
pub fn write_group(
    gene: &str,
    sequences: &[SeqRecord],
    out_dir: &Path,
    min_species: usize,
    summary: &mut ExtractSummary,
) -> Result<(), CanidError> {
    let gene_dir = out_dir.join(gene);
    fs::create_dir_all(&gene_dir)?;
    write_fasta_file(gene_dir.join(format!("{}.cds.fa", gene)), sequences)?;

    let proteins = translate_records(gene, sequences);
    if proteins.len() < min_species {
        summary.skipped_missing_seqs += 1;
        return Ok(());
    }
    write_fasta_file(gene_dir.join(format!("{}.protein.fa", gene)), &proteins)?;
    summary.extracted += 1;
    if summary.extracted % PROGRESS_EVERY == 0 {
        println!("  Extracted {} ortholog groups...", summary.extracted);
    }
    Ok(())
}

pub fn extract_orthologs(
    rows: Vec<OrthologRow>,
    store: &CdsStore,
    out_dir: &Path,
    min_species: usize,
) -> Result<ExtractSummary, CanidError> {
    let groups = group_by_gene(rows);
    println!("Found {} ortholog groups", groups.len());
    let mut summary = ExtractSummary::default();

    for (gene, group) in &groups {
        let n_species = group
            .iter()
            .map(|row| row.species.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        if n_species < min_species {
            debug!("{}: only {} species", gene, n_species);
            summary.skipped_few_species += 1;
            continue;
        }

        let mut sequences: Vec<SeqRecord> = Vec::new();
        for row in group {
            let transcript = strip_version(&row.transcript);
            match store.get(&row.species, transcript) {
                Some(rec) => sequences.push(SeqRecord {
                    id: row.species.clone(),
                    description: format!("{} | {}", gene, transcript),
                    sequence: rec.sequence.clone(),
                }),
                None => warn!(
                    "Could not find {} for {} in {}",
                    transcript, row.species, gene
                ),
            }
        }
        if sequences.len() < min_species {
            summary.skipped_missing_seqs += 1;
            continue;
        }
        write_group(gene, &sequences, out_dir, min_species, &mut summary)?;
    }
    Ok(summary)
}
