// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Ortholog groups from a wide Ensembl BioMart export: one row per dog transcript, with the
// stable ids of its orthologs in other species as extra columns. Groups are named after the dog
// gene (`Gene_<digits>`), like the keys of the annotation map.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
};

use csv::ReaderBuilder;
use log::{debug, info};

use crate::annotation::gene_key;
use crate::errors::CanidError;
use crate::orthologs::{strip_version, write_group, CdsStore, ExtractSummary};
use crate::seq::record::SeqRecord;

pub const GENE_COLUMN: &str = "Gene stable ID";
pub const DEFAULT_MIN_SPECIES: usize = 2;

/// Where one species' sequence of a group is looked for.
#[derive(Debug)]
pub struct SpeciesSource {
    /// CDS set searched (and id of the extracted record).
    pub species: &'static str,
    /// Columns whose ids are tried, in this order.
    pub columns: &'static [&'static str],
    /// Appended to the record description.
    pub note: &'static str,
}

/// Sources are tried in order; a species already found is not looked up again, so the dingo
/// columns only stand in for a missing dog sequence.
pub const SOURCES: [SpeciesSource; 3] = [
    SpeciesSource {
        species: "Canis_familiaris",
        columns: &[
            "Query protein or transcript ID",
            "Transcript stable ID",
            GENE_COLUMN,
        ],
        note: "",
    },
    SpeciesSource {
        species: "Vulpes_vulpes",
        columns: &[
            "Red fox gene stable ID",
            "Red fox protein or transcript stable ID",
        ],
        note: "",
    },
    SpeciesSource {
        species: "Canis_familiaris",
        columns: &["Dingo protein or transcript stable ID"],
        note: " (Dingo)",
    },
];

/// The rows of one dog gene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiomartGroup {
    ids: HashMap<String, Vec<String>>,
}

impl BiomartGroup {
    fn add(&mut self, column: &str, id: &str) {
        let ids = self.ids.entry(column.to_string()).or_default();
        if !id.is_empty() && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }

    /// Distinct non-empty ids of `column`, in order of first appearance.
    pub fn ids_in(&self, column: &str) -> &[String] {
        self.ids.get(column).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Reads a BioMart TSV into groups keyed by dog gene id, in id order. Rows without a gene id are
/// dropped. Only the columns named in `SOURCES` are kept.
pub fn read_biomart_table(path: &Path) -> Result<BTreeMap<String, BiomartGroup>, CanidError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let Some(gene_idx) = headers.iter().position(|h| h == GENE_COLUMN) else {
        let available: Vec<&str> = headers.iter().collect();
        return Err(CanidError::Format(format!(
            "Missing required column '{}'; available columns: {:?}",
            GENE_COLUMN, available
        )));
    };
    let wanted: BTreeSet<&str> = SOURCES
        .iter()
        .flat_map(|src| src.columns.iter().copied())
        .collect();
    let id_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| wanted.contains(h))
        .collect();
    debug!("BioMart id columns: {:?}", id_columns);

    let mut groups: BTreeMap<String, BiomartGroup> = BTreeMap::new();
    let mut n_rows = 0;
    for result in reader.records() {
        let record = result?;
        n_rows += 1;
        let gene = record.get(gene_idx).unwrap_or("").trim();
        if gene.is_empty() {
            continue;
        }
        let group = groups.entry(gene.to_string()).or_default();
        for &(idx, column) in &id_columns {
            group.add(column, record.get(idx).unwrap_or("").trim());
        }
    }
    println!("Table: {} rows, {} columns", n_rows, headers.len());
    info!("Read {} gene groups from {}", groups.len(), path.display());
    Ok(groups)
}

/// First record found for `source` among the group's ids, renamed after the species.
fn find_source(
    gene: &str,
    group: &BiomartGroup,
    source: &SpeciesSource,
    store: &CdsStore,
) -> Option<SeqRecord> {
    source
        .columns
        .iter()
        .flat_map(|column| group.ids_in(column))
        .find_map(|id| {
            store.get(source.species, strip_version(id)).map(|rec| SeqRecord {
                id: source.species.to_string(),
                description: format!("{} | {}{}", gene, id, source.note),
                sequence: rec.sequence.clone(),
            })
        })
}

pub fn extract_biomart(
    groups: &BTreeMap<String, BiomartGroup>,
    store: &CdsStore,
    out_dir: &Path,
    min_species: usize,
) -> Result<ExtractSummary, CanidError> {
    println!("\nFound {} gene groups", groups.len());
    let mut summary = ExtractSummary::default();

    for (gene_id, group) in groups {
        let gene = gene_key(gene_id);
        let mut sequences: Vec<SeqRecord> = Vec::new();
        let mut found: BTreeSet<&str> = BTreeSet::new();
        for source in &SOURCES {
            if found.contains(source.species) {
                continue;
            }
            if let Some(rec) = find_source(&gene, group, source, store) {
                found.insert(source.species);
                sequences.push(rec);
            }
        }

        if sequences.len() >= min_species {
            write_group(&gene, &sequences, out_dir, min_species, &mut summary)?;
        } else if sequences.is_empty() {
            debug!("{}: no sequence found", gene);
            summary.skipped_missing_seqs += 1;
        } else {
            debug!("{}: only {} species", gene, sequences.len());
            summary.skipped_few_species += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::fasta::read_fasta_file;
    use std::fs;

    const TABLE: &str = "\
Gene stable ID\tTranscript stable ID\tQuery protein or transcript ID\tRed fox gene stable ID\tRed fox protein or transcript stable ID\tDingo protein or transcript stable ID
ENSCAFG00000000001\tENSCAFT00000000001\tENSCAFP00000000001\tENSVVUG00000000010\tENSVVUP00000000010\t
ENSCAFG00000000001\tENSCAFT00000000001\tENSCAFP00000000001\tENSVVUG00000000010\tENSVVUP00000000010\t
ENSCAFG00000000005\tENSCAFT00000000099\t\t\t\tENSCAFT00000000003.1
ENSCAFG00000000007\tENSCAFT00000000077\t\t\t\t
\tENSCAFT00000000008\t\t\t\t
";

    fn store() -> CdsStore {
        let mut store = CdsStore::default();
        store.insert(
            "Canis_familiaris",
            SeqRecord::new(
                "ENSCAFT00000000001.1",
                "cds gene:ENSCAFG00000000001.1 gene_symbol:ABC1",
                "ATGGCCTAA",
            ),
        );
        store.insert(
            "Canis_familiaris",
            SeqRecord::new("ENSCAFT00000000003.2", "cds gene:ENSCAFG00000000003.1", "ATGCCCTAA"),
        );
        store.insert(
            "Vulpes_vulpes",
            SeqRecord::new("ENSVVUT00000000010.1", "cds gene:ENSVVUG00000000010.1", "ATGGGGTAA"),
        );
        store
    }

    fn table() -> (tempfile::TempDir, BTreeMap<String, BiomartGroup>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mart_export.tsv");
        fs::write(&path, TABLE).unwrap();
        let groups = read_biomart_table(&path).unwrap();
        (dir, groups)
    }

    #[test]
    fn test_read_biomart_table() {
        let (_dir, groups) = table();
        let genes: Vec<&String> = groups.keys().collect();
        assert_eq!(
            genes,
            vec!["ENSCAFG00000000001", "ENSCAFG00000000005", "ENSCAFG00000000007"]
        );
        let first = &groups["ENSCAFG00000000001"];
        assert_eq!(first.ids_in("Transcript stable ID"), ["ENSCAFT00000000001"]);
        assert_eq!(first.ids_in(GENE_COLUMN), ["ENSCAFG00000000001"]);
        assert!(first.ids_in("Dingo protein or transcript stable ID").is_empty());
        assert!(groups["ENSCAFG00000000007"]
            .ids_in("Red fox gene stable ID")
            .is_empty());
    }

    #[test]
    fn test_missing_gene_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mart_export.tsv");
        fs::write(&path, "Transcript stable ID\nENSCAFT1\n").unwrap();
        let err = read_biomart_table(&path).unwrap_err();
        assert!(err.to_string().contains(GENE_COLUMN));
    }

    #[test]
    fn test_extract_biomart() {
        let (_dir, groups) = table();
        let out = tempfile::tempdir().unwrap();
        let summary = extract_biomart(&groups, &store(), out.path(), DEFAULT_MIN_SPECIES).unwrap();
        assert_eq!(
            summary,
            ExtractSummary {
                extracted: 1,
                skipped_few_species: 1,
                skipped_missing_seqs: 1,
            }
        );

        let gene_dir = out.path().join("Gene_00000000001");
        let cds = read_fasta_file(gene_dir.join("Gene_00000000001.cds.fa")).unwrap();
        let headers: Vec<String> = cds.iter().map(SeqRecord::header).collect();
        assert_eq!(
            headers,
            vec![
                "Canis_familiaris Gene_00000000001 | ENSCAFP00000000001",
                "Vulpes_vulpes Gene_00000000001 | ENSVVUG00000000010",
            ]
        );
        let proteins = read_fasta_file(gene_dir.join("Gene_00000000001.protein.fa")).unwrap();
        assert_eq!(proteins[1].sequence, "MG");
        assert!(!out.path().join("Gene_00000000005").exists());
    }

    #[test]
    fn test_dingo_stands_in_for_dog() {
        let (_dir, groups) = table();
        let out = tempfile::tempdir().unwrap();
        let summary = extract_biomart(&groups, &store(), out.path(), 1).unwrap();
        assert_eq!(summary.extracted, 2);
        assert_eq!(summary.skipped_missing_seqs, 1);

        let cds = read_fasta_file(
            out.path()
                .join("Gene_00000000005")
                .join("Gene_00000000005.cds.fa"),
        )
        .unwrap();
        assert_eq!(cds.len(), 1);
        assert_eq!(cds[0].id, "Canis_familiaris");
        assert_eq!(
            cds[0].description,
            "Gene_00000000005 | ENSCAFT00000000003.1 (Dingo)"
        );
    }
}
