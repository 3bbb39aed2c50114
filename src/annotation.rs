// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Gene annotations (symbol, description, transcripts) keyed by the gene directory names used
// throughout the pipeline ("Gene_00000012345"). Built from Ensembl CDS headers, stored as JSON.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::CanidError;
use crate::orthologs::strip_version;
use crate::seq::{fasta::read_fasta_file, record::SeqRecord};

pub const UNKNOWN_SYMBOL: &str = "Unknown";
pub const NO_DESCRIPTION: &str = "No description";
pub const GENE_ID_COLUMN: &str = "gene_id";
pub const ANNOTATED_SUFFIX: &str = "_ANNOTATED.tsv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneAnnotation {
    pub gene_id: String,
    pub symbol: String,
    pub description: String,
    pub transcripts: Vec<String>,
}

impl Default for GeneAnnotation {
    fn default() -> Self {
        GeneAnnotation {
            gene_id: String::new(),
            symbol: String::from(UNKNOWN_SYMBOL),
            description: String::from(NO_DESCRIPTION),
            transcripts: Vec::new(),
        }
    }
}

pub type AnnotationMap = BTreeMap<String, GeneAnnotation>;

/// Fields of interest in an Ensembl CDS header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderInfo {
    pub gene_id: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub transcript_id: Option<String>,
}

// First word after `tag`, if any.
fn word_after<'a>(header: &'a str, tag: &str) -> Option<&'a str> {
    header
        .split_once(tag)
        .and_then(|(_, rest)| rest.split_whitespace().next())
}

pub fn parse_ensembl_header(header: &str) -> HeaderInfo {
    let description = header
        .split_once("description:")
        .and_then(|(_, rest)| rest.split("[Source").next())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from);
    HeaderInfo {
        gene_id: word_after(header, "gene:").map(|id| strip_version(id).to_string()),
        symbol: word_after(header, "gene_symbol:").map(String::from),
        description,
        transcript_id: word_after(header, "transcript:").map(|id| strip_version(id).to_string()),
    }
}

/// Directory-style gene name: "ENSCAFG00845012345" -> "Gene_00845012345".
pub fn gene_key(gene_id: &str) -> String {
    let suffix = gene_id.rsplit('G').next().unwrap_or(gene_id);
    format!("Gene_{}", suffix)
}

/// Folds CDS records into an annotation map. The first record of a gene sets its symbol and
/// description; every record contributes a transcript (the `transcript:` field, or else the
/// record id).
pub fn build_annotation_map(records: &[SeqRecord]) -> AnnotationMap {
    let mut map = AnnotationMap::new();
    for rec in records {
        let info = parse_ensembl_header(&rec.header());
        let Some(gene_id) = info.gene_id else {
            debug!("No gene id in header of {}", rec.id);
            continue;
        };
        let entry = map
            .entry(gene_key(&gene_id))
            .or_insert_with(|| GeneAnnotation {
                gene_id: gene_id.clone(),
                symbol: info.symbol.unwrap_or_else(|| String::from(UNKNOWN_SYMBOL)),
                description: info
                    .description
                    .unwrap_or_else(|| String::from(NO_DESCRIPTION)),
                transcripts: Vec::new(),
            });
        let transcript = info
            .transcript_id
            .unwrap_or_else(|| strip_version(&rec.id).to_string());
        entry.transcripts.push(transcript);
    }
    map
}

pub fn build_annotation_map_file(cds: &Path) -> Result<AnnotationMap, CanidError> {
    let records = read_fasta_file(cds)?;
    Ok(build_annotation_map(&records))
}

pub fn save_annotation_map(path: &Path, map: &AnnotationMap) -> Result<(), CanidError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(map)?;
    fs::write(path, text)?;
    Ok(())
}

pub fn load_annotation_map(path: &Path) -> Result<AnnotationMap, CanidError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Like `load_annotation_map()`, but a missing file only earns a warning.
pub fn load_annotation_map_or_empty(path: &Path) -> Result<AnnotationMap, CanidError> {
    if !path.exists() {
        warn!("Gene annotation file {} not found", path.display());
        println!(
            "Warning: Gene annotation file not found. Run `canidsel annotation-map` first."
        );
        return Ok(AnnotationMap::new());
    }
    load_annotation_map(path)
}

/// Symbol and description of `gene`, with the usual placeholders when unknown.
pub fn symbol_and_description<'a>(map: &'a AnnotationMap, gene: &str) -> (&'a str, &'a str) {
    match map.get(gene) {
        Some(ann) => (ann.symbol.as_str(), ann.description.as_str()),
        None => (UNKNOWN_SYMBOL, NO_DESCRIPTION),
    }
}

/// "results/dog_only.tsv" -> "results/dog_only_ANNOTATED.tsv"
pub fn annotated_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = name.strip_suffix(".tsv").unwrap_or(&name);
    input.with_file_name(format!("{}{}", base, ANNOTATED_SUFFIX))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateCount {
    pub total: usize,
    pub annotated: usize,
}

impl AnnotateCount {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.annotated as f64 / self.total as f64
        }
    }
}

// Position of `name` in `headers`, appending it if absent.
fn column_or_append(headers: &mut Vec<String>, name: &str) -> usize {
    match headers.iter().position(|h| h == name) {
        Some(ndx) => ndx,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}

/// Writes an annotated copy of one TSV table; see `annotated_path()`. Existing `gene_symbol` or
/// `description` columns are overwritten.
pub fn annotate_table(
    input: &Path,
    output: &Path,
    map: &AnnotationMap,
) -> Result<AnnotateCount, CanidError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(input)?;
    let mut headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let gene_col = headers
        .iter()
        .position(|h| h == GENE_ID_COLUMN)
        .ok_or_else(|| {
            CanidError::Format(format!(
                "{}: no '{}' column",
                input.display(),
                GENE_ID_COLUMN
            ))
        })?;
    let symbol_col = column_or_append(&mut headers, "gene_symbol");
    let desc_col = column_or_append(&mut headers, "description");

    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(output)?;
    writer.write_record(&headers)?;

    let mut count = AnnotateCount::default();
    for row in reader.records() {
        let row = row?;
        let mut fields: Vec<String> = row.iter().map(String::from).collect();
        fields.resize(headers.len(), String::new());
        let (symbol, description) =
            symbol_and_description(map, row.get(gene_col).unwrap_or_default());
        count.total += 1;
        if symbol != UNKNOWN_SYMBOL {
            count.annotated += 1;
        }
        fields[symbol_col] = symbol.to_string();
        fields[desc_col] = description.to_string();
        writer.write_record(&StringRecord::from(fields))?;
    }
    writer.flush()?;
    Ok(count)
}

/// Annotates each of `inputs`, skipping the ones that do not exist. Returns the overall count.
pub fn annotate_files(inputs: &[PathBuf], map: &AnnotationMap) -> Result<AnnotateCount, CanidError> {
    let mut overall = AnnotateCount::default();
    for input in inputs {
        println!("\nProcessing: {}", input.display());
        if !input.exists() {
            println!("  SKIP: File not found");
            continue;
        }
        let output = annotated_path(input);
        let count = annotate_table(input, &output, map)?;
        println!("  Genes: {}", count.total);
        println!("  Saved: {}", output.display());
        println!(
            "  Annotated: {} / {} ({:.1}%)",
            count.annotated,
            count.total,
            count.percent()
        );
        overall.total += count.total;
        overall.annotated += count.annotated;
    }
    Ok(overall)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ENSCAFT00845000001.1 cds chromosome:ROS_Cfam_1.0:1:1:100:1 \
        gene:ENSCAFG00845000123.1 gene_biotype:protein_coding \
        transcript_biotype:protein_coding gene_symbol:ENPP1 \
        description:ectonucleotide pyrophosphatase 1 [Source:VGNC Symbol;Acc:VGNC:40374]";

    #[test]
    fn test_parse_ensembl_header() {
        let info = parse_ensembl_header(HEADER);
        assert_eq!(info.gene_id.as_deref(), Some("ENSCAFG00845000123"));
        assert_eq!(info.symbol.as_deref(), Some("ENPP1"));
        assert_eq!(
            info.description.as_deref(),
            Some("ectonucleotide pyrophosphatase 1")
        );
        assert_eq!(info.transcript_id, None);
    }

    #[test]
    fn test_parse_bare_header() {
        assert_eq!(parse_ensembl_header("seq1"), HeaderInfo::default());
        let info = parse_ensembl_header("x gene:ENSG1 transcript:ENST9.2 description: [Source:X]");
        assert_eq!(info.transcript_id.as_deref(), Some("ENST9"));
        assert_eq!(info.description, None);
    }

    #[test]
    fn test_gene_key() {
        assert_eq!(gene_key("ENSCAFG00845000123"), "Gene_00845000123");
        assert_eq!(gene_key("ENSVVUG0001"), "Gene_0001");
        assert_eq!(gene_key("NOLETTER"), "Gene_NOLETTER");
    }

    #[test]
    fn test_build_annotation_map() {
        let records = vec![
            SeqRecord::from_header(HEADER, String::from("ATG")),
            SeqRecord::from_header(
                "ENSCAFT00845000002.1 cds gene:ENSCAFG00845000123.1 gene_symbol:OTHER",
                String::from("ATG"),
            ),
            SeqRecord::from_header(
                "ENSCAFT00845000009.1 cds gene:ENSCAFG00845000999.1",
                String::from("ATG"),
            ),
            SeqRecord::from_header("orphan", String::from("ATG")),
        ];
        let map = build_annotation_map(&records);
        assert_eq!(map.len(), 2);
        let enpp1 = &map["Gene_00845000123"];
        assert_eq!(enpp1.symbol, "ENPP1");
        assert_eq!(
            enpp1.transcripts,
            vec!["ENSCAFT00845000001", "ENSCAFT00845000002"]
        );
        let bare = &map["Gene_00845000999"];
        assert_eq!(bare.symbol, UNKNOWN_SYMBOL);
        assert_eq!(bare.description, NO_DESCRIPTION);
    }

    #[test]
    fn test_save_and_load_annotation_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("gene_annotations.json");
        let records = vec![SeqRecord::from_header(HEADER, String::from("ATG"))];
        let map = build_annotation_map(&records);
        save_annotation_map(&path, &map).unwrap();
        assert_eq!(load_annotation_map(&path).unwrap(), map);

        // Entries written by other tools may lack fields.
        fs::write(&path, r#"{"Gene_1": {"symbol": "ABC"}}"#).unwrap();
        let loaded = load_annotation_map(&path).unwrap();
        assert_eq!(loaded["Gene_1"].description, NO_DESCRIPTION);

        let missing = load_annotation_map_or_empty(&dir.path().join("nope.json")).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_annotated_path() {
        assert_eq!(
            annotated_path(Path::new("res/dog_only.tsv")),
            PathBuf::from("res/dog_only_ANNOTATED.tsv")
        );
        assert_eq!(
            annotated_path(Path::new("table.txt")),
            PathBuf::from("table.txt_ANNOTATED.tsv")
        );
    }

    fn small_map() -> AnnotationMap {
        let mut map = AnnotationMap::new();
        map.insert(
            String::from("Gene_1"),
            GeneAnnotation {
                gene_id: String::from("ENSG1"),
                symbol: String::from("WNT5A"),
                description: String::from("Wnt family member 5A"),
                transcripts: vec![],
            },
        );
        map
    }

    #[test]
    fn test_annotate_table() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dog_only.tsv");
        fs::write(&input, "gene_id\tpvalue\nGene_1\t0.01\nGene_2\t0.03\n").unwrap();
        let output = annotated_path(&input);
        let count = annotate_table(&input, &output, &small_map()).unwrap();
        assert_eq!(count, AnnotateCount { total: 2, annotated: 1 });
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "gene_id\tpvalue\tgene_symbol\tdescription\n\
             Gene_1\t0.01\tWNT5A\tWnt family member 5A\n\
             Gene_2\t0.03\tUnknown\tNo description\n"
        );
    }

    #[test]
    fn test_annotate_table_replaces_columns() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("t.tsv");
        fs::write(&input, "gene_symbol\tgene_id\nold\tGene_1\n").unwrap();
        let output = annotated_path(&input);
        annotate_table(&input, &output, &small_map()).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "gene_symbol\tgene_id\tdescription\nWNT5A\tGene_1\tWnt family member 5A\n"
        );
    }

    #[test]
    fn test_annotate_table_requires_gene_id() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("t.tsv");
        fs::write(&input, "gene\tp\nGene_1\t0.1\n").unwrap();
        let res = annotate_table(&input, &annotated_path(&input), &small_map());
        assert!(matches!(res, Err(CanidError::Format(_))));
    }

    #[test]
    fn test_annotate_files_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.tsv");
        fs::write(&present, "gene_id\nGene_1\nGene_1\nGene_7\n").unwrap();
        let inputs = vec![dir.path().join("missing.tsv"), present];
        let overall = annotate_files(&inputs, &small_map()).unwrap();
        assert_eq!(overall, AnnotateCount { total: 3, annotated: 2 });
        assert!(dir.path().join("a_ANNOTATED.tsv").exists());
        assert!(!dir.path().join("missing_ANNOTATED.tsv").exists());
    }
}
