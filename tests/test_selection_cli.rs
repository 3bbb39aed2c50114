// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

mod common;

use std::fs;

use crate::common::utils;

use canidsel::annotation::load_annotation_map;

#[test]
fn parse_hyphy_busted() {
    let work = tempfile::tempdir().unwrap();
    let input = utils::fixture("hyphy/busted");
    let stdout = utils::stdout_of(utils::canidsel(work.path()).args([
        "parse-hyphy",
        "--input",
        input.to_str().unwrap(),
        "--output",
        "results/busted.csv",
        "--test",
        "busted",
    ]));
    assert!(stdout.contains("Found 3 JSON files"));
    assert!(stdout.contains("Successfully parsed: 2"));
    assert!(stdout.contains("Failed: 1"));
    assert!(stdout.contains("Significant results (p < 0.05): 1 / 2 (50.0%)"));

    let csv = fs::read_to_string(work.path().join("results/busted.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("Gene_00001,0.0003,14.82,true,,\"{"));
    assert_eq!(lines[2], "Gene_00002,0.5,0.0,false,,");
}

#[test]
fn parse_hyphy_without_json_fails() {
    let work = tempfile::tempdir().unwrap();
    utils::canidsel(work.path())
        .args(["parse-hyphy", "--input", ".", "--output", "x.csv", "--test", "fel"])
        .assert()
        .failure();
}

#[test]
fn absrel_logs_then_categorize() {
    let work = tempfile::tempdir().unwrap();
    let logs = utils::fixture("absrel");
    let annotations = utils::fixture("gene_annotations.json");
    let stdout = utils::stdout_of(utils::canidsel(work.path()).args([
        "absrel-logs",
        "--logs",
        logs.to_str().unwrap(),
        "--annotations",
        annotations.to_str().unwrap(),
    ]));
    assert!(stdout.contains("Total genes analyzed: 2"));
    assert!(stdout.contains("Genes under positive selection: 1 (50.0%)"));
    assert!(stdout.contains("receptor: 1"));

    let tsv = fs::read_to_string(work.path().join("results_summary.tsv")).unwrap();
    assert_eq!(
        tsv,
        "Gene_ID\tGene_Symbol\tOmega\tSites\tP_value\tDescription\n\
         Gene_00001\tTLR4\t>1000\t6\t0\ttoll like receptor 4\n"
    );

    let stdout = utils::stdout_of(utils::canidsel(work.path()).args([
        "categorize",
        "--output",
        "categories.tsv",
    ]));
    assert!(stdout.contains("### Signal Transduction (1 genes)"));
    assert!(stdout.contains("Average categories per gene: 4.00"));
    let assigned = fs::read_to_string(work.path().join("categories.tsv")).unwrap();
    assert!(assigned.starts_with("Gene_ID\tGene_Symbol\tCategories\nGene_00001\tTLR4\t"));
}

#[test]
fn absrel_logs_without_annotations() {
    let work = tempfile::tempdir().unwrap();
    let logs = utils::fixture("absrel");
    let stdout = utils::stdout_of(utils::canidsel(work.path()).args([
        "absrel-logs",
        "--logs",
        logs.to_str().unwrap(),
        "--output",
        "summary.tsv",
    ]));
    assert!(stdout.contains("Warning: Gene annotation file not found"));
    let tsv = fs::read_to_string(work.path().join("summary.tsv")).unwrap();
    assert!(tsv.contains("Gene_00001\tUnknown\t>1000"));
}

#[test]
fn annotation_map_then_annotate() {
    let work = tempfile::tempdir().unwrap();
    let cds = utils::fixture("ensembl_cds.fa");
    utils::stdout_of(utils::canidsel(work.path()).args([
        "annotation-map",
        "--cds",
        cds.to_str().unwrap(),
    ]));
    let map = load_annotation_map(&work.path().join("data/gene_annotations.json")).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["Gene_00845000001"].symbol, "HDAC4");
    assert_eq!(map["Gene_00845000001"].transcripts.len(), 2);
    assert_eq!(map["Gene_00845000002"].symbol, "Unknown");

    fs::write(
        work.path().join("dog_only.tsv"),
        "gene_id\tpvalue\nGene_00845000001\t0.001\nGene_99\t0.01\n",
    )
    .unwrap();
    let stdout = utils::stdout_of(utils::canidsel(work.path()).args([
        "annotate",
        "dog_only.tsv",
        "missing.tsv",
    ]));
    assert!(stdout.contains("SKIP: File not found"));
    assert!(stdout.contains("Annotated: 1 / 2 (50.0%)"));
    let annotated = fs::read_to_string(work.path().join("dog_only_ANNOTATED.tsv")).unwrap();
    assert_eq!(
        annotated,
        "gene_id\tpvalue\tgene_symbol\tdescription\n\
         Gene_00845000001\t0.001\tHDAC4\thistone deacetylase 4\n\
         Gene_99\t0.01\tUnknown\tNo description\n"
    );
}

#[test]
fn annotate_then_prioritize() {
    let work = tempfile::tempdir().unwrap();
    fs::write(
        work.path().join("dog_only.tsv"),
        "gene_id\tdog_pvalue\tdog_omega\nGene_00845000001\t0.0\t1.2\nGene_99\t0.01\t0.2\n",
    )
    .unwrap();
    let cds = utils::fixture("ensembl_cds.fa");
    utils::stdout_of(utils::canidsel(work.path()).args([
        "annotation-map",
        "--cds",
        cds.to_str().unwrap(),
        "--output",
        "annotations.json",
    ]));
    utils::stdout_of(utils::canidsel(work.path()).args([
        "annotate",
        "--annotations",
        "annotations.json",
        "dog_only.tsv",
    ]));

    let stdout = utils::stdout_of(utils::canidsel(work.path()).args([
        "prioritize",
        "--input",
        "dog_only_ANNOTATED.tsv",
    ]));
    assert!(stdout.contains("Total domestication genes: 2"));
    assert!(stdout.contains("Annotated genes: 1"));
    assert!(stdout.contains("Tier 3 (Priority: EXPLORATORY): 1 genes"));

    let ranked = fs::read_to_string(
        work.path()
            .join("enrichment_results/GENE_PRIORITIZATION_FOR_VALIDATION.tsv"),
    )
    .unwrap();
    let lines: Vec<&str> = ranked.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "Gene_00845000001\tHDAC4\thistone deacetylase 4\t0.0\t1.2\t5.0\t0.0\t3.0\t3.0\t11.0\t3"
    );
    let tier1 = fs::read_to_string(
        work.path()
            .join("enrichment_results/TIER1_VALIDATION_GENES.tsv"),
    )
    .unwrap();
    assert_eq!(tier1.lines().count(), 1);
}

#[test]
fn extract_biomart_names_groups_after_dog_gene() {
    let work = tempfile::tempdir().unwrap();
    let cds_dir = work.path().join("cds");
    fs::create_dir(&cds_dir).unwrap();
    fs::write(
        cds_dir.join("Canis_familiaris.cds.fa"),
        ">ENSCAFT00845000001.1 cds gene:ENSCAFG00845000001.1 gene_symbol:HDAC4\nATGGCCTAA\n",
    )
    .unwrap();
    fs::write(
        cds_dir.join("Vulpes_vulpes.cds.fa"),
        ">ENSVVUT00000012.1 cds gene:ENSVVUG00000012.1\nATGGCGTAA\n",
    )
    .unwrap();
    fs::write(
        work.path().join("mart_export.tsv"),
        "Gene stable ID\tTranscript stable ID\tRed fox gene stable ID\n\
         ENSCAFG00845000001\tENSCAFT00845000001\tENSVVUG00000012\n",
    )
    .unwrap();

    let stdout = utils::stdout_of(utils::canidsel(work.path()).args([
        "extract-biomart",
        "--orthologs",
        "mart_export.tsv",
        "--cds-dir",
        "cds",
        "--out",
        "orthologs",
    ]));
    assert!(stdout.contains("  - Vulpes_vulpes: 1 sequences"));
    assert!(stdout.contains("Successfully extracted: 1 ortholog groups"));
    let cds = fs::read_to_string(
        work.path()
            .join("orthologs/Gene_00845000001/Gene_00845000001.cds.fa"),
    )
    .unwrap();
    assert_eq!(
        cds,
        ">Canis_familiaris Gene_00845000001 | ENSCAFT00845000001\nATGGCCTAA\n\
         >Vulpes_vulpes Gene_00845000001 | ENSVVUG00000012\nATGGCGTAA\n"
    );
}
