// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Keyword-based functional categories for genes under selection. A gene belongs to every
// category one of whose keywords occurs in its lower-cased symbol and description.

use std::{fmt, path::Path};

use csv::{ReaderBuilder, WriterBuilder};
use itertools::Itertools;
use log::info;
use serde::Deserialize;

use crate::annotation::{NO_DESCRIPTION, UNKNOWN_SYMBOL};
use crate::errors::CanidError;

pub const OTHER: &str = "Other/Unknown";
const GENES_SHOWN: usize = 10;

pub const CATEGORIES: [(&str, &[&str]); 13] = [
    (
        "Transcription & Gene Regulation",
        &[
            "transcription", "zinc finger", "znf", "homeobox", "pou", "creb", "tata", "taf",
            "sox", "phd finger", "chromatin", "histone", "hdac",
        ],
    ),
    (
        "Metabolism & Energy",
        &[
            "kinase", "metabolic", "glyco", "reductase", "oxidase", "synthase", "dehydrogenase",
            "transferase", "phosphatase", "insulin", "glucose",
        ],
    ),
    (
        "Protein Processing & Degradation",
        &[
            "proteasome", "ubiquitin", "protease", "peptidase", "chaperone", "f-box", "fbxl",
            "sumo", "deubiquitinase",
        ],
    ),
    (
        "RNA Processing & Translation",
        &[
            "ribosom", "rna ", "mrna", "rrna", "splicing", "spliceosome", "translation", "lsm",
            "rbm", "deadbox", "ddx",
        ],
    ),
    (
        "Neural & Synaptic",
        &[
            "neural", "neuron", "synap", "neuro", "brain", "calcium channel", "neurotransmitter",
            "ncam", "receptor",
        ],
    ),
    (
        "Signal Transduction",
        &[
            "signal", "g protein", "gnb", "gtp", "ras", "kinase", "phosphatase", "receptor",
            "ligand", "chemokine", "cytokine",
        ],
    ),
    (
        "Cell Cycle & Division",
        &[
            "cell cycle", "cyclin", "mitotic", "kinetochore", "centrosome", "centriole",
            "spindle", "cep", "nek",
        ],
    ),
    (
        "Immune System",
        &[
            "immune", "antigen", "antibody", "lymphocyte", "mhc", "hla", "interferon",
            "interleukin", "cd164", "ly9",
        ],
    ),
    (
        "Mitochondrial",
        &["mitochondrial", "mtch", "mrpl", "mecr", "cox"],
    ),
    (
        "Sensory & Receptor",
        &[
            "taste", "olfact", "opsin", "rhodopsin", "receptor", "gpcr", "odorant", "vomeronasal",
        ],
    ),
    (
        "Membrane & Transport",
        &[
            "membrane", "transport", "solute carrier", "slc", "channel", "transporter", "tram",
            "syntaxin",
        ],
    ),
    (
        "Cytoskeleton & Motility",
        &[
            "actin", "tubulin", "myosin", "dynein", "kinesin", "motor protein", "cilium",
            "flagell", "ift",
        ],
    ),
    (
        "DNA Repair & Maintenance",
        &[
            "dna repair", "rad", "excision", "telomere", "chromosome", "nucleotide excision",
            "mismatch repair",
        ],
    ),
];

/// Categories of a gene, in declaration order; `OTHER` if none applies.
pub fn categorize_gene(symbol: &str, description: &str) -> Vec<&'static str> {
    let text = format!("{} {}", symbol, description).to_lowercase();
    let categories: Vec<&'static str> = CATEGORIES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(name, _)| *name)
        .collect();
    if categories.is_empty() {
        vec![OTHER]
    } else {
        categories
    }
}

/// One row of a results table as written by `absrel-logs`; other columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Gene_ID")]
    pub gene_id: String,
    #[serde(rename = "Gene_Symbol")]
    pub symbol: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Omega")]
    pub omega: String,
}

pub fn read_results_table(path: &Path) -> Result<Vec<ResultRow>, CanidError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;
    let mut rows: Vec<ResultRow> = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryReport {
    pub genes: Vec<ResultRow>,
    /// Categories of each gene, parallel to `genes`.
    pub assignments: Vec<Vec<&'static str>>,
    /// Non-empty categories with the indices of their genes, largest first; ties are in
    /// declaration order, with `OTHER` last.
    pub ranking: Vec<(&'static str, Vec<usize>)>,
}

impl CategoryReport {
    pub fn new(genes: Vec<ResultRow>) -> Self {
        let assignments: Vec<Vec<&'static str>> = genes
            .iter()
            .map(|g| categorize_gene(&g.symbol, &g.description))
            .collect();
        let ranking = CATEGORIES
            .iter()
            .map(|(name, _)| *name)
            .chain(std::iter::once(OTHER))
            .map(|name| {
                let members: Vec<usize> = assignments
                    .iter()
                    .enumerate()
                    .filter(|(_, cats)| cats.contains(&name))
                    .map(|(ndx, _)| ndx)
                    .collect();
                (name, members)
            })
            .filter(|(_, members)| !members.is_empty())
            .sorted_by(|a, b| b.1.len().cmp(&a.1.len()))
            .collect();
        CategoryReport {
            genes,
            assignments,
            ranking,
        }
    }

    pub fn num_annotated(&self) -> usize {
        self.genes
            .iter()
            .filter(|g| g.symbol != UNKNOWN_SYMBOL)
            .count()
    }

    pub fn total_assignments(&self) -> usize {
        self.assignments.iter().map(Vec::len).sum()
    }

    pub fn mean_categories_per_gene(&self) -> f64 {
        if self.genes.is_empty() {
            0.0
        } else {
            self.total_assignments() as f64 / self.genes.len() as f64
        }
    }

    /// Writes gene, symbol and `; `-separated categories as TSV.
    pub fn write_assignments(&self, path: &Path) -> Result<(), CanidError> {
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
        writer.write_record(["Gene_ID", "Gene_Symbol", "Categories"])?;
        for (gene, cats) in self.genes.iter().zip(&self.assignments) {
            writer.write_record([
                gene.gene_id.as_str(),
                gene.symbol.as_str(),
                cats.join("; ").as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn gene_line(&self, rank: usize, gene: &ResultRow) -> String {
        let label = if gene.symbol != UNKNOWN_SYMBOL {
            &gene.symbol
        } else {
            &gene.gene_id
        };
        let omega: String = gene.omega.chars().take(10).collect();
        let desc: String = if gene.description != NO_DESCRIPTION {
            gene.description.chars().take(50).collect()
        } else {
            String::new()
        };
        let line = format!("  {:2}. {:15} (ω={:10}) {}", rank, label, omega, desc);
        line.trim_end().to_string()
    }
}

impl fmt::Display for CategoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(80);
        writeln!(f, "Total genes under selection: {}", self.genes.len())?;
        writeln!(f, "Genes with annotations: {}", self.num_annotated())?;
        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "FUNCTIONAL CATEGORIES (Ranked by Number of Genes)")?;
        writeln!(f, "{}", rule)?;

        for (name, members) in &self.ranking {
            writeln!(f, "\n### {} ({} genes)", name, members.len())?;
            writeln!(f, "{}", "-".repeat(80))?;
            for (i, &ndx) in members.iter().take(GENES_SHOWN).enumerate() {
                writeln!(f, "{}", self.gene_line(i + 1, &self.genes[ndx]))?;
            }
            if members.len() > GENES_SHOWN {
                writeln!(f, "     ... and {} more", members.len() - GENES_SHOWN)?;
            }
        }

        writeln!(f, "\n{}", rule)?;
        writeln!(f, "CATEGORY SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;
        for (name, members) in &self.ranking {
            let pct = 100.0 * members.len() as f64 / self.genes.len() as f64;
            writeln!(f, "  {:40} {:4} genes ({:5.1}%)", name, members.len(), pct)?;
        }
        writeln!(f)?;
        writeln!(f, "Note: Some genes may belong to multiple categories")?;
        writeln!(f, "Total category assignments: {}", self.total_assignments())?;
        write!(
            f,
            "Average categories per gene: {:.2}",
            self.mean_categories_per_gene()
        )
    }
}

/// Categorizes the genes of a results table and prints the report; optionally writes the
/// per-gene assignments.
pub fn categorize_file(input: &Path, output: Option<&Path>) -> Result<CategoryReport, CanidError> {
    let genes = read_results_table(input)?;
    info!("Read {} genes from {}", genes.len(), input.display());
    let report = CategoryReport::new(genes);
    println!("{}", "=".repeat(80));
    println!("FUNCTIONAL CATEGORIZATION OF GENES UNDER POSITIVE SELECTION");
    println!("{}", "=".repeat(80));
    println!();
    println!("{}", report);
    if let Some(path) = output {
        report.write_assignments(path)?;
        println!("\nCategory assignments saved to: {}", path.display());
    }
    Ok(report)
}
