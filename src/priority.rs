// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Ranking of annotated domestication candidates for functional follow-up. Each gene gets four
// scores between 0 and 5 (selection strength, relevance to domestication phenotypes, how easily
// it can be assayed, how well it is characterised) and a tier from their sum.

use std::{collections::HashMap, fmt, fs, path::Path};

use csv::{ReaderBuilder, WriterBuilder};
use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;

use crate::annotation::{GENE_ID_COLUMN, UNKNOWN_SYMBOL};
use crate::errors::CanidError;

pub const DEFAULT_INPUT: &str = "results_3species_dog_only_ANNOTATED.tsv";
pub const DEFAULT_OUTPUT: &str = "enrichment_results/GENE_PRIORITIZATION_FOR_VALIDATION.tsv";
pub const DEFAULT_TIER1_OUTPUT: &str = "enrichment_results/TIER1_VALIDATION_GENES.tsv";
pub const DEFAULT_PVALUE_COLUMN: &str = "dog_pvalue";
pub const DEFAULT_OMEGA_COLUMN: &str = "dog_omega";

const SYMBOL_COLUMN: &str = "gene_symbol";
const DESCRIPTION_COLUMN: &str = "description";
const MAX_SCORE: f64 = 5.0;
const TIER1_MIN_TOTAL: f64 = 16.0;
const TIER2_MIN_TOTAL: f64 = 13.0;
const TOP_SHOWN: usize = 20;
const TIER1_GENES_SHOWN: usize = 10;

const OUTPUT_COLUMNS: [&str; 11] = [
    "gene_id",
    "gene_symbol",
    "description",
    "p_value",
    "omega",
    "selection_score",
    "relevance_score",
    "tractability_score",
    "literature_score",
    "total_score",
    "tier",
];

/// Gene families per domestication-related category. Patterns are matched, case-insensitively,
/// as substrings of the symbol or the description; each category counts once per gene.
pub const DOMESTICATION_CATEGORIES: [(&str, &[&str]); 8] = [
    (
        "behavior",
        &[
            "HTR2B", "GABRA3", "HCRTR1", "GNAQ", "GNAS", "RGS4", "SLC6A4", "MAOA", "COMT", "DRD4",
            "OXTR",
        ],
    ),
    (
        "neural_wnt",
        &[
            "LEF1", "FZD3", "FZD4", "DVL3", "SIX3", "CXXC4", "EDNRB", "WNT", "NOTCH", "SHH", "BMP",
            "FOXP2",
        ],
    ),
    (
        "morphology",
        &[
            "RUNX2", "SOX9", "PAX3", "MSX1", "DLX", "HOX", "FGFR2", "BMP", "IGF1", "GHR",
        ],
    ),
    (
        "stress",
        &[
            "CRHR1", "CRHR2", "NR3C1", "NR3C2", "POMC", "AVP", "CRH", "ACTH", "FKBP5",
        ],
    ),
    (
        "pigmentation",
        &[
            "MC1R", "ASIP", "TYR", "TYRP1", "DCT", "MLPH", "PMEL", "SLC45A2", "KIT", "MITF",
            "PAX3", "SOX10", "EDNRB",
        ],
    ),
    (
        "metabolism",
        &[
            "AMY2B", "MGAM", "SGLT1", "LIPC", "APOA2", "IGF1", "IGFBP", "GHR", "LEPR",
        ],
    ),
    (
        "reproduction",
        &["GNRH", "KISS1", "ESR1", "ESR2", "AR", "LH", "FSH", "AMH"],
    ),
    (
        "signaling",
        &[
            "MAPK", "ERK", "AKT", "mTOR", "PI3K", "JAK", "STAT", "SMAD", "receptor", "kinase",
        ],
    ),
];

fn category_weight(category: &str) -> f64 {
    match category {
        "behavior" | "neural_wnt" => 2.0,
        "morphology" | "stress" | "pigmentation" => 1.5,
        _ => 1.0,
    }
}

const BEHAVIOR_KEYWORDS: [&str; 5] = ["neurotransmitter", "synapse", "neural", "brain", "behavior"];
const MORPHOLOGY_KEYWORDS: [&str; 5] =
    ["craniofacial", "skeleton", "cartilage", "bone", "development"];
const SIGNALING_KEYWORDS: [&str; 4] = ["receptor", "signal", "kinase", "transcription factor"];

/// Groups for the Tier-1 breakdown, tried in order: (name, patterns searched in the upper-cased
/// symbol, patterns searched in the lower-cased description).
pub const TIER1_GROUPS: [(&str, &[&str], &[&str]); 4] = [
    (
        "Wnt/Neural",
        &["LEF1", "FZD", "DVL", "WNT", "EDNRB", "SIX"],
        &[],
    ),
    (
        "Behavior/Neurotransmitter",
        &["HTR", "GABA", "SLC6", "HCRTR", "GNAQ"],
        &[],
    ),
    (
        "Morphology/Development",
        &["FGFR", "BMP", "SOX", "HOX", "RUNX"],
        &["fgfr", "bmp", "sox", "hox", "runx"],
    ),
    ("Signaling", &[], &["receptor", "kinase", "signal"]),
];
pub const OTHER_GROUP: &str = "Other";

fn contains_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

/// 2 to 5 depending on the p-value, plus up to 0.5 for a high omega; capped at 5. A missing
/// value counts as not significant.
pub fn selection_score(pvalue: Option<f64>, omega: Option<f64>) -> f64 {
    let base = match pvalue {
        Some(p) if p < 1e-15 => 5.0,
        Some(p) if p < 1e-10 => 4.5,
        Some(p) if p < 1e-5 => 4.0,
        Some(p) if p < 1e-3 => 3.0,
        _ => 2.0,
    };
    let bonus = match omega {
        Some(w) if w > 0.8 => 0.5,
        Some(w) if w > 0.5 => 0.25,
        _ => 0.0,
    };
    f64::min(base + bonus, MAX_SCORE)
}

pub fn relevance_score(symbol: &str, description: &str) -> f64 {
    let symbol = symbol.to_lowercase();
    let desc = description.to_lowercase();
    let mut score: f64 = DOMESTICATION_CATEGORIES
        .iter()
        .filter(|(_, genes)| {
            genes
                .iter()
                .map(|g| g.to_lowercase())
                .any(|g| symbol.contains(&g) || desc.contains(&g))
        })
        .map(|(category, _)| category_weight(category))
        .sum();
    if contains_any(&desc, &BEHAVIOR_KEYWORDS) {
        score += 1.0;
    }
    if contains_any(&desc, &MORPHOLOGY_KEYWORDS) {
        score += 0.5;
    }
    let n_signaling = SIGNALING_KEYWORDS
        .iter()
        .filter(|kw| desc.contains(*kw))
        .count();
    score += 0.25 * n_signaling as f64;
    f64::min(score, MAX_SCORE)
}

/// Receptors, kinases and transcription factors are the easiest to assay; between 1 and 5.
pub fn tractability_score(description: &str) -> f64 {
    let desc = description.to_lowercase();
    let mut score: f64 = 3.0;
    if contains_any(&desc, &["receptor", "kinase", "transcription factor"]) {
        score += 1.5;
    }
    if contains_any(&desc, &["enzyme", "binding", "activity"]) {
        score += 1.0;
    }
    if desc.contains("membrane") {
        score += 0.5;
    }
    if contains_any(&desc, &["nuclear", "mitochondrial"]) {
        score -= 0.5;
    }
    score.clamp(1.0, MAX_SCORE)
}

/// Detailed descriptions stand in for literature support; 1 for an undescribed gene.
pub fn literature_score(description: &str) -> f64 {
    let desc = description.to_lowercase();
    if desc == "no description" {
        return 1.0;
    }
    let mut score: f64 = 3.0;
    if desc.chars().count() > 50 {
        score += 1.0;
    }
    if contains_any(&desc, &["receptor", "factor", "enzyme"]) {
        score += 0.5;
    }
    f64::min(score, MAX_SCORE)
}

pub fn tier_for(total: f64) -> u8 {
    if total >= TIER1_MIN_TOTAL {
        1
    } else if total >= TIER2_MIN_TOTAL {
        2
    } else {
        3
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// An annotated gene from the input table.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub gene_id: String,
    pub symbol: String,
    pub description: String,
    pub pvalue: Option<f64>,
    pub omega: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredGene {
    pub gene_id: String,
    pub gene_symbol: String,
    pub description: String,
    pub p_value: Option<f64>,
    pub omega: Option<f64>,
    pub selection_score: f64,
    pub relevance_score: f64,
    pub tractability_score: f64,
    pub literature_score: f64,
    pub total_score: f64,
    pub tier: u8,
}

impl ScoredGene {
    /// Tier-1 group of the gene; see `TIER1_GROUPS`.
    pub fn group(&self) -> &'static str {
        let symbol = self.gene_symbol.to_uppercase();
        let desc = self.description.to_lowercase();
        TIER1_GROUPS
            .iter()
            .find(|(_, in_symbol, in_desc)| {
                contains_any(&symbol, in_symbol) || contains_any(&desc, in_desc)
            })
            .map(|(name, _, _)| *name)
            .unwrap_or(OTHER_GROUP)
    }
}

/// Scores are rounded to two decimals; the tier is taken from the unrounded total.
pub fn score_candidate(candidate: &Candidate) -> ScoredGene {
    let selection = selection_score(candidate.pvalue, candidate.omega);
    let relevance = relevance_score(&candidate.symbol, &candidate.description);
    let tractability = tractability_score(&candidate.description);
    let literature = literature_score(&candidate.description);
    let total = selection + relevance + tractability + literature;
    ScoredGene {
        gene_id: candidate.gene_id.clone(),
        gene_symbol: candidate.symbol.clone(),
        description: candidate.description.clone(),
        p_value: candidate.pvalue,
        omega: candidate.omega,
        selection_score: round2(selection),
        relevance_score: round2(relevance),
        tractability_score: round2(tractability),
        literature_score: round2(literature),
        total_score: round2(total),
        tier: tier_for(total),
    }
}

/// Columns holding the p-value and omega of the lineage being ranked.
#[derive(Debug, Clone)]
pub struct ScoreColumns {
    pub pvalue: String,
    pub omega: String,
}

impl Default for ScoreColumns {
    fn default() -> Self {
        ScoreColumns {
            pvalue: String::from(DEFAULT_PVALUE_COLUMN),
            omega: String::from(DEFAULT_OMEGA_COLUMN),
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

/// Reads an annotated table (as written by `annotate`). Returns the number of rows and the genes
/// with a known symbol.
pub fn read_candidates(
    path: &Path,
    columns: &ScoreColumns,
) -> Result<(usize, Vec<Candidate>), CanidError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let required = [
        GENE_ID_COLUMN,
        SYMBOL_COLUMN,
        DESCRIPTION_COLUMN,
        columns.pvalue.as_str(),
        columns.omega.as_str(),
    ];
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(CanidError::Format(format!(
            "Missing required columns {:?} in {}",
            missing,
            path.display()
        )));
    }

    let mut n_rows = 0;
    let mut candidates: Vec<Candidate> = Vec::new();
    for row in reader.deserialize() {
        let row: HashMap<String, String> = row?;
        n_rows += 1;
        let field = |name: &str| row.get(name).cloned().unwrap_or_default();
        let symbol = field(SYMBOL_COLUMN);
        if symbol == UNKNOWN_SYMBOL {
            continue;
        }
        candidates.push(Candidate {
            gene_id: field(GENE_ID_COLUMN),
            symbol,
            description: field(DESCRIPTION_COLUMN),
            pvalue: parse_number(&field(&columns.pvalue)),
            omega: parse_number(&field(&columns.omega)),
        });
    }
    Ok((n_rows, candidates))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriorityReport {
    /// By decreasing total score; ties keep input order.
    pub genes: Vec<ScoredGene>,
}

impl PriorityReport {
    pub fn new(genes: Vec<ScoredGene>) -> Self {
        let genes = genes
            .into_iter()
            .sorted_by(|a, b| b.total_score.total_cmp(&a.total_score))
            .collect();
        PriorityReport { genes }
    }

    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        PriorityReport::new(candidates.iter().map(score_candidate).collect())
    }

    pub fn in_tier(&self, tier: u8) -> Vec<&ScoredGene> {
        self.genes.iter().filter(|g| g.tier == tier).collect()
    }

    /// Tier-1 symbols per group, in `TIER1_GROUPS` order then `OTHER_GROUP`; empty groups are
    /// left out.
    pub fn tier1_groups(&self) -> Vec<(&'static str, Vec<&str>)> {
        TIER1_GROUPS
            .iter()
            .map(|(name, _, _)| *name)
            .chain(std::iter::once(OTHER_GROUP))
            .map(|name| {
                let members: Vec<&str> = self
                    .genes
                    .iter()
                    .filter(|g| g.tier == 1 && g.group() == name)
                    .map(|g| g.gene_symbol.as_str())
                    .collect();
                (name, members)
            })
            .filter(|(_, members)| !members.is_empty())
            .collect()
    }
}

pub fn write_scores_tsv(path: &Path, genes: &[&ScoredGene]) -> Result<(), CanidError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(OUTPUT_COLUMNS)?;
    for gene in genes {
        writer.serialize(gene)?;
    }
    writer.flush()?;
    Ok(())
}

fn top_line(rank: usize, gene: &ScoredGene) -> String {
    let symbol: String = gene.gene_symbol.chars().take(9).collect();
    let desc: String = gene.description.chars().take(35).collect();
    let line = format!(
        "{:<5} {:<10} {:<6} {:<5} {:<5} {:<5} {:<5} {}",
        rank,
        symbol,
        format!("{:.1}", gene.total_score),
        format!("{:.1}", gene.selection_score),
        format!("{:.1}", gene.relevance_score),
        format!("{:.1}", gene.tractability_score),
        format!("{:.1}", gene.literature_score),
        desc
    );
    line.trim_end().to_string()
}

impl fmt::Display for PriorityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(80);
        writeln!(f, "{}", rule)?;
        writeln!(f, "PRIORITIZATION SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;
        for (tier, priority) in [(1, "IMMEDIATE"), (2, "FOLLOW-UP"), (3, "EXPLORATORY")] {
            writeln!(
                f,
                "Tier {} (Priority: {}): {} genes",
                tier,
                priority,
                self.in_tier(tier).len()
            )?;
        }

        writeln!(f, "\n{}", rule)?;
        writeln!(f, "TOP {} GENES FOR VALIDATION", TOP_SHOWN)?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<5} {:<10} {:<6} {:<5} {:<5} {:<5} {:<5} Description",
            "Rank", "Gene", "Total", "Sel", "Rel", "Tract", "Lit"
        )?;
        writeln!(f, "{}", "-".repeat(80))?;
        for (i, gene) in self.genes.iter().take(TOP_SHOWN).enumerate() {
            writeln!(f, "{}", top_line(i + 1, gene))?;
        }

        writeln!(f, "\n{}", rule)?;
        writeln!(f, "TIER 1 GENES BY CATEGORY")?;
        write!(f, "{}", rule)?;
        for (name, members) in self.tier1_groups() {
            writeln!(f, "\n")?;
            writeln!(f, "{}: {} genes", name, members.len())?;
            write!(f, "  {}", members.iter().take(TIER1_GENES_SHOWN).join(", "))?;
            if members.len() > TIER1_GENES_SHOWN {
                write!(f, "\n  ... and {} more", members.len() - TIER1_GENES_SHOWN)?;
            }
        }
        Ok(())
    }
}

/// Scores the annotated genes of `input`, writes the ranked table and the Tier-1 table, and
/// prints the report.
pub fn prioritize_file(
    input: &Path,
    columns: &ScoreColumns,
    output: &Path,
    tier1_output: &Path,
) -> Result<PriorityReport, CanidError> {
    let rule = "=".repeat(80);
    println!("{}", rule);
    println!("GENE PRIORITIZATION FOR FUNCTIONAL VALIDATION");
    println!("{}", rule);
    println!();

    let (n_rows, candidates) = read_candidates(input, columns)?;
    info!("Read {} rows from {}", n_rows, input.display());
    println!("Total domestication genes: {}", n_rows);
    println!("Annotated genes: {}", candidates.len());
    println!();

    let report = PriorityReport::from_candidates(&candidates);
    debug!(
        "Top score: {:?}",
        report.genes.first().map(|g| g.total_score)
    );
    let all: Vec<&ScoredGene> = report.genes.iter().collect();
    write_scores_tsv(output, &all)?;
    println!("Saved prioritization results: {}", output.display());
    println!();
    println!("{}", report);
    println!();
    write_scores_tsv(tier1_output, &report.in_tier(1))?;
    println!("\nSaved Tier 1 genes: {}", tier1_output.display());
    Ok(report)
}
