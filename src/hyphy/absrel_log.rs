// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Summary of aBSREL console logs: which genes show episodic selection on the foreground branch,
// with omega, number of sites and p-value scraped from the log text.

use std::{collections::HashMap, fs, path::Path};

use csv::WriterBuilder;
use itertools::Itertools;
use log::{debug, info};
use regex::Regex;

use crate::annotation::{symbol_and_description, AnnotationMap, NO_DESCRIPTION};
use crate::errors::CanidError;
use crate::hyphy::{file_stem, files_with_extension};

pub const DEFAULT_FOREGROUND: &str = "Vulpes_vulpes";
pub const DEFAULT_OUTPUT: &str = "results_summary.tsv";
pub const NUM_KEYWORDS: usize = 10;

const SIGNIFICANT_MARKERS: [&str; 2] = ["p-value =  0.00000", "p-value = 0.00000"];
const TSV_HEADER: [&str; 6] = [
    "Gene_ID",
    "Gene_Symbol",
    "Omega",
    "Sites",
    "P_value",
    "Description",
];
const NA: &str = "NA";

fn compile(pattern: &str) -> Result<Regex, CanidError> {
    Regex::new(pattern).map_err(|e| CanidError::Format(format!("Malformed regex {}.", e)))
}

pub struct LogPatterns {
    omega: Regex,
    sites: Regex,
    pvalue: Regex,
}

impl LogPatterns {
    /// Patterns for a log in which `foreground` labels the branch of interest.
    pub fn new(foreground: &str) -> Result<Self, CanidError> {
        let omega = format!(
            r"\|\s+{}\s+\|\s+\d+\s+\|\s+([\d.>]+)\s+\(",
            regex::escape(foreground)
        );
        Ok(LogPatterns {
            omega: compile(&omega)?,
            sites: compile(r"Sites @ EBF>=100 \|\s+(\d+)")?,
            pvalue: compile(r"p-value =\s+([\d.]+)")?,
        })
    }

    fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
        re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogResult {
    pub gene: String,
    pub significant: bool,
    /// As printed, possibly with a leading '>' (e.g. ">1000").
    pub omega: Option<String>,
    pub sites: Option<u32>,
    pub pvalue: Option<f64>,
}

/// Details are only extracted from significant logs.
pub fn parse_log(gene: &str, content: &str, patterns: &LogPatterns) -> LogResult {
    let significant = SIGNIFICANT_MARKERS.iter().any(|m| content.contains(m));
    let mut result = LogResult {
        gene: gene.to_string(),
        significant,
        omega: None,
        sites: None,
        pvalue: None,
    };
    if significant {
        result.omega = LogPatterns::capture(&patterns.omega, content).map(String::from);
        result.sites =
            LogPatterns::capture(&patterns.sites, content).and_then(|s| s.parse().ok());
        result.pvalue =
            LogPatterns::capture(&patterns.pvalue, content).and_then(|s| s.parse().ok());
    }
    result
}

pub fn parse_log_file(path: &Path, patterns: &LogPatterns) -> Result<LogResult, CanidError> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(parse_log(&file_stem(path), &content, patterns))
}

/// Numeric omega for ranking; ">1000" counts as 1000, anything unparsable as 0.
pub fn omega_sort_key(omega: Option<&str>) -> f64 {
    omega
        .map(|o| o.replace('>', ""))
        .and_then(|o| o.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedGene {
    pub gene: String,
    pub symbol: String,
    pub description: String,
    pub omega: Option<String>,
    pub sites: Option<u32>,
    pub pvalue: Option<f64>,
}

/// Annotates the significant results and sorts them by decreasing omega (stable).
pub fn select_genes(results: &[LogResult], annotations: &AnnotationMap) -> Vec<SelectedGene> {
    let mut selected: Vec<SelectedGene> = results
        .iter()
        .filter(|r| r.significant)
        .map(|r| {
            let (symbol, description) = symbol_and_description(annotations, &r.gene);
            SelectedGene {
                gene: r.gene.clone(),
                symbol: symbol.to_string(),
                description: description.to_string(),
                omega: r.omega.clone(),
                sites: r.sites,
                pvalue: r.pvalue,
            }
        })
        .collect();
    selected.sort_by(|a, b| {
        omega_sort_key(b.omega.as_deref()).total_cmp(&omega_sort_key(a.omega.as_deref()))
    });
    selected
}

/// Most frequent description words (alphabetic, longer than four characters). Ties keep the
/// order in which words were first seen.
pub fn top_keywords(genes: &[SelectedGene], n: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let words = genes
        .iter()
        .filter(|g| g.description != NO_DESCRIPTION)
        .flat_map(|g| {
            g.description
                .to_lowercase()
                .split_whitespace()
                .map(String::from)
                .collect::<Vec<String>>()
        })
        .filter(|w| w.chars().count() > 4 && w.chars().all(char::is_alphabetic));
    for word in words {
        match index.get(&word) {
            Some(&ndx) => counts[ndx].1 += 1,
            None => {
                index.insert(word.clone(), counts.len());
                counts.push((word, 1));
            }
        }
    }
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(n)
        .collect()
}

fn opt_or_na<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| String::from(NA))
}

pub fn write_summary_tsv(path: &Path, genes: &[SelectedGene]) -> Result<(), CanidError> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(TSV_HEADER)?;
    for g in genes {
        writer.write_record([
            g.gene.clone(),
            g.symbol.clone(),
            opt_or_na(&g.omega),
            opt_or_na(&g.sites),
            opt_or_na(&g.pvalue),
            g.description.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Fixed-width table of selected genes, descriptions cut at 40 characters.
pub fn format_selected_table(genes: &[SelectedGene]) -> String {
    let rule = "=".repeat(100);
    let header = format!(
        "{:<20} {:<15} {:<15} {:<10} {:<40}",
        "Gene ID", "Symbol", "Omega (dN/dS)", "Sites", "Description"
    );
    let mut lines: Vec<String> = vec![rule.clone(), header.trim_end().to_string(), rule];
    for g in genes {
        let omega = g.omega.as_deref().unwrap_or("N/A");
        let sites = g
            .sites
            .map(|s| s.to_string())
            .unwrap_or_else(|| String::from("N/A"));
        let desc: String = g.description.chars().take(40).collect();
        let line = format!(
            "{:<20} {:<15} {:<15} {:<10} {:<40}",
            g.gene, g.symbol, omega, sites, desc
        );
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbsrelSummary {
    pub analysed: usize,
    pub selected: Vec<SelectedGene>,
    pub keywords: Vec<(String, usize)>,
}

impl AbsrelSummary {
    pub fn percent_selected(&self) -> f64 {
        if self.analysed == 0 {
            0.0
        } else {
            100.0 * self.selected.len() as f64 / self.analysed as f64
        }
    }
}

/// Parses every `*.log` in `logs_dir`, prints the selected genes and writes them to `output`.
/// An empty directory is not an error: the analysis may still be running.
pub fn summarise_logs(
    logs_dir: &Path,
    annotations: &AnnotationMap,
    foreground: &str,
    output: &Path,
) -> Result<AbsrelSummary, CanidError> {
    let patterns = LogPatterns::new(foreground)?;
    let files = files_with_extension(logs_dir, "log")?;
    println!("Total log files found: {}", files.len());
    if files.is_empty() {
        println!("No log files found. Analysis may still be running.");
        return Ok(AbsrelSummary::default());
    }

    println!("Parsing results...\n");
    let mut results: Vec<LogResult> = Vec::with_capacity(files.len());
    for file in &files {
        let result = parse_log_file(file, &patterns)?;
        debug!("{:?}", result);
        results.push(result);
    }

    let selected = select_genes(&results, annotations);
    let summary = AbsrelSummary {
        analysed: results.len(),
        keywords: top_keywords(&selected, NUM_KEYWORDS),
        selected,
    };
    info!(
        "{} of {} genes under selection on {}",
        summary.selected.len(),
        summary.analysed,
        foreground
    );

    println!("Total genes analyzed: {}", summary.analysed);
    println!(
        "Genes under positive selection: {} ({:.1}%)",
        summary.selected.len(),
        summary.percent_selected()
    );
    println!();
    if !summary.selected.is_empty() {
        println!("{}", format_selected_table(&summary.selected));
    }

    write_summary_tsv(output, &summary.selected)?;
    println!("\nDetailed results saved to: {}", output.display());

    println!("\n=== Functional Categories (Top Keywords) ===");
    for (keyword, count) in &summary.keywords {
        println!("  {}: {}", keyword, count);
    }

    Ok(summary)
}
