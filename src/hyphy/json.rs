// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// Summaries of HyPhy JSON output, one row per gene (i.e. per JSON file).

use std::{fmt, fs, path::Path};

use clap::ValueEnum;
use csv::WriterBuilder;
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::errors::CanidError;
use crate::hyphy::{file_stem, files_with_extension, SIGNIFICANCE};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum HyphyTest {
    #[clap(name = "absrel")]
    Absrel,
    #[clap(name = "busted")]
    Busted,
    #[clap(name = "relax")]
    Relax,
    #[clap(name = "meme")]
    Meme,
    #[clap(name = "fel")]
    Fel,
}

impl fmt::Display for HyphyTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HyphyTest::Absrel => "absrel",
            HyphyTest::Busted => "busted",
            HyphyTest::Relax => "relax",
            HyphyTest::Meme => "meme",
            HyphyTest::Fel => "fel",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsrelResult {
    pub gene: String,
    pub pvalue: f64,
    pub n_branches_tested: usize,
    pub n_significant: usize,
    pub significant_branches: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BustedResult {
    pub gene: String,
    pub pvalue: f64,
    #[serde(rename = "LRT")]
    pub lrt: Option<f64>,
    pub evidence_of_selection: bool,
    pub background_omega: Option<String>,
    pub test_omega: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelaxResult {
    pub gene: String,
    pub pvalue: f64,
    #[serde(rename = "LRT")]
    pub lrt: Option<f64>,
    pub k_value: Option<f64>,
    pub interpretation: String,
    pub significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemeResult {
    pub gene: String,
    pub n_sites_tested: usize,
    pub n_significant_sites: usize,
    pub proportion_selected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FelResult {
    pub gene: String,
    pub n_sites: usize,
    pub positive_selection_sites: usize,
    pub negative_selection_sites: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HyphyResult {
    Absrel(AbsrelResult),
    Busted(BustedResult),
    Relax(RelaxResult),
    Meme(MemeResult),
    Fel(FelResult),
}

impl HyphyResult {
    /// Gene-level p-value, for the tests that report one.
    pub fn pvalue(&self) -> Option<f64> {
        match self {
            HyphyResult::Absrel(r) => Some(r.pvalue),
            HyphyResult::Busted(r) => Some(r.pvalue),
            HyphyResult::Relax(r) => Some(r.pvalue),
            HyphyResult::Meme(_) | HyphyResult::Fel(_) => None,
        }
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

fn f64_at(value: &Value, path: &[&str]) -> Option<f64> {
    lookup(value, path).and_then(Value::as_f64)
}

fn pvalue_of(value: &Value) -> f64 {
    f64_at(value, &["test results", "p-value"]).unwrap_or(1.0)
}

// MLE content is keyed by site in some HyPhy versions and a plain list in others.
fn mle_sites(value: &Value) -> Result<Vec<&Value>, CanidError> {
    match lookup(value, &["MLE", "content"]) {
        None => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.values().collect()),
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(other) => Err(CanidError::Format(format!(
            "Unexpected MLE content: {}",
            other
        ))),
    }
}

fn is_tested(tested: Option<&Value>, branch: &str) -> bool {
    match tested.and_then(|t| t.get(branch)) {
        Some(Value::Number(n)) => n.as_f64().map(|x| x > 0.0).unwrap_or(false),
        Some(Value::String(s)) => s == "test",
        _ => false,
    }
}

pub fn parse_absrel(gene: &str, data: &Value) -> Result<AbsrelResult, CanidError> {
    let mut n_tested = 0;
    let mut significant: Vec<&str> = Vec::new();
    if let Some(branches) = data.get("branch attributes").and_then(Value::as_object) {
        for (name, attrs) in branches {
            if !is_tested(data.get("tested"), name) {
                continue;
            }
            n_tested += 1;
            let corrected = f64_at(attrs, &["Corrected P-value"]).unwrap_or(1.0);
            debug!(
                "{} {}: corrected p {}, uncorrected p {}, omega {:?}",
                gene,
                name,
                corrected,
                f64_at(attrs, &["Uncorrected P-value"]).unwrap_or(1.0),
                lookup(attrs, &["Rate classes", "omega"])
            );
            if corrected < SIGNIFICANCE {
                significant.push(name);
            }
        }
    }
    Ok(AbsrelResult {
        gene: gene.to_string(),
        pvalue: pvalue_of(data),
        n_branches_tested: n_tested,
        n_significant: significant.len(),
        significant_branches: significant.iter().join(";"),
    })
}

pub fn parse_busted(gene: &str, data: &Value) -> Result<BustedResult, CanidError> {
    let pvalue = pvalue_of(data);
    let distribution = |which: &str| -> Result<Option<String>, CanidError> {
        match lookup(
            data,
            &["fits", "Unconstrained model", "Rate Distributions", which],
        ) {
            Some(v) => Ok(Some(serde_json::to_string(v)?)),
            None => Ok(None),
        }
    };
    Ok(BustedResult {
        gene: gene.to_string(),
        pvalue,
        lrt: f64_at(data, &["test results", "LRT"]),
        evidence_of_selection: pvalue < SIGNIFICANCE,
        background_omega: distribution("background")?,
        test_omega: distribution("test")?,
    })
}

pub fn relax_interpretation(k: Option<f64>) -> &'static str {
    match k {
        Some(k) if k > 1.0 => "intensified",
        Some(k) if k < 1.0 => "relaxed",
        Some(_) => "neutral",
        None => "unknown",
    }
}

pub fn parse_relax(gene: &str, data: &Value) -> Result<RelaxResult, CanidError> {
    let pvalue = pvalue_of(data);
    let k = f64_at(
        data,
        &["test results", "relaxation or intensification parameter"],
    );
    Ok(RelaxResult {
        gene: gene.to_string(),
        pvalue,
        lrt: f64_at(data, &["test results", "LRT"]),
        k_value: k,
        interpretation: relax_interpretation(k).to_string(),
        significant: pvalue < SIGNIFICANCE,
    })
}

pub fn parse_meme(gene: &str, data: &Value) -> Result<MemeResult, CanidError> {
    let sites = mle_sites(data)?;
    let n_significant = sites
        .iter()
        .filter(|site| site.is_object())
        .filter(|site| f64_at(site, &["p-value"]).unwrap_or(1.0) < SIGNIFICANCE)
        .count();
    let proportion = if sites.is_empty() {
        0.0
    } else {
        n_significant as f64 / sites.len() as f64
    };
    Ok(MemeResult {
        gene: gene.to_string(),
        n_sites_tested: sites.len(),
        n_significant_sites: n_significant,
        proportion_selected: proportion,
    })
}

pub fn parse_fel(gene: &str, data: &Value) -> Result<FelResult, CanidError> {
    let sites = mle_sites(data)?;
    let mut positive = 0;
    let mut negative = 0;
    for site in sites.iter().filter(|s| s.is_object()) {
        let alpha = f64_at(site, &["alpha"]).unwrap_or(0.0);
        let beta = f64_at(site, &["beta"]).unwrap_or(0.0);
        if f64_at(site, &["p-value"]).unwrap_or(1.0) >= SIGNIFICANCE {
            continue;
        }
        if beta > alpha {
            positive += 1;
        } else if alpha > beta {
            negative += 1;
        }
    }
    Ok(FelResult {
        gene: gene.to_string(),
        n_sites: sites.len(),
        positive_selection_sites: positive,
        negative_selection_sites: negative,
    })
}

pub fn parse_value(test: HyphyTest, gene: &str, data: &Value) -> Result<HyphyResult, CanidError> {
    if !data.is_object() {
        return Err(CanidError::Format(String::from(
            "HyPhy output is not a JSON object",
        )));
    }
    let result = match test {
        HyphyTest::Absrel => HyphyResult::Absrel(parse_absrel(gene, data)?),
        HyphyTest::Busted => HyphyResult::Busted(parse_busted(gene, data)?),
        HyphyTest::Relax => HyphyResult::Relax(parse_relax(gene, data)?),
        HyphyTest::Meme => HyphyResult::Meme(parse_meme(gene, data)?),
        HyphyTest::Fel => HyphyResult::Fel(parse_fel(gene, data)?),
    };
    Ok(result)
}

pub fn parse_file(test: HyphyTest, path: &Path) -> Result<HyphyResult, CanidError> {
    let text = fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&text)?;
    parse_value(test, &file_stem(path), &data)
}

pub fn write_results_csv(path: &Path, results: &[HyphyResult]) -> Result<(), CanidError> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for result in results {
        match result {
            HyphyResult::Absrel(r) => writer.serialize(r)?,
            HyphyResult::Busted(r) => writer.serialize(r)?,
            HyphyResult::Relax(r) => writer.serialize(r)?,
            HyphyResult::Meme(r) => writer.serialize(r)?,
            HyphyResult::Fel(r) => writer.serialize(r)?,
        }
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseSummary {
    pub parsed: usize,
    pub failed: usize,
    /// Results with p < 0.05, for tests with a gene-level p-value.
    pub significant: Option<usize>,
}

impl fmt::Display for ParseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Summary ===")?;
        writeln!(f, "Successfully parsed: {}", self.parsed)?;
        write!(f, "Failed: {}", self.failed)?;
        if let Some(n_sig) = self.significant {
            let pct = if self.parsed > 0 {
                100.0 * n_sig as f64 / self.parsed as f64
            } else {
                0.0
            };
            write!(
                f,
                "\nSignificant results (p < {}): {} / {} ({:.1}%)",
                SIGNIFICANCE, n_sig, self.parsed, pct
            )?;
        }
        Ok(())
    }
}

/// Parses every `*.json` file in `input_dir` and writes one CSV row per gene to `output`. Files
/// that fail to parse are skipped; it is an error if none parse at all.
pub fn parse_directory(
    input_dir: &Path,
    output: &Path,
    test: HyphyTest,
) -> Result<ParseSummary, CanidError> {
    let files = files_with_extension(input_dir, "json")?;
    if files.is_empty() {
        return Err(CanidError::Format(format!(
            "No JSON files found in {}",
            input_dir.display()
        )));
    }
    println!("Found {} JSON files", files.len());
    println!("Test type: {}", test);
    println!();

    let mut results: Vec<HyphyResult> = Vec::new();
    let mut failed = 0;
    for (i, file) in files.iter().enumerate() {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("[{}/{}] Parsing {}...", i + 1, files.len(), name);
        match parse_file(test, file) {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!("Error parsing {}: {}", file.display(), e);
                failed += 1;
            }
        }
    }

    if results.is_empty() {
        return Err(CanidError::Format(String::from(
            "No results parsed successfully",
        )));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_results_csv(output, &results)?;

    let significant = match test {
        HyphyTest::Absrel | HyphyTest::Busted | HyphyTest::Relax => Some(
            results
                .iter()
                .filter_map(HyphyResult::pvalue)
                .filter(|&p| p < SIGNIFICANCE)
                .count(),
        ),
        HyphyTest::Meme | HyphyTest::Fel => None,
    };
    Ok(ParseSummary {
        parsed: results.len(),
        failed,
        significant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    #[test]
    fn test_parse_absrel() {
        let data = json!({
            "tested": {"Vulpes_vulpes": 1, "Canis_dingo": "test", "Node3": 0},
            "branch attributes": {
                "Vulpes_vulpes": {"Corrected P-value": 0.001, "Uncorrected P-value": 0.0002},
                "Canis_dingo": {"Corrected P-value": 0.2},
                "Node3": {"Corrected P-value": 0.0}
            },
            "test results": {"p-value": 0.002}
        });
        let r = parse_absrel("Gene_1", &data).unwrap();
        assert_eq!(r.gene, "Gene_1");
        assert_abs_diff_eq!(r.pvalue, 0.002);
        assert_eq!(r.n_branches_tested, 2);
        assert_eq!(r.n_significant, 1);
        assert_eq!(r.significant_branches, "Vulpes_vulpes");
    }

    #[test]
    fn test_parse_absrel_defaults() {
        let r = parse_absrel("G", &json!({})).unwrap();
        assert_abs_diff_eq!(r.pvalue, 1.0);
        assert_eq!(r.n_branches_tested, 0);
        assert_eq!(r.significant_branches, "");
    }

    #[test]
    fn test_parse_busted() {
        let data = json!({
            "test results": {"p-value": 0.01, "LRT": 9.5},
            "fits": {"Unconstrained model": {"Rate Distributions": {
                "test": {"0": {"omega": 0.1, "proportion": 0.9}}
            }}}
        });
        let r = parse_busted("G", &data).unwrap();
        assert!(r.evidence_of_selection);
        assert_eq!(r.lrt, Some(9.5));
        assert_eq!(r.background_omega, None);
        assert_eq!(
            r.test_omega.as_deref(),
            Some(r#"{"0":{"omega":0.1,"proportion":0.9}}"#)
        );
    }

    #[test]
    fn test_relax_interpretation() {
        assert_eq!(relax_interpretation(Some(1.7)), "intensified");
        assert_eq!(relax_interpretation(Some(0.3)), "relaxed");
        assert_eq!(relax_interpretation(Some(1.0)), "neutral");
        assert_eq!(relax_interpretation(None), "unknown");
        let data = json!({"test results": {
            "p-value": 0.2, "LRT": 1.1, "relaxation or intensification parameter": 0.5
        }});
        let r = parse_relax("G", &data).unwrap();
        assert_eq!(r.interpretation, "relaxed");
        assert!(!r.significant);
    }

    #[test]
    fn test_parse_meme_object_and_array() {
        let data = json!({"MLE": {"content": {
            "1": {"p-value": 0.01},
            "2": {"p-value": 0.5},
            "3": {"p-value": 0.04},
            "4": [0.1, 0.2]
        }}});
        let r = parse_meme("G", &data).unwrap();
        assert_eq!(r.n_sites_tested, 4);
        assert_eq!(r.n_significant_sites, 2);
        assert_abs_diff_eq!(r.proportion_selected, 0.5);

        let data = json!({"MLE": {"content": [{"p-value": 0.01}, {"p-value": 0.9}]}});
        let r = parse_meme("G", &data).unwrap();
        assert_eq!(r.n_sites_tested, 2);
        assert_eq!(r.n_significant_sites, 1);

        let r = parse_meme("G", &json!({})).unwrap();
        assert_abs_diff_eq!(r.proportion_selected, 0.0);
    }

    #[test]
    fn test_parse_fel() {
        let data = json!({"MLE": {"content": {
            "1": {"alpha": 0.1, "beta": 2.0, "p-value": 0.01},
            "2": {"alpha": 3.0, "beta": 0.5, "p-value": 0.02},
            "3": {"alpha": 3.0, "beta": 0.5, "p-value": 0.5},
            "4": {"alpha": 1.0, "beta": 1.0, "p-value": 0.01}
        }}});
        let r = parse_fel("G", &data).unwrap();
        assert_eq!(r.n_sites, 4);
        assert_eq!(r.positive_selection_sites, 1);
        assert_eq!(r.negative_selection_sites, 1);
    }

    #[test]
    fn test_parse_value_rejects_non_object() {
        assert!(parse_value(HyphyTest::Busted, "G", &json!([1, 2])).is_err());
        assert!(parse_value(HyphyTest::Meme, "G", &json!({"MLE": {"content": 3}})).is_err());
    }

    #[test]
    fn test_parse_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join("Gene_2.json"),
            r#"{"test results": {"p-value": 0.5, "LRT": 0.1}}"#,
        )
        .unwrap();
        fs::write(
            input.path().join("Gene_1.json"),
            r#"{"test results": {"p-value": 0.001, "LRT": 12.0}}"#,
        )
        .unwrap();
        fs::write(input.path().join("Gene_3.json"), "{ truncated").unwrap();
        let csv_path = output.path().join("nested").join("busted.csv");

        let summary = parse_directory(input.path(), &csv_path, HyphyTest::Busted).unwrap();
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.significant, Some(1));

        let text = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "gene,pvalue,LRT,evidence_of_selection,background_omega,test_omega"
        );
        assert_eq!(lines[1], "Gene_1,0.001,12.0,true,,");
        assert_eq!(lines[2], "Gene_2,0.5,0.1,false,,");

        insta::assert_snapshot!(summary.to_string(), @r"
=== Summary ===
Successfully parsed: 2
Failed: 1
Significant results (p < 0.05): 1 / 2 (50.0%)
");
    }

    #[test]
    fn test_parse_directory_without_json() {
        let input = tempfile::tempdir().unwrap();
        let res = parse_directory(input.path(), &input.path().join("x.csv"), HyphyTest::Fel);
        assert!(res.is_err());
    }
}
