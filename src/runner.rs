// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use crate::annotation::{
    annotate_files, build_annotation_map_file, load_annotation_map,
    load_annotation_map_or_empty, save_annotation_map,
};
use crate::categories::categorize_file;
use crate::config::{find_config, CanidConfig, FilterSettings};
use crate::errors::CanidError;
use crate::hyphy::{
    absrel_log::{summarise_logs, DEFAULT_FOREGROUND, DEFAULT_OUTPUT},
    json::{parse_directory, HyphyTest},
};
use crate::orthologs::{
    biomart::{extract_biomart, read_biomart_table, DEFAULT_MIN_SPECIES},
    extract_orthologs, read_ortholog_table, CdsStore, OrthologColumns,
};
use crate::pipeline::run_filter_batch;
use crate::priority::{
    prioritize_file, ScoreColumns, DEFAULT_INPUT as DEFAULT_PRIORITY_INPUT,
    DEFAULT_OMEGA_COLUMN, DEFAULT_OUTPUT as DEFAULT_PRIORITY_OUTPUT, DEFAULT_PVALUE_COLUMN,
    DEFAULT_TIER1_OUTPUT,
};
use crate::qc::codon_check::FramePolicy;

const DEFAULT_ANNOTATIONS: &str = "data/gene_annotations.json";
const ANNOTATION_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Filter codon alignments for quality
    Filter(FilterArgs),

    /// Extract per-gene CDS and protein FastA files from an ortholog table
    ExtractCds {
        /// Ortholog table (TSV with a header row)
        #[arg(long)]
        orthologs: PathBuf,

        /// Directory of per-species CDS files (Species_name.cds.fa)
        #[arg(long = "cds-dir")]
        cds_dir: PathBuf,

        /// Output directory for ortholog groups
        #[arg(long, default_value = "data/orthologs")]
        out: PathBuf,

        /// Minimum number of species per ortholog group
        #[arg(long = "min-species", default_value_t = 4)]
        min_species: usize,

        /// Column holding transcript ids
        #[arg(long = "id-col", default_value = "transcript_id")]
        id_col: String,

        /// Column holding species names
        #[arg(long = "species-col", default_value = "species")]
        species_col: String,

        /// Column holding gene names
        #[arg(long = "gene-col", default_value = "gene_name")]
        gene_col: String,
    },

    /// Extract per-gene CDS and protein FastA files from an Ensembl BioMart ortholog export
    ExtractBiomart {
        /// BioMart ortholog table (TSV)
        #[arg(long)]
        orthologs: PathBuf,

        /// Directory of per-species CDS files (Species_name.cds.fa)
        #[arg(long = "cds-dir")]
        cds_dir: PathBuf,

        /// Output directory for ortholog groups
        #[arg(long, default_value = "data/orthologs")]
        out: PathBuf,

        /// Minimum number of species per ortholog group
        #[arg(long = "min-species", default_value_t = DEFAULT_MIN_SPECIES)]
        min_species: usize,
    },

    /// Summarise HyPhy JSON results as CSV
    ParseHyphy {
        /// Directory containing HyPhy JSON output files
        #[arg(long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(long)]
        output: PathBuf,

        /// Type of HyPhy test
        #[arg(long)]
        test: HyphyTest,
    },

    /// Summarise aBSREL console logs
    AbsrelLogs {
        /// Directory of aBSREL logs (*.log)
        #[arg(long, default_value = "logs/hyphy/absrel")]
        logs: PathBuf,

        /// Gene annotation map (JSON)
        #[arg(long, default_value = DEFAULT_ANNOTATIONS)]
        annotations: PathBuf,

        /// Label of the foreground branch
        #[arg(long, default_value = DEFAULT_FOREGROUND)]
        foreground: String,

        /// Output TSV
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },

    /// Build a gene annotation map from Ensembl CDS headers
    AnnotationMap {
        /// Ensembl CDS FastA
        #[arg(long, default_value = "data/cds/Canis_familiaris.cds.fa")]
        cds: PathBuf,

        /// Output JSON
        #[arg(long, default_value = DEFAULT_ANNOTATIONS)]
        output: PathBuf,
    },

    /// Add gene symbols and descriptions to result tables with a gene_id column
    Annotate {
        /// Gene annotation map (JSON)
        #[arg(long, default_value = DEFAULT_ANNOTATIONS)]
        annotations: PathBuf,

        /// Result tables (TSV)
        #[arg(required = true)]
        tables: Vec<PathBuf>,
    },

    /// Assign genes under selection to functional categories
    Categorize {
        /// Results table, as written by absrel-logs
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        input: PathBuf,

        /// Write per-gene categories to this TSV
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Rank annotated genes under selection for functional validation
    Prioritize {
        /// Annotated results table (TSV), as written by annotate
        #[arg(long, default_value = DEFAULT_PRIORITY_INPUT)]
        input: PathBuf,

        /// Column holding the p-value
        #[arg(long = "pvalue-col", default_value = DEFAULT_PVALUE_COLUMN)]
        pvalue_col: String,

        /// Column holding omega
        #[arg(long = "omega-col", default_value = DEFAULT_OMEGA_COLUMN)]
        omega_col: String,

        /// Ranked output TSV
        #[arg(long, default_value = DEFAULT_PRIORITY_OUTPUT)]
        output: PathBuf,

        /// Output TSV of Tier-1 genes
        #[arg(long = "tier1-output", default_value = DEFAULT_TIER1_OUTPUT)]
        tier1_output: PathBuf,
    },
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Directory containing codon alignments
    #[arg(long)]
    input: PathBuf,

    /// Output directory for filtered alignments
    #[arg(long)]
    output: PathBuf,

    /// Maximum fraction of gaps allowed per sequence [default: 0.5]
    #[arg(long = "max-gap-fraction")]
    max_gap_fraction: Option<f64>,

    /// Minimum number of species required [default: 4]
    #[arg(long = "min-species")]
    min_species: Option<usize>,

    /// Trim poorly aligned edges
    #[arg(long = "trim-edges", overrides_with = "no_trim_edges")]
    trim_edges: bool,

    /// Do not trim edges, even if the config file asks for it
    #[arg(long = "no-trim-edges", overrides_with = "trim_edges")]
    no_trim_edges: bool,

    /// Minimum alignment length in bp after trimming [default: 150]
    #[arg(long = "min-alignment-length")]
    min_alignment_length: Option<usize>,

    /// Reading-frame check [lenient|strict]; default: lenient
    #[arg(long = "frame-policy", hide_possible_values = true)]
    frame_policy: Option<FramePolicy>,

    /// Config file (default: .canidselconfig in $HOME or the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl FilterArgs {
    /// Command-line values take precedence over `settings`.
    fn apply(&self, mut settings: FilterSettings) -> Result<FilterSettings, CanidError> {
        if let Some(frac) = self.max_gap_fraction {
            if !(0.0..=1.0).contains(&frac) {
                return Err(CanidError::Format(format!(
                    "--max-gap-fraction must be within [0, 1], got {}",
                    frac
                )));
            }
            settings.max_gap_fraction = frac;
        }
        if let Some(n) = self.min_species {
            if n == 0 {
                return Err(CanidError::Format(String::from(
                    "--min-species must be at least 1",
                )));
            }
            settings.min_species = n;
        }
        if self.trim_edges {
            settings.trim_edges = true;
        } else if self.no_trim_edges {
            settings.trim_edges = false;
        }
        if let Some(len) = self.min_alignment_length {
            settings.min_alignment_length = len;
        }
        if let Some(policy) = self.frame_policy {
            settings.frame_policy = policy;
        }
        Ok(settings)
    }
}

// Settings from the config file, or the defaults if there is none or it cannot be read.
fn config_settings(explicit: Option<&Path>) -> FilterSettings {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(find_config) else {
        return FilterSettings::default();
    };
    match CanidConfig::from_file(&path) {
        Ok(config) => {
            info!("Read config from {}", path.display());
            config.filter
        }
        Err(e) => {
            warn!("Error reading {}: {}", path.display(), e);
            eprintln!("Warning: ignoring config file {}: {}", path.display(), e);
            FilterSettings::default()
        }
    }
}

fn run_filter(args: &FilterArgs) -> Result<(), CanidError> {
    let settings = args.apply(config_settings(args.config.as_deref()))?;
    let summary = run_filter_batch(&args.input, &args.output, &settings)?;
    println!("{}", summary);
    println!("\nOutput directory: {}", args.output.display());
    Ok(())
}

fn run_extract_biomart(
    orthologs: &Path,
    cds_dir: &Path,
    out: &Path,
    min_species: usize,
) -> Result<(), CanidError> {
    let store = CdsStore::load_dir(cds_dir)?;
    println!("\nAvailable species in CDS database:");
    for (species, count) in store.species_counts() {
        println!("  - {}: {} sequences", species, count);
    }
    println!("\nReading BioMart ortholog table: {}", orthologs.display());
    let groups = read_biomart_table(orthologs)?;
    let summary = extract_biomart(&groups, &store, out, min_species)?;
    println!("\n{}", summary);
    println!("\nOutput directory: {}", out.display());
    Ok(())
}

fn run_annotation_map(cds: &Path, output: &Path) -> Result<(), CanidError> {
    println!("Parsing {}...", cds.display());
    let map = build_annotation_map_file(cds)?;
    println!("Mapped {} genes", map.len());
    save_annotation_map(output, &map)?;
    println!("Saved annotations to: {}", output.display());

    println!("\nSample annotations:");
    for (name, ann) in map.iter().take(ANNOTATION_SAMPLE_SIZE) {
        let desc: String = ann.description.chars().take(50).collect();
        println!("  {}: {} - {}", name, ann.symbol, desc);
    }
    Ok(())
}

fn run_annotate(annotations: &Path, tables: &[PathBuf]) -> Result<(), CanidError> {
    println!("Loading gene annotations...");
    let map = load_annotation_map(annotations)?;
    println!("  Loaded {} gene annotations", map.len());
    let overall = annotate_files(tables, &map)?;
    println!(
        "\nOverall: {} / {} genes annotated ({:.1}%)",
        overall.annotated,
        overall.total,
        overall.percent()
    );
    println!("Annotated files saved with '_ANNOTATED.tsv' suffix");
    Ok(())
}

pub fn run() -> Result<(), CanidError> {
    env_logger::init();
    info!("Starting log");

    let cli = Cli::parse();
    match cli.command {
        Command::Filter(args) => run_filter(&args),
        Command::ExtractCds {
            orthologs,
            cds_dir,
            out,
            min_species,
            id_col,
            species_col,
            gene_col,
        } => {
            let columns = OrthologColumns {
                id: id_col,
                species: species_col,
                gene: gene_col,
            };
            let rows = read_ortholog_table(&orthologs, &columns)?;
            let store = CdsStore::load_dir(&cds_dir)?;
            info!("CDS loaded for {} species", store.num_species());
            let summary = extract_orthologs(rows, &store, &out, min_species)?;
            println!("\n{}", summary);
            println!("\nOutput directory: {}", out.display());
            Ok(())
        }
        Command::ExtractBiomart {
            orthologs,
            cds_dir,
            out,
            min_species,
        } => run_extract_biomart(&orthologs, &cds_dir, &out, min_species),
        Command::ParseHyphy {
            input,
            output,
            test,
        } => {
            let summary = parse_directory(&input, &output, test)?;
            println!("\nResults saved to: {}", output.display());
            println!("\n{}", summary);
            Ok(())
        }
        Command::AbsrelLogs {
            logs,
            annotations,
            foreground,
            output,
        } => {
            println!("=== aBSREL Results Summary ===\n");
            println!("Loading gene annotations...");
            let map = load_annotation_map_or_empty(&annotations)?;
            println!("Loaded annotations for {} genes\n", map.len());
            summarise_logs(&logs, &map, &foreground, &output)?;
            Ok(())
        }
        Command::AnnotationMap { cds, output } => run_annotation_map(&cds, &output),
        Command::Annotate {
            annotations,
            tables,
        } => run_annotate(&annotations, &tables),
        Command::Categorize { input, output } => {
            categorize_file(&input, output.as_deref())?;
            Ok(())
        }
        Command::Prioritize {
            input,
            pvalue_col,
            omega_col,
            output,
            tier1_output,
        } => {
            let columns = ScoreColumns {
                pvalue: pvalue_col,
                omega: omega_col,
            };
            prioritize_file(&input, &columns, &output, &tier1_output)?;
            Ok(())
        }
    }
}
