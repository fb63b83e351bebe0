// ==============================================================================
// main.rs - Variant Prioritizer Entry Point
// ==============================================================================
// Description: Command-line entry point: rank VCF variants against HPO terms
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pheno_prioritizer::config::{AnalysisConfig, RowErrorPolicy};
use pheno_prioritizer::output::AnalysisReport;
use pheno_prioritizer::parsers::InputSource;
use pheno_prioritizer::{analyze, validator};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// VCF or VCF.GZ with SnpEff ANN or VEP CSQ annotations
    #[arg(long, env = "PHENO_VCF")]
    vcf: PathBuf,

    /// HPO_ID -> GeneSymbol table (CSV or TSV)
    #[arg(long, env = "PHENO_HPO_MAP")]
    hpo_map: PathBuf,

    /// Optional gene panel (one symbol per line, or CSV first column)
    #[arg(long)]
    panel: Option<PathBuf>,

    /// Patient HPO identifiers (repeat or comma-separate)
    #[arg(long = "hpo", value_delimiter = ',')]
    hpo_ids: Vec<String>,

    /// JSON configuration (weights, impact scores, policies)
    #[arg(long, env = "PHENO_CONFIG")]
    config: Option<PathBuf>,

    /// Abort on the first malformed VCF row instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Stop after this many variants
    #[arg(long)]
    max_variants: Option<usize>,

    /// Score variants in parallel
    #[arg(long)]
    parallel: bool,

    /// Report path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write only the N best-ranked variants
    #[arg(long)]
    top: Option<usize>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pheno_prioritizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("Variant prioritizer starting...");

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => AnalysisConfig::default(),
    };
    if args.strict {
        config.row_policy = RowErrorPolicy::Abort;
    }
    if args.max_variants.is_some() {
        config.max_variants = args.max_variants;
    }
    if args.parallel {
        config.parallel = true;
    }

    if args.hpo_ids.is_empty() {
        warn!("No patient HPO identifiers given; phenotype matching disabled");
    }

    let vcf = InputSource::path(&args.vcf);
    let hpo_map = InputSource::path(&args.hpo_map);
    let panel = args.panel.as_ref().map(|p| InputSource::path(p));

    let mut inputs = vec![
        validator::fingerprint("vcf", &vcf).with_context(|| format!("Failed to read {:?}", args.vcf))?,
        validator::fingerprint("phenotype_map", &hpo_map)
            .with_context(|| format!("Failed to read {:?}", args.hpo_map))?,
    ];
    if let Some(source) = &panel {
        match validator::fingerprint("panel", source) {
            Ok(fp) => inputs.push(fp),
            Err(e) => warn!("Could not fingerprint panel {}: {}", source.name(), e),
        }
    }

    let result = analyze(&vcf, &args.hpo_ids, &hpo_map, panel.as_ref(), Some(&config))
        .context("Analysis failed")?;

    let report = AnalysisReport::new(result, inputs, args.top);
    match &args.output {
        Some(path) => report.write_json_file(path)?,
        None => {
            let stdout = std::io::stdout();
            report.write_json(stdout.lock())?;
            println!();
        }
    }

    info!("Done: {} variants ranked", report.metadata.total_variants);
    Ok(())
}
