// ==============================================================================
// processor.rs - Variant Prioritization Pipeline
// ==============================================================================
// Description: analyze(): VCF + HPO terms + phenotype map + panel -> ranked list
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::annotation::{self, FormatError, NormalizedAnnotations};
use crate::config::{AnalysisConfig, ConfigError};
use crate::models::{AnnotationStatus, PrioritizedVariant, VariantKey, VariantRecord};
use crate::parsers::hpo_map::{normalize_hpo_id, DroppedRow};
use crate::parsers::{
    CandidateGenes, GenePanel, InputSource, PanelStatus, PhenotypeGeneMap, RowError, SchemaError,
    VcfParseError, VcfReader, VcfStats,
};
use crate::ranker;
use crate::scorer;
use crate::validator;

/// Fatal errors; no partial ranked list is returned
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("VCF error: {0}")]
    Vcf(#[from] VcfParseError),

    #[error("Phenotype map error: {0}")]
    Phenotype(#[from] SchemaError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Input loader thread panicked")]
    LoaderPanicked,
}

/// An annotation that could not be decoded; the variant was kept as unannotated
#[derive(Debug, Clone, Serialize)]
pub struct FormatIssue {
    pub variant: String,
    pub line: usize,
    pub error: FormatError,
}

/// A repeated (chrom, pos, ref, alt) site that was dropped
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateSite {
    pub variant: String,
    pub line: usize,
    pub first_line: usize,
}

/// Everything non-fatal that happened during a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub vcf_version: Option<String>,
    pub samples: Vec<String>,
    /// Logical variants (row x ALT) decoded by the parser
    pub variants_parsed: usize,
    /// Variants in the ranked list
    pub variants_emitted: usize,
    pub rows_skipped: Vec<RowError>,
    pub duplicates: Vec<DuplicateSite>,
    pub annotated: usize,
    /// Includes variants whose annotation was malformed
    pub unannotated: usize,
    pub format_errors: Vec<FormatIssue>,
    pub phenotype_matches: usize,
    pub panel_matches: usize,
    pub patient_hpo_ids: Vec<String>,
    pub invalid_hpo_ids: Vec<String>,
    pub unmatched_hpo_ids: Vec<String>,
    pub candidate_genes: usize,
    pub phenotype_rows_dropped: Vec<DroppedRow>,
    pub panel: PanelStatus,
    pub vcf_stats: VcfStats,
    /// Set when `max_variants` stopped the parse early
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub variants: Vec<PrioritizedVariant>,
    pub summary: RunSummary,
}

/// Output of the streaming stage
struct StreamedVariants {
    entries: Vec<(VariantRecord, NormalizedAnnotations)>,
    vcf_version: Option<String>,
    samples: Vec<String>,
    variants_parsed: usize,
    rows_skipped: Vec<RowError>,
    duplicates: Vec<DuplicateSite>,
    format_errors: Vec<FormatIssue>,
    stats: VcfStats,
    truncated: bool,
}

/// Output of the phenotype/panel loader
struct PhenotypeInputs {
    map: Result<PhenotypeGeneMap, SchemaError>,
    panel: GenePanel,
    panel_status: PanelStatus,
}

/// Run one analysis.
///
/// The phenotype map and panel are loaded on a scoped thread while the VCF is
/// streamed on the calling thread. Fatal problems (VCF header, strict-mode row
/// errors, phenotype map schema, configuration) abort with an error; everything
/// else is recorded in the returned summary.
pub fn analyze<S: AsRef<str>>(
    vcf: &InputSource,
    patient_hpo_ids: &[S],
    phenotype_map: &InputSource,
    panel: Option<&InputSource>,
    config: Option<&AnalysisConfig>,
) -> Result<AnalysisResult, AnalysisError> {
    let config = config.cloned().unwrap_or_default();
    config.validate()?;

    info!("Starting analysis of {}", vcf.name());

    let (valid_ids, invalid_ids) = partition_hpo_ids(patient_hpo_ids);
    for id in &invalid_ids {
        warn!("Ignoring malformed HPO identifier '{}'", id);
    }

    let (streamed, inputs) = std::thread::scope(|scope| {
        let loader = scope.spawn(|| load_phenotype_inputs(phenotype_map, panel));
        let streamed = stream_variants(vcf, &config);
        let inputs = loader.join().map_err(|_| AnalysisError::LoaderPanicked);
        (streamed, inputs)
    });
    let streamed = streamed?;
    let inputs = inputs?;
    let map = inputs.map?;

    let candidates = map.candidate_genes(&valid_ids);
    for id in &candidates.unmatched {
        warn!("HPO identifier {} not present in the phenotype map", id);
    }
    info!(
        "{} candidate genes from {} patient HPO terms",
        candidates.len(),
        valid_ids.len()
    );

    let StreamedVariants {
        entries,
        vcf_version,
        samples,
        variants_parsed,
        rows_skipped,
        duplicates,
        format_errors,
        stats,
        truncated,
    } = streamed;

    let scored = score_all(entries, &candidates, &inputs.panel, &config);
    let variants = ranker::rank(scored);

    let annotated = variants
        .iter()
        .filter(|v| v.annotation_status == AnnotationStatus::Annotated)
        .count();

    let summary = RunSummary {
        vcf_version,
        samples,
        variants_parsed,
        variants_emitted: variants.len(),
        rows_skipped,
        duplicates,
        annotated,
        unannotated: variants.len() - annotated,
        format_errors,
        phenotype_matches: variants.iter().filter(|v| v.phenotype_match).count(),
        panel_matches: variants.iter().filter(|v| v.panel_match).count(),
        patient_hpo_ids: valid_ids,
        invalid_hpo_ids: invalid_ids,
        unmatched_hpo_ids: candidates.unmatched.clone(),
        candidate_genes: candidates.len(),
        phenotype_rows_dropped: map.dropped_rows().to_vec(),
        panel: inputs.panel_status,
        vcf_stats: stats,
        truncated,
    };

    info!(
        "Analysis complete: {} variants ranked ({} unannotated, {} rows skipped, {} phenotype matches)",
        summary.variants_emitted,
        summary.unannotated,
        summary.rows_skipped.len(),
        summary.phenotype_matches
    );

    Ok(AnalysisResult { variants, summary })
}

/// Split caller identifiers into well-formed (normalized, deduplicated) and
/// malformed ones
fn partition_hpo_ids<S: AsRef<str>>(ids: &[S]) -> (Vec<String>, Vec<String>) {
    let mut valid: Vec<String> = Vec::new();
    let mut invalid = Vec::new();

    for raw in ids {
        let id = normalize_hpo_id(raw.as_ref());
        if validator::is_valid_hpo_id(&id) {
            if !valid.contains(&id) {
                valid.push(id);
            }
        } else {
            invalid.push(raw.as_ref().to_string());
        }
    }
    (valid, invalid)
}

fn load_phenotype_inputs(phenotype_map: &InputSource, panel: Option<&InputSource>) -> PhenotypeInputs {
    let map = PhenotypeGeneMap::load(phenotype_map);

    let (panel, panel_status) = match panel {
        None => {
            info!("No gene panel supplied; panel constraint disabled");
            (GenePanel::Disabled, PanelStatus::NotSupplied)
        }
        Some(source) => match GenePanel::load(source) {
            Ok(panel) => {
                let status = PanelStatus::Active { genes: panel.len() };
                (panel, status)
            }
            Err(e) => {
                warn!("Gene panel unusable, panel constraint disabled: {}", e);
                (
                    GenePanel::Disabled,
                    PanelStatus::Degraded {
                        reason: e.to_string(),
                    },
                )
            }
        },
    };

    PhenotypeInputs {
        map,
        panel,
        panel_status,
    }
}

/// Parse, deduplicate and normalize every variant in the VCF
fn stream_variants(vcf: &InputSource, config: &AnalysisConfig) -> Result<StreamedVariants, AnalysisError> {
    let mut reader = VcfReader::open(vcf, config.row_policy)?;
    let vcf_version = reader.header().file_format.clone();
    let samples = reader.header().samples.clone();

    let mut entries = Vec::new();
    let mut seen: HashMap<VariantKey, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    let mut format_errors = Vec::new();
    let mut variants_parsed = 0;
    let mut truncated = false;

    while let Some(result) = reader.next() {
        let record = result?;
        variants_parsed += 1;

        let key = record.key();
        if let Some(&first_line) = seen.get(&key) {
            warn!("Duplicate variant {} at line {} (first seen at line {})", key, record.line_number, first_line);
            duplicates.push(DuplicateSite {
                variant: key.to_string(),
                line: record.line_number,
                first_line,
            });
            continue;
        }

        if config.max_variants.is_some_and(|max| entries.len() >= max) {
            info!("Stopping after {} variants (max_variants)", entries.len());
            truncated = true;
            break;
        }
        seen.insert(key, record.line_number);

        let mut normalized = annotation::normalize(&record, reader.layouts(), config.canonical_policy);
        if let Some(error) = normalized.error.take() {
            warn!("Unusable annotation for {} at line {}: {}", record.key(), record.line_number, error);
            format_errors.push(FormatIssue {
                variant: record.key().to_string(),
                line: record.line_number,
                error,
            });
        }
        entries.push((record, normalized));
    }

    let stats = reader.stats().clone();
    let rows_skipped = reader.skipped_rows().to_vec();
    info!(
        "Parsed {} variants from {} rows ({} skipped, {} duplicates, {} unusable annotations)",
        variants_parsed,
        stats.rows,
        rows_skipped.len(),
        duplicates.len(),
        format_errors.len()
    );

    Ok(StreamedVariants {
        entries,
        vcf_version,
        samples,
        variants_parsed,
        rows_skipped,
        duplicates,
        format_errors,
        stats,
        truncated,
    })
}

fn score_all(
    entries: Vec<(VariantRecord, NormalizedAnnotations)>,
    candidates: &CandidateGenes,
    panel: &GenePanel,
    config: &AnalysisConfig,
) -> Vec<PrioritizedVariant> {
    let build = |(record, normalized): (VariantRecord, NormalizedAnnotations)| {
        let canonical = normalized.canonical().cloned();
        let scored = scorer::score(&record, canonical.as_ref(), candidates, panel, &config.scoring);

        PrioritizedVariant {
            rank: 0,
            record,
            annotation_status: normalized.status,
            annotations: normalized.blocks,
            canonical,
            score: scored.breakdown.total,
            breakdown: scored.breakdown,
            phenotype_match: scored.phenotype_match,
            panel_match: scored.panel_match,
            matched_hpo_ids: scored.matched_hpo_ids,
            allele_frequency: scored.allele_frequency,
        }
    };

    if config.parallel {
        debug!("Scoring {} variants on the rayon pool", entries.len());
        entries.into_par_iter().map(build).collect()
    } else {
        entries.into_iter().map(build).collect()
    }
}
