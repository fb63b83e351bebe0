// ==============================================================================
// scorer.rs - Variant Prioritization Scorer
// ==============================================================================
// Description: Weighted sum of impact, phenotype, panel and frequency signals
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
//
// score = w_impact * impact_score / max_impact_score
//       + w_phenotype * [gene in candidate set]
//       + w_panel * [gene in panel, or panel disabled]
//       - w_frequency * clamp(allele_frequency, 0, 1)
//
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::models::{Annotation, Impact, VariantRecord};
use crate::parsers::{CandidateGenes, GenePanel};

/// Weighted contribution of each signal to the final score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Unweighted impact score from the configured mapping (ranker tie-break)
    pub impact_score: f64,
    pub impact: f64,
    pub phenotype: f64,
    pub panel: f64,
    pub frequency_penalty: f64,
    pub total: f64,
}

/// Everything the scorer found out about one variant
#[derive(Debug, Clone, PartialEq)]
pub struct VariantScore {
    pub breakdown: ScoreBreakdown,
    pub phenotype_match: bool,
    pub matched_hpo_ids: Vec<String>,
    pub panel_match: bool,
    pub allele_frequency: Option<f64>,
}

/// Combine the signals into a breakdown. Pure; depends only on its arguments.
pub fn combine(
    impact: Option<Impact>,
    phenotype_match: bool,
    panel_match: bool,
    allele_frequency: Option<f64>,
    config: &ScoringConfig,
) -> ScoreBreakdown {
    let weights = &config.weights;
    let impact_score = config.impact_scores.score(impact);
    let max = config.impact_scores.max();
    let normalized_impact = if max > 0.0 { impact_score / max } else { 0.0 };

    let impact = weights.impact * normalized_impact;
    let phenotype = if phenotype_match { weights.phenotype } else { 0.0 };
    let panel = if panel_match { weights.panel } else { 0.0 };
    let frequency_penalty = allele_frequency
        .map(|af| weights.frequency * af.clamp(0.0, 1.0))
        .unwrap_or(0.0);

    ScoreBreakdown {
        impact_score,
        impact,
        phenotype,
        panel,
        frequency_penalty,
        total: impact + phenotype + panel - frequency_penalty,
    }
}

/// Score one variant against the phenotype candidates and the panel
pub fn score(
    record: &VariantRecord,
    canonical: Option<&Annotation>,
    candidates: &CandidateGenes,
    panel: &GenePanel,
    config: &ScoringConfig,
) -> VariantScore {
    let gene = canonical.and_then(|a| a.gene.as_deref());

    let matched_hpo_ids: Vec<String> = gene
        .and_then(|g| candidates.matched_terms(g))
        .map(|terms| terms.iter().cloned().collect())
        .unwrap_or_default();
    let phenotype_match = !matched_hpo_ids.is_empty();

    let panel_match = match gene {
        Some(g) => panel.is_in_panel(g),
        None => !panel.is_enabled(),
    };

    let allele_frequency = allele_frequency(record, &config.frequency_keys);

    VariantScore {
        breakdown: combine(
            canonical.map(|a| a.impact),
            phenotype_match,
            panel_match,
            allele_frequency,
            config,
        ),
        phenotype_match,
        matched_hpo_ids,
        panel_match,
        allele_frequency,
    }
}

/// First parseable frequency among `keys`.
///
/// A value list with one entry per ALT allele (an undeclared `Number=A` key
/// on a multi-allelic row) contributes this record's own entry; any other
/// list contributes its first value.
pub fn allele_frequency(record: &VariantRecord, keys: &[String]) -> Option<f64> {
    keys.iter().find_map(|key| {
        let values: Vec<&str> = record.info_text(key)?.split(',').collect();
        let value = if values.len() > 1 && values.len() == record.alternates.len() {
            values.get(record.allele_index)?
        } else {
            values.first()?
        };
        value.trim().parse::<f64>().ok().filter(|af| af.is_finite())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InfoValue;
    use crate::parsers::PhenotypeGeneMap;
    use std::collections::BTreeMap;

    fn record(info: &[(&str, &str)]) -> VariantRecord {
        VariantRecord {
            chromosome: "1".to_string(),
            position: 1000,
            id: None,
            reference: "A".to_string(),
            alternates: vec!["T".to_string()],
            allele_index: 0,
            quality: None,
            filter: "PASS".to_string(),
            info: info
                .iter()
                .map(|(k, v)| (k.to_string(), InfoValue::Text(v.to_string())))
                .collect::<BTreeMap<_, _>>(),
            format: Vec::new(),
            samples: Vec::new(),
            line_number: 2,
        }
    }

    fn annotation(gene: &str, impact: Impact) -> Annotation {
        Annotation {
            allele: Some("T".to_string()),
            gene: Some(gene.to_string()),
            consequence: "missense_variant".to_string(),
            impact,
            transcript: None,
            hgvs_c: None,
            hgvs_p: None,
        }
    }

    fn candidates() -> CandidateGenes {
        PhenotypeGeneMap::from_pairs(vec![("HP:0001263", "GENE1"), ("HP:0001250", "GENE1")])
            .candidate_genes(&["HP:0001263", "HP:0001250"])
    }

    #[test]
    fn test_breakdown_components() {
        let config = ScoringConfig::default();
        let b = combine(Some(Impact::Moderate), true, true, Some(0.2), &config);

        assert_eq!(b.impact_score, 3.0);
        assert!((b.impact - 1.5).abs() < 1e-12);
        assert_eq!(b.phenotype, 1.5);
        assert_eq!(b.panel, 0.5);
        assert!((b.frequency_penalty - 0.1).abs() < 1e-12);
        assert!((b.total - 3.4).abs() < 1e-12);
    }

    #[test]
    fn test_unannotated_scores_zero_impact() {
        let b = combine(None, false, false, None, &ScoringConfig::default());
        assert_eq!(b.impact, 0.0);
        assert_eq!(b.total, 0.0);
    }

    #[test]
    fn test_high_with_phenotype_beats_modifier_without() {
        let mut config = ScoringConfig::default();
        for (impact_w, pheno_w) in [(2.0, 1.5), (0.1, 0.1), (10.0, 0.01), (0.01, 10.0)] {
            config.weights.impact = impact_w;
            config.weights.phenotype = pheno_w;
            for panel_match in [true, false] {
                for af in [None, Some(0.0), Some(0.5), Some(1.0)] {
                    let high = combine(Some(Impact::High), true, panel_match, af, &config);
                    let modifier = combine(Some(Impact::Modifier), false, panel_match, af, &config);
                    assert!(high.total > modifier.total);
                }
            }
        }
    }

    #[test]
    fn test_frequency_clamped() {
        let config = ScoringConfig::default();
        assert_eq!(combine(None, false, false, Some(7.0), &config).frequency_penalty, 0.5);
        assert_eq!(combine(None, false, false, Some(-1.0), &config).frequency_penalty, 0.0);
    }

    #[test]
    fn test_allele_frequency_key_order() {
        let keys = ScoringConfig::default().frequency_keys;
        assert_eq!(allele_frequency(&record(&[("gnomAD_AF", "0.01"), ("AF", "0.5")]), &keys), Some(0.5));
        assert_eq!(allele_frequency(&record(&[("AF", "."), ("gnomAD_AF", "0.01")]), &keys), Some(0.01));
        assert_eq!(allele_frequency(&record(&[("AF", "0.2,0.3")]), &keys), Some(0.2));
        assert_eq!(allele_frequency(&record(&[("DP", "30")]), &keys), None);
    }

    #[test]
    fn test_allele_frequency_per_alt_allele() {
        let keys = ScoringConfig::default().frequency_keys;
        let mut rec = record(&[("AF", "0.9,0.001")]);
        rec.alternates = vec!["G".to_string(), "T".to_string()];

        rec.allele_index = 1;
        assert_eq!(allele_frequency(&rec, &keys), Some(0.001));
        rec.allele_index = 0;
        assert_eq!(allele_frequency(&rec, &keys), Some(0.9));

        // Reference + alternates: not one entry per ALT
        let mut per_allele = record(&[("AF", "0.5,0.3,0.2")]);
        per_allele.alternates = vec!["G".to_string(), "T".to_string()];
        per_allele.allele_index = 1;
        assert_eq!(allele_frequency(&per_allele, &keys), Some(0.5));
    }

    #[test]
    fn test_score_variant_with_phenotype_and_panel() {
        let config = ScoringConfig::default();
        let rec = record(&[("AF", "0.001")]);
        let ann = annotation("gene1", Impact::High);
        let panel = GenePanel::from_genes(["GENE2"]);

        let scored = score(&rec, Some(&ann), &candidates(), &panel, &config);

        assert!(scored.phenotype_match);
        assert_eq!(scored.matched_hpo_ids, vec!["HP:0001250", "HP:0001263"]);
        assert!(!scored.panel_match);
        assert_eq!(scored.allele_frequency, Some(0.001));
        assert_eq!(scored.breakdown.panel, 0.0);
    }

    #[test]
    fn test_disabled_panel_matches_unannotated() {
        let config = ScoringConfig::default();
        let rec = record(&[]);

        let open = score(&rec, None, &candidates(), &GenePanel::Disabled, &config);
        assert!(open.panel_match);
        assert!(!open.phenotype_match);

        let closed = score(&rec, None, &candidates(), &GenePanel::from_genes(["GENE1"]), &config);
        assert!(!closed.panel_match);
    }
}
