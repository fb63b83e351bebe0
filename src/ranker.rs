// ==============================================================================
// ranker.rs - Variant Ranker
// ==============================================================================
// Description: Deterministic total order over scored variants
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Order: score desc, impact score desc, chromosome (1..22, X, Y, MT, other),
// position asc, then REF and ALT as the final tie-break.
// ==============================================================================

use std::cmp::Ordering;

use crate::models::PrioritizedVariant;

/// Sort key for natural chromosome order. The `chr` prefix is ignored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChromosomeKey {
    Numeric(u32),
    X,
    Y,
    Mitochondrial,
    Other(String),
}

impl ChromosomeKey {
    pub fn parse(chromosome: &str) -> Self {
        let name = chromosome
            .strip_prefix("chr")
            .or_else(|| chromosome.strip_prefix("CHR"))
            .or_else(|| chromosome.strip_prefix("Chr"))
            .unwrap_or(chromosome);

        if let Ok(n) = name.parse::<u32>() {
            return ChromosomeKey::Numeric(n);
        }
        match name.to_ascii_uppercase().as_str() {
            "X" => ChromosomeKey::X,
            "Y" => ChromosomeKey::Y,
            "M" | "MT" => ChromosomeKey::Mitochondrial,
            _ => ChromosomeKey::Other(name.to_string()),
        }
    }
}

fn compare(a: &PrioritizedVariant, b: &PrioritizedVariant) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.breakdown.impact_score.total_cmp(&a.breakdown.impact_score))
        .then_with(|| ChromosomeKey::parse(&a.record.chromosome).cmp(&ChromosomeKey::parse(&b.record.chromosome)))
        .then_with(|| a.record.position.cmp(&b.record.position))
        .then_with(|| a.record.reference.cmp(&b.record.reference))
        .then_with(|| a.record.alternate().cmp(b.record.alternate()))
        .then_with(|| a.record.chromosome.cmp(&b.record.chromosome))
}

/// Sort into final order and assign 1-based ranks. Input order does not
/// affect the result.
pub fn rank(mut variants: Vec<PrioritizedVariant>) -> Vec<PrioritizedVariant> {
    variants.sort_by(compare);
    for (idx, variant) in variants.iter_mut().enumerate() {
        variant.rank = idx + 1;
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnnotationStatus, VariantRecord};
    use crate::scorer::ScoreBreakdown;
    use std::collections::BTreeMap;

    fn variant(chrom: &str, pos: u64, alt: &str, score: f64, impact_score: f64) -> PrioritizedVariant {
        PrioritizedVariant {
            rank: 0,
            record: VariantRecord {
                chromosome: chrom.to_string(),
                position: pos,
                id: None,
                reference: "A".to_string(),
                alternates: vec![alt.to_string()],
                allele_index: 0,
                quality: None,
                filter: ".".to_string(),
                info: BTreeMap::new(),
                format: Vec::new(),
                samples: Vec::new(),
                line_number: 0,
            },
            annotation_status: AnnotationStatus::Unannotated,
            annotations: Vec::new(),
            canonical: None,
            score,
            breakdown: ScoreBreakdown {
                impact_score,
                total: score,
                ..Default::default()
            },
            phenotype_match: false,
            panel_match: true,
            matched_hpo_ids: Vec::new(),
            allele_frequency: None,
        }
    }

    fn order(ranked: &[PrioritizedVariant]) -> Vec<String> {
        ranked.iter().map(|v| v.record.key().to_string()).collect()
    }

    #[test]
    fn test_natural_chromosome_order() {
        let mut keys: Vec<ChromosomeKey> = ["chrMT", "X", "chr10", "2", "chrY", "GL000220.1", "chr1", "M"]
            .iter()
            .map(|c| ChromosomeKey::parse(c))
            .collect();
        keys.sort();

        assert_eq!(keys[0], ChromosomeKey::Numeric(1));
        assert_eq!(keys[1], ChromosomeKey::Numeric(2));
        assert_eq!(keys[2], ChromosomeKey::Numeric(10));
        assert_eq!(keys[3], ChromosomeKey::X);
        assert_eq!(keys[4], ChromosomeKey::Y);
        assert_eq!(keys[5], ChromosomeKey::Mitochondrial);
        assert_eq!(keys[7], ChromosomeKey::Other("GL000220.1".to_string()));
    }

    #[test]
    fn test_score_then_impact_then_position() {
        let ranked = rank(vec![
            variant("chr2", 50, "T", 1.0, 1.0),
            variant("chr1", 900, "T", 1.0, 3.0),
            variant("chrX", 10, "T", 2.0, 0.0),
            variant("chr10", 5, "T", 1.0, 1.0),
            variant("chr2", 40, "T", 1.0, 1.0),
        ]);

        assert_eq!(
            order(&ranked),
            vec!["chrX:10:A>T", "chr1:900:A>T", "chr2:40:A>T", "chr2:50:A>T", "chr10:5:A>T"]
        );
        let ranks: Vec<usize> = ranked.iter().map(|v| v.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_input_order_irrelevant() {
        let items = vec![
            variant("1", 100, "G", 0.5, 2.0),
            variant("1", 100, "C", 0.5, 2.0),
            variant("MT", 1, "T", 0.5, 2.0),
            variant("22", 7, "T", 3.0, 4.0),
        ];
        let mut reversed = items.clone();
        reversed.reverse();

        assert_eq!(order(&rank(items)), order(&rank(reversed)));
    }

    #[test]
    fn test_score_non_increasing_with_rank() {
        let ranked = rank(vec![
            variant("3", 1, "T", 0.1, 1.0),
            variant("4", 1, "T", 2.5, 4.0),
            variant("5", 1, "T", -0.3, 0.0),
            variant("6", 1, "T", 2.5, 3.0),
        ]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score && w[0].rank < w[1].rank));
    }
}
