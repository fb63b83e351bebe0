// ==============================================================================
// models.rs - Variant Prioritization Data Models
// ==============================================================================
// Description: Data structures shared by the parser, normalizer, scorer, ranker
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::scorer::ScoreBreakdown;

/// Predicted functional severity of a consequence.
///
/// Variants are declared from least to most severe so the derived `Ord`
/// gives HIGH > MODERATE > LOW > MODIFIER. An unannotated variant carries
/// no impact at all (`Option::None`), which sorts below every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    Modifier,
    Low,
    Moderate,
    High,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "HIGH",
            Impact::Moderate => "MODERATE",
            Impact::Low => "LOW",
            Impact::Modifier => "MODIFIER",
        }
    }
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Impact::High),
            "MODERATE" => Ok(Impact::Moderate),
            "LOW" => Ok(Impact::Low),
            "MODIFIER" => Ok(Impact::Modifier),
            other => Err(format!("unknown impact level '{}'", other)),
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single INFO entry: either a bare flag or its raw text value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Text(String),
    Flag,
}

impl InfoValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InfoValue::Text(s) => Some(s.as_str()),
            InfoValue::Flag => None,
        }
    }
}

/// Uniqueness key of a logical (single-alternate) variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub chromosome: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}>{}",
            self.chromosome, self.position, self.reference, self.alternate
        )
    }
}

/// One logical variant: a VCF data row narrowed to a single alternate allele.
///
/// Multi-allelic rows produce one record per alternate. `alternates` keeps the
/// full ALT list of the site and `allele_index` points at the allele this
/// record stands for; per-allele INFO values have already been narrowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Chromosome as written in the file (e.g., "chr1", "X")
    pub chromosome: String,

    /// 1-based position
    pub position: u64,

    /// ID column, `None` when "."
    pub id: Option<String>,

    /// Reference allele
    pub reference: String,

    /// All alternate alleles of the source row, in file order
    pub alternates: Vec<String>,

    /// Index into `alternates` of the allele this record represents
    pub allele_index: usize,

    /// QUAL column, `None` when "."
    pub quality: Option<f64>,

    /// Raw FILTER column ("PASS", ".", or a semicolon list)
    pub filter: String,

    /// INFO key/value mapping; unknown keys kept as opaque text
    pub info: BTreeMap<String, InfoValue>,

    /// FORMAT keys (empty for sites-only files)
    pub format: Vec<String>,

    /// Raw per-sample values, one inner vector per sample column
    pub samples: Vec<Vec<String>>,

    /// 1-based line number in the (decompressed) input
    pub line_number: usize,
}

impl VariantRecord {
    pub fn alternate(&self) -> &str {
        self.alternates
            .get(self.allele_index)
            .map(String::as_str)
            .unwrap_or(".")
    }

    pub fn key(&self) -> VariantKey {
        VariantKey {
            chromosome: self.chromosome.clone(),
            position: self.position,
            reference: self.reference.clone(),
            alternate: self.alternate().to_string(),
        }
    }

    pub fn info_text(&self, key: &str) -> Option<&str> {
        self.info.get(key).and_then(InfoValue::as_text)
    }

    pub fn has_info_flag(&self, key: &str) -> bool {
        self.info.contains_key(key)
    }

    /// `PASS` or missing (".") filter
    pub fn passes_filter(&self) -> bool {
        self.filter == "PASS" || self.filter == "."
    }

    pub fn is_snv(&self) -> bool {
        self.reference.len() == 1 && self.alternate().len() == 1
    }

    /// Raw FORMAT value for one sample, `None` if the key or sample is absent
    pub fn sample_value(&self, sample_idx: usize, key: &str) -> Option<&str> {
        let field_idx = self.format.iter().position(|k| k == key)?;
        self.samples
            .get(sample_idx)?
            .get(field_idx)
            .map(String::as_str)
            .filter(|v| !v.is_empty() && *v != ".")
    }

    /// Genotype (GT) of the first sample
    pub fn genotype(&self) -> Option<&str> {
        self.sample_value(0, "GT")
    }

    /// Read depth (DP) of the first sample
    pub fn read_depth(&self) -> Option<u32> {
        self.sample_value(0, "DP")?.parse().ok()
    }

    /// Allelic depths (AD) of the first sample
    pub fn allele_depths(&self) -> Option<Vec<u32>> {
        self.sample_value(0, "AD")?
            .split(',')
            .map(|d| d.trim().parse().ok())
            .collect()
    }
}

/// One decoded consequence block (one transcript / feature)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Allele the block refers to, as written by the annotator
    pub allele: Option<String>,
    pub gene: Option<String>,
    pub consequence: String,
    pub impact: Impact,
    pub transcript: Option<String>,
    pub hgvs_c: Option<String>,
    pub hgvs_p: Option<String>,
}

/// Annotation state of a variant after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    /// At least one block decoded
    Annotated,
    /// No ANN/CSQ value present
    Unannotated,
    /// ANN/CSQ present but undecodable; treated as unannotated for scoring
    Malformed,
}

/// Final output unit: a variant with its annotation, score and rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedVariant {
    /// 1-based rank
    pub rank: usize,

    pub record: VariantRecord,

    pub annotation_status: AnnotationStatus,

    /// Every decoded block, in original order (audit/export)
    pub annotations: Vec<Annotation>,

    /// Block selected by the canonical policy; the only one used for scoring
    pub canonical: Option<Annotation>,

    pub score: f64,

    pub breakdown: ScoreBreakdown,

    pub phenotype_match: bool,

    pub panel_match: bool,

    /// Patient HPO identifiers implicating the canonical gene
    pub matched_hpo_ids: Vec<String>,

    /// Population frequency used for the penalty, if any
    pub allele_frequency: Option<f64>,
}

impl PrioritizedVariant {
    pub fn gene(&self) -> Option<&str> {
        self.canonical.as_ref().and_then(|a| a.gene.as_deref())
    }

    pub fn impact(&self) -> Option<Impact> {
        self.canonical.as_ref().map(|a| a.impact)
    }

    /// Number of patient HPO terms implicating the gene
    pub fn phenotype_hits(&self) -> usize {
        self.matched_hpo_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(format: &[&str], sample: &[&str]) -> VariantRecord {
        VariantRecord {
            chromosome: "chr1".to_string(),
            position: 100,
            id: None,
            reference: "A".to_string(),
            alternates: vec!["G".to_string(), "AT".to_string()],
            allele_index: 1,
            quality: Some(50.0),
            filter: "PASS".to_string(),
            info: BTreeMap::new(),
            format: format.iter().map(|s| s.to_string()).collect(),
            samples: vec![sample.iter().map(|s| s.to_string()).collect()],
            line_number: 3,
        }
    }

    #[test]
    fn test_impact_ordering() {
        assert!(Impact::High > Impact::Moderate);
        assert!(Impact::Moderate > Impact::Low);
        assert!(Impact::Low > Impact::Modifier);
        assert!(None < Some(Impact::Modifier));
    }

    #[test]
    fn test_impact_parse() {
        assert_eq!("high".parse::<Impact>().unwrap(), Impact::High);
        assert_eq!(" MODIFIER ".parse::<Impact>().unwrap(), Impact::Modifier);
        assert!("SEVERE".parse::<Impact>().is_err());
    }

    #[test]
    fn test_record_accessors() {
        let rec = record(&["GT", "AD", "DP"], &["0/1", "12,8", "20"]);

        assert_eq!(rec.alternate(), "AT");
        assert!(!rec.is_snv());
        assert!(rec.passes_filter());
        assert_eq!(rec.genotype(), Some("0/1"));
        assert_eq!(rec.read_depth(), Some(20));
        assert_eq!(rec.allele_depths(), Some(vec![12, 8]));
        assert_eq!(rec.key().to_string(), "chr1:100:A>AT");
    }

    #[test]
    fn test_missing_sample_value() {
        let rec = record(&["GT", "DP"], &["./.", "."]);
        assert_eq!(rec.genotype(), Some("./."));
        assert_eq!(rec.read_depth(), None);
        assert_eq!(rec.sample_value(0, "GQ"), None);
        assert_eq!(rec.sample_value(3, "GT"), None);
    }
}
