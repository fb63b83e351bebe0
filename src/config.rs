// ==============================================================================
// config.rs - Analysis Configuration
// ==============================================================================
// Description: Immutable scoring and parsing configuration passed per run
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::models::Impact;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {value} (must be finite and >= 0)")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("frequency_keys must not contain empty keys")]
    EmptyFrequencyKey,
}

/// What to do with a malformed VCF data row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorPolicy {
    /// Record a warning and continue with the next row
    #[default]
    Skip,
    /// Fail the whole analysis on the first bad row
    Abort,
}

/// How one block is chosen among several annotation blocks of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalPolicy {
    /// Highest impact level; ties go to the earliest block
    #[default]
    HighestImpact,
    /// The first block as written by the annotator
    FirstListed,
}

/// Weights of the sub-scores in the final sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub impact: f64,
    pub phenotype: f64,
    pub panel: f64,
    pub frequency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            impact: 2.0,
            phenotype: 1.5,
            panel: 0.5,
            frequency: 0.5,
        }
    }
}

/// Raw score per impact level before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactScores {
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
    pub modifier: f64,
    pub unannotated: f64,
}

impl Default for ImpactScores {
    fn default() -> Self {
        Self {
            high: 4.0,
            moderate: 3.0,
            low: 2.0,
            modifier: 1.0,
            unannotated: 0.0,
        }
    }
}

impl ImpactScores {
    pub fn score(&self, impact: Option<Impact>) -> f64 {
        match impact {
            Some(Impact::High) => self.high,
            Some(Impact::Moderate) => self.moderate,
            Some(Impact::Low) => self.low,
            Some(Impact::Modifier) => self.modifier,
            None => self.unannotated,
        }
    }

    /// Largest configured score, used to bring the impact sub-score into [0, 1]
    pub fn max(&self) -> f64 {
        [self.high, self.moderate, self.low, self.modifier, self.unannotated]
            .into_iter()
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub impact_scores: ImpactScores,

    /// INFO keys probed in order for a population allele frequency
    pub frequency_keys: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            impact_scores: ImpactScores::default(),
            frequency_keys: ["AF", "AF_POPMAX", "gnomAD_AF", "VAF"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("weights.impact", self.weights.impact),
            ("weights.phenotype", self.weights.phenotype),
            ("weights.panel", self.weights.panel),
            ("weights.frequency", self.weights.frequency),
            ("impact_scores.high", self.impact_scores.high),
            ("impact_scores.moderate", self.impact_scores.moderate),
            ("impact_scores.low", self.impact_scores.low),
            ("impact_scores.modifier", self.impact_scores.modifier),
            ("impact_scores.unannotated", self.impact_scores.unannotated),
        ];

        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }

        if self.frequency_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyFrequencyKey);
        }

        Ok(())
    }
}

/// Complete per-run configuration. Built once, never mutated during a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub scoring: ScoringConfig,
    pub row_policy: RowErrorPolicy,
    pub canonical_policy: CanonicalPolicy,

    /// Stop after this many emitted variants (recorded as truncation)
    pub max_variants: Option<usize>,

    /// Score variants on the rayon pool
    pub parallel: bool,
}

impl AnalysisConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: AnalysisConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()
    }
}
