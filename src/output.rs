// ==============================================================================
// output.rs - Analysis Report Output
// ==============================================================================
// Description: JSON report envelope handed to external exporters
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::PrioritizedVariant;
use crate::processor::{AnalysisResult, RunSummary};
use crate::validator::InputFingerprint;

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    /// Checksums of every input, in the order they were supplied
    pub inputs: Vec<InputFingerprint>,
    /// Variants in the full ranked list (before any `--top` cut)
    pub total_variants: usize,
    /// Variants written to this report
    pub reported_variants: usize,
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub summary: RunSummary,
    pub variants: Vec<PrioritizedVariant>,
}

impl AnalysisReport {
    /// Build a report, optionally keeping only the `top` best-ranked variants.
    /// The summary always describes the full run.
    pub fn new(result: AnalysisResult, inputs: Vec<InputFingerprint>, top: Option<usize>) -> Self {
        let AnalysisResult { mut variants, summary } = result;
        let total_variants = variants.len();
        if let Some(top) = top {
            variants.truncate(top);
        }

        Self {
            metadata: ReportMetadata {
                tool: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: Utc::now(),
                inputs,
                total_variants,
                reported_variants: variants.len(),
            },
            summary,
            variants,
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self).context("Failed to write JSON report")
    }

    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        info!("Generating JSON report: {:?}", path);

        let file = std::fs::File::create(path).context("Failed to create JSON report file")?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_json(&mut writer)?;
        writer.flush().context("Failed to flush JSON report")?;

        info!(
            "JSON report complete: {} of {} variants",
            self.metadata.reported_variants, self.metadata.total_variants
        );
        Ok(())
    }
}
