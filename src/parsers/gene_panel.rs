// ==============================================================================
// gene_panel.rs - Gene Panel Parser
// ==============================================================================
// Description: Loads a gene panel (one symbol per line, or first CSV/TSV column)
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Format: plain list or delimited file; '#' lines and an optional header row
// ("Gene", "GeneSymbol", "Symbol") are skipped.
// ==============================================================================

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use tracing::{debug, info};

use super::hpo_map::{normalize_gene, SchemaError};
use crate::parsers::{open_table, InputSource};

const HEADER_NAMES: [&str; 5] = ["GENE", "GENESYMBOL", "GENE_SYMBOL", "SYMBOL", "HGNC_SYMBOL"];

/// Gene-panel constraint. `Disabled` admits every gene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenePanel {
    #[default]
    Disabled,
    Genes(BTreeSet<String>),
}

/// How the panel constraint ended up for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelStatus {
    NotSupplied,
    Active { genes: usize },
    Degraded { reason: String },
}

impl PanelStatus {
    pub fn constraint_enabled(&self) -> bool {
        matches!(self, PanelStatus::Active { .. })
    }
}

impl GenePanel {
    pub fn from_genes<I, S>(genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        GenePanel::Genes(
            genes
                .into_iter()
                .map(|g| normalize_gene(g.as_ref()))
                .filter(|g| !g.is_empty())
                .collect(),
        )
    }

    pub fn load(source: &InputSource) -> Result<Self, SchemaError> {
        let name = source.name();
        let (delimiter, reader) = open_table(source)?.ok_or_else(|| SchemaError::Empty {
            source_name: name.clone(),
        })?;

        let panel = Self::from_reader(reader, delimiter, &name)?;
        info!("Loaded gene panel {}: {} genes", name, panel.len());
        Ok(panel)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8, source_name: &str) -> Result<Self, SchemaError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut genes = BTreeSet::new();
        let mut first = true;

        for result in reader.records() {
            let record = result?;
            let symbol = record
                .get(0)
                .map(|s| normalize_gene(s.trim_start_matches('\u{feff}')))
                .unwrap_or_default();

            if first {
                first = false;
                if HEADER_NAMES.contains(&symbol.as_str()) {
                    debug!("{}: skipping header row", source_name);
                    continue;
                }
            }
            if !symbol.is_empty() {
                genes.insert(symbol);
            }
        }

        if genes.is_empty() {
            return Err(SchemaError::NoGenes {
                source_name: source_name.to_string(),
            });
        }
        Ok(GenePanel::Genes(genes))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, GenePanel::Genes(_))
    }

    /// Always true when the panel is disabled
    pub fn is_in_panel(&self, gene: &str) -> bool {
        match self {
            GenePanel::Disabled => true,
            GenePanel::Genes(genes) => genes.contains(&normalize_gene(gene)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GenePanel::Disabled => 0,
            GenePanel::Genes(genes) => genes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
