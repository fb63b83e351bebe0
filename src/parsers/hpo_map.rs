// ==============================================================================
// hpo_map.rs - HPO-to-Gene Map Parser
// ==============================================================================
// Description: Loads an HPO_ID -> GeneSymbol table and resolves patient terms
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Format: CSV or TSV file with header (delimiter sniffed from the header line)
// Example:
//   HPO_ID,GeneSymbol
//   HP:0001263,MECP2
//   HP:0001250,SCN1A
// ==============================================================================

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parsers::{open_table, InputSource};

/// Accepted spellings of the two required columns (compared case-insensitively)
const HPO_COLUMNS: [&str; 3] = ["HPO_ID", "HPO", "TERM_ID"];
const GENE_COLUMNS: [&str; 4] = ["GENESYMBOL", "GENE_SYMBOL", "GENE", "SYMBOL"];

/// Structural problems with a tabular input (phenotype map or panel)
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{source_name} is empty")]
    Empty { source_name: String },

    #[error("{source_name} lacks required column {column} (found: {found})")]
    MissingColumn {
        source_name: String,
        column: &'static str,
        found: String,
    },

    #[error("{source_name} contains no gene symbols")]
    NoGenes { source_name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
}

/// A map row dropped because a required value was missing or unreadable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    pub line: u64,
    pub reason: String,
}

/// HPO term -> genes, plus the inverse gene -> HPO terms. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhenotypeGeneMap {
    forward: BTreeMap<String, BTreeSet<String>>,
    inverse: BTreeMap<String, BTreeSet<String>>,
    dropped: Vec<DroppedRow>,
}

/// Genes implicated by a patient's phenotype, with provenance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateGenes {
    /// Gene symbol -> the patient HPO identifiers that implicate it
    pub genes: BTreeMap<String, BTreeSet<String>>,

    /// Patient identifiers absent from the map, in input order
    pub unmatched: Vec<String>,
}

impl CandidateGenes {
    pub fn contains(&self, gene: &str) -> bool {
        self.genes.contains_key(&normalize_gene(gene))
    }

    pub fn matched_terms(&self, gene: &str) -> Option<&BTreeSet<String>> {
        self.genes.get(&normalize_gene(gene))
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

pub(crate) fn normalize_gene(gene: &str) -> String {
    gene.trim().to_ascii_uppercase()
}

pub(crate) fn normalize_hpo_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

impl PhenotypeGeneMap {
    /// Load from a CSV/TSV source (optionally gzip-compressed)
    pub fn load(source: &InputSource) -> Result<Self, SchemaError> {
        let name = source.name();
        let (delimiter, reader) = open_table(source)?.ok_or_else(|| SchemaError::Empty {
            source_name: name.clone(),
        })?;

        let map = Self::from_reader(reader, delimiter, &name)?;

        info!(
            "Loaded phenotype map {}: {} HPO terms, {} genes, {} rows dropped",
            name,
            map.term_count(),
            map.gene_count(),
            map.dropped.len()
        );
        Ok(map)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8, source_name: &str) -> Result<Self, SchemaError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(SchemaError::Empty {
                source_name: source_name.to_string(),
            });
        }

        let hpo_col = find_column(&headers, &HPO_COLUMNS, "HPO_ID", source_name)?;
        let gene_col = find_column(&headers, &GENE_COLUMNS, "GeneSymbol", source_name)?;
        debug!("{}: HPO column {}, gene column {}", source_name, hpo_col, gene_col);

        let mut map = PhenotypeGeneMap::default();

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    map.drop_row(line, format!("unreadable row: {}", e));
                    continue;
                }
            };
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let hpo = record.get(hpo_col).unwrap_or("");
            let gene = record.get(gene_col).unwrap_or("");
            match (hpo.is_empty(), gene.is_empty()) {
                (false, false) => map.insert(hpo, gene),
                (true, _) => map.drop_row(line, "missing HPO_ID".to_string()),
                (false, true) => map.drop_row(line, "missing GeneSymbol".to_string()),
            }
        }

        if map.forward.is_empty() {
            warn!("Phenotype map {} has no usable rows", source_name);
        }
        Ok(map)
    }

    /// Build directly from (HPO ID, gene) pairs
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut map = PhenotypeGeneMap::default();
        for (hpo, gene) in pairs {
            map.insert(hpo.as_ref(), gene.as_ref());
        }
        map
    }

    fn insert(&mut self, hpo: &str, gene: &str) {
        let hpo = normalize_hpo_id(hpo);
        let gene = normalize_gene(gene);
        self.forward.entry(hpo.clone()).or_default().insert(gene.clone());
        self.inverse.entry(gene).or_default().insert(hpo);
    }

    fn drop_row(&mut self, line: u64, reason: String) {
        warn!("Dropping phenotype map row at line {}: {}", line, reason);
        self.dropped.push(DroppedRow { line, reason });
    }

    pub fn genes_for(&self, hpo_id: &str) -> Option<&BTreeSet<String>> {
        self.forward.get(&normalize_hpo_id(hpo_id))
    }

    pub fn hpo_ids_for_gene(&self, gene: &str) -> Option<&BTreeSet<String>> {
        self.inverse.get(&normalize_gene(gene))
    }

    pub fn term_count(&self) -> usize {
        self.forward.len()
    }

    pub fn gene_count(&self) -> usize {
        self.inverse.len()
    }

    pub fn dropped_rows(&self) -> &[DroppedRow] {
        &self.dropped
    }

    /// Genes implicated by the patient's terms. Unknown terms are not an
    /// error; they are returned in `unmatched`.
    pub fn candidate_genes<S: AsRef<str>>(&self, patient_hpo_ids: &[S]) -> CandidateGenes {
        let mut candidates = CandidateGenes::default();
        let mut seen = BTreeSet::new();

        for id in patient_hpo_ids {
            let id = normalize_hpo_id(id.as_ref());
            if id.is_empty() || !seen.insert(id.clone()) {
                continue;
            }

            match self.forward.get(&id) {
                Some(genes) => {
                    for gene in genes {
                        candidates.genes.entry(gene.clone()).or_default().insert(id.clone());
                    }
                }
                None => candidates.unmatched.push(id),
            }
        }

        debug!(
            "{} candidate genes from {} patient terms ({} unmatched)",
            candidates.len(),
            seen.len(),
            candidates.unmatched.len()
        );
        candidates
    }
}

fn find_column(
    headers: &csv::StringRecord,
    accepted: &[&str],
    column: &'static str,
    source_name: &str,
) -> Result<usize, SchemaError> {
    headers
        .iter()
        .position(|h| {
            let h = h.trim_start_matches('\u{feff}').trim().to_ascii_uppercase();
            accepted.contains(&h.as_str())
        })
        .ok_or_else(|| SchemaError::MissingColumn {
            source_name: source_name.to_string(),
            column,
            found: headers.iter().collect::<Vec<_>>().join(", "),
        })
}
