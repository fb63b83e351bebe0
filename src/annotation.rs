// ==============================================================================
// annotation.rs - Consequence Annotation Normalizer
// ==============================================================================
// Description: Decodes SnpEff ANN / VEP CSQ blocks into a common schema
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Field references:
// - SnpEff ANN: https://pcingola.github.io/SnpEff/adds/VCFannotationformat_v1.0.pdf
// - VEP CSQ:   https://www.ensembl.org/info/docs/tools/vep/vep_formats.html
// ==============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::CanonicalPolicy;
use crate::models::{Annotation, AnnotationStatus, Impact, VariantRecord};
use crate::parsers::VcfHeader;

/// Sub-field names of the common schema in one annotator's vocabulary
struct FieldNames {
    allele: &'static str,
    consequence: &'static str,
    impact: &'static str,
    gene: &'static str,
    transcript: &'static str,
    hgvs_c: &'static str,
    hgvs_p: &'static str,
}

static SNPEFF_FIELDS: FieldNames = FieldNames {
    allele: "Allele",
    consequence: "Annotation",
    impact: "Annotation_Impact",
    gene: "Gene_Name",
    transcript: "Feature_ID",
    hgvs_c: "HGVS.c",
    hgvs_p: "HGVS.p",
};

static VEP_FIELDS: FieldNames = FieldNames {
    allele: "Allele",
    consequence: "Consequence",
    impact: "IMPACT",
    gene: "SYMBOL",
    transcript: "Feature",
    hgvs_c: "HGVSc",
    hgvs_p: "HGVSp",
};

/// Fixed ANN layout written by SnpEff when the header does not declare one
const SNPEFF_DEFAULT_LAYOUT: [&str; 16] = [
    "Allele",
    "Annotation",
    "Annotation_Impact",
    "Gene_Name",
    "Gene_ID",
    "Feature_Type",
    "Feature_ID",
    "Transcript_BioType",
    "Rank",
    "HGVS.c",
    "HGVS.p",
    "cDNA.pos / cDNA.length",
    "CDS.pos / CDS.length",
    "AA.pos / AA.length",
    "Distance",
    "ERRORS / WARNINGS / INFO",
];

/// Undecodable annotation for one variant. Never fatal: the variant is kept
/// as unannotated and the error is recorded in the run summary.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatError {
    #[error("{key} present but the header declares no {key} Format")]
    UndeclaredLayout { key: String },

    #[error("{key} layout lacks required field '{field}'")]
    MissingLayoutField { key: String, field: String },

    #[error("{key} value is empty")]
    Empty { key: String },

    #[error("{key} block {block} has {found} fields, at least {required} required")]
    TruncatedBlock {
        key: String,
        block: usize,
        found: usize,
        required: usize,
    },

    #[error("{key} block {block} has unrecognized impact '{value}'")]
    UnknownImpact { key: String, block: usize, value: String },
}

/// Annotation dialect, dispatched on which INFO key is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationDialect {
    /// SnpEff `ANN`
    SnpEff,
    /// Ensembl VEP `CSQ`
    Vep,
}

impl AnnotationDialect {
    pub fn info_key(&self) -> &'static str {
        match self {
            AnnotationDialect::SnpEff => "ANN",
            AnnotationDialect::Vep => "CSQ",
        }
    }

    pub fn from_info_key(key: &str) -> Option<Self> {
        match key {
            "ANN" => Some(AnnotationDialect::SnpEff),
            "CSQ" => Some(AnnotationDialect::Vep),
            _ => None,
        }
    }

    /// Dialect present on a record; `ANN` wins when both keys exist
    pub fn detect(record: &VariantRecord) -> Option<Self> {
        [AnnotationDialect::SnpEff, AnnotationDialect::Vep]
            .into_iter()
            .find(|d| record.info.contains_key(d.info_key()))
    }

    fn field_names(&self) -> &'static FieldNames {
        match self {
            AnnotationDialect::SnpEff => &SNPEFF_FIELDS,
            AnnotationDialect::Vep => &VEP_FIELDS,
        }
    }

    /// Whether an annotator's allele notation refers to `alternate`.
    ///
    /// VEP drops the base shared by REF and ALT for indels and writes `-` for
    /// an empty remainder; SnpEff writes the ALT allele as-is.
    fn allele_matches(&self, block_allele: &str, reference: &str, alternate: &str) -> bool {
        if block_allele == alternate {
            return true;
        }
        if *self != AnnotationDialect::Vep {
            return false;
        }

        let shares_first_base = !reference.is_empty()
            && !alternate.is_empty()
            && reference.as_bytes()[0] == alternate.as_bytes()[0]
            && reference.len() != alternate.len();
        if !shares_first_base {
            return false;
        }

        match alternate.get(1..) {
            Some("") => block_allele == "-",
            Some(trimmed) => block_allele == trimmed,
            None => false,
        }
    }
}

/// Column positions of the common schema inside one dialect's blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    allele: Option<usize>,
    consequence: usize,
    impact: usize,
    gene: usize,
    transcript: Option<usize>,
    hgvs_c: Option<usize>,
    hgvs_p: Option<usize>,
}

impl FieldLayout {
    /// Resolve field positions by name (case-insensitive)
    pub fn resolve<S: AsRef<str>>(dialect: AnnotationDialect, declared: &[S]) -> Result<Self, FormatError> {
        let names = dialect.field_names();
        let find = |name: &str| {
            declared
                .iter()
                .position(|d| d.as_ref().trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &'static str| {
            find(name).ok_or_else(|| FormatError::MissingLayoutField {
                key: dialect.info_key().to_string(),
                field: name.to_string(),
            })
        };

        Ok(Self {
            allele: find(names.allele),
            consequence: require(names.consequence)?,
            impact: require(names.impact)?,
            gene: require(names.gene)?,
            transcript: find(names.transcript),
            hgvs_c: find(names.hgvs_c),
            hgvs_p: find(names.hgvs_p),
        })
    }

    pub fn snpeff_default() -> Self {
        // The default layout always contains every required name
        Self {
            allele: Some(0),
            consequence: 1,
            impact: 2,
            gene: 3,
            transcript: Some(6),
            hgvs_c: Some(9),
            hgvs_p: Some(10),
        }
    }

    /// Minimum number of sub-fields a block must have to be decodable
    pub fn required_width(&self) -> usize {
        self.consequence.max(self.impact).max(self.gene) + 1
    }

    fn decode_block(&self, dialect: AnnotationDialect, block: &str, block_idx: usize) -> Result<Annotation, FormatError> {
        let fields: Vec<&str> = block.split('|').map(str::trim).collect();
        let key = dialect.info_key().to_string();

        if fields.len() < self.required_width() {
            return Err(FormatError::TruncatedBlock {
                key,
                block: block_idx,
                found: fields.len(),
                required: self.required_width(),
            });
        }

        let optional = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };

        let impact = fields[self.impact]
            .parse::<Impact>()
            .map_err(|_| FormatError::UnknownImpact {
                key,
                block: block_idx,
                value: fields[self.impact].to_string(),
            })?;

        Ok(Annotation {
            allele: optional(self.allele),
            gene: optional(Some(self.gene)),
            consequence: fields[self.consequence].to_string(),
            impact,
            transcript: optional(self.transcript),
            hgvs_c: optional(self.hgvs_c),
            hgvs_p: optional(self.hgvs_p),
        })
    }
}

/// Layouts for both dialects, resolved once from the VCF header
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationLayouts {
    snpeff: Result<FieldLayout, FormatError>,
    vep: Result<FieldLayout, FormatError>,
}

impl Default for AnnotationLayouts {
    fn default() -> Self {
        Self::from_header(&VcfHeader::default())
    }
}

impl AnnotationLayouts {
    pub fn from_header(header: &VcfHeader) -> Self {
        let snpeff = match header.annotation_format("ANN") {
            Some(declared) => FieldLayout::resolve(AnnotationDialect::SnpEff, declared.as_slice()).or_else(|e| {
                warn!("Declared ANN layout unusable ({}); assuming standard SnpEff order", e);
                Ok(FieldLayout::snpeff_default())
            }),
            None => FieldLayout::resolve(AnnotationDialect::SnpEff, &SNPEFF_DEFAULT_LAYOUT[..]),
        };

        let vep = match header.annotation_format("CSQ") {
            Some(declared) => FieldLayout::resolve(AnnotationDialect::Vep, declared.as_slice()),
            None => Err(FormatError::UndeclaredLayout {
                key: "CSQ".to_string(),
            }),
        };

        Self { snpeff, vep }
    }

    pub fn layout(&self, dialect: AnnotationDialect) -> Result<&FieldLayout, FormatError> {
        let layout = match dialect {
            AnnotationDialect::SnpEff => &self.snpeff,
            AnnotationDialect::Vep => &self.vep,
        };
        layout.as_ref().map_err(Clone::clone)
    }

    /// Blocks of a multi-allelic annotation value that belong to one allele.
    ///
    /// When no block names any of the site's alleles (or the layout has no
    /// allele column) every block is kept. Returns `None` when other alleles
    /// are named but this one is not.
    pub fn blocks_for_allele(
        &self,
        dialect: AnnotationDialect,
        raw: &str,
        reference: &str,
        alternates: &[String],
        index: usize,
    ) -> Option<String> {
        let allele_idx = match self.layout(dialect).ok().and_then(|l| l.allele) {
            Some(i) => i,
            None => return Some(raw.to_string()),
        };

        fn block_allele(block: &str, idx: usize) -> Option<&str> {
            block.split('|').nth(idx).map(str::trim)
        }
        let blocks: Vec<&str> = raw.split(',').collect();

        let names_site_allele = blocks.iter().any(|b| {
            block_allele(b, allele_idx).is_some_and(|a| {
                alternates
                    .iter()
                    .any(|alt| dialect.allele_matches(a, reference, alt))
            })
        });
        if !names_site_allele {
            return Some(raw.to_string());
        }

        let alternate = alternates.get(index)?;
        let own: Vec<&str> = blocks
            .into_iter()
            .filter(|b| block_allele(b, allele_idx).is_some_and(|a| dialect.allele_matches(a, reference, alternate)))
            .collect();

        if own.is_empty() {
            None
        } else {
            Some(own.join(","))
        }
    }
}

/// Normalized annotation state of one variant
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnnotations {
    pub dialect: Option<AnnotationDialect>,
    pub status: AnnotationStatus,
    /// All decoded blocks, original order
    pub blocks: Vec<Annotation>,
    /// Index into `blocks` of the canonical selection
    pub canonical: Option<usize>,
    pub error: Option<FormatError>,
}

impl NormalizedAnnotations {
    fn without_blocks(dialect: Option<AnnotationDialect>, status: AnnotationStatus, error: Option<FormatError>) -> Self {
        Self {
            dialect,
            status,
            blocks: Vec::new(),
            canonical: None,
            error,
        }
    }

    pub fn canonical(&self) -> Option<&Annotation> {
        self.canonical.and_then(|i| self.blocks.get(i))
    }
}

/// Decode every block of a raw ANN/CSQ value. Any undecodable block fails
/// the whole value.
pub fn decode_blocks(
    dialect: AnnotationDialect,
    raw: &str,
    layout: &FieldLayout,
) -> Result<Vec<Annotation>, FormatError> {
    let blocks: Vec<&str> = raw.split(',').filter(|b| !b.trim().is_empty()).collect();
    if blocks.is_empty() {
        return Err(FormatError::Empty {
            key: dialect.info_key().to_string(),
        });
    }

    blocks
        .into_iter()
        .enumerate()
        .map(|(idx, block)| layout.decode_block(dialect, block, idx))
        .collect()
}

/// Pick the canonical block. Deterministic: for `HighestImpact`, only a
/// strictly higher impact replaces the current pick, so the earliest block
/// wins ties.
pub fn select_canonical(blocks: &[Annotation], policy: CanonicalPolicy) -> Option<usize> {
    match policy {
        CanonicalPolicy::FirstListed => (!blocks.is_empty()).then_some(0),
        CanonicalPolicy::HighestImpact => {
            let mut best: Option<(usize, Impact)> = None;
            for (idx, block) in blocks.iter().enumerate() {
                if best.map_or(true, |(_, impact)| block.impact > impact) {
                    best = Some((idx, block.impact));
                }
            }
            best.map(|(idx, _)| idx)
        }
    }
}

/// Normalize the annotation of one record
pub fn normalize(record: &VariantRecord, layouts: &AnnotationLayouts, policy: CanonicalPolicy) -> NormalizedAnnotations {
    let Some(dialect) = AnnotationDialect::detect(record) else {
        return NormalizedAnnotations::without_blocks(None, AnnotationStatus::Unannotated, None);
    };

    let raw = match record.info_text(dialect.info_key()) {
        Some(".") => {
            return NormalizedAnnotations::without_blocks(Some(dialect), AnnotationStatus::Unannotated, None)
        }
        Some(raw) => raw,
        // Present as a bare flag
        None => {
            let error = FormatError::Empty {
                key: dialect.info_key().to_string(),
            };
            return NormalizedAnnotations::without_blocks(Some(dialect), AnnotationStatus::Malformed, Some(error));
        }
    };

    let decoded = layouts
        .layout(dialect)
        .and_then(|layout| decode_blocks(dialect, raw, layout));

    match decoded {
        Ok(blocks) => {
            let canonical = select_canonical(&blocks, policy);
            NormalizedAnnotations {
                dialect: Some(dialect),
                status: AnnotationStatus::Annotated,
                blocks,
                canonical,
                error: None,
            }
        }
        Err(error) => NormalizedAnnotations::without_blocks(Some(dialect), AnnotationStatus::Malformed, Some(error)),
    }
}
