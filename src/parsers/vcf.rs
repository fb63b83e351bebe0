// ==============================================================================
// parsers/vcf.rs - Streaming VCF parser
// ==============================================================================
// Description: Lazy VCF / VCF.GZ reader over noodles-vcf, one record per ALT allele
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// ==============================================================================

use noodles_vcf as vcf;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, BufRead, Read};
use thiserror::Error;
use tracing::{debug, warn};

use crate::annotation::{AnnotationDialect, AnnotationLayouts};
use crate::config::RowErrorPolicy;
use crate::models::{InfoValue, VariantRecord};
use crate::parsers::InputSource;

/// Fatal problems with the meta-information / column header
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeaderError {
    #[error("missing #CHROM column header line")]
    MissingColumnHeader,

    /// Rejected by the noodles header parser
    #[error("{0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowErrorKind {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("invalid position '{value}'")]
    InvalidPosition { value: String },

    #[error("invalid QUAL: {value}")]
    InvalidQuality { value: String },

    #[error("missing {field}")]
    MissingField { field: String },

    /// The record reader could not split the line into fields
    #[error("unreadable record: {message}")]
    Malformed { message: String },
}

/// A malformed data row
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("line {line}: {kind}")]
pub struct RowError {
    pub line: usize,
    pub kind: RowErrorKind,
}

#[derive(Error, Debug)]
pub enum VcfParseError {
    #[error("Invalid VCF header: {0}")]
    Header(#[from] HeaderError),

    #[error("Malformed VCF row: {0}")]
    Row(#[from] RowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One `##INFO=<...>` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoDefinition {
    pub id: String,
    pub number: String,
    pub kind: String,
    pub description: String,
}

/// Parsed meta-information and column header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VcfHeader {
    /// e.g. "VCFv4.2"
    pub file_format: Option<String>,

    /// Sample names from the #CHROM line
    pub samples: Vec<String>,

    pub infos: BTreeMap<String, InfoDefinition>,

    /// Number of tab-separated columns every data row must have
    pub column_count: usize,
}

impl VcfHeader {
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_index(&self, name: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == name)
    }

    /// Declared `Number` of an INFO key
    pub fn info_number(&self, key: &str) -> Option<&str> {
        self.infos.get(key).map(|d| d.number.as_str())
    }

    /// Sub-field order declared for a pipe-delimited annotation key.
    ///
    /// VEP writes `... Format: Allele|Consequence|...`, SnpEff writes
    /// `Functional annotations: 'Allele | Annotation | ...'`.
    pub fn annotation_format(&self, key: &str) -> Option<Vec<String>> {
        let description = &self.infos.get(key)?.description;

        let declared = ["Format:", "Functional annotations:"]
            .into_iter()
            .find_map(|marker| description.find(marker).map(|i| &description[i + marker.len()..]))?;

        let fields: Vec<String> = declared
            .trim()
            .trim_matches(|c: char| c == '\'' || c == '"')
            .split('|')
            .map(|f| f.trim().to_string())
            .collect();

        if fields.iter().all(|f| f.is_empty()) {
            None
        } else {
            Some(fields)
        }
    }
}

impl From<&vcf::Header> for VcfHeader {
    fn from(header: &vcf::Header) -> Self {
        let file_format = header.file_format();

        let infos = header
            .infos()
            .iter()
            .map(|(id, info)| {
                let definition = InfoDefinition {
                    id: id.to_string(),
                    number: {
                        use vcf::header::record::value::map::info::Number;
                        match info.number() {
                            Number::Count(n) => n.to_string(),
                            Number::AlternateBases => "A".to_string(),
                            Number::ReferenceAlternateBases => "R".to_string(),
                            Number::Samples => "G".to_string(),
                            Number::Unknown => ".".to_string(),
                        }
                    },
                    kind: info.ty().to_string(),
                    description: info.description().to_string(),
                };
                (definition.id.clone(), definition)
            })
            .collect();

        let samples: Vec<String> = header.sample_names().iter().cloned().collect();
        let column_count = if samples.is_empty() { 8 } else { 9 + samples.len() };

        Self {
            file_format: Some(format!("VCFv{}.{}", file_format.major(), file_format.minor())),
            samples,
            infos,
            column_count,
        }
    }
}

/// Site-level statistics collected while streaming
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VcfStats {
    /// Data rows parsed successfully
    pub rows: usize,
    /// Rows with FILTER `PASS` or `.`
    pub pass_rows: usize,
    pub snvs: usize,
    pub indels: usize,
    pub transitions: usize,
    pub transversions: usize,
    pub by_chromosome: BTreeMap<String, usize>,
    pub by_filter: BTreeMap<String, usize>,
}

impl VcfStats {
    pub fn ti_tv_ratio(&self) -> Option<f64> {
        if self.transversions == 0 {
            None
        } else {
            Some(self.transitions as f64 / self.transversions as f64)
        }
    }

    fn observe_row(&mut self, chromosome: &str, filter: &str, reference: &str, alternates: &[String]) {
        self.rows += 1;
        *self.by_filter.entry(filter.to_string()).or_insert(0) += 1;
        *self.by_chromosome.entry(chromosome.to_string()).or_insert(0) += 1;
        if filter == "PASS" || filter == "." {
            self.pass_rows += 1;
        }

        for alt in alternates {
            if reference.len() == 1 && alt.len() == 1 {
                self.snvs += 1;
                let pair = (
                    reference.to_ascii_uppercase(),
                    alt.to_ascii_uppercase(),
                );
                match (pair.0.as_str(), pair.1.as_str()) {
                    ("A", "G") | ("G", "A") | ("C", "T") | ("T", "C") => self.transitions += 1,
                    _ => self.transversions += 1,
                }
            } else {
                self.indels += 1;
            }
        }
    }
}

/// Counts the lines and bytes consumed through it, so data rows can be
/// reported by line number while noodles does the reading.
struct LineCounter<R> {
    inner: R,
    lines: usize,
    bytes: u64,
}

impl<R: BufRead> LineCounter<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            lines: 0,
            bytes: 0,
        }
    }

    fn count(&mut self, consumed: &[u8]) {
        self.lines += consumed.iter().filter(|&&b| b == b'\n').count();
        self.bytes += consumed.len() as u64;
    }
}

impl<R: BufRead> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for LineCounter<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // amt never exceeds what the last fill_buf returned, so this does no IO
        if let Ok(buf) = self.inner.fill_buf() {
            let consumed = &buf[..amt.min(buf.len())];
            self.lines += consumed.iter().filter(|&&b| b == b'\n').count();
            self.bytes += consumed.len() as u64;
        }
        self.inner.consume(amt);
    }
}

/// Streaming VCF reader.
///
/// The header is read eagerly by the constructor; data rows are decoded one
/// at a time as the iterator is driven, so memory stays flat regardless of
/// file size. Each item is one logical variant (one ALT allele).
pub struct VcfReader<R> {
    inner: vcf::io::Reader<LineCounter<R>>,
    record: vcf::Record,
    header: VcfHeader,
    layouts: AnnotationLayouts,
    policy: RowErrorPolicy,
    pending: VecDeque<VariantRecord>,
    skipped: Vec<RowError>,
    stats: VcfStats,
    finished: bool,
}

impl<'a> VcfReader<Box<dyn BufRead + Send + 'a>> {
    /// Open a source (plain or gzip/BGZF, detected by signature)
    pub fn open(source: &'a InputSource, policy: RowErrorPolicy) -> Result<Self, VcfParseError> {
        let reader = source.open()?;
        Self::new(reader, policy)
    }
}

impl<R: BufRead> VcfReader<R> {
    pub fn new(inner: R, policy: RowErrorPolicy) -> Result<Self, VcfParseError> {
        let mut counter = LineCounter::new(inner);
        if counter.fill_buf()?.first() != Some(&b'#') {
            return Err(HeaderError::MissingColumnHeader.into());
        }

        let mut inner = vcf::io::Reader::new(counter);
        let raw_header = inner.read_header().map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => VcfParseError::Header(HeaderError::Invalid(e.to_string())),
            _ => VcfParseError::Io(e),
        })?;
        let header = VcfHeader::from(&raw_header);

        debug!(
            "VCF header ({}): {} samples, {} INFO definitions, {} lines",
            header.file_format.as_deref().unwrap_or("unknown version"),
            header.sample_count(),
            header.infos.len(),
            inner.get_ref().lines
        );

        let layouts = AnnotationLayouts::from_header(&header);

        Ok(Self {
            inner,
            record: vcf::Record::default(),
            header,
            layouts,
            policy,
            pending: VecDeque::new(),
            skipped: Vec::new(),
            stats: VcfStats::default(),
            finished: false,
        })
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    /// ANN/CSQ sub-field layouts resolved from the header
    pub fn layouts(&self) -> &AnnotationLayouts {
        &self.layouts
    }

    /// Rows skipped so far under the skip policy
    pub fn skipped_rows(&self) -> &[RowError] {
        &self.skipped
    }

    pub fn stats(&self) -> &VcfStats {
        &self.stats
    }

    /// Skips blank and `#` lines between data rows; `false` at end of input
    fn skip_to_data_line(&mut self) -> io::Result<bool> {
        let counter = self.inner.get_mut();
        loop {
            let buf = counter.fill_buf()?;
            let blank = match buf {
                [] => return Ok(false),
                [b'\n', ..] => 1,
                [b'\r', b'\n', ..] => 2,
                [b'#', ..] => 0,
                _ => return Ok(true),
            };

            if blank > 0 {
                counter.consume(blank);
            } else {
                let mut comment = Vec::new();
                counter.read_until(b'\n', &mut comment)?;
            }
        }
    }

    /// Next data row. The outer error is fatal IO, the inner one a bad row.
    fn read_row(&mut self) -> io::Result<Option<Result<Vec<VariantRecord>, RowError>>> {
        if !self.skip_to_data_line()? {
            return Ok(None);
        }

        let line = self.inner.get_ref().lines + 1;
        let consumed = self.inner.get_ref().bytes;

        match self.inner.read_record(&mut self.record) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(self.parse_row(line))),
            Err(e) if self.inner.get_ref().bytes > consumed => Ok(Some(Err(RowError {
                line,
                kind: RowErrorKind::Malformed { message: e.to_string() },
            }))),
            Err(e) => Err(e),
        }
    }

    /// Decodes the record just read into one `VariantRecord` per ALT allele
    fn parse_row(&mut self, line: usize) -> Result<Vec<VariantRecord>, RowError> {
        let row_error = |kind| RowError { line, kind };
        let record = &self.record;

        let sample_columns = record.samples();
        let sample_columns: &str = sample_columns.as_ref();
        let found = if sample_columns.is_empty() {
            8
        } else {
            8 + sample_columns.split('\t').count()
        };
        if found != self.header.column_count {
            return Err(row_error(RowErrorKind::ColumnCount {
                expected: self.header.column_count,
                found,
            }));
        }

        let chromosome = record.reference_sequence_name().trim();
        if chromosome.is_empty() {
            return Err(row_error(RowErrorKind::MissingField { field: "CHROM".to_string() }));
        }

        let position = match record.variant_start() {
            Some(Ok(position)) => position.get() as u64,
            Some(Err(e)) => return Err(row_error(RowErrorKind::InvalidPosition { value: e.to_string() })),
            None => return Err(row_error(RowErrorKind::InvalidPosition { value: "0".to_string() })),
        };

        let reference = record.reference_bases().trim();
        if reference.is_empty() || reference == "." {
            return Err(row_error(RowErrorKind::MissingField { field: "REF".to_string() }));
        }

        let alternate_bases = record.alternate_bases();
        let alternates: Vec<String> = match AsRef::<str>::as_ref(&alternate_bases).trim() {
            "" => return Err(row_error(RowErrorKind::MissingField { field: "ALT".to_string() })),
            "." => Vec::new(),
            alt => alt.split(',').map(|a| a.trim().to_string()).collect(),
        };
        if alternates.iter().any(|a| a.is_empty()) {
            return Err(row_error(RowErrorKind::MissingField { field: "ALT".to_string() }));
        }

        let quality = match record.quality_score() {
            None => None,
            Some(Ok(q)) => Some(widen_quality(q)),
            Some(Err(e)) => return Err(row_error(RowErrorKind::InvalidQuality { value: e.to_string() })),
        };

        let filters = record.filters();
        let filter = match AsRef::<str>::as_ref(&filters).trim() {
            "" => ".",
            f => f,
        };

        let ids = record.ids();
        let id = match AsRef::<str>::as_ref(&ids).trim() {
            "." | "" => None,
            id => Some(id.to_string()),
        };

        let raw_info = record.info();
        let info = parse_info(raw_info.as_ref());

        let (format, samples): (Vec<String>, Vec<Vec<String>>) = if sample_columns.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let mut columns = sample_columns.split('\t');
            let format = columns
                .next()
                .map(|f| f.split(':').map(str::to_string).collect())
                .unwrap_or_default();
            let samples = columns
                .map(|s| s.split(':').map(str::to_string).collect())
                .collect();
            (format, samples)
        };

        self.stats.observe_row(chromosome, filter, reference, &alternates);

        let records = (0..alternates.len())
            .map(|index| VariantRecord {
                chromosome: chromosome.to_string(),
                position,
                id: id.clone(),
                reference: reference.to_string(),
                info: self.narrow_info(&info, reference, &alternates, index),
                alternates: alternates.clone(),
                allele_index: index,
                quality,
                filter: filter.to_string(),
                format: format.clone(),
                samples: samples.clone(),
                line_number: line,
            })
            .collect();

        Ok(records)
    }

    /// INFO for one allele of a possibly multi-allelic row.
    ///
    /// `Number=A` keys keep the allele's own value, `Number=R` keep the
    /// reference value plus the allele's value, annotation keys keep only
    /// the blocks naming this allele. Everything else is copied verbatim.
    fn narrow_info(
        &self,
        info: &BTreeMap<String, InfoValue>,
        reference: &str,
        alternates: &[String],
        index: usize,
    ) -> BTreeMap<String, InfoValue> {
        if alternates.len() < 2 {
            return info.clone();
        }

        let mut narrowed = BTreeMap::new();
        for (key, value) in info {
            let text = match value {
                InfoValue::Text(text) => text,
                InfoValue::Flag => {
                    narrowed.insert(key.clone(), InfoValue::Flag);
                    continue;
                }
            };

            if let Some(dialect) = AnnotationDialect::from_info_key(key) {
                if let Some(blocks) = self.layouts.blocks_for_allele(dialect, text, reference, alternates, index) {
                    narrowed.insert(key.clone(), InfoValue::Text(blocks));
                }
                continue;
            }

            let values: Vec<&str> = text.split(',').collect();
            let value = match self.header.info_number(key) {
                Some("A") if values.len() == alternates.len() => values[index].to_string(),
                Some("R") if values.len() == alternates.len() + 1 => {
                    format!("{},{}", values[0], values[index + 1])
                }
                _ => text.clone(),
            };
            narrowed.insert(key.clone(), InfoValue::Text(value));
        }
        narrowed
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<VariantRecord, VcfParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if self.finished {
                return None;
            }

            let parsed = match self.read_row() {
                Ok(Some(parsed)) => parsed,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            };

            match parsed {
                Ok(records) => self.pending.extend(records),
                Err(err) => match self.policy {
                    RowErrorPolicy::Skip => {
                        warn!("Skipping malformed VCF row: {}", err);
                        self.skipped.push(err);
                    }
                    RowErrorPolicy::Abort => {
                        self.finished = true;
                        return Some(Err(err.into()));
                    }
                },
            }
        }
    }
}

/// noodles reads QUAL as f32. Widened through its shortest decimal form,
/// `29.7` stays `29.7`.
fn widen_quality(quality: f32) -> f64 {
    quality.to_string().parse().unwrap_or(f64::from(quality))
}

fn parse_info(raw: &str) -> BTreeMap<String, InfoValue> {
    let mut info = BTreeMap::new();
    let raw = raw.trim();
    if raw.is_empty() || raw == "." {
        return info;
    }

    for entry in raw.split(';').filter(|e| !e.is_empty()) {
        let (key, value) = match entry.split_once('=') {
            Some((k, v)) => (k, InfoValue::Text(v.to_string())),
            None => (entry, InfoValue::Flag),
        };
        info.entry(key.to_string()).or_insert(value);
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">\n\
##INFO=<ID=AD_SUM,Number=R,Type=Integer,Description=\"Depth per allele\">\n\
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL|Feature|HGVSc|HGVSp\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tproband\n";

    fn reader(body: &str, policy: RowErrorPolicy) -> Result<VcfReader<Cursor<Vec<u8>>>, VcfParseError> {
        VcfReader::new(Cursor::new(format!("{}{}", HEADER, body).into_bytes()), policy)
    }

    #[test]
    fn test_header_fields() {
        let r = reader("", RowErrorPolicy::Skip).unwrap();
        let header = r.header();

        assert_eq!(header.file_format.as_deref(), Some("VCFv4.2"));
        assert_eq!(header.samples, vec!["proband"]);
        assert_eq!(header.column_count, 10);
        assert_eq!(header.info_number("AF"), Some("A"));
        assert_eq!(
            header.annotation_format("CSQ").unwrap(),
            vec!["Allele", "Consequence", "IMPACT", "SYMBOL", "Feature", "HGVSc", "HGVSp"]
        );
        assert!(header.annotation_format("AF").is_none());
    }

    #[test]
    fn test_snpeff_declared_format() {
        let vcf = "##fileformat=VCFv4.3\n\
##INFO=<ID=ANN,Number=.,Type=String,Description=\"Functional annotations: 'Allele | Annotation | Annotation_Impact | Gene_Name'\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        let r = VcfReader::new(Cursor::new(vcf.as_bytes().to_vec()), RowErrorPolicy::Skip).unwrap();
        assert_eq!(
            r.header().annotation_format("ANN").unwrap(),
            vec!["Allele", "Annotation", "Annotation_Impact", "Gene_Name"]
        );
        assert!(r.header().samples.is_empty());
        assert_eq!(r.header().column_count, 8);
        assert_eq!(r.header().file_format.as_deref(), Some("VCFv4.3"));
    }

    #[test]
    fn test_missing_chrom_line_is_fatal() {
        let data_first = "chr1\t100\t.\tA\tG\t.\t.\t.\n";
        let err = VcfReader::new(Cursor::new(data_first.as_bytes().to_vec()), RowErrorPolicy::Skip)
            .err()
            .unwrap();
        assert!(matches!(err, VcfParseError::Header(HeaderError::MissingColumnHeader)));

        let empty = VcfReader::new(Cursor::new(Vec::new()), RowErrorPolicy::Skip).err().unwrap();
        assert!(matches!(empty, VcfParseError::Header(HeaderError::MissingColumnHeader)));

        let no_columns = "##fileformat=VCFv4.2\nchr1\t100\t.\tA\tG\t.\t.\t.\n";
        let err = VcfReader::new(Cursor::new(no_columns.as_bytes().to_vec()), RowErrorPolicy::Skip)
            .err()
            .unwrap();
        assert!(matches!(err, VcfParseError::Header(_)));
    }

    #[test]
    fn test_malformed_sample_columns() {
        let dup = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts1\n";
        let err = VcfReader::new(Cursor::new(dup.as_bytes().to_vec()), RowErrorPolicy::Skip)
            .err()
            .unwrap();
        assert!(matches!(err, VcfParseError::Header(HeaderError::Invalid(_))));

        let wrong = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tGT\ts1\n";
        assert!(VcfReader::new(Cursor::new(wrong.as_bytes().to_vec()), RowErrorPolicy::Skip).is_err());
    }

    #[test]
    fn test_parse_single_record() {
        let r = reader(
            "chr1\t12345\trs1\tA\tG\t50.5\tPASS\tAF=0.01;DB\tGT:DP\t0/1:30\n",
            RowErrorPolicy::Skip,
        )
        .unwrap();
        let records: Vec<VariantRecord> = r.map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.chromosome, "chr1");
        assert_eq!(rec.position, 12345);
        assert_eq!(rec.id.as_deref(), Some("rs1"));
        assert_eq!(rec.alternate(), "G");
        assert_eq!(rec.quality, Some(50.5));
        assert_eq!(rec.info_text("AF"), Some("0.01"));
        assert!(rec.has_info_flag("DB"));
        assert_eq!(rec.genotype(), Some("0/1"));
        assert_eq!(rec.read_depth(), Some(30));
        assert_eq!(rec.line_number, 6);
    }

    #[test]
    fn test_multiallelic_expansion() {
        let body = "chr2\t500\t.\tA\tG,AT\t.\tPASS\tAF=0.1,0.2;AD_SUM=10,4,6;DP=40;CSQ=G|missense_variant|MODERATE|GENE2|T1||,T|frameshift_variant|HIGH|GENE2|T1||\tGT\t1/2\n";
        let mut r = reader(body, RowErrorPolicy::Skip).unwrap();
        let records: Vec<VariantRecord> = r.by_ref().map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].alternate(), "G");
        assert_eq!(records[0].info_text("AF"), Some("0.1"));
        assert_eq!(records[0].info_text("AD_SUM"), Some("10,4"));
        assert_eq!(records[0].info_text("DP"), Some("40"));
        assert_eq!(
            records[0].info_text("CSQ"),
            Some("G|missense_variant|MODERATE|GENE2|T1||")
        );

        assert_eq!(records[1].alternate(), "AT");
        assert_eq!(records[1].info_text("AF"), Some("0.2"));
        assert_eq!(records[1].info_text("AD_SUM"), Some("10,6"));
        // VEP writes the insertion without the shared leading base
        assert_eq!(
            records[1].info_text("CSQ"),
            Some("T|frameshift_variant|HIGH|GENE2|T1||")
        );

        let stats = r.stats();
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.snvs, 1);
        assert_eq!(stats.indels, 1);
        assert_eq!(stats.transitions, 1);
    }

    #[test]
    fn test_no_alt_row_emits_nothing() {
        let mut r = reader("chr1\t10\t.\tA\t.\t.\tPASS\t.\tGT\t0/0\n", RowErrorPolicy::Skip).unwrap();
        assert!(r.next().is_none());
        assert_eq!(r.stats().rows, 1);
    }

    #[test]
    fn test_bad_rows_skipped_with_warning() {
        let body = "chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\n\
chr1\tabc\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\n\
chr1\t300\t.\tA\tG\t.\tPASS\t.\n\
chr1\t400\t.\tC\tT\tlow\tPASS\t.\tGT\t0/1\n\
chr1\t500\t.\tC\tT\t.\tPASS\t.\tGT\t1/1\n";
        let mut r = reader(body, RowErrorPolicy::Skip).unwrap();
        let records: Vec<VariantRecord> = r.by_ref().map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(r.skipped_rows().len(), 3);
        assert!(matches!(r.skipped_rows()[0].kind, RowErrorKind::InvalidPosition { .. }));
        assert!(matches!(
            r.skipped_rows()[1].kind,
            RowErrorKind::ColumnCount { expected: 10, found: 8 }
        ));
        assert!(matches!(r.skipped_rows()[2].kind, RowErrorKind::InvalidQuality { .. }));
        assert_eq!(r.skipped_rows()[0].line, 7);
    }

    #[test]
    fn test_bad_row_aborts_in_strict_mode() {
        let body = "chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\n\
chr1\t0\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\n\
chr1\t300\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\n";
        let mut r = reader(body, RowErrorPolicy::Abort).unwrap();

        assert!(r.next().unwrap().is_ok());
        assert!(matches!(r.next(), Some(Err(VcfParseError::Row(_)))));
        assert!(r.next().is_none());
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let vcf = "##fileformat=VCFv4.2\r\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\r\n\r\nchr1\t5\t.\tG\tA\t.\t.\tANN=A|x|LOW|G1\r\n";
        let r = VcfReader::new(Cursor::new(vcf.as_bytes().to_vec()), RowErrorPolicy::Skip).unwrap();
        let records: Vec<VariantRecord> = r.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].info_text("ANN"), Some("A|x|LOW|G1"));
    }

    #[test]
    fn test_quality_keeps_decimal_form() {
        let r = reader("chr1\t7\t.\tA\tG\t29.7\tPASS\t.\tGT\t0/1\n", RowErrorPolicy::Skip).unwrap();
        let records: Vec<VariantRecord> = r.map(|r| r.unwrap()).collect();
        assert_eq!(records[0].quality, Some(29.7));
    }
}
