// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for VCF, HPO-to-gene maps and gene panels
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod vcf;
pub mod hpo_map;
pub mod gene_panel;

pub use vcf::{HeaderError, RowError, VcfHeader, VcfParseError, VcfReader, VcfStats};
pub use hpo_map::{CandidateGenes, PhenotypeGeneMap, SchemaError};
pub use gene_panel::{GenePanel, PanelStatus};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::PathBuf;

use crate::validator;

/// Where an input comes from. Every `open` starts a fresh stream from the
/// first byte, so a source can be read more than once.
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    Memory { name: String, data: Vec<u8> },
}

impl InputSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        InputSource::Path(path.into())
    }

    pub fn memory(name: impl Into<String>, data: Vec<u8>) -> Self {
        InputSource::Memory {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> String {
        match self {
            InputSource::Path(path) => path.display().to_string(),
            InputSource::Memory { name, .. } => name.clone(),
        }
    }

    /// Undecoded byte stream
    pub fn open_raw(&self) -> io::Result<Box<dyn BufRead + Send + '_>> {
        match self {
            InputSource::Path(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            InputSource::Memory { data, .. } => Ok(Box::new(Cursor::new(data.as_slice()))),
        }
    }

    /// Text stream; gzip/BGZF is detected by its signature, not the file name
    pub fn open(&self) -> io::Result<Box<dyn BufRead + Send + '_>> {
        let mut raw = self.open_raw()?;
        let compressed = validator::is_gzip(raw.fill_buf()?);

        if compressed {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(raw))))
        } else {
            Ok(raw)
        }
    }
}

/// Tab if the header line has one, comma otherwise
pub(crate) fn sniff_delimiter(header_line: &str) -> u8 {
    if header_line.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

/// Opens a delimited table and sniffs its delimiter from the first line.
/// Returns `None` for an empty input.
pub(crate) fn open_table(source: &InputSource) -> io::Result<Option<(u8, impl Read + '_)>> {
    let mut reader = source.open()?;
    let mut first_line = String::new();
    if reader.read_line(&mut first_line)? == 0 {
        return Ok(None);
    }

    let delimiter = sniff_delimiter(&first_line);
    Ok(Some((delimiter, Cursor::new(first_line.into_bytes()).chain(reader))))
}
