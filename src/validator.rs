// ==============================================================================
// validator.rs - Input Validation
// ==============================================================================
// Description: Container signatures, HPO identifier checks, input fingerprints
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use tracing::debug;

use crate::parsers::InputSource;

/// Gzip member signature (plain gzip and BGZF both start with it)
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Checksum and size of one input, reported alongside the results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFingerprint {
    /// Role of the input ("vcf", "phenotype_map", "panel")
    pub role: String,
    pub name: String,
    pub size: u64,
    pub sha256: String,
}

pub fn verify_magic_number(expected: &[u8], actual: &[u8]) -> bool {
    expected.len() <= actual.len() && expected.iter().zip(actual.iter()).all(|(e, a)| e == a)
}

pub fn is_gzip(prefix: &[u8]) -> bool {
    verify_magic_number(&GZIP_MAGIC, prefix)
}

/// `HP:` followed by exactly seven digits
pub fn is_valid_hpo_id(id: &str) -> bool {
    match id.strip_prefix("HP:") {
        Some(digits) => digits.len() == 7 && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// SHA-256 over the raw (still compressed) bytes of an input
pub fn fingerprint(role: &str, source: &InputSource) -> std::io::Result<InputFingerprint> {
    let mut reader = source.open_raw()?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    let mut size = 0u64;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        size += n as u64;
        hasher.update(&buffer[..n]);
    }

    let sha256 = format!("{:x}", hasher.finalize());
    debug!("{} {}: {} bytes, sha256 {}", role, source.name(), size, sha256);

    Ok(InputFingerprint {
        role: role.to_string(),
        name: source.name(),
        size,
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hpo_id_format() {
        assert!(is_valid_hpo_id("HP:0001263"));
        assert!(!is_valid_hpo_id("HP:001263"));
        assert!(!is_valid_hpo_id("HP:00012634"));
        assert!(!is_valid_hpo_id("hp:0001263"));
        assert!(!is_valid_hpo_id("HP:000126a"));
        assert!(!is_valid_hpo_id("0001263"));
    }

    #[test]
    fn test_gzip_signature() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08, 0x04]));
        assert!(!is_gzip(b"##fileformat=VCFv4.2"));
        assert!(!is_gzip(&[0x1f]));
        assert!(!is_gzip(&[]));
    }

    #[test]
    fn test_fingerprint_memory_source() {
        let source = InputSource::memory("panel.txt", b"BRCA1\nBRCA2\n".to_vec());
        let fp = fingerprint("panel", &source).unwrap();

        assert_eq!(fp.role, "panel");
        assert_eq!(fp.name, "panel.txt");
        assert_eq!(fp.size, 12);
        assert_eq!(fp.sha256.len(), 64);

        let again = fingerprint("panel", &source).unwrap();
        assert_eq!(fp, again);
    }
}
