// ==============================================================================
// lib.rs - Phenotype-Driven Variant Prioritizer Library
// ==============================================================================
// Description: Library interface for VCF + HPO variant prioritization
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod annotation;
pub mod config;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
pub mod ranker;
pub mod scorer;
pub mod validator;

pub use config::AnalysisConfig;
pub use models::PrioritizedVariant;
pub use parsers::InputSource;
pub use processor::{analyze, AnalysisError, AnalysisResult, RunSummary};
