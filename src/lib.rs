//! sentinel-scan: security scan orchestration core.
//!
//! Discovers scannable content in repositories, storage buckets, or pasted
//! snippets, runs security tools against it through uniform adapters,
//! normalizes their findings, and aggregates risk and compliance views over
//! the result. One tool failing degrades a phase, never the session.

pub mod adapter;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod discovery;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod reporter;
pub mod risk;
pub mod store;
pub mod types;

pub use compliance::ComplianceReport;
pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use orchestrator::Orchestrator;
pub use risk::{RiskAssessment, RiskLevel};
pub use types::{Finding, ScanReport, ScanSession, ScanTarget, Severity, Summary};
