//! Reporting and artifact export pipeline.

pub mod artifacts;
pub mod markdown;

pub use artifacts::{write_manifest, write_trade_log, ArtifactManager, ArtifactPaths};
pub use markdown::MarkdownReportGenerator;
