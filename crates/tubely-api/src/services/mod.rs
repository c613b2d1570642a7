//! Business logic services.

pub mod ingest;
pub mod orphan_sweeper;

pub use ingest::{
    check_declared_length, BodyLimitExceeded, IngestError, IngestErrorKind, IngestOutcome,
    IngestPipeline, IngestSettings, IngestStage,
};
pub use orphan_sweeper::{OrphanSweeper, SweepReport};
