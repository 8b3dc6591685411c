//! Lead sync domain logic and pipeline orchestration.
//!
//! This crate ties the feed client and the spreadsheet together:
//! normalize each submission, drop the ones already in the sheet, and
//! insert the rest in one batch ([`pipeline::SyncPipeline::run_once`]).

pub mod adapters;
pub mod ledger;
pub mod normalize;
pub mod pipeline;

pub use ledger::EmailLedger;
pub use pipeline::{SourceOutcome, SourceReport, SyncPipeline, SyncReport};
