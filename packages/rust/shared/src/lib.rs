//! Shared types, error model, and configuration for LeadSync.
//!
//! This crate is the foundation depended on by all other LeadSync crates.
//! It provides:
//! - [`LeadSyncError`] — the unified error type
//! - Domain types ([`FeedItem`], [`FormEntry`], [`CandidateRow`], [`LeadSource`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FeedsConfig, ScheduleConfig, SheetConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_feed_token,
};
pub use error::{LeadSyncError, Result};
pub use types::{
    CandidateRow, EMAIL_HEADER, FeedEnvelope, FeedItem, FormEntry, LeadSource, ROW_WIDTH, RowFields,
    RunId,
};
