//! Google Sheets access for the lead spreadsheet.
//!
//! This crate provides:
//! - [`LeadSheet`] — the three operations the sync pipeline needs from its destination
//! - [`GoogleSheet`] — a Sheets API v4 implementation over reqwest
//! - [`Authenticator`] — service-account (JWT bearer grant) or static-token auth
//! - [`a1`] — A1-notation helpers

pub mod a1;
pub mod auth;
pub mod client;

use std::future::Future;

use leadsync_shared::{CandidateRow, Result};

pub use auth::{Authenticator, ServiceAccountKey};
pub use client::{GoogleSheet, SheetsOptions, SpreadsheetRef};

/// The destination of synced leads: a worksheet with a header row.
pub trait LeadSheet {
    /// Labels in row 1, left to right.
    fn header_row(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Values of the zero-based column `index` for every row below the header.
    /// Empty cells come back as empty strings.
    fn column_values(&self, index: usize) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Insert `rows` as new rows 2..=n+1, in the given order, pushing
    /// existing data down.
    fn insert_rows_below_header(
        &self,
        rows: &[CandidateRow],
    ) -> impl Future<Output = Result<()>> + Send;
}
