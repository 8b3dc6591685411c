//! Source adapters: per-feed filtering and show-name rules.
//!
//! Both feeds share one acceptance loop ([`collect_rows`]); an adapter only
//! says which source it is and how (or whether) an item maps to a show.

mod floorplan;
mod showguide;

use chrono::NaiveDate;
use tracing::debug;

use leadsync_shared::{CandidateRow, FeedItem, LeadSource};

use crate::ledger::EmailLedger;
use crate::normalize::{build_row, normalize_email};

pub use floorplan::FloorplanAdapter;
pub use showguide::ShowGuideAdapter;

/// Names longer than this are rejected.
pub const MAX_NAME_CHARS: usize = 80;

/// Appended to every derived show name.
const EXPO_SUFFIX: &str = " Expo";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source-specific rules applied on top of the shared email/name checks.
pub trait SourceAdapter: Send + Sync {
    /// Which feed this adapter handles.
    fn source(&self) -> LeadSource;

    /// Show name for the item, or `None` to skip it.
    fn show_name(&self, item: &FeedItem) -> Option<String>;
}

/// The adapter responsible for `source`.
pub fn adapter_for(source: LeadSource) -> &'static dyn SourceAdapter {
    match source {
        LeadSource::Floorplan => &FloorplanAdapter,
        LeadSource::ShowGuide => &ShowGuideAdapter,
    }
}

// ---------------------------------------------------------------------------
// Acceptance loop
// ---------------------------------------------------------------------------

/// Counts from one adapter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterStats {
    pub accepted: usize,
    pub skipped: usize,
}

/// Run `items` through `adapter`, appending accepted rows to `rows` and
/// their emails to `ledger`.
///
/// Items are considered in order, so a repeated email within the same
/// batch, or one accepted by an earlier adapter sharing the ledger, is
/// skipped.
pub fn collect_rows(
    adapter: &dyn SourceAdapter,
    items: &[FeedItem],
    ledger: &mut EmailLedger,
    run_date: NaiveDate,
    rows: &mut Vec<CandidateRow>,
) -> AdapterStats {
    let mut stats = AdapterStats::default();

    for item in items {
        match accept(adapter, item, ledger, run_date) {
            Some(row) => {
                ledger.insert(row.email().to_string());
                rows.push(row);
                stats.accepted += 1;
            }
            None => stats.skipped += 1,
        }
    }

    debug!(
        source = %adapter.source(),
        accepted = stats.accepted,
        skipped = stats.skipped,
        "adapter pass complete"
    );
    stats
}

fn accept(
    adapter: &dyn SourceAdapter,
    item: &FeedItem,
    ledger: &EmailLedger,
    run_date: NaiveDate,
) -> Option<CandidateRow> {
    let entry = &item.form_entry;

    let email = normalize_email(entry.email.as_deref().unwrap_or_default());
    if email.is_empty() || ledger.contains(&email) {
        return None;
    }

    let name = entry.name.as_deref().unwrap_or_default().trim();
    if is_rejected_name(name) {
        return None;
    }

    let show_name = adapter.show_name(item)?;

    Some(build_row(entry, &email, &show_name, adapter.source(), run_date))
}

/// Spam heuristic: names carrying a link, or implausibly long ones.
pub fn is_rejected_name(name: &str) -> bool {
    name.to_lowercase().contains("http") || name.chars().count() > MAX_NAME_CHARS
}

/// Remove every `marker` from `raw`, trim, and append the expo suffix.
pub(crate) fn derive_show_name(raw: &str, marker: &str) -> String {
    format!("{}{EXPO_SUFFIX}", raw.replace(marker, "").trim())
}
