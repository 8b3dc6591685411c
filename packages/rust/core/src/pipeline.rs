//! One sync cycle: sheet emails → ledger → feeds → adapters → one insert.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tracing::{info, instrument, warn};

use leadsync_feeds::FeedFetcher;
use leadsync_sheets::LeadSheet;
use leadsync_shared::{CandidateRow, EMAIL_HEADER, LeadSource, LeadSyncError, Result, RunId};

use crate::adapters::{adapter_for, collect_rows};
use crate::ledger::EmailLedger;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// What happened to one feed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// The feed was fetched and run through its adapter.
    Processed { fetched: usize, accepted: usize },
    /// The feed was unavailable this cycle and contributed no rows.
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: LeadSource,
    pub outcome: SourceOutcome,
}

/// Result of [`SyncPipeline::run_once`].
#[derive(Debug)]
pub struct SyncReport {
    pub run_id: RunId,
    pub run_date: NaiveDate,
    /// Distinct emails found in the sheet before the run.
    pub existing_emails: usize,
    /// Ledger size at the end of the run.
    pub known_emails: usize,
    pub sources: Vec<SourceReport>,
    /// Rows written to the sheet (zero means no write happened).
    pub inserted: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Syncs leads from the feeds into the sheet.
///
/// Holds no state between runs; every call re-reads the sheet.
pub struct SyncPipeline<S, F> {
    sheet: S,
    feeds: F,
}

impl<S, F> SyncPipeline<S, F>
where
    S: LeadSheet + Sync,
    F: FeedFetcher + Sync,
{
    pub fn new(sheet: S, feeds: F) -> Self {
        Self { sheet, feeds }
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    /// Run one cycle dated today (local time).
    pub async fn run_once(&self) -> Result<SyncReport> {
        self.run_once_on(Local::now().date_naive()).await
    }

    /// Run one cycle, stamping accepted rows with `run_date`.
    ///
    /// Fails only when the sheet itself cannot be read or written; an
    /// unavailable feed is logged and skipped.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run_once_on(&self, run_date: NaiveDate) -> Result<SyncReport> {
        let start = Instant::now();
        let run_id = RunId::new();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        info!("starting sync");

        // --- Phase 1: Ledger ---
        let mut ledger = load_ledger(&self.sheet).await?;
        let existing_emails = ledger.len();
        info!(existing_emails, "existing emails loaded");

        // --- Phase 2: Feeds, in fixed order ---
        let mut rows: Vec<CandidateRow> = Vec::new();
        let mut sources = Vec::with_capacity(LeadSource::ALL.len());

        for source in LeadSource::ALL {
            let outcome = match self.feeds.fetch(source).await {
                Ok(items) => {
                    info!(%source, entries = items.len(), "processing feed");
                    let stats = collect_rows(
                        adapter_for(source),
                        &items,
                        &mut ledger,
                        run_date,
                        &mut rows,
                    );
                    SourceOutcome::Processed {
                        fetched: items.len(),
                        accepted: stats.accepted,
                    }
                }
                Err(e) => {
                    warn!(%source, error = %e, "feed unavailable, skipping this cycle");
                    SourceOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
            };
            sources.push(SourceReport { source, outcome });
        }

        // --- Phase 3: Insert, newest first ---
        info!(new_leads = rows.len(), "total new leads to insert");
        let inserted = rows.len();
        if rows.is_empty() {
            info!("no new leads found");
        } else {
            rows.reverse();
            self.sheet.insert_rows_below_header(&rows).await?;
            info!(inserted, "leads inserted");
        }

        let report = SyncReport {
            run_id,
            run_date,
            existing_emails,
            known_emails: ledger.len(),
            sources,
            inserted,
            elapsed: start.elapsed(),
        };
        info!(elapsed_ms = report.elapsed.as_millis() as u64, "sync complete");
        Ok(report)
    }
}

/// Build the ledger from the sheet's `Email` column.
pub async fn load_ledger<S: LeadSheet>(sheet: &S) -> Result<EmailLedger> {
    let header = sheet.header_row().await?;
    let index = header
        .iter()
        .position(|label| label == EMAIL_HEADER)
        .ok_or_else(|| LeadSyncError::MissingColumn {
            header: EMAIL_HEADER.to_string(),
        })?;

    let cells = sheet.column_values(index).await?;
    Ok(EmailLedger::from_existing(cells))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use leadsync_shared::{FeedItem, FormEntry};

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    /// Grid of cells; row 0 is the header.
    struct MemorySheet {
        grid: Mutex<Vec<Vec<String>>>,
        inserts: Mutex<usize>,
    }

    impl MemorySheet {
        fn new(header: &[&str], emails: &[&str]) -> Self {
            let email_col = header.iter().position(|h| *h == "Email");
            let mut grid = vec![header.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
            for email in emails {
                let mut row = vec![String::new(); header.len()];
                if let Some(col) = email_col {
                    row[col] = email.to_string();
                }
                grid.push(row);
            }
            Self {
                grid: Mutex::new(grid),
                inserts: Mutex::new(0),
            }
        }

        fn data_rows(&self) -> Vec<Vec<String>> {
            self.grid.lock().unwrap()[1..].to_vec()
        }

        fn insert_calls(&self) -> usize {
            *self.inserts.lock().unwrap()
        }
    }

    impl LeadSheet for MemorySheet {
        async fn header_row(&self) -> Result<Vec<String>> {
            Ok(self.grid.lock().unwrap()[0].clone())
        }

        async fn column_values(&self, index: usize) -> Result<Vec<String>> {
            Ok(self.grid.lock().unwrap()[1..]
                .iter()
                .map(|row| row.get(index).cloned().unwrap_or_default())
                .collect())
        }

        async fn insert_rows_below_header(&self, rows: &[CandidateRow]) -> Result<()> {
            *self.inserts.lock().unwrap() += 1;
            let mut grid = self.grid.lock().unwrap();
            for (offset, row) in rows.iter().enumerate() {
                grid.insert(1 + offset, row.cells().to_vec());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeFeeds {
        responses: HashMap<LeadSource, std::result::Result<Vec<FeedItem>, String>>,
    }

    impl FakeFeeds {
        fn with(mut self, source: LeadSource, items: Vec<FeedItem>) -> Self {
            self.responses.insert(source, Ok(items));
            self
        }

        fn failing(mut self, source: LeadSource, reason: &str) -> Self {
            self.responses.insert(source, Err(reason.to_string()));
            self
        }
    }

    impl FeedFetcher for FakeFeeds {
        async fn fetch(&self, source: LeadSource) -> Result<Vec<FeedItem>> {
            match self.responses.get(&source) {
                Some(Ok(items)) => Ok(items.clone()),
                Some(Err(reason)) => {
                    Err(LeadSyncError::feed(source.display_name(), reason.clone()))
                }
                None => Err(LeadSyncError::Network("connection refused".into())),
            }
        }
    }

    fn floorplan(email: &str, name: &str, expo: &str) -> FeedItem {
        FeedItem {
            form_entry: FormEntry {
                name: Some(name.into()),
                email: Some(email.into()),
                phone: Some("(555) 010-0199".into()),
                ..FormEntry::default()
            },
            expo_name: Some(expo.into()),
        }
    }

    fn showguide(email: &str, name: &str, subject: &str) -> FeedItem {
        FeedItem {
            form_entry: FormEntry {
                name: Some(name.into()),
                email: Some(email.into()),
                your_subject: Some(subject.into()),
                ..FormEntry::default()
            },
            expo_name: None,
        }
    }

    const HEADER: &[&str] = &[
        "Assigned To",
        "Lead Date",
        "Lead Source",
        "First Name",
        "Last Name",
        "Company",
        "Phone",
        "Email",
        "Show Name",
    ];

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn end_to_end_dedup_and_reverse_order() {
        let sheet = MemorySheet::new(HEADER, &["a@x.com"]);
        let feeds = FakeFeeds::default()
            .with(
                LeadSource::Floorplan,
                vec![
                    floorplan("b@x.com", "Bea Ortiz", "Austin Floor Plan"),
                    floorplan("A@x.com ", "Al Known", "Austin Floor Plan"),
                ],
            )
            .with(
                LeadSource::ShowGuide,
                vec![showguide("c@x.com", "Cy Young", "Dallas Show Guide")],
            );

        let pipeline = SyncPipeline::new(sheet, feeds);
        let report = pipeline.run_once_on(run_date()).await.unwrap();

        assert_eq!(report.existing_emails, 1);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.known_emails, 3);

        let rows = pipeline.sheet().data_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][7], "c@x.com");
        assert_eq!(rows[0][8], "Dallas Expo");
        assert_eq!(rows[0][2], "B2B Website Show Guide");
        assert_eq!(rows[1][7], "b@x.com");
        assert_eq!(rows[1][8], "Austin Expo");
        assert_eq!(rows[1][6], "5550100199");
        assert_eq!(rows[1][1], "19/10/2026");
        assert_eq!(rows[2][7], "a@x.com");
        assert_eq!(pipeline.sheet().insert_calls(), 1);

        let ledger = load_ledger(pipeline.sheet()).await.unwrap();
        assert_eq!(ledger.len(), 3);
        for email in ["a@x.com", "b@x.com", "c@x.com"] {
            assert!(ledger.contains(email), "{email} missing from sheet");
        }
    }

    #[tokio::test]
    async fn floorplan_wins_shared_email() {
        let sheet = MemorySheet::new(HEADER, &[]);
        let feeds = FakeFeeds::default()
            .with(
                LeadSource::Floorplan,
                vec![floorplan("same@x.com", "Fran Plan", "Leeds Floor Plan")],
            )
            .with(
                LeadSource::ShowGuide,
                vec![showguide("Same@X.com", "Gus Guide", "Leeds Show Guide")],
            );

        let pipeline = SyncPipeline::new(sheet, feeds);
        let report = pipeline.run_once_on(run_date()).await.unwrap();

        assert_eq!(report.inserted, 1);
        let rows = pipeline.sheet().data_rows();
        assert_eq!(rows[0][2], "B2B Website Floor Plan");
        assert_eq!(
            report.sources[1].outcome,
            SourceOutcome::Processed {
                fetched: 1,
                accepted: 0
            }
        );
    }

    #[tokio::test]
    async fn both_feeds_down_inserts_nothing() {
        let sheet = MemorySheet::new(HEADER, &["a@x.com", "b@x.com"]);
        let pipeline = SyncPipeline::new(sheet, FakeFeeds::default());

        let report = pipeline.run_once_on(run_date()).await.unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.known_emails, 2);
        assert!(
            report
                .sources
                .iter()
                .all(|s| matches!(s.outcome, SourceOutcome::Skipped { .. }))
        );
        assert_eq!(pipeline.sheet().insert_calls(), 0);
        assert_eq!(pipeline.sheet().data_rows().len(), 2);
    }

    #[tokio::test]
    async fn failed_feed_does_not_block_the_other() {
        let sheet = MemorySheet::new(HEADER, &[]);
        let feeds = FakeFeeds::default()
            .with(
                LeadSource::Floorplan,
                vec![floorplan("f@x.com", "Flo Rida", "York Floor Plan")],
            )
            .failing(LeadSource::ShowGuide, "HTTP 502");

        let pipeline = SyncPipeline::new(sheet, feeds);
        let report = pipeline.run_once_on(run_date()).await.unwrap();

        assert_eq!(report.inserted, 1);
        match &report.sources[1].outcome {
            SourceOutcome::Skipped { reason } => assert!(reason.contains("HTTP 502")),
            other => panic!("expected Skipped, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_email_header_is_fatal() {
        let sheet = MemorySheet::new(&["Name", "E-mail"], &[]);
        let feeds = FakeFeeds::default().with(
            LeadSource::Floorplan,
            vec![floorplan("f@x.com", "Flo Rida", "York Floor Plan")],
        );

        let pipeline = SyncPipeline::new(sheet, feeds);
        let err = pipeline.run_once_on(run_date()).await.unwrap_err();

        assert!(matches!(err, LeadSyncError::MissingColumn { .. }));
        assert_eq!(pipeline.sheet().insert_calls(), 0);
    }

    #[tokio::test]
    async fn email_column_found_anywhere() {
        let sheet = MemorySheet::new(&["Email", "Name"], &[" Old@X.com", ""]);
        let ledger = load_ledger(&sheet).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains("old@x.com"));
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let sheet = MemorySheet::new(HEADER, &[]);
        let feeds = FakeFeeds::default().with(
            LeadSource::Floorplan,
            vec![
                floorplan("one@x.com", "One Person", "Austin Floor Plan"),
                floorplan("two@x.com", "Two Person", "Austin Floor Plan"),
            ],
        );

        let pipeline = SyncPipeline::new(sheet, feeds);
        let first = pipeline.run_once_on(run_date()).await.unwrap();
        let second = pipeline.run_once_on(run_date()).await.unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.existing_emails, 2);
        assert_eq!(pipeline.sheet().insert_calls(), 1);
    }
}
