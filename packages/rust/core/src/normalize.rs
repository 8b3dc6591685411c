//! Turning raw form entries into fixed-layout lead rows.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use leadsync_shared::{CandidateRow, FormEntry, LeadSource, RowFields};

/// Format of the "Lead Date" column.
pub const LEAD_DATE_FORMAT: &str = "%d/%m/%Y";

/// Canonical form of an email for comparison and storage.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Strip every non-digit character.
pub fn clean_phone(raw: Option<&str>) -> String {
    static NON_DIGIT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\D").expect("valid regex"));

    match raw {
        Some(phone) => NON_DIGIT_RE.replace_all(phone, "").into_owned(),
        None => String::new(),
    }
}

/// Split a full name into `(first, last)` at the first whitespace.
pub fn split_name(name: Option<&str>) -> (String, String) {
    let full = name.unwrap_or_default().trim();
    match full.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
        None => (full.to_string(), String::new()),
    }
}

/// Build the sheet row for an accepted submission.
///
/// `email` and `show_name` are already resolved by the caller; missing
/// entry fields become empty cells.
pub fn build_row(
    entry: &FormEntry,
    email: &str,
    show_name: &str,
    source: LeadSource,
    run_date: NaiveDate,
) -> CandidateRow {
    let (first_name, last_name) = split_name(entry.name.as_deref());

    CandidateRow::new(RowFields {
        lead_date: run_date.format(LEAD_DATE_FORMAT).to_string(),
        lead_source: source.label().to_string(),
        first_name,
        last_name,
        company: entry.company.clone().unwrap_or_default(),
        phone: clean_phone(entry.phone.as_deref()),
        email: email.to_string(),
        show_name: show_name.to_string(),
    })
}
