//! The set of emails already present in (or accepted for) the lead sheet.

use std::collections::HashSet;

use crate::normalize::normalize_email;

/// Normalized emails known for the current run. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct EmailLedger {
    emails: HashSet<String>,
}

impl EmailLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from raw sheet cells: each is normalized and blanks are dropped.
    pub fn from_existing<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = cells
            .into_iter()
            .map(|cell| normalize_email(cell.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();
        Self { emails }
    }

    /// `email` must already be normalized.
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    /// Record an accepted email. Returns `false` if it was already known.
    pub fn insert(&mut self, email: impl Into<String>) -> bool {
        self.emails.insert(email.into())
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
