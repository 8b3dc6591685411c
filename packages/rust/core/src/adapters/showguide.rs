use leadsync_shared::{FeedItem, LeadSource};

use super::{SourceAdapter, derive_show_name};

const MARKER: &str = "Show Guide";

/// Show Guide requests: only subjects mentioning "Show Guide" count, and
/// the subject names the show.
pub struct ShowGuideAdapter;

impl SourceAdapter for ShowGuideAdapter {
    fn source(&self) -> LeadSource {
        LeadSource::ShowGuide
    }

    fn show_name(&self, item: &FeedItem) -> Option<String> {
        let subject = item
            .form_entry
            .your_subject
            .as_deref()
            .unwrap_or_default()
            .trim();
        if subject.is_empty() || !subject.contains(MARKER) {
            return None;
        }
        Some(derive_show_name(subject, MARKER))
    }
}
