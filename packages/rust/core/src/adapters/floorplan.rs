use leadsync_shared::{FeedItem, LeadSource};

use super::{SourceAdapter, derive_show_name};

const MARKER: &str = "Floor Plan";

/// Floor Plan requests: the expo comes from the item's `expo_name`.
pub struct FloorplanAdapter;

impl SourceAdapter for FloorplanAdapter {
    fn source(&self) -> LeadSource {
        LeadSource::Floorplan
    }

    fn show_name(&self, item: &FeedItem) -> Option<String> {
        let expo = item.expo_name.as_deref().unwrap_or_default().trim();
        if expo.is_empty() {
            return None;
        }
        Some(derive_show_name(expo, MARKER))
    }
}
