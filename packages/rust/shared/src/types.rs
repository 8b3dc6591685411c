//! Core domain types for LeadSync: feed records and spreadsheet rows.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Header label that identifies the email column in the destination sheet.
pub const EMAIL_HEADER: &str = "Email";

/// Number of columns in a [`CandidateRow`].
pub const ROW_WIDTH: usize = 20;

/// Fixed tag written into every lead row.
const OPPORTUNITY_TAG: &str = "Exhibitors_opportunity";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one sync run (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LeadSource
// ---------------------------------------------------------------------------

/// The upstream form feeds, in the order they are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadSource {
    Floorplan,
    ShowGuide,
}

impl LeadSource {
    /// All sources in processing order. Earlier sources win duplicate emails.
    pub const ALL: [LeadSource; 2] = [LeadSource::Floorplan, LeadSource::ShowGuide];

    /// Value written to the "Lead Source" column.
    pub fn label(self) -> &'static str {
        match self {
            Self::Floorplan => "B2B Website Floor Plan",
            Self::ShowGuide => "B2B Website Show Guide",
        }
    }

    /// Short name for logs and errors.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Floorplan => "Floor Plan",
            Self::ShowGuide => "Show Guide",
        }
    }
}

impl std::fmt::Display for LeadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Feed records
// ---------------------------------------------------------------------------

/// A submitted lead form. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FormEntry {
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "Company", default, deserialize_with = "lenient_string")]
    pub company: Option<String>,
    #[serde(rename = "Phone", default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    /// Show Guide requests carry the show in their subject line.
    #[serde(rename = "Your Subject", default, deserialize_with = "lenient_string")]
    pub your_subject: Option<String>,
}

/// One element of a feed's `data` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedItem {
    #[serde(rename = "Form_Entry", default, deserialize_with = "lenient_entry")]
    pub form_entry: FormEntry,
    /// Floor Plan requests name the expo here.
    #[serde(default, deserialize_with = "lenient_string")]
    pub expo_name: Option<String>,
}

/// Response body returned by both feed endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<FeedItem>>,
}

impl FeedEnvelope {
    /// Whether the endpoint reported `"status": "success"`.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// Consume the envelope, yielding its items (empty if `data` was absent).
    pub fn into_items(self) -> Vec<FeedItem> {
        self.data.unwrap_or_default()
    }
}

/// Accept strings, numbers and bools; treat everything else as absent.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// WordPress serializes an empty entry as `[]`; anything but an object is empty.
fn lenient_entry<'de, D>(deserializer: D) -> std::result::Result<FormEntry, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Object(_) => FormEntry::deserialize(value).map_err(D::Error::custom),
        _ => Ok(FormEntry::default()),
    }
}

// ---------------------------------------------------------------------------
// CandidateRow
// ---------------------------------------------------------------------------

/// Fields that vary per lead; everything else in a row is fixed.
#[derive(Debug, Clone, Default)]
pub struct RowFields {
    pub lead_date: String,
    pub lead_source: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub phone: String,
    pub email: String,
    pub show_name: String,
}

/// A lead row, positionally mapped onto the destination sheet's 20 columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateRow([String; ROW_WIDTH]);

impl CandidateRow {
    pub const LEAD_DATE: usize = 1;
    pub const LEAD_SOURCE: usize = 2;
    pub const FIRST_NAME: usize = 3;
    pub const LAST_NAME: usize = 4;
    pub const COMPANY: usize = 5;
    pub const PHONE: usize = 6;
    pub const EMAIL: usize = 7;
    pub const SHOW_NAME: usize = 8;
    pub const TAG: usize = 16;

    /// Lay out `fields` in column order; "Assigned To" and the trailing
    /// pipeline columns stay blank.
    pub fn new(fields: RowFields) -> Self {
        let mut cells: [String; ROW_WIDTH] = Default::default();
        cells[Self::LEAD_DATE] = fields.lead_date;
        cells[Self::LEAD_SOURCE] = fields.lead_source;
        cells[Self::FIRST_NAME] = fields.first_name;
        cells[Self::LAST_NAME] = fields.last_name;
        cells[Self::COMPANY] = fields.company;
        cells[Self::PHONE] = fields.phone;
        cells[Self::EMAIL] = fields.email;
        cells[Self::SHOW_NAME] = fields.show_name;
        cells[Self::TAG] = OPPORTUNITY_TAG.to_string();
        Self(cells)
    }

    pub fn email(&self) -> &str {
        &self.0[Self::EMAIL]
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_layout_is_fixed() {
        let row = CandidateRow::new(RowFields {
            lead_date: "19/10/2026".into(),
            lead_source: LeadSource::Floorplan.label().into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            company: "Engines Ltd".into(),
            phone: "5551234".into(),
            email: "ada@example.com".into(),
            show_name: "Austin Expo".into(),
        });

        let cells = row.cells();
        assert_eq!(cells.len(), ROW_WIDTH);
        assert_eq!(cells[0], "");
        assert_eq!(cells[1], "19/10/2026");
        assert_eq!(cells[2], "B2B Website Floor Plan");
        assert_eq!(cells[7], "ada@example.com");
        assert_eq!(cells[8], "Austin Expo");
        assert!(cells[9..16].iter().all(String::is_empty));
        assert_eq!(cells[16], "Exhibitors_opportunity");
        assert!(cells[17..].iter().all(String::is_empty));
    }

    #[test]
    fn row_serializes_as_flat_array() {
        let row = CandidateRow::new(RowFields::default());
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(ROW_WIDTH));
    }

    #[test]
    fn feed_item_tolerates_loose_payloads() {
        let item: FeedItem = serde_json::from_str(
            r#"{
                "Form_Entry": {"Name": "Jo", "Phone": 5551234, "Email": null},
                "expo_name": "Austin Floor Plan"
            }"#,
        )
        .unwrap();
        assert_eq!(item.form_entry.name.as_deref(), Some("Jo"));
        assert_eq!(item.form_entry.phone.as_deref(), Some("5551234"));
        assert_eq!(item.form_entry.email, None);
        assert_eq!(item.expo_name.as_deref(), Some("Austin Floor Plan"));

        let empty: FeedItem = serde_json::from_str(r#"{"Form_Entry": []}"#).unwrap();
        assert_eq!(empty.form_entry, FormEntry::default());

        let missing: FeedItem = serde_json::from_str("{}").unwrap();
        assert_eq!(missing, FeedItem::default());
    }

    #[test]
    fn envelope_status_check() {
        let env: FeedEnvelope =
            serde_json::from_str(r#"{"status": "success", "data": [{"Form_Entry": {}}]}"#)
                .unwrap();
        assert!(env.is_success());
        assert_eq!(env.into_items().len(), 1);

        let env: FeedEnvelope = serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert!(!env.is_success());
        assert!(env.into_items().is_empty());
    }
}
