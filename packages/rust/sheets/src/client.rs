//! Sheets API v4 client bound to one worksheet.

use std::time::Duration;

use leadsync_shared::{AppConfig, CandidateRow, LeadSyncError, ROW_WIDTH, Result};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};
use url::Url;

use crate::LeadSheet;
use crate::a1::{column_letter, sheet_range};
use crate::auth::{Authenticator, ServiceAccountKey};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Default timeout in seconds for Sheets requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Row the inserted leads start at (1-based, directly below the header).
const FIRST_DATA_ROW: usize = 2;

/// How a spreadsheet is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetRef {
    Id(String),
    /// Looked up by title through Drive; the first match wins.
    Name(String),
}

/// Connection settings for [`GoogleSheet`].
#[derive(Debug, Clone)]
pub struct SheetsOptions {
    pub timeout_secs: u64,
    pub sheets_base: String,
    pub drive_files: String,
}

impl Default for SheetsOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sheets_base: SHEETS_BASE_URL.to_string(),
            drive_files: DRIVE_FILES_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

// ---------------------------------------------------------------------------
// GoogleSheet
// ---------------------------------------------------------------------------

/// A worksheet inside a Google spreadsheet.
pub struct GoogleSheet {
    http: Client,
    auth: Authenticator,
    spreadsheet_id: String,
    worksheet: String,
    sheets_base: Url,
}

impl GoogleSheet {
    /// Bind to `worksheet` in the referenced spreadsheet, resolving a name
    /// reference to an ID up front.
    #[instrument(skip_all)]
    pub async fn open(
        spreadsheet: SpreadsheetRef,
        worksheet: impl Into<String>,
        auth: Authenticator,
        opts: SheetsOptions,
    ) -> Result<Self> {
        let sheets_base = parse_base(&opts.sheets_base)?;
        let drive_files = parse_base(&opts.drive_files)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| LeadSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        let spreadsheet_id = match spreadsheet {
            SpreadsheetRef::Id(id) => id,
            SpreadsheetRef::Name(name) => {
                find_spreadsheet_by_name(&http, &auth, &drive_files, &name).await?
            }
        };

        info!(%spreadsheet_id, "connected to spreadsheet");

        Ok(Self {
            http,
            auth,
            spreadsheet_id,
            worksheet: worksheet.into(),
            sheets_base,
        })
    }

    /// Open the sheet described by the `[sheet]` config section.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let sheet = &config.sheet;

        let static_token = sheet
            .access_token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|token| !token.trim().is_empty());

        let auth = match static_token {
            Some(token) => Authenticator::static_token(token.trim()),
            None => Authenticator::service_account(ServiceAccountKey::from_file(
                &sheet.credentials_file,
            )?),
        };

        let spreadsheet = match &sheet.spreadsheet_id {
            Some(id) => SpreadsheetRef::Id(id.clone()),
            None => SpreadsheetRef::Name(sheet.spreadsheet_name.clone()),
        };

        let opts = SheetsOptions {
            timeout_secs: config.feeds.timeout_secs,
            ..SheetsOptions::default()
        };

        Self::open(spreadsheet, sheet.worksheet.clone(), auth, opts).await
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `<base>/<segment>/<segment>...`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.sheets_base.clone();
        url.path_segments_mut()
            .map_err(|_| LeadSyncError::config("Sheets base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<Value>>> {
        let url = self.endpoint(&[self.spreadsheet_id.as_str(), "values", range])?;
        let parsed: ValueRange = send_json(&self.http, &self.auth, self.http.get(url)).await?;
        Ok(parsed.values)
    }

    async fn worksheet_id(&self) -> Result<i64> {
        let mut url = self.endpoint(&[self.spreadsheet_id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");

        let meta: SpreadsheetMeta = send_json(&self.http, &self.auth, self.http.get(url)).await?;
        meta.sheets
            .into_iter()
            .find(|s| s.properties.title == self.worksheet)
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| {
                LeadSyncError::config(format!("worksheet '{}' not found", self.worksheet))
            })
    }
}

impl LeadSheet for GoogleSheet {
    #[instrument(skip_all)]
    async fn header_row(&self) -> Result<Vec<String>> {
        let rows = self.read_range(&sheet_range(&self.worksheet, "1:1")).await?;
        let header: Vec<String> = rows
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(cell_text)
            .collect();
        debug!(columns = header.len(), "read header row");
        Ok(header)
    }

    #[instrument(skip(self))]
    async fn column_values(&self, index: usize) -> Result<Vec<String>> {
        let letter = column_letter(index);
        let range = sheet_range(&self.worksheet, &format!("{letter}:{letter}"));
        let rows = self.read_range(&range).await?;

        let values: Vec<String> = rows
            .iter()
            .skip(1)
            .map(|row| row.first().map(cell_text).unwrap_or_default())
            .collect();
        debug!(rows = values.len(), column = %letter, "read column");
        Ok(values)
    }

    #[instrument(skip_all, fields(rows = rows.len()))]
    async fn insert_rows_below_header(&self, rows: &[CandidateRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let sheet_id = self.worksheet_id().await?;
        let start = FIRST_DATA_ROW - 1;

        let batch_segment = format!("{}:batchUpdate", self.spreadsheet_id);
        let batch_url = self.endpoint(&[batch_segment.as_str()])?;
        let insert = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + rows.len(),
                    },
                    "inheritFromBefore": false,
                }
            }]
        });
        let _: Value =
            send_json(&self.http, &self.auth, self.http.post(batch_url).json(&insert)).await?;

        let last_row = FIRST_DATA_ROW + rows.len() - 1;
        let range = sheet_range(
            &self.worksheet,
            &format!(
                "A{FIRST_DATA_ROW}:{}{last_row}",
                column_letter(ROW_WIDTH - 1)
            ),
        );
        let mut values_url =
            self.endpoint(&[self.spreadsheet_id.as_str(), "values", range.as_str()])?;
        values_url
            .query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        let body = json!({ "majorDimension": "ROWS", "values": rows });
        let _: Value =
            send_json(&self.http, &self.auth, self.http.put(values_url).json(&body)).await?;

        info!(rows = rows.len(), %range, "inserted rows");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Authorize, send, and decode a JSON response; non-2xx becomes a sheet error.
async fn send_json<T: DeserializeOwned>(
    http: &Client,
    auth: &Authenticator,
    request: RequestBuilder,
) -> Result<T> {
    let token = auth.access_token(http).await?;
    let response = request
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| LeadSyncError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LeadSyncError::Network(format!("failed to read body: {e}")))?;

    if !status.is_success() {
        return Err(LeadSyncError::Sheet(format!("HTTP {status}: {body}")));
    }

    serde_json::from_str(&body).map_err(|e| LeadSyncError::parse(format!("Sheets response: {e}")))
}

async fn find_spreadsheet_by_name(
    http: &Client,
    auth: &Authenticator,
    drive_files: &Url,
    name: &str,
) -> Result<String> {
    let query = format!(
        "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
        name.replace('\\', "\\\\").replace('\'', "\\'")
    );
    let mut url = drive_files.clone();
    url.query_pairs_mut()
        .append_pair("q", &query)
        .append_pair("fields", "files(id,name)")
        .append_pair("supportsAllDrives", "true")
        .append_pair("includeItemsFromAllDrives", "true");

    let list: DriveFileList = send_json(http, auth, http.get(url)).await?;
    list.files
        .into_iter()
        .next()
        .map(|f| f.id)
        .ok_or_else(|| LeadSyncError::config(format!("spreadsheet '{name}' not found")))
}

fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| LeadSyncError::config(format!("invalid API URL '{raw}': {e}")))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
