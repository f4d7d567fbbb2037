//! Google Sheets side of the sync: making sure the spreadsheet, tab and
//! header row exist, and appending rows.

use crate::config::PLACEHOLDER_SPREADSHEET_IDS;
use crate::error::{SyncError, SyncResult};
use anyhow::{Context, Result};
use shared_types::sheets::{BatchUpdateRequest, Spreadsheet, ValueRange, DEFAULT_SPREADSHEET_TITLE};
use shared_types::{Row, SheetTarget};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Raw Sheets API operations used by the sync.
#[allow(async_fn_in_trait)]
pub trait SheetTransport {
    /// `spreadsheets.get`
    async fn get_metadata(&self, spreadsheet_id: &str) -> Result<Spreadsheet>;

    /// `spreadsheets.create`; the response carries the new id
    async fn create_spreadsheet(&self, request: &Spreadsheet) -> Result<Spreadsheet>;

    /// `spreadsheets.batchUpdate`
    async fn batch_update(&self, spreadsheet_id: &str, request: &BatchUpdateRequest) -> Result<()>;

    /// `spreadsheets.values.get`
    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange>;

    /// `spreadsheets.values.append` with RAW input and INSERT_ROWS
    async fn append_values(&self, spreadsheet_id: &str, range: &str, values: &ValueRange)
        -> Result<()>;
}

/// REST client for the Sheets API
pub struct SheetsClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            base_url: SHEETS_API_BASE.to_string(),
        }
    }

    /// Point the client at another host, e.g. a local mock server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v4/spreadsheets{}", self.base_url, path)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str, suffix: &str) -> String {
        self.url(&format!(
            "/{}/values/{}{}",
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range),
            suffix
        ))
    }
}

impl SheetTransport for SheetsClient {
    async fn get_metadata(&self, spreadsheet_id: &str) -> Result<Spreadsheet> {
        self.http
            .get(self.url(&format!("/{}", urlencoding::encode(spreadsheet_id))))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "spreadsheetId,properties.title,sheets.properties")])
            .send()
            .await
            .context("Failed to send metadata request")?
            .error_for_status()
            .context("Sheets API rejected metadata request")?
            .json()
            .await
            .context("Failed to parse spreadsheet metadata")
    }

    async fn create_spreadsheet(&self, request: &Spreadsheet) -> Result<Spreadsheet> {
        self.http
            .post(self.url(""))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "spreadsheetId")])
            .json(request)
            .send()
            .await
            .context("Failed to send create request")?
            .error_for_status()
            .context("Sheets API rejected create request")?
            .json()
            .await
            .context("Failed to parse created spreadsheet")
    }

    async fn batch_update(&self, spreadsheet_id: &str, request: &BatchUpdateRequest) -> Result<()> {
        self.http
            .post(self.url(&format!("/{}:batchUpdate", urlencoding::encode(spreadsheet_id))))
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .context("Failed to send batchUpdate request")?
            .error_for_status()
            .context("Sheets API rejected batchUpdate request")?;

        Ok(())
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
        self.http
            .get(self.values_url(spreadsheet_id, range, ""))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to send values request")?
            .error_for_status()
            .context("Sheets API rejected values request")?
            .json()
            .await
            .context("Failed to parse values")
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &ValueRange,
    ) -> Result<()> {
        self.http
            .post(self.values_url(spreadsheet_id, range, ":append"))
            .bearer_auth(&self.access_token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(values)
            .send()
            .await
            .context("Failed to send append request")?
            .error_for_status()
            .context("Sheets API rejected append request")?;

        Ok(())
    }
}

/// Row Sink: destination bootstrap, header row and appends.
pub struct RowSink<T> {
    transport: T,
}

impl<T: SheetTransport> RowSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve the spreadsheet to write to, creating it (or the tab) as
    /// needed. An unreadable configured spreadsheet is replaced by a new one.
    pub async fn ensure_destination(
        &self,
        configured_id: Option<&str>,
        sheet_name: &str,
    ) -> SyncResult<SheetTarget> {
        if let Some(id) = configured_id.filter(|id| !is_placeholder(id)) {
            match self.confirm_sheet(id, sheet_name).await {
                Ok(()) => return Ok(SheetTarget::new(id, sheet_name)),
                Err(e) => {
                    tracing::warn!(
                        "Spreadsheet {} is unusable ({:#}), creating a new one",
                        id,
                        e
                    );
                }
            }
        }

        let request = Spreadsheet::new_with_sheet(DEFAULT_SPREADSHEET_TITLE, sheet_name);
        let created = self
            .transport
            .create_spreadsheet(&request)
            .await
            .map_err(|e| SyncError::transport("Creating spreadsheet", e))?;

        let new_id = created
            .spreadsheet_id
            .filter(|id| !is_placeholder(id))
            .ok_or_else(|| {
                SyncError::transport(
                    "Creating spreadsheet",
                    anyhow::anyhow!("response did not include a spreadsheet id"),
                )
            })?;

        tracing::info!(
            "Created new spreadsheet with ID: {}. Set GTS_SPREADSHEET_ID to reuse it.",
            new_id
        );
        Ok(SheetTarget::new(new_id, sheet_name))
    }

    async fn confirm_sheet(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<()> {
        let metadata = self.transport.get_metadata(spreadsheet_id).await?;
        if !metadata.has_sheet(sheet_name) {
            tracing::info!("Adding missing tab '{}' to {}", sheet_name, spreadsheet_id);
            self.transport
                .batch_update(spreadsheet_id, &BatchUpdateRequest::add_sheet(sheet_name))
                .await
                .with_context(|| format!("Failed adding sheet '{}'", sheet_name))?;
        }
        Ok(())
    }

    /// Write `headers` as the first row if the tab's first row is empty.
    /// Never overwrites existing content.
    pub async fn ensure_header(&self, headers: &[&str], target: &SheetTarget) -> SyncResult<()> {
        let first = self
            .transport
            .get_values(&target.spreadsheet_id, &target.header_range())
            .await
            .map_err(|e| SyncError::transport("Reading header row", e))?;

        if first.values.first().is_some_and(|row| !row.is_empty()) {
            return Ok(());
        }

        let header = headers.iter().map(|h| h.to_string()).collect();
        self.append_cells(vec![header], target).await
    }

    /// Append rows after the last row of the tab's A:D range
    pub async fn append(&self, rows: Vec<Row>, target: &SheetTarget) -> SyncResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.append_cells(rows.into_iter().map(Row::into_cells).collect(), target)
            .await
    }

    async fn append_cells(&self, cells: Vec<Vec<String>>, target: &SheetTarget) -> SyncResult<()> {
        let count = cells.len();
        self.transport
            .append_values(
                &target.spreadsheet_id,
                &target.data_range(),
                &ValueRange::rows(cells),
            )
            .await
            .map_err(|e| {
                SyncError::transport(
                    format!("Appending {} rows to {}", count, target.spreadsheet_id),
                    e,
                )
            })
    }
}

pub fn is_placeholder(spreadsheet_id: &str) -> bool {
    PLACEHOLDER_SPREADSHEET_IDS.contains(&spreadsheet_id.trim())
}
