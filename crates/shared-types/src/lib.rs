use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub mod gmail;
pub mod sheets;

/// Header row written to an empty tab
pub const HEADER_ROW: [&str; 4] = ["From", "Subject", "Date", "Body"];

/// Suffix appended to bodies cut down to the per-cell limit
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// A single email as fetched from the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub from: String,
    pub subject: String,
    /// Date header exactly as received
    pub date: String,
    pub body: String,
    /// Milliseconds since epoch, as the mail service reports it
    pub internal_date: String,
}

/// One spreadsheet row: From, Subject, Date, Body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub from: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

impl Row {
    /// Build a row from a message, normalizing line endings and cutting the
    /// body down to `max_body_chars`.
    pub fn from_message(message: &Message, max_body_chars: usize) -> Self {
        let body = message.body.replace("\r\n", "\n");
        Self {
            from: message.from.clone(),
            subject: message.subject.clone(),
            date: message.date.clone(),
            body: truncate_body(&body, max_body_chars),
        }
    }

    pub fn into_cells(self) -> Vec<String> {
        vec![self.from, self.subject, self.date, self.body]
    }
}

/// Cut `body` so the result is at most `limit` characters, ending in
/// [`TRUNCATION_MARKER`] when anything was removed.
pub fn truncate_body(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }

    let keep = limit.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut out: String = body.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Persisted between runs so the same message is never appended twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Oldest first
    #[serde(default)]
    pub processed_ids: Vec<String>,
    /// An unreadable timestamp loads as `None` without discarding the ids
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_run: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match serde_json::from_value(v) {
        Ok(at) => Some(at),
        Err(e) => {
            tracing::warn!("Ignoring unreadable last_run timestamp: {}", e);
            None
        }
    }))
}

impl RunState {
    /// Drop the oldest identifiers so at most `max` remain.
    pub fn trim_to(&mut self, max: usize) {
        if self.processed_ids.len() > max {
            let excess = self.processed_ids.len() - max;
            self.processed_ids.drain(..excess);
            tracing::debug!("Trimmed {} processed ids from run state", excess);
        }
    }
}

/// Spreadsheet and tab that rows are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetTarget {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// A1 range covering the four data columns, e.g. `'Sheet1'!A:D`
    pub fn data_range(&self) -> String {
        format!("{}!A:D", quote_sheet_name(&self.sheet_name))
    }

    /// A1 range of the header row, e.g. `'Sheet1'!A1:D1`
    pub fn header_range(&self) -> String {
        format!("{}!A1:D1", quote_sheet_name(&self.sheet_name))
    }
}

fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}
