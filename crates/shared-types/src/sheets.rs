//! Wire types for the Google Sheets REST API (v4).

use serde::{Deserialize, Serialize};

/// Title given to spreadsheets created on first run
pub const DEFAULT_SPREADSHEET_TITLE: &str = "Gmail To Sheets Log";

/// Spreadsheet resource, used both for `spreadsheets.get` responses and the
/// `spreadsheets.create` request/response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SpreadsheetProperties>,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Spreadsheet {
    /// Request body for a new spreadsheet with a single tab
    pub fn new_with_sheet(title: &str, sheet_name: &str) -> Self {
        Self {
            spreadsheet_id: None,
            properties: Some(SpreadsheetProperties {
                title: title.to_string(),
            }),
            sheets: vec![Sheet {
                properties: SheetProperties::titled(sheet_name),
            }],
        }
    }

    pub fn has_sheet(&self, title: &str) -> bool {
        self.sheets.iter().any(|s| s.properties.title == title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetProperties {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(default)]
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<i64>,
}

impl SheetProperties {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sheet_id: None,
        }
    }
}

/// `spreadsheets.batchUpdate` request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<UpdateRequest>,
}

impl BatchUpdateRequest {
    pub fn add_sheet(title: &str) -> Self {
        Self {
            requests: vec![UpdateRequest {
                add_sheet: Some(AddSheetRequest {
                    properties: SheetProperties::titled(title),
                }),
            }],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_sheet: Option<AddSheetRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSheetRequest {
    pub properties: SheetProperties,
}

/// `spreadsheets.values` payload for both reads and appends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    pub fn rows(values: Vec<Vec<String>>) -> Self {
        Self {
            range: None,
            major_dimension: None,
            values,
        }
    }
}
