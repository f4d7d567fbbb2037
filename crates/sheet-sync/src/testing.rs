//! In-memory Gmail and Sheets transports for tests.

use crate::gmail::MailTransport;
use crate::sheets::SheetTransport;
use anyhow::{anyhow, bail, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use shared_types::gmail::{
    BatchModifyRequest, GmailMessage, Header, ListMessagesResponse, MessagePart, MessagePartBody,
    MessageRef, UNREAD_LABEL,
};
use shared_types::sheets::{BatchUpdateRequest, Sheet, SheetProperties, Spreadsheet, ValueRange};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// A plain-text message with the usual headers
pub fn gmail_message(id: &str, from: &str, subject: &str, body: &str) -> GmailMessage {
    let header = |name: &str, value: &str| Header {
        name: name.to_string(),
        value: value.to_string(),
    };

    GmailMessage {
        id: id.to_string(),
        payload: MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            headers: vec![
                header("From", from),
                header("Subject", subject),
                header("Date", "Mon, 6 Jan 2025 10:00:00 +0000"),
            ],
            body: None,
            parts: vec![MessagePart {
                mime_type: Some("text/plain".to_string()),
                body: Some(MessagePartBody {
                    data: Some(URL_SAFE_NO_PAD.encode(body)),
                    size: Some(body.len() as u64),
                }),
                ..Default::default()
            }],
        },
        internal_date: Some("1736157600000".to_string()),
        label_ids: vec![UNREAD_LABEL.to_string(), "INBOX".to_string()],
    }
}

#[derive(Default)]
struct MailboxState {
    order: Vec<String>,
    messages: HashMap<String, GmailMessage>,
    unread: HashSet<String>,
    listing_override: Option<Vec<String>>,
    list_calls: usize,
    page_sizes: Vec<usize>,
    fail_list_after: Option<usize>,
    fail_get: HashSet<String>,
    fail_batch: bool,
    fetched: Vec<String>,
    batch_requests: Vec<BatchModifyRequest>,
}

/// Mailbox whose listing returns unread messages in insertion order, paged
/// with numeric offset tokens.
#[derive(Default)]
pub struct FakeMailbox {
    state: Mutex<MailboxState>,
}

impl FakeMailbox {
    pub fn with_unread<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mailbox = Self::default();
        for id in ids {
            let subject = format!("Subject {}", id);
            let body = format!("Body of {}", id);
            mailbox.insert(gmail_message(&id, "sender@example.com", &subject, &body));
        }
        mailbox
    }

    pub fn insert(&self, message: GmailMessage) {
        let mut state = self.state.lock().unwrap();
        state.order.push(message.id.clone());
        state.unread.insert(message.id.clone());
        state.messages.insert(message.id.clone(), message);
    }

    /// Return exactly these ids from the listing, duplicates included
    pub fn set_listing(&self, ids: &[&str]) {
        self.state.lock().unwrap().listing_override =
            Some(ids.iter().map(|s| s.to_string()).collect());
    }

    pub fn fail_list_after(&self, successful_calls: usize) {
        self.state.lock().unwrap().fail_list_after = Some(successful_calls);
    }

    pub fn fail_get(&self, id: &str) {
        self.state.lock().unwrap().fail_get.insert(id.to_string());
    }

    pub fn fail_batch(&self, fail: bool) {
        self.state.lock().unwrap().fail_batch = fail;
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.state.lock().unwrap().unread.contains(id)
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn requested_page_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().page_sizes.clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().unwrap().fetched.clone()
    }

    pub fn batch_requests(&self) -> Vec<BatchModifyRequest> {
        self.state.lock().unwrap().batch_requests.clone()
    }
}

impl MailTransport for FakeMailbox {
    async fn list_page(
        &self,
        _query: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<ListMessagesResponse> {
        let mut state = self.state.lock().unwrap();
        if state
            .fail_list_after
            .is_some_and(|limit| state.list_calls >= limit)
        {
            bail!("listing unavailable");
        }
        state.list_calls += 1;
        state.page_sizes.push(page_size);

        let listing: Vec<String> = match &state.listing_override {
            Some(ids) => ids.clone(),
            None => state
                .order
                .iter()
                .filter(|id| state.unread.contains(*id))
                .cloned()
                .collect(),
        };

        let offset: usize = match page_token {
            Some(token) => token.parse()?,
            None => 0,
        };
        let end = (offset + page_size).min(listing.len());
        let messages = listing[offset.min(end)..end]
            .iter()
            .map(|id| MessageRef {
                id: id.clone(),
                thread_id: None,
            })
            .collect();

        Ok(ListMessagesResponse {
            messages,
            next_page_token: (end < listing.len()).then(|| end.to_string()),
            result_size_estimate: Some(listing.len() as u32),
        })
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_get.contains(id) {
            bail!("backend error fetching {}", id);
        }
        state.fetched.push(id.to_string());
        state
            .messages
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found"))
    }

    async fn batch_modify(&self, request: &BatchModifyRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_batch {
            bail!("batchModify unavailable");
        }
        state.batch_requests.push(request.clone());
        if request.remove_label_ids.iter().any(|l| l == UNREAD_LABEL) {
            for id in &request.ids {
                state.unread.remove(id);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct SpreadsheetState {
    /// spreadsheet id -> tab title -> rows
    books: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
    created: usize,
    append_calls: usize,
    fail_create: bool,
    fail_append: bool,
}

/// Spreadsheets kept in memory; tabs are plain row vectors.
#[derive(Default)]
pub struct FakeSpreadsheets {
    state: Mutex<SpreadsheetState>,
}

impl FakeSpreadsheets {
    pub fn add_spreadsheet(&self, id: &str, tabs: &[&str]) {
        let tabs = tabs.iter().map(|t| (t.to_string(), Vec::new())).collect();
        self.state.lock().unwrap().books.insert(id.to_string(), tabs);
    }

    pub fn push_row(&self, id: &str, tab: &str, row: Vec<String>) {
        let mut state = self.state.lock().unwrap();
        state
            .books
            .entry(id.to_string())
            .or_default()
            .entry(tab.to_string())
            .or_default()
            .push(row);
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn fail_append(&self) {
        self.state.lock().unwrap().fail_append = true;
    }

    pub fn has_tab(&self, id: &str, tab: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .books
            .get(id)
            .is_some_and(|tabs| tabs.contains_key(tab))
    }

    pub fn rows(&self, id: &str, tab: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .books
            .get(id)
            .and_then(|tabs| tabs.get(tab))
            .cloned()
            .unwrap_or_default()
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn append_calls(&self) -> usize {
        self.state.lock().unwrap().append_calls
    }
}

/// `'Tab''s name'!A:D` -> `Tab's name`
fn tab_from_range(range: &str) -> String {
    let name = range.rsplit_once('!').map_or(range, |(name, _)| name);
    name.strip_prefix('\'')
        .and_then(|n| n.strip_suffix('\''))
        .unwrap_or(name)
        .replace("''", "'")
}

impl SheetTransport for FakeSpreadsheets {
    async fn get_metadata(&self, spreadsheet_id: &str) -> Result<Spreadsheet> {
        let state = self.state.lock().unwrap();
        let tabs = state
            .books
            .get(spreadsheet_id)
            .ok_or_else(|| anyhow!("404 Requested entity was not found"))?;

        Ok(Spreadsheet {
            spreadsheet_id: Some(spreadsheet_id.to_string()),
            properties: None,
            sheets: tabs
                .keys()
                .map(|title| Sheet {
                    properties: SheetProperties::titled(title),
                })
                .collect(),
        })
    }

    async fn create_spreadsheet(&self, request: &Spreadsheet) -> Result<Spreadsheet> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            bail!("create unavailable");
        }
        state.created += 1;
        let id = format!("created-{}", state.created);
        let tabs = request
            .sheets
            .iter()
            .map(|s| (s.properties.title.clone(), Vec::new()))
            .collect();
        state.books.insert(id.clone(), tabs);

        Ok(Spreadsheet {
            spreadsheet_id: Some(id),
            ..Default::default()
        })
    }

    async fn batch_update(&self, spreadsheet_id: &str, request: &BatchUpdateRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let tabs = state
            .books
            .get_mut(spreadsheet_id)
            .ok_or_else(|| anyhow!("404 Requested entity was not found"))?;
        for add in request.requests.iter().filter_map(|r| r.add_sheet.as_ref()) {
            tabs.entry(add.properties.title.clone()).or_default();
        }
        Ok(())
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
        let state = self.state.lock().unwrap();
        let tab = tab_from_range(range);
        let rows = state
            .books
            .get(spreadsheet_id)
            .and_then(|tabs| tabs.get(&tab))
            .ok_or_else(|| anyhow!("Unable to parse range: {}", range))?;

        Ok(ValueRange {
            range: Some(range.to_string()),
            major_dimension: Some("ROWS".to_string()),
            values: rows.first().cloned().into_iter().collect(),
        })
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &ValueRange,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_append {
            bail!("append unavailable");
        }
        state.append_calls += 1;
        let tab = tab_from_range(range);
        let rows = state
            .books
            .get_mut(spreadsheet_id)
            .and_then(|tabs| tabs.get_mut(&tab))
            .ok_or_else(|| anyhow!("Unable to parse range: {}", range))?;
        rows.extend(values.values.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_from_range() {
        assert_eq!(tab_from_range("'Sheet1'!A:D"), "Sheet1");
        assert_eq!(tab_from_range("'Bob''s'!A1:D1"), "Bob's");
        assert_eq!(tab_from_range("Plain!A:D"), "Plain");
    }
}
