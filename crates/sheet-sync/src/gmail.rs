//! Gmail side of the sync: listing unread messages, fetching and parsing
//! them, and marking them read.

use crate::body::{decode_header_value, extract_body_text};
use crate::error::{SyncError, SyncResult};
use anyhow::{Context, Result};
use shared_types::gmail::{
    BatchModifyRequest, GmailMessage, Header, ListMessagesResponse, UNREAD_LABEL,
};
use shared_types::Message;

/// Maximum page size accepted by `users.messages.list`
pub const LIST_PAGE_SIZE: usize = 100;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Raw Gmail API operations used by the sync.
#[allow(async_fn_in_trait)]
pub trait MailTransport {
    /// One page of `users.messages.list`
    async fn list_page(
        &self,
        query: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<ListMessagesResponse>;

    /// `users.messages.get` with `format=full`
    async fn get_message(&self, id: &str) -> Result<GmailMessage>;

    /// `users.messages.batchModify`
    async fn batch_modify(&self, request: &BatchModifyRequest) -> Result<()>;
}

/// REST client for the Gmail API
pub struct GmailClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            base_url: GMAIL_API_BASE.to_string(),
        }
    }

    /// Point the client at another host, e.g. a local mock server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me/{}", self.base_url, path)
    }
}

impl MailTransport for GmailClient {
    async fn list_page(
        &self,
        query: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<ListMessagesResponse> {
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", page_size.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        self.http
            .get(self.url("messages"))
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await
            .context("Failed to send list request")?
            .error_for_status()
            .context("Gmail API rejected list request")?
            .json()
            .await
            .context("Failed to parse list response")
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let path = format!("messages/{}", urlencoding::encode(id));

        self.http
            .get(self.url(&path))
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .send()
            .await
            .context("Failed to send get request")?
            .error_for_status()
            .context("Gmail API rejected get request")?
            .json()
            .await
            .context("Failed to parse message")
    }

    async fn batch_modify(&self, request: &BatchModifyRequest) -> Result<()> {
        self.http
            .post(self.url("messages/batchModify"))
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .context("Failed to send batchModify request")?
            .error_for_status()
            .context("Gmail API rejected batchModify request")?;

        Ok(())
    }
}

/// Message Source: candidate listing, per-message details and mark-read.
pub struct MessageSource<T> {
    transport: T,
}

impl<T: MailTransport> MessageSource<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// List up to `max_results` message ids matching `query`, in the order
    /// Gmail returns them. Any failing page aborts the whole listing.
    pub async fn list_candidates(&self, query: &str, max_results: usize) -> SyncResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .transport
                .list_page(
                    query,
                    page_token.as_deref(),
                    LIST_PAGE_SIZE.min(max_results),
                )
                .await
                .map_err(|e| SyncError::transport("Listing Gmail messages", e))?;

            ids.extend(page.messages.into_iter().map(|m| m.id));
            tracing::debug!("Listed {} message ids so far", ids.len());

            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() || ids.len() >= max_results {
                break;
            }
        }

        ids.truncate(max_results);
        Ok(ids)
    }

    /// Fetch one message and parse its headers and body
    pub async fn fetch_details(&self, id: &str) -> SyncResult<Message> {
        let message = self
            .transport
            .get_message(id)
            .await
            .map_err(|e| SyncError::transport(format!("Fetching message {}", id), e))?;

        Ok(parse_message(id, &message))
    }

    /// Remove the UNREAD label from all `ids` in one request
    pub async fn mark_consumed(&self, ids: &[String]) -> SyncResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let request = BatchModifyRequest {
            ids: ids.to_vec(),
            add_label_ids: Vec::new(),
            remove_label_ids: vec![UNREAD_LABEL.to_string()],
        };

        self.transport
            .batch_modify(&request)
            .await
            .map_err(|e| SyncError::transport(format!("Marking {} messages read", ids.len()), e))
    }
}

fn parse_message(id: &str, message: &GmailMessage) -> Message {
    let headers = HeaderFields::from_headers(&message.payload.headers);

    Message {
        id: id.to_string(),
        from: headers.from,
        subject: headers.subject,
        date: headers.date,
        body: extract_body_text(&message.payload),
        internal_date: message.internal_date.clone().unwrap_or_default(),
    }
}

/// The headers copied into the sheet, decoded
#[derive(Debug, Default, PartialEq, Eq)]
struct HeaderFields {
    from: String,
    subject: String,
    date: String,
}

impl HeaderFields {
    fn from_headers(headers: &[Header]) -> Self {
        let mut fields = Self::default();

        // A repeated header overwrites the earlier value
        for header in headers {
            let slot = match header.name.to_ascii_lowercase().as_str() {
                "from" => &mut fields.from,
                "subject" => &mut fields.subject,
                "date" => &mut fields.date,
                _ => continue,
            };
            *slot = decode_header_value(&header.value);
        }

        fields
    }
}
