//! One sync run: list, filter, parse, append, mark read, save state.
//!
//! State is committed last. A failure before the append leaves everything as
//! it was; a failure after the append but before the state save means the
//! same messages are appended again on the next run. Duplicates are preferred
//! over silently dropping mail.

use crate::config::{SyncConfig, MAX_MESSAGES_PER_RUN};
use crate::error::SyncResult;
use crate::gmail::{MailTransport, MessageSource};
use crate::sheets::{RowSink, SheetTransport};
use crate::state::RunStateStore;
use shared_types::{Row, HEADER_ROW};
use std::collections::HashSet;

/// What a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ids returned by the listing
    pub listed: usize,
    /// Ids dropped because they were already processed
    pub skipped: usize,
    /// Rows appended and messages marked read
    pub appended: usize,
    /// Spreadsheet written to, if any rows were appended
    pub spreadsheet_id: Option<String>,
}

pub struct SyncRunner<M, S> {
    source: MessageSource<M>,
    sink: RowSink<S>,
    store: RunStateStore,
    config: SyncConfig,
}

impl<M: MailTransport, S: SheetTransport> SyncRunner<M, S> {
    pub fn new(
        source: MessageSource<M>,
        sink: RowSink<S>,
        store: RunStateStore,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            config,
        }
    }

    pub fn source(&self) -> &MessageSource<M> {
        &self.source
    }

    pub fn sink(&self) -> &RowSink<S> {
        &self.sink
    }

    pub async fn run(&self) -> SyncResult<RunSummary> {
        let mut state = self.store.load();
        let mut seen: HashSet<String> = state.processed_ids.iter().cloned().collect();

        tracing::info!("Fetching unread messages from Gmail...");
        let ids = self
            .source
            .list_candidates(&self.config.gmail_query, MAX_MESSAGES_PER_RUN)
            .await?;
        tracing::info!("Found {} unread messages", ids.len());

        // Inserting as we go also drops ids repeated within this listing
        let pending: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.to_string()))
            .cloned()
            .collect();

        let mut summary = RunSummary {
            listed: ids.len(),
            skipped: ids.len() - pending.len(),
            ..Default::default()
        };
        if summary.skipped > 0 {
            tracing::debug!("Skipping {} already processed messages", summary.skipped);
        }

        let log_every = self.config.log_every.max(1);
        let mut new_rows = Vec::with_capacity(pending.len());
        let mut to_mark = Vec::with_capacity(pending.len());

        for (idx, id) in pending.iter().enumerate() {
            let message = self.source.fetch_details(id).await?;
            new_rows.push(Row::from_message(&message, self.config.body_max_chars));
            to_mark.push(id.clone());

            if (idx + 1) % log_every == 0 {
                tracing::info!("Parsed {}/{} messages...", idx + 1, pending.len());
            }
        }

        if new_rows.is_empty() {
            tracing::info!("No new unread messages to append");
            return Ok(summary);
        }

        let target = self
            .sink
            .ensure_destination(self.config.spreadsheet_id.as_deref(), &self.config.sheet_name)
            .await?;
        self.sink.ensure_header(&HEADER_ROW, &target).await?;

        let count = new_rows.len();
        tracing::info!("Appending {} rows to Google Sheets...", count);
        self.sink.append(new_rows, &target).await?;

        tracing::info!("Marking {} emails as read in Gmail...", to_mark.len());
        if let Err(e) = self.source.mark_consumed(&to_mark).await {
            tracing::error!(
                "{} rows were appended but their messages were not marked read; \
                 they will be appended again on the next run",
                count
            );
            return Err(e);
        }

        state.processed_ids.extend(to_mark);
        self.store.save(&mut state)?;

        summary.appended = count;
        summary.spreadsheet_id = Some(target.spreadsheet_id);
        Ok(summary)
    }
}
