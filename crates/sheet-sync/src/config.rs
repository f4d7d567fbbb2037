use crate::error::{SyncError, SyncResult};
use shared_types::TRUNCATION_MARKER;
use std::path::PathBuf;

/// Value shipped in the setup docs; running with it means nobody edited the config
pub const UNEDITED_SPREADSHEET_ID: &str = "YOUR_SPREADSHEET_ID";

/// Values meaning "no spreadsheet yet, create one"
pub const PLACEHOLDER_SPREADSHEET_IDS: &[&str] = &["", UNEDITED_SPREADSHEET_ID, "123abcTEST"];

/// Upper bound on messages listed in a single run
pub const MAX_MESSAGES_PER_RUN: usize = 1000;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Target spreadsheet; `None` or a placeholder creates a new one
    pub spreadsheet_id: Option<String>,

    /// Tab rows are appended to
    pub sheet_name: String,

    /// Emit a progress notice every N parsed messages
    pub log_every: usize,

    /// Per-cell character limit for message bodies
    pub body_max_chars: usize,

    /// Gmail search query selecting candidate messages
    pub gmail_query: String,

    /// How many processed message ids the state file remembers
    pub max_processed_ids: usize,

    /// Holds credentials.json, token.json and state.json
    pub credentials_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: Some("123abcTEST".to_string()),
            sheet_name: "Sheet1".to_string(),
            log_every: 100,
            body_max_chars: 50_000, // Sheets per-cell limit
            gmail_query: "is:unread in:inbox".to_string(),
            max_processed_ids: 5000,
            credentials_dir: PathBuf::from("credentials"),
        }
    }
}

impl SyncConfig {
    /// Load configuration from `GTS_*` environment variables
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            spreadsheet_id: lookup("GTS_SPREADSHEET_ID").or(defaults.spreadsheet_id),
            sheet_name: lookup("GTS_SHEET_NAME").unwrap_or(defaults.sheet_name),
            log_every: parse_number(&lookup, "GTS_LOG_EVERY", defaults.log_every)?,
            body_max_chars: parse_number(&lookup, "GTS_BODY_MAX_CHARS", defaults.body_max_chars)?,
            gmail_query: lookup("GTS_GMAIL_QUERY").unwrap_or(defaults.gmail_query),
            max_processed_ids: parse_number(
                &lookup,
                "GTS_MAX_PROCESSED_IDS",
                defaults.max_processed_ids,
            )?,
            credentials_dir: lookup("GTS_CREDENTIALS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_dir),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that must be fixed before contacting any service
    pub fn validate(&self) -> SyncResult<()> {
        if self.spreadsheet_id.as_deref() == Some(UNEDITED_SPREADSHEET_ID) {
            return Err(SyncError::config(
                "Please set GTS_SPREADSHEET_ID before running",
            ));
        }

        let marker_len = TRUNCATION_MARKER.chars().count();
        if self.body_max_chars < marker_len {
            return Err(SyncError::config(format!(
                "GTS_BODY_MAX_CHARS must be at least {}",
                marker_len
            )));
        }

        if self.sheet_name.trim().is_empty() {
            return Err(SyncError::config("GTS_SHEET_NAME must not be empty"));
        }

        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.credentials_dir.join("state.json")
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.credentials_dir.join("credentials.json")
    }

    pub fn token_cache_path(&self) -> PathBuf {
        self.credentials_dir.join("token.json")
    }
}

fn parse_number<F>(lookup: &F, key: &str, default: usize) -> SyncResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SyncError::config(format!("{} must be a valid number, got {:?}", key, raw))),
        None => Ok(default),
    }
}
