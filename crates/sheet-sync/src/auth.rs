//! OAuth access for the Gmail and Sheets APIs.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use anyhow::Context;

/// Gmail read + mark-as-read, and Sheets read/write
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/spreadsheets",
];

/// Obtain a bearer token for [`SCOPES`].
///
/// Runs the installed-app flow on first use and caches the refresh token in
/// the credentials directory afterwards.
pub async fn access_token(config: &SyncConfig) -> SyncResult<String> {
    let secret_path = config.client_secret_path();
    if !secret_path.exists() {
        return Err(SyncError::config(format!(
            "Missing OAuth client secrets at {}",
            secret_path.display()
        )));
    }

    let secret = yup_oauth2::read_application_secret(&secret_path)
        .await
        .map_err(|e| {
            SyncError::config(format!(
                "Failed to read OAuth client secrets {}: {}",
                secret_path.display(),
                e
            ))
        })?;

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(config.token_cache_path())
    .build()
    .await
    .context("Failed to build authenticator")
    .map_err(|e| SyncError::transport("Authenticating with Google", e))?;

    let token = auth
        .token(SCOPES)
        .await
        .context("Failed to obtain access token")
        .map_err(|e| SyncError::transport("Authenticating with Google", e))?;

    token
        .token()
        .map(str::to_string)
        .ok_or_else(|| {
            SyncError::transport(
                "Authenticating with Google",
                anyhow::anyhow!("token response had no access token"),
            )
        })
}
