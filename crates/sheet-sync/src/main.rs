use clap::{Parser, Subcommand};
use sheet_sync::gmail::{GmailClient, MessageSource};
use sheet_sync::sheets::{RowSink, SheetsClient};
use sheet_sync::state::RunStateStore;
use sheet_sync::{auth, SyncConfig, SyncError, SyncResult, SyncRunner};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sheet-sync")]
#[command(about = "Copy unread Gmail messages into a Google Sheet")]
#[command(
    long_about = "Copies unread Gmail messages into a Google Sheet, one row per message \
    (From, Subject, Date, Body), then marks them read.\n\n\
    Configuration comes from GTS_* environment variables (a .env file is loaded first). \
    Already copied message ids are remembered in <credentials dir>/state.json so a rerun \
    never appends the same message twice."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one sync (the default)
    Run,

    /// Show the persisted run state without contacting Google
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheet_sync=info,shared_types=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run().await,
        Command::Status => status(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            e.exit_code()
        }
    }
}

async fn run() -> SyncResult<()> {
    let config = SyncConfig::from_env()?;

    let token = auth::access_token(&config).await?;
    let http = reqwest::Client::builder()
        .user_agent(concat!("sheet-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SyncError::transport("Building HTTP client", e))?;

    let store = RunStateStore::new(config.state_path(), config.max_processed_ids);
    let runner = SyncRunner::new(
        MessageSource::new(GmailClient::new(http.clone(), token.clone())),
        RowSink::new(SheetsClient::new(http, token)),
        store,
        config,
    );

    let summary = runner.run().await?;
    tracing::info!(
        "Done: {} listed, {} already processed, {} appended{}",
        summary.listed,
        summary.skipped,
        summary.appended,
        summary
            .spreadsheet_id
            .map(|id| format!(" to spreadsheet {}", id))
            .unwrap_or_default()
    );
    Ok(())
}

fn status() -> SyncResult<()> {
    let config = SyncConfig::from_env()?;
    let store = RunStateStore::new(config.state_path(), config.max_processed_ids);
    let state = store.load();

    println!("State file:     {}", store.path().display());
    match state.last_run {
        Some(at) => println!("Last run:       {}", at.to_rfc3339()),
        None => println!("Last run:       never"),
    }
    println!(
        "Processed ids:  {} (keeping at most {})",
        state.processed_ids.len(),
        config.max_processed_ids
    );
    Ok(())
}
