use clap::Parser;
use spendsheet::args::{Args, Command};
use spendsheet::llm::{Completer, MockCompleter, OpenAiClient};
use spendsheet::model::{ChatEntry, LineItem};
use spendsheet::{api, commands, Config, Mode, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().spend_home().path();

    // This allows for testing the program without hitting the Google or
    // OpenAI APIs. When SPENDSHEET_IN_TEST_MODE is set and non-zero in
    // length, the mode will be Mode::Test, otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(
            home,
            init_args.client_secret(),
            init_args.sheet_url(),
            mode,
        )
        .await?
        .print(),

        Command::Extract(extract_args) => {
            let completer = completer(mode)?;
            commands::extract(
                completer.as_ref(),
                extract_args.images(),
                extract_args.text(),
            )
            .await?
            .print()
        }

        Command::Scan(scan_args) => {
            let config = Config::load(home).await?;
            let completer = completer(mode)?;
            let mut store = api::store(&config, mode).await?;
            commands::scan(
                store.as_mut(),
                completer.as_ref(),
                scan_args.images(),
                scan_args.text(),
            )
            .await?
            .print()
        }

        Command::Append(append_args) => {
            let config = Config::load(home).await?;
            let items = load_items(append_args.items()).await?;
            let mut store = api::store(&config, mode).await?;
            commands::append(store.as_mut(), items).await?.print()
        }

        Command::Transactions => {
            let config = Config::load(home).await?;
            let mut store = api::store(&config, mode).await?;
            commands::transactions(store.as_mut()).await?.print()
        }

        Command::Ask(ask_args) => {
            let config = Config::load(home).await?;
            let completer = completer(mode)?;
            let mut store = api::store(&config, mode).await?;
            commands::ask(
                store.as_mut(),
                completer.as_ref(),
                ask_args.question(),
                !ask_args.no_log(),
            )
            .await?
            .print()
        }

        Command::Chat(chat_args) => {
            let config = Config::load(home).await?;
            let mut store = api::store(&config, mode).await?;
            let entry = ChatEntry::now(chat_args.role(), chat_args.message());
            commands::chat_log(store.as_mut(), entry).await?.print()
        }
    };
    Ok(())
}

/// Creates the completion client for the given mode.
fn completer(mode: Mode) -> Result<Box<dyn Completer>> {
    match mode {
        Mode::Google => Ok(Box::new(OpenAiClient::from_env()?)),
        Mode::Test => Ok(Box::new(MockCompleter::seeded())),
    }
}

/// Loads line items from a JSON file produced by the `extract` command.
async fn load_items(path: &Path) -> Result<Vec<LineItem>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::Error::new(e).context("Failed to read the items file"))?;
    let items: Vec<LineItem> = serde_json::from_str(&content)
        .map_err(|e| anyhow::Error::new(e).context("The items file is not valid line-item JSON"))?;
    Ok(items)
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
