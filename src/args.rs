//! These structs provide the CLI interface for the spendsheet CLI.

use crate::model::ChatRole;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// spendsheet: track your expenses in a Google Sheet you own.
///
/// The purpose of this program is to turn receipt photos and free-text
/// purchase descriptions into itemized rows in a Google Sheet, and to answer
/// natural-language questions about the accumulated history. Extraction and
/// Q&A use the OpenAI API; set OPENAI_API_KEY before running those commands.
///
/// You will need to set up Google Sheets API credentials for this. Download
/// the OAuth client file from Google Cloud Console and pass it to `init`,
/// and place a token.json with a refresh token in the data directory's
/// .secrets folder.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and format the spreadsheet.
    ///
    /// This is the first command to run. It creates the config, copies your
    /// OAuth credentials into place, makes sure the Transactions and Chat
    /// History tabs exist, and applies headers, column formats, borders and
    /// widths. Safe to re-run at any time; it never touches your data rows.
    Init(InitArgs),

    /// Extract line items from receipt images or a description and print
    /// them without writing to the sheet.
    Extract(ExtractArgs),

    /// Extract line items and append them to the sheet in one step.
    Scan(ExtractArgs),

    /// Append previously extracted line items from a JSON file.
    ///
    /// Use this after `extract` when you want to review items (or resolve a
    /// duplicate warning) before they are written.
    Append(AppendArgs),

    /// List the transactions recorded in the sheet.
    Transactions,

    /// Ask a question about your spending.
    Ask(AskArgs),

    /// Record a message in the chat history tab.
    Chat(ChatArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where spendsheet data and configuration is held.
    /// Defaults to ~/spendsheet
    #[arg(long, env = "SPENDSHEET_HOME", default_value_t = default_spend_home())]
    spend_home: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn spend_home(&self) -> &DisplayPath {
        &self.spend_home
    }
}

/// Args for the `spendsheet init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL of your Google Sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth API credentials. This file will be
    /// copied to the default secrets location in the data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// Args for the `extract` and `scan` commands.
#[derive(Debug, Parser, Clone)]
pub struct ExtractArgs {
    /// Path to a receipt image. Repeat for multiple images.
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// A free-text description of the purchase, e.g.
    /// "coffee and a bagel at Blue Bottle, $9.50".
    #[arg(long)]
    text: Option<String>,
}

impl ExtractArgs {
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Args for the `append` command.
#[derive(Debug, Parser, Clone)]
pub struct AppendArgs {
    /// Path to a JSON file holding the line items to append, in the format
    /// printed by `extract`.
    #[arg(long)]
    items: PathBuf,
}

impl AppendArgs {
    pub fn items(&self) -> &Path {
        &self.items
    }
}

/// Args for the `ask` command.
#[derive(Debug, Parser, Clone)]
pub struct AskArgs {
    /// The question to ask, e.g. "how much did I spend on groceries in
    /// March?"
    question: String,

    /// Do not record this question and its answer in the chat history.
    #[arg(long)]
    no_log: bool,
}

impl AskArgs {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn no_log(&self) -> bool {
        self.no_log
    }
}

/// Args for the `chat` command.
#[derive(Debug, Parser, Clone)]
pub struct ChatArgs {
    /// Who the message is from.
    #[arg(long, value_enum, default_value_t = ChatRole::User)]
    role: ChatRole,

    /// The message text.
    message: String,
}

impl ChatArgs {
    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A `PathBuf` wrapper that implements `Display` and `FromStr` so clap can
/// use it with `default_value_t`.
#[derive(Debug, Clone)]
pub struct DisplayPath(PathBuf);

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DisplayPath(PathBuf::from(s)))
    }
}

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

fn default_spend_home() -> DisplayPath {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spendsheet")
        .into()
}
