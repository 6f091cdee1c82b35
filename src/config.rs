//! Configuration file handling for spendsheet.
//!
//! The configuration file is stored at `$SPENDSHEET_HOME/config.json` and
//! contains the Google Sheet URL plus the authentication file paths. The
//! spreadsheet id is extracted from the URL at create/load time so that a
//! bad URL fails up front as an input error, not mid-operation.

use crate::api::resolve_spreadsheet_id;
use crate::error::{Error, Result};
use crate::utils;
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "spendsheet";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";

/// The `Config` object represents the configuration of the app. You
/// instantiate it by providing the path to `$SPENDSHEET_HOME` and from there
/// it loads `$SPENDSHEET_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
}

impl Config {
    /// Creates the data directory and its subdirectories:
    /// - Writes an initial `config.json` using `sheet_url`.
    /// - Copies `secret_file` into its default location in the data dir.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory,
    ///   e.g. `$HOME/spendsheet`.
    /// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON.
    /// - `sheet_url` - The URL of the Google Sheet where expense data lives.
    ///
    /// # Errors
    /// - `Error::InvalidSheetUrl` when the URL is not a Google Sheets URL.
    /// - File operation failures.
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        sheet_url: &str,
    ) -> Result<Self> {
        // Reject a bad URL before touching the filesystem.
        let spreadsheet_id =
            resolve_spreadsheet_id(sheet_url).ok_or(Error::InvalidSheetUrl)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the spendsheet home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        // Copy the OAuth client credentials to the default location.
        let secret_destination = secrets_dir.join(CLIENT_SECRET_JSON);
        tokio::fs::copy(secret_file, &secret_destination)
            .await
            .with_context(|| {
                format!(
                    "Unable to copy credentials from '{}' to '{}'",
                    secret_file.display(),
                    secret_destination.display()
                )
            })?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: sheet_url.to_string(),
            client_secret_path: None,
            token_path: None,
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    /// Validates that `spend_home` and its config file exist, loads the
    /// config, and returns the configuration object.
    pub async fn load(spend_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = spend_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Spendsheet home is missing; run 'spendsheet init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            return Err(anyhow!(
                "The config file is missing '{}'",
                config_path.display()
            )
            .into());
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let spreadsheet_id =
            resolve_spreadsheet_id(&config_file.sheet_url).ok_or(Error::InvalidSheetUrl)?;

        Ok(Self {
            secrets: root.join(SECRETS),
            config_path,
            config_file,
            spreadsheet_id,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise
    /// resolves it relative to the data directory.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves
    /// it relative to the data directory.
    pub fn token_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.token_path())
    }

    fn resolve_secrets_file_path(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "spendsheet",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "spendsheet".
    app_name: String,

    /// Configuration file version.
    config_version: u8,

    /// URL to the Google Sheet.
    sheet_url: String,

    /// Path to the OAuth 2.0 client credentials file (optional, relative to
    /// config.json or absolute).
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Path to the OAuth token file (optional, relative to config.json or
    /// absolute).
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        if config.app_name != APP_NAME {
            bail!(
                "Invalid app_name in config file: expected '{}', got '{}'",
                APP_NAME,
                config.app_name
            );
        }
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}
