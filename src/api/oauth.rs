//! OAuth 2.0 token handling for the Google Sheets API.
//!
//! This module loads the OAuth client credentials (`client_secret.json`) and
//! the stored grant (`token.json`), and silently refreshes the access token
//! when it is expired or about to expire. Obtaining the initial grant (the
//! browser consent flow) happens outside this program; all we need here is a
//! refresh token.

use crate::utils;
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Refresh when the token expires within this window.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// The `client_secret.json` file downloaded from Google Cloud Console.
/// Desktop-application credentials come wrapped in an `installed` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClientSecretFile {
    installed: ClientSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    token_uri: String,
}

/// The stored grant: an access token plus the refresh token that renews it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    access_token: String,
    refresh_token: String,
    expiry: DateTime<Utc>,
}

/// The response body of a refresh-grant request to the token endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Holds the OAuth credentials and keeps the access token fresh.
pub(crate) struct TokenProvider {
    secret: ClientSecret,
    token: TokenFile,
    token_path: PathBuf,
    http: reqwest::Client,
}

impl TokenProvider {
    /// Loads credentials from `client_secret.json` and the stored grant from
    /// `token.json`.
    ///
    /// # Errors
    /// Fails when either file is missing or unparseable, or when the stored
    /// grant has no refresh token.
    pub(crate) async fn load(
        client_secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> anyhow::Result<Self> {
        let client_secret_path = client_secret_path.into();
        let token_path = token_path.into();
        let secret_file: ClientSecretFile = utils::deserialize(&client_secret_path)
            .await
            .context("Unable to load the OAuth client credentials")?;
        let token: TokenFile = utils::deserialize(&token_path)
            .await
            .context("Unable to load the stored OAuth token")?;
        if token.refresh_token.is_empty() {
            bail!(
                "The token file at {} has no refresh token; re-run the Google consent flow",
                token_path.display()
            );
        }
        Ok(Self {
            secret: secret_file.installed,
            token,
            token_path,
            http: reqwest::Client::new(),
        })
    }

    /// Returns a valid access token, refreshing it first when it expires
    /// within the next minute. A refreshed token is persisted back to
    /// `token.json`.
    pub(crate) async fn token_with_refresh(&mut self) -> anyhow::Result<&str> {
        let margin = Duration::seconds(EXPIRY_MARGIN_SECONDS);
        if self.token.expiry - margin <= Utc::now() {
            self.refresh().await?;
        }
        Ok(&self.token.access_token)
    }

    async fn refresh(&mut self) -> anyhow::Result<()> {
        tracing::debug!("Access token expired, refreshing");
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("refresh_token", self.token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .http
            .post(&self.secret.token_uri)
            .form(&params)
            .send()
            .await
            .context("Failed to reach the OAuth token endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Token refresh failed with status {status}: {body}");
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .context("Failed to parse the token refresh response")?;
        self.token.access_token = refreshed.access_token;
        self.token.expiry = Utc::now() + Duration::seconds(refreshed.expires_in);
        self.save_token().await?;
        tracing::debug!("Token refreshed, valid until {}", self.token.expiry);
        Ok(())
    }

    /// Persists the token file with restrictive permissions.
    async fn save_token(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.token)
            .context("Failed to serialize the token file")?;
        utils::write(&self.token_path, json).await?;
        set_owner_only(&self.token_path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_owner_only(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn secret_json() -> &'static str {
        r#"{
            "installed": {
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "shhh",
                "redirect_uris": ["http://localhost"],
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#
    }

    #[tokio::test]
    async fn test_load() {
        let dir = TempDir::new().unwrap();
        let secret_path = dir.path().join("client_secret.json");
        let token_path = dir.path().join("token.json");
        std::fs::write(&secret_path, secret_json()).unwrap();
        std::fs::write(
            &token_path,
            r#"{
                "access_token": "abc",
                "refresh_token": "def",
                "expiry": "2099-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        let mut provider = TokenProvider::load(&secret_path, &token_path).await.unwrap();
        // Far-future expiry, so no refresh request is attempted.
        assert_eq!(provider.token_with_refresh().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_load_rejects_missing_refresh_token() {
        let dir = TempDir::new().unwrap();
        let secret_path = dir.path().join("client_secret.json");
        let token_path = dir.path().join("token.json");
        std::fs::write(&secret_path, secret_json()).unwrap();
        std::fs::write(
            &token_path,
            r#"{
                "access_token": "abc",
                "refresh_token": "",
                "expiry": "2099-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        assert!(TokenProvider::load(&secret_path, &token_path).await.is_err());
    }
}
