//! Implements the `SheetStore` trait against the Google Sheets v4 REST API.
//!
//! Values calls use `USER_ENTERED` input interpretation so that the
//! `M/D/YYYY` date strings and plain numeric cost strings we write become
//! genuine date and number cells, which the column formats applied during
//! initialization then render.

use crate::api::{SheetStore, TokenProvider};
use crate::error::{Error, Result};
use anyhow::{anyhow, Context};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// All store calls are blocking I/O from the caller's perspective and carry
/// a bounded timeout; failures surface to the caller and are never retried
/// here.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A `SheetStore` backed by one Google spreadsheet.
pub struct GoogleSheetStore {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl GoogleSheetStore {
    pub fn new(spreadsheet_id: String, token_provider: TokenProvider) -> Self {
        Self {
            spreadsheet_id,
            token_provider,
            http: reqwest::Client::new(),
        }
    }

    /// Builds a URL under this spreadsheet. `Url::parse` percent-encodes the
    /// tab name embedded in a range (e.g. `Chat History!A:C`).
    fn url(&self, path_and_query: &str) -> Result<Url> {
        Url::parse(&format!(
            "{BASE_URL}/{}{path_and_query}",
            self.spreadsheet_id
        ))
        .map_err(|e| Error::StoreUnavailable(anyhow!(e)))
    }

    async fn bearer(&mut self) -> Result<String> {
        self.token_provider
            .token_with_refresh()
            .await
            .map(|t| t.to_string())
            .map_err(Error::StoreUnavailable)
    }

    /// Sends a request and maps the store's failure modes: a missing tab is
    /// reported by Google as an unparseable-range 400 (or a 404), anything
    /// else is a transport failure.
    async fn send(&mut self, request: reqwest::RequestBuilder, tab: &str) -> Result<reqwest::Response> {
        let token = self.bearer().await?;
        let response = request
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(anyhow!(e).context("Request to Google Sheets failed")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND || body.contains("Unable to parse range") {
            return Err(Error::TableNotFound(tab.to_string()));
        }
        Err(Error::StoreUnavailable(anyhow!(
            "Google Sheets returned status {status}: {body}"
        )))
    }

    /// `batchUpdate` returning the raw reply list, needed by
    /// `get_or_create_sheet` to learn a new tab's id.
    async fn batch_update_raw(&mut self, requests: Vec<serde_json::Value>) -> Result<serde_json::Value> {
        let url = self.url(":batchUpdate")?;
        let request = self.http.post(url).json(&json!({ "requests": requests }));
        let response = self.send(request, "").await?;
        response
            .json()
            .await
            .map_err(|e| Error::StoreUnavailable(anyhow!(e).context("Failed to parse batchUpdate response")))
    }
}

#[async_trait::async_trait]
impl SheetStore for GoogleSheetStore {
    async fn read(&mut self, tab: &str, range: &str) -> Result<Vec<Vec<String>>> {
        tracing::trace!("read {tab}!{range}");
        let url = self.url(&format!("/values/{tab}!{range}"))?;
        let response = self.send(self.http.get(url), tab).await?;
        let body: ValuesResponse = response
            .json()
            .await
            .map_err(|e| Error::StoreUnavailable(anyhow!(e).context("Failed to parse values response")))?;
        Ok(body.values)
    }

    async fn append(&mut self, tab: &str, range: &str, rows: &[Vec<String>]) -> Result<()> {
        tracing::trace!("append {} rows to {tab}!{range}", rows.len());
        let url = self.url(&format!(
            "/values/{tab}!{range}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS"
        ))?;
        let request = self.http.post(url).json(&json!({ "values": rows }));
        self.send(request, tab).await?;
        Ok(())
    }

    async fn update_values(&mut self, tab: &str, range: &str, rows: &[Vec<String>]) -> Result<()> {
        tracing::trace!("update {tab}!{range}");
        let url = self.url(&format!(
            "/values/{tab}!{range}?valueInputOption=USER_ENTERED"
        ))?;
        let request = self.http.put(url).json(&json!({ "values": rows }));
        self.send(request, tab).await?;
        Ok(())
    }

    async fn sheet_id(&mut self, tab: &str) -> Result<Option<i64>> {
        let url = self.url("?fields=sheets.properties")?;
        let response = self.send(self.http.get(url), tab).await?;
        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| Error::StoreUnavailable(anyhow!(e).context("Failed to parse spreadsheet metadata")))?;
        Ok(meta
            .sheets
            .into_iter()
            .find(|s| s.properties.title == tab)
            .map(|s| s.properties.sheet_id))
    }

    async fn get_or_create_sheet(&mut self, tab: &str) -> Result<i64> {
        if let Some(id) = self.sheet_id(tab).await? {
            return Ok(id);
        }
        tracing::debug!("Creating sheet tab '{tab}'");
        let reply = self
            .batch_update_raw(vec![json!({
                "addSheet": { "properties": { "title": tab } }
            })])
            .await?;
        reply
            .pointer("/replies/0/addSheet/properties/sheetId")
            .and_then(|v| v.as_i64())
            .context("addSheet reply did not contain a sheet id")
            .map_err(Error::StoreUnavailable)
    }

    async fn batch_update(&mut self, requests: Vec<serde_json::Value>) -> Result<()> {
        let _ = self.batch_update_raw(requests).await?;
        Ok(())
    }
}
