//! Client for the externally hosted spreadsheet service.
//!
//! The service is a black box to the rest of the pipeline: given a sheet
//! identifier it hands back raw `(key, value)` string rows, nothing more.
//! Everything downstream of [`SheetsService`] is substitutable, and tests run
//! against the deterministic [`FixedSheets`] implementation.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::SheetId;
use crate::util::{values_path, DEFAULT_BASE_URL};

/// One raw spreadsheet row: key cell, value cell. Untyped on purpose; parsing
/// belongs to the result-set stage.
pub type RawRow = (String, String);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sheet service could not be reached for sheet `{sheet}`")]
    Unreachable {
        sheet: SheetId,
        #[source]
        source: anyhow::Error,
    },
    #[error("sheet `{sheet}` contains no rows")]
    Empty { sheet: SheetId },
}

/// Boundary to the external sheet service.
pub trait SheetsService {
    fn fetch_rows(
        &self,
        sheet: &SheetId,
    ) -> impl Future<Output = Result<Vec<RawRow>, FetchError>> + Send;
}

/// API key for the hosted sheet service.
pub struct SheetsCreds {
    api_key: String,
}

impl SheetsCreds {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for SheetsCreds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsCreds")
            .field("api_key", &"<hidden>")
            .finish()
    }
}

/// HTTP implementation of [`SheetsService`] against the hosted values
/// endpoint. Requests are bounded by a timeout; a timeout surfaces as
/// [`FetchError::Unreachable`] like any other transport failure.
#[derive(Debug)]
pub struct HttpSheetsClient {
    client: HttpClient,
    base_url: String,
    creds: SheetsCreds,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpSheetsClient {
    pub fn new(creds: SheetsCreds) -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL.to_owned(), creds)
    }

    pub fn with_base_url(base_url: String, creds: SheetsCreds) -> anyhow::Result<Self> {
        let client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url,
            creds,
        })
    }

    fn values_url(&self, sheet: &SheetId) -> String {
        format!("{}{}", self.base_url, values_path(sheet))
    }
}

/// Shape of the values endpoint's response body.
#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetsService for HttpSheetsClient {
    async fn fetch_rows(&self, sheet: &SheetId) -> Result<Vec<RawRow>, FetchError> {
        let url = self.values_url(sheet);
        info!(%url, %sheet, "fetching sheet rows");

        let unreachable = |source: anyhow::Error| FetchError::Unreachable {
            sheet: sheet.clone(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.creds.api_key())])
            .send()
            .await
            .map_err(|err| unreachable(anyhow!(err)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::Empty {
                sheet: sheet.clone(),
            });
        }

        let response = response
            .error_for_status()
            .map_err(|err| unreachable(anyhow!(err)))?;

        let body: ValuesResponse = response
            .json()
            .await
            .map_err(|err| unreachable(anyhow!(err)))?;

        debug!(rows = body.values.len(), %sheet, "got sheet rows");

        if body.values.is_empty() {
            return Err(FetchError::Empty {
                sheet: sheet.clone(),
            });
        }

        Ok(body.values.into_iter().map(cells_to_row).collect())
    }
}

fn cells_to_row(cells: Vec<String>) -> RawRow {
    let mut cells = cells.into_iter();
    let key = cells.next().unwrap_or_default();
    let value = cells.next().unwrap_or_default();
    (key, value)
}

/// Deterministic in-memory [`SheetsService`] for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct FixedSheets {
    sheets: HashMap<SheetId, Vec<RawRow>>,
}

impl FixedSheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet<K, V>(mut self, sheet: SheetId, rows: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.sheets.insert(
            sheet,
            rows.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }
}

impl SheetsService for FixedSheets {
    async fn fetch_rows(&self, sheet: &SheetId) -> Result<Vec<RawRow>, FetchError> {
        let rows = self
            .sheets
            .get(sheet)
            .ok_or_else(|| FetchError::Unreachable {
                sheet: sheet.clone(),
                source: anyhow!("no such sheet"),
            })?;

        if rows.is_empty() {
            return Err(FetchError::Empty {
                sheet: sheet.clone(),
            });
        }

        Ok(rows.clone())
    }
}
