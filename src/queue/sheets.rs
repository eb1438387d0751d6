//! Google Sheets backed job queue (values API v4).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{Column, Job, JobQueue, QueueError, QueueLookup};
use crate::config::{QueueConfig, StatusMarkers};

/// Default base URL for the Sheets API.
pub const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com";

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: [[&'a str; 1]; 1],
}

/// Prefix a cell or column range with the sheet name, quoting it when needed.
fn sheet_range(sheet: &str, range: &str) -> String {
    if sheet.chars().all(|c| c.is_alphanumeric() || c == '_') {
        format!("{}!{}", sheet, range)
    } else {
        format!("'{}'!{}", sheet.replace('\'', "''"), range)
    }
}

/// Row number of the first status cell equal to `marker`.
fn first_row_with_status(values: &[Vec<String>], marker: &str) -> Option<u32> {
    values
        .iter()
        .position(|row| row.first().map(|cell| cell.trim()) == Some(marker))
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

/// Job queue stored in one sheet of a spreadsheet.
pub struct SheetsQueue {
    spreadsheet_id: String,
    sheet_name: String,
    access_token: String,
    base_url: String,
    markers: StatusMarkers,
    http_client: reqwest::Client,
}

impl SheetsQueue {
    /// Create a queue from the `[queue]` config section.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::MissingAccessToken` or `QueueError::MissingSpreadsheetId`
    /// when either is blank.
    pub fn from_config(config: &QueueConfig) -> Result<Self, QueueError> {
        let access_token = config.access_token.clone().unwrap_or_default();
        if access_token.trim().is_empty() {
            return Err(QueueError::MissingAccessToken);
        }
        if config.spreadsheet_id.trim().is_empty() {
            return Err(QueueError::MissingSpreadsheetId);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            access_token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            markers: config.status.clone(),
            http_client,
        })
    }

    fn values_url(&self, range: &str) -> Result<Url, QueueError> {
        let mut url = Url::parse(&format!("{}/v4/spreadsheets", self.base_url))
            .map_err(|e| QueueError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| QueueError::InvalidUrl(self.base_url.clone()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, QueueError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(QueueError::ApiError { status, message })
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, QueueError> {
        let url = self.values_url(range)?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: ValueRange = Self::check(response).await?.json().await?;
        Ok(body.values)
    }

    async fn lookup(&self) -> Result<Option<Job>, QueueError> {
        let status_column = Column::Status.letter();
        let range = sheet_range(&self.sheet_name, &format!("{0}:{0}", status_column));
        let statuses = self.get_values(&range).await?;

        let Some(row) = first_row_with_status(&statuses, &self.markers.pending) else {
            return Ok(None);
        };
        let topic = self.read_cell(row, Column::Topic).await?;
        Ok(Some(Job { topic, row }))
    }
}

#[async_trait]
impl JobQueue for SheetsQueue {
    async fn find_pending(&self) -> QueueLookup {
        match self.lookup().await {
            Ok(Some(job)) => {
                log::info!("Row {} is pending: {:?}", job.row, job.topic);
                QueueLookup::JobFound(job)
            }
            Ok(None) => QueueLookup::NoJobPending,
            Err(e) => {
                log::error!("Queue lookup failed: {}", e);
                QueueLookup::QueryFailed(e)
            }
        }
    }

    async fn read_cell(&self, row: u32, column: Column) -> Result<String, QueueError> {
        let range = sheet_range(&self.sheet_name, &column.cell(row));
        let values = self.get_values(&range).await?;
        Ok(values
            .into_iter()
            .next()
            .and_then(|r| r.into_iter().next())
            .unwrap_or_default())
    }

    async fn write_cell(&self, row: u32, column: Column, value: &str) -> Result<(), QueueError> {
        let range = sheet_range(&self.sheet_name, &column.cell(row));
        let url = self.values_url(&range)?;
        let body = ValueUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: [[value]],
        };

        log::debug!("Writing {} ({} chars)", range, value.chars().count());
        let response = self
            .http_client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
