//! The job queue: one spreadsheet row per topic.
//!
//! The queue is the only state that survives a run. A job stays pending until a
//! run writes a completed or failed marker into its status cell.

mod sheets;

use async_trait::async_trait;

pub use sheets::{SheetsQueue, SHEETS_API_BASE_URL};

/// A pending topic and the row it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub topic: String,
    /// 1-based sheet row.
    pub row: u32,
}

/// Columns the pipeline reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Topic,
    Status,
    Script,
    Keyword,
    FootageUrl,
    OutputPath,
}

impl Column {
    pub fn letter(self) -> char {
        match self {
            Column::Topic => 'A',
            Column::Status => 'B',
            Column::Script => 'C',
            Column::Keyword => 'D',
            Column::FootageUrl => 'E',
            Column::OutputPath => 'F',
        }
    }

    /// A1 notation for this column at `row`, e.g. `C7`.
    pub fn cell(self, row: u32) -> String {
        format!("{}{}", self.letter(), row)
    }
}

/// Result of asking the queue for work.
#[derive(Debug)]
pub enum QueueLookup {
    JobFound(Job),
    NoJobPending,
    QueryFailed(QueueError),
}

/// Errors that can occur while talking to the queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Spreadsheet access token not configured")]
    MissingAccessToken,

    #[error("Spreadsheet id not configured")]
    MissingSpreadsheetId,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Spreadsheet API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid spreadsheet URL: {0}")]
    InvalidUrl(String),
}

/// The pending-job store.
#[async_trait]
pub trait JobQueue {
    /// First row whose status is the pending marker.
    async fn find_pending(&self) -> QueueLookup;

    /// Contents of one cell; empty when the cell is blank.
    async fn read_cell(&self, row: u32, column: Column) -> Result<String, QueueError>;

    /// Overwrite one cell.
    async fn write_cell(&self, row: u32, column: Column, value: &str) -> Result<(), QueueError>;
}
