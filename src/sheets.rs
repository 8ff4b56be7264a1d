use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::job::JobRecord;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Rows land at the top-left of the first sheet; the API appends below
/// whatever is already there.
const SHEET_RANGE: &str = "Sheet1!A1";

/// Destination for extracted records. Implementations append the records as
/// rows and report how many were written.
#[async_trait]
pub trait AppendSink: Send + Sync {
    async fn append(&self, records: &[JobRecord]) -> Result<u32, AppError>;
}

/// Google Sheets v4 append client. The spreadsheet target is fixed at
/// construction and the bearer token is acquired once at startup.
pub struct SheetsClient {
    http: reqwest::Client,
    access_token: String,
    spreadsheet_id: String,
}

#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: Option<Updates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Updates {
    updated_rows: Option<u32>,
}

impl SheetsClient {
    pub fn new(access_token: String, spreadsheet_id: String) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            access_token,
            spreadsheet_id,
        })
    }

    fn append_url(&self) -> String {
        format!(
            "{API_BASE}/{}/values/{SHEET_RANGE}:append\
             ?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.spreadsheet_id
        )
    }
}

#[async_trait]
impl AppendSink for SheetsClient {
    async fn append(&self, records: &[JobRecord]) -> Result<u32, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let body = AppendRequest {
            values: records.iter().map(|r| r.to_row()).collect(),
        };

        let resp = self
            .http
            .post(self.append_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AppError::Sheets(format!(
                "append returned {status}: {detail}"
            )));
        }

        let parsed: AppendResponse = resp.json().await?;
        Ok(parsed
            .updates
            .and_then(|u| u.updated_rows)
            .unwrap_or_default())
    }
}
