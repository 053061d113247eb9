use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{A1Range, BasicFilter, Condition, RowRange, SheetBackend, TabInfo};
use crate::error::{AppError, Result};
use crate::rows::Cell;

/// Google Sheets v4 REST backend for a single spreadsheet.
pub struct SheetsBackend {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Cell>>,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

impl SheetsBackend {
    pub fn new(base_url: &str, spreadsheet_id: &str, access_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &A1Range) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(&range.to_string())
        )
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = req.bearer_auth(&self.access_token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::StoreRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<BatchUpdateResponse> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let count = requests.len();
        let resp = self
            .send(self.client.post(&url).json(&json!({ "requests": requests })))
            .await?;
        debug!(requests = count, "Sheets batchUpdate ok");
        Ok(resp.json().await?)
    }
}

fn condition_json(condition: &Condition) -> Value {
    let (kind, value) = match condition {
        Condition::NumberEq(v) => ("NUMBER_EQ", v),
        Condition::DateEq(v) => ("DATE_EQ", v),
    };
    json!({
        "type": kind,
        "values": [{ "userEnteredValue": value }],
    })
}

fn set_basic_filter_request(tab_id: i64, filter: &BasicFilter) -> Value {
    let mut spec = json!({
        "range": {
            "sheetId": tab_id,
            "startRowIndex": filter.start_row_index,
            "endRowIndex": filter.end_row_index,
            "startColumnIndex": 0,
            "endColumnIndex": filter.column_count,
        }
    });
    if !filter.conditions.is_empty() {
        spec["filterSpecs"] = filter
            .conditions
            .iter()
            .map(|(col, cond)| {
                json!({
                    "columnIndex": col,
                    "filterCriteria": { "condition": condition_json(cond) },
                })
            })
            .collect();
    }
    if !filter.sort.is_empty() {
        spec["sortSpecs"] = filter
            .sort
            .iter()
            .map(|(col, order)| json!({ "dimensionIndex": col, "sortOrder": order.as_api_str() }))
            .collect();
    }
    json!({ "setBasicFilter": { "filter": spec } })
}

fn delete_rows_request(tab_id: i64, range: &RowRange) -> Value {
    json!({
        "deleteDimension": {
            "range": {
                "sheetId": tab_id,
                "dimension": "ROWS",
                "startIndex": range.start.saturating_sub(1),
                "endIndex": range.end,
            }
        }
    })
}

#[async_trait]
impl SheetBackend for SheetsBackend {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        let req = self
            .client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties")]);
        let sheet: Spreadsheet = self.send(req).await?.json().await?;
        Ok(sheet
            .sheets
            .into_iter()
            .map(|s| TabInfo {
                id: s.properties.sheet_id,
                title: s.properties.title,
            })
            .collect())
    }

    async fn add_tab(&self, title: &str) -> Result<TabInfo> {
        let resp = self
            .batch_update(vec![json!({ "addSheet": { "properties": { "title": title } } })])
            .await?;
        let id = resp
            .replies
            .first()
            .and_then(|r| r.pointer("/addSheet/properties/sheetId"))
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::StoreRejected {
                status: 200,
                body: "addSheet reply carried no sheetId".to_string(),
            })?;
        Ok(TabInfo {
            id,
            title: title.to_string(),
        })
    }

    async fn read_range(&self, range: &A1Range) -> Result<Vec<Vec<Cell>>> {
        let resp = self.send(self.client.get(self.values_url(range))).await?;
        let values: ValueRange = resp.json().await?;
        Ok(values.values)
    }

    async fn write_range(&self, range: &A1Range, rows: &[Vec<Cell>]) -> Result<()> {
        let body = json!({
            "range": range.to_string(),
            "majorDimension": "ROWS",
            "values": rows,
        });
        let req = self
            .client
            .put(self.values_url(range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body);
        self.send(req).await?;
        Ok(())
    }

    async fn delete_rows(&self, tab_id: i64, ranges: &[RowRange]) -> Result<()> {
        if ranges.is_empty() {
            return Ok(());
        }
        let requests = ranges.iter().map(|r| delete_rows_request(tab_id, r)).collect();
        self.batch_update(requests).await?;
        Ok(())
    }

    async fn clear_basic_filters(&self, tab_ids: &[i64]) -> Result<()> {
        if tab_ids.is_empty() {
            return Ok(());
        }
        let requests = tab_ids
            .iter()
            .map(|id| json!({ "clearBasicFilter": { "sheetId": id } }))
            .collect();
        self.batch_update(requests).await?;
        Ok(())
    }

    async fn set_basic_filter(&self, tab_id: i64, filter: &BasicFilter) -> Result<()> {
        self.batch_update(vec![set_basic_filter_request(tab_id, filter)])
            .await?;
        Ok(())
    }
}
