use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use concat_string::concat_string;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{config::SETTINGS, crawler::DataSource, declare::Category, table::Table, util::http};

const STATUS_OK: i64 = 200;

#[derive(Deserialize, Debug)]
struct FinMindResponse {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    data: Option<Vec<Map<String, Value>>>,
}

/// FinMind 開放資料 API (v4)
#[derive(Debug, Clone)]
pub struct FinMind {
    url: String,
}

impl FinMind {
    pub fn new(url: impl Into<String>) -> Self {
        FinMind { url: url.into() }
    }

    pub fn from_settings() -> Self {
        Self::new(SETTINGS.finmind.url.as_str())
    }

    fn build_url(
        &self,
        category: Category,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> String {
        concat_string!(
            self.url,
            "?dataset=",
            category.dataset(),
            "&data_id=",
            urlencoding::encode(stock_symbol),
            "&start_date=",
            start.format("%Y-%m-%d").to_string(),
            "&end_date=",
            end.format("%Y-%m-%d").to_string()
        )
    }
}

#[async_trait]
impl DataSource for FinMind {
    async fn fetch(
        &self,
        category: Category,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Table> {
        let url = self.build_url(category, stock_symbol, start, end);
        let res = http::get_json::<FinMindResponse>(&url).await?;

        into_table(res)
    }
}

fn into_table(res: FinMindResponse) -> Result<Table> {
    if let Some(status) = res.status {
        if status != STATUS_OK {
            return Err(anyhow!(
                "FinMind responded with status {}: {}",
                status,
                res.msg.unwrap_or_default()
            ));
        }
    }

    Ok(Table::from_records(&res.data.unwrap_or_default()))
}
