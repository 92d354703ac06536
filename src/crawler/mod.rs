use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{declare::Category, table::Table};

/// FinMind 開放資料
pub mod finmind;
/// 台灣證券交易所
pub mod twse;

/// 個股各類籌碼資料的來源
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 取得單一類別在區間內的原始資料，傳輸或 API 錯誤時回傳 Err，
    /// 查無資料時回傳空表
    async fn fetch(
        &self,
        category: Category,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Table>;
}
