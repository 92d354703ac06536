use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};

use crate::{
    crawler::DataSource,
    declare::Category,
    etl::{self, FetchOutcome},
    export, logging,
};

/// 固定檔名，每次執行覆蓋
pub const LATEST_FILE: &str = "tw_stock_data_latest.csv";

/// 抓取指定股票從 `start` 到今天的每日股價，存成固定檔名，回傳筆數
pub async fn execute<S>(source: &S, stock_symbol: &str, start: NaiveDate, output_dir: &Path) -> Result<usize>
where
    S: DataSource + ?Sized,
{
    let end = Local::now().date_naive();
    logging::info_console(format!(
        "開始抓取股票: {} (從 {} 到 {})",
        stock_symbol, start, end
    ));

    let table = match etl::fetch_category(source, Category::Daily, stock_symbol, start, end).await {
        FetchOutcome::Success(table) => table.normalize_keys()?,
        FetchOutcome::Empty => {
            return Err(anyhow!("{} 抓取失敗，查無資料", stock_symbol));
        }
        FetchOutcome::Failed(why) => {
            return Err(anyhow!("{} 抓取失敗: {}", stock_symbol, why));
        }
    };

    export::write_csv(&table, &output_dir.join(LATEST_FILE))?;
    logging::info_console(format!("成功！資料已更新至固定檔案: {}", LATEST_FILE));
    logging::info_console(format!("目前共有 {} 筆交易資料。", table.len()));

    Ok(table.len())
}
