use std::{fmt, path::Path};

use chrono::NaiveDate;

use crate::{
    crawler::DataSource,
    declare::Category,
    export, logging,
    table::Table,
};

/// 各類別的清洗規則
pub mod clean;
/// 以股價資訊為基底的合併
pub mod merge;
/// 三大法人買賣超的樞紐轉換
pub mod pivot;

/// 單一類別抓取的結果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Table),
    Empty,
    Failed(String),
}

/// 單一類別在本次執行的處理狀態
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryStatus {
    /// 已清洗並存檔
    Saved { rows: usize },
    /// 查無資料
    Empty,
    /// 抓取、清洗或存檔失敗
    Failed(String),
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryStatus::Saved { rows } => write!(f, "已存檔 ({} 筆)", rows),
            CategoryStatus::Empty => write!(f, "無數據"),
            CategoryStatus::Failed(why) => write!(f, "錯誤 -> {}", why),
        }
    }
}

/// 單一股票的處理結果
#[derive(Debug, Clone, PartialEq)]
pub struct StockReport {
    pub stock_symbol: String,
    pub categories: Vec<(Category, CategoryStatus)>,
    /// 合併總表的筆數，None 代表沒有產出總表
    pub merged_rows: Option<usize>,
    pub failure: Option<String>,
}

impl StockReport {
    fn new(stock_symbol: &str) -> Self {
        StockReport {
            stock_symbol: stock_symbol.to_string(),
            categories: Vec::with_capacity(6),
            merged_rows: None,
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.merged_rows.is_some()
    }

    pub fn status(&self, category: Category) -> Option<&CategoryStatus> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, s)| s)
    }
}

/// 抓取單一類別，只嘗試一次；錯誤不往外拋
pub async fn fetch_category<S>(
    source: &S,
    category: Category,
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> FetchOutcome
where
    S: DataSource + ?Sized,
{
    match source.fetch(category, stock_symbol, start, end).await {
        Ok(table) if table.is_empty() => FetchOutcome::Empty,
        Ok(table) => FetchOutcome::Success(table),
        Err(why) => FetchOutcome::Failed(format!("{:#}", why)),
    }
}

/// 抓取單一股票的所有類別、清洗、存檔並合併成總表。
///
/// 各類別的錯誤只會讓該類別不參與合併；只有股價資訊缺少時無法產出總表。
pub async fn fetch_and_process<S>(
    source: &S,
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    output_dir: &Path,
) -> StockReport
where
    S: DataSource + ?Sized,
{
    let mut report = StockReport::new(stock_symbol);
    let mut anchor: Option<Table> = None;
    let mut others: Vec<(Category, Table)> = Vec::with_capacity(5);

    logging::info_console(format!("--- 啟動「進階清洗並併」任務: {} ---", stock_symbol));

    for category in Category::iterator() {
        let status = match fetch_category(source, category, stock_symbol, start, end).await {
            FetchOutcome::Success(raw) => match clean_and_save(category, raw, stock_symbol, output_dir) {
                Ok(cleaned) if cleaned.is_empty() => CategoryStatus::Empty,
                Ok(cleaned) => {
                    let rows = cleaned.len();
                    if category.is_anchor() {
                        anchor = Some(cleaned);
                    } else {
                        others.push((category, cleaned));
                    }
                    CategoryStatus::Saved { rows }
                }
                Err(why) => CategoryStatus::Failed(format!("{:#}", why)),
            },
            FetchOutcome::Empty => CategoryStatus::Empty,
            FetchOutcome::Failed(why) => CategoryStatus::Failed(why),
        };

        log_category(stock_symbol, category, &status);
        report.categories.push((category, status));
    }

    let anchor = match anchor {
        Some(anchor) => anchor,
        None => {
            let msg = format!("缺少 {} 資料", Category::Daily);
            logging::error_console(format!("{} {}", stock_symbol, msg));
            logging::error_file_async(format!("{} merge skipped: {}", stock_symbol, msg));
            report.failure = Some(msg);
            return report;
        }
    };

    logging::info_console("--- 正在合併精煉總表 ---");

    let merged = merge::merge(anchor, &others).and_then(|merged| {
        let path = output_dir.join(export::merged_file_name(stock_symbol));
        export::write_csv(&merged, &path)?;
        Ok(merged.len())
    });

    match merged {
        Ok(rows) => {
            logging::info_console(format!("任務完成！{} 最終筆數: {}", stock_symbol, rows));
            logging::info_file_async(format!("{} merged rows: {}", stock_symbol, rows));
            report.merged_rows = Some(rows);
        }
        Err(why) => {
            logging::error_console(format!("{} 合併總表失敗: {:#}", stock_symbol, why));
            logging::error_file_async(format!("{} failed to merge because {:?}", stock_symbol, why));
            report.failure = Some(format!("{:#}", why));
        }
    }

    report
}

/// 清洗並存檔，清洗後的表格按 date、stock_id 排序以確保每次輸出相同
fn clean_and_save(
    category: Category,
    raw: Table,
    stock_symbol: &str,
    output_dir: &Path,
) -> anyhow::Result<Table> {
    let mut cleaned = clean::clean(category, raw)?;
    cleaned.sort_by_key()?;

    if !cleaned.is_empty() {
        let path = output_dir.join(export::clean_file_name(stock_symbol, category));
        export::write_csv(&cleaned, &path)?;
    }

    Ok(cleaned)
}

fn log_category(stock_symbol: &str, category: Category, status: &CategoryStatus) {
    let msg = format!("{} {:10}: {}", stock_symbol, category.label(), status);
    match status {
        CategoryStatus::Failed(why) => {
            logging::error_console(&msg);
            logging::error_file_async(format!(
                "{} {} failed because {}",
                stock_symbol, category, why
            ));
        }
        CategoryStatus::Empty => {
            logging::info_console(&msg);
            logging::warn_file_async(format!("{} {} has no data", stock_symbol, category));
        }
        CategoryStatus::Saved { rows } => {
            logging::info_console(&msg);
            logging::info_file_async(format!(
                "{} {} saved {} rows",
                stock_symbol, category, rows
            ));
        }
    }
}
