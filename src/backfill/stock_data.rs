use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use scopeguard::defer;

use crate::{
    crawler::DataSource,
    etl::{self, StockReport},
    logging,
};

/// 處理單一股票，缺少股價資訊而無法產出總表時回傳 Err
pub async fn execute<S>(
    source: &S,
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    output_dir: &Path,
) -> Result<StockReport>
where
    S: DataSource + ?Sized,
{
    let report = etl::fetch_and_process(source, stock_symbol, start, end, output_dir).await;

    if report.is_success() {
        Ok(report)
    } else {
        Err(anyhow!(
            "{} failed: {}",
            stock_symbol,
            report.failure.as_deref().unwrap_or("unknown")
        ))
    }
}

/// 依序處理清單中的每一檔股票，單一股票失敗時繼續下一檔，最後輸出摘要
pub async fn execute_batch<S>(
    source: &S,
    stock_symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    output_dir: &Path,
) -> Vec<StockReport>
where
    S: DataSource + ?Sized,
{
    logging::info_file_async(format!("批次清洗開始 {} 檔", stock_symbols.len()));
    defer! {
        logging::info_file_async("批次清洗結束");
    }

    let mut reports = Vec::with_capacity(stock_symbols.len());
    for stock_symbol in stock_symbols {
        let report = etl::fetch_and_process(source, stock_symbol, start, end, output_dir).await;
        reports.push(report);
    }

    log_summary(&reports);
    reports
}

/// 輸出每檔股票成功或失敗的摘要
pub fn log_summary(reports: &[StockReport]) {
    let succeeded = reports.iter().filter(|r| r.is_success()).count();

    logging::info_console("-".repeat(30));
    for report in reports {
        match (&report.merged_rows, &report.failure) {
            (Some(rows), None) => {
                logging::info_console(format!("✅ {} 成功，總表 {} 筆", report.stock_symbol, rows))
            }
            (_, failure) => logging::error_console(format!(
                "❌ {} 失敗: {}",
                report.stock_symbol,
                failure.as_deref().unwrap_or("unknown")
            )),
        }
    }
    logging::info_console(format!("完成 {}/{} 檔", succeeded, reports.len()));
    logging::info_file_async(format!("batch summary: {}/{} succeeded", succeeded, reports.len()));
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::{declare::Category, table::Table};

    use super::*;

    /// 只有 2330 有股價資訊，其餘股票的所有類別都失敗
    struct OnlyOneStock;

    #[async_trait]
    impl DataSource for OnlyOneStock {
        async fn fetch(
            &self,
            category: Category,
            stock_symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Table> {
            if stock_symbol != "2330" {
                return Err(anyhow!("no such stock {}", stock_symbol));
            }

            match category {
                Category::Daily => {
                    let row = json!({ "date": "2024-01-02", "stock_id": "2330", "Trading_Volume": 10 });
                    Ok(Table::from_records(&[row.as_object().cloned().unwrap_or_default()]))
                }
                _ => Ok(Table::default()),
            }
        }
    }

    fn output_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tw_stock_etl_{}_{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let dir = output_dir("batch");
        let symbols = vec!["9999".to_string(), "2330".to_string()];
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        let reports = execute_batch(&OnlyOneStock, &symbols, start, end, &dir).await;

        assert_eq!(reports.len(), 2);
        assert!(!reports[0].is_success());
        assert!(reports[1].is_success());
        assert!(dir.join("2330_all_data.csv").exists());
        assert!(!dir.join("9999_all_data.csv").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_execute_reports_missing_anchor() {
        let dir = output_dir("single");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        assert!(execute(&OnlyOneStock, "9999", start, end, &dir).await.is_err());
        assert!(execute(&OnlyOneStock, "2330", start, end, &dir).await.is_ok());

        let _ = fs::remove_dir_all(&dir);
    }
}
