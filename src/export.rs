use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::{declare::Category, table::Table};

/// 讓 Excel 以 UTF-8 開啟中文不亂碼
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 各類別清洗後的檔名，例︰2330_lending_clean.csv
pub fn clean_file_name(stock_symbol: &str, category: Category) -> String {
    format!("{}_{}_clean.csv", stock_symbol, category)
}

/// 合併總表的檔名，例︰2330_all_data.csv
pub fn merged_file_name(stock_symbol: &str) -> String {
    format!("{}_all_data.csv", stock_symbol)
}

/// 將表格轉成含 BOM 的 CSV，Null 輸出為空字串
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());

    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    wtr.into_inner().context("failed to flush CSV writer")
}

/// 寫入 CSV，檔案已存在時整個覆蓋
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create dir: {}", parent.display()))?;
        }
    }

    let data = to_csv_bytes(table)?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}
