use anyhow::Result;
use hashbrown::HashMap;
use rust_decimal::Decimal;

use crate::{
    declare::Category,
    etl::pivot,
    logging,
    table::{Cell, Key, Table, DATE, STOCK_ID},
};

/// 外資持股的備註欄，內容常夾雜 HTML 標籤
const SHAREHOLDING_NOTE: &str = "note";
/// 借券明細中可能代表張數的欄位
const LENDING_QUANTITY_COLUMNS: [&str; 3] = ["volume", "Quantity", "quantity"];
/// 借券依日加總後的欄位
pub const LENDING_TOTAL_VOL: &str = "lending_total_vol";

/// 依類別清洗原始資料，結果以 (date, stock_id) 為唯一鍵
pub fn clean(category: Category, raw: Table) -> Result<Table> {
    let table = raw.normalize_keys()?;

    let mut cleaned = match category {
        Category::Shareholding => table.drop_column(SHAREHOLDING_NOTE),
        Category::Lending => sum_lending(table)?,
        Category::InstitutionalInvestors => pivot::net_flow_wide(&table)?,
        Category::Daily | Category::DayTrading | Category::Margin => table,
    };

    let removed = cleaned.dedup_by_key()?;
    if removed > 0 {
        logging::warn_file_async(format!(
            "{} has {} rows with a duplicated (date, stock_id), only the first is kept",
            category.label(),
            removed
        ));
    }

    Ok(cleaned)
}

/// 借券成交為明細資料，依 (date, stock_id) 加總張數。
/// 找不到張數欄位時原樣回傳。
fn sum_lending(table: Table) -> Result<Table> {
    let quantity = match LENDING_QUANTITY_COLUMNS
        .iter()
        .find(|name| table.has_column(name))
    {
        Some(name) => *name,
        None => {
            logging::warn_file_async(format!(
                "Lending has no quantity column among {:?}, columns: {:?}",
                LENDING_QUANTITY_COLUMNS,
                table.columns()
            ));
            return Ok(table);
        }
    };

    let keys = table.keys()?;
    let quantities = table.column_values(quantity).unwrap_or_default();
    let mut order: Vec<Key> = Vec::new();
    let mut totals: HashMap<Key, Decimal> = HashMap::new();

    for (key, cell) in keys.into_iter().zip(quantities) {
        // 缺值視為 0
        let qty = cell.as_decimal().unwrap_or(Decimal::ZERO);
        match totals.get_mut(&key) {
            Some(total) => *total += qty,
            None => {
                totals.insert(key.clone(), qty);
                order.push(key);
            }
        }
    }

    let mut result = Table::new(vec![
        DATE.to_string(),
        STOCK_ID.to_string(),
        LENDING_TOTAL_VOL.to_string(),
    ]);

    for key in order {
        let total = totals.get(&key).copied().unwrap_or_default();
        result.push_row(vec![Cell::Text(key.0), Cell::Text(key.1), Cell::Number(total)])?;
    }

    result.sort_by_key()?;
    Ok(result)
}
