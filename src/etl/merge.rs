use anyhow::Result;
use rust_decimal::Decimal;

use crate::{declare::Category, table::Table};

/// 股價資訊中的成交股數欄位
pub const TRADING_VOLUME: &str = "Trading_Volume";

/// 以股價資訊為基底，依序左外連接其他類別，再剔除沒有成交量的日子。
///
/// 結果的 (date, stock_id) 必為基底的子集合，並依 date、stock_id 遞增排序。
pub fn merge(anchor: Table, others: &[(Category, Table)]) -> Result<Table> {
    let mut merged = others
        .iter()
        .try_fold(anchor, |acc, (category, table)| {
            acc.left_join(table, category.as_ref())
        })?;

    retain_trading_days(&mut merged);
    merged.sort_by_key()?;

    Ok(merged)
}

/// 只保留成交量大於 0 的列；沒有成交量欄位時不過濾
pub fn retain_trading_days(table: &mut Table) {
    if let Some(idx) = table.column_index(TRADING_VOLUME) {
        table.retain(|row| {
            row[idx]
                .as_decimal()
                .is_some_and(|volume| volume > Decimal::ZERO)
        });
    }
}
