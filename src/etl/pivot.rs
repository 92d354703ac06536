use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

use crate::table::{Cell, Key, Table, DATE, STOCK_ID};

const NAME: &str = "name";
const BUY: &str = "buy";
const SELL: &str = "sell";
const NET_SUFFIX: &str = "_net";

/// 某一天各法人的買賣超，沒有出現的法人代表當天沒有資料，不是 0
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetFlowRow {
    pub date: String,
    pub stock_id: String,
    pub nets: BTreeMap<String, Decimal>,
}

impl NetFlowRow {
    /// 指定法人的買賣超，None 代表沒有資料
    pub fn net(&self, entity: &str) -> Option<Decimal> {
        self.nets.get(entity).copied()
    }
}

/// 長表 (一列一個法人) 轉成的寬表
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetFlowWide {
    /// 整個區間內出現過的法人名稱
    pub entities: BTreeSet<String>,
    pub rows: Vec<NetFlowRow>,
}

impl NetFlowWide {
    pub fn column_name(entity: &str) -> String {
        format!("{}{}", entity, NET_SUFFIX)
    }

    pub fn into_table(self) -> Result<Table> {
        let mut columns = vec![DATE.to_string(), STOCK_ID.to_string()];
        columns.extend(self.entities.iter().map(|e| Self::column_name(e)));

        let mut table = Table::new(columns);
        for row in self.rows {
            let mut cells = Vec::with_capacity(self.entities.len() + 2);
            cells.push(Cell::Text(row.date.clone()));
            cells.push(Cell::Text(row.stock_id.clone()));
            cells.extend(self.entities.iter().map(|e| Cell::from(row.net(e))));
            table.push_row(cells)?;
        }

        Ok(table)
    }
}

/// 買賣超 = 買進 - 賣出，任一方缺值時為 None
pub fn net(buy: &Cell, sell: &Cell) -> Option<Decimal> {
    Some(buy.as_decimal()? - sell.as_decimal()?)
}

/// 計算每列的買賣超後，以 (date, stock_id) 分組、依法人名稱展開成欄位。
///
/// 同一天同一法人出現多列時取平均值。
pub fn pivot_net_flow(table: &Table) -> Result<NetFlowWide> {
    let keys = table.keys()?;
    let names = required_column(table, NAME)?;
    let buys = required_column(table, BUY)?;
    let sells = required_column(table, SELL)?;

    let mut entities = BTreeSet::new();
    let mut grouped: BTreeMap<Key, BTreeMap<String, (Decimal, u32)>> = BTreeMap::new();

    for (i, key) in keys.into_iter().enumerate() {
        let entity = names[i].to_key_text();
        entities.insert(entity.clone());

        let day = grouped.entry(key).or_default();
        if let Some(n) = net(buys[i], sells[i]) {
            let (sum, count) = day.entry(entity).or_insert((Decimal::ZERO, 0));
            *sum += n;
            *count += 1;
        }
    }

    let rows = grouped
        .into_iter()
        .map(|((date, stock_id), day)| NetFlowRow {
            date,
            stock_id,
            nets: day
                .into_iter()
                .map(|(entity, (sum, count))| match count {
                    1 => (entity, sum),
                    _ => (entity, sum / Decimal::from(count)),
                })
                .collect(),
        })
        .collect();

    Ok(NetFlowWide { entities, rows })
}

/// 三大法人的寬表，欄位為 date、stock_id 與每個法人的 `<name>_net`
pub fn net_flow_wide(table: &Table) -> Result<Table> {
    pivot_net_flow(table)?.into_table()
}

fn required_column<'a>(table: &'a Table, name: &str) -> Result<Vec<&'a Cell>> {
    table
        .column_values(name)
        .ok_or_else(|| anyhow!("Missing column '{}', columns: {:?}", name, table.columns()))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn investors(rows: Vec<(&str, &str, Cell, Cell)>) -> Table {
        let mut t = Table::new(
            ["date", "stock_id", "buy", "name", "sell"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        for (date, name, buy, sell) in rows {
            t.push_row(vec![date.into(), "2330".into(), buy, name.into(), sell])
                .unwrap();
        }
        t
    }

    #[test]
    fn test_net_is_buy_minus_sell() {
        assert_eq!(net(&dec!(100).into(), &dec!(40).into()), Some(dec!(60)));
        assert_eq!(net(&dec!(10).into(), &dec!(25).into()), Some(dec!(-15)));
        assert_eq!(net(&Cell::Null, &dec!(25).into()), None);
    }

    #[test]
    fn test_pivot_keeps_missing_as_absent() {
        let table = investors(vec![
            ("D1", "Foreign_Investor", dec!(100).into(), dec!(40).into()),
            ("D1", "Investment_Trust", dec!(10).into(), dec!(10).into()),
            ("D2", "Foreign_Investor", dec!(5).into(), dec!(50).into()),
        ]);

        let wide = net_flow_wide(&table).unwrap();

        assert_eq!(
            wide.columns(),
            &["date", "stock_id", "Foreign_Investor_net", "Investment_Trust_net"]
        );
        assert_eq!(wide.len(), 2);
        assert_eq!(wide.value(0, "Foreign_Investor_net"), Some(&Cell::Number(dec!(60))));
        assert_eq!(wide.value(0, "Investment_Trust_net"), Some(&Cell::Number(dec!(0))));
        assert_eq!(wide.value(1, "Foreign_Investor_net"), Some(&Cell::Number(dec!(-45))));
        assert_eq!(wide.value(1, "Investment_Trust_net"), Some(&Cell::Null));
    }

    #[test]
    fn test_pivot_entities_are_exact_strings() {
        let table = investors(vec![
            ("D1", "Dealer", dec!(3).into(), dec!(1).into()),
            ("D1", "dealer ", dec!(1).into(), dec!(1).into()),
        ]);

        let wide = pivot_net_flow(&table).unwrap();
        assert_eq!(wide.entities.len(), 2);
        assert_eq!(wide.rows[0].net("Dealer"), Some(dec!(2)));
        assert_eq!(wide.rows[0].net("dealer "), Some(dec!(0)));
    }

    #[test]
    fn test_pivot_duplicate_entity_rows_are_averaged() {
        let table = investors(vec![
            ("D1", "Dealer_self", dec!(10).into(), dec!(0).into()),
            ("D1", "Dealer_self", dec!(20).into(), dec!(0).into()),
        ]);

        let wide = pivot_net_flow(&table).unwrap();
        assert_eq!(wide.rows.len(), 1);
        assert_eq!(wide.rows[0].net("Dealer_self"), Some(dec!(15)));
    }

    #[test]
    fn test_pivot_missing_buy_column() {
        let mut t = Table::new(vec!["date".into(), "stock_id".into(), "name".into()]);
        t.push_row(vec!["D1".into(), "2330".into(), "Foreign".into()])
            .unwrap();

        assert!(net_flow_wide(&t).is_err());
    }

    #[test]
    fn test_pivot_empty_input() {
        let t = investors(vec![]);
        let wide = net_flow_wide(&t).unwrap();

        assert!(wide.is_empty());
        assert_eq!(wide.columns(), &["date", "stock_id"]);
    }
}
