use std::{cmp::Ordering, fmt};

use anyhow::{anyhow, Result};
use hashbrown::{HashMap, HashSet};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::util::text;

/// 日期欄位
pub const DATE: &str = "date";
/// 股票代號欄位
pub const STOCK_ID: &str = "stock_id";

/// (date, stock_id)
pub type Key = (String, String);

/// 表格中的一格資料，Null 代表沒有資料，與數值 0 不同
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Null,
    Text(String),
    Number(Decimal),
}

impl Cell {
    pub fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Null,
            Value::String(s) => Cell::Text(s.clone()),
            Value::Bool(b) => Cell::Text(b.to_string()),
            Value::Number(n) => match text::parse_decimal(&n.to_string(), None) {
                Ok(d) => Cell::Number(d),
                Err(_) => Cell::Text(n.to_string()),
            },
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// 取得數值，文字會嘗試轉換；Null 或無法轉換時回傳 None
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Number(d) => Some(*d),
            Cell::Text(s) => text::parse_decimal(s.trim(), None).ok(),
            Cell::Null => None,
        }
    }

    /// 作為 join 鍵值使用的文字表示，數值會去除尾端的 0
    pub fn to_key_text(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(d) => d.normalize().to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(d) => write!(f, "{}", d),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<Decimal> for Cell {
    fn from(d: Decimal) -> Self {
        Cell::Number(d)
    }
}

impl From<Option<Decimal>> for Cell {
    fn from(d: Option<Decimal>) -> Self {
        d.map_or(Cell::Null, Cell::Number)
    }
}

/// 以欄為名、以列為資料的表格，欄位順序即輸出順序
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// 由 JSON 物件陣列建立表格，欄位取聯集並保留第一次出現的順序，缺少的欄位為 Null
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in records {
            for name in record.keys() {
                if !positions.contains_key(name) {
                    positions.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                let mut row = vec![Cell::Null; columns.len()];
                for (name, value) in record {
                    if let Some(&idx) = positions.get(name) {
                        row[idx] = Cell::from_json(value);
                    }
                }
                row
            })
            .collect();

        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(anyhow!(
                "Row has {} cells but the table has {} columns",
                row.len(),
                self.columns.len()
            ));
        }

        self.rows.push(row);
        Ok(())
    }

    /// 取得指定列、指定欄位的資料
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// 所有列在指定欄位的資料
    pub fn column_values(&self, column: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// 移除欄位，欄位不存在時原樣回傳
    pub fn drop_column(mut self, name: &str) -> Self {
        if let Some(idx) = self.column_index(name) {
            self.columns.remove(idx);
            for row in self.rows.iter_mut() {
                row.remove(idx);
            }
        }

        self
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    fn key_indices(&self) -> Result<(usize, usize)> {
        let date = self
            .column_index(DATE)
            .ok_or_else(|| anyhow!("Missing key column '{}'", DATE))?;
        let stock_id = self
            .column_index(STOCK_ID)
            .ok_or_else(|| anyhow!("Missing key column '{}'", STOCK_ID))?;

        Ok((date, stock_id))
    }

    fn key_at(row: &[Cell], (date, stock_id): (usize, usize)) -> Key {
        (row[date].to_key_text(), row[stock_id].to_key_text())
    }

    /// 每一列的 (date, stock_id)
    pub fn keys(&self) -> Result<Vec<Key>> {
        let indices = self.key_indices()?;
        Ok(self.rows.iter().map(|r| Self::key_at(r, indices)).collect())
    }

    /// 將 date、stock_id 一律轉成文字，避免 join 時因型別不同而對不上
    pub fn normalize_keys(mut self) -> Result<Self> {
        let (date, stock_id) = self.key_indices()?;

        for row in self.rows.iter_mut() {
            row[date] = Cell::Text(row[date].to_key_text());
            row[stock_id] = Cell::Text(row[stock_id].to_key_text());
        }

        Ok(self)
    }

    /// 依 date、stock_id 遞增排序，鍵值相同時維持原順序
    pub fn sort_by_key(&mut self) -> Result<()> {
        let indices = self.key_indices()?;
        self.rows
            .sort_by(|a, b| compare_keys(&Self::key_at(a, indices), &Self::key_at(b, indices)));

        Ok(())
    }

    /// 同一個 (date, stock_id) 只保留第一列，回傳被移除的列數
    pub fn dedup_by_key(&mut self) -> Result<usize> {
        let indices = self.key_indices()?;
        let before = self.rows.len();
        let mut seen: HashSet<Key> = HashSet::with_capacity(before);

        self.rows.retain(|row| seen.insert(Self::key_at(row, indices)));

        Ok(before - self.rows.len())
    }

    /// 以 (date, stock_id) 將 `right` 左外連接到本表。
    ///
    /// 結果的列與本表一一對應，`right` 沒有對應鍵值的欄位為 Null；
    /// `right` 有重複鍵值時只取第一列。與本表同名的欄位會加上 `_<suffix>`。
    pub fn left_join(mut self, right: &Table, suffix: &str) -> Result<Table> {
        let left_indices = self.key_indices()?;
        let right_indices = right.key_indices()?;

        let mut lookup: HashMap<Key, usize> = HashMap::with_capacity(right.rows.len());
        for (i, row) in right.rows.iter().enumerate() {
            lookup
                .entry(Self::key_at(row, right_indices))
                .or_insert(i);
        }

        let carried: Vec<usize> = (0..right.columns.len())
            .filter(|&i| i != right_indices.0 && i != right_indices.1)
            .collect();

        for &i in &carried {
            let name = &right.columns[i];
            let name = if self.has_column(name) {
                format!("{}_{}", name, suffix)
            } else {
                name.clone()
            };
            self.columns.push(name);
        }

        for row in self.rows.iter_mut() {
            let key = Self::key_at(row, left_indices);
            match lookup.get(&key) {
                Some(&r) => row.extend(carried.iter().map(|&i| right.rows[r][i].clone())),
                None => row.extend(std::iter::repeat(Cell::Null).take(carried.len())),
            }
        }

        Ok(self)
    }
}

pub fn compare_keys(a: &Key, b: &Key) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn records(value: Value) -> Vec<Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_from_records_union_columns() {
        let table = Table::from_records(&records(json!([
            { "date": "2024-01-02", "stock_id": "2330", "close": 593.0 },
            { "date": "2024-01-03", "stock_id": "2330", "note": "<br>" }
        ])));

        assert_eq!(table.columns(), &["date", "stock_id", "close", "note"]);
        assert_eq!(table.value(0, "close"), Some(&Cell::Number(dec!(593.0))));
        assert_eq!(table.value(1, "close"), Some(&Cell::Null));
        assert_eq!(table.value(1, "note"), Some(&Cell::from("<br>")));
    }

    #[test]
    fn test_normalize_keys_numeric_stock_id() {
        let table = Table::from_records(&records(json!([
            { "date": "2024-01-02", "stock_id": 2330 },
            { "date": "2024-01-03", "stock_id": 50.0 }
        ])))
        .normalize_keys()
        .unwrap();

        assert_eq!(table.value(0, STOCK_ID), Some(&Cell::from("2330")));
        assert_eq!(table.value(1, STOCK_ID), Some(&Cell::from("50")));
    }

    #[test]
    fn test_missing_key_column() {
        let table = Table::from_records(&records(json!([{ "date": "2024-01-02" }])));
        assert!(table.normalize_keys().is_err());
    }

    #[test]
    fn test_sort_and_dedup() {
        let mut table = Table::new(vec![DATE.into(), STOCK_ID.into(), "v".into()]);
        table.push_row(vec!["D2".into(), "2330".into(), dec!(2).into()]).unwrap();
        table.push_row(vec!["D1".into(), "2330".into(), dec!(1).into()]).unwrap();
        table.push_row(vec!["D2".into(), "2330".into(), dec!(3).into()]).unwrap();

        table.sort_by_key().unwrap();
        assert_eq!(table.dedup_by_key().unwrap(), 1);
        assert_eq!(
            table.keys().unwrap(),
            vec![("D1".to_string(), "2330".to_string()), ("D2".to_string(), "2330".to_string())]
        );
        assert_eq!(table.value(1, "v"), Some(&Cell::Number(dec!(2))));
    }

    #[test]
    fn test_left_join_keeps_anchor_rows() {
        let mut anchor = Table::new(vec![DATE.into(), STOCK_ID.into(), "close".into()]);
        anchor.push_row(vec!["D1".into(), "2330".into(), dec!(10).into()]).unwrap();
        anchor.push_row(vec!["D2".into(), "2330".into(), dec!(11).into()]).unwrap();

        let mut right = Table::new(vec![DATE.into(), STOCK_ID.into(), "close".into(), "x".into()]);
        right.push_row(vec!["D2".into(), "2330".into(), dec!(99).into(), "a".into()]).unwrap();
        right.push_row(vec!["D9".into(), "2330".into(), dec!(98).into(), "b".into()]).unwrap();

        let joined = anchor.left_join(&right, "margin").unwrap();

        assert_eq!(joined.columns(), &["date", "stock_id", "close", "close_margin", "x"]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.value(0, "x"), Some(&Cell::Null));
        assert_eq!(joined.value(1, "close_margin"), Some(&Cell::Number(dec!(99))));
        assert_eq!(joined.value(1, "close"), Some(&Cell::Number(dec!(11))));
    }

    #[test]
    fn test_drop_and_rename_column() {
        let mut table = Table::new(vec![DATE.into(), STOCK_ID.into(), "note".into()]);
        table.push_row(vec!["D1".into(), "2330".into(), "x".into()]).unwrap();

        assert!(table.rename_column("note", "memo"));
        assert!(!table.rename_column("note", "memo"));

        let table = table.drop_column("memo").drop_column("absent");
        assert_eq!(table.columns(), &["date", "stock_id"]);
        assert_eq!(table.rows()[0].len(), 2);
    }

    #[test]
    fn test_push_row_length_mismatch() {
        let mut table = Table::new(vec![DATE.into(), STOCK_ID.into()]);
        assert!(table.push_row(vec![Cell::Null]).is_err());
    }
}
