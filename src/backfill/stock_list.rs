use std::{collections::BTreeMap, path::Path};

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use scopeguard::defer;

use crate::{
    crawler::twse::international_securities_identification_number::{self as isin, ListedCompany},
    declare::StockExchangeMarket,
    export, logging,
    table::{Cell, Table},
};

const ALL_MARKETS_FILE: &str = "tw_stock_list.csv";
const SUMMARY_FILE: &str = "tw_stock_list_summary.csv";
const COLUMN_TOTAL: &str = "總計";

/// 取得上市、上櫃普通股清單並輸出清單與產業統計
pub async fn execute(output_dir: &Path) -> Result<usize> {
    logging::info_file_async("更新上市櫃普通股清單開始");
    defer! {
        logging::info_file_async("更新上市櫃普通股清單結束");
    }

    let mut listed = Vec::new();
    let mut over_the_counter = Vec::new();

    for market in StockExchangeMarket::iterator() {
        logging::info_console(format!("正在從 {} 獲取最新清單...", market.name()));
        let companies = match isin::visit(market).await {
            Ok(companies) => companies,
            Err(why) => {
                logging::error_console(format!("處理 {} 時發生錯誤: {:#}", market.name(), why));
                logging::error_file_async(format!(
                    "Failed to isin::visit({:?}) because {:?}",
                    market, why
                ));
                Vec::new()
            }
        };

        match market {
            StockExchangeMarket::Listed => listed = companies,
            StockExchangeMarket::OverTheCounter => over_the_counter = companies,
        }
    }

    write_outputs(&listed, &over_the_counter, output_dir)
}

/// 寫出各市場清單、全市場總表與產業統計，回傳全市場的家數
pub(crate) fn write_outputs(
    listed: &[ListedCompany],
    over_the_counter: &[ListedCompany],
    output_dir: &Path,
) -> Result<usize> {
    for (market, companies) in [
        (StockExchangeMarket::Listed, listed),
        (StockExchangeMarket::OverTheCounter, over_the_counter),
    ] {
        if companies.is_empty() {
            continue;
        }

        let file_name = format!("{}_stock_list.csv", market.file_prefix());
        export::write_csv(&to_table(companies)?, &output_dir.join(&file_name))?;
        logging::info_console(format!("已存檔：{} ({} 筆)", file_name, companies.len()));
    }

    if listed.is_empty() && over_the_counter.is_empty() {
        return Err(anyhow!("未能從官網獲取數據，請檢查網路連線"));
    }

    let mut all: Vec<ListedCompany> = listed.iter().chain(over_the_counter).cloned().collect();
    all.sort_by(|a, b| a.stock_symbol.cmp(&b.stock_symbol));

    export::write_csv(&to_table(&all)?, &output_dir.join(ALL_MARKETS_FILE))?;
    logging::info_console(format!("已存檔：{} (共 {} 筆)", ALL_MARKETS_FILE, all.len()));

    export::write_csv(&summarize(&all)?, &output_dir.join(SUMMARY_FILE))?;
    logging::info_console(format!("已存檔：{}", SUMMARY_FILE));

    Ok(all.len())
}

fn to_table(companies: &[ListedCompany]) -> Result<Table> {
    let mut table = Table::new(
        ["stock_id", "stock_name", "market_type", "industry", "cfi_code"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    );

    for c in companies {
        table.push_row(vec![
            Cell::from(c.stock_symbol.as_str()),
            Cell::from(c.stock_name.as_str()),
            Cell::from(c.market.name()),
            Cell::from(c.industry.as_str()),
            Cell::from(c.cfi_code.as_str()),
        ])?;
    }

    Ok(table)
}

/// 各產業在上市、上櫃的家數與總計，依總計遞減排序；沒有產業別的公司不列入
fn summarize(companies: &[ListedCompany]) -> Result<Table> {
    let markets: Vec<StockExchangeMarket> = StockExchangeMarket::iterator().collect();
    let mut counts: BTreeMap<&str, Vec<u32>> = BTreeMap::new();

    for c in companies.iter().filter(|c| !c.industry.is_empty()) {
        let per_market = counts
            .entry(c.industry.as_str())
            .or_insert_with(|| vec![0; markets.len()]);
        if let Some(idx) = markets.iter().position(|m| *m == c.market) {
            per_market[idx] += 1;
        }
    }

    let mut rows: Vec<(&str, Vec<u32>, u32)> = counts
        .into_iter()
        .map(|(industry, per_market)| {
            let total = per_market.iter().sum();
            (industry, per_market, total)
        })
        .collect();
    // BTreeMap 已依產業名稱排序，stable sort 讓總計相同時維持名稱順序
    rows.sort_by(|a, b| b.2.cmp(&a.2));

    let mut columns = vec!["industry".to_string()];
    columns.extend(markets.iter().map(|m| m.name().to_string()));
    columns.push(COLUMN_TOTAL.to_string());

    let mut table = Table::new(columns);
    for (industry, per_market, total) in rows {
        let mut row = vec![Cell::from(industry)];
        row.extend(per_market.into_iter().map(|n| Cell::Number(Decimal::from(n))));
        row.push(Cell::Number(Decimal::from(total)));
        table.push_row(row)?;
    }

    Ok(table)
}
