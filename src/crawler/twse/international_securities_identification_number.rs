use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

use crate::{crawler::twse::ISIN_HOST, declare::StockExchangeMarket, util::http};

const COLUMN_SYMBOL_AND_NAME: &str = "有價證券代號及名稱";
const COLUMN_INDUSTRY: &str = "產業別";
const COLUMN_CFI_CODE: &str = "CFICode";
/// 普通股的 CFI Code
const COMMON_STOCK_CFI_CODE: &str = "ESVUFR";

/// twse 國際證券識別碼一覽表中的普通股
#[derive(Debug, Clone, PartialEq)]
pub struct ListedCompany {
    pub stock_symbol: String,
    pub stock_name: String,
    pub market: StockExchangeMarket,
    pub industry: String,
    pub cfi_code: String,
}

/// 調用 twse 國際證券識別碼一覽表取得普通股清單
/// 上市:2 上櫃︰4
pub async fn visit(market: StockExchangeMarket) -> Result<Vec<ListedCompany>> {
    let url = format!(
        "https://{}/isin/C_public.jsp?strMode={}",
        ISIN_HOST,
        market.serial()
    );
    let text = http::get_use_big5(&url).await?;

    parse(&text, market)
}

/// 解析一覽表，第一列為欄位名稱，只保留代號為 4 碼且 CFI Code 為 ESVUFR 的股票
pub(crate) fn parse(html: &str, market: StockExchangeMarket) -> Result<Vec<ListedCompany>> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table")
        .map_err(|why| anyhow!("Failed to Selector::parse because: {:?}", why))?;
    let row_selector = Selector::parse("tr")
        .map_err(|why| anyhow!("Failed to Selector::parse because: {:?}", why))?;
    let cell_selector = Selector::parse("td, th")
        .map_err(|why| anyhow!("Failed to Selector::parse because: {:?}", why))?;

    let cells_of = |row: ElementRef| -> Vec<String> {
        row.select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect()
    };

    for table in document.select(&table_selector) {
        let mut rows = table.select(&row_selector);
        let header = match rows.next() {
            Some(row) => cells_of(row),
            None => continue,
        };

        let symbol_idx = match header.iter().position(|h| h == COLUMN_SYMBOL_AND_NAME) {
            Some(idx) => idx,
            None => continue,
        };
        let cfi_idx = header
            .iter()
            .position(|h| h == COLUMN_CFI_CODE)
            .ok_or_else(|| anyhow!("Missing column {}", COLUMN_CFI_CODE))?;
        let industry_idx = header.iter().position(|h| h == COLUMN_INDUSTRY);

        let mut result = Vec::with_capacity(2048);
        for row in rows {
            let tds = cells_of(row);
            if tds.len() <= symbol_idx.max(cfi_idx) {
                // 分類標題列只有一格
                continue;
            }

            let cfi_code = tds[cfi_idx].as_str();
            if cfi_code != COMMON_STOCK_CFI_CODE {
                continue;
            }

            let mut split = tds[symbol_idx].splitn(2, '\u{3000}');
            let stock_symbol = split.next().unwrap_or_default().trim();
            let stock_name = split.next().unwrap_or_default().trim();

            if stock_symbol.chars().count() != 4 {
                continue;
            }

            result.push(ListedCompany {
                stock_symbol: stock_symbol.to_string(),
                stock_name: stock_name.to_string(),
                market,
                industry: industry_idx
                    .and_then(|idx| tds.get(idx))
                    .cloned()
                    .unwrap_or_default(),
                cfi_code: cfi_code.to_string(),
            });
        }

        return Ok(result);
    }

    Err(anyhow!(
        "Failed to find the {} table for {}",
        COLUMN_SYMBOL_AND_NAME,
        market.name()
    ))
}
