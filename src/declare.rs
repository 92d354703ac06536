use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

/// 個股籌碼資料的類別，每一類對應 FinMind 的一個 dataset
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// 股價資訊
    Daily,
    /// 當沖交易
    DayTrading,
    /// 融資融券
    Margin,
    /// 外資持股
    Shareholding,
    /// 借券成交
    Lending,
    /// 三大法人
    #[strum(to_string = "inst_investors")]
    InstitutionalInvestors,
}

impl Category {
    /// FinMind dataset 名稱
    pub fn dataset(&self) -> &'static str {
        match self {
            Category::Daily => "TaiwanStockPrice",
            Category::DayTrading => "TaiwanStockDayTrading",
            Category::Margin => "TaiwanStockMarginPurchaseShortSale",
            Category::Shareholding => "TaiwanStockShareholding",
            Category::Lending => "TaiwanStockSecuritiesLending",
            Category::InstitutionalInvestors => "TaiwanStockInstitutionalInvestorsBuySell",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Daily => "股價資訊",
            Category::DayTrading => "當沖交易",
            Category::Margin => "融資融券",
            Category::Shareholding => "外資持股",
            Category::Lending => "借券成交",
            Category::InstitutionalInvestors => "三大法人",
        }
    }

    /// 合併總表的基底
    pub fn is_anchor(&self) -> bool {
        matches!(self, Category::Daily)
    }

    pub fn iterator() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// 市場別
#[derive(PartialEq, Debug, Copy, Clone)]
#[repr(i32)]
pub enum StockExchangeMarket {
    /// 上市 2
    Listed = 2,
    /// 上櫃 4
    OverTheCounter = 4,
}

impl StockExchangeMarket {
    pub fn serial(&self) -> i32 {
        *self as i32
    }

    pub fn name(&self) -> &'static str {
        match *self {
            StockExchangeMarket::Listed => "上市",
            StockExchangeMarket::OverTheCounter => "上櫃",
        }
    }

    /// 輸出檔名的前綴
    pub fn file_prefix(&self) -> &'static str {
        match *self {
            StockExchangeMarket::Listed => "twse",
            StockExchangeMarket::OverTheCounter => "tpex",
        }
    }

    pub fn iterator() -> impl Iterator<Item = Self> {
        [Self::Listed, Self::OverTheCounter].iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_suffix() {
        let suffixes: Vec<String> = Category::iterator().map(|c| c.to_string()).collect();
        assert_eq!(
            suffixes,
            vec![
                "daily",
                "day_trading",
                "margin",
                "shareholding",
                "lending",
                "inst_investors"
            ]
        );
        assert_eq!(Category::Lending.as_ref(), "lending");
    }

    #[test]
    fn test_only_daily_is_anchor() {
        let anchors: Vec<Category> = Category::iterator().filter(Category::is_anchor).collect();
        assert_eq!(anchors, vec![Category::Daily]);
    }

    #[test]
    fn test_market_serial() {
        assert_eq!(StockExchangeMarket::Listed.serial(), 2);
        assert_eq!(StockExchangeMarket::OverTheCounter.serial(), 4);
        assert_eq!(StockExchangeMarket::OverTheCounter.name(), "上櫃");
    }
}
