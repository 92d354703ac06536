/// 最新的股價快照
pub mod latest_quote;
/// 個股籌碼資料清洗與合併 (單一或批次)
pub mod stock_data;
/// 上市、上櫃普通股清單與產業統計
pub mod stock_list;
