/// 國際證券辨識號碼一覽表 (上市、上櫃清單)
pub mod international_securities_identification_number;

const ISIN_HOST: &str = "isin.twse.com.tw";
