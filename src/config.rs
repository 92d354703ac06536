use std::{env, path::PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub finmind: FinMind,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub batch: Batch,
}

const FINMIND_URL: &str = "FINMIND_URL";
const DEFAULT_FINMIND_URL: &str = "https://api.finmindtrade.com/api/v4/data";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FinMind {
    #[serde(default = "default_finmind_url")]
    pub url: String,
}

impl Default for FinMind {
    fn default() -> Self {
        FinMind {
            url: default_finmind_url(),
        }
    }
}

fn default_finmind_url() -> String {
    DEFAULT_FINMIND_URL.to_string()
}

const OUTPUT_DIR: &str = "OUTPUT_DIR";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Output {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

const BATCH_STOCK_SYMBOLS: &str = "BATCH_STOCK_SYMBOLS";
const BATCH_START_DATE: &str = "BATCH_START_DATE";
const BATCH_END_DATE: &str = "BATCH_END_DATE";

/// 批次模式要處理的股票與區間
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Batch {
    #[serde(default = "default_stock_symbols")]
    pub stock_symbols: Vec<String>,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
}

impl Default for Batch {
    fn default() -> Self {
        Batch {
            stock_symbols: default_stock_symbols(),
            start_date: default_start_date(),
            end_date: default_end_date(),
        }
    }
}

fn default_stock_symbols() -> Vec<String> {
    ["2330", "2317", "2454", "2308", "2881"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default()
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| match App::get() {
    Ok(app) => app,
    Err(why) => {
        logging::error_file_async(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::default().override_with_env()
    }
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(url) = env::var(FINMIND_URL) {
            self.finmind.url = url;
        }

        if let Ok(dir) = env::var(OUTPUT_DIR) {
            self.output.dir = PathBuf::from(dir);
        }

        if let Ok(symbols) = env::var(BATCH_STOCK_SYMBOLS) {
            let symbols = parse_symbols(&symbols);
            if !symbols.is_empty() {
                self.batch.stock_symbols = symbols;
            }
        }

        if let Ok(date) = env::var(BATCH_START_DATE) {
            match date.parse::<NaiveDate>() {
                Ok(d) => self.batch.start_date = d,
                Err(why) => logging::error_file_async(format!(
                    "Failed to parse {}({}) because {:?}",
                    BATCH_START_DATE, date, why
                )),
            }
        }

        if let Ok(date) = env::var(BATCH_END_DATE) {
            match date.parse::<NaiveDate>() {
                Ok(d) => self.batch.end_date = d,
                Err(why) => logging::error_file_async(format!(
                    "Failed to parse {}({}) because {:?}",
                    BATCH_END_DATE, date, why
                )),
            }
        }

        self
    }
}

/// 解析以逗號分隔的股票代號，例︰"2330, 2317" => ["2330", "2317"]
fn parse_symbols(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols("2330, 2317,,6505 "), vec!["2330", "2317", "6505"]);
        assert!(parse_symbols(" , ").is_empty());
    }

    #[test]
    fn test_default() {
        let app = App::default();
        assert_eq!(app.finmind.url, DEFAULT_FINMIND_URL);
        assert_eq!(app.output.dir, PathBuf::from("."));
        assert_eq!(app.batch.stock_symbols.first().map(String::as_str), Some("2330"));
        assert!(app.batch.start_date < app.batch.end_date);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{ "output": { "dir": "data" }, "batch": { "stock_symbols": ["2603"] } }"#;
        let app: App = serde_json::from_str(json).expect("partial config");

        assert_eq!(app.output.dir, PathBuf::from("data"));
        assert_eq!(app.batch.stock_symbols, vec!["2603"]);
        assert_eq!(app.batch.start_date, default_start_date());
        assert_eq!(app.finmind.url, DEFAULT_FINMIND_URL);
    }
}
