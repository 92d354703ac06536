use std::{path::PathBuf, process::ExitCode};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::{config::SETTINGS, crawler::finmind::FinMind};

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod backfill;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod etl;
pub mod export;
pub mod logging;
pub mod table;
pub mod util;

#[derive(Parser)]
#[command(name = "tw_stock_etl", about = "台股個股籌碼資料抓取、清洗與合併")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 抓取單一股票的所有類別，清洗後合併成總表
    Stock {
        /// 股票代號，例如 2330
        stock_symbol: String,
        /// 起始日 (YYYY-MM-DD)，預設取設定檔
        #[arg(long)]
        start: Option<NaiveDate>,
        /// 結束日 (YYYY-MM-DD)，預設取設定檔
        #[arg(long)]
        end: Option<NaiveDate>,
        /// 輸出目錄，預設取設定檔
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 依設定檔中的股票清單批次處理
    Batch {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 只抓取每日股價到今天，存成 tw_stock_data_latest.csv
    Latest {
        stock_symbol: String,
        #[arg(long, default_value = "2025-01-01")]
        start: NaiveDate,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 取得上市、上櫃普通股清單與產業統計
    Listing {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let source = FinMind::from_settings();
    let output_dir = |output: Option<PathBuf>| output.unwrap_or_else(|| SETTINGS.output.dir.clone());

    let result = match cli.command {
        Commands::Stock {
            stock_symbol,
            start,
            end,
            output,
        } => backfill::stock_data::execute(
            &source,
            &stock_symbol,
            start.unwrap_or(SETTINGS.batch.start_date),
            end.unwrap_or(SETTINGS.batch.end_date),
            &output_dir(output),
        )
        .await
        .map(|report| backfill::stock_data::log_summary(std::slice::from_ref(&report))),
        Commands::Batch { output } => {
            let reports = backfill::stock_data::execute_batch(
                &source,
                &SETTINGS.batch.stock_symbols,
                SETTINGS.batch.start_date,
                SETTINGS.batch.end_date,
                &output_dir(output),
            )
            .await;

            // 批次模式中單一股票失敗不影響結束狀態
            let failed = reports.iter().filter(|r| !r.is_success()).count();
            logging::info_file_async(format!("batch finished, {} failed", failed));
            Ok(())
        }
        Commands::Latest {
            stock_symbol,
            start,
            output,
        } => backfill::latest_quote::execute(&source, &stock_symbol, start, &output_dir(output))
            .await
            .map(|_| ()),
        Commands::Listing { output } => backfill::stock_list::execute(&output_dir(output))
            .await
            .map(|_| ()),
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(why) => {
            logging::error_console(format!("{:#}", why));
            logging::error_file_async(format!("{:?}", why));
            ExitCode::FAILURE
        }
    }
}
