use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
};

use chrono::{format::DelayedFormat, Local};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 單次寫檔前累積的緩衝大小
const FLUSH_THRESHOLD: usize = 2048;

pub struct Logger {
    info_writer: Sender<String>,
    warn_writer: Sender<String>,
    error_writer: Sender<String>,
    debug_writer: Sender<String>,
}

impl Logger {
    /// 建立具名的日誌，每個等級各自寫入 `log/<日期>_<name>_<level>.log`
    pub fn new(log_name: &str) -> Self {
        Logger {
            info_writer: Self::create_writer(log_name, log::Level::Info),
            warn_writer: Self::create_writer(log_name, log::Level::Warn),
            error_writer: Self::create_writer(log_name, log::Level::Error),
            debug_writer: Self::create_writer(log_name, log::Level::Debug),
        }
    }

    pub fn info(&self, log: String) {
        self.send(log, &self.info_writer);
    }

    pub fn warn(&self, log: String) {
        self.send(log, &self.warn_writer);
    }

    pub fn error(&self, log: String) {
        self.send(log, &self.error_writer);
    }

    pub fn debug(&self, log: String) {
        self.send(log, &self.debug_writer);
    }

    fn send(&self, msg: String, writer: &Sender<String>) {
        if let Err(why) = writer.send(msg) {
            error_console(why.to_string());
        }
    }

    fn create_writer(log_name: &str, level: log::Level) -> Sender<String> {
        let (tx, rx) = unbounded::<String>();
        let file_name = format!("{}_{}", log_name, level.as_str().to_lowercase());

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let log_path = match Self::get_log_path(&file_name) {
                Some(path) => path,
                None => {
                    error_console(format!("Failed to create log directory for {}", file_name));
                    return;
                }
            };

            let file = match OpenOptions::new().create(true).append(true).open(&log_path) {
                Ok(file) => file,
                Err(why) => {
                    error_console(format!(
                        "Failed to open log file({}) because {:?}",
                        log_path.display(),
                        why
                    ));
                    return;
                }
            };

            let mut writer = BufWriter::new(file);
            let mut line = String::with_capacity(FLUSH_THRESHOLD);

            for received in &rx {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    Local::now().format("%F %X%.6f"),
                    level,
                    received
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= FLUSH_THRESHOLD {
                    if let Err(why) = writer.write_all(line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    if let Err(why) = writer.flush() {
                        error_console(format!("Failed to flush log file. because:{:#?}", why));
                    }

                    line.clear();
                }
            }
        });

        tx
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = Path::new("log");

        if !path.exists() {
            fs::create_dir_all(path).ok()?;
        }

        let mut log_path = PathBuf::from(path);
        log_path.push(format!("{}_{}.log", Local::now().format("%Y-%m-%d"), name));

        Some(log_path)
    }
}

pub fn info_file_async(log: impl Into<String>) {
    LOGGER.info(log.into());
}

pub fn warn_file_async(log: impl Into<String>) {
    LOGGER.warn(log.into());
}

pub fn error_file_async(log: impl Into<String>) {
    LOGGER.error(log.into());
}

pub fn debug_file_async(log: impl Into<String>) {
    LOGGER.debug(log.into());
}

pub fn info_console(log: impl AsRef<str>) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log.as_ref()
    );
}

pub fn error_console(log: impl AsRef<str>) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log.as_ref()
    );
}
