//! Minimal `log` backend writing to the file named by `LOG_FILE`, or to
//! stderr when the variable is unset.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::env;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::sync::Mutex;
use utils::util::timestamp;

struct FileLogger {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut sink = self.sink.lock().unwrap();
        let _ = writeln!(
            sink,
            "[{}] {} {}: {}",
            record.level(),
            timestamp(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = self.sink.lock().unwrap().flush();
    }
}

/// Installs the global logger. Errors opening the log file fall back to
/// stderr.
pub fn init() {
    let sink: Box<dyn Write + Send> = match env::var("LOG_FILE") {
        Ok(path) if !path.is_empty() => {
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Box::new(file),
                Err(e) => {
                    eprintln!("vdisk: cannot open log file {}: {}", path, e);
                    Box::new(io::stderr())
                }
            }
        }
        _ => Box::new(io::stderr()),
    };

    let logger = FileLogger {
        sink: Mutex::new(sink),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}
