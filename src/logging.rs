//! Process-wide logger behind the `log` facade.
//!
//! Lines go to stderr and the most recent ones are kept in a bounded buffer so
//! a caller (CLI, admin surface) can show what just happened.

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct BufferedLogger {
    buffer: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl BufferedLogger {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn push(&self, line: String) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push_back(line);
            while buf.len() > self.capacity {
                buf.pop_front();
            }
        }
    }
}

static LOGGER: OnceCell<BufferedLogger> = OnceCell::new();

impl log::Log for BufferedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format!(
                "{} {} [{}] {}",
                chrono::Utc::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            );
            eprintln!("{}", line);
            self.push(line);
        }
    }

    fn flush(&self) {}
}

/// Install the logger. Fails if another logger is already installed.
pub fn init(level: LevelFilter, capacity: usize) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| BufferedLogger::new(capacity.max(1)));
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Snapshot of the buffered log lines, oldest first.
pub fn recent_logs() -> Vec<String> {
    LOGGER
        .get()
        .and_then(|l| l.buffer.lock().ok().map(|buf| buf.iter().cloned().collect()))
        .unwrap_or_default()
}
