//! Minimal timestamped logging for the emulator workspace. One global sink,
//! installed once, written with the time elapsed since installation.

use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<Logger> = OnceCell::new();

/// Where log lines go: the console or a file under the temp directory.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum LogKind {
    /// Log to stdout, the default choice.
    STDOUT,

    /// Log to /tmp/satsuma-<timestamp>.log
    FILE,
}

struct Logger {
    sink: Mutex<Box<dyn Write + Send>>,
    started: Instant,
}

impl Logger {
    fn new(kind: LogKind) -> Self {
        let sink: Box<dyn Write + Send> = match kind {
            LogKind::STDOUT => Box::new(io::stdout()),
            LogKind::FILE => {
                let filename = format!("satsuma-{}.log", Utc::now().timestamp());
                let path = std::env::temp_dir().join(filename);
                Box::new(File::create(path).unwrap())
            }
        };
        Self {
            sink: Mutex::new(sink),
            started: Instant::now(),
        }
    }

    fn write<T>(&self, data: T)
    where
        T: std::fmt::Display,
    {
        let elapsed = self.started.elapsed();
        let seconds = elapsed.as_secs();
        if let Ok(mut sink) = self.sink.lock() {
            writeln!(
                sink,
                "[{:02}:{:02}:{:02}.{:03}] {data}",
                seconds / 3600,
                (seconds / 60) % 60,
                seconds % 60,
                elapsed.subsec_millis()
            )
            .ok();
        }
    }
}

/// Installs the global logger; later calls are ignored.
pub fn init_logger(kind: LogKind) {
    LOGGER.set(Logger::new(kind)).ok();
}

/// Logs one line with the elapsed time since the logger was installed.
/// A no-op until [`init_logger`] has been called.
pub fn log<T>(data: T)
where
    T: std::fmt::Display,
{
    if let Some(logger) = LOGGER.get() {
        logger.write(data);
    }
}
