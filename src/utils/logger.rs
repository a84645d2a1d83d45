//! Logger utility for application-wide logging
//!
//! A custom logger that works with the standard log crate, mirroring
//! every message to a log file while keeping the console output
//! filtered to the level the user asked for. The file always receives
//! debug detail so a run can be diagnosed after the fact.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Log, Record, Level, Metadata, LevelFilter};

/// File-and-console logger
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    /// Most verbose level echoed to the console
    console_level: Level,
}

impl Logger {
    /// Creates a new logger writing to `log_file`
    ///
    /// `verbose` raises the console level from Info to Debug; the file
    /// gets Debug either way.
    pub fn new(log_file: &str, verbose: bool) -> io::Result<Self> {
        let file = File::create(Path::new(log_file))?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            console_level: if verbose { Level::Debug } else { Level::Info },
        })
    }

    /// Appends a line to the log file
    pub fn log_line(&self, message: &str) -> io::Result<()> {
        if let Some(file) = &mut *self.file.lock().unwrap() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Initializes the global logger for the log crate
    pub fn init_global_logger(log_file: &str, verbose: bool) -> io::Result<()> {
        let global_logger = Logger::new(log_file, verbose)?;

        // Only set once at startup; a second call is a programming
        // error worth a warning, not a crash
        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(LevelFilter::Debug);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("[{}] {}", record.level(), record.args());
        let _ = self.log_line(&message);

        if record.level() <= self.console_level {
            if record.level() <= Level::Warn {
                eprintln!("{}", message);
            } else {
                println!("{}", message);
            }
        }
    }

    fn flush(&self) {
        // log_line flushes after every write
    }
}
