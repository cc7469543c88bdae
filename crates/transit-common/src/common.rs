// common.rs — console output routing

/*
Copyright (C) 1997-2001 Id Software, Inc.

This program is free software; you can redistribute it and/or
modify it under the terms of the GNU General Public License
as published by the Free Software Foundation; either version 2
of the License, or (at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

See the GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program; if not, write to the Free Software
Foundation, Inc., 59 Temple Place - Suite 330, Boston, MA  02111-1307, USA.
*/

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::RwLock;

/// Receives finished console lines (newline included).
pub type PrintSink = Box<dyn Fn(&str) + Send + Sync>;

/// `log` backend that writes to the host console.
///
/// Warnings and errors are always printed, info is printed as plain console
/// text, and debug/trace records are developer messages: they only reach the
/// console while the developer level is at least 1 (debug) or 2 (trace).
pub struct ConsoleLogger {
    sink: RwLock<Option<PrintSink>>,
    developer: AtomicI32,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(None),
            developer: AtomicI32::new(0),
        }
    }

    /// Routes output through `sink`. With no sink, lines go to stdout.
    pub fn set_sink(&self, sink: PrintSink) {
        *self.sink.write() = Some(sink);
    }

    pub fn set_developer(&self, level: i32) {
        self.developer.store(level, Ordering::Relaxed);
    }

    pub fn developer(&self) -> i32 {
        self.developer.load(Ordering::Relaxed)
    }

    pub fn com_printf(&self, msg: &str) {
        match self.sink.read().as_ref() {
            Some(sink) => sink(msg),
            None => print!("{}", msg),
        }
    }

    fn format_record(record: &Record) -> String {
        match record.level() {
            Level::Error => format!("ERROR: {}\n", record.args()),
            Level::Warn => format!("WARNING: {}\n", record.args()),
            _ => format!("{}\n", record.args()),
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match metadata.level() {
            Level::Error | Level::Warn | Level::Info => true,
            Level::Debug => self.developer() >= 1,
            Level::Trace => self.developer() >= 2,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.com_printf(&Self::format_record(record));
    }

    fn flush(&self) {}
}

/// Forwards to a shared `ConsoleLogger` so the caller can keep a handle
/// for changing the sink and developer level after installation.
struct SharedLogger(Arc<ConsoleLogger>);

impl Log for SharedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.0.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.0.log(record);
    }

    fn flush(&self) {
        self.0.flush();
    }
}

/// Install `logger` as the process logger.
///
/// Returns false if a logger was already installed; that is not an error,
/// hosts and tests may call this more than once.
pub fn init_console_logger(logger: Arc<ConsoleLogger>) -> bool {
    if log::set_boxed_logger(Box::new(SharedLogger(logger))).is_err() {
        return false;
    }
    log::set_max_level(LevelFilter::Trace);
    true
}
