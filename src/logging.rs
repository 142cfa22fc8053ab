//! Diagnostics sink.
//!
//! Every store owns a [`Logger`] handed to it through [`Options::logger`].
//! When none is given the messages go to the process-wide `log` logger, so a
//! host that calls `env_logger::init()` sees them without further wiring.
//!
//! [`Options::logger`]: crate::Options::logger

use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::sync::Arc;

/// Target attached to every message emitted by this crate.
pub const TARGET: &str = "blockstore";

/// A cloneable handle to a `log::Log` implementation.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Log>,
}

impl Logger {
    /// Wraps an explicit sink.
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self { sink }
    }

    /// Forwards to whatever logger is installed globally.
    pub fn global() -> Self {
        Self { sink: Arc::new(GlobalSink) }
    }

    /// Emits one message at `level`.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(TARGET).build();
        if !self.sink.enabled(&metadata) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path(Some(module_path!()))
                .build(),
        );
    }

    /// Flushes the sink.
    pub fn flush(&self) {
        self.sink.flush();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}

struct GlobalSink;

impl Log for GlobalSink {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

/// Logs through a [`Logger`] with `format!`-style arguments.
macro_rules! emit {
    ($logger:expr, $level:ident, $($arg:tt)+) => {
        $logger.log(::log::Level::$level, format_args!($($arg)+))
    };
}

pub(crate) use emit;
