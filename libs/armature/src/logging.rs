//! Logger facade.
//!
//! One leveled logger is built per process, from a level setting resolved
//! through the configuration binder. Components receive named child loggers
//! ([`ScopedLogger`]) carrying a `prefix` field and optional structured
//! context. Formatting and output are delegated to `tracing-subscriber`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

use crate::error::LogError;
use crate::flags::{FlagSet, Setting};

/// Process-wide logger with its own lifecycle:
/// `new -> init_flags -> activate(level) -> serve -> stop(flush)`.
///
/// Owned by the container and handed to components as [`ScopedLogger`]
/// values; never looked up ambiently.
pub struct AppLogger {
    level: Setting<String>,
    guard: Mutex<Option<WorkerGuard>>,
}

impl AppLogger {
    pub fn new() -> Self {
        Self {
            level: Setting::new("info".to_string()),
            guard: Mutex::new(None),
        }
    }

    pub fn init_flags(&self, flags: &mut FlagSet) {
        flags.string(
            "log-level",
            &self.level,
            "Log level: trace | debug | info | warn | error",
        );
    }

    pub fn level(&self) -> String {
        self.level.get()
    }

    /// Build and install the global subscriber at the resolved level.
    ///
    /// An invalid level is fatal. A subscriber already installed by the host
    /// process (tests, embedding) is benign: the existing one is kept.
    pub fn activate(&self) -> Result<(), LogError> {
        let level_str = self.level.get();
        let level: Level = level_str
            .parse()
            .map_err(|_| LogError::Level(level_str.clone()))?;

        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

        // Debug gets human-readable output, everything else ships JSON.
        // Mirrors the development/production split of the config it replaces.
        let installed = if level >= Level::DEBUG {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(writer)
                .with_target(true)
                .try_init()
                .is_ok()
        } else {
            tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .with_writer(writer)
                .try_init()
                .is_ok()
        };

        if installed {
            *self.guard.lock() = Some(guard);
        }
        Ok(())
    }

    /// Child logger carrying `prefix` as structured context.
    pub fn scoped(&self, prefix: &str) -> ScopedLogger {
        ScopedLogger {
            prefix: Arc::from(prefix),
            context: Arc::new(Vec::new()),
        }
    }

    /// Flush buffered output. Failures are swallowed: shutdown must never be
    /// blocked by a logging sink.
    pub fn stop(&self) {
        let _ = self.guard.lock().take();
    }
}

impl Default for AppLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Named child logger. Cheap to clone and safe to share across components
/// and request-handling tasks; level changes are global, never per-child.
#[derive(Clone)]
pub struct ScopedLogger {
    prefix: Arc<str>,
    context: Arc<Vec<(String, String)>>,
}

impl ScopedLogger {
    /// Fluent structured context. Returns a new child; the receiver keeps
    /// its own context unchanged.
    pub fn with(&self, key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        let mut context = (*self.context).clone();
        context.push((key.into(), value.to_string()));
        Self {
            prefix: self.prefix.clone(),
            context: Arc::new(context),
        }
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.emit(Level::DEBUG, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Level::INFO, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(Level::WARN, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Level::ERROR, msg.as_ref());
    }

    /// Fatal-equivalent severity: logs at error and aborts the process by
    /// panicking. Reserved for programming errors (wiring mistakes), not
    /// recoverable runtime conditions.
    pub fn fatal(&self, msg: impl AsRef<str>) -> ! {
        let msg = msg.as_ref();
        self.emit(Level::ERROR, msg);
        panic!("{}", msg);
    }

    // The event macros need a const level, so dispatch per severity.
    fn emit(&self, level: Level, msg: &str) {
        let context = self.render_context();
        if level == Level::TRACE {
            tracing::trace!(prefix = %self.prefix, context = %context, "{msg}");
        } else if level == Level::DEBUG {
            tracing::debug!(prefix = %self.prefix, context = %context, "{msg}");
        } else if level == Level::INFO {
            tracing::info!(prefix = %self.prefix, context = %context, "{msg}");
        } else if level == Level::WARN {
            tracing::warn!(prefix = %self.prefix, context = %context, "{msg}");
        } else {
            tracing::error!(prefix = %self.prefix, context = %context, "{msg}");
        }
    }

    fn render_context(&self) -> String {
        let mut out = String::new();
        for (k, v) in self.context.iter() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }
}
