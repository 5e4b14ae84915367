//! Logging setup: env_logger, routed through indicatif when a TTY is attached

use indicatif::MultiProgress;

/// Padded label and ANSI color for a log level.
fn level_label(level: log::Level) -> (&'static str, &'static str) {
    match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    }
}

/// Logger that prints through `MultiProgress` so lines don't tear spinners.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        log::Log::enabled(&self.inner, metadata)
    }

    fn log(&self, record: &log::Record) {
        if !log::Log::enabled(&self.inner, record.metadata()) {
            return;
        }
        let (label, ansi) = level_label(record.level());
        let line = format!("[{ansi}{label}\x1b[0m] {}", record.args());
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        log::Log::flush(&self.inner);
    }
}

/// Default filter for the given verbosity flags; `RUST_LOG` still wins.
pub fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize logging. Pass `multi` in TTY mode to bridge through indicatif.
///
/// Calling it twice is harmless; the second logger is ignored.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .build();
        let max_level = logger.filter();
        if log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone()))).is_ok() {
            log::set_max_level(max_level);
        }
    } else {
        // Non-TTY: no ANSI colors, timestamp for log aggregation
        let _ = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                let (label, _) = level_label(record.level());
                writeln!(buf, "{} [{label}] {}", buf.timestamp_millis(), record.args())
            })
            .try_init();
    }
}
