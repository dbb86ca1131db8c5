//! `log` backend for the command line: `HH:MM:SS LEVEL target: message` on
//! stderr, level colored when stderr is a terminal.
use std::io::{IsTerminal, Write};
use std::sync::OnceLock;

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

struct StderrLogger {
    color: bool,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record, &chrono::Local::now().format("%H:%M:%S").to_string(), self.color);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn paint_level(level: Level, color: bool) -> String {
    let name = format!("{:<5}", level.as_str());
    if !color {
        return name;
    }
    match level {
        Level::Error => name.red().bold().to_string(),
        Level::Warn => name.yellow().bold().to_string(),
        Level::Info => name.green().to_string(),
        Level::Debug => name.blue().to_string(),
        Level::Trace => name.bright_black().to_string(),
    }
}

fn format_record(record: &Record<'_>, time: &str, color: bool) -> String {
    let time = if color { time.bright_black().to_string() } else { time.to_string() };
    format!("{time} {} {}: {}", paint_level(record.level(), color), record.target(), record.args())
}

/// Level for `-v`/`-q` counts; warnings show by default.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the logger. Later calls only adjust the level.
pub fn init(level: LevelFilter) {
    let logger = LOGGER.get_or_init(|| StderrLogger { color: std::io::stderr().is_terminal() });
    let fresh = log::set_logger(logger).is_ok();
    log::set_max_level(level);
    if !fresh {
        log::debug!("logger already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0, false), LevelFilter::Warn);
        assert_eq!(level_for(2, false), LevelFilter::Debug);
        assert_eq!(level_for(7, false), LevelFilter::Trace);
        assert_eq!(level_for(3, true), LevelFilter::Error);
    }

    #[test]
    fn plain_record_layout() {
        let line = format_record(
            &Record::builder()
                .args(format_args!("loaded {} schema(s)", 2))
                .level(Level::Info)
                .target("ssc_gen::schema")
                .build(),
            "12:30:01",
            false,
        );
        assert_eq!(line, "12:30:01 INFO  ssc_gen::schema: loaded 2 schema(s)");
    }
}
