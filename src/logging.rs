//! Console logging.

use std::io::Write;

use colored::Colorize;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};

fn colored_level(level: Level) -> String {
    let name = format!("{level:<5}");
    match level {
        Level::Error => name.red().bold().to_string(),
        Level::Warn => name.yellow().bold().to_string(),
        Level::Info => name.green().to_string(),
        Level::Debug => name.blue().to_string(),
        Level::Trace => name.dimmed().to_string(),
    }
}

/// Installs the global logger. `RUST_LOG` still wins over `level` when set.
pub fn init(level: LevelFilter) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(level.as_str()));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            colored_level(record.level()),
            record.args()
        )
    });

    if let Err(e) = builder.try_init() {
        eprintln!("Logger already initialized: {e}");
    }
}
