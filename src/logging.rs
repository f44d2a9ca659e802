use std::io::Write;

use chrono::Local;
use log::LevelFilter;

/// `%d/%B/%Y:%X`, e.g. `03/February/2018:14:05:09`
const TIMESTAMP: &str = "%d/%B/%Y:%X";

/// Formats one line as `<timestamp> - <pid> - <message>`.
pub fn format_line(message: &std::fmt::Arguments) -> String {
    format!(
        "{} - {} - {}",
        Local::now().format(TIMESTAMP),
        std::process::id(),
        message
    )
}

/// Install the process logger. `RUST_LOG` can still narrow the level;
/// with `enabled == false` nothing is ever printed.
pub fn init(enabled: bool) {
    let mut builder = env_logger::Builder::new();
    builder
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}", format_line(record.args())));

    if enabled {
        builder.filter_level(LevelFilter::Info).parse_default_env();
    } else {
        builder.filter_level(LevelFilter::Off);
    }

    // a second init (tests) keeps the first logger
    let _ = builder.try_init();
}
