use chrono::Local;
use log::LevelFilter;
use std::io::Write;

/// Resolve the log level: explicit argument, then `RUST_LOG`, then `info`
pub fn resolve_level(level: Option<&str>) -> LevelFilter {
    level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(LevelFilter::Info)
}

/// Install the global logger. Call once, from `main`.
pub fn init_logging(level: Option<&str>) {
    let log_level = resolve_level(level);
    env_logger::Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
    log::debug!("Logger initialized (level: {})", log_level);
}
