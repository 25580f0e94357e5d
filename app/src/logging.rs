use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Where console logs go. The terminal client keeps stdout for its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    Stderr,
}

/// Console plus a daily rolling file in `dir`. `RUST_LOG` wins over `level`;
/// `LOG_FORMAT=json` switches the console to JSON lines. Keep the guard
/// alive for as long as logs should be flushed.
pub fn init(
    level: &str,
    dir: &Path,
    file_name: &str,
    console: Console,
) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, file_name));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let text_out = (!json && console == Console::Stdout).then(|| fmt::layer());
    let text_err = (!json && console == Console::Stderr)
        .then(|| fmt::layer().with_writer(std::io::stderr));
    let json_out = (json && console == Console::Stdout).then(|| fmt::layer().json());
    let json_err =
        (json && console == Console::Stderr).then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(text_out)
        .with(text_err)
        .with(json_out)
        .with(json_err)
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    Ok(guard)
}
