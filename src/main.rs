use std::error::Error;
use std::io;
use std::time::Duration;

use entry_encoder::{Field, Format, Level, Logger, LoggerOptions, WriterSink};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Renders a sample access record to stdout.
///
/// Usage: `entry_encoder [text|json|common]`. Without an argument the format
/// comes from `LOG_FORMAT`, defaulting to JSON. Diagnostics of the encoder
/// itself go to stderr, filtered by `RUST_LOG`.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_timer(UtcTime::rfc_3339())
        .with_writer(io::stderr)
        .init();

    let mut options = LoggerOptions::from_env().with_name("demo");
    if let Some(arg) = std::env::args().nth(1) {
        options = options.with_format(arg.parse::<Format>()?);
    }

    let (stdout, _guard) = tracing_appender::non_blocking(io::stdout());
    let logger = Logger::new(&options, WriterSink::new(stdout))?;
    tracing::debug!(format = %options.format, "logger ready");

    let request = logger.with(&[
        Field::new("request-id", "0b2f6c1e"),
        Field::new("remote-address", "127.0.0.1"),
        Field::new("method", "GET"),
        Field::new("protocol", "HTTP/1.1"),
    ])?;
    request.info(
        "request served",
        &[
            Field::new("path", "/health"),
            Field::new("status", 200),
            Field::new("size", 2u64),
            Field::new("duration", Duration::from_micros(1_250)),
        ],
    )?;

    let mut errors = logger.writer(Level::Error);
    io::Write::write_all(&mut errors, b"http: TLS handshake error from 10.0.0.7: EOF\n")?;

    logger.flush()?;
    Ok(())
}
