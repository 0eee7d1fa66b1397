//! The calling facade: encode an entry, hand it to a sink.

use std::fmt;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::LoggerOptions;
use crate::encoder::{apply_fields, Encoder};
use crate::entry::Entry;
use crate::error::{EncodeError, FieldError, Result};
use crate::field::Field;
use crate::level::Level;

/// Destination for finalized entries.
///
/// Implementations decide where encoded bytes go: a file, stdout, a socket or
/// an in-memory collector for tests. The logger never buffers on its own, so
/// every call receives exactly one complete record.
///
/// # Usage
///
/// ```
/// # use entry_encoder::Sink;
/// # use std::io;
/// # use parking_lot::Mutex;
/// struct Collect(Mutex<Vec<u8>>);
///
/// impl Sink for Collect {
///     fn write_entry(&self, entry: &[u8]) -> io::Result<()> {
///         self.0.lock().extend_from_slice(entry);
///         Ok(())
///     }
/// }
/// ```
pub trait Sink: Send + Sync {
    /// Writes one encoded record.
    ///
    /// # Arguments
    ///
    /// * `entry` - The record bytes, terminator included
    fn write_entry(&self, entry: &[u8]) -> io::Result<()>;

    /// Flushes anything the sink holds back. The default does nothing.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// A [`Sink`] over any `io::Write`, serialized by a mutex.
pub struct WriterSink<W> {
    inner: Mutex<W>,
}

impl<W: io::Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: io::Write + Send> Sink for WriterSink<W> {
    fn write_entry(&self, entry: &[u8]) -> io::Result<()> {
        self.inner.lock().write_all(entry)
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// Encodes entries with a template encoder and writes them to a sink.
///
/// A `Logger` is cheap to clone and safe to share between threads: every
/// entry is rendered by a fresh per-entry encoder, so the template is only
/// ever read. [`with`](Self::with) derives a logger whose template carries
/// additional bound fields.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{Field, Format, Logger, LoggerOptions, WriterSink};
/// let opts = LoggerOptions::default().with_format(Format::Clf);
/// let logger = Logger::new(&opts, WriterSink::new(Vec::new())).unwrap();
///
/// let request = logger
///     .with(&[Field::new("request-id", "abc"), Field::new("method", "GET")])
///     .unwrap();
/// request
///     .info("", &[Field::new("path", "/"), Field::new("status", 200)])
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct Logger {
    name: Option<String>,
    level: Level,
    encoder: Arc<dyn Encoder>,
    sink: Arc<dyn Sink>,
}

impl Logger {
    /// Creates a logger from options, failing on an unsupported format or
    /// time layout.
    ///
    /// # Arguments
    ///
    /// * `options` - Format, level, time layout and name
    /// * `sink` - Where finalized entries are written
    pub fn new(options: &LoggerOptions, sink: impl Sink + 'static) -> Result<Self> {
        let encoder = options.encoder()?;
        Ok(Self {
            name: options.name.clone(),
            level: options.level,
            encoder: Arc::from(encoder),
            sink: Arc::new(sink),
        })
    }

    /// Creates a logger around an already built template encoder.
    pub fn from_encoder(encoder: Box<dyn Encoder>, level: Level, sink: impl Sink + 'static) -> Self {
        Self {
            name: None,
            level,
            encoder: Arc::from(encoder),
            sink: Arc::new(sink),
        }
    }

    /// Returns a logger whose entries all carry `fields` ahead of their own.
    ///
    /// The template is copied together with the context it already has, so
    /// `self` is left untouched.
    ///
    /// # Errors
    ///
    /// Fails on the first field the encoder rejects.
    pub fn with(&self, fields: &[Field]) -> std::result::Result<Logger, FieldError> {
        let mut encoder = self.encoder.carrying_clone();
        if let Some(err) = apply_fields(&mut *encoder, fields).into_iter().next() {
            return Err(err);
        }
        Ok(Self {
            name: self.name.clone(),
            level: self.level,
            encoder: Arc::from(encoder),
            sink: Arc::clone(&self.sink),
        })
    }

    /// Encodes one entry and writes it to the sink.
    ///
    /// Fields that cannot be encoded are left out but the entry is still
    /// written; the missing fields are then reported as
    /// [`EncodeError::Fields`].
    ///
    /// # Arguments
    ///
    /// * `level` - Severity of the entry
    /// * `message` - The entry message, may be empty
    /// * `fields` - Entry fields, written after the bound ones
    pub fn log(&self, level: Level, message: &str, fields: &[Field]) -> Result<()> {
        let entry = Entry::new(level, message);
        match self.encoder.encode_entry(&entry, fields) {
            Ok(buf) => {
                self.sink.write_entry(buf.as_bytes())?;
                Ok(())
            }
            Err(partial) => {
                tracing::warn!(%partial, "writing entry with fields left out");
                self.sink.write_entry(partial.buffer.as_bytes())?;
                Err(EncodeError::Fields(partial.errors))
            }
        }
    }

    pub fn debug(&self, message: &str, fields: &[Field]) -> Result<()> {
        self.log(Level::Debug, message, fields)
    }

    pub fn info(&self, message: &str, fields: &[Field]) -> Result<()> {
        self.log(Level::Info, message, fields)
    }

    pub fn warn(&self, message: &str, fields: &[Field]) -> Result<()> {
        self.log(Level::Warn, message, fields)
    }

    pub fn error(&self, message: &str, fields: &[Field]) -> Result<()> {
        self.log(Level::Error, message, fields)
    }

    /// Logs at fatal level. The process keeps running; exiting is up to the
    /// caller.
    pub fn fatal(&self, message: &str, fields: &[Field]) -> Result<()> {
        self.log(Level::Fatal, message, fields)
    }

    /// Logs a message built from `format_args!`, with no fields.
    ///
    /// The message is only rendered here, so callers skip the intermediate
    /// `String` of a `format!`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use entry_encoder::{Level, Logger, LoggerOptions, WriterSink};
    /// let logger = Logger::new(&LoggerOptions::default(), WriterSink::new(Vec::new())).unwrap();
    /// logger.log_fmt(Level::Warn, format_args!("disk {}% full", 91)).unwrap();
    /// logger.error_fmt(format_args!("retrying in {}s", 5)).unwrap();
    /// ```
    pub fn log_fmt(&self, level: Level, args: fmt::Arguments<'_>) -> Result<()> {
        match args.as_str() {
            Some(message) => self.log(level, message, &[]),
            None => self.log(level, &args.to_string(), &[]),
        }
    }

    pub fn debug_fmt(&self, args: fmt::Arguments<'_>) -> Result<()> {
        self.log_fmt(Level::Debug, args)
    }

    pub fn info_fmt(&self, args: fmt::Arguments<'_>) -> Result<()> {
        self.log_fmt(Level::Info, args)
    }

    pub fn warn_fmt(&self, args: fmt::Arguments<'_>) -> Result<()> {
        self.log_fmt(Level::Warn, args)
    }

    pub fn error_fmt(&self, args: fmt::Arguments<'_>) -> Result<()> {
        self.log_fmt(Level::Error, args)
    }

    /// See [`fatal`](Self::fatal).
    pub fn fatal_fmt(&self, args: fmt::Arguments<'_>) -> Result<()> {
        self.log_fmt(Level::Fatal, args)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }

    /// An `io::Write` that logs each write as one entry at `level`.
    ///
    /// Useful for handing the logger to code that only knows how to write
    /// lines, such as an HTTP server's error log.
    pub fn writer(&self, level: Level) -> LogWriter {
        LogWriter {
            logger: self.clone(),
            level,
        }
    }

    /// Installs this logger as the `log` crate's global logger.
    pub fn init_log(self) -> std::result::Result<(), log::SetLoggerError> {
        let max = log::LevelFilter::from(self.level);
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max);
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        Level::from(metadata.level()) >= self.level
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Err(err) = self.log_fmt(record.level().into(), *record.args()) {
            tracing::warn!(%err, log_target = record.target(), "log record dropped");
        }
    }

    fn flush(&self) {
        if let Err(err) = self.sink.flush() {
            tracing::warn!(%err, "flushing log sink failed");
        }
    }
}

/// Adapter returned by [`Logger::writer`].
///
/// Each `write` call becomes one entry: the bytes, minus a trailing newline,
/// are the message, and the logger name is attached as a `name` field.
#[derive(Debug, Clone)]
pub struct LogWriter {
    logger: Logger,
    level: Level,
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let message = text.strip_suffix('\n').unwrap_or(&text);
        let fields: Vec<Field> = self
            .logger
            .name()
            .map(|name| Field::new("name", name))
            .into_iter()
            .collect();
        match self.logger.log(self.level, message, &fields) {
            Ok(()) => Ok(buf.len()),
            Err(EncodeError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.logger.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Format;

    #[derive(Default)]
    struct Collect(Mutex<Vec<u8>>);

    impl Sink for Arc<Collect> {
        fn write_entry(&self, entry: &[u8]) -> io::Result<()> {
            self.0.lock().extend_from_slice(entry);
            Ok(())
        }
    }

    #[test]
    fn test_with_does_not_touch_parent() {
        let out = Arc::new(Collect::default());
        let opts = LoggerOptions::default().with_format(Format::Clf);
        let parent = Logger::new(&opts, Arc::clone(&out)).unwrap();
        let child = parent.with(&[Field::new("method", "GET")]).unwrap();

        child.info("", &[Field::new("status", 200)]).unwrap();
        parent.info("", &[Field::new("status", 500)]).unwrap();

        let text = String::from_utf8(out.0.lock().clone()).unwrap();
        assert_eq!(text, "- - - - - - \"GET - -\" 200 -\n- - - - - - \"- - -\" 500 -\n");
    }

    #[test]
    fn test_writer_adds_name() {
        use std::io::Write as _;

        let out = Arc::new(Collect::default());
        let opts = LoggerOptions::default()
            .with_format(Format::Clf)
            .with_name("http");
        let logger = Logger::new(&opts, Arc::clone(&out)).unwrap();
        let mut w = logger.writer(Level::Error);
        assert_eq!(w.write(b"tls handshake error\n").unwrap(), 20);

        let text = String::from_utf8(out.0.lock().clone()).unwrap();
        assert_eq!(text, "tls handshake error\n- - http - - - \"- - -\" - -\n");
    }
}
