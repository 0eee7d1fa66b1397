//! Human-readable, optionally colored, single-line encoder.
//!
//! ```text
//! INFO  served                                       status=200 path=/ duration=65µs
//! ```
//!
//! The level name is wrapped in an ANSI color picked by severity. Field values
//! are written with the raw conversions of [`RawAppender`]; nothing is quoted
//! or escaped, so a value containing spaces reads as-is.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset};

use crate::buffer_pool::Buffer;
use crate::encoder::{
    apply_fields, finish, ArrayEncoder, ArrayMarshaler, Encoder, EncoderConfig, ObjectEncoder,
    ObjectMarshaler, PrimitiveArrayEncoder,
};
use crate::entry::Entry;
use crate::error::{PartialEncode, Result};
use crate::field::{Field, Reflect};
use crate::level::Level;
use crate::primitive::RawAppender;

/// Error and above.
pub const RED: &str = "\x1b[31m";
/// Warnings.
pub const YELLOW: &str = "\x1b[33m";
/// Debug and info.
pub const CYAN: &str = "\x1b[36m";
pub const RESET: &str = "\x1b[0m";

/// Width the message column is padded or truncated to.
const MESSAGE_WIDTH: usize = 44;

/// Color code for the level name.
pub fn level_color(level: Level) -> &'static str {
    match level {
        Level::Debug | Level::Info => CYAN,
        Level::Warn => YELLOW,
        Level::Error | Level::DPanic | Level::Panic | Level::Fatal => RED,
    }
}

/// Encodes entries as `LEVEL message key=value key=value ` lines.
///
/// Context added through the [`ObjectEncoder`] methods is kept as rendered
/// bytes and copied after the header of every entry. Each field, context or
/// not, ends with a single space.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{Encoder, EncoderConfig, Entry, Field, Level, ObjectEncoder, TextEncoder};
/// let mut enc = TextEncoder::new(EncoderConfig::default()).without_color();
/// enc.add_string("svc", "api");
///
/// let buf = enc
///     .encode_entry(&Entry::new(Level::Warn, "slow"), &[Field::new("ms", 812)])
///     .unwrap();
/// assert_eq!(buf.as_bytes(), format!("WARN {:<44} svc=api ms=812 \n", "slow").as_bytes());
/// ```
pub struct TextEncoder {
    config: Arc<EncoderConfig>,
    buf: Buffer,
    colored: bool,
}

impl TextEncoder {
    /// A text encoder that colors the level name.
    ///
    /// # Arguments
    ///
    /// * `config` - Shared settings: time and duration formatting plus the
    ///   buffer pool. The JSON envelope keys are not used.
    pub fn new(config: impl Into<Arc<EncoderConfig>>) -> Self {
        let config = config.into();
        let buf = config.pool.get();
        Self {
            config,
            buf,
            colored: true,
        }
    }

    /// Turns level coloring off, for sinks that are not terminals.
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// An encoder with the same configuration and no context.
    pub fn fresh_sibling(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            buf: self.config.pool.get(),
            colored: self.colored,
        }
    }

    /// The context accumulated so far.
    pub fn fragment(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    /// Level name, colored if enabled, then the message padded or cut to
    /// [`MESSAGE_WIDTH`] between single spaces.
    fn add_header(&mut self, entry: &Entry) {
        let name = entry.level.as_upper_str();
        if self.colored {
            self.buf.append_str(level_color(entry.level));
            self.buf.append_str(name);
            self.buf.append_str(RESET);
        } else {
            self.buf.append_str(name);
        }
        self.buf.append_display(format_args!(
            " {:<width$.width$} ",
            entry.message,
            width = MESSAGE_WIDTH
        ));
    }

    /// Writes `key=`, the value and the trailing space.
    ///
    /// # Arguments
    ///
    /// * `key` - Field name, written as-is
    /// * `write` - Renders the value through the raw appender
    fn add_field(&mut self, key: &str, write: impl FnOnce(&mut RawAppender<'_>)) {
        self.buf.append_str(key);
        self.buf.append_byte(b'=');
        write(&mut RawAppender::new(&self.config, &mut self.buf));
        self.buf.append_byte(b' ');
    }

    /// Like [`add_field`](Self::add_field) for values that can fail. On
    /// failure nothing of the field stays in the buffer.
    fn try_add_field(
        &mut self,
        key: &str,
        write: impl FnOnce(&mut RawAppender<'_>) -> Result<()>,
    ) -> Result<()> {
        let mark = self.buf.len();
        self.buf.append_str(key);
        self.buf.append_byte(b'=');
        let res = write(&mut RawAppender::new(&self.config, &mut self.buf));
        match res {
            Ok(()) => self.buf.append_byte(b' '),
            Err(_) => self.buf.truncate(mark),
        }
        res
    }
}

/// The carrying clone: the context bytes are copied into a buffer of the
/// clone's own.
impl Clone for TextEncoder {
    fn clone(&self) -> Self {
        let mut sibling = self.fresh_sibling();
        sibling.buf.append_bytes(self.buf.as_bytes());
        sibling
    }
}

/// Arrays and objects are written as compact JSON after `key=`.
impl ObjectEncoder for TextEncoder {
    fn add_array(&mut self, key: &str, v: &dyn ArrayMarshaler) -> Result<()> {
        self.try_add_field(key, |a| a.append_array(v))
    }

    fn add_object(&mut self, key: &str, v: &dyn ObjectMarshaler) -> Result<()> {
        self.try_add_field(key, |a| a.append_object(v))
    }

    /// Standard padded base64 between double quotes.
    fn add_binary(&mut self, key: &str, v: &[u8]) {
        let encoded = STANDARD.encode(v);
        self.add_field(key, |a| {
            a.append_string("\"");
            a.append_string(&encoded);
            a.append_string("\"");
        })
    }

    fn add_byte_string(&mut self, key: &str, v: &[u8]) {
        self.add_field(key, |a| a.append_byte_string(v))
    }

    fn add_bool(&mut self, key: &str, v: bool) {
        self.add_field(key, |a| a.append_bool(v))
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.add_field(key, |a| a.append_complex128(re, im))
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.add_field(key, |a| a.append_complex64(re, im))
    }

    fn add_duration(&mut self, key: &str, v: Duration) {
        self.add_field(key, |a| a.append_duration(v))
    }

    fn add_float64(&mut self, key: &str, v: f64) {
        self.add_field(key, |a| a.append_float64(v))
    }

    fn add_float32(&mut self, key: &str, v: f32) {
        self.add_field(key, |a| a.append_float32(v))
    }

    fn add_int64(&mut self, key: &str, v: i64) {
        self.add_field(key, |a| a.append_int64(v))
    }

    fn add_uint64(&mut self, key: &str, v: u64) {
        self.add_field(key, |a| a.append_uint64(v))
    }

    fn add_string(&mut self, key: &str, v: &str) {
        self.add_field(key, |a| a.append_string(v))
    }

    fn add_time(&mut self, key: &str, v: DateTime<FixedOffset>) {
        self.add_field(key, |a| a.append_time(v))
    }

    /// Serializes before writing the key, so a rejected value leaves nothing
    /// behind.
    fn add_reflected(&mut self, key: &str, v: &dyn Reflect) -> Result<()> {
        let json = v.to_json()?;
        self.add_field(key, |a| a.append_byte_string(&json));
        Ok(())
    }

    fn open_namespace(&mut self, _key: &str) {}

    narrow_adds!();
}

impl Encoder for TextEncoder {
    fn carrying_clone(&self) -> Box<dyn Encoder> {
        Box::new(self.clone())
    }

    /// Header, then the bound context, then `fields`, then a newline.
    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> std::result::Result<Buffer, PartialEncode> {
        let mut line = self.fresh_sibling();
        line.add_header(entry);
        line.buf.append_bytes(self.buf.as_bytes());
        let errors = apply_fields(&mut line, fields);
        line.buf.append_byte(b'\n');
        finish(line.buf, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_by_severity() {
        assert_eq!(level_color(Level::Debug), CYAN);
        assert_eq!(level_color(Level::Info), CYAN);
        assert_eq!(level_color(Level::Warn), YELLOW);
        for level in [Level::Error, Level::DPanic, Level::Panic, Level::Fatal] {
            assert_eq!(level_color(level), RED);
        }
    }

    #[test]
    fn test_header_without_color() {
        let enc = TextEncoder::new(EncoderConfig::default()).without_color();
        let buf = enc.encode_entry(&Entry::new(Level::Warn, "disk low"), &[]).unwrap();
        let line = String::from_utf8(buf.into_vec()).unwrap();
        assert_eq!(line, format!("WARN {:<44} \n", "disk low"));
    }

    #[test]
    fn test_context_precedes_entry_fields() {
        let mut enc = TextEncoder::new(EncoderConfig::default()).without_color();
        enc.add_string("svc", "api");
        let buf = enc
            .encode_entry(&Entry::new(Level::Info, ""), &[Field::new("n", 1u8)])
            .unwrap();
        assert!(buf.as_bytes().ends_with(b" svc=api n=1 \n"));
    }
}
