//! Scalar-to-text conversions shared by every encoder.
//!
//! [`RawAppender`] writes values exactly as the conversions produce them, with
//! no quoting of strings and no escaping. The text encoder renders field
//! values through it; the JSON visitor reuses the same conversions and adds
//! quoting on top.

use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::buffer_pool::Buffer;
use crate::encoder::{
    ArrayEncoder, ArrayMarshaler, EncoderConfig, ObjectMarshaler, PrimitiveArrayEncoder,
};
use crate::error::{EncodeError, Result};
use crate::field::Reflect;
use crate::object_encoder::JsonObjectWriter;

/// The token used in place of a float that has no decimal form.
pub fn special_float_token(v: f64) -> Option<&'static str> {
    if v.is_nan() {
        Some("NaN")
    } else if v == f64::INFINITY {
        Some("+Inf")
    } else if v == f64::NEG_INFINITY {
        Some("-Inf")
    } else {
        None
    }
}

/// Appends `v` in shortest decimal form, or its special-value token.
pub(crate) fn append_f64(buf: &mut Buffer, v: f64) {
    match special_float_token(v) {
        Some(token) => buf.append_str(token),
        None => buf.append_float(v),
    }
}

/// Like [`append_f64`] at 32-bit precision.
pub(crate) fn append_f32(buf: &mut Buffer, v: f32) {
    match special_float_token(f64::from(v)) {
        Some(token) => buf.append_str(token),
        None => buf.append_float32(v),
    }
}

/// Appends `"<re>+<im>i"`, quotes included.
pub(crate) fn append_complex(buf: &mut Buffer, re: f64, im: f64) {
    buf.append_byte(b'"');
    append_f64(buf, re);
    buf.append_byte(b'+');
    append_f64(buf, im);
    buf.append_str("i\"");
}

pub(crate) fn append_complex32(buf: &mut Buffer, re: f32, im: f32) {
    buf.append_byte(b'"');
    append_f32(buf, re);
    buf.append_byte(b'+');
    append_f32(buf, im);
    buf.append_str("i\"");
}

/// Formats a duration the way humans read it: `0s`, `250ns`, `65µs`, `1.5ms`,
/// `2m3.5s`, `1h0m0s`. Trailing fractional zeros are dropped.
///
/// # Examples
///
/// ```
/// # use entry_encoder::primitive::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_micros(65)), "65µs");
/// assert_eq!(format_duration(Duration::from_millis(123_500)), "2m3.5s");
/// assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
/// ```
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", scaled_decimal(nanos, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", scaled_decimal(nanos, 6));
    }

    let secs = d.as_secs();
    let (hours, minutes) = (secs / 3600, secs % 3600 / 60);
    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    let sub_minute = u128::from(secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos());
    let _ = write!(out, "{}s", scaled_decimal(sub_minute, 9));
    out
}

/// `v / 10^scale` as a decimal without trailing fractional zeros.
fn scaled_decimal(v: u128, scale: u32) -> String {
    let div = 10u128.pow(scale);
    let (int, frac) = (v / div, v % div);
    if frac == 0 {
        return int.to_string();
    }
    let digits = format!("{:0width$}", frac, width = scale as usize);
    format!("{}.{}", int, digits.trim_end_matches('0'))
}

/// Default layout for time values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeLayout {
    /// RFC 3339 with whole seconds, `Z` for UTC: `2024-05-01T12:00:00Z`.
    #[default]
    Rfc3339,
    /// RFC 3339 with the fraction the instant needs (0, 3, 6 or 9 digits).
    Rfc3339Nanos,
    /// A `strftime` pattern, validated when parsed.
    Custom(String),
}

impl TimeLayout {
    /// Validates a `strftime` pattern.
    pub fn custom(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(EncodeError::InvalidTimeLayout(pattern));
        }
        Ok(TimeLayout::Custom(pattern))
    }

    pub fn append(&self, buf: &mut Buffer, t: &DateTime<FixedOffset>) {
        match self {
            TimeLayout::Rfc3339 => buf.append_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            TimeLayout::Rfc3339Nanos => {
                buf.append_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TimeLayout::Custom(pattern) => buf.append_display(t.format(pattern)),
        }
    }

    pub fn format(&self, t: &DateTime<FixedOffset>) -> String {
        let mut buf = Buffer::new();
        self.append(&mut buf, t);
        String::from_utf8_lossy(buf.as_bytes()).into_owned()
    }
}

impl FromStr for TimeLayout {
    type Err = EncodeError;

    /// `""` and `rfc3339` select the default, `rfc3339nano` the fractional
    /// form; anything else must be a valid `strftime` pattern.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "rfc3339" => Ok(TimeLayout::Rfc3339),
            "rfc3339nano" | "rfc3339nanos" => Ok(TimeLayout::Rfc3339Nanos),
            _ => TimeLayout::custom(s),
        }
    }
}

/// The primitive appender: writes values unquoted and unescaped.
///
/// Nested arrays and objects are the exception. They are rendered by the JSON
/// visitor into the same buffer, since plain text has no nested form.
pub struct RawAppender<'a> {
    config: &'a EncoderConfig,
    buf: &'a mut Buffer,
}

impl<'a> RawAppender<'a> {
    pub fn new(config: &'a EncoderConfig, buf: &'a mut Buffer) -> Self {
        Self { config, buf }
    }
}

impl PrimitiveArrayEncoder for RawAppender<'_> {
    fn append_bool(&mut self, v: bool) {
        self.buf.append_bool(v);
    }

    fn append_byte_string(&mut self, v: &[u8]) {
        self.buf.append_bytes(v);
    }

    fn append_complex128(&mut self, re: f64, im: f64) {
        append_complex(self.buf, re, im);
    }

    fn append_complex64(&mut self, re: f32, im: f32) {
        append_complex32(self.buf, re, im);
    }

    fn append_float64(&mut self, v: f64) {
        append_f64(self.buf, v);
    }

    fn append_float32(&mut self, v: f32) {
        append_f32(self.buf, v);
    }

    fn append_int64(&mut self, v: i64) {
        self.buf.append_int(v);
    }

    fn append_uint64(&mut self, v: u64) {
        self.buf.append_uint(v);
    }

    fn append_string(&mut self, v: &str) {
        self.buf.append_str(v);
    }

    narrow_appends!();
}

impl ArrayEncoder for RawAppender<'_> {
    fn append_duration(&mut self, v: Duration) {
        let config = self.config;
        match &config.encode_duration {
            Some(encode) => encode(v, self),
            None => self.buf.append_str(&format_duration(v)),
        }
    }

    /// Times keep their own offset here; only the JSON path moves them to UTC.
    fn append_time(&mut self, v: DateTime<FixedOffset>) {
        let config = self.config;
        match &config.encode_time {
            Some(encode) => encode(v, self),
            None => config.time_layout.append(self.buf, &v),
        }
    }

    fn append_array(&mut self, v: &dyn ArrayMarshaler) -> Result<()> {
        self.buf.append_byte(b'[');
        let res = v.marshal_log_array(&mut JsonObjectWriter::new(self.config, self.buf));
        self.buf.append_byte(b']');
        res
    }

    fn append_object(&mut self, v: &dyn ObjectMarshaler) -> Result<()> {
        self.buf.append_byte(b'{');
        let res = v.marshal_log_object(&mut JsonObjectWriter::new(self.config, self.buf));
        self.buf.append_byte(b'}');
        res
    }

    fn append_reflected(&mut self, v: &dyn Reflect) -> Result<()> {
        let json = v.to_json()?;
        self.buf.append_bytes(&json);
        Ok(())
    }
}
