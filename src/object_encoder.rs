//! Streaming JSON visitor for keyed and indexed values.
//!
//! [`JsonObjectWriter`] writes straight into a borrowed [`Buffer`]. It keeps
//! no "first element" state: before each key or element it looks at the last
//! byte written and inserts a comma unless that byte opens a container, ends a
//! key, is a comma already, or is a space. That makes it safe to resume on a
//! buffer that already holds a fragment, at any nesting depth.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, Utc};

use crate::buffer_pool::Buffer;
use crate::encoder::{
    ArrayEncoder, ArrayMarshaler, EncoderConfig, ObjectEncoder, ObjectMarshaler,
    PrimitiveArrayEncoder,
};
use crate::error::Result;
use crate::field::Reflect;
use crate::primitive::{append_complex, append_complex32, special_float_token};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Appends `s` JSON-escaped, without surrounding quotes.
///
/// Printable ASCII other than `\` and `"` is copied as-is, as are valid
/// multi-byte sequences. `\`, `"`, newline, carriage return and tab get their
/// two-character escapes, other control bytes become `\u00XX`, and every byte
/// of an invalid UTF-8 sequence becomes `\ufffd`.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{Buffer, object_encoder::append_escaped};
/// let mut buf = Buffer::new();
/// append_escaped(&mut buf, b"a\"b\n\x01\xff");
/// assert_eq!(buf.as_bytes(), br#"a\"b\n\u0001\ufffd"#);
/// ```
pub fn append_escaped(buf: &mut Buffer, s: &[u8]) {
    let mut rest = s;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(_) => {
                append_escaped_valid(buf, rest);
                return;
            }
            Err(e) => {
                let (valid, invalid) = rest.split_at(e.valid_up_to());
                append_escaped_valid(buf, valid);
                let bad = e.error_len().unwrap_or(invalid.len());
                for _ in 0..bad {
                    buf.append_str("\\ufffd");
                }
                rest = &invalid[bad..];
            }
        }
    }
}

/// Escapes bytes already known to be valid UTF-8.
fn append_escaped_valid(buf: &mut Buffer, s: &[u8]) {
    let mut start = 0;
    for (i, &b) in s.iter().enumerate() {
        if b >= 0x20 && b != b'\\' && b != b'"' {
            continue;
        }
        buf.append_bytes(&s[start..i]);
        match b {
            b'\\' | b'"' => {
                buf.append_byte(b'\\');
                buf.append_byte(b);
            }
            b'\n' => buf.append_str("\\n"),
            b'\r' => buf.append_str("\\r"),
            b'\t' => buf.append_str("\\t"),
            _ => {
                buf.append_str("\\u00");
                buf.append_byte(HEX[usize::from(b >> 4)]);
                buf.append_byte(HEX[usize::from(b & 0xF)]);
            }
        }
        start = i + 1;
    }
    buf.append_bytes(&s[start..]);
}

/// Writes keyed and indexed values as JSON into a borrowed buffer.
///
/// Strings and special floats are quoted, times are moved to UTC before they
/// are formatted, and nested marshalers are visited recursively with this same
/// writer.
pub struct JsonObjectWriter<'a> {
    config: &'a EncoderConfig,
    buf: &'a mut Buffer,
}

impl<'a> JsonObjectWriter<'a> {
    pub fn new(config: &'a EncoderConfig, buf: &'a mut Buffer) -> Self {
        Self { config, buf }
    }

    /// Appends an already-encoded fragment such as `"a":1,"b":2` as the next
    /// member.
    pub fn append_fragment(&mut self, fragment: &[u8]) {
        if fragment.is_empty() {
            return;
        }
        self.add_element_separator();
        self.buf.append_bytes(fragment);
    }

    fn add_key(&mut self, key: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        append_escaped(self.buf, key.as_bytes());
        self.buf.append_str("\":");
    }

    fn add_element_separator(&mut self) {
        match self.buf.last_byte() {
            None | Some(b'{' | b'[' | b':' | b',' | b' ') => {}
            Some(_) => self.buf.append_byte(b','),
        }
    }

    fn append_quoted(&mut self, s: &[u8]) {
        self.buf.append_byte(b'"');
        append_escaped(self.buf, s);
        self.buf.append_byte(b'"');
    }
}

impl ObjectEncoder for JsonObjectWriter<'_> {
    /// A member that fails takes the whole field back out, key included.
    fn add_array(&mut self, key: &str, v: &dyn ArrayMarshaler) -> Result<()> {
        let mark = self.buf.len();
        self.add_key(key);
        let res = self.append_array(v);
        if res.is_err() {
            self.buf.truncate(mark);
        }
        res
    }

    /// See [`add_array`](Self::add_array).
    fn add_object(&mut self, key: &str, v: &dyn ObjectMarshaler) -> Result<()> {
        let mark = self.buf.len();
        self.add_key(key);
        let res = self.append_object(v);
        if res.is_err() {
            self.buf.truncate(mark);
        }
        res
    }

    fn add_binary(&mut self, key: &str, v: &[u8]) {
        self.add_string(key, &STANDARD.encode(v));
    }

    fn add_byte_string(&mut self, key: &str, v: &[u8]) {
        self.add_key(key);
        self.append_byte_string(v);
    }

    fn add_bool(&mut self, key: &str, v: bool) {
        self.add_key(key);
        self.append_bool(v);
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.add_key(key);
        self.append_complex128(re, im);
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.add_key(key);
        self.append_complex64(re, im);
    }

    fn add_duration(&mut self, key: &str, v: Duration) {
        self.add_key(key);
        self.append_duration(v);
    }

    fn add_float64(&mut self, key: &str, v: f64) {
        self.add_key(key);
        self.append_float64(v);
    }

    fn add_float32(&mut self, key: &str, v: f32) {
        self.add_key(key);
        self.append_float32(v);
    }

    fn add_int64(&mut self, key: &str, v: i64) {
        self.add_key(key);
        self.append_int64(v);
    }

    fn add_uint64(&mut self, key: &str, v: u64) {
        self.add_key(key);
        self.append_uint64(v);
    }

    fn add_string(&mut self, key: &str, v: &str) {
        self.add_key(key);
        self.append_string(v);
    }

    fn add_time(&mut self, key: &str, v: DateTime<FixedOffset>) {
        self.add_key(key);
        self.append_time(v);
    }

    /// Serializes before writing the key, so a rejected value leaves nothing
    /// behind.
    fn add_reflected(&mut self, key: &str, v: &dyn Reflect) -> Result<()> {
        let json = v.to_json()?;
        self.add_key(key);
        self.buf.append_bytes(&json);
        Ok(())
    }

    fn open_namespace(&mut self, _key: &str) {}

    narrow_adds!();
}

impl PrimitiveArrayEncoder for JsonObjectWriter<'_> {
    fn append_bool(&mut self, v: bool) {
        self.add_element_separator();
        self.buf.append_bool(v);
    }

    fn append_byte_string(&mut self, v: &[u8]) {
        self.add_element_separator();
        self.append_quoted(v);
    }

    fn append_complex128(&mut self, re: f64, im: f64) {
        self.add_element_separator();
        append_complex(self.buf, re, im);
    }

    fn append_complex64(&mut self, re: f32, im: f32) {
        self.add_element_separator();
        append_complex32(self.buf, re, im);
    }

    fn append_float64(&mut self, v: f64) {
        self.add_element_separator();
        match special_float_token(v) {
            Some(token) => self.append_quoted(token.as_bytes()),
            None => self.buf.append_float(v),
        }
    }

    fn append_float32(&mut self, v: f32) {
        self.add_element_separator();
        match special_float_token(f64::from(v)) {
            Some(token) => self.append_quoted(token.as_bytes()),
            None => self.buf.append_float32(v),
        }
    }

    fn append_int64(&mut self, v: i64) {
        self.add_element_separator();
        self.buf.append_int(v);
    }

    fn append_uint64(&mut self, v: u64) {
        self.add_element_separator();
        self.buf.append_uint(v);
    }

    fn append_string(&mut self, v: &str) {
        self.add_element_separator();
        self.append_quoted(v.as_bytes());
    }

    narrow_appends!();
}

impl ArrayEncoder for JsonObjectWriter<'_> {
    fn append_duration(&mut self, v: Duration) {
        let config = self.config;
        match &config.encode_duration {
            Some(encode) => encode(v, self),
            None => self.append_string(&crate::primitive::format_duration(v)),
        }
    }

    fn append_time(&mut self, v: DateTime<FixedOffset>) {
        let utc = v.with_timezone(&Utc).fixed_offset();
        let config = self.config;
        match &config.encode_time {
            Some(encode) => encode(utc, self),
            None => {
                let formatted = config.time_layout.format(&utc);
                self.append_string(&formatted);
            }
        }
    }

    fn append_array(&mut self, v: &dyn ArrayMarshaler) -> Result<()> {
        self.add_element_separator();
        self.buf.append_byte(b'[');
        let res = v.marshal_log_array(self);
        self.buf.append_byte(b']');
        res
    }

    fn append_object(&mut self, v: &dyn ObjectMarshaler) -> Result<()> {
        self.add_element_separator();
        self.buf.append_byte(b'{');
        let res = v.marshal_log_object(self);
        self.buf.append_byte(b'}');
        res
    }

    fn append_reflected(&mut self, v: &dyn Reflect) -> Result<()> {
        let json = v.to_json()?;
        self.add_element_separator();
        self.buf.append_bytes(&json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &[u8]) -> String {
        let mut buf = Buffer::new();
        append_escaped(&mut buf, s);
        String::from_utf8(buf.into_vec()).unwrap()
    }

    #[test]
    fn test_escape_specials() {
        assert_eq!(escaped(b"plain text"), "plain text");
        assert_eq!(escaped(b"a\\b\"c"), "a\\\\b\\\"c");
        assert_eq!(escaped(b"\n\r\t"), "\\n\\r\\t");
        assert_eq!(escaped(b"\x00\x1f"), "\\u0000\\u001f");
        assert_eq!(escaped(b"\x7f"), "\x7f");
    }

    #[test]
    fn test_escape_keeps_multibyte() {
        assert_eq!(escaped("µs 世界 🌍".as_bytes()), "µs 世界 🌍");
    }

    #[test]
    fn test_escape_replaces_each_invalid_byte() {
        assert_eq!(escaped(b"a\xffb"), "a\\ufffdb");
        // Truncated three-byte sequence at the end of input.
        assert_eq!(escaped(b"x\xe2\x82"), "x\\ufffd\\ufffd");
        assert_eq!(escaped(b"\xe2\x82A"), "\\ufffd\\ufffdA");
    }

    #[test]
    fn test_separator_rule() {
        let config = EncoderConfig::default();
        let mut buf = Buffer::new();
        {
            let mut w = JsonObjectWriter::new(&config, &mut buf);
            w.add_int64("a", 1);
            w.add_string("b", "x");
            w.append_fragment(b"\"c\":true");
            w.add_bool("d", false);
        }
        assert_eq!(buf.as_bytes(), br#""a":1,"b":"x","c":true,"d":false"#);
    }

    #[test]
    fn test_nested_arrays_get_commas() {
        use crate::field::FieldValue;

        let config = EncoderConfig::default();
        let mut buf = Buffer::new();
        let inner = vec![FieldValue::Int64(1), FieldValue::String("two".into())];
        let outer = vec![
            FieldValue::Array(std::sync::Arc::new(inner)),
            FieldValue::Bool(true),
            FieldValue::Float64(f64::NAN),
        ];
        JsonObjectWriter::new(&config, &mut buf)
            .add_array("list", &outer)
            .unwrap();
        assert_eq!(buf.as_bytes(), br#""list":[[1,"two"],true,"NaN"]"#);
    }
}
