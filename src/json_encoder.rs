//! JSON-shaped entry encoder.
//!
//! Context fields accumulate as a bare `"key":value,...` fragment. Each entry
//! is wrapped in an object envelope:
//!
//! ```text
//! {"level":"info","time":"2024-05-01T12:00:00Z","msg":"served",<context>,<fields>}
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::buffer_pool::Buffer;
use crate::encoder::{apply_fields, finish, ArrayMarshaler, Encoder, EncoderConfig, ObjectEncoder, ObjectMarshaler};
use crate::entry::Entry;
use crate::error::{PartialEncode, Result};
use crate::field::{Field, Reflect};
use crate::object_encoder::JsonObjectWriter;

/// Encodes entries as one JSON object per line.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{Encoder, EncoderConfig, Entry, Field, JsonEncoder, Level, ObjectEncoder};
/// # use chrono::{TimeZone, Utc};
/// let mut template = JsonEncoder::new(EncoderConfig::default());
/// template.add_string("service", "api");
///
/// let entry = Entry::at(Level::Info, "served", Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
/// let buf = template.encode_entry(&entry, &[Field::new("status", 200)]).unwrap();
/// assert_eq!(
///     buf.as_bytes(),
///     br#"{"level":"info","time":"2024-05-01T12:00:00Z","msg":"served","service":"api","status":200}
/// "#
/// );
/// ```
pub struct JsonEncoder {
    config: Arc<EncoderConfig>,
    buf: Buffer,
}

impl JsonEncoder {
    pub fn new(config: impl Into<Arc<EncoderConfig>>) -> Self {
        let config = config.into();
        let buf = config.pool.get();
        Self { config, buf }
    }

    /// An encoder with the same configuration and no context.
    pub fn fresh_sibling(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            buf: self.config.pool.get(),
        }
    }

    /// The context accumulated so far, as a bare member list.
    pub fn fragment(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn writer(&mut self) -> JsonObjectWriter<'_> {
        JsonObjectWriter::new(&self.config, &mut self.buf)
    }
}

/// The carrying clone: the context bytes are copied into a buffer of the
/// clone's own.
impl Clone for JsonEncoder {
    fn clone(&self) -> Self {
        let mut sibling = self.fresh_sibling();
        sibling.buf.append_bytes(self.buf.as_bytes());
        sibling
    }
}

impl ObjectEncoder for JsonEncoder {
    fn add_array(&mut self, key: &str, v: &dyn ArrayMarshaler) -> Result<()> {
        self.writer().add_array(key, v)
    }

    fn add_object(&mut self, key: &str, v: &dyn ObjectMarshaler) -> Result<()> {
        self.writer().add_object(key, v)
    }

    fn add_binary(&mut self, key: &str, v: &[u8]) {
        self.writer().add_binary(key, v)
    }

    fn add_byte_string(&mut self, key: &str, v: &[u8]) {
        self.writer().add_byte_string(key, v)
    }

    fn add_bool(&mut self, key: &str, v: bool) {
        self.writer().add_bool(key, v)
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.writer().add_complex128(key, re, im)
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.writer().add_complex64(key, re, im)
    }

    fn add_duration(&mut self, key: &str, v: Duration) {
        self.writer().add_duration(key, v)
    }

    fn add_float64(&mut self, key: &str, v: f64) {
        self.writer().add_float64(key, v)
    }

    fn add_float32(&mut self, key: &str, v: f32) {
        self.writer().add_float32(key, v)
    }

    fn add_int64(&mut self, key: &str, v: i64) {
        self.writer().add_int64(key, v)
    }

    fn add_uint64(&mut self, key: &str, v: u64) {
        self.writer().add_uint64(key, v)
    }

    fn add_string(&mut self, key: &str, v: &str) {
        self.writer().add_string(key, v)
    }

    fn add_time(&mut self, key: &str, v: DateTime<FixedOffset>) {
        self.writer().add_time(key, v)
    }

    fn add_reflected(&mut self, key: &str, v: &dyn Reflect) -> Result<()> {
        self.writer().add_reflected(key, v)
    }

    fn open_namespace(&mut self, _key: &str) {}

    narrow_adds!();
}

impl Encoder for JsonEncoder {
    fn carrying_clone(&self) -> Box<dyn Encoder> {
        Box::new(self.clone())
    }

    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> std::result::Result<Buffer, PartialEncode> {
        let config = &self.config;
        let mut line = self.fresh_sibling();
        line.buf.append_byte(b'{');
        {
            let mut w = line.writer();
            if !config.level_key.is_empty() {
                w.add_string(&config.level_key, entry.level.as_str());
            }
            if !config.time_key.is_empty() {
                w.add_time(&config.time_key, entry.time);
            }
            if !config.message_key.is_empty() {
                w.add_string(&config.message_key, &entry.message);
            }
            w.append_fragment(self.buf.as_bytes());
        }
        let errors = apply_fields(&mut line, fields);
        line.buf.append_str("}\n");
        finish(line.buf, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use chrono::{TimeZone, Utc};

    fn entry(message: &str) -> Entry {
        Entry::at(Level::Warn, message, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_empty_envelope_keys_are_omitted() {
        let config = EncoderConfig {
            time_key: String::new(),
            level_key: String::new(),
            ..EncoderConfig::default()
        };
        let enc = JsonEncoder::new(config);
        let buf = enc.encode_entry(&entry("hi"), &[]).unwrap();
        assert_eq!(buf.as_bytes(), b"{\"msg\":\"hi\"}\n");
    }

    #[test]
    fn test_fresh_sibling_drops_context() {
        let mut enc = JsonEncoder::new(EncoderConfig::default());
        enc.add_bool("bound", true);
        assert_eq!(enc.fragment(), b"\"bound\":true");
        assert!(enc.fresh_sibling().fragment().is_empty());
        assert_eq!(enc.clone().fragment(), enc.fragment());
    }

    #[test]
    fn test_context_is_not_consumed_by_entries() {
        let mut enc = JsonEncoder::new(EncoderConfig::default());
        enc.add_int64("n", 1);
        for _ in 0..2 {
            let buf = enc.encode_entry(&entry(""), &[Field::new("m", 2)]).unwrap();
            assert!(buf.as_bytes().ends_with(b"\"msg\":\"\",\"n\":1,\"m\":2}\n"));
        }
        assert_eq!(enc.fragment(), b"\"n\":1");
    }
}
