//! Common Log Format encoder.
//!
//! Every entry with fields becomes one line of eleven columns:
//!
//! ```text
//! <request-id> <remote-address> <name> <user-id> <time> <duration> "<method> <path> <protocol>" <status> <size>
//! ```
//!
//! Fields are matched against the column names. Anything else, including
//! every structured value, is ignored. Durations are always whole
//! milliseconds and times always RFC 3339, whatever the encoder configuration
//! says.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::buffer_pool::Buffer;
use crate::encoder::{apply_fields, finish, ArrayMarshaler, Encoder, EncoderConfig, ObjectEncoder, ObjectMarshaler};
use crate::entry::Entry;
use crate::error::{PartialEncode, Result};
use crate::field::{Field, Reflect};
use crate::primitive::{append_complex, append_complex32, append_f32, append_f64};

/// Column names, in output order.
pub const COLUMNS: [&str; 11] = [
    "request-id",
    "remote-address",
    "name",
    "user-id",
    "time",
    "duration",
    "method",
    "path",
    "protocol",
    "status",
    "size",
];

/// Placeholder for a column nothing was written to.
const EMPTY: &str = "-";

/// Position of `key` in [`COLUMNS`].
fn column(key: &str) -> Option<usize> {
    let idx = match key {
        "request-id" => 0,
        "remote-address" => 1,
        "name" => 2,
        "user-id" => 3,
        "time" => 4,
        "duration" => 5,
        "method" => 6,
        "path" => 7,
        "protocol" => 8,
        "status" => 9,
        "size" => 10,
        _ => return None,
    };
    Some(idx)
}

/// Renders a slot value through a scratch buffer.
fn render(write: impl FnOnce(&mut Buffer)) -> String {
    let mut buf = Buffer::new();
    write(&mut buf);
    String::from_utf8_lossy(buf.as_bytes()).into_owned()
}

/// Encodes entries as CLF lines. Column values are held as strings until the
/// entry is finalized; a later field for the same column replaces an earlier
/// one.
///
/// A column line is written only once some scalar field has reached the
/// encoder, either as bound context or with the entry. A field whose key is
/// not a column still counts; it just has nowhere to go.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{ClfEncoder, Encoder, EncoderConfig, Entry, Field, Level, ObjectEncoder};
/// let mut template = ClfEncoder::new(EncoderConfig::default());
/// template.add_string("remote-address", "10.0.0.7");
///
/// let buf = template
///     .encode_entry(
///         &Entry::new(Level::Info, ""),
///         &[Field::new("method", "GET"), Field::new("status", 404)],
///     )
///     .unwrap();
/// assert_eq!(buf.as_bytes(), b"- 10.0.0.7 - - - - \"GET - -\" 404 -\n");
///
/// // The template keeps its own column for the next entry.
/// assert_eq!(template.column("remote-address"), Some("10.0.0.7"));
/// assert_eq!(template.column("status"), Some("-"));
/// ```
#[derive(Clone)]
pub struct ClfEncoder {
    config: Arc<EncoderConfig>,
    slots: [Cow<'static, str>; 11],
    supplied: bool,
}

impl ClfEncoder {
    /// Creates an encoder with every column set to `-`.
    ///
    /// # Arguments
    ///
    /// * `config` - Shared settings. Only the buffer pool is used here, since
    ///   CLF fixes its own time and duration forms.
    pub fn new(config: impl Into<Arc<EncoderConfig>>) -> Self {
        Self {
            config: config.into(),
            slots: std::array::from_fn(|_| Cow::Borrowed(EMPTY)),
            supplied: false,
        }
    }

    /// An encoder with the same configuration and every column reset to `-`.
    pub fn fresh_sibling(&self) -> Self {
        Self::new(Arc::clone(&self.config))
    }

    /// Current value of a column, `None` for unknown names.
    pub fn column(&self, name: &str) -> Option<&str> {
        column(name).map(|i| self.slots[i].as_ref())
    }

    /// Records that a scalar arrived and stores it when `key` names a column.
    /// `value` is only rendered for known columns.
    fn set(&mut self, key: &str, value: impl FnOnce() -> String) {
        self.supplied = true;
        if let Some(i) = column(key) {
            self.slots[i] = Cow::Owned(value());
        }
    }

    /// Writes the eleven slots, the request triple wrapped in quotes.
    fn write_columns(&self, buf: &mut Buffer) {
        for (i, slot) in self.slots.iter().enumerate() {
            match i {
                0 => {}
                6 => buf.append_str(" \""),
                9 => buf.append_str("\" "),
                _ => buf.append_byte(b' '),
            }
            buf.append_str(slot);
        }
        buf.append_byte(b'\n');
    }
}

/// Scalars land in their column. Arrays, objects and reflected values never
/// fail and never change the line.
impl ObjectEncoder for ClfEncoder {
    fn add_array(&mut self, _key: &str, _v: &dyn ArrayMarshaler) -> Result<()> {
        Ok(())
    }

    fn add_object(&mut self, _key: &str, _v: &dyn ObjectMarshaler) -> Result<()> {
        Ok(())
    }

    /// Standard padded base64, unquoted.
    fn add_binary(&mut self, key: &str, v: &[u8]) {
        self.set(key, || STANDARD.encode(v))
    }

    fn add_byte_string(&mut self, key: &str, v: &[u8]) {
        self.set(key, || String::from_utf8_lossy(v).into_owned())
    }

    fn add_bool(&mut self, key: &str, v: bool) {
        self.set(key, || v.to_string())
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.set(key, || render(|b| append_complex(b, re, im)))
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.set(key, || render(|b| append_complex32(b, re, im)))
    }

    /// Whole milliseconds, truncated.
    fn add_duration(&mut self, key: &str, v: Duration) {
        self.set(key, || v.as_millis().to_string())
    }

    fn add_float64(&mut self, key: &str, v: f64) {
        self.set(key, || render(|b| append_f64(b, v)))
    }

    fn add_float32(&mut self, key: &str, v: f32) {
        self.set(key, || render(|b| append_f32(b, v)))
    }

    fn add_int64(&mut self, key: &str, v: i64) {
        self.set(key, || v.to_string())
    }

    fn add_uint64(&mut self, key: &str, v: u64) {
        self.set(key, || v.to_string())
    }

    fn add_string(&mut self, key: &str, v: &str) {
        self.set(key, || v.to_string())
    }

    /// RFC 3339 at seconds precision, in the offset the value carries.
    fn add_time(&mut self, key: &str, v: DateTime<FixedOffset>) {
        self.set(key, || v.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    fn add_reflected(&mut self, _key: &str, _v: &dyn Reflect) -> Result<()> {
        Ok(())
    }

    fn open_namespace(&mut self, _key: &str) {}

    narrow_adds!();
}

impl Encoder for ClfEncoder {
    fn carrying_clone(&self) -> Box<dyn Encoder> {
        Box::new(self.clone())
    }

    /// Writes the message line, if any, and then the column line built from
    /// the bound columns overlaid with `fields`.
    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> std::result::Result<Buffer, PartialEncode> {
        let mut buf = self.config.pool.get();
        if !entry.message.is_empty() {
            buf.append_str(&entry.message);
            buf.append_byte(b'\n');
        }

        let mut line = self.fresh_sibling();
        line.slots.clone_from(&self.slots);
        line.supplied = self.supplied;
        let errors = apply_fields(&mut line, fields);
        if line.supplied {
            line.write_columns(&mut buf);
        }
        finish(buf, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup() {
        for (i, name) in COLUMNS.iter().enumerate() {
            assert_eq!(column(name), Some(i));
        }
        assert_eq!(column("Status"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut enc = ClfEncoder::new(EncoderConfig::default());
        enc.add_int64("status", 200);
        enc.add_string("status", "404");
        assert_eq!(enc.column("status"), Some("404"));
        assert_eq!(enc.column("size"), Some("-"));
    }

    #[test]
    fn test_duration_truncates_to_millis() {
        let mut enc = ClfEncoder::new(EncoderConfig::default());
        enc.add_duration("duration", Duration::from_micros(1_999));
        assert_eq!(enc.column("duration"), Some("1"));
    }

    #[test]
    fn test_fresh_sibling_resets_slots() {
        let mut enc = ClfEncoder::new(EncoderConfig::default());
        enc.add_string("method", "GET");
        let sibling = enc.fresh_sibling();
        assert_eq!(sibling.column("method"), Some("-"));
        assert!(!sibling.supplied);
    }
}
