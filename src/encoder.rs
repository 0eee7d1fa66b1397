//! The structured value sink contract shared by every output format.
//!
//! Fields reach an encoder through [`ObjectEncoder`], one method per value
//! kind. Nested values are streamed through [`ArrayEncoder`] and
//! [`ObjectEncoder`] again by the [`ArrayMarshaler`] and [`ObjectMarshaler`]
//! they carry, so no intermediate document is ever built.
//!
//! Every encoder implements the whole surface. A format that cannot represent
//! some kind (CLF and nested values, for instance) implements those methods as
//! no-ops rather than leaving them out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::buffer_pool::{Buffer, BufferPool};
use crate::entry::Entry;
use crate::error::{FieldError, PartialEncode, Result};
use crate::field::{Field, Reflect};
use crate::primitive::TimeLayout;

/// Implements the narrow integer appends by widening to 64 bits.
macro_rules! narrow_appends {
    () => {
        fn append_int32(&mut self, v: i32) {
            self.append_int64(i64::from(v))
        }
        fn append_int16(&mut self, v: i16) {
            self.append_int64(i64::from(v))
        }
        fn append_int8(&mut self, v: i8) {
            self.append_int64(i64::from(v))
        }
        fn append_uint32(&mut self, v: u32) {
            self.append_uint64(u64::from(v))
        }
        fn append_uint16(&mut self, v: u16) {
            self.append_uint64(u64::from(v))
        }
        fn append_uint8(&mut self, v: u8) {
            self.append_uint64(u64::from(v))
        }
    };
}

/// Implements the narrow integer adds by widening to 64 bits.
macro_rules! narrow_adds {
    () => {
        fn add_int32(&mut self, key: &str, v: i32) {
            self.add_int64(key, i64::from(v))
        }
        fn add_int16(&mut self, key: &str, v: i16) {
            self.add_int64(key, i64::from(v))
        }
        fn add_int8(&mut self, key: &str, v: i8) {
            self.add_int64(key, i64::from(v))
        }
        fn add_uint32(&mut self, key: &str, v: u32) {
            self.add_uint64(key, u64::from(v))
        }
        fn add_uint16(&mut self, key: &str, v: u16) {
            self.add_uint64(key, u64::from(v))
        }
        fn add_uint8(&mut self, key: &str, v: u8) {
            self.add_uint64(key, u64::from(v))
        }
    };
}

/// Appends scalar values with no key. This is also the surface custom time
/// and duration formatters write through.
pub trait PrimitiveArrayEncoder {
    fn append_bool(&mut self, v: bool);
    fn append_byte_string(&mut self, v: &[u8]);
    fn append_complex128(&mut self, re: f64, im: f64);
    fn append_complex64(&mut self, re: f32, im: f32);
    fn append_float64(&mut self, v: f64);
    fn append_float32(&mut self, v: f32);
    fn append_int64(&mut self, v: i64);
    fn append_int32(&mut self, v: i32);
    fn append_int16(&mut self, v: i16);
    fn append_int8(&mut self, v: i8);
    fn append_uint64(&mut self, v: u64);
    fn append_uint32(&mut self, v: u32);
    fn append_uint16(&mut self, v: u16);
    fn append_uint8(&mut self, v: u8);
    fn append_string(&mut self, v: &str);
}

/// Appends array elements, including nested structures.
pub trait ArrayEncoder: PrimitiveArrayEncoder {
    fn append_duration(&mut self, v: Duration);
    fn append_time(&mut self, v: DateTime<FixedOffset>);
    fn append_array(&mut self, v: &dyn ArrayMarshaler) -> Result<()>;
    fn append_object(&mut self, v: &dyn ObjectMarshaler) -> Result<()>;
    /// The only append that can fail: the fallback serializer may reject `v`.
    fn append_reflected(&mut self, v: &dyn Reflect) -> Result<()>;
}

/// Adds keyed values. Every encoder implements all of it.
pub trait ObjectEncoder {
    fn add_array(&mut self, key: &str, v: &dyn ArrayMarshaler) -> Result<()>;
    fn add_object(&mut self, key: &str, v: &dyn ObjectMarshaler) -> Result<()>;
    /// Arbitrary bytes, rendered as standard base64.
    fn add_binary(&mut self, key: &str, v: &[u8]);
    /// UTF-8 text held as bytes.
    fn add_byte_string(&mut self, key: &str, v: &[u8]);
    fn add_bool(&mut self, key: &str, v: bool);
    fn add_complex128(&mut self, key: &str, re: f64, im: f64);
    fn add_complex64(&mut self, key: &str, re: f32, im: f32);
    fn add_duration(&mut self, key: &str, v: Duration);
    fn add_float64(&mut self, key: &str, v: f64);
    fn add_float32(&mut self, key: &str, v: f32);
    fn add_int64(&mut self, key: &str, v: i64);
    fn add_int32(&mut self, key: &str, v: i32);
    fn add_int16(&mut self, key: &str, v: i16);
    fn add_int8(&mut self, key: &str, v: i8);
    fn add_uint64(&mut self, key: &str, v: u64);
    fn add_uint32(&mut self, key: &str, v: u32);
    fn add_uint16(&mut self, key: &str, v: u16);
    fn add_uint8(&mut self, key: &str, v: u8);
    fn add_string(&mut self, key: &str, v: &str);
    fn add_time(&mut self, key: &str, v: DateTime<FixedOffset>);
    fn add_reflected(&mut self, key: &str, v: &dyn Reflect) -> Result<()>;
    /// Namespaces are not supported: subsequent fields stay at the top level.
    fn open_namespace(&mut self, key: &str);
}

/// A value that streams itself as array elements.
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()>;
}

/// A value that streams itself as object members.
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()>;
}

/// An output format.
///
/// An encoder instance accumulates context fields added through its
/// [`ObjectEncoder`] methods. It supports two copies which must not be
/// confused:
///
/// * the **carrying clone** ([`carrying_clone`](Encoder::carrying_clone))
///   keeps the accumulated context in a buffer of its own, for loggers with
///   pre-bound fields;
/// * the **fresh sibling** (the inherent `fresh_sibling` of each encoder)
///   shares only the configuration. `encode_entry` starts every record from
///   one and replays the bound context into it.
///
/// An instance is not synchronized; one encode at a time.
pub trait Encoder: ObjectEncoder + Send + Sync {
    /// Copies the encoder together with its accumulated context.
    fn carrying_clone(&self) -> Box<dyn Encoder>;

    /// Renders one terminated record: the bound context, then `fields` in
    /// order.
    ///
    /// Fields whose value cannot be encoded are left out. In that case the
    /// complete record comes back inside the error together with the reasons.
    fn encode_entry(
        &self,
        entry: &Entry,
        fields: &[Field],
    ) -> std::result::Result<Buffer, PartialEncode>;
}

/// A custom time formatter. It writes through the primitive surface of the
/// active encoder, so its output is quoted or escaped as that format requires.
pub type TimeEncoderFn = Arc<dyn Fn(DateTime<FixedOffset>, &mut dyn PrimitiveArrayEncoder) + Send + Sync>;

/// A custom duration formatter, see [`TimeEncoderFn`].
pub type DurationEncoderFn = Arc<dyn Fn(Duration, &mut dyn PrimitiveArrayEncoder) + Send + Sync>;

/// Read-only settings shared by an encoder and all of its copies.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{EncoderConfig, PrimitiveArrayEncoder};
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// let config = EncoderConfig::default()
///     .with_duration_encoder(Arc::new(|d: Duration, enc: &mut dyn PrimitiveArrayEncoder| {
///         enc.append_float64(d.as_secs_f64())
///     }));
/// assert!(config.encode_duration.is_some());
/// ```
#[derive(Clone)]
pub struct EncoderConfig {
    /// Envelope key of the message in JSON output. Empty omits it.
    pub message_key: String,
    /// Envelope key of the level in JSON output. Empty omits it.
    pub level_key: String,
    /// Envelope key of the entry time in JSON output. Empty omits it.
    pub time_key: String,
    /// Layout for time values when no `encode_time` is set.
    pub time_layout: TimeLayout,
    pub encode_time: Option<TimeEncoderFn>,
    pub encode_duration: Option<DurationEncoderFn>,
    /// Pool every buffer of the encoder family is taken from.
    pub pool: BufferPool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            message_key: "msg".to_string(),
            level_key: "level".to_string(),
            time_key: "time".to_string(),
            time_layout: TimeLayout::default(),
            encode_time: None,
            encode_duration: None,
            pool: BufferPool::shared(),
        }
    }
}

impl EncoderConfig {
    pub fn with_time_layout(mut self, layout: TimeLayout) -> Self {
        self.time_layout = layout;
        self
    }

    pub fn with_time_encoder(mut self, f: TimeEncoderFn) -> Self {
        self.encode_time = Some(f);
        self
    }

    pub fn with_duration_encoder(mut self, f: DurationEncoderFn) -> Self {
        self.encode_duration = Some(f);
        self
    }

    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }
}

impl fmt::Debug for EncoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderConfig")
            .field("message_key", &self.message_key)
            .field("level_key", &self.level_key)
            .field("time_key", &self.time_key)
            .field("time_layout", &self.time_layout)
            .field("encode_time", &self.encode_time.is_some())
            .field("encode_duration", &self.encode_duration.is_some())
            .field("pool", &self.pool)
            .finish()
    }
}

/// Applies `fields` in order, collecting the ones that failed instead of
/// stopping at the first.
pub(crate) fn apply_fields<E: ObjectEncoder + ?Sized>(enc: &mut E, fields: &[Field]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for field in fields {
        if let Err(error) = field.add_to(enc) {
            tracing::debug!(key = %field.key, %error, "field left out of entry");
            errors.push(FieldError {
                key: field.key.clone(),
                error,
            });
        }
    }
    errors
}

pub(crate) fn finish(buf: Buffer, errors: Vec<FieldError>) -> std::result::Result<Buffer, PartialEncode> {
    if errors.is_empty() {
        Ok(buf)
    } else {
        Err(PartialEncode {
            buffer: buf,
            errors,
        })
    }
}
