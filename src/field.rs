//! Typed key/value attributes.
//!
//! A [`Field`] is one attribute of a log entry. Its [`FieldValue`] decides
//! which method of the encoder's [`ObjectEncoder`] surface receives it, so the
//! same field list can be handed to any encoder without knowing its format.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::Serialize;

use crate::encoder::{ArrayEncoder, ArrayMarshaler, ObjectEncoder, ObjectMarshaler};
use crate::error::Result;

/// A value serialized through the generic fallback serializer.
///
/// Implemented for every `Serialize` type. Serialization can fail, e.g. for a
/// map whose keys are not strings, and that failure is reported to whoever
/// applied the field.
pub trait Reflect: Send + Sync {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send + Sync> Reflect for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// The value of a [`Field`], one variant per kind the encoders understand.
#[derive(Clone)]
pub enum FieldValue {
    Bool(bool),
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Int8(i8),
    Uint64(u64),
    Uint32(u32),
    Uint16(u16),
    Uint8(u8),
    Float64(f64),
    Float32(f32),
    /// Real and imaginary parts.
    Complex128(f64, f64),
    Complex64(f32, f32),
    String(String),
    /// UTF-8 text that arrived as bytes. Invalid sequences are tolerated.
    ByteString(Vec<u8>),
    /// Opaque bytes, rendered as standard base64.
    Binary(Vec<u8>),
    Duration(Duration),
    Time(DateTime<FixedOffset>),
    Array(Arc<dyn ArrayMarshaler>),
    Object(Arc<dyn ObjectMarshaler>),
    Reflected(Arc<dyn Reflect>),
}

impl FieldValue {
    /// Appends the value as an array element.
    pub fn append_to<E: ArrayEncoder + ?Sized>(&self, enc: &mut E) -> Result<()> {
        match self {
            FieldValue::Bool(v) => enc.append_bool(*v),
            FieldValue::Int64(v) => enc.append_int64(*v),
            FieldValue::Int32(v) => enc.append_int32(*v),
            FieldValue::Int16(v) => enc.append_int16(*v),
            FieldValue::Int8(v) => enc.append_int8(*v),
            FieldValue::Uint64(v) => enc.append_uint64(*v),
            FieldValue::Uint32(v) => enc.append_uint32(*v),
            FieldValue::Uint16(v) => enc.append_uint16(*v),
            FieldValue::Uint8(v) => enc.append_uint8(*v),
            FieldValue::Float64(v) => enc.append_float64(*v),
            FieldValue::Float32(v) => enc.append_float32(*v),
            FieldValue::Complex128(re, im) => enc.append_complex128(*re, *im),
            FieldValue::Complex64(re, im) => enc.append_complex64(*re, *im),
            FieldValue::String(v) => enc.append_string(v),
            FieldValue::ByteString(v) => enc.append_byte_string(v),
            FieldValue::Binary(v) => enc.append_string(&STANDARD.encode(v)),
            FieldValue::Duration(v) => enc.append_duration(*v),
            FieldValue::Time(v) => enc.append_time(*v),
            FieldValue::Array(v) => return enc.append_array(v.as_ref()),
            FieldValue::Object(v) => return enc.append_object(v.as_ref()),
            FieldValue::Reflected(v) => return enc.append_reflected(v.as_ref()),
        }
        Ok(())
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "Bool({:?})", v),
            FieldValue::Int64(v) => write!(f, "Int64({:?})", v),
            FieldValue::Int32(v) => write!(f, "Int32({:?})", v),
            FieldValue::Int16(v) => write!(f, "Int16({:?})", v),
            FieldValue::Int8(v) => write!(f, "Int8({:?})", v),
            FieldValue::Uint64(v) => write!(f, "Uint64({:?})", v),
            FieldValue::Uint32(v) => write!(f, "Uint32({:?})", v),
            FieldValue::Uint16(v) => write!(f, "Uint16({:?})", v),
            FieldValue::Uint8(v) => write!(f, "Uint8({:?})", v),
            FieldValue::Float64(v) => write!(f, "Float64({:?})", v),
            FieldValue::Float32(v) => write!(f, "Float32({:?})", v),
            FieldValue::Complex128(re, im) => write!(f, "Complex128({:?}, {:?})", re, im),
            FieldValue::Complex64(re, im) => write!(f, "Complex64({:?}, {:?})", re, im),
            FieldValue::String(v) => write!(f, "String({:?})", v),
            FieldValue::ByteString(v) => write!(f, "ByteString({:?})", String::from_utf8_lossy(v)),
            FieldValue::Binary(v) => write!(f, "Binary({} bytes)", v.len()),
            FieldValue::Duration(v) => write!(f, "Duration({:?})", v),
            FieldValue::Time(v) => write!(f, "Time({})", v.to_rfc3339()),
            FieldValue::Array(_) => f.write_str("Array(..)"),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::Reflected(_) => f.write_str("Reflected(..)"),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i64 => Int64,
    i32 => Int32,
    i16 => Int16,
    i8 => Int8,
    u64 => Uint64,
    u32 => Uint32,
    u16 => Uint16,
    u8 => Uint8,
    f64 => Float64,
    f32 => Float32,
    String => String,
    Duration => Duration,
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Uint64(v as u64)
    }
}

impl From<isize> for FieldValue {
    fn from(v: isize) -> Self {
        FieldValue::Int64(v as i64)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FieldValue {
    fn from(v: DateTime<Tz>) -> Self {
        FieldValue::Time(v.fixed_offset())
    }
}

/// One typed key/value attribute of a log entry.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{Field, FieldValue};
/// # use std::time::Duration;
/// let fields = vec![
///     Field::new("status", 200),
///     Field::new("path", "/"),
///     Field::new("duration", Duration::from_micros(65)),
///     Field::binary("payload", vec![0xde, 0xad]),
/// ];
/// assert!(matches!(fields[0].value, FieldValue::Int32(200)));
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn binary(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Binary(value.into()),
        }
    }

    pub fn byte_string(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::ByteString(value.into()),
        }
    }

    pub fn complex128(key: impl Into<String>, re: f64, im: f64) -> Self {
        Self::new_value(key, FieldValue::Complex128(re, im))
    }

    pub fn complex64(key: impl Into<String>, re: f32, im: f32) -> Self {
        Self::new_value(key, FieldValue::Complex64(re, im))
    }

    pub fn array(key: impl Into<String>, value: impl ArrayMarshaler + 'static) -> Self {
        Self::new_value(key, FieldValue::Array(Arc::new(value)))
    }

    pub fn object(key: impl Into<String>, value: impl ObjectMarshaler + 'static) -> Self {
        Self::new_value(key, FieldValue::Object(Arc::new(value)))
    }

    /// A field serialized through the fallback serializer (`serde_json`).
    pub fn reflected<T: Serialize + Send + Sync + 'static>(key: impl Into<String>, value: T) -> Self {
        Self::new_value(key, FieldValue::Reflected(Arc::new(value)))
    }

    fn new_value(key: impl Into<String>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Hands the field to the matching method of `enc`.
    ///
    /// Only structured and reflected values can fail; the error is returned
    /// as-is so the caller can carry on with the remaining fields.
    pub fn add_to<E: ObjectEncoder + ?Sized>(&self, enc: &mut E) -> Result<()> {
        let key = self.key.as_str();
        match &self.value {
            FieldValue::Bool(v) => enc.add_bool(key, *v),
            FieldValue::Int64(v) => enc.add_int64(key, *v),
            FieldValue::Int32(v) => enc.add_int32(key, *v),
            FieldValue::Int16(v) => enc.add_int16(key, *v),
            FieldValue::Int8(v) => enc.add_int8(key, *v),
            FieldValue::Uint64(v) => enc.add_uint64(key, *v),
            FieldValue::Uint32(v) => enc.add_uint32(key, *v),
            FieldValue::Uint16(v) => enc.add_uint16(key, *v),
            FieldValue::Uint8(v) => enc.add_uint8(key, *v),
            FieldValue::Float64(v) => enc.add_float64(key, *v),
            FieldValue::Float32(v) => enc.add_float32(key, *v),
            FieldValue::Complex128(re, im) => enc.add_complex128(key, *re, *im),
            FieldValue::Complex64(re, im) => enc.add_complex64(key, *re, *im),
            FieldValue::String(v) => enc.add_string(key, v),
            FieldValue::ByteString(v) => enc.add_byte_string(key, v),
            FieldValue::Binary(v) => enc.add_binary(key, v),
            FieldValue::Duration(v) => enc.add_duration(key, *v),
            FieldValue::Time(v) => enc.add_time(key, *v),
            FieldValue::Array(v) => return enc.add_array(key, v.as_ref()),
            FieldValue::Object(v) => return enc.add_object(key, v.as_ref()),
            FieldValue::Reflected(v) => return enc.add_reflected(key, v.as_ref()),
        }
        Ok(())
    }
}

/// An array of plain values.
impl ArrayMarshaler for Vec<FieldValue> {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        for value in self {
            value.append_to(enc)?;
        }
        Ok(())
    }
}

/// An object whose members are the fields, in order.
impl ObjectMarshaler for Vec<Field> {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        for field in self {
            field.add_to(enc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_scalar_conversions() {
        assert!(matches!(FieldValue::from(true), FieldValue::Bool(true)));
        assert!(matches!(FieldValue::from(7u8), FieldValue::Uint8(7)));
        assert!(matches!(FieldValue::from(-7i16), FieldValue::Int16(-7)));
        assert!(matches!(FieldValue::from(3usize), FieldValue::Uint64(3)));
        assert!(matches!(FieldValue::from("x"), FieldValue::String(ref s) if s == "x"));
    }

    #[test]
    fn test_time_keeps_offset() {
        let t = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap();
        match FieldValue::from(t) {
            FieldValue::Time(v) => assert_eq!(v.offset().local_minus_utc(), 3600),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reflect_reports_serializer_failure() {
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);
        assert!(bad.to_json().is_err());
        assert_eq!(vec![1, 2].to_json().unwrap(), b"[1,2]");
    }
}
