//! Error and Result types for entry encoding.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::buffer_pool::Buffer;

/// A convenience `Result` type for encoder operations.
pub type Result<T> = std::result::Result<T, EncodeError>;

/// The error type for field encoding and encoder construction.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The fallback serializer rejected a reflected value.
    #[error("unsupported reflected value: {0}")]
    Reflected(#[from] serde_json::Error),

    /// The output format selector is not one of the known formats.
    #[error("unsupported logger format '{0}'")]
    UnsupportedFormat(String),

    /// A custom time layout contains an unknown or malformed directive.
    #[error("invalid time layout: {0:?}")]
    InvalidTimeLayout(String),

    /// A level name could not be parsed.
    #[error("invalid level: {0:?}")]
    InvalidLevel(String),

    /// A JSON configuration document could not be decoded.
    #[error("error decoding logging options: {0}")]
    Config(#[source] serde_json::Error),

    /// Writing an encoded entry to its sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The entry was written without the listed fields.
    #[error("{} field(s) left out of entry", .0.len())]
    Fields(Vec<FieldError>),
}

/// A single field that could not be encoded, with the key it was logged under.
#[derive(Debug)]
pub struct FieldError {
    /// Key of the rejected field.
    pub key: String,
    /// Why it was rejected.
    pub error: EncodeError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {:?}: {}", self.key, self.error)
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// An entry that was finalized with one or more fields missing.
///
/// Every field that could be encoded is still present in `buffer`, which is a
/// complete, terminated record. The caller decides whether to write it out.
#[derive(Debug)]
pub struct PartialEncode {
    /// The finalized record without the rejected fields.
    pub buffer: Buffer,
    /// One entry per rejected field, in arrival order. Never empty.
    pub errors: Vec<FieldError>,
}

impl fmt::Display for PartialEncode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field(s) failed to encode", self.errors.len())?;
        if let Some(first) = self.errors.first() {
            write!(f, ", first: {}", first)?;
        }
        Ok(())
    }
}

impl std::error::Error for PartialEncode {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors.first().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl PartialEncode {
    /// Returns the record, discarding the field errors.
    pub fn into_buffer(self) -> Buffer {
        self.buffer
    }
}
