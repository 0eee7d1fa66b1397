//! # Entry Encoder
//!
//! A structured log-entry encoding engine. Given an ordered list of typed
//! fields and the entry metadata (level, message, time), it renders exactly
//! one terminated record in one of three shapes:
//!
//! * **JSON**: one object per line, fields as `"key":value` members
//! * **Text**: `INFO  message  key=value key=value`, level name colored by severity
//! * **CLF**: the eleven-column Common Log Format line used by access logs
//!
//! ## Key Features
//!
//! * Values stream straight into a pooled byte buffer, no intermediate document
//! * One encoder contract for every format, with about twenty value kinds
//! * Pre-bound context fields through carrying clones of a template encoder
//! * A field that fails to encode is reported without losing the rest of the entry
//!
//! ## Main Components
//!
//! * `BufferPool` / `Buffer`: reusable byte buffers
//! * `Field` / `FieldValue`: typed attributes
//! * `JsonEncoder`, `TextEncoder`, `ClfEncoder`: the three formats
//! * `LoggerOptions` / `Format`: configuration and encoder construction
//! * `Logger` / `Sink`: the facade that writes finalized entries
//!
//! ## Quick Start
//!
//! ```
//! use entry_encoder::{Encoder, EncoderConfig, Entry, Field, Level, TextEncoder};
//! use std::time::Duration;
//!
//! let encoder = TextEncoder::new(EncoderConfig::default());
//! let entry = Entry::new(Level::Info, "");
//! let fields = [
//!     Field::new("status", 200),
//!     Field::new("path", "/"),
//!     Field::new("duration", Duration::from_micros(65)),
//! ];
//!
//! let buf = encoder.encode_entry(&entry, &fields).unwrap();
//! let line = String::from_utf8_lossy(buf.as_bytes());
//! assert!(line.starts_with("\x1b[36mINFO\x1b[0m"));
//! assert!(line.ends_with("status=200 path=/ duration=65µs \n"));
//! ```

#[macro_use]
pub mod encoder;

pub mod buffer_pool;
pub mod clf_encoder;
pub mod config;
pub mod entry;
pub mod error;
pub mod field;
pub mod json_encoder;
pub mod level;
pub mod logger;
pub mod object_encoder;
pub mod primitive;
pub mod text_encoder;

pub use buffer_pool::{Buffer, BufferPool};
pub use clf_encoder::ClfEncoder;
pub use config::{new_encoder, Format, LoggerOptions};
pub use encoder::{
    ArrayEncoder, ArrayMarshaler, DurationEncoderFn, Encoder, EncoderConfig, ObjectEncoder,
    ObjectMarshaler, PrimitiveArrayEncoder, TimeEncoderFn,
};
pub use entry::Entry;
pub use error::{EncodeError, FieldError, PartialEncode, Result};
pub use field::{Field, FieldValue, Reflect};
pub use json_encoder::JsonEncoder;
pub use level::Level;
pub use logger::{LogWriter, Logger, Sink, WriterSink};
pub use primitive::TimeLayout;
pub use text_encoder::TextEncoder;
