//! Output format selection and logger options.
//!
//! Options start from defaults, are overridden by the environment and can be
//! overridden again by a JSON document:
//!
//! | variable          | JSON key     | default   |
//! |-------------------|--------------|-----------|
//! | `LOG_FORMAT`      | `format`     | `json`    |
//! | `LOG_LEVEL`       | `level`      | `info`    |
//! | `LOG_TIME_FORMAT` | `timeFormat` | RFC 3339  |
//! |                   | `name`       | none      |

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::clf_encoder::ClfEncoder;
use crate::encoder::{Encoder, EncoderConfig};
use crate::error::{EncodeError, Result};
use crate::json_encoder::JsonEncoder;
use crate::level::Level;
use crate::primitive::TimeLayout;
use crate::text_encoder::TextEncoder;

/// One of the supported output shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
    Clf,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Json => "json",
            Format::Clf => "common",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = EncodeError;

    /// Accepts `""`, `text` and `docker` for text; `json`, `k8s` and
    /// `kubernetes` for JSON; `common` and `clf` for CLF.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "text" | "docker" => Ok(Format::Text),
            "json" | "k8s" | "kubernetes" => Ok(Format::Json),
            "common" | "clf" => Ok(Format::Clf),
            _ => Err(EncodeError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Builds the encoder for `format`. The configuration is shared by the
/// encoder and every copy made from it.
pub fn new_encoder(format: Format, config: impl Into<Arc<EncoderConfig>>) -> Box<dyn Encoder> {
    match format {
        Format::Text => Box::new(TextEncoder::new(config)),
        Format::Json => Box::new(JsonEncoder::new(config)),
        Format::Clf => Box::new(ClfEncoder::new(config)),
    }
}

/// Settings a [`Logger`](crate::Logger) is built from.
///
/// The format and time layout are kept as given and only validated when
/// [`encoder`](Self::encoder) is called.
///
/// # Examples
///
/// ```
/// # use entry_encoder::{Format, Level, LoggerOptions};
/// let opts = LoggerOptions::default()
///     .with_json(br#"{"format": "common", "level": "warn", "name": "edge"}"#)
///     .unwrap();
/// assert_eq!(opts.format().unwrap(), Format::Clf);
/// assert_eq!(opts.level, Level::Warn);
/// assert_eq!(opts.name.as_deref(), Some("edge"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerOptions {
    /// Format selector, see [`Format`].
    pub format: String,
    /// Least severe level the logger writes.
    pub level: Level,
    /// Time layout selector, see [`TimeLayout`]. Empty means RFC 3339.
    pub time_format: String,
    /// Logger name, added to entries written through
    /// [`Logger::writer`](crate::Logger::writer).
    pub name: Option<String>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            format: Format::Json.as_str().to_string(),
            level: Level::Info,
            time_format: String::new(),
            name: None,
        }
    }
}

/// The subset of options a JSON document may override.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsOverlay {
    format: Option<String>,
    level: Option<Level>,
    time_format: Option<String>,
    name: Option<String>,
}

impl LoggerOptions {
    /// Defaults overridden by `LOG_FORMAT`, `LOG_LEVEL` and `LOG_TIME_FORMAT`.
    ///
    /// An unset or empty variable keeps the default. An unparseable
    /// `LOG_LEVEL` falls back to `info`.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(format) = non_empty_var("LOG_FORMAT") {
            opts.format = format;
        }
        if let Some(level) = non_empty_var("LOG_LEVEL") {
            opts.level = level.parse().unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring LOG_LEVEL");
                Level::Info
            });
        }
        if let Some(layout) = non_empty_var("LOG_TIME_FORMAT") {
            opts.time_format = layout;
        }
        opts
    }

    /// Applies the members present in a JSON document.
    pub fn with_json(mut self, raw: &[u8]) -> Result<Self> {
        let overlay: OptionsOverlay = serde_json::from_slice(raw).map_err(EncodeError::Config)?;
        if let Some(format) = overlay.format {
            self.format = format;
        }
        if let Some(level) = overlay.level {
            self.level = level;
        }
        if let Some(layout) = overlay.time_format {
            self.time_format = layout;
        }
        if overlay.name.is_some() {
            self.name = overlay.name;
        }
        Ok(self)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format.as_str().to_string();
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn format(&self) -> Result<Format> {
        self.format.parse()
    }

    /// The encoder configuration these options describe.
    pub fn encoder_config(&self) -> Result<EncoderConfig> {
        let layout: TimeLayout = self.time_format.parse()?;
        Ok(EncoderConfig::default().with_time_layout(layout))
    }

    /// Builds the template encoder, failing on an unknown format or time
    /// layout.
    pub fn encoder(&self) -> Result<Box<dyn Encoder>> {
        let format = self.format()?;
        let config = self.encoder_config()?;
        tracing::debug!(%format, layout = ?config.time_layout, "building encoder");
        Ok(new_encoder(format, config))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
