use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::EncodeError;

/// Severity of a log entry, ordered from least to most severe.
///
/// Levels parse from their names in any case, from the empty string (which
/// means [`Level::Info`]) and from the numeric form `level(N)` that
/// [`as_i8`](Level::as_i8) produces. They deserialize the same way, so an
/// options document can carry `"level": "WARN"`.
///
/// # Examples
///
/// ```
/// # use entry_encoder::Level;
/// assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
/// assert_eq!("".parse::<Level>().unwrap(), Level::Info);
/// assert_eq!("level(-1)".parse::<Level>().unwrap(), Level::Debug);
/// assert!(Level::Error > Level::Warn);
/// assert_eq!(Level::Fatal.to_string(), "fatal");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Level {
    /// Verbose diagnostics, usually disabled in production.
    Debug,
    /// The default level.
    #[default]
    Info,
    Warn,
    Error,
    /// Panics in development builds of the calling application.
    DPanic,
    Panic,
    Fatal,
}

impl Level {
    const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];

    /// Lower-case name, as used in JSON output and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::DPanic => "dpanic",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }

    /// Upper-case name, as used by the text encoder.
    pub fn as_upper_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::DPanic => "DPANIC",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    /// Numeric value, with `Info` at zero.
    ///
    /// `Debug` is `-1` and every level above `Info` counts up from there, so
    /// `Fatal` is `5`. The value reads back through `level(N)`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use entry_encoder::Level;
    /// assert_eq!(Level::Debug.as_i8(), -1);
    /// assert_eq!(Level::Fatal.as_i8(), 5);
    /// assert_eq!("level(5)".parse::<Level>().unwrap(), Level::Fatal);
    /// ```
    pub fn as_i8(self) -> i8 {
        self as i8 - 1
    }

    /// Inverse of [`as_i8`](Level::as_i8).
    fn from_i8(n: i8) -> Option<Level> {
        let idx = usize::try_from(i16::from(n) + 1).ok()?;
        Self::ALL.get(idx).copied()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = EncodeError;

    /// Parses a level name case-insensitively. An empty string is `Info`, and
    /// the numeric form `level(N)` is accepted for any known level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lit = s.to_ascii_lowercase();
        let level = match lit.as_str() {
            "debug" => Level::Debug,
            "info" | "" => Level::Info,
            "warn" | "warning" => Level::Warn,
            "error" => Level::Error,
            "dpanic" => Level::DPanic,
            "panic" => Level::Panic,
            "fatal" => Level::Fatal,
            other => other
                .strip_prefix("level(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|inner| inner.parse::<i8>().ok())
                .and_then(Level::from_i8)
                .ok_or_else(|| EncodeError::InvalidLevel(s.to_string()))?,
        };
        Ok(level)
    }
}

/// Used by `serde` when a level arrives as a string.
impl TryFrom<String> for Level {
    type Error = EncodeError;

    fn try_from(s: String) -> Result<Self, EncodeError> {
        s.parse()
    }
}

/// `Trace` has no counterpart and folds into `Debug`.
impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

/// The `log` crate threshold that lets exactly the records at or above a
/// level through. Levels above `Error` all map to `Error`.
impl From<Level> for log::LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => log::LevelFilter::Trace,
            Level::Info => log::LevelFilter::Info,
            Level::Warn => log::LevelFilter::Warn,
            _ => log::LevelFilter::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("DEBUG".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("Warn".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("dpanic".parse::<Level>().unwrap(), Level::DPanic);
    }

    #[test]
    fn test_parse_numeric_form() {
        assert_eq!("level(-1)".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("Level(2)".parse::<Level>().unwrap(), Level::Error);
        assert!("level(9)".parse::<Level>().is_err());
        assert!("level(x)".parse::<Level>().is_err());
    }

    #[test]
    fn test_reject_unknown() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert!(matches!(err, EncodeError::InvalidLevel(ref s) if s == "verbose"));
    }

    #[test]
    fn test_deserialize_from_string() {
        let level: Level = serde_json::from_str("\"ERROR\"").unwrap();
        assert_eq!(level, Level::Error);
        assert_eq!(Level::try_from(String::from("level(1)")).unwrap(), Level::Warn);
        assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
    }

    #[test]
    fn test_ordering_and_numbers() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Error < Level::Fatal);
        assert_eq!(Level::Info.as_i8(), 0);
        assert_eq!(Level::Fatal.as_i8(), 5);
        for level in Level::ALL {
            assert_eq!(Level::from_i8(level.as_i8()), Some(level));
        }
    }
}
