use chrono::{TimeZone, Utc};
use entry_encoder::{EncodeError, Encoder, Entry, Format, Level, LoggerOptions, TimeLayout};
use std::env;

#[test]
fn test_defaults() {
    let opts = LoggerOptions::default();
    assert_eq!(opts.format().unwrap(), Format::Json);
    assert_eq!(opts.level, Level::Info);
    assert_eq!(opts.encoder_config().unwrap().time_layout, TimeLayout::Rfc3339);
    assert!(opts.name.is_none());
}

// Single test touching the environment, so no other test can race on it.
#[test]
fn test_from_env_then_json() {
    env::set_var("LOG_FORMAT", "docker");
    env::set_var("LOG_LEVEL", "not-a-level");
    env::set_var("LOG_TIME_FORMAT", "%Y-%m-%d");
    let opts = LoggerOptions::from_env();
    env::remove_var("LOG_FORMAT");
    env::remove_var("LOG_LEVEL");
    env::remove_var("LOG_TIME_FORMAT");

    assert_eq!(opts.format().unwrap(), Format::Text);
    assert_eq!(opts.level, Level::Info);
    assert_eq!(opts.time_format, "%Y-%m-%d");

    let opts = opts
        .with_json(br#"{"format": "kubernetes", "level": "DEBUG"}"#)
        .unwrap();
    assert_eq!(opts.format().unwrap(), Format::Json);
    assert_eq!(opts.level, Level::Debug);
    assert_eq!(opts.time_format, "%Y-%m-%d");

    let encoder = opts.encoder().unwrap();
    let entry = Entry::at(Level::Info, "", Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    let buf = encoder.encode_entry(&entry, &[]).unwrap();
    assert!(String::from_utf8_lossy(buf.as_bytes()).contains("\"time\":\"2024-05-01\""));
}

#[test]
fn test_unknown_format_fails_fast() {
    let err = LoggerOptions::default()
        .with_json(br#"{"format": "xml"}"#)
        .unwrap()
        .encoder()
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "unsupported logger format 'xml'");
    assert!(matches!(err, EncodeError::UnsupportedFormat(_)));
}
