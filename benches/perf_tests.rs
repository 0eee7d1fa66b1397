use criterion::{black_box, criterion_group, criterion_main, Criterion};
use entry_encoder::{
    new_encoder, Encoder, EncoderConfig, Entry, Field, FieldValue, Format, Level, Logger,
    LoggerOptions, Sink,
};
use log::{info, LevelFilter};
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use std::io;
use std::sync::Once;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const ITERATIONS: usize = 50_000;

static LOG4RS_INIT: Once = Once::new();

// Sink that drops everything - for measuring encoding alone
struct NullSink;

impl Sink for NullSink {
    fn write_entry(&self, entry: &[u8]) -> io::Result<()> {
        black_box(entry);
        Ok(())
    }
}

fn access_fields(i: usize) -> Vec<Field> {
    vec![
        Field::new("request-id", "0b2f6c1e-9c1f-4bb0-a1c2-6c8d9e0f1a2b"),
        Field::new("remote-address", "10.0.0.7"),
        Field::new("method", "GET"),
        Field::new("path", "/api/v1/items?limit=50"),
        Field::new("protocol", "HTTP/1.1"),
        Field::new("status", 200),
        Field::new("size", i),
        Field::new("duration", Duration::from_micros(1_250)),
        Field::array("tags", vec![FieldValue::from("edge"), FieldValue::from("cached")]),
    ]
}

fn setup_log4rs(log_file: &str) {
    LOG4RS_INIT.call_once(|| {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} {l} - {m}{n}")))
            .append(true)
            .build(log_file)
            .unwrap();

        let config = Config::builder()
            .appender(Appender::builder().build("logfile", Box::new(logfile)))
            .build(Root::builder().appender("logfile").build(LevelFilter::Info))
            .unwrap();

        log4rs::init_config(config).unwrap();
    });
}

fn bench_encoders(c: &mut Criterion) {
    let mut group = c.benchmark_group("Encode Entry");
    let fields = access_fields(512);
    let entry = Entry::new(Level::Info, "request served");

    for format in [Format::Json, Format::Text, Format::Clf] {
        let encoder = new_encoder(format, EncoderConfig::default());
        group.bench_function(format.as_str(), |b| {
            b.iter(|| black_box(encoder.encode_entry(&entry, &fields).unwrap()))
        });
    }

    group.finish();
}

fn bench_logging_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Logging Comparison");
    group.sample_size(10);

    group.bench_function("encoder_vs_log4rs", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let log4rs_file = dir.path().join("log4rs.log").to_str().unwrap().to_string();

            let logger = Logger::new(&LoggerOptions::default(), NullSink)
                .unwrap()
                .with(&[Field::new("service", "bench")])
                .unwrap();

            let encoder_start = Instant::now();
            for i in 0..ITERATIONS {
                logger.info("request served", &access_fields(i)).unwrap();
            }
            let encoder_duration = encoder_start.elapsed();

            setup_log4rs(&log4rs_file);
            let log4rs_start = Instant::now();
            for i in 0..ITERATIONS {
                info!(
                    "request served request-id={} status={} size={} duration={:?}",
                    "0b2f6c1e-9c1f-4bb0-a1c2-6c8d9e0f1a2b",
                    200,
                    i,
                    Duration::from_micros(1_250)
                );
            }
            let log4rs_duration = log4rs_start.elapsed();

            println!("\nPerformance comparison ({} entries):", ITERATIONS);
            println!("JSON encoder (in-memory sink): {:?}", encoder_duration);
            println!("log4rs (file appender): {:?}", log4rs_duration);
            println!(
                "Encoder throughput: {:.2} million entries/sec",
                ITERATIONS as f64 / encoder_duration.as_secs_f64() / 1_000_000.0
            );

            black_box((encoder_duration, log4rs_duration))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encoders, bench_logging_comparison);
criterion_main!(benches);
