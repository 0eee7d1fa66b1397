use entry_encoder::{BufferPool, Encoder, EncoderConfig, Entry, Field, Level, TextEncoder};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 1_000;

#[test]
fn test_concurrent_get_and_release() {
    let pool = BufferPool::new();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = pool.clone();
            thread::spawn(move || {
                for i in 0..ROUNDS {
                    let mut buf = pool.get();
                    assert!(buf.is_empty(), "pooled buffer was not cleared");
                    buf.append_str("thread ");
                    buf.append_uint(t as u64);
                    buf.append_byte(b' ');
                    buf.append_uint(i as u64);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let idle = pool.idle();
    assert!(idle >= 1 && idle <= THREADS, "idle buffers: {}", idle);
}

#[test]
fn test_shared_encoder_across_threads() {
    let pool = BufferPool::new();
    let encoder = Arc::new(TextEncoder::new(EncoderConfig::default().with_pool(pool.clone())).without_color());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let encoder = Arc::clone(&encoder);
            thread::spawn(move || {
                for i in 0..100 {
                    let buf = encoder
                        .encode_entry(
                            &Entry::new(Level::Info, ""),
                            &[Field::new("t", t), Field::new("i", i)],
                        )
                        .unwrap();
                    let line = String::from_utf8_lossy(buf.as_bytes()).into_owned();
                    assert!(line.ends_with(&format!(" t={} i={} \n", t, i)), "{:?}", line);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(pool.idle() <= THREADS + 1);
}
