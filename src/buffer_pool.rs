//! Reusable byte buffers for the encode path.
//!
//! Every encoded entry is rendered into a [`Buffer`] taken from a
//! [`BufferPool`]. When the buffer is dropped its allocation goes back to the
//! pool it came from, cleared but not freed, so a steady stream of entries
//! settles into a fixed set of allocations.
//!
//! # Thread Safety
//!
//! A pool is a cheap, cloneable handle. All clones share one free list guarded
//! by a mutex, so buffers can be acquired and released from any number of
//! threads at once. Which idle buffer a caller receives is unspecified.

use std::fmt;
use std::io;
use std::mem;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

/// Capacity of a newly allocated buffer.
const INITIAL_CAPACITY: usize = 1024;

/// Buffers that grew past this are released instead of being kept idle.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

lazy_static! {
    /// The pool used by encoders that were not given one explicitly.
    static ref SHARED_POOL: BufferPool = BufferPool::new();
}

/// A pool of reusable byte buffers.
///
/// # Examples
///
/// ```
/// # use entry_encoder::BufferPool;
/// let pool = BufferPool::new();
///
/// let mut buf = pool.get();
/// buf.append_str("hello");
/// assert_eq!(buf.as_bytes(), b"hello");
///
/// // Dropping the buffer hands its allocation back, cleared.
/// drop(buf);
/// assert_eq!(pool.idle(), 1);
/// assert!(pool.get().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// Creates an empty pool with its own free list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the process-wide default pool.
    pub fn shared() -> Self {
        SHARED_POOL.clone()
    }

    /// Takes a cleared buffer from the pool, allocating one if none is idle.
    pub fn get(&self) -> Buffer {
        let bytes = self.free.lock().pop().unwrap_or_else(|| {
            tracing::trace!(capacity = INITIAL_CAPACITY, "buffer pool empty, allocating");
            Vec::with_capacity(INITIAL_CAPACITY)
        });
        Buffer {
            bytes,
            pool: Some(self.clone()),
        }
    }

    /// Number of buffers currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn put(&self, mut bytes: Vec<u8>) {
        if bytes.capacity() > MAX_RETAINED_CAPACITY {
            tracing::trace!(capacity = bytes.capacity(), "releasing oversized buffer");
            return;
        }
        bytes.clear();
        self.free.lock().push(bytes);
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool").field("idle", &self.idle()).finish()
    }
}

/// A growable byte buffer, usually borrowed from a [`BufferPool`].
///
/// The `append_*` helpers perform the raw text conversions shared by all
/// encoders. None of them escape or quote anything.
#[derive(Default)]
pub struct Buffer {
    bytes: Vec<u8>,
    pool: Option<BufferPool>,
}

impl Buffer {
    /// Creates a buffer that is not attached to any pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single byte.
    pub fn append_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    /// Appends `b` verbatim.
    pub fn append_bytes(&mut self, b: &[u8]) {
        self.bytes.extend_from_slice(b);
    }

    /// Appends the UTF-8 bytes of `s`.
    pub fn append_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    /// Appends `true` or `false`.
    pub fn append_bool(&mut self, v: bool) {
        self.append_str(if v { "true" } else { "false" });
    }

    /// Appends `v` in decimal.
    pub fn append_int(&mut self, v: i64) {
        self.append_display(v);
    }

    /// Appends `v` in decimal.
    pub fn append_uint(&mut self, v: u64) {
        self.append_display(v);
    }

    /// Appends the shortest decimal form that reads back as `v`, without an
    /// exponent. Special values are the caller's concern.
    pub fn append_float(&mut self, v: f64) {
        self.append_display(v);
    }

    /// Like [`append_float`](Self::append_float) at 32-bit precision.
    pub fn append_float32(&mut self, v: f32) {
        self.append_display(v);
    }

    /// Appends anything `Display`, e.g. a `chrono` formatter.
    pub fn append_display(&mut self, v: impl fmt::Display) {
        use std::io::Write as _;
        // Writing into a Vec cannot fail.
        let _ = write!(self.bytes, "{}", v);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The last byte written, if any.
    pub fn last_byte(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Drops everything written after the first `len` bytes.
    ///
    /// Encoders use this to take back a field whose value failed half way.
    ///
    /// # Examples
    ///
    /// ```
    /// # use entry_encoder::Buffer;
    /// let mut buf = Buffer::new();
    /// buf.append_str("a=1 ");
    /// let mark = buf.len();
    /// buf.append_str("b=[1,");
    /// buf.truncate(mark);
    /// assert_eq!(buf.as_bytes(), b"a=1 ");
    /// ```
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Empties the buffer, keeping its allocation.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Detaches the bytes from the pool.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.pool = None;
        mem::take(&mut self.bytes)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.put(mem::take(&mut self.bytes));
        }
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Buffer")
            .field(&String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}
