//! SPSC byte ring over caller-provided storage
//!
//! A power-of-two ring with free-running 16-bit indices, usable capacity
//! `cap - 1`, and no overwrite: a write that does not fit is refused whole
//! and accounted in the `rejected` counter. The `highwater` mark records
//! the maximum fill level since construction.
//!
//! For single-threaded use (the TX path) the ring implements
//! [`ByteQueue`] directly. For the interrupt boundary (the RX path),
//! [`RingBuffer::split`] hands out [`Producer`] and [`Consumer`] halves:
//! the producer publishes the write index with release ordering after
//! storing payload bytes, the consumer publishes the read index after
//! consuming, and neither side ever touches the other's index. This is the
//! whole synchronization story; there are no locks.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use crate::buffer::ByteQueue;

/// Largest supported ring, bounded by the 16-bit index arithmetic.
pub const MAX_CAPACITY: usize = 65536;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BadCapacity;

/// Index and metric state shared between the two halves.
///
/// `head` and `tail` are free-running and masked on access; their 16-bit
/// difference is exact because the fill level never exceeds `cap - 1`.
struct Shared {
    buf: *mut u8,
    cap: usize,
    head: AtomicU16,
    tail: AtomicU16,
    rejected: AtomicU32,
    highwater: AtomicU16,
}

// Safety: index words are atomics; the byte regions reachable through `buf`
// are disjoint between the producer role ([used..cap-1) slots) and the
// consumer role ([tail..head)), which is exactly what the unsafe fns below
// require from their callers.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

impl Shared {
    fn mask(&self) -> u16 {
        (self.cap - 1) as u16
    }

    fn used(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        usize::from(head.wrapping_sub(tail))
    }

    fn free(&self) -> usize {
        self.cap - 1 - self.used()
    }

    fn highwater(&self) -> usize {
        usize::from(self.highwater.load(Ordering::Relaxed))
    }

    fn rejected(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Single-writer counter bump; plain load/store keeps it ISR-safe on
    /// cores without atomic read-modify-write.
    fn bump_rejected(&self, n: usize) {
        let r = self.rejected.load(Ordering::Relaxed);
        self.rejected.store(r.wrapping_add(n as u32), Ordering::Relaxed);
    }

    /// Safety: caller must be the unique producer.
    unsafe fn write_try(&self, src: &[u8]) -> usize {
        let len = src.len();
        if len == 0 {
            return 0;
        }
        if len > self.cap - 1 {
            self.bump_rejected(len);
            return 0;
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let used = usize::from(head.wrapping_sub(tail));
        if self.cap - 1 - used < len {
            self.bump_rejected(len);
            return 0;
        }

        let at = usize::from(head & self.mask());
        let first = len.min(self.cap - at);
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), self.buf.add(at), first);
            core::ptr::copy_nonoverlapping(src.as_ptr().add(first), self.buf, len - first);
        }
        self.head.store(head.wrapping_add(len as u16), Ordering::Release);

        let used = used + len;
        if used > usize::from(self.highwater.load(Ordering::Relaxed)) {
            self.highwater.store(used as u16, Ordering::Relaxed);
        }
        len
    }

    /// Safety: caller must be the unique consumer.
    unsafe fn peek_contiguous(&self) -> (*const u8, usize) {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        let used = usize::from(head.wrapping_sub(tail));

        let at = usize::from(tail & self.mask());
        let linear = (self.cap - at).min(used);
        (unsafe { self.buf.add(at) } as *const u8, linear)
    }

    /// Safety: caller must be the unique consumer.
    unsafe fn copy_to(&self, dst: &mut [u8]) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        let used = usize::from(head.wrapping_sub(tail));

        let n = dst.len().min(used);
        if n == 0 {
            return 0;
        }

        let at = usize::from(tail & self.mask());
        let first = n.min(self.cap - at);
        unsafe {
            core::ptr::copy_nonoverlapping(self.buf.add(at), dst.as_mut_ptr(), first);
            core::ptr::copy_nonoverlapping(self.buf, dst.as_mut_ptr().add(first), n - first);
        }
        n
    }

    /// Safety: caller must be the unique consumer, and `n` must not exceed
    /// the current fill level.
    unsafe fn pop(&self, n: usize) {
        let tail = self.tail.load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(n as u16), Ordering::Release);
    }

    /// Safety: caller must be the unique consumer.
    unsafe fn clear(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }
}

/// SPSC byte ring. The storage slice determines the capacity.
pub struct RingBuffer<'m> {
    shared: Shared,
    _storage: PhantomData<&'m mut [u8]>,
}

impl<'m> RingBuffer<'m> {
    /// Wraps `mem` as ring storage. The length must be a nonzero power of
    /// two of at most [`MAX_CAPACITY`] bytes.
    pub fn new(mem: &'m mut [u8]) -> Result<Self, BadCapacity> {
        let cap = mem.len();
        if cap == 0 || !cap.is_power_of_two() || cap > MAX_CAPACITY {
            return Err(BadCapacity);
        }

        Ok(Self {
            shared: Shared {
                buf: mem.as_mut_ptr(),
                cap,
                head: AtomicU16::new(0),
                tail: AtomicU16::new(0),
                rejected: AtomicU32::new(0),
                highwater: AtomicU16::new(0),
            },
            _storage: PhantomData,
        })
    }

    /// Splits the ring into its producer and consumer halves.
    ///
    /// The borrow of `self` guarantees at most one of each exists, which is
    /// what makes the halves' index ownership sound.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        (
            Producer {
                shared: &self.shared,
            },
            Consumer {
                shared: &self.shared,
            },
        )
    }

    pub fn rejected(&self) -> u32 {
        self.shared.rejected()
    }

    pub fn highwater(&self) -> usize {
        self.shared.highwater()
    }
}

// Safety: exclusive ownership of the storage is captured at construction.
unsafe impl Send for RingBuffer<'_> {}

impl ByteQueue for RingBuffer<'_> {
    fn len(&self) -> usize {
        self.shared.used()
    }

    fn space(&self) -> usize {
        self.shared.free()
    }

    fn capacity(&self) -> usize {
        self.shared.cap
    }

    fn clear(&mut self) {
        // Safety: `&mut self` makes this the only consumer.
        unsafe { self.shared.clear() }
    }

    fn append(&mut self, src: &[u8]) -> bool {
        // Safety: `&mut self` makes this the only producer.
        unsafe { self.shared.write_try(src) == src.len() }
    }

    fn pop(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        // Safety: `&mut self` makes this the only consumer.
        unsafe { self.shared.pop(n) }
    }

    fn copy_to(&self, dst: &mut [u8]) -> usize {
        // Safety: a `ByteQueue` user holds the whole ring, so no split
        // halves exist and this access is single-threaded.
        unsafe { self.shared.copy_to(dst) }
    }

    fn peek_contiguous(&self) -> &[u8] {
        // Safety: as in `copy_to`; the returned borrow of `self` keeps the
        // region stable until a `&mut self` operation consumes it.
        let (ptr, len) = unsafe { self.shared.peek_contiguous() };
        unsafe { core::slice::from_raw_parts(ptr, len) }
    }
}

/// Write half of a split ring. Safe to move into an interrupt handler.
pub struct Producer<'a> {
    shared: &'a Shared,
}

impl Producer<'_> {
    /// Appends all of `src`, or nothing. Returns the number of bytes
    /// written (0 on refusal); refused bytes are added to `rejected`.
    pub fn write_try(&mut self, src: &[u8]) -> usize {
        // Safety: `split` hands out a single producer and `&mut self`
        // serializes its calls.
        unsafe { self.shared.write_try(src) }
    }

    pub fn free(&self) -> usize {
        self.shared.free()
    }

    pub fn rejected(&self) -> u32 {
        self.shared.rejected()
    }
}

/// Read half of a split ring.
pub struct Consumer<'a> {
    shared: &'a Shared,
}

impl Consumer<'_> {
    pub fn len(&self) -> usize {
        self.shared.used()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.cap
    }

    /// The longest contiguous run starting at the read index.
    ///
    /// The producer never writes inside `[tail, head)`, so the view stays
    /// valid until this consumer pops.
    pub fn peek_contiguous(&self) -> &[u8] {
        // Safety: `split` hands out a single consumer.
        let (ptr, len) = unsafe { self.shared.peek_contiguous() };
        unsafe { core::slice::from_raw_parts(ptr, len) }
    }

    /// Copies up to `dst.len()` bytes from the read index without
    /// consuming them, handling wraparound.
    pub fn copy_to(&self, dst: &mut [u8]) -> usize {
        // Safety: `split` hands out a single consumer.
        unsafe { self.shared.copy_to(dst) }
    }

    /// Consumes `n` bytes. `n` must not exceed [`Consumer::len`].
    pub fn pop(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        // Safety: single consumer, and the caller honors the length bound.
        unsafe { self.shared.pop(n) }
    }

    pub fn rejected(&self) -> u32 {
        self.shared.rejected()
    }

    pub fn highwater(&self) -> usize {
        self.shared.highwater()
    }
}
