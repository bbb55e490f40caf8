//! Byte container abstraction for the TX and RX queues
//!
//! Data is appended at the new end and consumed from the old end.
//! Implementations may be backed by the SPSC ring, a linear FIFO, or a test
//! double; the TX engine only speaks this trait.

/// FIFO byte container with non-destructive inspection of the old end.
pub trait ByteQueue {
    /// Bytes currently stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that can still be appended.
    fn space(&self) -> usize;

    /// Total backing capacity in bytes.
    fn capacity(&self) -> usize;

    /// Discards all stored bytes.
    fn clear(&mut self);

    /// Appends all of `src`, or nothing. Returns whether it was stored.
    fn append(&mut self, src: &[u8]) -> bool;

    /// Consumes `n` bytes from the old end. `n` must not exceed [`len`].
    ///
    /// [`len`]: ByteQueue::len
    fn pop(&mut self, n: usize);

    /// Copies up to `dst.len()` bytes from the old end without consuming
    /// them. Returns the number of bytes copied.
    fn copy_to(&self, dst: &mut [u8]) -> usize;

    /// The longest contiguous run of stored bytes starting at the old end.
    fn peek_contiguous(&self) -> &[u8];
}
