//! Fixed-capacity byte FIFO
//!
//! Backs the receive side of [`LoopbackSerial`](crate::LoopbackSerial).
//! A full buffer rejects the push with [`BufferFull`] instead of
//! overwriting the oldest byte.

use thiserror::Error;

/// Returned by [`RingBuffer::push`] when no space is left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ring buffer full")]
pub struct BufferFull;

/// Byte FIFO holding at most `N` bytes
///
/// Stored as the index of the oldest byte plus a fill count; the write slot
/// is derived from both.
pub struct RingBuffer<const N: usize> {
    slots: [u8; N],
    oldest: usize,
    filled: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            slots: [0; N],
            oldest: 0,
            filled: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_full(&self) -> bool {
        self.filled == N
    }

    /// Append `byte` after the newest one
    pub fn push(&mut self, byte: u8) -> Result<(), BufferFull> {
        if self.is_full() {
            return Err(BufferFull);
        }

        let slot = (self.oldest + self.filled) % N;
        self.slots[slot] = byte;
        self.filled += 1;
        Ok(())
    }

    /// Take the oldest byte
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }

        let byte = self.slots[self.oldest];
        self.oldest = (self.oldest + 1) % N;
        self.filled -= 1;
        Some(byte)
    }

    /// Drop every queued byte
    pub fn clear(&mut self) {
        self.oldest = 0;
        self.filled = 0;
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_and_wraparound() {
        let mut rb = RingBuffer::<4>::new();
        for b in [1, 2, 3] {
            rb.push(b).unwrap();
        }
        assert_eq!(rb.pop(), Some(1));
        assert_eq!(rb.pop(), Some(2));

        // Wrap the head past the end of storage
        for b in [4, 5, 6] {
            rb.push(b).unwrap();
        }
        assert!(rb.is_full());
        assert_eq!(rb.push(7), Err(BufferFull));

        let drained: Vec<u8> = core::iter::from_fn(|| rb.pop()).collect();
        assert_eq!(drained, vec![3, 4, 5, 6]);
        assert!(rb.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut rb = RingBuffer::<2>::new();
        rb.push(9).unwrap();
        rb.clear();
        assert_eq!(rb.len(), 0);
        assert_eq!(rb.pop(), None);
        assert_eq!(rb.capacity(), 2);
    }
}
