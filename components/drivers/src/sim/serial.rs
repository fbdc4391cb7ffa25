//! Loopback serial port
//!
//! TX is wired to RX through a 4KB ring buffer, like a UART with its pins
//! jumpered together.

use edgeos_hal::{DriverError, DriverLifecycle, DriverResult, SerialBus};
use spin::Mutex;

use crate::ring_buffer::RingBuffer;

/// Receive buffer size (4KB)
pub const RX_BUFFER_SIZE: usize = 4096;

/// Loopback serial port
pub struct LoopbackSerial {
    rx: Mutex<RingBuffer<RX_BUFFER_SIZE>>,
}

impl LoopbackSerial {
    pub fn new() -> Self {
        Self {
            rx: Mutex::new(RingBuffer::new()),
        }
    }

    /// Bytes waiting to be received
    pub fn pending(&self) -> usize {
        self.rx.lock().len()
    }
}

impl Default for LoopbackSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverLifecycle for LoopbackSerial {
    fn shutdown(&self) -> DriverResult<()> {
        self.rx.lock().clear();
        Ok(())
    }
}

impl SerialBus for LoopbackSerial {
    fn send(&self, byte: u8) -> DriverResult<()> {
        self.rx
            .lock()
            .push(byte)
            .map_err(|_| DriverError::Transport("receive overrun".into()))
    }

    fn receive(&self) -> DriverResult<Option<u8>> {
        Ok(self.rx.lock().pop())
    }
}
