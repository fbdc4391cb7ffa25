//! Loopback field bus
//!
//! Every frame sent is queued and handed back by `receive`, after the same
//! validation a real controller would apply for the protocol.

use std::collections::VecDeque;

use edgeos_hal::{BusFrame, BusProtocol, DigitalBus, DriverError, DriverLifecycle, DriverResult};
use spin::Mutex;

/// Largest extended (29-bit) CAN identifier
pub const CAN_MAX_ID: u32 = 0x1FFF_FFFF;

/// Classic CAN payload limit
pub const CAN_MAX_PAYLOAD: usize = 8;

/// Highest Modbus slave address
pub const MODBUS_MAX_SLAVE: u32 = 247;

/// Modbus PDU data limit
pub const MODBUS_MAX_PAYLOAD: usize = 252;

/// EtherCAT datagram data limit
pub const ETHERCAT_MAX_PAYLOAD: usize = 1486;

/// Default number of frames held before sends fail
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

struct BusState {
    frames: VecDeque<BusFrame>,
    last_error: Option<String>,
}

/// Loopback bus controller
pub struct LoopbackBus {
    protocol: BusProtocol,
    depth: usize,
    state: Mutex<BusState>,
}

impl LoopbackBus {
    /// Loopback bus for `protocol` with the default queue depth
    pub fn new(protocol: BusProtocol) -> Self {
        Self::with_depth(protocol, DEFAULT_QUEUE_DEPTH)
    }

    /// Loopback bus holding at most `depth` frames
    pub fn with_depth(protocol: BusProtocol, depth: usize) -> Self {
        Self {
            protocol,
            depth,
            state: Mutex::new(BusState {
                frames: VecDeque::with_capacity(depth),
                last_error: None,
            }),
        }
    }

    /// Frames waiting to be received
    pub fn pending(&self) -> usize {
        self.state.lock().frames.len()
    }

    fn validate(&self, id: u32, payload: &[u8]) -> DriverResult<()> {
        let (id_ok, max_payload) = match self.protocol {
            BusProtocol::Can => (id <= CAN_MAX_ID, CAN_MAX_PAYLOAD),
            BusProtocol::Modbus => ((1..=MODBUS_MAX_SLAVE).contains(&id), MODBUS_MAX_PAYLOAD),
            BusProtocol::EtherCat => (id <= u32::from(u16::MAX), ETHERCAT_MAX_PAYLOAD),
        };

        if !id_ok {
            return Err(DriverError::InvalidArgument(format!(
                "{} id {:#x} out of range",
                self.protocol, id
            )));
        }
        if payload.len() > max_payload {
            return Err(DriverError::InvalidArgument(format!(
                "{} payload of {} bytes exceeds {}",
                self.protocol,
                payload.len(),
                max_payload
            )));
        }
        Ok(())
    }
}

impl DriverLifecycle for LoopbackBus {
    fn shutdown(&self) -> DriverResult<()> {
        self.state.lock().frames.clear();
        Ok(())
    }
}

impl DigitalBus for LoopbackBus {
    fn protocol(&self) -> BusProtocol {
        self.protocol
    }

    fn send(&self, id: u32, payload: &[u8]) -> DriverResult<()> {
        let validated = self.validate(id, payload);
        let mut state = self.state.lock();

        let result = validated.and_then(|()| {
            if state.frames.len() >= self.depth {
                Err(DriverError::Transport("transmit queue overflow".into()))
            } else {
                state.frames.push_back(BusFrame::new(id, payload));
                Ok(())
            }
        });

        if let Err(err) = &result {
            state.last_error = Some(err.to_string());
        }
        result
    }

    fn receive(&self) -> DriverResult<Option<BusFrame>> {
        Ok(self.state.lock().frames.pop_front())
    }

    fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_order() {
        let bus = LoopbackBus::new(BusProtocol::Can);
        bus.send(0x100, &[1]).unwrap();
        bus.send(0x101, &[2, 3]).unwrap();

        assert_eq!(bus.receive().unwrap(), Some(BusFrame::new(0x100, vec![1])));
        assert_eq!(bus.receive().unwrap(), Some(BusFrame::new(0x101, vec![2, 3])));
        assert_eq!(bus.receive().unwrap(), None);
        assert_eq!(bus.last_error(), None);
    }

    #[test]
    fn test_can_limits_recorded() {
        let bus = LoopbackBus::new(BusProtocol::Can);
        assert!(matches!(bus.send(0x100, &[0; 9]), Err(DriverError::InvalidArgument(_))));
        assert!(bus.last_error().unwrap().contains("payload of 9 bytes"));

        assert!(bus.send(CAN_MAX_ID + 1, &[]).is_err());
        assert!(bus.last_error().unwrap().contains("out of range"));
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_modbus_slave_range() {
        let bus = LoopbackBus::new(BusProtocol::Modbus);
        assert!(bus.send(0, &[0x03]).is_err());
        assert!(bus.send(248, &[0x03]).is_err());
        bus.send(17, &[0x03, 0x00, 0x6B]).unwrap();
        assert_eq!(bus.pending(), 1);
    }

    #[test]
    fn test_queue_overflow() {
        let bus = LoopbackBus::with_depth(BusProtocol::EtherCat, 2);
        bus.send(1, &[]).unwrap();
        bus.send(2, &[]).unwrap();
        assert_eq!(
            bus.send(3, &[]),
            Err(DriverError::Transport("transmit queue overflow".into()))
        );
        assert_eq!(bus.last_error().as_deref(), Some("Transport error: transmit queue overflow"));
    }
}
