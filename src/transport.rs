// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Bus transport and command framing.
//!
//! [`Transport`] is the seam between the driver and the bus. [`LinuxBus`]
//! implements it on top of a Linux `/dev/i2c-*` device node. The framing
//! helpers below turn an opcode and its payload into a single bus write and
//! read back the response after the command's processing time.

use i2cdev::core::*;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use std::io;
use std::path::{Path, PathBuf};
use std::{thread, time};

use crate::command::{OPCODE_LEN, WRITE_BUFFER_LEN};
use crate::crc::encode_word;
use crate::error::Result;

/// Primitives the driver needs from the bus.
pub trait Transport {
    /// Acquire the bus
    fn init(&mut self) -> io::Result<()>;

    /// Release the bus
    fn deinit(&mut self) -> io::Result<()>;

    /// One write transaction to the 7-bit `address`
    fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()>;

    /// One read transaction filling `buffer` from the 7-bit `address`
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> io::Result<()>;

    /// Block the calling thread
    fn delay_ms(&mut self, ms: u32);
}

/// Default bus on a Raspberry Pi
pub const DEFAULT_BUS_PATH: &str = "/dev/i2c-1";

/// Transport over a Linux I2C device node.
///
/// The node is opened by [`Transport::init`] and closed by
/// [`Transport::deinit`]. The slave address is switched on demand so the
/// same bus can reach the general call address.
pub struct LinuxBus {
    path: PathBuf,
    device: Option<LinuxI2CDevice>,
    address: u8,
}

impl LinuxBus {
    pub fn new<P: AsRef<Path>>(path: P) -> LinuxBus {
        LinuxBus {
            path: path.as_ref().to_path_buf(),
            device: None,
            address: crate::AddressPin::Gnd.address(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn device(&mut self, address: u8) -> io::Result<&mut LinuxI2CDevice> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "i2c bus is not open"))?;
        if self.address != address {
            device.set_slave_address(address as u16).map_err(bus_error)?;
            self.address = address;
        }
        Ok(device)
    }
}

impl Default for LinuxBus {
    fn default() -> Self {
        LinuxBus::new(DEFAULT_BUS_PATH)
    }
}

fn bus_error(e: LinuxI2CError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

impl Transport for LinuxBus {
    fn init(&mut self) -> io::Result<()> {
        if self.device.is_none() {
            let device = LinuxI2CDevice::new(&self.path, self.address as u16).map_err(bus_error)?;
            self.device = Some(device);
        }
        Ok(())
    }

    fn deinit(&mut self) -> io::Result<()> {
        // closing the file descriptor releases the bus
        self.device = None;
        Ok(())
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()> {
        self.device(address)?.write(bytes).map_err(bus_error)
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> io::Result<()> {
        self.device(address)?.read(buffer).map_err(bus_error)
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(time::Duration::from_millis(ms as u64));
    }
}

/// Write buffer holding one command frame.
///
/// Capacity is [`WRITE_BUFFER_LEN`]; pushing past it fails instead of
/// allocating.
#[derive(Debug, Clone)]
pub struct Frame {
    buffer: [u8; WRITE_BUFFER_LEN],
    len: usize,
}

impl Frame {
    pub fn new(opcode: u16) -> Frame {
        let mut buffer = [0u8; WRITE_BUFFER_LEN];
        buffer[..OPCODE_LEN].copy_from_slice(&opcode.to_be_bytes());
        Frame {
            buffer,
            len: OPCODE_LEN,
        }
    }

    /// Appends unguarded bytes
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.len + bytes.len();
        if end > WRITE_BUFFER_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds the {} byte write buffer", end, WRITE_BUFFER_LEN),
            )
            .into());
        }
        self.buffer[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    /// Appends a word followed by its CRC
    pub fn push_word(&mut self, value: u16) -> Result<()> {
        self.push_bytes(&encode_word(value))
    }

    pub fn with_words(opcode: u16, words: &[u16]) -> Result<Frame> {
        let mut frame = Frame::new(opcode);
        for word in words {
            frame.push_word(*word)?;
        }
        Ok(frame)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

/// Sends `frame` in exactly one bus write.
pub fn write<T: Transport>(bus: &mut T, address: u8, frame: &Frame) -> Result<()> {
    bus.write(address, frame.as_bytes())?;
    Ok(())
}

/// Sends `frame`, waits `delay_ms` and reads `response.len()` bytes.
pub fn write_then_read<T: Transport>(
    bus: &mut T,
    address: u8,
    frame: &Frame,
    delay_ms: u32,
    response: &mut [u8],
) -> Result<()> {
    bus.write(address, frame.as_bytes())?;
    bus.delay_ms(delay_ms);
    bus.read(address, response)?;
    Ok(())
}

/// Sends a bare opcode, waits `delay_ms` and reads `response.len()` bytes.
pub fn read<T: Transport>(bus: &mut T, address: u8, opcode: u16, delay_ms: u32, response: &mut [u8]) -> Result<()> {
    write_then_read(bus, address, &Frame::new(opcode), delay_ms, response)
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// One primitive invocation seen by the mock
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Init,
        Deinit,
        Write { address: u8, data: Vec<u8> },
        Read { address: u8, len: usize },
        Delay(u32),
    }

    /// Transport recording every call and serving scheduled read responses.
    #[derive(Debug, Default)]
    pub struct MockBus {
        pub calls: Vec<Call>,
        pub next_reads: VecDeque<Vec<u8>>,
        pub fail_init: bool,
        pub fail_deinit: bool,
        /// writes whose data starts with one of these prefixes fail
        pub failing_writes: Vec<Vec<u8>>,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn schedule_read(&mut self, data: &[u8]) {
            self.next_reads.push_back(data.into());
        }

        pub fn fail_writes_starting_with(&mut self, prefix: &[u8]) {
            self.failing_writes.push(prefix.into());
        }

        /// Calls that touched the bus, delays excluded
        pub fn bus_calls(&self) -> usize {
            self.calls.iter().filter(|c| !matches!(c, Call::Delay(_))).count()
        }

        pub fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }

        pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Write { address, data } => Some((*address, data.clone())),
                    _ => None,
                })
                .collect()
        }

        pub fn delays(&self) -> Vec<u32> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Delay(ms) => Some(*ms),
                    _ => None,
                })
                .collect()
        }
    }

    impl Transport for MockBus {
        fn init(&mut self) -> io::Result<()> {
            self.calls.push(Call::Init);
            if self.fail_init {
                return Err(io::ErrorKind::NotFound.into());
            }
            Ok(())
        }

        fn deinit(&mut self) -> io::Result<()> {
            self.calls.push(Call::Deinit);
            if self.fail_deinit {
                return Err(io::ErrorKind::Other.into());
            }
            Ok(())
        }

        fn write(&mut self, address: u8, bytes: &[u8]) -> io::Result<()> {
            self.calls.push(Call::Write {
                address,
                data: bytes.into(),
            });
            if self.failing_writes.iter().any(|p| bytes.starts_with(p)) {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            Ok(())
        }

        fn read(&mut self, address: u8, buffer: &mut [u8]) -> io::Result<()> {
            self.calls.push(Call::Read {
                address,
                len: buffer.len(),
            });
            let data = match self.next_reads.pop_front() {
                None => return Err(io::ErrorKind::TimedOut.into()),
                Some(x) => x,
            };
            if data.len() != buffer.len() {
                // the read request doesn't match the scheduled response
                return Err(io::ErrorKind::InvalidData.into());
            }
            buffer.copy_from_slice(&data);
            Ok(())
        }

        fn delay_ms(&mut self, ms: u32) {
            self.calls.push(Call::Delay(ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{Call, MockBus};
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_frame_with_words() {
        let frame = Frame::with_words(0xE000, &[0x0000, 0xBEEF]).unwrap();
        assert_eq!(frame.as_bytes(), &[0xE0, 0x00, 0x00, 0x00, 0x81, 0xBE, 0xEF, 0x92]);
    }

    #[test]
    fn test_frame_overflow() {
        // 2 + 4 * 3 = 14 fits, a fifth word does not
        let mut frame = Frame::with_words(0x1234, &[1, 2, 3, 4]).unwrap();
        assert_eq!(frame.as_bytes().len(), 14);
        match frame.push_word(5) {
            Err(Error::Transport(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(frame.as_bytes().len(), 14);
        frame.push_bytes(&[0xAA, 0xBB]).unwrap();
        assert!(frame.push_bytes(&[0xCC]).is_err());
    }

    #[test]
    fn test_write_then_read_order() {
        let mut bus = MockBus::new();
        bus.schedule_read(&[0x01, 0x02, 0x03]);
        let mut response = [0u8; 3];
        read(&mut bus, 0x64, 0x278C, 360, &mut response).unwrap();

        assert_eq!(response, [0x01, 0x02, 0x03]);
        assert_eq!(
            bus.calls,
            vec![
                Call::Write {
                    address: 0x64,
                    data: vec![0x27, 0x8C]
                },
                Call::Delay(360),
                Call::Read { address: 0x64, len: 3 },
            ]
        );
    }

    #[test]
    fn test_failed_write_skips_read() {
        let mut bus = MockBus::new();
        bus.fail_writes_starting_with(&[0xEC, 0x05]);
        let mut response = [0u8; 12];
        assert!(matches!(
            read(&mut bus, 0x64, 0xEC05, 1, &mut response),
            Err(Error::Transport(_))
        ));
        assert_eq!(bus.bus_calls(), 1);
        assert!(bus.delays().is_empty());
    }

    #[test]
    fn test_linux_bus_requires_init() {
        let mut bus = LinuxBus::new("/dev/does-not-exist");
        assert_eq!(bus.path(), Path::new("/dev/does-not-exist"));
        let err = bus.write(0x64, &[0x00]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(bus.init().is_err());
    }
}
