// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Command catalog of the STCC4.
//!
//! Each command is bound to a fixed payload size, response size and the
//! time the sensor needs to process it before a result can be read.

use crate::crc::WORD_LEN;

/// Capacity of the write buffer, opcode included.
pub const WRITE_BUFFER_LEN: usize = 16;

/// Size of an opcode on the wire.
pub const OPCODE_LEN: usize = 2;

/// Shape of a command on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub opcode: u16,
    /// CRC guarded words following the opcode
    pub payload_words: usize,
    /// CRC guarded words returned by the sensor
    pub response_words: usize,
    /// Processing time in milliseconds
    pub delay_ms: u32,
}

impl Descriptor {
    /// Bytes written for this command, opcode included
    pub const fn frame_len(&self) -> usize {
        OPCODE_LEN + self.payload_words * WORD_LEN
    }

    /// Bytes read back for this command
    pub const fn response_len(&self) -> usize {
        self.response_words * WORD_LEN
    }
}

/// List of STCC4 sensor commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    StartContinuousMeasurement,
    StopContinuousMeasurement,
    ReadMeasurement,
    SetRhtCompensation,
    SetPressureCompensation,
    MeasureSingleShot,
    EnterSleepMode,
    PerformConditioning,
    PerformFactoryReset,
    PerformSelfTest,
    EnableTestingMode,
    DisableTestingMode,
    PerformForcedRecalibration,
    GetProductId,
}

impl Command {
    pub const ALL: [Command; 14] = [
        Command::StartContinuousMeasurement,
        Command::StopContinuousMeasurement,
        Command::ReadMeasurement,
        Command::SetRhtCompensation,
        Command::SetPressureCompensation,
        Command::MeasureSingleShot,
        Command::EnterSleepMode,
        Command::PerformConditioning,
        Command::PerformFactoryReset,
        Command::PerformSelfTest,
        Command::EnableTestingMode,
        Command::DisableTestingMode,
        Command::PerformForcedRecalibration,
        Command::GetProductId,
    ];

    pub const fn descriptor(self) -> Descriptor {
        // (opcode, payload words, response words, delay ms)
        let (opcode, payload_words, response_words, delay_ms) = match self {
            Self::StartContinuousMeasurement => (0x218B, 0, 0, 1000),
            Self::StopContinuousMeasurement => (0x3F86, 0, 0, 1200),
            Self::ReadMeasurement => (0xEC05, 0, 4, 1),
            Self::SetRhtCompensation => (0xE000, 2, 0, 1),
            Self::SetPressureCompensation => (0xE016, 1, 0, 1),
            Self::MeasureSingleShot => (0x219D, 0, 0, 500),
            Self::EnterSleepMode => (0x3650, 0, 0, 1),
            Self::PerformConditioning => (0x29BC, 0, 0, 22000),
            Self::PerformFactoryReset => (0x3632, 0, 1, 90),
            Self::PerformSelfTest => (0x278C, 0, 1, 360),
            Self::EnableTestingMode => (0x3FBC, 0, 0, 0),
            Self::DisableTestingMode => (0x3F3D, 0, 0, 0),
            Self::PerformForcedRecalibration => (0x362F, 1, 1, 90),
            Self::GetProductId => (0x365B, 0, 6, 1),
        };
        Descriptor {
            opcode,
            payload_words,
            response_words,
            delay_ms,
        }
    }

    pub const fn opcode(self) -> u16 {
        self.descriptor().opcode
    }
}

// every catalog frame has to fit into the write buffer
const _: () = {
    let mut i = 0;
    while i < Command::ALL.len() {
        assert!(Command::ALL[i].descriptor().frame_len() <= WRITE_BUFFER_LEN);
        i += 1;
    }
};

/// Commands sent as one byte without opcode high byte or CRC.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ByteCommand {
    /// Wakes the sensor, sent to the sensor address
    ExitSleepMode,
    /// Sent to the general call address
    SoftReset,
}

impl ByteCommand {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::ExitSleepMode => 0x00,
            Self::SoftReset => 0x06,
        }
    }

    pub fn delay_ms(self) -> u32 {
        match self {
            Self::ExitSleepMode => 5,
            Self::SoftReset => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes_are_unique() {
        for (i, a) in Command::ALL.iter().enumerate() {
            for b in &Command::ALL[i + 1..] {
                assert_ne!(a.opcode(), b.opcode(), "{a:?} and {b:?}");
            }
        }
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(Command::ReadMeasurement.descriptor().response_len(), 12);
        assert_eq!(Command::GetProductId.descriptor().response_len(), 18);
        assert_eq!(Command::SetRhtCompensation.descriptor().frame_len(), 8);
        assert_eq!(Command::PerformConditioning.descriptor().delay_ms, 22000);
    }
}
