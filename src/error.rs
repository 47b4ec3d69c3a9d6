// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;

use crate::measurement::Measurement;

///
///STCC4 error enum. Transport wraps the io error
///reported by the bus. Checksum when a crc 8
///checksum does not correspond with the calculated
///one.
///
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The handle has no transport bound yet
    #[error("no transport bound to the handle")]
    Configuration,

    /// The operation needs an initialized device
    #[error("device is not initialized")]
    NotInitialized,

    /// A bus write or read failed
    #[error("bus transaction failed")]
    Transport(#[from] io::Error),

    /// A response word carried a wrong checksum
    #[error("checksum mismatch in word {index}: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { index: usize, expected: u8, actual: u8 },

    /// The product id read during init is not an STCC4
    #[error("unexpected product id {0:#010x}")]
    InvalidIdentity(u32),

    /// Factory reset reported a non-zero result
    #[error("factory reset not passed, result {0:#06x}")]
    NotPassed(u16),

    /// The sample was read but the sensor flagged it. The sample is kept.
    #[error("invalid sensor status {:#06x}", .0.sensor_status)]
    InvalidSensorStatus(Measurement),
}

pub type Result<T> = std::result::Result<T, Error>;
