// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Raw register codes to engineering units and back.
//!
//! Conversions towards the register truncate toward zero, the same way the
//! sensor firmware expects them. No rounding is applied.

const FULL_SCALE: f32 = 65535.0;
const FRC_OFFSET: f32 = 32768.0;

/// Forced recalibration target in ppm to its offset-binary register
pub fn frc_co2_to_register(ppm: f32) -> u16 {
    (ppm + FRC_OFFSET) as u16
}

pub fn frc_co2_to_data(reg: u16) -> f32 {
    reg as f32 - FRC_OFFSET
}

/// Relative humidity in % to register
pub fn humidity_to_register(percentage: f32) -> u16 {
    ((percentage + 6.0) * FULL_SCALE / 125.0) as u16
}

pub fn humidity_to_data(reg: u16) -> f32 {
    reg as f32 / FULL_SCALE * 125.0 - 6.0
}

/// Temperature in Celsius to register
pub fn temperature_to_register(deg: f32) -> u16 {
    ((deg + 45.0) * FULL_SCALE / 175.0) as u16
}

pub fn temperature_to_data(reg: u16) -> f32 {
    reg as f32 / FULL_SCALE * 175.0 - 45.0
}

/// Pressure in Pa to register, 2 Pa per count
pub fn pressure_to_register(pa: f32) -> u16 {
    (pa / 2.0) as u16
}

pub fn pressure_to_data(reg: u16) -> f32 {
    reg as f32 * 2.0
}
