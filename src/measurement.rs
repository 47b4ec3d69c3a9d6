// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use crate::crc::decode_words;
use crate::error::Result;

/// Response length of the read measurement command
pub const MEASUREMENT_LEN: usize = 12;

/// One sample as reported by the sensor, raw codes next to converted values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub co2_raw: i16,
    /// CO2 in ppm, the sensor already reports ppm
    pub co2_ppm: i16,
    pub temperature_raw: u16,
    /// Celsius
    pub temperature: f32,
    pub humidity_raw: u16,
    /// Relative humidity in %
    pub humidity: f32,
    /// Zero when the sample is valid
    pub sensor_status: u16,
}

impl Measurement {
    /// Validates the four words of a read measurement response and converts
    /// them. Any CRC mismatch discards the whole sample.
    pub fn from_response(buffer: &[u8; MEASUREMENT_LEN]) -> Result<Measurement> {
        let [co2, temperature_raw, humidity_raw, sensor_status] = decode_words::<4>(buffer)?;
        Ok(Measurement::from_raw(co2 as i16, temperature_raw, humidity_raw, sensor_status))
    }

    pub fn from_raw(co2_raw: i16, temperature_raw: u16, humidity_raw: u16, sensor_status: u16) -> Measurement {
        Measurement {
            co2_raw,
            co2_ppm: co2_raw,
            temperature_raw,
            temperature: -45.0 + 175.0 * temperature_raw as f32 / 65535.0,
            humidity_raw,
            humidity: 125.0 * humidity_raw as f32 / 65535.0 - 6.0,
            sensor_status,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.sensor_status == 0
    }
}
