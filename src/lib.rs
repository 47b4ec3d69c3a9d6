// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! STCC4 driver implementing the CO2 sensor command set over I2C
//!
//! Every command is framed as a big-endian opcode followed by CRC-8 guarded
//! words, and every response word is checked before it is exposed. The bus
//! is reached through the [`Transport`] trait; [`LinuxBus`] implements it on
//! a Linux `/dev/i2c-*` node.
//!
//! Diagnostics go through the [`log`] facade, install any logger to see them.
//!
//! ## Basic Example
//!
//! Obtaining measurements, co2, temperature and humidity
//!
//!```no_run
//!use stcc4_i2c::{AddressPin, LinuxBus, Stcc4};
//!use std::thread;
//!use std::time::Duration;
//!
//!fn main() {
//!    let mut stcc4 = Stcc4::new(LinuxBus::default(), AddressPin::Gnd);
//!    stcc4.init().unwrap();
//!    stcc4.start_continuous_measurement().unwrap();
//!
//!    loop {
//!        thread::sleep(Duration::from_secs(1));
//!        match stcc4.read_measurement() {
//!            Ok(m) => {
//!                println!("Co2: {} ppm Temp: {:.2} C RH: {:.2} %", m.co2_ppm, m.temperature, m.humidity);
//!            }
//!            Err(e) => {
//!                println!("Error obtaining measurements. More details: {}", e);
//!            }
//!        }
//!    }
//!}
//!```
//!

pub mod command;
pub mod conversion;
pub mod crc;
mod error;
pub mod measurement;
/// Driver handle implementing STCC4 device related operations
pub mod stcc4;
pub mod transport;

#[cfg(all(test, feature = "hw-tests"))]
mod hw_tests;

pub use error::*;
pub use measurement::Measurement;
pub use stcc4::{info, AddressPin, ChipInfo, DeviceIdentity, State, Stcc4, PRODUCT_ID};
pub use transport::{LinuxBus, Transport};
