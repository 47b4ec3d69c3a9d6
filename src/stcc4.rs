// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use log::{debug, info, warn};

use crate::command::{ByteCommand, Command, Descriptor};
use crate::conversion;
use crate::crc::{decode_words, WORD_LEN};
use crate::error::{Error, Result};
use crate::measurement::{Measurement, MEASUREMENT_LEN};
use crate::transport::{self, Frame, Transport};

/// Product id every STCC4 reports
pub const PRODUCT_ID: u32 = 0x0901018A;

/// Soft reset is broadcast to this address
pub const GENERAL_CALL_ADDRESS: u8 = 0x00;

/// Response length of the get product id command
pub const IDENTITY_LEN: usize = 18;

// largest response in the catalog
const MAX_RESPONSE_LEN: usize = IDENTITY_LEN;

/// I2C address selected by the ADDR pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressPin {
    /// ADDR connected to GND
    #[default]
    Gnd,
    /// ADDR connected to VCC
    Vcc,
}

impl AddressPin {
    /// 7-bit bus address
    pub fn address(self) -> u8 {
        match self {
            Self::Gnd => 0x64,
            Self::Vcc => 0x65,
        }
    }
}

/// Lifecycle of a [`Stcc4`] handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No transport attached
    Unbound,
    /// Transport attached, device not initialized
    Bound,
    /// Reset issued and identity verified
    Initialized,
}

/// Product id and unique serial number of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub product_id: u32,
    pub serial_number: [u8; 8],
}

impl DeviceIdentity {
    /// Validates all six words of a get product id response
    pub fn from_response(buffer: &[u8; IDENTITY_LEN]) -> Result<DeviceIdentity> {
        let words = decode_words::<6>(buffer)?;
        let mut serial_number = [0u8; 8];
        for (chunk, word) in serial_number.chunks_exact_mut(2).zip(&words[2..]) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Ok(DeviceIdentity {
            product_id: ((words[0] as u32) << 16) | words[1] as u32,
            serial_number,
        })
    }
}

/// Static chip information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipInfo {
    pub chip_name: &'static str,
    pub manufacturer_name: &'static str,
    pub interface: &'static str,
    pub supply_voltage_min_v: f32,
    pub supply_voltage_max_v: f32,
    pub max_current_ma: f32,
    pub temperature_min: f32,
    pub temperature_max: f32,
    pub driver_version: u32,
}

/// Chip information, available without a device
pub fn info() -> ChipInfo {
    ChipInfo {
        chip_name: "Sensirion STCC4",
        manufacturer_name: "Sensirion",
        interface: "IIC",
        supply_voltage_min_v: 2.7,
        supply_voltage_max_v: 5.5,
        max_current_ma: 4.2,
        temperature_min: -40.0,
        temperature_max: 85.0,
        driver_version: 1000,
    }
}

/// STCC4 Struct, owns the bus transport
/// and has implemented related STCC4 operations
///
/// Every operation blocks for the processing time of its command. A handle
/// is not reentrant; share it between threads behind a mutex.
///
pub struct Stcc4<T: Transport> {
    transport: Option<T>,
    address: AddressPin,
    initialized: bool,
}

/// Implementation of STCC4 related
/// operations
///
impl<T: Transport> Stcc4<T> {
    /// Create a STCC4 handle without transport.
    /// [`Stcc4::bind`] has to be called before [`Stcc4::init`].
    ///
    pub fn unbound(address: AddressPin) -> Stcc4<T> {
        Stcc4 {
            transport: None,
            address,
            initialized: false,
        }
    }

    /// Create a STCC4 handle on the given transport.
    /// The bus is not touched until [`Stcc4::init`].
    ///
    pub fn new(transport: T, address: AddressPin) -> Stcc4<T> {
        Stcc4 {
            transport: Some(transport),
            address,
            initialized: false,
        }
    }

    /// Attach a transport, returning the previous one.
    /// The handle is left in [`State::Bound`]; a previous transport is not
    /// deinitialized.
    pub fn bind(&mut self, transport: T) -> Option<T> {
        self.initialized = false;
        self.transport.replace(transport)
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// Give the transport back, whatever the state
    pub fn release(self) -> Option<T> {
        self.transport
    }

    pub fn state(&self) -> State {
        match (&self.transport, self.initialized) {
            (None, _) => State::Unbound,
            (Some(_), false) => State::Bound,
            (Some(_), true) => State::Initialized,
        }
    }

    pub fn set_address_pin(&mut self, address: AddressPin) {
        self.address = address;
    }

    pub fn address_pin(&self) -> AddressPin {
        self.address
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            debug!("device is not initialized");
            Err(Error::NotInitialized)
        }
    }

    fn bus(&mut self) -> Result<&mut T> {
        self.ensure_initialized()?;
        self.transport.as_mut().ok_or(Error::Configuration)
    }

    /// Initialize the device.
    /// Acquires the bus, resets the sensor and checks the product id.
    /// On failure the bus is released again and the state is not changed.
    ///
    pub fn init(&mut self) -> Result<()> {
        let address = self.address.address();
        let Some(bus) = self.transport.as_mut() else {
            warn!("no transport bound");
            return Err(Error::Configuration);
        };
        bus.init().inspect_err(|e| warn!("bus init failed: {}", e))?;

        soft_reset(bus);
        let result = match read_identity(bus, address) {
            Ok(identity) if identity.product_id == PRODUCT_ID => Ok(identity),
            Ok(identity) => {
                warn!("product id {:#010x} is invalid", identity.product_id);
                Err(Error::InvalidIdentity(identity.product_id))
            }
            Err(e) => {
                warn!("get product id failed: {}", e);
                Err(e)
            }
        };

        match result {
            Ok(identity) => {
                info!("stcc4 at {:#04x} initialized, serial {:02x?}", address, identity.serial_number);
                self.initialized = true;
                Ok(())
            }
            Err(e) => {
                if let Err(deinit_error) = bus.deinit() {
                    debug!("bus deinit failed: {}", deinit_error);
                }
                Err(e)
            }
        }
    }

    /// Deinitialize the device.
    /// Stops the continuous measurements and releases the bus. If either
    /// step fails the device stays initialized.
    ///
    pub fn deinit(&mut self) -> Result<()> {
        let address = self.address.address();
        let bus = self.bus()?;
        let frame = Frame::new(Command::StopContinuousMeasurement.opcode());
        transport::write(bus, address, &frame).inspect_err(|e| warn!("stop continuous measurement failed: {}", e))?;
        bus.deinit().inspect_err(|e| warn!("bus deinit failed: {}", e))?;
        self.initialized = false;
        Ok(())
    }

    /// Writes a command without response and waits its processing time
    fn send(&mut self, command: Command, words: &[u16]) -> Result<()> {
        let Descriptor {
            opcode,
            payload_words,
            delay_ms,
            ..
        } = command.descriptor();
        debug_assert_eq!(words.len(), payload_words);
        let address = self.address.address();
        let bus = self.bus()?;
        let frame = Frame::with_words(opcode, words)?;
        transport::write(bus, address, &frame).inspect_err(|e| warn!("{:?} failed: {}", command, e))?;
        if delay_ms > 0 {
            bus.delay_ms(delay_ms);
        }
        Ok(())
    }

    /// Writes a command, waits its processing time and validates the `N`
    /// response words
    fn query<const N: usize>(&mut self, command: Command, words: &[u16]) -> Result<[u16; N]> {
        let descriptor = command.descriptor();
        debug_assert_eq!(words.len(), descriptor.payload_words);
        debug_assert_eq!(N, descriptor.response_words);
        let address = self.address.address();
        let bus = self.bus()?;
        let frame = Frame::with_words(descriptor.opcode, words)?;
        let mut buffer = [0u8; MAX_RESPONSE_LEN];
        let response = &mut buffer[..N * WORD_LEN];
        transport::write_then_read(bus, address, &frame, descriptor.delay_ms, response)
            .and_then(|_| decode_words::<N>(response))
            .inspect_err(|e| warn!("{:?} failed: {}", command, e))
    }

    /// Starts the continuous measurements, one sample per second.
    ///
    pub fn start_continuous_measurement(&mut self) -> Result<()> {
        self.send(Command::StartContinuousMeasurement, &[])
    }

    /// Stops the continuous measurements.
    ///
    pub fn stop_continuous_measurement(&mut self) -> Result<()> {
        self.send(Command::StopContinuousMeasurement, &[])
    }

    /// Get CO2, temperature and humidity of the last sample.
    /// All four words are checked before anything is converted.
    /// If the sensor flags the sample, [`Error::InvalidSensorStatus`] still
    /// carries the converted values.
    pub fn read_measurement(&mut self) -> Result<Measurement> {
        let Descriptor { opcode, delay_ms, .. } = Command::ReadMeasurement.descriptor();
        let address = self.address.address();
        let bus = self.bus()?;
        let mut buffer = [0u8; MEASUREMENT_LEN];
        transport::read(bus, address, opcode, delay_ms, &mut buffer)
            .inspect_err(|e| warn!("read measurement failed: {}", e))?;
        let measurement = Measurement::from_response(&buffer).inspect_err(|e| warn!("read measurement failed: {}", e))?;
        if !measurement.is_valid() {
            warn!("sensor status {:#06x} is invalid", measurement.sensor_status);
            return Err(Error::InvalidSensorStatus(measurement));
        }
        Ok(measurement)
    }

    /// Feeds external temperature and humidity into the CO2 compensation.
    /// Both values are register codes, see [`conversion`].
    pub fn set_rht_compensation(&mut self, temperature_raw: u16, humidity_raw: u16) -> Result<()> {
        self.send(Command::SetRhtCompensation, &[temperature_raw, humidity_raw])
    }

    /// Feeds the ambient pressure register code into the CO2 compensation.
    pub fn set_pressure_compensation(&mut self, pressure_raw: u16) -> Result<()> {
        self.send(Command::SetPressureCompensation, &[pressure_raw])
    }

    /// Triggers one sample, read it with [`Stcc4::read_measurement`].
    /// Must not be used while continuous measurements are running.
    pub fn measure_single_shot(&mut self) -> Result<()> {
        self.send(Command::MeasureSingleShot, &[])
    }

    pub fn enter_sleep_mode(&mut self) -> Result<()> {
        self.send(Command::EnterSleepMode, &[])
    }

    /// Wakes the sensor up.
    /// The sensor does not acknowledge the wake up byte, so a failed write
    /// is only logged.
    pub fn exit_sleep_mode(&mut self) -> Result<()> {
        let address = self.address.address();
        let bus = self.bus()?;
        let command = ByteCommand::ExitSleepMode;
        if let Err(e) = bus.write(address, &[command.as_byte()]) {
            debug!("exit sleep mode not acknowledged: {}", e);
        }
        bus.delay_ms(command.delay_ms());
        Ok(())
    }

    /// Conditions the sensor. Blocks for 22 seconds.
    pub fn perform_conditioning(&mut self) -> Result<()> {
        self.send(Command::PerformConditioning, &[])
    }

    /// Soft reset the sensor device through the general call address.
    ///
    pub fn perform_soft_reset(&mut self) -> Result<()> {
        soft_reset(self.bus()?);
        Ok(())
    }

    /// Restores the factory defaults.
    /// If the sensor reports a non-zero result returns [`Error::NotPassed`].
    pub fn perform_factory_reset(&mut self) -> Result<()> {
        let [result] = self.query::<1>(Command::PerformFactoryReset, &[])?;
        if result != 0 {
            warn!("factory reset not passed: {:#06x}", result);
            return Err(Error::NotPassed(result));
        }
        Ok(())
    }

    /// Runs the self test and returns its raw result, zero when passed.
    pub fn perform_self_test(&mut self) -> Result<u16> {
        let [result] = self.query::<1>(Command::PerformSelfTest, &[])?;
        Ok(result)
    }

    pub fn enable_testing_mode(&mut self) -> Result<()> {
        self.send(Command::EnableTestingMode, &[])
    }

    pub fn disable_testing_mode(&mut self) -> Result<()> {
        self.send(Command::DisableTestingMode, &[])
    }

    /// Sets a forced recalibration reference.
    /// `target_co2` is the register code of the reference, see
    /// [`conversion::frc_co2_to_register`]. Returns the correction the sensor
    /// applied, in the same encoding.
    pub fn perform_forced_recalibration(&mut self, target_co2: u16) -> Result<u16> {
        let [correction] = self.query::<1>(Command::PerformForcedRecalibration, &[target_co2])?;
        Ok(correction)
    }

    /// Reads product id and serial number.
    ///
    pub fn get_product_id(&mut self) -> Result<DeviceIdentity> {
        let address = self.address.address();
        read_identity(self.bus()?, address).inspect_err(|e| warn!("get product id failed: {}", e))
    }

    /// Writes `data` after `opcode` as is, no CRC is added.
    pub fn write_raw(&mut self, opcode: u16, data: &[u8]) -> Result<()> {
        let address = self.address.address();
        let bus = self.bus()?;
        let mut frame = Frame::new(opcode);
        frame.push_bytes(data)?;
        transport::write(bus, address, &frame)
    }

    /// Writes `opcode`, waits `delay_ms` and fills `buffer` without checking
    /// any CRC.
    pub fn read_raw(&mut self, opcode: u16, buffer: &mut [u8], delay_ms: u32) -> Result<()> {
        let address = self.address.address();
        transport::read(self.bus()?, address, opcode, delay_ms, buffer)
    }

    pub fn frc_co2_convert_to_register(&self, ppm: f32) -> Result<u16> {
        self.ensure_initialized()?;
        Ok(conversion::frc_co2_to_register(ppm))
    }

    pub fn frc_co2_convert_to_data(&self, reg: u16) -> Result<f32> {
        self.ensure_initialized()?;
        Ok(conversion::frc_co2_to_data(reg))
    }

    pub fn humidity_convert_to_register(&self, percentage: f32) -> Result<u16> {
        self.ensure_initialized()?;
        Ok(conversion::humidity_to_register(percentage))
    }

    pub fn humidity_convert_to_data(&self, reg: u16) -> Result<f32> {
        self.ensure_initialized()?;
        Ok(conversion::humidity_to_data(reg))
    }

    pub fn temperature_convert_to_register(&self, deg: f32) -> Result<u16> {
        self.ensure_initialized()?;
        Ok(conversion::temperature_to_register(deg))
    }

    pub fn temperature_convert_to_data(&self, reg: u16) -> Result<f32> {
        self.ensure_initialized()?;
        Ok(conversion::temperature_to_data(reg))
    }

    pub fn pressure_convert_to_register(&self, pa: f32) -> Result<u16> {
        self.ensure_initialized()?;
        Ok(conversion::pressure_to_register(pa))
    }

    pub fn pressure_convert_to_data(&self, reg: u16) -> Result<f32> {
        self.ensure_initialized()?;
        Ok(conversion::pressure_to_data(reg))
    }
}

// the sensor resets before it can acknowledge, the write result is meaningless
fn soft_reset<T: Transport>(bus: &mut T) {
    let command = ByteCommand::SoftReset;
    if let Err(e) = bus.write(GENERAL_CALL_ADDRESS, &[command.as_byte()]) {
        debug!("soft reset not acknowledged: {}", e);
    }
    bus.delay_ms(command.delay_ms());
}

fn read_identity<T: Transport>(bus: &mut T, address: u8) -> Result<DeviceIdentity> {
    let Descriptor { opcode, delay_ms, .. } = Command::GetProductId.descriptor();
    let mut buffer = [0u8; IDENTITY_LEN];
    transport::read(bus, address, opcode, delay_ms, &mut buffer)?;
    DeviceIdentity::from_response(&buffer)
}

// every catalog response has to fit into the read buffer
const _: () = {
    let mut i = 0;
    while i < Command::ALL.len() {
        assert!(Command::ALL[i].descriptor().response_len() <= MAX_RESPONSE_LEN);
        i += 1;
    }
};
