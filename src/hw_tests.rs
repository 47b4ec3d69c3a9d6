//! This module contains automated testcases that require an STCC4 attached to `/dev/i2c-1`
//! so they're not run by default. If you want to include them, run the tests with:
//! `cargo test --features hw-tests`

use serial_test::serial;

use crate::{AddressPin, LinuxBus, State, Stcc4, PRODUCT_ID};

fn open() -> Stcc4<LinuxBus> {
    let mut stcc4 = Stcc4::new(LinuxBus::default(), AddressPin::Gnd);
    stcc4.init().unwrap();
    stcc4
}

#[test]
#[serial]
pub fn test_init_deinit() {
    let mut stcc4 = open();
    assert_eq!(stcc4.get_product_id().unwrap().product_id, PRODUCT_ID);
    stcc4.deinit().unwrap();
    assert_eq!(stcc4.state(), State::Bound);
}

#[test]
#[serial]
pub fn test_single_shot() {
    let mut stcc4 = open();
    stcc4.measure_single_shot().unwrap();
    let m = stcc4.read_measurement().unwrap();
    assert!((-40.0..=85.0).contains(&m.temperature));
    assert!((0.0..=100.0).contains(&m.humidity));
    stcc4.deinit().unwrap();
}

#[test]
#[serial]
pub fn test_sleep_wake() {
    let mut stcc4 = open();
    stcc4.enter_sleep_mode().unwrap();
    stcc4.exit_sleep_mode().unwrap();
    assert_eq!(stcc4.perform_self_test().unwrap(), 0);
    stcc4.deinit().unwrap();
}
