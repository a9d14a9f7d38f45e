//! Test to verify test infrastructure works correctly

mod common;

use common::builders::ConfigBuilder;
use common::mock_helpers::counting_factory;
use ledshows::config::DriverKind;
use ledshows::LedStrip;
use std::sync::atomic::Ordering;

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let config = ConfigBuilder::new().num_leds(12).build();

    assert_eq!(config.strip.num_leds, 12);
    assert_eq!(config.strip.driver, DriverKind::Dummy);
    assert!(config.validate().is_ok());
}

#[test]
fn test_counting_factory() {
    let (factory, opened) = counting_factory(4, 1.0);
    let strip = factory().unwrap();
    assert_eq!(strip.num_leds(), 4);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
