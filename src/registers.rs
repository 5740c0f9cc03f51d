//! These are low-level definitions for the AXP192 and close family members

#![allow(dead_code)]

use crate::fmt::bitflags;

/// Registers referenced from driver code. The per-rail voltage and ADC data
/// registers live in the descriptor tables instead.
pub const POWER_STATUS: u8 = 0x00;
pub const CHARGE_STATUS: u8 = 0x01;
pub const CHIP_ID: u8 = 0x03;
pub const SHUTDOWN_LED_CTRL: u8 = 0x32;
pub const CHARGE_CONTROL1: u8 = 0x33;
pub const ADC_ENABLE1: u8 = 0x82;
pub const ADC_ENABLE2: u8 = 0x83;
pub const ADC_SAMPLE_RATE: u8 = 0x84;
pub const COULOMB_COUNTER_BASE: u8 = 0xb0;
pub const COULOMB_COUNTER_CTRL: u8 = 0xb8;

bitflags! {
    /// Contents of the power status register (0x00)
    pub struct PowerStatus: u8 {
        const ACIN_PRESENT = 1 << 7;
        const ACIN_USABLE = 1 << 6;
        const VBUS_PRESENT = 1 << 5;
        const VBUS_USABLE = 1 << 4;
        const BATTERY_CHARGING = 1 << 2;
        const ACIN_VBUS_SHORTED = 1 << 1;
        /// Any external source present or usable
        const EXTERNAL = 0xf0;
    }
}

bitflags! {
    /// Contents of the charge status register (0x01)
    pub struct ChargeStatus: u8 {
        const OVERHEAT = 1 << 7;
        const CHARGING = 1 << 6;
        const BATTERY_PRESENT = 1 << 5;
    }
}
