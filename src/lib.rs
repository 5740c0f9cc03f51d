#![cfg_attr(not(test), no_std)]

//! A small driver for X-Powers power management chips (written for AXP192)

pub(crate) mod fmt;
pub(crate) mod registers;

mod adc;
mod charge;
mod coulomb;
mod status;
mod supply;

use embedded_hal_async::i2c;
use fmt::*;
use registers::*;

pub use adc::{AdcChannel, AdcChannels, AdcRate};
pub use coulomb::CoulombCounters;
pub use status::{BatteryStatus, FullBatteryCheck, PowerInputs, ZeroDischargeCheck};
pub use supply::{Supply, SupplyStatus};

/// Bus address of the chip. The AXP192 does not decode anything else
pub const DEFAULT_ADDR: u8 = 0x34;

/// Driver configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Bus address of the PMU
    pub addr: u8,
    /// The battery can be detached, so its presence is probed instead of assumed
    pub removable_battery: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR,
            removable_battery: false,
        }
    }
}

/// Driver error type
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    I2cError(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2cError(e)
    }
}

/// Chip handle
pub struct AxpPmu<I, F = ZeroDischargeCheck> {
    i2c: I,
    addr: u8,
    removable_battery: bool,
    adc_enable: AdcChannels,
    charge_setting: Option<u8>,
    chip_id: Option<u8>,
    full_check: F,
}

impl<I, E> AxpPmu<I>
where
    I: i2c::I2c<Error = E>,
{
    /// Creates the driver instance with the stock full-battery rule
    pub fn new(i2c: I, config: Config) -> Self {
        Self::with_full_check(i2c, config, ZeroDischargeCheck)
    }
}

impl<I, F, E> AxpPmu<I, F>
where
    I: i2c::I2c<Error = E>,
{
    /// Creates the driver instance with a caller-supplied full-battery rule
    pub fn with_full_check(i2c: I, config: Config, full_check: F) -> Self {
        Self {
            i2c,
            addr: config.addr,
            removable_battery: config.removable_battery,
            adc_enable: AdcChannels::empty(),
            charge_setting: None,
            chip_id: None,
            full_check,
        }
    }

    pub(crate) async fn read_register(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut response = [0];

        self.i2c
            .write_read(self.addr, &[reg], &mut response)
            .await?;

        Ok(response[0])
    }

    pub(crate) async fn read_registers(
        &mut self,
        reg: u8,
        data: &mut [u8],
    ) -> Result<(), Error<E>> {
        self.i2c.write_read(self.addr, &[reg], data).await?;
        Ok(())
    }

    pub(crate) async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c.write(self.addr, &[reg, value]).await?;
        Ok(())
    }

    /// Read-modify-write of the bits selected by `mask`
    pub(crate) async fn modify_register(
        &mut self,
        reg: u8,
        mask: u8,
        value: u8,
    ) -> Result<(), Error<E>> {
        let old = self.read_register(reg).await?;
        self.write_register(reg, (old & !mask) | (value & mask))
            .await
    }

    pub(crate) async fn set_register_bit(
        &mut self,
        reg: u8,
        bit: u8,
        set: bool,
    ) -> Result<(), Error<E>> {
        let value = if set { 1 << bit } else { 0 };
        self.modify_register(reg, 1 << bit, value).await
    }

    /// Brings the cached state in sync with the hardware. Must be called once
    /// before any other operation.
    ///
    /// Probe failures leave the affected part of the state unknown and are not
    /// reported; only a failed write to the ADC enable registers is.
    pub async fn init(&mut self) -> Result<(), Error<E>> {
        // The id register is not in the datasheet, but the whole family
        // responds to it
        self.chip_id = self.read_register(CHIP_ID).await.ok();
        debug!("chip id {}", self.chip_id);

        self.probe_enabled_adcs().await;

        // Battery-full detection samples the discharge current, keep that
        // channel running at all times
        let wanted = self.adc_enable | AdcChannels::DISCHARGE_CURRENT;
        self.set_adc_enabled(wanted).await?;

        self.charge_setting = self
            .read_register(CHARGE_CONTROL1)
            .await
            .ok()
            .map(|v| v & 0x0f);

        Ok(())
    }

    /// Chip id byte probed at `init`
    pub fn chip_id(&self) -> Option<u8> {
        self.chip_id
    }

    /// Issues the shutdown command, cutting power to the whole system.
    /// If this returns at all, the rails are still winding down.
    pub async fn power_off(&mut self) -> Result<(), Error<E>> {
        info!("shutting down");
        self.set_register_bit(SHUTDOWN_LED_CTRL, 7, true).await
    }

    /// Destroys the driver and hands the bus back
    pub fn release(self) -> I {
        self.i2c
    }
}
