//! ADC channel bookkeeping, raw register packing and unit conversion

use embedded_hal_async::i2c;

use crate::fmt::bitflags;
use crate::registers::{ADC_ENABLE1, ADC_ENABLE2, ADC_SAMPLE_RATE};
use crate::{AxpPmu, Error};

/// One telemetry input of the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcChannel {
    AcinVoltage,
    AcinCurrent,
    VbusVoltage,
    VbusCurrent,
    InternalTemp,
    TsInput,
    BatteryVoltage,
    ChargeCurrent,
    DischargeCurrent,
    ApsVoltage,
    /// Computed by the chip from battery voltage and discharge current
    BatteryPower,
}

pub(crate) const NUM_ADC_CHANNELS: usize = 11;

bitflags! {
    /// A set of ADC channels, one bit per [`AdcChannel`]
    pub struct AdcChannels: u16 {
        const ACIN_VOLTAGE = 1 << 0;
        const ACIN_CURRENT = 1 << 1;
        const VBUS_VOLTAGE = 1 << 2;
        const VBUS_CURRENT = 1 << 3;
        const INTERNAL_TEMP = 1 << 4;
        const TS_INPUT = 1 << 5;
        const BATTERY_VOLTAGE = 1 << 6;
        const CHARGE_CURRENT = 1 << 7;
        const DISCHARGE_CURRENT = 1 << 8;
        const APS_VOLTAGE = 1 << 9;
        const BATTERY_POWER = 1 << 10;
    }
}

/// ADC sample rate, shared by all channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcRate {
    Hz25 = 0,
    Hz50 = 1,
    Hz100 = 2,
    Hz200 = 3,
}

impl AdcRate {
    fn from_field(field: u8) -> Self {
        match field & 3 {
            0 => Self::Hz25,
            1 => Self::Hz50,
            2 => Self::Hz100,
            _ => Self::Hz200,
        }
    }
}

pub(crate) struct ChannelInfo {
    pub reg: u8,
    /// Enable register and bit. The composite battery-power channel has none
    pub enable: Option<(u8, u8)>,
}

pub(crate) const CHANNEL_INFO: [ChannelInfo; NUM_ADC_CHANNELS] = [
    // ACIN voltage
    ChannelInfo { reg: 0x56, enable: Some((ADC_ENABLE1, 5)) },
    // ACIN current
    ChannelInfo { reg: 0x58, enable: Some((ADC_ENABLE1, 4)) },
    // VBUS voltage
    ChannelInfo { reg: 0x5a, enable: Some((ADC_ENABLE1, 3)) },
    // VBUS current
    ChannelInfo { reg: 0x5c, enable: Some((ADC_ENABLE1, 2)) },
    // Internal temperature
    ChannelInfo { reg: 0x5e, enable: Some((ADC_ENABLE2, 7)) },
    // TS input, shares the enable bit with APS voltage
    ChannelInfo { reg: 0x62, enable: Some((ADC_ENABLE1, 1)) },
    // Battery voltage
    ChannelInfo { reg: 0x78, enable: Some((ADC_ENABLE1, 7)) },
    // Charge current
    ChannelInfo { reg: 0x7a, enable: Some((ADC_ENABLE1, 6)) },
    // Discharge current, same enable bit as charge current
    ChannelInfo { reg: 0x7c, enable: Some((ADC_ENABLE1, 6)) },
    // APS voltage
    ChannelInfo { reg: 0x7e, enable: Some((ADC_ENABLE1, 1)) },
    // Battery power
    ChannelInfo { reg: 0x70, enable: None },
];

impl AdcChannel {
    pub(crate) fn flag(self) -> AdcChannels {
        AdcChannels::from_bits_truncate(1 << self as u16)
    }

    /// Converts a raw reading to physical units: millivolts, milliamps,
    /// tenths of a degree Celsius or microwatts, depending on the channel
    pub fn convert(self, value: i32) -> i32 {
        match self {
            // 1.7 mV per LSB
            Self::AcinVoltage | Self::VbusVoltage => value * 17 / 10,
            // 0.625 mA per LSB
            Self::AcinCurrent => value * 5 / 8,
            // 0.375 mA per LSB
            Self::VbusCurrent => value * 3 / 8,
            // 0.1 degree per LSB, -144.7 C at zero
            Self::InternalTemp => value - 1447,
            // 0.8 mV per LSB
            Self::TsInput => value * 4 / 5,
            // 1.1 mV per LSB
            Self::BatteryVoltage => value * 11 / 10,
            // 0.5 mA per LSB
            Self::ChargeCurrent | Self::DischargeCurrent => value / 2,
            // 1.4 mV per LSB
            Self::ApsVoltage => value * 7 / 5,
            // 1.1 mV times 0.5 mA per LSB, comes out in microwatts
            Self::BatteryPower => value * 11 / 20,
        }
    }
}

impl<I, F, E> AxpPmu<I, F>
where
    I: i2c::I2c<Error = E>,
{
    /// Channels enabled right now, as last written or probed. No bus traffic
    pub fn adc_enabled(&self) -> AdcChannels {
        self.adc_enable
    }

    /// Switches ADC channels on and off.
    ///
    /// Channels sharing hardware are linked: requesting either current
    /// channel enables both, and requesting battery power forces the two
    /// channels it is computed from to run as well.
    pub async fn set_adc_enabled(&mut self, channels: AdcChannels) -> Result<(), Error<E>> {
        let mut wanted = channels;

        if wanted == self.adc_enable {
            return Ok(());
        }

        let mut regs = [0u8; 2];
        for (i, info) in CHANNEL_INFO.iter().enumerate() {
            let (reg, bit) = match info.enable {
                Some(e) => e,
                None => continue,
            };

            if channels.bits() & (1 << i) != 0 {
                regs[(reg - ADC_ENABLE1) as usize] |= 1 << bit;
            }
        }

        // The current channels share one enable bit, they only come as a pair
        if wanted.intersects(AdcChannels::CHARGE_CURRENT | AdcChannels::DISCHARGE_CURRENT) {
            wanted |= AdcChannels::CHARGE_CURRENT | AdcChannels::DISCHARGE_CURRENT;
        }

        // Battery power needs its two source channels running. Their bits go
        // to the hardware only, the caller did not ask for the readings
        if wanted.contains(AdcChannels::BATTERY_POWER) {
            if let Some((_, bit)) = CHANNEL_INFO[AdcChannel::DischargeCurrent as usize].enable {
                regs[0] |= 1 << bit;
            }
            if let Some((_, bit)) = CHANNEL_INFO[AdcChannel::BatteryVoltage as usize].enable {
                regs[0] |= 1 << bit;
            }
        }

        // Both enable registers in one transaction
        self.i2c
            .write(self.addr, &[ADC_ENABLE1, regs[0], regs[1]])
            .await?;

        self.adc_enable = wanted;
        Ok(())
    }

    /// Raw reading of a channel, `None` if the channel is off or unreachable
    pub async fn adc_read_raw(&mut self, adc: AdcChannel) -> Option<i32> {
        if !self.adc_enable.contains(adc.flag()) {
            return None;
        }

        let info = &CHANNEL_INFO[adc as usize];
        let mut data = [0u8; 3];
        let count = if adc == AdcChannel::BatteryPower { 3 } else { 2 };

        if self
            .read_registers(info.reg, &mut data[..count])
            .await
            .is_err()
        {
            return None;
        }

        let raw = match adc {
            // 24 bits across three bytes
            AdcChannel::BatteryPower => {
                ((data[0] as i32) << 16) | ((data[1] as i32) << 8) | data[2] as i32
            }
            // 13 bits: one full byte plus the five low bits of the next
            AdcChannel::ChargeCurrent | AdcChannel::DischargeCurrent => {
                ((data[0] as i32) << 5) | (data[1] & 0x1f) as i32
            }
            // 12 bits: one full byte plus the four low bits of the next
            _ => ((data[0] as i32) << 4) | (data[1] & 0x0f) as i32,
        };

        Some(raw)
    }

    /// Reading of a channel in physical units, `None` if the channel is off
    /// or unreachable
    pub async fn adc_read(&mut self, adc: AdcChannel) -> Option<i32> {
        let raw = self.adc_read_raw(adc).await?;
        Some(adc.convert(raw))
    }

    /// Configured sample rate, `Hz100` if the register cannot be read
    pub async fn adc_sample_rate(&mut self) -> AdcRate {
        match self.read_register(ADC_SAMPLE_RATE).await {
            Ok(r) => AdcRate::from_field(r >> 6),
            Err(_) => AdcRate::Hz100,
        }
    }

    pub async fn set_adc_sample_rate(&mut self, rate: AdcRate) -> Result<(), Error<E>> {
        self.modify_register(ADC_SAMPLE_RATE, 0xc0, (rate as u8) << 6)
            .await
    }

    /// Rebuilds the enable mask from whatever the hardware has running
    pub(crate) async fn probe_enabled_adcs(&mut self) {
        self.adc_enable = AdcChannels::empty();

        let mut regs = [0u8; 2];
        if self.read_registers(ADC_ENABLE1, &mut regs).await.is_err() {
            return;
        }

        for (i, info) in CHANNEL_INFO.iter().enumerate() {
            let (reg, bit) = match info.enable {
                Some(e) => e,
                None => continue,
            };

            if regs[(reg - ADC_ENABLE1) as usize] & (1 << bit) != 0 {
                self.adc_enable |= AdcChannels::from_bits_truncate(1 << i);
            }
        }

        // The composite channel is live only with both of its sources
        if self
            .adc_enable
            .contains(AdcChannels::BATTERY_VOLTAGE | AdcChannels::DISCHARGE_CURRENT)
        {
            self.adc_enable |= AdcChannels::BATTERY_POWER;
        }
    }
}
