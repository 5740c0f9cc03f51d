//! Voltage rail control

use embedded_hal_async::i2c;

use crate::{AxpPmu, Error};

/// An output rail of the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Supply {
    Dcdc1,
    Dcdc2,
    Dcdc3,
    Ldo1,
    Ldo2,
    Ldo3,
    LdoIo0,
}

const NUM_SUPPLIES: usize = 7;

/// State of a rail as reported by [`AxpPmu::supply_voltage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupplyStatus {
    /// The chip has no control over this rail
    NotPresent,
    /// Switched off, or impossible to query
    Disabled,
    /// Switched on at this many millivolts
    Enabled(i32),
}

impl core::fmt::Display for SupplyStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotPresent => write!(f, "not present"),
            Self::Disabled => write!(f, "disabled"),
            Self::Enabled(mv) => write!(f, "{} mV", mv),
        }
    }
}

/// How a rail is switched on and off
#[derive(Clone, Copy)]
enum Enable {
    /// Hardwired on, nothing to control
    Always,
    /// An ordinary enable bit
    Bit { reg: u8, bit: u8 },
    /// On only while the masked field of `reg` holds `value`. Used for the
    /// GPIO-multiplexed rail, which cannot be switched from here
    Mode { reg: u8, mask: u8, value: u8 },
}

struct SupplyInfo {
    /// Voltage register and field mask, if the rail is adjustable at all
    volt: Option<(u8, u8)>,
    enable: Enable,
    min_mv: i32,
    max_mv: i32,
    step_mv: i32,
}

impl SupplyInfo {
    fn field_for(&self, millivolts: i32) -> u8 {
        ((millivolts - self.min_mv) / self.step_mv) as u8
    }

    fn voltage_of(&self, field: u8) -> i32 {
        self.min_mv + field as i32 * self.step_mv
    }
}

const SUPPLY_INFO: [SupplyInfo; NUM_SUPPLIES] = [
    // DCDC1
    SupplyInfo {
        volt: Some((0x26, 0x7f)),
        enable: Enable::Bit { reg: 0x12, bit: 0 },
        min_mv: 700,
        max_mv: 3500,
        step_mv: 25,
    },
    // DCDC2
    SupplyInfo {
        volt: Some((0x23, 0x3f)),
        enable: Enable::Bit { reg: 0x10, bit: 0 },
        min_mv: 700,
        max_mv: 2275,
        step_mv: 25,
    },
    // DCDC3
    SupplyInfo {
        volt: Some((0x27, 0x7f)),
        enable: Enable::Bit { reg: 0x12, bit: 1 },
        min_mv: 700,
        max_mv: 3500,
        step_mv: 25,
    },
    // LDO1 keeps the RTC domain alive, hardwired on
    SupplyInfo {
        volt: None,
        enable: Enable::Always,
        min_mv: 0,
        max_mv: 0,
        step_mv: 0,
    },
    // LDO2
    SupplyInfo {
        volt: Some((0x28, 0xf0)),
        enable: Enable::Bit { reg: 0x12, bit: 2 },
        min_mv: 1800,
        max_mv: 3300,
        step_mv: 100,
    },
    // LDO3
    SupplyInfo {
        volt: Some((0x28, 0x0f)),
        enable: Enable::Bit { reg: 0x12, bit: 3 },
        min_mv: 1800,
        max_mv: 3300,
        step_mv: 100,
    },
    // LDO_IO0 exists only while GPIO0 is multiplexed to its low-noise
    // LDO function
    SupplyInfo {
        volt: Some((0x91, 0xf0)),
        enable: Enable::Mode {
            reg: 0x90,
            mask: 0x07,
            value: 0x02,
        },
        min_mv: 1800,
        max_mv: 3300,
        step_mv: 100,
    },
];

impl<I, F, E> AxpPmu<I, F>
where
    I: i2c::I2c<Error = E>,
{
    /// Sets a rail's output voltage, switching the rail on for a positive
    /// request and off for zero or less.
    ///
    /// Requests against absent or fixed rails, and voltages outside the
    /// rail's range, are silently ignored.
    pub async fn supply_set_voltage(
        &mut self,
        supply: Supply,
        millivolts: i32,
    ) -> Result<(), Error<E>> {
        let info = &SUPPLY_INFO[supply as usize];

        let (volt_reg, volt_mask) = match info.volt {
            Some((reg, mask)) if mask != 0 => (reg, mask),
            _ => return Ok(()),
        };

        if millivolts > 0 && info.step_mv != 0 {
            if millivolts < info.min_mv || millivolts > info.max_mv {
                return Ok(());
            }

            let field = info.field_for(millivolts);
            self.modify_register(volt_reg, volt_mask, field << volt_mask.trailing_zeros())
                .await?;
        }

        if let Enable::Bit { reg, bit } = info.enable {
            self.set_register_bit(reg, bit, millivolts > 0).await?;
        }

        Ok(())
    }

    /// State and output voltage of a rail. A rail that cannot be queried is
    /// reported as disabled
    pub async fn supply_voltage(&mut self, supply: Supply) -> SupplyStatus {
        let info = &SUPPLY_INFO[supply as usize];

        let (volt_reg, volt_mask) = match info.volt {
            Some(v) => v,
            None => return SupplyStatus::NotPresent,
        };

        let enabled = match info.enable {
            Enable::Always => true,
            Enable::Bit { reg, bit } => match self.read_register(reg).await {
                Ok(r) => r & (1 << bit) != 0,
                Err(_) => false,
            },
            Enable::Mode { reg, mask, value } => match self.read_register(reg).await {
                Ok(r) => r & mask == value,
                Err(_) => false,
            },
        };

        if !enabled {
            return SupplyStatus::Disabled;
        }

        // A fixed rail has nothing to read back
        if volt_mask == 0 {
            return SupplyStatus::Enabled(info.min_mv);
        }

        match self.read_register(volt_reg).await {
            Ok(r) => {
                let field = (r & volt_mask) >> volt_mask.trailing_zeros();
                SupplyStatus::Enabled(info.voltage_of(field))
            }
            Err(_) => SupplyStatus::Disabled,
        }
    }
}
