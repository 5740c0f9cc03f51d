//! Charge current limit control

use embedded_hal_async::i2c;

use crate::registers::CHARGE_CONTROL1;
use crate::{AxpPmu, Error};

/// Charge current settings supported by the hardware, in mA. The position in
/// the table is the value of the register field
const CHARGE_CURRENT_TABLE: [u16; 16] = [
    100, 190, 280, 360, 450, 550, 630, 700, 780, 880, 960, 1000, 1080, 1160, 1240, 1320,
];

impl<I, F, E> AxpPmu<I, F>
where
    I: i2c::I2c<Error = E>,
{
    /// Limits the charge current to the greatest supported setting not above
    /// `max_ma`, or to the lowest one if `max_ma` is below the whole table
    pub async fn set_charge_current(&mut self, max_ma: u16) -> Result<(), Error<E>> {
        let index = CHARGE_CURRENT_TABLE
            .iter()
            .rposition(|&ma| ma <= max_ma)
            .unwrap_or(0) as u8;

        if self.charge_setting == Some(index) {
            return Ok(());
        }

        self.modify_register(CHARGE_CONTROL1, 0x0f, index).await?;
        self.charge_setting = Some(index);

        Ok(())
    }

    /// Configured charge current limit in mA, from the cached setting.
    /// No bus traffic
    pub fn charge_current(&self) -> u16 {
        match self.charge_setting {
            Some(index) => CHARGE_CURRENT_TABLE[index as usize],
            None => CHARGE_CURRENT_TABLE[0],
        }
    }
}
