//! Battery and input status inference

use embedded_hal_async::i2c;

use crate::adc::AdcChannel;
use crate::fmt::bitflags;
use crate::registers::{ChargeStatus, PowerStatus, CHARGE_STATUS, POWER_STATUS};
use crate::AxpPmu;

/// Charge state of the main battery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryStatus {
    Charging,
    Discharging,
    Full,
}

impl core::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Charging => write!(f, "charging"),
            Self::Discharging => write!(f, "discharging"),
            Self::Full => write!(f, "full"),
        }
    }
}

bitflags! {
    /// Power sources attached to the system
    pub struct PowerInputs: u8 {
        const AC = 1 << 0;
        const USB = 1 << 1;
        const BATTERY = 1 << 2;
    }
}

/// Decides whether an externally powered, non-charging battery is actually
/// full. [`ZeroDischargeCheck`] is the stock rule; a smarter estimator, say
/// one integrating the coulomb counters, can replace it through
/// [`AxpPmu::with_full_check`].
pub trait FullBatteryCheck {
    /// `discharge_raw` is the latest raw discharge-current sample, `None`
    /// when the reading was unavailable
    fn battery_full(&mut self, discharge_raw: Option<i32>) -> bool;
}

/// Stock rule: the battery counts as full when no measurable current flows
/// out of it. A battery that merely sees no load looks the same, so this
/// can misreport
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroDischargeCheck;

impl FullBatteryCheck for ZeroDischargeCheck {
    fn battery_full(&mut self, discharge_raw: Option<i32>) -> bool {
        discharge_raw == Some(0)
    }
}

impl<I, F, E> AxpPmu<I, F>
where
    I: i2c::I2c<Error = E>,
    F: FullBatteryCheck,
{
    /// Classifies the battery state. Never fails: an unreadable status
    /// register is reported as discharging
    pub async fn battery_status(&mut self) -> BatteryStatus {
        let status = match self.read_register(POWER_STATUS).await {
            Ok(r) => PowerStatus::from_bits_truncate(r),
            Err(_) => return BatteryStatus::Discharging,
        };

        if status.contains(PowerStatus::BATTERY_CHARGING) {
            return BatteryStatus::Charging;
        }

        // No external source, the battery carries the system
        if !status.intersects(PowerStatus::EXTERNAL) {
            return BatteryStatus::Discharging;
        }

        // Externally powered but not charging. The discharge current tells a
        // full battery apart from one picking up the slack of a weak charger
        let sample = self.adc_read_raw(AdcChannel::DischargeCurrent).await;

        if self.full_check.battery_full(sample) {
            BatteryStatus::Full
        } else {
            BatteryStatus::Discharging
        }
    }

    /// Attached power inputs. Never fails: whatever cannot be read is
    /// reported absent, except the battery of a non-removable build
    pub async fn input_status(&mut self) -> PowerInputs {
        let mut inputs = if self.removable_battery {
            PowerInputs::empty()
        } else {
            PowerInputs::BATTERY
        };

        let status = match self.read_register(POWER_STATUS).await {
            Ok(r) => PowerStatus::from_bits_truncate(r),
            Err(_) => return inputs,
        };

        if status.contains(PowerStatus::ACIN_PRESENT) {
            inputs |= PowerInputs::AC;
        }

        // A VBUS shorted to ACIN is not a real USB connection
        if status.contains(PowerStatus::VBUS_PRESENT)
            && !status.contains(PowerStatus::ACIN_VBUS_SHORTED)
        {
            inputs |= PowerInputs::USB;
        }

        if self.removable_battery {
            if let Ok(r) = self.read_register(CHARGE_STATUS).await {
                if ChargeStatus::from_bits_truncate(r).contains(ChargeStatus::BATTERY_PRESENT) {
                    inputs |= PowerInputs::BATTERY;
                }
            }
        }

        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::ADC_ENABLE1;
    use crate::testing::pmu;
    use crate::{AdcChannels, Config, DEFAULT_ADDR};
    use embedded_hal_async::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    #[tokio::test]
    async fn charging_bit_wins() {
        let mut pmu = pmu(&[Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0x04],
        )]);

        assert_eq!(pmu.battery_status().await, BatteryStatus::Charging);
        pmu.release().done();
    }

    #[tokio::test]
    async fn no_external_power_means_discharging() {
        let mut pmu = pmu(&[Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0x00],
        )]);

        assert_eq!(pmu.battery_status().await, BatteryStatus::Discharging);
        pmu.release().done();
    }

    #[tokio::test]
    async fn powered_and_resting_battery_is_full() {
        let mut pmu = pmu(&[
            Transaction::write(DEFAULT_ADDR, vec![ADC_ENABLE1, 0x40, 0x00]),
            Transaction::write_read(DEFAULT_ADDR, vec![POWER_STATUS], vec![0xa0]),
            Transaction::write_read(DEFAULT_ADDR, vec![0x7c], vec![0x00, 0x00]),
        ]);

        pmu.set_adc_enabled(AdcChannels::DISCHARGE_CURRENT)
            .await
            .unwrap();

        assert_eq!(pmu.battery_status().await, BatteryStatus::Full);
        pmu.release().done();
    }

    #[tokio::test]
    async fn powered_but_loaded_battery_is_discharging() {
        let mut pmu = pmu(&[
            Transaction::write(DEFAULT_ADDR, vec![ADC_ENABLE1, 0x40, 0x00]),
            Transaction::write_read(DEFAULT_ADDR, vec![POWER_STATUS], vec![0xa0]),
            Transaction::write_read(DEFAULT_ADDR, vec![0x7c], vec![0x00, 0x01]),
        ]);

        pmu.set_adc_enabled(AdcChannels::DISCHARGE_CURRENT)
            .await
            .unwrap();

        assert_eq!(pmu.battery_status().await, BatteryStatus::Discharging);
        pmu.release().done();
    }

    #[tokio::test]
    async fn missing_sample_is_never_full() {
        // The discharge channel is off, so no sample and no extra transaction
        let mut pmu = pmu(&[Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0xa0],
        )]);

        assert_eq!(pmu.battery_status().await, BatteryStatus::Discharging);
        pmu.release().done();
    }

    #[tokio::test]
    async fn unreadable_status_means_discharging() {
        let mut pmu = pmu(&[Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0],
        )
        .with_error(ErrorKind::Other)]);

        assert_eq!(pmu.battery_status().await, BatteryStatus::Discharging);
        pmu.release().done();
    }

    #[tokio::test]
    async fn full_check_is_replaceable() {
        struct AlwaysFull;

        impl FullBatteryCheck for AlwaysFull {
            fn battery_full(&mut self, _discharge_raw: Option<i32>) -> bool {
                true
            }
        }

        let transactions = [Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0xa0],
        )];
        let mut pmu =
            AxpPmu::with_full_check(Mock::new(&transactions), Config::default(), AlwaysFull);

        assert_eq!(pmu.battery_status().await, BatteryStatus::Full);
        pmu.release().done();
    }

    #[tokio::test]
    async fn ac_and_usb_are_reported() {
        let mut pmu = pmu(&[Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0xa0],
        )]);

        assert_eq!(
            pmu.input_status().await,
            PowerInputs::AC | PowerInputs::USB | PowerInputs::BATTERY
        );
        pmu.release().done();
    }

    #[tokio::test]
    async fn shorted_vbus_is_not_usb() {
        let mut pmu = pmu(&[Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0xa2],
        )]);

        assert_eq!(
            pmu.input_status().await,
            PowerInputs::AC | PowerInputs::BATTERY
        );
        pmu.release().done();
    }

    #[tokio::test]
    async fn unreadable_inputs_fall_back_to_the_battery() {
        let mut pmu = pmu(&[Transaction::write_read(
            DEFAULT_ADDR,
            vec![POWER_STATUS],
            vec![0],
        )
        .with_error(ErrorKind::Other)]);

        assert_eq!(pmu.input_status().await, PowerInputs::BATTERY);
        pmu.release().done();
    }

    #[tokio::test]
    async fn removable_battery_is_probed() {
        let config = Config {
            removable_battery: true,
            ..Config::default()
        };
        let mut pmu = AxpPmu::new(
            Mock::new(&[
                Transaction::write_read(DEFAULT_ADDR, vec![POWER_STATUS], vec![0x00]),
                Transaction::write_read(DEFAULT_ADDR, vec![CHARGE_STATUS], vec![0x20]),
                Transaction::write_read(DEFAULT_ADDR, vec![POWER_STATUS], vec![0x00]),
                Transaction::write_read(DEFAULT_ADDR, vec![CHARGE_STATUS], vec![0x00]),
            ]),
            config,
        );

        assert_eq!(pmu.input_status().await, PowerInputs::BATTERY);
        assert_eq!(pmu.input_status().await, PowerInputs::empty());
        pmu.release().done();
    }

    #[tokio::test]
    async fn unreadable_battery_check_counts_as_absent() {
        let config = Config {
            removable_battery: true,
            ..Config::default()
        };
        let mut pmu = AxpPmu::new(
            Mock::new(&[
                Transaction::write_read(DEFAULT_ADDR, vec![POWER_STATUS], vec![0x80]),
                Transaction::write_read(DEFAULT_ADDR, vec![CHARGE_STATUS], vec![0])
                    .with_error(ErrorKind::Other),
            ]),
            config,
        );

        assert_eq!(pmu.input_status().await, PowerInputs::AC);
        pmu.release().done();
    }

    #[tokio::test]
    async fn unreadable_inputs_are_empty_for_a_removable_battery() {
        let config = Config {
            removable_battery: true,
            ..Config::default()
        };
        // The primary status read fails, so the battery register is not
        // consulted either
        let mut pmu = AxpPmu::new(
            Mock::new(&[Transaction::write_read(
                DEFAULT_ADDR,
                vec![POWER_STATUS],
                vec![0],
            )
            .with_error(ErrorKind::Other)]),
            config,
        );

        assert_eq!(pmu.input_status().await, PowerInputs::empty());
        pmu.release().done();
    }

    #[test]
    fn status_renders_for_humans() {
        assert_eq!(format!("{}", BatteryStatus::Charging), "charging");
        assert_eq!(format!("{}", BatteryStatus::Discharging), "discharging");
        assert_eq!(format!("{}", BatteryStatus::Full), "full");
    }
}
