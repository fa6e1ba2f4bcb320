// RTC driver for PCF85063A/PCF85063TP real-time clock chips.
// Datasheet: https://files.waveshare.com/wiki/common/Pcf85063atl1118-NdPQpTGE-loeW7GbZ7.pdf

use core::fmt;

use embedded_hal::i2c::I2c;
use log::warn;

use crate::clock::{TimeSource, WallTime};

pub const DEFAULT_I2C_ADDR: u8 = 0x51;
// Seconds register; minutes, hours, days, weekdays, months and years follow
const REG_SECONDS: u8 = 0x04;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,  // full year, e.g., 2024
    pub month: u8,  // 1-12
    pub day: u8,    // 1-31
    pub hour: u8,   // 0-23
    pub minute: u8, // 0-59
    pub second: u8, // 0-59
}

impl DateTime {
    // Basic sanity check on decoded RTC time.
    pub fn is_valid(&self) -> bool {
        (2020..=2099).contains(&self.year)
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }

    pub fn wall_time(&self) -> WallTime {
        WallTime::new(self.hour, self.minute)
    }
}

#[derive(Debug, PartialEq)]
pub enum RtcError<E> {
    I2c(E),
    /// The oscillator stopped (VL flag set), the time can't be trusted.
    ClockLost,
    /// Registers decoded to an impossible date.
    Invalid(DateTime),
}

impl<E: fmt::Debug> fmt::Display for RtcError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcError::I2c(e) => write!(f, "RTC bus error: {:?}", e),
            RtcError::ClockLost => f.write_str("RTC lost power, time not set"),
            RtcError::Invalid(dt) => write!(f, "RTC returned an invalid date: {:?}", dt),
        }
    }
}

impl<E> From<E> for RtcError<E> {
    fn from(e: E) -> Self {
        RtcError::I2c(e)
    }
}

pub struct Pcf85063<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C, E> Pcf85063<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c, addr: DEFAULT_I2C_ADDR }
    }

    pub fn into_inner(self) -> I2C {
        self.i2c
    }

    // Read datetime. Returns (dt, vl_flag) where vl_flag == true means time is unreliable (power loss).
    pub fn read_datetime(&mut self) -> Result<(DateTime, bool), E> {
        let mut buf = [0u8; 7];
        self.i2c.write_read(self.addr, &[REG_SECONDS], &mut buf)?;
        let vl = (buf[0] & 0x80) != 0;
        let month_raw = buf[5];
        // Century bit set means 19xx
        let century = if (month_raw & 0x80) != 0 { 1900u16 } else { 2000u16 };
        Ok((
            DateTime {
                year: century + bcd_decode(buf[6]) as u16,
                month: bcd_decode(month_raw & 0x1F),
                day: bcd_decode(buf[3] & 0x3F),
                hour: bcd_decode(buf[2] & 0x3F),
                minute: bcd_decode(buf[1] & 0x7F),
                second: bcd_decode(buf[0] & 0x7F),
            },
            vl,
        ))
    }

    // Set datetime. Ignores weekday field. Writing the seconds register also
    // clears the VL flag.
    pub fn set_datetime(&mut self, dt: &DateTime) -> Result<(), E> {
        let yr = (dt.year % 100) as u8;
        let data = [
            REG_SECONDS,
            bcd_encode(dt.second),
            bcd_encode(dt.minute),
            bcd_encode(dt.hour),
            bcd_encode(dt.day),
            0, // weekday not used
            bcd_encode(dt.month),
            bcd_encode(yr),
        ];
        self.i2c.write(self.addr, &data)
    }
}

impl<I2C, E> TimeSource for Pcf85063<I2C>
where
    I2C: I2c<Error = E>,
{
    type Error = RtcError<E>;

    fn now(&mut self) -> Result<WallTime, Self::Error> {
        let (dt, vl) = self.read_datetime()?;
        if vl {
            warn!("RTC oscillator stopped, ignoring {:?}", dt);
            return Err(RtcError::ClockLost);
        }
        if !dt.is_valid() {
            return Err(RtcError::Invalid(dt));
        }
        Ok(dt.wall_time())
    }
}

// BCD encode/decode helpers
#[inline]
pub fn bcd_decode(v: u8) -> u8 {
    (v & 0x0F) + ((v >> 4) * 10)
}

#[inline]
pub fn bcd_encode(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::i2c::{ErrorType, Operation};

    // Register file behind a fake bus: writes land at their register,
    // write_read reads from the addressed register on.
    struct FakeBus {
        regs: [u8; 0x12],
        last_addr: Option<u8>,
    }

    impl FakeBus {
        fn with_time(regs_from_seconds: [u8; 7]) -> Self {
            let mut regs = [0u8; 0x12];
            regs[0x04..0x0B].copy_from_slice(&regs_from_seconds);
            Self { regs, last_addr: None }
        }
    }

    impl ErrorType for FakeBus {
        type Error = Infallible;
    }

    impl I2c for FakeBus {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Infallible> {
            self.last_addr = Some(address);
            let mut pointer = 0usize;
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        if let Some((&reg, data)) = bytes.split_first() {
                            pointer = reg as usize;
                            self.regs[pointer..pointer + data.len()].copy_from_slice(data);
                        }
                    }
                    Operation::Read(buf) => {
                        let n = buf.len();
                        buf.copy_from_slice(&self.regs[pointer..pointer + n]);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn bcd_round_trips_every_clock_value() {
        for v in 0..=99u8 {
            assert_eq!(bcd_decode(bcd_encode(v)), v);
        }
        assert_eq!(bcd_encode(59), 0x59);
        assert_eq!(bcd_decode(0x23), 23);
    }

    #[test]
    fn reads_registers_and_masks_flag_bits() {
        // 2025-03-14 21:47:05, VL clear, weekday junk
        let mut rtc = Pcf85063::new(FakeBus::with_time([0x05, 0x47, 0x21, 0x14, 0x05, 0x03, 0x25]));
        let (dt, vl) = rtc.read_datetime().unwrap();
        assert!(!vl);
        assert_eq!(dt, DateTime { year: 2025, month: 3, day: 14, hour: 21, minute: 47, second: 5 });
        assert_eq!(rtc.into_inner().last_addr, Some(DEFAULT_I2C_ADDR));
    }

    #[test]
    fn set_then_read() {
        let mut rtc = Pcf85063::new(FakeBus::with_time([0x80, 0, 0, 1, 0, 1, 0]));
        let dt = DateTime { year: 2031, month: 12, day: 31, hour: 23, minute: 59, second: 58 };
        rtc.set_datetime(&dt).unwrap();
        assert_eq!(rtc.read_datetime().unwrap(), (dt, false));
    }

    #[test]
    fn time_source_rejects_a_stopped_clock() {
        let mut rtc = Pcf85063::new(FakeBus::with_time([0x85, 0x10, 0x09, 0x01, 0x00, 0x01, 0x24]));
        assert_eq!(rtc.now(), Err(RtcError::ClockLost));
    }

    #[test]
    fn time_source_rejects_garbage_and_reports_wall_time() {
        // month 0
        let mut rtc = Pcf85063::new(FakeBus::with_time([0x00, 0x10, 0x09, 0x01, 0x00, 0x00, 0x24]));
        assert!(matches!(rtc.now(), Err(RtcError::Invalid(_))));

        let mut rtc = Pcf85063::new(FakeBus::with_time([0x30, 0x41, 0x09, 0x01, 0x00, 0x06, 0x24]));
        assert_eq!(rtc.now(), Ok(WallTime::new(9, 41)));
    }

    #[test]
    fn error_messages() {
        let e: RtcError<Infallible> = RtcError::ClockLost;
        assert_eq!(format!("{}", e), "RTC lost power, time not set");
    }
}
