// Wall-clock input for the face: hour and minute, plus the source trait the
// firmware implements on top of the RTC.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WallTime {
    pub hour: u8,   // 0-23
    pub minute: u8, // 0-59
}

impl WallTime {
    // Wraps out-of-range values instead of rejecting them.
    pub const fn new(hour: u8, minute: u8) -> Self {
        Self { hour: hour % 24, minute: minute % 60 }
    }

    // Fraction of the hour elapsed.
    #[inline]
    pub fn minute_fraction(&self) -> f32 {
        self.minute as f32 / 60.0
    }

    /// Hour hand angle in degrees clockwise from 12, advancing with minutes.
    pub fn hour_angle(&self) -> f32 {
        ((self.hour % 12) as f32 + self.minute_fraction()) * 30.0
    }

    /// Minute hand angle in degrees clockwise from 12.
    pub fn minute_angle(&self) -> f32 {
        self.minute as f32 * 6.0
    }
}

pub trait TimeSource {
    type Error;

    fn now(&mut self) -> Result<WallTime, Self::Error>;
}

#[derive(Copy, Clone, Debug)]
pub struct FixedTime(pub WallTime);

impl TimeSource for FixedTime {
    type Error = core::convert::Infallible;

    fn now(&mut self) -> Result<WallTime, Self::Error> {
        Ok(self.0)
    }
}
