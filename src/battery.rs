//! Battery voltage to rim-width mapping.
//!
//! The rim around the spiral is the battery gauge: a full cell draws it at
//! full width, an empty one at `rim_min` of it.

/// Anything that can report the battery cell voltage.
pub trait BatterySource {
    type Error;

    fn voltage(&mut self) -> Result<f32, Self::Error>;
}

// Constant reading, for tests and bench rendering.
#[derive(Copy, Clone, Debug)]
pub struct FixedVoltage(pub f32);

impl BatterySource for FixedVoltage {
    type Error = core::convert::Infallible;

    fn voltage(&mut self) -> Result<f32, Self::Error> {
        Ok(self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BatteryGauge {
    pub min_volts: f32,
    pub max_volts: f32,
    pub warning_volts: f32,
    // Rim scale at an empty cell; a full cell is 1.0
    pub rim_min: f32,
}

impl Default for BatteryGauge {
    // Single Li-ion cell
    fn default() -> Self {
        Self {
            min_volts: 3.5,
            max_volts: 4.2,
            warning_volts: 3.6,
            rim_min: 0.5,
        }
    }
}

impl BatteryGauge {
    /// Charge fraction in `[0, 1]`. Readings outside the range clamp.
    pub fn fill(&self, volts: f32) -> f32 {
        let range = self.max_volts - self.min_volts;
        if range <= 0.0 {
            return if volts >= self.max_volts { 1.0 } else { 0.0 };
        }
        ((volts - self.min_volts) / range).clamp(0.0, 1.0)
    }

    // Rim width multiplier for a fill fraction.
    pub fn rim_scale(&self, fill: f32) -> f32 {
        self.rim_min + (1.0 - self.rim_min) * fill.clamp(0.0, 1.0)
    }

    pub fn is_warning(&self, volts: f32) -> bool {
        volts <= self.warning_volts
    }

    // Rim scale the face shows when the cell sits at the warning voltage.
    pub fn warning_rim_scale(&self) -> f32 {
        self.rim_scale(self.fill(self.warning_volts))
    }
}
