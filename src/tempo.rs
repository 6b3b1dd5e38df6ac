use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Tempo is kept in tenths so that stepping up and back down lands on
// exactly the same value; floats would drift after a few presses.
const MIN_TENTHS: u8 = 5;
const MAX_TENTHS: u8 = 20;
const DEFAULT_TENTHS: u8 = 10;

// multiplier in [0.5, 2.0] on 0.1 steps; drives both the playback rate
// and the loop period
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tempo(u8);

impl Tempo {
    pub const MIN: Tempo = Tempo(MIN_TENTHS);
    pub const MAX: Tempo = Tempo(MAX_TENTHS);
    pub const NORMAL: Tempo = Tempo(DEFAULT_TENTHS);

    // Snap an arbitrary multiplier to the nearest step inside the range.
    // Non-finite input falls back to normal speed.
    pub fn from_multiplier(value: f32) -> Self {
        if !value.is_finite() {
            return Self::NORMAL;
        }
        let tenths = (value * 10.0).round().clamp(MIN_TENTHS as f32, MAX_TENTHS as f32);
        Tempo(tenths as u8)
    }

    pub fn multiplier(self) -> f32 {
        self.0 as f32 / 10.0
    }

    // Move by `steps` increments of 0.1, clamping at the range ends.
    pub fn stepped(self, steps: i32) -> Self {
        let tenths = (self.0 as i32 + steps).clamp(MIN_TENTHS as i32, MAX_TENTHS as i32);
        Tempo(tenths as u8)
    }

    pub fn is_min(self) -> bool {
        self == Self::MIN
    }

    pub fn is_max(self) -> bool {
        self == Self::MAX
    }

    // Repeat period for a sound with the given base interval:
    // `base / tempo`.
    pub fn period(self, base: Duration) -> Duration {
        base * 10 / self.0 as u32
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}x", self.0 / 10, self.0 % 10)
    }
}

impl Serialize for Tempo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.multiplier())
    }
}

impl<'de> Deserialize<'de> for Tempo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f32::deserialize(deserializer)?;
        Ok(Tempo::from_multiplier(value))
    }
}
