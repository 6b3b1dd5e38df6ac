// One stereo frame; the engine mixes in this format and only splits into
// the device's channel layout at the very end.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub const SILENT: StereoFrame = StereoFrame { left: 0.0, right: 0.0 };

    pub fn mono(value: f32) -> Self {
        Self { left: value, right: value }
    }

    pub fn lerp(self, other: StereoFrame, t: f32) -> Self {
        Self {
            left: self.left * (1.0 - t) + other.left * t,
            right: self.right * (1.0 - t) + other.right * t,
        }
    }

    #[inline]
    pub fn add_scaled(&mut self, other: StereoFrame, gain: f32) {
        self.left += other.left * gain;
        self.right += other.right * gain;
    }

    // Hard clip to [-1, 1] before handing samples to the device.
    pub fn clipped(self) -> Self {
        Self {
            left: self.left.clamp(-1.0, 1.0),
            right: self.right.clamp(-1.0, 1.0),
        }
    }
}
