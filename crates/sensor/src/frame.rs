/// Channels carried by one frame.
pub const CHANNEL_COUNT: usize = 6;

/// Bytes in one frame (`CHANNEL_COUNT` little-endian `u16`s).
pub const FRAME_LEN: usize = CHANNEL_COUNT * 2;

/// Full-scale reading of the 10-bit ADCs on the sensor board.
pub const CHANNEL_MAX: u16 = 1023;

/// Reassembles the six little-endian channel values of a complete frame.
pub fn decode_frame(frame: &[u8; FRAME_LEN]) -> [u16; CHANNEL_COUNT] {
    std::array::from_fn(|index| u16::from_le_bytes([frame[index * 2], frame[index * 2 + 1]]))
}

/// Latest channel readings, owned by the frame loop.
///
/// Values only change when a complete frame arrives; everything else keeps
/// the previous reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    values: [u16; CHANNEL_COUNT],
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: [u16; CHANNEL_COUNT]) -> Self {
        Self { values }
    }

    pub fn apply(&mut self, values: [u16; CHANNEL_COUNT]) {
        self.values = values;
    }

    /// Raw reading; unknown channels read as zero.
    pub fn raw(&self, channel: usize) -> u16 {
        self.values.get(channel).copied().unwrap_or(0)
    }

    /// Reading scaled to `[0, 1]`. Values above [`CHANNEL_MAX`] saturate.
    pub fn normalized(&self, channel: usize) -> f32 {
        (f32::from(self.raw(channel)) / f32::from(CHANNEL_MAX)).clamp(0.0, 1.0)
    }
}
