//! Serial sensor input for the shader wall.
//!
//! A microcontroller streams fixed 12-byte frames, each holding six
//! little-endian `u16` channel readings. [`SensorSampler`] pulls one frame per
//! render iteration and writes it into a [`ChannelState`] owned by the frame
//! loop; short reads leave the previous values in place.
//!
//! The framing has no start marker, so a partial read can leave the stream
//! misaligned for the frames that follow. No resynchronization is attempted.

mod frame;
mod sampler;

pub use frame::{decode_frame, ChannelState, CHANNEL_COUNT, CHANNEL_MAX, FRAME_LEN};
pub use sampler::{open_serial, FramePort, PollOutcome, SensorSampler, SerialSampler};

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("failed to open serial device {device} at {baud} baud: {source}")]
    Open {
        device: String,
        baud: u32,
        #[source]
        source: serialport::Error,
    },
}
