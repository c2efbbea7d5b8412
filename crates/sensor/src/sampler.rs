use std::io::{self, Cursor, ErrorKind, Read};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::frame::{decode_frame, ChannelState, CHANNEL_COUNT, FRAME_LEN};
use crate::SensorError;

/// Sampler reading from an opened serial port.
pub type SerialSampler = SensorSampler<Box<dyn serialport::SerialPort>>;

/// Byte source whose blocking reads can be bounded.
pub trait FramePort: Read {
    /// Caps how long the next `read` may block. Sources that never block keep
    /// the default.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        let _ = timeout;
        Ok(())
    }
}

impl FramePort for Box<dyn serialport::SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        serialport::SerialPort::set_timeout(&mut **self, timeout).map_err(io::Error::from)
    }
}

impl<T: AsRef<[u8]>> FramePort for Cursor<T> {}

/// Result of one poll of the sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A complete frame arrived and was written into the channel state.
    Updated([u16; CHANNEL_COUNT]),
    /// Fewer than [`FRAME_LEN`] bytes arrived before the timeout; the channel
    /// state was left untouched.
    Incomplete { bytes: usize },
}

/// Pulls fixed-size frames from any byte source.
pub struct SensorSampler<P> {
    port: P,
    timeout: Duration,
}

impl<P: FramePort> SensorSampler<P> {
    pub fn new(port: P, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Blocks for up to the configured timeout waiting for one full frame.
    pub fn poll(&mut self, state: &mut ChannelState) -> PollOutcome {
        let mut buffer = [0u8; FRAME_LEN];
        let bytes = self.read_frame(&mut buffer);
        if bytes != FRAME_LEN {
            warn!(bytes, expected = FRAME_LEN, "incomplete sensor frame");
            return PollOutcome::Incomplete { bytes };
        }

        let values = decode_frame(&buffer);
        state.apply(values);
        debug!(
            p0 = values[0],
            p1 = values[1],
            p2 = values[2],
            p3 = values[3],
            p4 = values[4],
            p5 = values[5],
            "sensor frame"
        );
        PollOutcome::Updated(values)
    }

    /// Every read is capped by what is left of the poll's budget.
    fn read_frame(&mut self, buffer: &mut [u8; FRAME_LEN]) -> usize {
        // `None` when the timeout is too large to represent as an instant.
        let deadline = Instant::now().checked_add(self.timeout);
        let mut filled = 0;
        while filled < FRAME_LEN {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.timeout,
            };
            if remaining.is_zero() {
                break;
            }
            if let Err(err) = self.port.set_read_timeout(remaining) {
                debug!(error = %err, "could not shorten serial read timeout");
            }

            match self.port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    break
                }
                Err(err) => {
                    warn!(error = %err, "serial read failed");
                    break;
                }
            }
        }
        filled
    }
}

/// Opens `device` at `baud` with a per-read `timeout`.
pub fn open_serial(
    device: &str,
    baud: u32,
    timeout: Duration,
) -> Result<SerialSampler, SensorError> {
    let port = serialport::new(device, baud)
        .timeout(timeout)
        .open()
        .map_err(|source| SensorError::Open {
            device: device.to_string(),
            baud,
            source,
        })?;
    tracing::info!(device, baud, "connected to sensor board");
    Ok(SensorSampler::new(port, timeout))
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const FRAME: [u8; FRAME_LEN] = [
        0x34, 0x12, 0x00, 0x00, 0xFF, 0x03, 0x10, 0x00, 0x20, 0x00, 0x30, 0x00,
    ];

    /// Hands out at most `chunk` bytes per read, then reports a timeout.
    struct Trickle {
        data: Vec<u8>,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(ErrorKind::TimedOut, "no data"));
            }
            let count = self.chunk.min(buf.len()).min(self.data.len());
            buf[..count].copy_from_slice(&self.data[..count]);
            self.data.drain(..count);
            Ok(count)
        }
    }

    impl FramePort for Trickle {}

    /// Blocks like a real port: each read waits for the timeout it was given.
    /// The first read hands over `head` after `head_delay`.
    struct SlowPort {
        head: Vec<u8>,
        head_delay: Duration,
        read_timeout: Duration,
    }

    impl Read for SlowPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.head.is_empty() {
                thread::sleep(self.head_delay);
                let count = self.head.len().min(buf.len());
                buf[..count].copy_from_slice(&self.head[..count]);
                self.head.drain(..count);
                return Ok(count);
            }
            thread::sleep(self.read_timeout);
            Err(io::Error::new(ErrorKind::TimedOut, "no data"))
        }
    }

    impl FramePort for SlowPort {
        fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.read_timeout = timeout;
            Ok(())
        }
    }

    #[test]
    fn complete_frame_updates_state() {
        let mut sampler = SensorSampler::new(Cursor::new(FRAME.to_vec()), Duration::from_secs(1));
        let mut state = ChannelState::new();
        let outcome = sampler.poll(&mut state);
        assert_eq!(
            outcome,
            PollOutcome::Updated([0x1234, 0, 0x03FF, 0x10, 0x20, 0x30])
        );
        assert_eq!(state.raw(0), 0x1234);
    }

    #[test]
    fn short_frame_keeps_previous_values() {
        let mut state = ChannelState::from_values([7, 7, 7, 7, 7, 7]);
        let mut sampler =
            SensorSampler::new(Cursor::new(FRAME[..7].to_vec()), Duration::from_secs(1));
        assert_eq!(sampler.poll(&mut state), PollOutcome::Incomplete { bytes: 7 });
        assert_eq!(state, ChannelState::from_values([7, 7, 7, 7, 7, 7]));
    }

    #[test]
    fn assembles_frame_across_partial_reads() {
        let port = Trickle {
            data: FRAME.to_vec(),
            chunk: 5,
        };
        let mut sampler = SensorSampler::new(port, Duration::from_secs(1));
        let mut state = ChannelState::new();
        assert!(matches!(sampler.poll(&mut state), PollOutcome::Updated(_)));
        assert_eq!(state.raw(2), 0x03FF);
    }

    #[test]
    fn timeout_without_data_is_incomplete() {
        let port = Trickle {
            data: Vec::new(),
            chunk: 12,
        };
        let mut sampler = SensorSampler::new(port, Duration::from_millis(10));
        let mut state = ChannelState::new();
        assert_eq!(sampler.poll(&mut state), PollOutcome::Incomplete { bytes: 0 });
    }

    #[test]
    fn consecutive_frames_are_read_in_order() {
        let mut stream = FRAME.to_vec();
        stream.extend_from_slice(&[1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0]);
        let mut sampler = SensorSampler::new(Cursor::new(stream), Duration::from_secs(1));
        let mut state = ChannelState::new();
        sampler.poll(&mut state);
        sampler.poll(&mut state);
        assert_eq!(state, ChannelState::from_values([1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn late_partial_read_does_not_extend_poll() {
        let timeout = Duration::from_millis(300);
        let port = SlowPort {
            head: FRAME[..5].to_vec(),
            head_delay: timeout - Duration::from_millis(20),
            read_timeout: timeout,
        };
        let mut sampler = SensorSampler::new(port, timeout);
        let mut state = ChannelState::new();

        let started = Instant::now();
        let outcome = sampler.poll(&mut state);
        let took = started.elapsed();

        assert_eq!(outcome, PollOutcome::Incomplete { bytes: 5 });
        assert!(
            took < timeout + Duration::from_millis(150),
            "poll blocked {took:?} with a {timeout:?} timeout"
        );
    }

    #[test]
    fn unbounded_timeout_still_reads_frame() {
        let mut sampler = SensorSampler::new(Cursor::new(FRAME.to_vec()), Duration::MAX);
        let mut state = ChannelState::new();
        assert!(matches!(sampler.poll(&mut state), PollOutcome::Updated(_)));
        assert_eq!(state.raw(5), 0x30);
    }
}
