//! Loaded sound data.

use crate::error::SoundResult;
use crate::format::{ChannelConfig, SampleType};
use std::any::Any;
use std::sync::Arc;

/// A loaded (or loading) sound resource.
///
/// Buffers are shared: the session cache, channels and the host may all
/// hold the same buffer. Queries are safe while the buffer is still
/// loading and return neutral values until [`SoundBuffer::is_ready`].
pub trait SoundBuffer: Send + Sync + Any {
    /// Whether the data is available for queries and playback.
    fn is_ready(&self) -> bool;

    /// Length in sample frames, 0 while not ready.
    fn length(&self) -> u32;

    /// Sample rate in Hz.
    fn frequency(&self) -> u32;

    /// Native channel layout of the data.
    fn channel_config(&self) -> ChannelConfig;

    /// Layout requested by the loader. Mono when conversion was requested.
    fn target_channel_config(&self) -> ChannelConfig;

    /// Sample representation. Fails for formats the host cannot represent.
    fn sample_type(&self) -> SoundResult<SampleType>;

    /// Decoded size in bytes, 0 while unknown.
    fn size(&self) -> u64;

    /// Duration in seconds.
    fn duration(&self) -> f32 {
        let freq = self.frequency();
        if freq == 0 {
            return 0.0;
        }
        self.length() as f32 / freq as f32
    }

    /// Sets the loop region in frames.
    fn set_loop_frame_points(&self, start: u32, end: u32) -> SoundResult<()>;

    /// Sets the loop region in seconds.
    fn set_loop_time_points(&self, start: f32, end: f32) -> SoundResult<()>;

    /// Current loop region in frames.
    fn loop_frame_points(&self) -> (u32, u32);

    /// Normalized path the buffer was loaded from.
    fn name(&self) -> &str;

    /// Whether anything other than the owning session holds the buffer.
    fn is_in_use(&self) -> bool;

    /// Upcast used by sessions to recover their concrete buffer type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Shared buffer handle.
pub type PSoundBuffer = Arc<dyn SoundBuffer>;

/// Frame indices covering `[start, end]` seconds of a buffer.
///
/// Returns `(0, 0)` when the duration is not positive.
#[must_use]
pub fn loop_frames_for_times(start: f32, end: f32, duration: f32, length: u32) -> (u32, u32) {
    if duration <= 0.0 || !duration.is_finite() {
        return (0, 0);
    }
    let to_frame = |t: f32| -> u32 {
        let frame = (t / duration * length as f32).round();
        frame.clamp(0.0, length as f32) as u32
    };
    (to_frame(start), to_frame(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_frames_zero_duration() {
        assert_eq!(loop_frames_for_times(0.0, 0.0, 0.0, 0), (0, 0));
        assert_eq!(loop_frames_for_times(0.5, 1.0, 0.0, 44_100), (0, 0));
    }

    #[test]
    fn test_loop_frames_scale_and_round() {
        // one second at 44.1 kHz
        assert_eq!(loop_frames_for_times(0.25, 0.5, 1.0, 44_100), (11_025, 22_050));
        assert_eq!(loop_frames_for_times(0.0, 2.0, 1.0, 100), (0, 100));
    }
}
