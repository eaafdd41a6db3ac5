// -------------------------------------------------------------------------------------------------

/// An output buffer that grains get mixed into.
///
/// Grains only ever *add* to the buffer. Clearing the buffer before rendering is up to the caller.
/// Mono buffers receive the un-panned grain signal. Buffers with more than one channel receive the
/// panned signal in their first two channels; all other channels are left untouched.
pub trait MixBuffer {
    /// Number of frames in the buffer.
    fn frame_count(&self) -> usize;

    /// Number of channels in the buffer.
    fn channel_count(&self) -> usize;

    /// Add a sample to the given frame, applying the given left and right pan gains when the
    /// buffer has more than one channel.
    fn add_sample(&mut self, frame: usize, sample: f32, left_gain: f32, right_gain: f32);
}

// -------------------------------------------------------------------------------------------------

/// A [`MixBuffer`] over an interleaved sample buffer.
pub struct InterleavedMixBuffer<'a> {
    buffer: &'a mut [f32],
    channel_count: usize,
}

impl<'a> InterleavedMixBuffer<'a> {
    /// Wrap the given interleaved buffer. Incomplete trailing frames are ignored.
    pub fn new(buffer: &'a mut [f32], channel_count: usize) -> Self {
        debug_assert!(channel_count > 0, "Need at least one channel");
        Self {
            buffer,
            channel_count: channel_count.max(1),
        }
    }
}

impl MixBuffer for InterleavedMixBuffer<'_> {
    #[inline]
    fn frame_count(&self) -> usize {
        self.buffer.len() / self.channel_count
    }

    #[inline]
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    #[inline]
    fn add_sample(&mut self, frame: usize, sample: f32, left_gain: f32, right_gain: f32) {
        let offset = frame * self.channel_count;
        match self.channel_count {
            1 => {
                self.buffer[offset] += sample;
            }
            _ => {
                self.buffer[offset] += sample * left_gain;
                self.buffer[offset + 1] += sample * right_gain;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A [`MixBuffer`] over planar (non-interleaved) channel buffers.
/// The frame count is the length of the shortest channel.
pub struct PlanarMixBuffer<'a, 'b> {
    channels: &'a mut [&'b mut [f32]],
    frame_count: usize,
}

impl<'a, 'b> PlanarMixBuffer<'a, 'b> {
    /// Wrap the given channel buffers.
    pub fn new(channels: &'a mut [&'b mut [f32]]) -> Self {
        let frame_count = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        Self {
            channels,
            frame_count,
        }
    }
}

impl MixBuffer for PlanarMixBuffer<'_, '_> {
    #[inline]
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    fn add_sample(&mut self, frame: usize, sample: f32, left_gain: f32, right_gain: f32) {
        match &mut *self.channels {
            [] => {}
            [mono] => {
                mono[frame] += sample;
            }
            [left, right, ..] => {
                left[frame] += sample * left_gain;
                right[frame] += sample * right_gain;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Mix down the given interleaved buffer to a single channel by averaging all channels.
/// Incomplete trailing frames are ignored.
pub fn interleaved_to_mono(interleaved: &[f32], channel_count: usize) -> Vec<f32> {
    match channel_count {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        2 => interleaved
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) * 0.5)
            .collect(),
        _ => {
            let scale = 1.0 / channel_count as f32;
            interleaved
                .chunks_exact(channel_count)
                .map(|frame| frame.iter().sum::<f32>() * scale)
                .collect()
        }
    }
}

// -------------------------------------------------------------------------------------------------
