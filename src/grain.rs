//! Grain playback state, the fixed capacity grain pool and the grain renderer.

pub mod pool;
pub mod renderer;
pub mod window;

// -------------------------------------------------------------------------------------------------

/// Represents a single grain: one short, independently parameterized sonic event.
///
/// Pitch, pan, amplitude and duration are fixed when the grain gets activated. Age and source
/// read position are advanced by the [`GrainRenderer`](renderer::GrainRenderer) every sample.
/// Grains live in [`GrainPool`](pool::GrainPool) slots and never allocate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grain {
    /// Unique, monotonically increasing id, for diagnostics and visualization.
    pub(crate) id: u64,
    /// Is this grain currently playing?
    pub(crate) alive: bool,
    /// Pitch as MIDI note number.
    pub(crate) pitch: f32,
    /// Stereo position from -1.0 (left) to 1.0 (right).
    pub(crate) pan: f32,
    /// Gain from 0.0 to 1.0.
    pub(crate) amplitude: f32,
    /// Total lifetime in samples, always > 0 for active grains.
    pub(crate) duration: usize,
    /// Samples played so far.
    pub(crate) age: usize,
    /// Fractional read position in the source buffer in frames.
    pub(crate) position: f64,
    /// Frame offset in the current output block at which the grain starts playing.
    /// Reset to 0 after the grain's first block.
    pub(crate) onset_offset: usize,
}

impl Default for Grain {
    fn default() -> Self {
        Self::new()
    }
}

impl Grain {
    /// Create a new inactive grain.
    pub const fn new() -> Self {
        Self {
            id: 0,
            alive: false,
            pitch: 60.0,
            pan: 0.0,
            amplitude: 0.0,
            duration: 0,
            age: 0,
            position: 0.0,
            onset_offset: 0,
        }
    }

    /// Activate this grain with the given parameters, resetting its playback state.
    /// Pan, amplitude and position are clamped into their ranges, durations to at least one
    /// sample.
    pub fn activate(
        &mut self,
        id: u64,
        pitch: f32,
        pan: f32,
        amplitude: f32,
        duration: usize,
        position: f64,
    ) {
        self.id = id;
        self.alive = true;
        self.pitch = pitch;
        self.pan = pan.clamp(-1.0, 1.0);
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self.duration = duration.max(1);
        self.age = 0;
        self.position = position.max(0.0);
        self.onset_offset = 0;
    }

    /// Deactivate this grain immediately.
    pub fn deactivate(&mut self) {
        self.alive = false;
        self.onset_offset = 0;
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[inline]
    pub fn pan(&self) -> f32 {
        self.pan
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    #[inline]
    pub fn duration(&self) -> usize {
        self.duration
    }

    #[inline]
    pub fn age(&self) -> usize {
        self.age
    }

    /// Current fractional read position in the source buffer, in frames.
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Samples left until the grain finishes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.duration.saturating_sub(self.age)
    }

    /// Normalized playback progress (0.0 at birth, 1.0 when finished).
    #[inline]
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            1.0
        } else {
            self.age as f64 / self.duration as f64
        }
    }
}

// -------------------------------------------------------------------------------------------------
