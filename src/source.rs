//! The mono source waveform grains read from.

use std::path::Path;

use assume::assume;

use crate::{
    utils::{
        buffer::interleaved_to_mono,
        decoder::{AudioDecoder, DecodedAudio},
        semitones_to_ratio,
    },
    Error,
};

mod waveform;
pub use waveform::BuiltInWaveform;

// -------------------------------------------------------------------------------------------------

/// Interpolation used when reading a [`SourceBuffer`] at fractional positions.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
)]
#[repr(u8)]
pub enum SourceInterpolation {
    /// 2-point linear interpolation.
    Linear,
    /// 4-point Catmull-Rom cubic interpolation.
    #[default]
    Cubic,
}

// -------------------------------------------------------------------------------------------------

/// A mono sample buffer that grains read from.
///
/// Source buffers are immutable once published to the engine: they are replaced as a whole.
/// All reads loop: positions are wrapped into `[0, len)`.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    name: String,
    samples: Box<[f32]>,
    sample_rate: u32,
    root_pitch: f32,
    generation: u64,
}

impl Default for SourceBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl SourceBuffer {
    /// Pitch at which sources play back at their native speed, unless specified otherwise.
    pub const DEFAULT_ROOT_PITCH: f32 = 60.0;

    /// An empty source: grains reading from it render silence.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            samples: Box::default(),
            sample_rate: 44100,
            root_pitch: Self::DEFAULT_ROOT_PITCH,
            generation: 0,
        }
    }

    /// Create a new source from mono samples. Non-finite samples are replaced with silence.
    pub fn new(name: &str, mut samples: Vec<f32>, sample_rate: u32) -> Result<Self, Error> {
        if sample_rate == 0 {
            return Err(Error::ParameterError(format!(
                "Invalid sample rate for source '{name}': must be > 0"
            )));
        }
        for sample in samples.iter_mut().filter(|s| !s.is_finite()) {
            *sample = 0.0;
        }
        Ok(Self {
            name: name.to_string(),
            samples: samples.into_boxed_slice(),
            sample_rate,
            root_pitch: Self::DEFAULT_ROOT_PITCH,
            generation: 0,
        })
    }

    /// Create a new source from interleaved samples with the given channel layout. Multi-channel
    /// content gets mixed down to mono.
    pub fn from_interleaved(
        name: &str,
        interleaved: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::ParameterError(format!(
                "Invalid channel count for source '{name}': must be > 0"
            )));
        }
        Self::new(
            name,
            interleaved_to_mono(interleaved, channel_count),
            sample_rate,
        )
    }

    /// Decode the given audio file into a new source.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let decoded = AudioDecoder::from_file(path)?.decode_to_end()?;
        Self::from_decoded(&name, decoded)
    }

    /// Decode the given encoded audio file content into a new source.
    pub fn from_encoded(name: &str, bytes: Vec<u8>) -> Result<Self, Error> {
        let decoded = AudioDecoder::from_buffer(bytes)?.decode_to_end()?;
        Self::from_decoded(name, decoded)
    }

    fn from_decoded(name: &str, decoded: DecodedAudio) -> Result<Self, Error> {
        Self::from_interleaved(
            name,
            &decoded.samples,
            decoded.channel_count,
            decoded.sample_rate,
        )
    }

    /// Create a new source with the given built-in waveform.
    pub fn from_waveform(waveform: BuiltInWaveform) -> Self {
        let (samples, sample_rate, root_pitch) = waveform.generate();
        Self {
            name: waveform.to_string(),
            samples: samples.into_boxed_slice(),
            sample_rate,
            root_pitch,
            generation: 0,
        }
    }

    /// Set the pitch (MIDI note number) at which the source plays back at its native speed.
    pub fn with_root_pitch(mut self, root_pitch: f32) -> Self {
        if root_pitch.is_finite() {
            self.root_pitch = root_pitch;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source's mono sample frames.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Native sample rate of the buffer.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn root_pitch(&self) -> f32 {
        self.root_pitch
    }

    /// Publication generation, assigned by the engine controller. 0 for unpublished sources.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Read position increment per output sample for a grain with the given pitch.
    #[inline]
    pub fn playback_step(&self, pitch: f32, output_sample_rate: u32) -> f64 {
        debug_assert!(output_sample_rate > 0, "Invalid output sample rate");
        semitones_to_ratio(pitch - self.root_pitch)
            * (self.sample_rate as f64 / output_sample_rate.max(1) as f64)
    }

    /// Wrap the given read position into `[0, len)`. Returns 0 for empty sources.
    #[inline]
    pub fn wrap_position(&self, position: f64) -> f64 {
        let len = self.samples.len() as f64;
        if len == 0.0 || !position.is_finite() {
            return 0.0;
        }
        if (0.0..len).contains(&position) {
            return position;
        }
        let wrapped = position.rem_euclid(len);
        // rem_euclid may round up to len for tiny negative positions
        if wrapped >= len {
            0.0
        } else {
            wrapped
        }
    }

    /// Read the buffer at the given fractional frame position, looping around the buffer's
    /// boundaries. Returns silence for empty sources.
    #[inline]
    pub fn sample_at(&self, position: f64, interpolation: SourceInterpolation) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let position = self.wrap_position(position);
        match interpolation {
            SourceInterpolation::Linear => self.sample_linear(position),
            SourceInterpolation::Cubic => self.sample_cubic(position),
        }
    }

    #[inline]
    fn sample_linear(&self, position: f64) -> f32 {
        let len = self.samples.len();
        assume!(unsafe: len > 0, "Buffer len is checked by the caller");
        let max_index = len - 1;

        let index = (position as usize).min(max_index);
        let fraction = (position - index as f64) as f32;
        let next = if index < max_index { index + 1 } else { 0 };

        assume!(unsafe: index < len);
        let y0 = self.samples[index];
        assume!(unsafe: next < len);
        let y1 = self.samples[next];

        y0 + (y1 - y0) * fraction
    }

    #[inline]
    fn sample_cubic(&self, position: f64) -> f32 {
        let len = self.samples.len();
        assume!(unsafe: len > 0, "Buffer len is checked by the caller");
        let max_index = len - 1;

        let index = (position as usize).min(max_index);
        let fraction = (position - index as f64) as f32;

        // indices for 4-point cubic interpolation, looping
        let i1 = index;
        let i2 = if i1 < max_index { i1 + 1 } else { 0 };
        let i0 = if i1 > 0 { i1 - 1 } else { max_index };
        let i3 = if i2 < max_index { i2 + 1 } else { 0 };

        assume!(unsafe: i0 < len);
        let y0 = self.samples[i0];
        assume!(unsafe: i1 < len);
        let y1 = self.samples[i1];
        assume!(unsafe: i2 < len);
        let y2 = self.samples[i2];
        assume!(unsafe: i3 < len);
        let y3 = self.samples[i3];

        // Catmull-Rom
        let a = -0.5 * y0 + 1.5 * y1 - 1.5 * y2 + 0.5 * y3;
        let b = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
        let c = -0.5 * y0 + 0.5 * y2;
        let d = y1;

        ((a * fraction + b) * fraction + c) * fraction + d
    }
}

// -------------------------------------------------------------------------------------------------
