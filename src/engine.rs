//! The real-time grain engine and its control-context counterpart.

use std::sync::Arc;

use basedrop::{Collector, Shared, SharedCell};
use crossbeam_queue::ArrayQueue;

use crate::{
    config::EngineConfig,
    grain::{pool::GrainPool, renderer::GrainRenderer, window, Grain},
    model::StochasticModel,
    parameter::ParameterStore,
    source::SourceBuffer,
    utils::buffer::{InterleavedMixBuffer, MixBuffer, PlanarMixBuffer},
    Error,
};

mod controller;
mod events;

pub use controller::EngineController;
pub use events::{EngineDiagnostic, NoteEvent};

use events::NoteGate;

// -------------------------------------------------------------------------------------------------

/// Processing state of an [`AudioEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EngineState {
    /// `prepare_to_play` was not called yet: processing is a no-op.
    Unprepared,
    /// Ready to process. Also entered when a new source buffer got picked up.
    Prepared,
    /// At least one block got processed with the current source.
    Processing,
}

// -------------------------------------------------------------------------------------------------

/// The audio-context half of the granular synthesis engine.
///
/// Owns the stochastic model and the grain pool, schedules grain onsets with sample accuracy
/// and renders all live grains into the output blocks. Block processing never blocks, allocates,
/// logs or fails: errors are reported as silence.
///
/// Create an engine together with its [`EngineController`] via [`AudioEngine::new`], then move the
/// engine to the audio thread.
pub struct AudioEngine {
    state: EngineState,
    config: EngineConfig,
    sample_rate: u32,
    max_block_size: usize,
    parameters: Arc<ParameterStore>,
    model: StochasticModel,
    pool: GrainPool,
    renderer: GrainRenderer,
    source: Arc<SharedCell<SourceBuffer>>,
    source_generation: u64,
    diagnostics: Arc<ArrayQueue<EngineDiagnostic>>,
    note_gate: NoteGate,
    /// Samples from the start of the next block until the next onset. `None` while idle
    /// (density is zero).
    samples_until_next_grain: Option<usize>,
    /// Density the pending onset countdown got drawn with.
    scheduled_density: f32,
    next_grain_id: u64,
    triggered_grain_count: u64,
    stolen_grain_count: u64,
}

impl AudioEngine {
    /// Create a new, unprepared engine and its controller with the given config.
    pub fn new(config: EngineConfig) -> Result<(Self, EngineController), Error> {
        config.validate()?;

        let parameters = Arc::new(ParameterStore::new());
        let collector = Collector::new();
        let source = Arc::new(SharedCell::new(Shared::new(
            &collector.handle(),
            SourceBuffer::empty(),
        )));
        let diagnostics = Arc::new(ArrayQueue::new(config.diagnostics_capacity));

        let mut model = match config.seed {
            Some(seed) => StochasticModel::new(Arc::clone(&parameters), seed),
            None => StochasticModel::from_entropy(Arc::clone(&parameters)),
        };
        model.set_polyphony(config.polyphony());
        let renderer = GrainRenderer::new(config.window, config.pan_law, config.interpolation);

        let controller = EngineController::new(
            Arc::clone(&parameters),
            Arc::clone(&source),
            Arc::clone(&diagnostics),
            collector,
        );
        let engine = Self {
            state: EngineState::Unprepared,
            config,
            sample_rate: 0,
            max_block_size: 0,
            parameters,
            model,
            pool: GrainPool::new(0),
            renderer,
            source,
            source_generation: 0,
            diagnostics,
            note_gate: NoteGate::default(),
            samples_until_next_grain: None,
            scheduled_density: 0.0,
            next_grain_id: 0,
            triggered_grain_count: 0,
            stolen_grain_count: 0,
        };
        Ok((engine, controller))
    }

    /// Prepare for playback with the given output sample rate and max expected block size.
    ///
    /// Allocates the grain pool, kills all grains and restarts onset scheduling. Must only be
    /// called while the audio context is not processing.
    pub fn prepare_to_play(&mut self, sample_rate: u32, max_block_size: usize) -> Result<(), Error> {
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if max_block_size == 0 {
            return Err(Error::ParameterError(
                "Max block size must be > 0".to_string(),
            ));
        }
        let polyphony = self.config.polyphony();
        if self.pool.capacity() != polyphony {
            self.pool = GrainPool::new(polyphony);
        } else {
            self.pool.clear();
        }
        self.model.set_polyphony(polyphony);
        // build window LUTs now, not in the first processed block
        window::initialize();

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.note_gate.reset();
        self.restart_scheduling();
        self.state = EngineState::Prepared;

        log::info!(
            "Prepared grain engine: {sample_rate} Hz, {max_block_size} frames max block size, \
             {polyphony} grains polyphony"
        );
        Ok(())
    }

    /// Kill all grains and restart the onset scheduling. Real-time safe.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.note_gate.reset();
        if self.state != EngineState::Unprepared {
            self.restart_scheduling();
            self.state = EngineState::Prepared;
        }
    }

    /// Schedule the next onset at the start of the next block.
    fn restart_scheduling(&mut self) {
        self.model.restart();
        self.samples_until_next_grain = Some(0);
        self.scheduled_density = self.parameters.density();
    }

    /// Restart the random sequence with the given seed. Real-time safe.
    pub fn reseed(&mut self, seed: u64) {
        self.model.reseed(seed);
    }

    /// Current processing state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The config the engine was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Output sample rate, as set in `prepare_to_play`. 0 when unprepared.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Max block size, as set in `prepare_to_play`. 0 when unprepared.
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// The shared parameter store.
    pub fn parameters(&self) -> &Arc<ParameterStore> {
        &self.parameters
    }

    /// Grain pool capacity. 0 when unprepared.
    pub fn polyphony(&self) -> usize {
        self.pool.capacity()
    }

    /// Number of currently live grains.
    pub fn live_grain_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Iterate over all currently live grains, in no particular order.
    pub fn live_grains(&self) -> impl Iterator<Item = &Grain> + '_ {
        self.pool.iter_live().map(|(_, grain)| grain).filter(|g| g.is_alive())
    }

    /// Total number of grains triggered since creation.
    pub fn triggered_grain_count(&self) -> u64 {
        self.triggered_grain_count
    }

    /// Total number of grains stolen since creation.
    pub fn stolen_grain_count(&self) -> u64 {
        self.stolen_grain_count
    }

    /// Render the next block into the given interleaved buffer. Grains are added to the
    /// buffer's content. Does nothing when unprepared.
    pub fn process_block(&mut self, output: &mut [f32], channel_count: usize) {
        self.process_block_with_events(output, channel_count, &[]);
    }

    /// Render the next block into the given interleaved buffer, applying the given note events.
    pub fn process_block_with_events(
        &mut self,
        output: &mut [f32],
        channel_count: usize,
        events: &[NoteEvent],
    ) {
        if channel_count == 0 {
            return;
        }
        let mut output = InterleavedMixBuffer::new(output, channel_count);
        self.process(&mut output, events);
    }

    /// Render the next block into the given planar channel buffers. Grains are added to the
    /// buffers' content. Does nothing when unprepared.
    pub fn process_planar_block(&mut self, channels: &mut [&mut [f32]]) {
        self.process_planar_block_with_events(channels, &[]);
    }

    /// Render the next block into the given planar channel buffers, applying the given note
    /// events.
    pub fn process_planar_block_with_events(
        &mut self,
        channels: &mut [&mut [f32]],
        events: &[NoteEvent],
    ) {
        if channels.is_empty() {
            return;
        }
        let mut output = PlanarMixBuffer::new(channels);
        self.process(&mut output, events);
    }

    fn process<O: MixBuffer>(&mut self, output: &mut O, events: &[NoteEvent]) {
        if self.state == EngineState::Unprepared {
            return;
        }
        Self::assert_no_alloc(|| self.process_unchecked(output, events));
    }

    fn process_unchecked<O: MixBuffer>(&mut self, output: &mut O, events: &[NoteEvent]) {
        // hold the current source for the whole block
        let source = self.source.get();
        if source.generation() != self.source_generation {
            self.pick_up_source(&source);
        }

        self.schedule_grains(output.frame_count(), events, &source);

        let renderer = &self.renderer;
        let sample_rate = self.sample_rate;
        self.pool
            .retain_live(|grain| renderer.render(grain, &source, sample_rate, &mut *output));

        self.state = EngineState::Processing;
        // dropping the last ref of a replaced source only queues it on the collector
        drop(source);
    }

    /// Switch to a newly published source: live grains keep playing, reading the new buffer.
    ///
    /// Read positions are wrapped into the new buffer and envelopes continue unchanged, so a
    /// grain's contribution between two successive frames changes by at most
    /// `2 * amplitude * peak`, where peak is the largest absolute sample of the old and new
    /// source. The output jump at a swap is bounded by the sum of that over all live grains.
    fn pick_up_source(&mut self, source: &SourceBuffer) {
        self.pool.for_each_live_mut(|grain| {
            grain.position = source.wrap_position(grain.position);
        });
        self.source_generation = source.generation();
        self.state = EngineState::Prepared;
        self.push_diagnostic(EngineDiagnostic::SourceSwapped {
            generation: source.generation(),
            frames: source.len(),
        });
    }

    /// Trigger all grains with onsets in the current block and apply note events.
    fn schedule_grains(&mut self, frame_count: usize, events: &[NoteEvent], source: &SourceBuffer) {
        let mut events = events.iter().peekable();
        let mut frame: usize = 0;
        let density = self.parameters.density();
        if density != self.scheduled_density {
            self.rescale_countdown(density);
        }
        loop {
            let Some(countdown) = self.samples_until_next_grain else {
                // idle: restart scheduling as soon as the density is > 0
                let density = self.parameters.density();
                self.samples_until_next_grain =
                    self.model.samples_until_next_event(self.sample_rate, density);
                self.scheduled_density = density;
                if self.samples_until_next_grain.is_none() {
                    break;
                }
                continue;
            };
            let onset = frame.saturating_add(countdown);
            if onset >= frame_count {
                self.samples_until_next_grain = Some(onset - frame_count);
                break;
            }
            while let Some(event) = events.next_if(|event| event.frame() <= onset) {
                self.note_gate.apply(event);
            }
            frame = onset;

            let density = self.parameters.density();
            let gate_open = !self.config.note_gating || self.note_gate.is_open();
            if density > 0.0 && gate_open {
                self.trigger_grain(onset, source);
            }
            self.samples_until_next_grain = self
                .model
                .samples_until_next_event(self.sample_rate, density);
            self.scheduled_density = density;
            if self.samples_until_next_grain.is_none() {
                // no re-query in this block: density changes are picked up in the next one
                break;
            }
        }
        for event in events {
            self.note_gate.apply(event);
        }
    }

    /// Apply a density change to the pending onset: the remaining countdown gets scaled by
    /// `old / new`, so a change takes effect within one interval at the new density.
    fn rescale_countdown(&mut self, density: f32) {
        let scheduled_density = self.scheduled_density;
        self.scheduled_density = density;
        let Some(countdown) = self.samples_until_next_grain else {
            return;
        };
        if density <= 0.0 {
            self.samples_until_next_grain = None;
        } else if scheduled_density > 0.0 {
            let scaled = countdown as f64 * (scheduled_density as f64 / density as f64);
            // float to int casts saturate
            self.samples_until_next_grain = Some(scaled as usize);
        }
    }

    fn trigger_grain(&mut self, onset: usize, source: &SourceBuffer) {
        let Some(allocation) = self.pool.try_allocate() else {
            return;
        };
        if let Some(stolen) = allocation.stolen {
            self.stolen_grain_count += 1;
            self.push_diagnostic(EngineDiagnostic::GrainStolen {
                id: stolen.id,
                remaining: stolen.remaining,
            });
        }
        let id = self.next_grain_id;
        self.next_grain_id += 1;
        self.triggered_grain_count += 1;

        let grain = self.pool.grain_mut(allocation.slot);
        self.model
            .generate_new_grain(grain, self.sample_rate, source.len(), id);
        grain.onset_offset = onset;
    }

    fn push_diagnostic(&self, diagnostic: EngineDiagnostic) {
        // drop diagnostics when the controller doesn't keep up
        let _ = self.diagnostics.push(diagnostic);
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------
