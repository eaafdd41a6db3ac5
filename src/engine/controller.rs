use std::{path::Path, sync::Arc};

use basedrop::{Collector, Shared, SharedCell};
use crossbeam_queue::ArrayQueue;

use super::EngineDiagnostic;
use crate::{
    parameter::ParameterStore,
    source::{BuiltInWaveform, SourceBuffer},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// The control-context half of the granular synthesis engine.
///
/// Sets stochastic parameters, loads and publishes grain sources and drains the engine's
/// diagnostics. Replaced source buffers are never freed in the audio context: they are retired
/// here, via [`collect_garbage`](Self::collect_garbage).
///
/// None of the controller's functions are real-time safe.
pub struct EngineController {
    parameters: Arc<ParameterStore>,
    source: Arc<SharedCell<SourceBuffer>>,
    diagnostics: Arc<ArrayQueue<EngineDiagnostic>>,
    collector: Collector,
    source_generation: u64,
}

impl EngineController {
    pub(crate) fn new(
        parameters: Arc<ParameterStore>,
        source: Arc<SharedCell<SourceBuffer>>,
        diagnostics: Arc<ArrayQueue<EngineDiagnostic>>,
        collector: Collector,
    ) -> Self {
        Self {
            parameters,
            source,
            diagnostics,
            collector,
            source_generation: 0,
        }
    }

    /// The shared parameter store. Parameters can be set at any time, from any thread.
    pub fn parameters(&self) -> &Arc<ParameterStore> {
        &self.parameters
    }

    /// Decode the given audio file and use it as new grain source.
    ///
    /// On errors, the previous source stays in effect.
    pub fn load_audio_sample<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let source = SourceBuffer::from_file(path).inspect_err(|err| {
            log::warn!("Failed to load audio sample '{}': {err}", path.display());
        })?;
        self.set_source_buffer(source);
        Ok(())
    }

    /// Decode the given encoded audio file content and use it as new grain source.
    ///
    /// On errors, the previous source stays in effect.
    pub fn load_audio_sample_from_buffer(&mut self, bytes: Vec<u8>, name: &str) -> Result<(), Error> {
        let source = SourceBuffer::from_encoded(name, bytes).inspect_err(|err| {
            log::warn!("Failed to load audio sample '{name}': {err}");
        })?;
        self.set_source_buffer(source);
        Ok(())
    }

    /// Use the built-in waveform with the given numeric id as new grain source.
    /// See [`BuiltInWaveform`] for the available ids.
    pub fn set_grain_source(&mut self, waveform_id: usize) -> Result<(), Error> {
        let waveform =
            BuiltInWaveform::from_repr(waveform_id).ok_or(Error::SourceNotFoundError(waveform_id))?;
        self.set_builtin_waveform(waveform);
        Ok(())
    }

    /// Use the given built-in waveform as new grain source.
    pub fn set_builtin_waveform(&mut self, waveform: BuiltInWaveform) {
        self.set_source_buffer(SourceBuffer::from_waveform(waveform));
    }

    /// Publish the given buffer as new grain source. The audio context picks it up at the start
    /// of its next block. Grains which are playing continue with the new source.
    pub fn set_source_buffer(&mut self, mut source: SourceBuffer) {
        self.source_generation += 1;
        source.set_generation(self.source_generation);
        log::info!(
            "Publishing grain source '{}': {} frames @ {} Hz, root pitch {}",
            source.name(),
            source.len(),
            source.sample_rate(),
            source.root_pitch()
        );
        let source = Shared::new(&self.collector.handle(), source);
        // the old source is retired via the collector once the audio context dropped it too
        drop(self.source.replace(source));
        self.collect_garbage();
    }

    /// Name of the currently published grain source.
    pub fn source_name(&self) -> String {
        self.source.get().name().to_string()
    }

    /// Generation of the currently published grain source. 0 when no source got published yet.
    pub fn source_generation(&self) -> u64 {
        self.source_generation
    }

    /// Free source buffers which are no longer used by the audio context.
    pub fn collect_garbage(&mut self) {
        self.collector.collect();
    }

    /// Drain and log all pending diagnostics from the audio context.
    pub fn poll_diagnostics(&mut self) -> Vec<EngineDiagnostic> {
        let mut diagnostics = Vec::with_capacity(self.diagnostics.len());
        while let Some(diagnostic) = self.diagnostics.pop() {
            log::debug!("Grain engine: {diagnostic:?}");
            diagnostics.push(diagnostic);
        }
        self.collect_garbage();
        diagnostics
    }
}

// -------------------------------------------------------------------------------------------------
