#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod config;
mod engine;
mod error;
mod grain;
mod model;
mod parameter;
mod source;

// public, flat re-exports
pub use config::EngineConfig;
pub use engine::{AudioEngine, EngineController, EngineDiagnostic, EngineState, NoteEvent};
pub use error::Error;
pub use model::{grain_amplitude, StochasticModel, TemporalDistribution};
pub use source::{BuiltInWaveform, SourceBuffer, SourceInterpolation};

// public mods
pub mod utils;

pub mod grains {
    //! Grain state, pooling and rendering.

    pub use super::grain::{
        pool::{GrainAllocation, GrainPool, GrainSlot, StolenGrain},
        renderer::{GrainRenderer, PanLaw},
        window::GrainWindowMode,
        Grain,
    };
}

pub mod parameters {
    //! Synthesis parameter descriptors and the lock-free parameter store.

    pub use super::parameter::{
        EnumParameter, FloatParameter, Parameter, ParameterId, ParameterScaling, ParameterStore,
        ParameterType, StochasticParameters,
    };
}

// -------------------------------------------------------------------------------------------------

#[cfg(all(test, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;
