//! Renders a stochastic grain cloud into a wav file, using either a built-in waveform or an
//! audio file as grain source.

use std::path::PathBuf;

use arg::{parse_args, Args};

use pointillism::{
    AudioEngine, BuiltInWaveform, EngineConfig, EngineDiagnostic, NoteEvent, TemporalDistribution,
};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Info
};

const BLOCK_SIZE: usize = 512;
const CHANNEL_COUNT: usize = 2;

// -------------------------------------------------------------------------------------------------

/// Program arguments.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "o", long = "output")]
    /// Path of the wav file to write. By default \"grain-cloud.wav\".
    output_path: Option<PathBuf>,
    #[arg(short = "i", long = "input")]
    /// Audio file to use as grain source, instead of a built-in waveform.
    input_path: Option<PathBuf>,
    #[arg(short = "w", long = "waveform")]
    /// Built-in waveform: \"Sine\", \"Triangle\", \"Sawtooth\", \"Square\" or \"Noise\". By default \"Sine\".
    waveform: Option<BuiltInWaveform>,
    #[arg(long = "seconds")]
    /// Length of the rendered file in seconds. By default 10.
    seconds: Option<f32>,
    #[arg(short = "r", long = "sample-rate")]
    /// Output sample rate. By default 44100.
    sample_rate: Option<u32>,
    #[arg(short = "d", long = "density")]
    /// Grain density in grains per second. By default 25.
    density: Option<f32>,
    #[arg(long = "distribution")]
    /// Temporal distribution: \"Uniform\" or \"Poisson\". By default \"Poisson\".
    distribution: Option<TemporalDistribution>,
    #[arg(short = "p", long = "pitch")]
    /// Central grain pitch as MIDI note. By default 60.
    pitch: Option<f32>,
    #[arg(long = "dispersion")]
    /// Pitch dispersion in semitones. By default 2.
    dispersion: Option<f32>,
    #[arg(long = "duration")]
    /// Mean grain duration in milliseconds. By default 100.
    duration: Option<f32>,
    #[arg(long = "variation")]
    /// Relative grain duration variation. By default 0.25.
    variation: Option<f32>,
    #[arg(long = "spread")]
    /// Stereo spread of grains. By default 0.5.
    spread: Option<f32>,
    #[arg(short = "g", long = "gate")]
    /// Only trigger grains in the first and last third of the file, using note events.
    gated: bool,
    #[arg(short = "s", long = "seed")]
    /// Random seed. By default seeded from OS entropy.
    seed: Option<u64>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        // disable logging in chatty modules
        .with_module_level("symphonia_core", log::LevelFilter::Warn)
        .with_module_level("symphonia_format", log::LevelFilter::Warn)
        .init()?;

    // Create engine and controller
    let mut config = EngineConfig::new().with_note_gating(args.gated);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let (mut engine, mut controller) = AudioEngine::new(config)?;

    let sample_rate = args.sample_rate.unwrap_or(44100);
    engine.prepare_to_play(sample_rate, BLOCK_SIZE)?;

    // Set up the grain source
    if let Some(input_path) = &args.input_path {
        controller.load_audio_sample(input_path)?;
    } else {
        controller.set_builtin_waveform(args.waveform.unwrap_or(BuiltInWaveform::Sine));
    }

    // Set up the stochastic parameters
    let parameters = controller.parameters();
    parameters.set_density(args.density.unwrap_or(25.0));
    parameters.set_temporal_distribution(
        args.distribution.unwrap_or(TemporalDistribution::Poisson),
    );
    parameters.set_pitch_and_dispersion(
        args.pitch.unwrap_or(60.0),
        args.dispersion.unwrap_or(2.0),
    );
    parameters.set_duration_and_variation(
        args.duration.unwrap_or(100.0),
        args.variation.unwrap_or(0.25),
    );
    parameters.set_pan_and_spread(0.0, args.spread.unwrap_or(0.5));
    for parameter in pointillism::parameters::ParameterStore::parameters() {
        log::info!(
            "{}: {}",
            parameter.name(),
            parameters.value_to_string(
                pointillism::parameters::ParameterId::from_fourcc(parameter.id())
                    .ok_or("unknown parameter id")?,
                true
            )
        );
    }

    // Render blocks into the wav file
    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("grain-cloud.wav"));
    let mut writer = hound::WavWriter::create(
        &output_path,
        hound::WavSpec {
            channels: CHANNEL_COUNT as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    )?;

    let total_frames = (args.seconds.unwrap_or(10.0).max(0.0) * sample_rate as f32) as usize;
    let gate_frames = [total_frames / 3, total_frames * 2 / 3];
    let mut block = vec![0.0; BLOCK_SIZE * CHANNEL_COUNT];
    let mut events = Vec::with_capacity(3);
    let mut frame = 0;
    while frame < total_frames {
        let block_frames = BLOCK_SIZE.min(total_frames - frame);
        let output = &mut block[..block_frames * CHANNEL_COUNT];
        output.fill(0.0);

        events.clear();
        if frame == 0 {
            events.push(NoteEvent::NoteOn {
                frame: 0,
                note: 60,
                velocity: 1.0,
            });
        }
        if (frame..frame + block_frames).contains(&gate_frames[0]) {
            events.push(NoteEvent::NoteOff {
                frame: gate_frames[0] - frame,
                note: 60,
            });
        }
        if (frame..frame + block_frames).contains(&gate_frames[1]) {
            events.push(NoteEvent::NoteOn {
                frame: gate_frames[1] - frame,
                note: 60,
                velocity: 1.0,
            });
        }
        engine.process_block_with_events(output, CHANNEL_COUNT, &events);

        for sample in output.iter() {
            writer.write_sample(*sample)?;
        }
        frame += block_frames;

        for diagnostic in controller.poll_diagnostics() {
            if let EngineDiagnostic::GrainStolen { id, remaining } = diagnostic {
                log::warn!("Grain #{id} got stolen with {remaining} frames remaining");
            }
        }
    }
    writer.finalize()?;

    log::info!(
        "Rendered {} grains ({} stolen) into '{}'",
        engine.triggered_grain_count(),
        engine.stolen_grain_count(),
        output_path.display()
    );
    Ok(())
}
