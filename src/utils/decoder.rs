use std::{fs::File, io, path::Path};

use symphonia::core::{
    audio::{SampleBuffer, SignalSpec},
    codecs::{CodecParameters, Decoder, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// Fully decoded audio content: interleaved samples with their layout.
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channel_count: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frame_count(&self) -> usize {
        if self.channel_count == 0 {
            0
        } else {
            self.samples.len() / self.channel_count
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Decodes audio files or in-memory encoded audio with Symphonia.
pub struct AudioDecoder {
    track_id: u32, // Internal track index.
    decoder: Box<dyn Decoder>,
    format: Box<dyn FormatReader>,
}

impl AudioDecoder {
    /// Create a new decoder from the given file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::MediaFileNotFound,
            _ => Error::IoError(err),
        })?;
        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }
        let source_stream = MediaSourceStream::new(Box::new(file), Default::default());
        Self::from_source_stream(source_stream, hint)
    }

    /// Create a new decoder from the given buffer. The buffer must get moved in, as Symphonia
    /// can't read from non static buffer refs.
    pub fn from_buffer(buffer: Vec<u8>) -> Result<Self, Error> {
        let cursor = Box::new(io::Cursor::new(buffer));
        let source_stream = MediaSourceStream::new(cursor, Default::default());
        Self::from_source_stream(source_stream, Hint::new())
    }

    /// Create a new decoder from the given Symphonia MediaSourceStream.
    pub fn from_source_stream(source_stream: MediaSourceStream, hint: Hint) -> Result<Self, Error> {
        // Use the default options when reading and decoding.
        let format_opts: FormatOptions = Default::default();
        let metadata_opts: MetadataOptions = Default::default();
        let decoder_opts: DecoderOptions = Default::default();

        // Probe the media source stream for a format.
        let probed = symphonia::default::get_probe()
            .format(&hint, source_stream, &format_opts, &metadata_opts)
            .map_err(|_| Error::MediaFileProbeError)?;

        // Get the format reader yielded by the probe operation.
        let format = probed.format;

        // Get the default track.
        let track = format.default_track().ok_or(Error::MediaFileProbeError)?;
        let track_id = track.id;

        // Create a decoder for the track.
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|err| Error::AudioDecodingError(Box::new(err)))?;

        Ok(Self {
            track_id,
            decoder,
            format,
        })
    }

    pub fn codec_params(&self) -> &CodecParameters {
        self.decoder.codec_params()
    }

    /// The stream's signal spec, when the container announces it.
    pub fn signal_spec(&self) -> Result<SignalSpec, Error> {
        let params = self.codec_params();
        match (params.sample_rate, params.channels) {
            (Some(rate), Some(channels)) => Ok(SignalSpec { rate, channels }),
            _ => Err(Error::AudioDecodingError(
                "Missing sample rate or channel layout in stream".into(),
            )),
        }
    }

    /// Decode all remaining packets of the default track into a single interleaved buffer.
    ///
    /// Packets which fail to decode because of invalid data get skipped. Returns an error when
    /// the stream contains no decodable audio at all.
    pub fn decode_to_end(mut self) -> Result<DecodedAudio, Error> {
        let mut decoded_audio = DecodedAudio::default();
        if let Ok(spec) = self.signal_spec() {
            decoded_audio.sample_rate = spec.rate;
            decoded_audio.channel_count = spec.channels.count();
        }
        if let Some(frames) = self.codec_params().n_frames {
            let channels = decoded_audio.channel_count.max(1);
            decoded_audio.samples.reserve(frames as usize * channels);
        }

        let mut sample_buffer: Option<SampleBuffer<f32>> = None;
        let mut sample_buffer_frames = 0;
        loop {
            // Demux an encoded packet from the media format.
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err))
                    if err.kind() == io::ErrorKind::UnexpectedEof =>
                {
                    break; // End of this stream.
                }
                Err(SymphoniaError::ResetRequired) => {
                    log::warn!("Stream changed its layout while decoding. Stopping here.");
                    break;
                }
                Err(err) => {
                    return Err(Error::AudioDecodingError(Box::new(err)));
                }
            };
            // If the packet does not belong to the selected track, skip over it.
            if packet.track_id() != self.track_id {
                continue;
            }
            // Decode the packet into an audio buffer.
            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::IoError(err)) => {
                    log::warn!("io decode error: {err}");
                    continue;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    log::warn!("decode error: {err}");
                    continue;
                }
                Err(err) => {
                    return Err(Error::AudioDecodingError(Box::new(err)));
                }
            };
            let spec = *decoded.spec();
            if decoded_audio.sample_rate == 0 {
                decoded_audio.sample_rate = spec.rate;
            }
            if decoded_audio.channel_count == 0 {
                decoded_audio.channel_count = spec.channels.count();
            }
            if sample_buffer.is_none() || decoded.capacity() > sample_buffer_frames {
                sample_buffer_frames = decoded.capacity();
                sample_buffer = Some(SampleBuffer::new(sample_buffer_frames as u64, spec));
            }
            if let Some(sample_buffer) = sample_buffer.as_mut() {
                // Interleave the samples into the buffer.
                sample_buffer.copy_interleaved_ref(decoded);
                decoded_audio
                    .samples
                    .extend_from_slice(sample_buffer.samples());
            }
        }

        if decoded_audio.samples.is_empty()
            || decoded_audio.channel_count == 0
            || decoded_audio.sample_rate == 0
        {
            return Err(Error::AudioDecodingError(
                "Stream contains no decodable audio".into(),
            ));
        }
        Ok(decoded_audio)
    }
}
