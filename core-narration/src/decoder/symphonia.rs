//! # Symphonia Clip Decoder
//!
//! Decodes whole narration clips from memory using Symphonia's probe and codec
//! registries.

use super::ClipDecoder;
use crate::error::{NarrationError, Result};
use bridge_traits::PcmClip;
use bytes::Bytes;
use std::io::{Cursor, ErrorKind};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, warn};

/// Give up after this many undecodable packets in a row.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// [`ClipDecoder`] backed by Symphonia.
///
/// Supports every format enabled in the workspace's `symphonia` dependency
/// (WAV, MP3, FLAC, Ogg Vorbis, AAC/M4A). Output is interleaved `f32` at the
/// clip's native sample rate; the host output is responsible for resampling.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaClipDecoder;

impl SymphoniaClipDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ClipDecoder for SymphoniaClipDecoder {
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    fn decode(&self, bytes: Bytes, extension: Option<&str>) -> Result<PcmClip> {
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| NarrationError::InvalidFormat(format!("Failed to probe format: {}", e)))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| NarrationError::UnsupportedCodec("No supported audio tracks".into()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| {
                NarrationError::UnsupportedCodec(format!("Failed to create codec decoder: {}", e))
            })?;

        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params.channels.map(|ch| ch.count() as u16);
        let mut samples: Vec<f32> = Vec::new();
        let mut consecutive_errors = 0;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => {
                    return Err(NarrationError::DecodingError(
                        "Stream changed mid-clip (reset required)".into(),
                    ));
                }
                Err(e) => {
                    return Err(NarrationError::DecodingError(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    consecutive_errors = 0;
                    let spec = *decoded.spec();
                    sample_rate = Some(spec.rate);
                    channels = Some(spec.channels.count() as u16);

                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }
                Err(e @ (SymphoniaError::DecodeError(_) | SymphoniaError::IoError(_))) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping undecodable packet ({}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(NarrationError::DecodingError(format!(
                            "Too many consecutive decode errors: {}",
                            e
                        )));
                    }
                }
                Err(e) => return Err(NarrationError::DecodingError(e.to_string())),
            }
        }

        let sample_rate = sample_rate
            .ok_or_else(|| NarrationError::InvalidFormat("Missing sample rate".into()))?;
        let channels = channels
            .filter(|&count| count > 0)
            .ok_or_else(|| NarrationError::InvalidFormat("Missing channel layout".into()))?;

        if samples.is_empty() {
            return Err(NarrationError::DecodingError("Clip contains no audio".into()));
        }

        let clip = PcmClip::new(samples, sample_rate, channels);
        debug!(
            sample_rate,
            channels,
            duration_ms = clip.duration().as_millis() as u64,
            "Clip decoded"
        );
        Ok(clip)
    }
}
