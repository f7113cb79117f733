//! Audio file decoding
//!
//! This module opens sound assets with symphonia and turns them into
//! interleaved stereo f32 chunks for the output stream.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use super::backend::BackendError;

/// A probed asset, ready to decode
pub struct DecodedSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    pub name: String,
    pub sample_rate: u32,
    pub channels: usize,
    pub duration: Duration,
}

impl DecodedSource {
    /// Open and probe an audio file
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let file = File::open(path)?;

        // Create media source stream
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create hint from file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| BackendError::Probe(e.to_string()))?;

        let format = probed.format;

        // Get the default track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(BackendError::NoTracks)?;

        let codec_params = &track.codec_params;
        let track_id = track.id;
        let sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let duration = match codec_params.n_frames {
            Some(n_frames) => {
                let time_base = codec_params
                    .time_base
                    .unwrap_or(TimeBase::new(1, sample_rate));
                let time = time_base.calc_time(n_frames);
                Duration::from_secs_f64(time.seconds as f64 + time.frac)
            }
            None => Duration::ZERO,
        };

        let decoder = symphonia::default::get_codecs()
            .make(codec_params, &DecoderOptions::default())
            .map_err(|e| BackendError::Decoder(e.to_string()))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string();

        log::info!(
            "Loaded audio file: {:?} ({} Hz, {} ch, {:.1}s)",
            path,
            sample_rate,
            channels,
            duration.as_secs_f32()
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            name,
            sample_rate,
            channels,
            duration,
        })
    }

    /// Decode the next packet as interleaved stereo samples.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    pub fn next_stereo(&mut self) -> Result<Option<Vec<f32>>, BackendError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => return Err(BackendError::Decoder(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    return Ok(Some(to_stereo(buf.samples(), spec.channels.count())));
                }
                // Skip corrupt packets
                Err(SymphoniaError::DecodeError(e)) => {
                    log::debug!("Skipping bad packet in {}: {}", self.name, e);
                    continue;
                }
                Err(e) => return Err(BackendError::Decoder(e.to_string())),
            }
        }
    }
}

/// Map interleaved samples with any channel count to interleaved stereo.
///
/// Mono is duplicated to both sides; extra channels beyond the first two
/// are dropped.
pub fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_stereo_mono() {
        assert_eq!(to_stereo(&[0.1, 0.2], 1), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_to_stereo_passthrough() {
        assert_eq!(to_stereo(&[0.1, 0.2, 0.3, 0.4], 2), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_to_stereo_surround() {
        let six = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        assert_eq!(to_stereo(&six, 6), vec![1.0, 2.0, 7.0, 8.0]);
    }

    #[test]
    fn test_open_missing_file() {
        let result = DecodedSource::open(Path::new("definitely/not/here.m4a"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn test_open_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.m4a");
        std::fs::write(&path, b"this is not audio").unwrap();
        assert!(matches!(
            DecodedSource::open(&path),
            Err(BackendError::Probe(_))
        ));
    }
}
