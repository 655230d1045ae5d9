//! WAV fragment assembly by raw frame concatenation.

use super::CombineError;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Result of a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Parameters shared by every input and the output
    pub spec: WavSpec,
    /// Total frames written (samples per channel)
    pub frames: u64,
}

impl MergeSummary {
    /// Duration of the merged audio in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.spec.sample_rate == 0 {
            return 0;
        }
        self.frames * 1000 / self.spec.sample_rate as u64
    }
}

fn open_wav(path: &Path) -> Result<WavReader<BufReader<File>>, CombineError> {
    WavReader::open(path).map_err(|source| CombineError::Wav {
        path: path.to_path_buf(),
        source,
    })
}

fn describe_spec(spec: &WavSpec) -> String {
    let format = match spec.sample_format {
        SampleFormat::Int => "int",
        SampleFormat::Float => "float",
    };
    format!(
        "{} ch / {} Hz / {}-bit {}",
        spec.channels, spec.sample_rate, spec.bits_per_sample, format
    )
}

/// Concatenate WAV files into one, preserving input order.
///
/// The first file's parameters (channels, sample rate, bit depth, sample
/// format) become the output's. Every input is checked against them before
/// anything is written; a mismatch fails instead of producing garbled audio.
pub fn concatenate_wav_files(
    audio_files: &[&Path],
    output_path: &Path,
) -> Result<MergeSummary, CombineError> {
    let Some(first) = audio_files.first() else {
        return Err(CombineError::NoInputs);
    };

    let spec = open_wav(first)?.spec();
    for path in &audio_files[1..] {
        let other = open_wav(path)?.spec();
        if other != spec {
            return Err(CombineError::FormatMismatch {
                path: path.to_path_buf(),
                expected: describe_spec(&spec),
                found: describe_spec(&other),
            });
        }
    }

    let wav_err = |source| CombineError::Wav {
        path: output_path.to_path_buf(),
        source,
    };

    let mut writer = WavWriter::create(output_path, spec).map_err(wav_err)?;
    let mut frames: u64 = 0;

    for path in audio_files {
        let mut reader = open_wav(path)?;
        frames += reader.duration() as u64;

        let read_err = |source| CombineError::Wav {
            path: path.to_path_buf(),
            source,
        };

        match spec.sample_format {
            SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    writer.write_sample(sample.map_err(read_err)?).map_err(wav_err)?;
                }
            }
            SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    writer.write_sample(sample.map_err(read_err)?).map_err(wav_err)?;
                }
            }
        }
    }

    writer.finalize().map_err(wav_err)?;

    log::debug!(
        "Merged {} WAV fragments ({}, {} frames)",
        audio_files.len(),
        describe_spec(&spec),
        frames
    );

    Ok(MergeSummary { spec, frames })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn spec(channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn write_wav(dir: &Path, name: &str, spec: WavSpec, samples: &[i16]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn read_samples(path: &Path) -> Vec<i16> {
        WavReader::open(path)
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect()
    }

    #[test]
    fn test_empty_input_fails() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out.wav");
        assert!(matches!(
            concatenate_wav_files(&[], &out),
            Err(CombineError::NoInputs)
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_single_input_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let samples: Vec<i16> = (0..480).map(|i| (i * 37 % 2000 - 1000) as i16).collect();
        let input = write_wav(temp_dir.path(), "chunk_001.wav", spec(1, 24000), &samples);
        let out = temp_dir.path().join("combined.wav");

        let summary = concatenate_wav_files(&[input.as_path()], &out).unwrap();

        assert_eq!(summary.frames, 480);
        assert_eq!(summary.spec, spec(1, 24000));
        assert_eq!(read_samples(&out), samples);
        assert_eq!(
            std::fs::metadata(&out).unwrap().len(),
            std::fs::metadata(&input).unwrap().len()
        );
    }

    #[test]
    fn test_frames_sum_in_input_order() {
        let temp_dir = TempDir::new().unwrap();
        let a = write_wav(temp_dir.path(), "a.wav", spec(2, 24000), &[1, 1, 2, 2]);
        let b = write_wav(temp_dir.path(), "b.wav", spec(2, 24000), &[3, 3]);
        let c = write_wav(temp_dir.path(), "c.wav", spec(2, 24000), &[4, 4, 5, 5, 6, 6]);
        let out = temp_dir.path().join("combined.wav");

        let summary =
            concatenate_wav_files(&[a.as_path(), b.as_path(), c.as_path()], &out).unwrap();

        assert_eq!(summary.frames, 2 + 1 + 3);
        let reader = WavReader::open(&out).unwrap();
        assert_eq!(reader.duration(), 6);
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(read_samples(&out), vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6]);
    }

    #[test]
    fn test_float_samples_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let float_spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut paths = Vec::new();
        for (name, values) in [("x.wav", [0.25f32, -0.5]), ("y.wav", [0.75, 1.0])] {
            let path = temp_dir.path().join(name);
            let mut writer = WavWriter::create(&path, float_spec).unwrap();
            for v in values {
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
            paths.push(path);
        }
        let refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
        let out = temp_dir.path().join("combined.wav");

        concatenate_wav_files(&refs, &out).unwrap();

        let merged: Vec<f32> = WavReader::open(&out)
            .unwrap()
            .samples::<f32>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(merged, vec![0.25, -0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_mismatched_sample_rate_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let a = write_wav(temp_dir.path(), "a.wav", spec(1, 24000), &[1, 2]);
        let b = write_wav(temp_dir.path(), "b.wav", spec(1, 44100), &[3, 4]);
        let out = temp_dir.path().join("combined.wav");

        let err = concatenate_wav_files(&[a.as_path(), b.as_path()], &out).unwrap_err();

        match err {
            CombineError::FormatMismatch {
                path,
                expected,
                found,
            } => {
                assert_eq!(path, b);
                assert!(expected.contains("24000 Hz"));
                assert!(found.contains("44100 Hz"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_non_wav_input_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let bogus = temp_dir.path().join("chunk_001.wav");
        std::fs::write(&bogus, b"ID3 this is an mp3").unwrap();
        let out = temp_dir.path().join("combined.wav");

        assert!(matches!(
            concatenate_wav_files(&[bogus.as_path()], &out),
            Err(CombineError::Wav { .. })
        ));
    }

    #[test]
    fn test_duration_ms() {
        let summary = MergeSummary {
            spec: spec(1, 24000),
            frames: 36000,
        };
        assert_eq!(summary.duration_ms(), 1500);
    }
}
