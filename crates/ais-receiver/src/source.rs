//! Sample sources
//!
//! The receiver pulls complex baseband chunks from a [`SampleSource`]. Live
//! radio capture lives outside this crate; [`FileSource`] replays recorded
//! captures and [`VecSource`] serves samples from memory.

use crate::error::SourceError;
use ais_dsp_core::IqSample;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Pull-based source of complex baseband samples at a fixed rate.
pub trait SampleSource {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> f64;

    /// Append up to `max_samples` samples to `out`. Returns the number
    /// appended; 0 means the stream has ended.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the underlying device or file fails.
    fn read_chunk(&mut self, max_samples: usize, out: &mut Vec<IqSample>)
        -> Result<usize, SourceError>;
}

/// On-disk sample layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SampleFormat {
    /// Interleaved little-endian `f32` I/Q (GNU Radio `fc32`)
    Cf32,
    /// Interleaved little-endian `i16` I/Q
    Cs16,
    /// Interleaved unsigned 8-bit I/Q (rtl_sdr)
    Cu8,
}

impl SampleFormat {
    /// Bytes per complex sample.
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Cf32 => 8,
            Self::Cs16 => 4,
            Self::Cu8 => 2,
        }
    }

    /// Guess the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cf32" | "fc32" | "cfile" => Some(Self::Cf32),
            "cs16" | "sc16" => Some(Self::Cs16),
            "cu8" | "u8" => Some(Self::Cu8),
            _ => None,
        }
    }

    fn decode(self, bytes: &[u8]) -> IqSample {
        match self {
            Self::Cf32 => IqSample::new(
                LittleEndian::read_f32(&bytes[0..4]),
                LittleEndian::read_f32(&bytes[4..8]),
            ),
            Self::Cs16 => IqSample::new(
                f32::from(LittleEndian::read_i16(&bytes[0..2])) / 32_768.0,
                f32::from(LittleEndian::read_i16(&bytes[2..4])) / 32_768.0,
            ),
            Self::Cu8 => IqSample::new(
                (f32::from(bytes[0]) - 127.5) / 127.5,
                (f32::from(bytes[1]) - 127.5) / 127.5,
            ),
        }
    }
}

/// Replays a recorded capture.
pub struct FileSource<R = BufReader<File>> {
    reader: R,
    format: SampleFormat,
    sample_rate: f64,
    buf: Vec<u8>,
    eof: bool,
}

impl FileSource<BufReader<File>> {
    /// Open a capture file.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the file cannot be opened or the rate
    /// is invalid.
    pub fn open(
        path: impl AsRef<Path>,
        format: SampleFormat,
        sample_rate: f64,
    ) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref())?;
        log::info!(
            "replaying {} ({:?}, {} S/s)",
            path.as_ref().display(),
            format,
            sample_rate
        );
        Self::from_reader(BufReader::new(file), format, sample_rate)
    }
}

impl<R: Read> FileSource<R> {
    /// Wrap any reader.
    ///
    /// # Errors
    /// Returns [`SourceError::InvalidSampleRate`] for non-positive rates.
    pub fn from_reader(reader: R, format: SampleFormat, sample_rate: f64) -> Result<Self, SourceError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SourceError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            reader,
            format,
            sample_rate,
            buf: Vec::new(),
            eof: false,
        })
    }

    /// Sample format.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        self.format
    }
}

impl<R: Read> SampleSource for FileSource<R> {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn read_chunk(&mut self, max_samples: usize, out: &mut Vec<IqSample>) -> Result<usize, SourceError> {
        if self.eof {
            return Ok(0);
        }
        let bps = self.format.bytes_per_sample();
        let want = max_samples * bps;
        self.buf.resize(want, 0);

        let mut filled = 0;
        while filled < want {
            match self.reader.read(&mut self.buf[filled..want]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let whole = filled / bps;
        if filled % bps != 0 {
            log::debug!("dropping {} trailing bytes of a partial sample", filled % bps);
        }
        let format = self.format;
        out.extend(self.buf[..whole * bps].chunks_exact(bps).map(|b| format.decode(b)));
        Ok(whole)
    }
}

/// Serves samples from memory.
#[derive(Clone, Debug)]
pub struct VecSource {
    samples: Vec<IqSample>,
    pos: usize,
    sample_rate: f64,
}

impl VecSource {
    /// Source over `samples` at `sample_rate`.
    #[must_use]
    pub fn new(samples: Vec<IqSample>, sample_rate: f64) -> Self {
        Self {
            samples,
            pos: 0,
            sample_rate,
        }
    }

    /// Samples not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.pos
    }
}

impl SampleSource for VecSource {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn read_chunk(&mut self, max_samples: usize, out: &mut Vec<IqSample>) -> Result<usize, SourceError> {
        let n = max_samples.min(self.remaining());
        out.extend_from_slice(&self.samples[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Paces another source to its nominal sample rate, like a live device.
pub struct ThrottledSource<S> {
    inner: S,
    start: Option<Instant>,
    delivered: u64,
}

impl<S: SampleSource> ThrottledSource<S> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            start: None,
            delivered: 0,
        }
    }
}

impl<S: SampleSource> SampleSource for ThrottledSource<S> {
    fn sample_rate(&self) -> f64 {
        self.inner.sample_rate()
    }

    fn read_chunk(&mut self, max_samples: usize, out: &mut Vec<IqSample>) -> Result<usize, SourceError> {
        let start = *self.start.get_or_insert_with(Instant::now);
        let due = Duration::from_secs_f64(self.delivered as f64 / self.inner.sample_rate());
        if let Some(wait) = due.checked_sub(start.elapsed()) {
            thread::sleep(wait);
        }
        let n = self.inner.read_chunk(max_samples, out)?;
        self.delivered += n as u64;
        Ok(n)
    }
}

/// Write samples as interleaved little-endian `f32` (cf32).
///
/// # Errors
/// Returns the underlying write error.
pub fn write_cf32<W: Write>(writer: W, samples: &[IqSample]) -> io::Result<()> {
    let mut writer = BufWriter::new(writer);
    for s in samples {
        writer.write_f32::<LittleEndian>(s.i)?;
        writer.write_f32::<LittleEndian>(s.q)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_vec_source_chunks() {
        let samples: Vec<IqSample> = (0..10).map(|n| IqSample::new(n as f32, 0.0)).collect();
        let mut src = VecSource::new(samples, 48_000.0);
        let mut out = Vec::new();
        assert_eq!(src.read_chunk(4, &mut out).unwrap(), 4);
        assert_eq!(src.read_chunk(4, &mut out).unwrap(), 4);
        assert_eq!(src.read_chunk(4, &mut out).unwrap(), 2);
        assert_eq!(src.read_chunk(4, &mut out).unwrap(), 0);
        assert_eq!(out.len(), 10);
        assert_eq!(out[9].i, 9.0);
    }

    #[test]
    fn test_cu8_scaling() {
        let bytes = vec![255u8, 0, 128, 127];
        let mut src = FileSource::from_reader(Cursor::new(bytes), SampleFormat::Cu8, 1.0).unwrap();
        let mut out = Vec::new();
        assert_eq!(src.read_chunk(8, &mut out).unwrap(), 2);
        assert!((out[0].i - 1.0).abs() < 1e-6);
        assert!((out[0].q + 1.0).abs() < 1e-6);
        assert!(out[1].i.abs() < 0.01 && out[1].q.abs() < 0.01);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SampleFormat::from_path(Path::new("a.cf32")), Some(SampleFormat::Cf32));
        assert_eq!(SampleFormat::from_path(Path::new("a.CU8")), Some(SampleFormat::Cu8));
        assert_eq!(SampleFormat::from_path(Path::new("a.wav")), None);
        assert_eq!(SampleFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_rejects_bad_rate() {
        assert!(matches!(
            FileSource::from_reader(Cursor::new(Vec::new()), SampleFormat::Cf32, 0.0),
            Err(SourceError::InvalidSampleRate(_))
        ));
    }
}
