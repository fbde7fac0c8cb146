//! Bit sink with named outputs
//!
//! A channel writes its tagged bit stream through a single [`BitSink`] that
//! fans out to any number of named outputs. Every output receives the same
//! bytes: one byte per bit, value 0 or 1, in arrival order, no header.

use crate::error::ConfigError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory bit buffer that can be read while the pipeline runs.
#[derive(Clone, Debug, Default)]
pub struct SharedBits(Arc<Mutex<Vec<u8>>>);

impl SharedBits {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of bits written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn extend(&self, bits: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bits);
    }
}

/// Where an output writes.
#[derive(Clone, Debug)]
pub enum SinkTarget {
    /// File, created (truncated) when the pipeline is built
    File(PathBuf),
    /// Shared in-memory buffer
    Memory(SharedBits),
}

/// A named sink output.
#[derive(Clone, Debug)]
pub struct SinkOutput {
    /// Output name, e.g. "primary" or "debug"
    pub name: String,
    /// Destination
    pub target: SinkTarget,
}

impl SinkOutput {
    /// File output.
    #[must_use]
    pub fn file(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            target: SinkTarget::File(path.into()),
        }
    }

    /// In-memory output.
    #[must_use]
    pub fn memory(name: &str, buffer: SharedBits) -> Self {
        Self {
            name: name.to_string(),
            target: SinkTarget::Memory(buffer),
        }
    }

    /// File path, if this is a file output.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            SinkTarget::File(path) => Some(path),
            SinkTarget::Memory(_) => None,
        }
    }
}

/// Sink configuration: a list of outputs receiving identical data.
#[derive(Clone, Debug, Default)]
pub struct SinkSpec {
    /// Outputs
    pub outputs: Vec<SinkOutput>,
}

impl SinkSpec {
    /// Sink with the given outputs.
    #[must_use]
    pub fn new(outputs: Vec<SinkOutput>) -> Self {
        Self { outputs }
    }

    /// Drop an output by name.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.outputs.retain(|o| o.name != name);
        self
    }
}

enum Writer {
    File(BufWriter<File>),
    Memory(SharedBits),
}

/// Open bit sink.
pub struct BitSink {
    outputs: Vec<(String, Writer)>,
    written: u64,
}

impl BitSink {
    /// Open every output of `spec`. File outputs are created or truncated.
    ///
    /// # Errors
    /// Returns [`ConfigError::SinkOpen`] if a file cannot be created.
    pub fn open(spec: &SinkSpec) -> Result<Self, ConfigError> {
        let mut outputs = Vec::with_capacity(spec.outputs.len());
        for output in &spec.outputs {
            let writer = match &output.target {
                SinkTarget::File(path) => {
                    let file = File::create(path).map_err(|source| ConfigError::SinkOpen {
                        path: path.clone(),
                        source,
                    })?;
                    log::debug!("sink output {} -> {}", output.name, path.display());
                    Writer::File(BufWriter::new(file))
                }
                SinkTarget::Memory(buffer) => Writer::Memory(buffer.clone()),
            };
            outputs.push((output.name.clone(), writer));
        }
        Ok(Self {
            outputs,
            written: 0,
        })
    }

    /// Output names, in configuration order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|(name, _)| name.as_str())
    }

    /// Bits written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write bits to every output.
    ///
    /// # Errors
    /// Returns the first write failure.
    pub fn write(&mut self, bits: &[u8]) -> io::Result<()> {
        for (_, writer) in &mut self.outputs {
            match writer {
                Writer::File(file) => file.write_all(bits)?,
                Writer::Memory(buffer) => buffer.extend(bits),
            }
        }
        self.written += bits.len() as u64;
        Ok(())
    }

    /// Flush buffered file outputs.
    ///
    /// # Errors
    /// Returns the first flush failure.
    pub fn flush(&mut self) -> io::Result<()> {
        for (_, writer) in &mut self.outputs {
            if let Writer::File(file) = writer {
                file.flush()?;
            }
        }
        Ok(())
    }
}
