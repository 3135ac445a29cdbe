//! Per-part compression sinks and their finished-entry descriptors.
//!
//! Each part gets exactly one [`EntrySink`], owned and driven by a single
//! worker thread. Incoming bytes update a CRC-32 accumulator and an
//! uncompressed-byte counter, then flow into a raw-DEFLATE encoder (or
//! straight through for STORE) appending to a temp-file backing store. The
//! sink lifecycle is `Open --write*--> Open --close--> Closed
//! --into_descriptor--> Consumed`; the resulting [`EntryDescriptor`] is
//! immutable and crosses threads by move only.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::DeflateEncoder;
use flate2::Crc;
use tempfile::{Builder, NamedTempFile, TempPath};

use crate::util::{Error, Result};
use crate::zip::options::Compression;

enum Encoder {
    Deflate(DeflateEncoder<NamedTempFile>),
    Store(NamedTempFile),
}

impl Encoder {
    fn finish(self) -> io::Result<NamedTempFile> {
        match self {
            Encoder::Deflate(encoder) => encoder.finish(),
            Encoder::Store(file) => Ok(file),
        }
    }
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Deflate(encoder) => encoder.write(buf),
            Encoder::Store(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Deflate(encoder) => encoder.flush(),
            Encoder::Store(file) => file.flush(),
        }
    }
}

enum State {
    Open(Encoder),
    Closed { store: TempPath, compressed_size: u64 },
    Consumed,
}

/// Compression sink for one archive part.
///
/// Owns one temp-file backing store for its lifetime; the store is deleted
/// when the sink (or the descriptor it turns into) is dropped, on every exit
/// path including cancellation.
pub struct EntrySink {
    name: String,
    crc: Crc,
    uncompressed_size: u64,
    compression: Compression,
    state: State,
}

impl EntrySink {
    /// Create a sink for the named part, backed by a fresh temp file in
    /// `temp_dir`.
    pub fn new(name: impl Into<String>, compression: Compression, temp_dir: &Path) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("entry name must not be empty"));
        }

        let store = Builder::new()
            .prefix("opcpack-part-")
            .suffix(".tmp")
            .tempfile_in(temp_dir)?;

        let encoder = match compression {
            Compression::Store => Encoder::Store(store),
            Compression::Deflate(level) => Encoder::Deflate(DeflateEncoder::new(
                store,
                flate2::Compression::new(level.min(9)),
            )),
        };

        Ok(Self {
            name,
            crc: Crc::new(),
            uncompressed_size: 0,
            compression,
            state: State::Open(encoder),
        })
    }

    /// The part name this sink was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uncompressed bytes accepted so far.
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Append uncompressed bytes. Valid any number of times while open.
    pub fn append(&mut self, buf: &[u8]) -> Result<()> {
        match &mut self.state {
            State::Open(encoder) => {
                encoder.write_all(buf)?;
                self.crc.update(buf);
                self.uncompressed_size += buf.len() as u64;
                Ok(())
            }
            _ => Err(Error::invalid(format!(
                "write on closed entry '{}'",
                self.name
            ))),
        }
    }

    /// Finish the encoder and seal the backing store. Idempotent once closed.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Consumed) {
            State::Open(encoder) => {
                let mut file = encoder.finish()?;
                file.flush()?;
                let compressed_size = file.as_file().metadata()?.len();
                self.state = State::Closed {
                    store: file.into_temp_path(),
                    compressed_size,
                };
                Ok(())
            }
            closed @ State::Closed { .. } => {
                self.state = closed;
                Ok(())
            }
            State::Consumed => Err(Error::invalid(format!(
                "close on consumed entry '{}'",
                self.name
            ))),
        }
    }

    /// Produce the immutable descriptor for a closed sink.
    ///
    /// Fails with `InvalidState` if the sink was never closed: the compressed
    /// size and CRC are only final after the encoder has been finished.
    pub fn into_descriptor(mut self) -> Result<EntryDescriptor> {
        match std::mem::replace(&mut self.state, State::Consumed) {
            State::Closed {
                store,
                compressed_size,
            } => Ok(EntryDescriptor {
                name: std::mem::take(&mut self.name),
                store,
                crc32: self.crc.sum(),
                uncompressed_size: self.uncompressed_size,
                compressed_size,
                method: self.compression.method(),
                version_needed: self.compression.version_needed(),
            }),
            _ => Err(Error::invalid(format!(
                "entry '{}' must be closed before it can be finalized",
                self.name
            ))),
        }
    }
}

// Producers drive the sink through `io::Write`, so `write!` and
// `io::copy` work against it directly.
impl Write for EntrySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            State::Open(encoder) => encoder.flush(),
            _ => Ok(()),
        }
    }
}

/// Immutable record describing one finished part.
///
/// Holds the exclusive handle to the part's backing store; dropping the
/// descriptor deletes the store.
#[derive(Debug)]
pub struct EntryDescriptor {
    name: String,
    store: TempPath,
    crc32: u32,
    uncompressed_size: u64,
    compressed_size: u64,
    method: u16,
    version_needed: u16,
}

impl EntryDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// ZIP compression method code (0 = STORE, 8 = DEFLATE).
    pub fn method(&self) -> u16 {
        self.method
    }

    /// "Version needed to extract" stamp for this entry's method.
    pub fn version_needed(&self) -> u16 {
        self.version_needed
    }

    /// Open the backing store for read-back during assembly.
    pub fn open_store(&self) -> Result<File> {
        Ok(File::open(&self.store)?)
    }
}
