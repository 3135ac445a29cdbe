//! Sequential assembly of compressed parts into the final container.
//!
//! Consumes entry descriptors in submission order. For each entry it writes
//! a local file header and streams the compressed bytes back out of the
//! part's backing store, then records a matching central directory entry at
//! the header's true start offset. `finish` emits the central directory and
//! the end-of-central-directory record.
//!
//! Offsets count every byte written so far, header and name overhead
//! included; the cursor in [`CountingWriter`] is the single source of truth.

use std::io::{self, Write};

use tracing::{debug, trace};

use crate::util::{Error, Result};
use crate::zip::entry::EntryDescriptor;
use crate::zip::format::*;
use crate::zip::options::PackOptions;
use crate::zip::stream::CountingWriter;

struct CentralRecord {
    name: String,
    method: u16,
    version_needed: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    header_offset: u32,
}

/// Single-threaded writer of the final ZIP container.
pub struct ArchiveAssembler<W: Write> {
    out: CountingWriter<W>,
    central: Vec<CentralRecord>,
    modified: DosDateTime,
    comment: Vec<u8>,
}

impl<W: Write> ArchiveAssembler<W> {
    pub fn new(dest: W, options: &PackOptions) -> Self {
        Self {
            out: CountingWriter::new(dest),
            central: Vec::new(),
            modified: options.modified,
            comment: options
                .comment
                .as_deref()
                .map_or_else(Vec::new, |c| c.as_bytes().to_vec()),
        }
    }

    /// Number of entries appended so far.
    pub fn entry_count(&self) -> usize {
        self.central.len()
    }

    /// Write one entry: local header, name, compressed payload. The
    /// descriptor's backing store is consumed and deleted here.
    pub fn append(&mut self, descriptor: EntryDescriptor) -> Result<()> {
        if !fits_u16(self.central.len() as u64 + 1) {
            return Err(Error::too_large(
                "entry count",
                self.central.len() as u64 + 1,
                MAX_FIELD_U16,
            ));
        }

        let name = descriptor.name();
        let name_len = name.len() as u64;
        if !fits_u16(name_len) {
            return Err(Error::too_large("entry name length", name_len, MAX_FIELD_U16));
        }
        if !fits_u32(descriptor.compressed_size()) {
            return Err(Error::too_large(
                "compressed size",
                descriptor.compressed_size(),
                MAX_FIELD_U32,
            ));
        }
        if !fits_u32(descriptor.uncompressed_size()) {
            return Err(Error::too_large(
                "uncompressed size",
                descriptor.uncompressed_size(),
                MAX_FIELD_U32,
            ));
        }

        let header_offset = self.out.pos();
        if !fits_u32(header_offset) {
            return Err(Error::too_large("local header offset", header_offset, MAX_FIELD_U32));
        }

        self.out.write_u32(LOCAL_HEADER_SIG)?;
        self.out.write_u16(descriptor.version_needed())?;
        self.out.write_u16(0)?; // general purpose flags
        self.out.write_u16(descriptor.method())?;
        self.out.write_u16(self.modified.time)?;
        self.out.write_u16(self.modified.date)?;
        self.out.write_u32(descriptor.crc32())?;
        self.out.write_u32(descriptor.compressed_size() as u32)?;
        self.out.write_u32(descriptor.uncompressed_size() as u32)?;
        self.out.write_u16(name_len as u16)?;
        self.out.write_u16(0)?; // extra field length
        self.out.write_bytes(name.as_bytes())?;

        let mut store = descriptor.open_store()?;
        let copied = io::copy(&mut store, &mut self.out)?;
        if copied != descriptor.compressed_size() {
            return Err(Error::Io(io::Error::other(format!(
                "backing store for '{}' yielded {} bytes, expected {}",
                name,
                copied,
                descriptor.compressed_size()
            ))));
        }

        trace!(
            name,
            offset = header_offset,
            compressed = descriptor.compressed_size(),
            "entry written"
        );

        self.central.push(CentralRecord {
            name: descriptor.name().to_string(),
            method: descriptor.method(),
            version_needed: descriptor.version_needed(),
            crc32: descriptor.crc32(),
            compressed_size: descriptor.compressed_size() as u32,
            uncompressed_size: descriptor.uncompressed_size() as u32,
            header_offset: header_offset as u32,
        });

        // Descriptor drops here; its backing store is deleted.
        Ok(())
    }

    /// Write the central directory and end record, flush, and return the
    /// destination sink.
    pub fn finish(mut self) -> Result<W> {
        if !fits_u16(self.comment.len() as u64) {
            return Err(Error::too_large(
                "archive comment length",
                self.comment.len() as u64,
                MAX_FIELD_U16,
            ));
        }

        let cd_offset = self.out.pos();
        if !fits_u32(cd_offset) {
            return Err(Error::too_large("central directory offset", cd_offset, MAX_FIELD_U32));
        }

        for record in &self.central {
            self.out.write_u32(CENTRAL_HEADER_SIG)?;
            self.out.write_u16(VERSION_MADE_BY)?;
            self.out.write_u16(record.version_needed)?;
            self.out.write_u16(0)?; // general purpose flags
            self.out.write_u16(record.method)?;
            self.out.write_u16(self.modified.time)?;
            self.out.write_u16(self.modified.date)?;
            self.out.write_u32(record.crc32)?;
            self.out.write_u32(record.compressed_size)?;
            self.out.write_u32(record.uncompressed_size)?;
            self.out.write_u16(record.name.len() as u16)?;
            self.out.write_u16(0)?; // extra field length
            self.out.write_u16(0)?; // comment length
            self.out.write_u16(0)?; // disk number start
            self.out.write_u16(0)?; // internal attributes
            self.out.write_u32(0)?; // external attributes
            self.out.write_u32(record.header_offset)?;
            self.out.write_bytes(record.name.as_bytes())?;
        }

        let cd_size = self.out.pos() - cd_offset;
        if !fits_u32(cd_size) {
            return Err(Error::too_large("central directory size", cd_size, MAX_FIELD_U32));
        }

        let entries = self.central.len() as u16;
        self.out.write_u32(END_RECORD_SIG)?;
        self.out.write_u16(0)?; // this disk
        self.out.write_u16(0)?; // disk with central directory
        self.out.write_u16(entries)?;
        self.out.write_u16(entries)?;
        self.out.write_u32(cd_size as u32)?;
        self.out.write_u32(cd_offset as u32)?;
        self.out.write_u16(self.comment.len() as u16)?;
        self.out.write_bytes(&self.comment)?;
        self.out.flush()?;

        debug!(
            entries,
            cd_offset,
            cd_size,
            total = self.out.pos(),
            "archive finished"
        );
        Ok(self.out.into_inner())
    }
}
