//! Position-tracking output stream for container assembly.
//!
//! Every ZIP local header records the byte offset it was written at; the
//! central directory repeats those offsets. A one-byte drift between the
//! claimed and actual position corrupts the archive for every reader, so all
//! assembly writes go through this wrapper and its single byte cursor.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::util::Result;

/// Output stream that counts every byte written to the destination.
pub struct CountingWriter<W: Write> {
    inner: W,
    pos: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wrap a destination sink, starting the cursor at zero.
    pub fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    /// Current write position, i.e. total bytes written so far.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance the cursor.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Flush the destination.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Unwrap the destination sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

// `io::copy` streams compressed payloads out of the backing stores; the Write
// impl keeps the cursor honest for those bulk copies too.
impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
