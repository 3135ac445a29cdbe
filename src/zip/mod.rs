//! Parallel ZIP container packaging.
//!
//! Parts are compressed concurrently into temp-file backing stores, then
//! assembled sequentially into the PKZIP layout:
//!
//! ```text
//! +--------------------------+
//! | Local header  PK\x03\x04 |  30 bytes + name, per entry
//! | compressed entry bytes   |
//! +--------------------------+
//! | ...                      |
//! +--------------------------+
//! | Central dir   PK\x01\x02 |  46 bytes + name, per entry
//! +--------------------------+
//! | End record    PK\x05\x06 |  22 bytes + comment
//! +--------------------------+
//! ```
//!
//! All multi-byte fields are little-endian. Entries appear in exactly the
//! order they were submitted, independent of compression completion order.

pub mod format;

mod assembler;
mod entry;
mod options;
mod scheduler;
mod stream;

pub use assembler::ArchiveAssembler;
pub use entry::{EntryDescriptor, EntrySink};
pub use options::{Compression, PackOptions};
pub use scheduler::{Part, Scheduler};
pub use stream::CountingWriter;

use std::io::Write;

use crate::util::Result;

/// Compress all parts concurrently and assemble them into `dest`.
///
/// The one-call packaging pipeline: validate names, fan the parts out over
/// the worker pool, then write the container in submission order. Returns
/// the destination sink after the end record has been flushed. On any
/// failure every backing store created for the run has been deleted by the
/// time the error returns, and no output claiming completeness was produced.
pub fn pack<W: Write>(parts: Vec<Part>, dest: W, options: &PackOptions) -> Result<W> {
    let descriptors = Scheduler::new(options).run(parts)?;
    let mut assembler = ArchiveAssembler::new(dest, options);
    for descriptor in descriptors {
        assembler.append(descriptor)?;
    }
    assembler.finish()
}
