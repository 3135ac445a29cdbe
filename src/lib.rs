//! # opcpack
//!
//! Parallel ZIP packaging engine for OPC/OOXML containers.
//!
//! Spreadsheet documents are ZIP archives of XML parts. Producing those
//! parts is cheap; DEFLATE-compressing them is not. This crate compresses
//! many parts concurrently, each into its own temp-file backing store with
//! running CRC-32 and size accounting, then assembles a byte-exact ZIP
//! container sequentially so every recorded offset matches its true file
//! position.
//!
//! ## Modules
//!
//! - [`util`] - Error handling
//! - [`zip`] - Sinks, scheduler, assembler, container format
//!
//! ## Example
//!
//! ```no_run
//! use opcpack::{pack, PackOptions, Part};
//!
//! fn main() -> opcpack::Result<()> {
//!     let parts = vec![
//!         Part::from_bytes("xl/workbook.xml", "<workbook/>"),
//!         Part::from_bytes("xl/worksheets/sheet1.xml", "<worksheet/>"),
//!     ];
//!
//!     let file = std::fs::File::create("book.xlsx")?;
//!     pack(parts, file, &PackOptions::new().workers(4))?;
//!     Ok(())
//! }
//! ```

pub mod util;
pub mod zip;

pub use util::{Error, Result};
pub use zip::{
    pack, ArchiveAssembler, Compression, EntryDescriptor, EntrySink, PackOptions, Part, Scheduler,
};
