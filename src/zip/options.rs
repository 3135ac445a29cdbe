//! Packaging run configuration.

use std::path::PathBuf;

use crate::zip::format::{DosDateTime, METHOD_DEFLATE, METHOD_STORE, VERSION_DEFLATE, VERSION_STORE};

/// Per-entry compression selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Uncompressed passthrough (ZIP method 0).
    Store,
    /// Raw DEFLATE at the given effort level, 0-9 (ZIP method 8).
    /// Levels above 9 are clamped to 9.
    Deflate(u32),
}

impl Compression {
    /// The ZIP compression method code for this selection.
    pub fn method(self) -> u16 {
        match self {
            Compression::Store => METHOD_STORE,
            Compression::Deflate(_) => METHOD_DEFLATE,
        }
    }

    /// The "version needed to extract" stamp matching this method.
    pub fn version_needed(self) -> u16 {
        match self {
            Compression::Store => VERSION_STORE,
            Compression::Deflate(_) => VERSION_DEFLATE,
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Deflate(6)
    }
}

/// Configuration for a packaging run.
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Bound on parallel compression tasks. Defaults to available parallelism.
    pub workers: usize,
    /// Compression applied to every part.
    pub compression: Compression,
    /// Directory for backing stores; the system temp directory when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Last-modified stamp written into every header. Defaults to the DOS
    /// epoch so identical inputs produce identical archives.
    pub modified: DosDateTime,
    /// Optional archive comment for the end-of-central-directory record.
    pub comment: Option<String>,
}

impl PackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn modified(mut self, modified: DosDateTime) -> Self {
        self.modified = modified;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            compression: Compression::default(),
            temp_dir: None,
            modified: DosDateTime::default(),
            comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_codes() {
        assert_eq!(Compression::Store.method(), 0);
        assert_eq!(Compression::Deflate(6).method(), 8);
        assert_eq!(Compression::Store.version_needed(), 10);
        assert_eq!(Compression::Deflate(1).version_needed(), 20);
    }

    #[test]
    fn test_workers_floor() {
        let opts = PackOptions::new().workers(0);
        assert_eq!(opts.workers, 1);
    }
}
