//! Bounded concurrent dispatch of part compression.
//!
//! Parts are fanned out over a worker pool of at most `workers` threads and
//! collected back in submission order through one result slot per submission
//! index. Each slot is written by exactly one worker, so the hot path never
//! contends; completion order is free to differ from submission order.
//!
//! On the first failure the scheduler stops dispatching queued parts via a
//! cancel flag, lets in-flight compressions wind down, and returns the
//! triggering error. Backing stores of finished or abandoned parts are
//! deleted when their sinks and descriptors drop.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::util::{Error, Result};
use crate::zip::entry::{EntryDescriptor, EntrySink};
use crate::zip::options::{Compression, PackOptions};

/// One named part awaiting compression.
///
/// The producer is invoked exactly once, on a worker thread, with the part's
/// sink; it must emit the part's full uncompressed content before returning.
pub struct Part {
    name: String,
    producer: Box<dyn FnOnce(&mut EntrySink) -> io::Result<()> + Send>,
}

impl Part {
    pub fn new(
        name: impl Into<String>,
        producer: impl FnOnce(&mut EntrySink) -> io::Result<()> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            producer: Box::new(producer),
        }
    }

    /// Part whose content is already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self::new(name, move |sink| io::Write::write_all(sink, &bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Bounded concurrent dispatcher for part compression.
pub struct Scheduler {
    workers: usize,
    compression: Compression,
    temp_dir: PathBuf,
}

impl Scheduler {
    pub fn new(options: &PackOptions) -> Self {
        Self {
            workers: options.workers.max(1),
            compression: options.compression,
            temp_dir: options
                .temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Compress all parts and return their descriptors in submission order.
    ///
    /// Name uniqueness is validated up front, before any compression work
    /// starts. On failure every backing store created so far is deleted
    /// before the error returns.
    pub fn run(&self, parts: Vec<Part>) -> Result<Vec<EntryDescriptor>> {
        validate_names(&parts)?;

        let count = parts.len();
        debug!(count, workers = self.workers, "scheduling part compression");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| Error::Io(io::Error::other(e)))?;

        // One slot per submission index; each is written by a single worker.
        let slots: Vec<Mutex<Option<EntryDescriptor>>> =
            (0..count).map(|_| Mutex::new(None)).collect();
        let cancel = AtomicBool::new(false);
        let first_error: Mutex<Option<Error>> = Mutex::new(None);

        pool.scope(|scope| {
            for (index, part) in parts.into_iter().enumerate() {
                let slots = &slots;
                let cancel = &cancel;
                let first_error = &first_error;
                scope.spawn(move |_| {
                    if cancel.load(Ordering::Acquire) {
                        trace!(index, name = part.name(), "part abandoned after sibling failure");
                        return;
                    }
                    match self.run_part(part) {
                        Ok(descriptor) => {
                            trace!(
                                index,
                                name = descriptor.name(),
                                compressed = descriptor.compressed_size(),
                                "part compressed"
                            );
                            *slots[index].lock() = Some(descriptor);
                        }
                        Err(e) => {
                            debug!(index, error = %e, "part failed, cancelling run");
                            cancel.store(true, Ordering::Release);
                            let mut guard = first_error.lock();
                            if guard.is_none() {
                                *guard = Some(e);
                            }
                        }
                    }
                });
            }
        });

        if let Some(e) = first_error.into_inner() {
            // Dropping the slots here deletes every backing store already
            // created for this run.
            return Err(e);
        }

        let mut descriptors = Vec::with_capacity(count);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot.into_inner() {
                Some(descriptor) => descriptors.push(descriptor),
                None => {
                    return Err(Error::invalid(format!(
                        "part #{index} never completed"
                    )))
                }
            }
        }
        Ok(descriptors)
    }

    fn run_part(&self, part: Part) -> Result<EntryDescriptor> {
        let Part { name, producer } = part;
        let mut sink = EntrySink::new(name.clone(), self.compression, &self.temp_dir)?;
        if let Err(source) = producer(&mut sink) {
            // Engine errors travel through the sink's `io::Write` impl
            // wrapped in `io::Error`. Unwrap them so a temp-store write
            // failure stays `Io` (or `InvalidState`) instead of being
            // blamed on the producer.
            return Err(match source.downcast::<Error>() {
                Ok(engine) => engine,
                Err(source) => Error::Producer { name, source },
            });
        }
        sink.close()?;
        sink.into_descriptor()
    }
}

fn validate_names(parts: &[Part]) -> Result<()> {
    let mut seen = HashSet::with_capacity(parts.len());
    for part in parts {
        if part.name.is_empty() {
            return Err(Error::invalid("entry name must not be empty"));
        }
        if !seen.insert(part.name.as_str()) {
            return Err(Error::invalid(format!(
                "duplicate entry name '{}'",
                part.name
            )));
        }
    }
    Ok(())
}
