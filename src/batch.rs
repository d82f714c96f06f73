//! Multi-file orchestration: progress reporting, per-file failure isolation,
//! and optional parallel processing.
//!
//! # Ordering
//!
//! Outcomes are always returned in input order.  With the `parallel` feature
//! files are processed concurrently on Rayon's global pool, so the progress
//! callback may observe completions in any order; the `done` count it
//! receives is still monotonic.
//!
//! # Cancellation
//!
//! Key derivation is never interrupted.  A [`CancelFlag`] is checked before
//! each file starts; files not yet started when it is raised come back as
//! [`BatchError::Cancelled`].  [`Batch::halt_on_error`] stops the current
//! run after its first failed file; that halt is scoped to the run and never
//! touches the caller's flag, so the next run starts clean.
//!
//! # Output names
//!
//! Suggested names are made unique within the batch (` (1)`, ` (2)`, …) in
//! input order, so the mapping from input to output name is deterministic.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metadata::FileMetadata;
use crate::naming;
use crate::processor::{self, ProcessError, ProcessorOptions};

/// Shared flag that stops a batch from starting further files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

/// One input file.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub name:         String,
    /// MIME type of the original; ignored when decrypting.
    pub content_type: String,
    pub content:      Vec<u8>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self { name: name.into(), content_type: content_type.into(), content }
    }
}

/// Successful output of one file.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub name:     String,
    pub bytes:    Vec<u8>,
    /// Recovered metadata; `None` for encryption.
    pub metadata: Option<FileMetadata>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("Cancelled before processing started")]
    Cancelled,
}

#[derive(Debug)]
pub struct BatchOutcome {
    /// Input name.
    pub name:   String,
    pub result: Result<BatchOutput, BatchError>,
}

/// Success/failure counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed:    usize,
    pub cancelled: usize,
}

impl From<&[BatchOutcome]> for BatchSummary {
    fn from(outcomes: &[BatchOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut s, o| {
            match &o.result {
                Ok(_)                        => s.succeeded += 1,
                Err(BatchError::Cancelled)   => s.cancelled += 1,
                Err(BatchError::Process(_))  => s.failed += 1,
            }
            s
        })
    }
}

type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

pub struct Batch {
    opts:          ProcessorOptions,
    progress:      Option<Box<ProgressFn>>,
    cancel:        CancelFlag,
    halt_on_error: bool,
}

impl Batch {
    pub fn new(opts: ProcessorOptions) -> Self {
        Self { opts, progress: None, cancel: CancelFlag::new(), halt_on_error: false }
    }

    /// Stop starting new files once one has failed.
    pub fn halt_on_error(mut self, halt: bool) -> Self {
        self.halt_on_error = halt;
        self
    }

    /// Called as `(done, total)` after each file finishes.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn encrypt(&self, password: &str, items: &[BatchItem]) -> Vec<BatchOutcome> {
        self.run(password, items, Direction::Encrypt)
    }

    pub fn decrypt(&self, password: &str, items: &[BatchItem]) -> Vec<BatchOutcome> {
        self.run(password, items, Direction::Decrypt)
    }

    fn run(&self, password: &str, items: &[BatchItem], dir: Direction) -> Vec<BatchOutcome> {
        let total = items.len();
        let done = AtomicUsize::new(0);
        let halted = AtomicBool::new(false);
        info!(files = total, "batch started");

        let process = |item: &BatchItem| -> BatchOutcome {
            let result = if self.cancel.is_cancelled() || halted.load(Ordering::SeqCst) {
                Err(BatchError::Cancelled)
            } else {
                self.process_one(password, item, dir).map_err(BatchError::from)
            };
            if let Err(BatchError::Process(ref e)) = result {
                warn!(file = %item.name, error = %e, "file failed");
                if self.halt_on_error {
                    halted.store(true, Ordering::SeqCst);
                }
            }
            let n = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(cb) = &self.progress {
                cb(n, total);
            }
            BatchOutcome { name: item.name.clone(), result }
        };

        #[cfg(feature = "parallel")]
        let mut outcomes: Vec<BatchOutcome> = {
            use rayon::prelude::*;
            items.par_iter().map(process).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let mut outcomes: Vec<BatchOutcome> = items.iter().map(process).collect();

        dedupe_names(&mut outcomes);
        let summary = BatchSummary::from(outcomes.as_slice());
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
        outcomes
    }

    fn process_one(
        &self,
        password: &str,
        item:     &BatchItem,
        dir:      Direction,
    ) -> Result<BatchOutput, ProcessError> {
        debug!(file = %item.name, bytes = item.content.len(), "processing");
        match dir {
            Direction::Encrypt => {
                let out = processor::encrypt_file_with(
                    password, &item.content, &item.name, &item.content_type, &self.opts,
                )?;
                Ok(BatchOutput { name: out.suggested_name, bytes: out.envelope, metadata: None })
            }
            Direction::Decrypt => {
                let out = processor::decrypt_file_with(password, &item.content, &item.name, &self.opts)?;
                Ok(BatchOutput {
                    name:     out.suggested_name,
                    bytes:    out.content,
                    metadata: Some(out.metadata),
                })
            }
        }
    }
}

fn dedupe_names(outcomes: &mut [BatchOutcome]) {
    let mut taken = HashSet::new();
    for out in outcomes.iter_mut().filter_map(|o| o.result.as_mut().ok()) {
        let unique = naming::disambiguate(&out.name, &taken);
        taken.insert(unique.clone());
        out.name = unique;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_ITERATIONS;
    use std::sync::Mutex;

    fn fast() -> ProcessorOptions {
        ProcessorOptions { iterations: MIN_ITERATIONS, ..Default::default() }
    }

    #[test]
    fn one_failure_does_not_affect_siblings() {
        let items = vec![
            BatchItem::new("a.txt", "text/plain", b"alpha".to_vec()),
            BatchItem::new("empty.bin", "", Vec::new()),
            BatchItem::new("c.txt", "text/plain", b"gamma".to_vec()),
        ];
        let outcomes = Batch::new(fast()).encrypt("pw", &items);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(
            outcomes[1].result.as_ref().unwrap_err(),
            &BatchError::Process(ProcessError::EmptyContent)
        );
        assert!(outcomes[2].result.is_ok());
        assert_eq!(
            BatchSummary::from(outcomes.as_slice()),
            BatchSummary { succeeded: 2, failed: 1, cancelled: 0 }
        );
    }

    #[test]
    fn encrypt_then_decrypt_batch() {
        let items = vec![
            BatchItem::new("a.txt", "text/plain", b"alpha".to_vec()),
            BatchItem::new("b.pdf", "application/pdf", b"%PDF".to_vec()),
        ];
        let batch = Batch::new(fast());
        let sealed: Vec<BatchItem> = batch
            .encrypt("pw", &items)
            .into_iter()
            .map(|o| {
                let out = o.result.unwrap();
                BatchItem::new(out.name, "", out.bytes)
            })
            .collect();
        assert_eq!(sealed[0].name, "a.txt.enc");
        assert_eq!(sealed[1].name, "b.pdf.enc");

        let opened = batch.decrypt("pw", &sealed);
        let b = opened[1].result.as_ref().unwrap();
        assert_eq!(b.name, "b.pdf");
        assert_eq!(b.bytes, b"%PDF");
        assert_eq!(b.metadata.as_ref().unwrap().content_type, "application/pdf");
    }

    #[test]
    fn duplicate_names_are_disambiguated_in_order() {
        let items = vec![
            BatchItem::new("x.txt", "", b"1".to_vec()),
            BatchItem::new("x.txt", "", b"2".to_vec()),
            BatchItem::new("x.txt", "", b"3".to_vec()),
        ];
        let names: Vec<String> = Batch::new(fast())
            .encrypt("pw", &items)
            .into_iter()
            .map(|o| o.result.unwrap().name)
            .collect();
        assert_eq!(names, ["x.txt.enc", "x.txt (1).enc", "x.txt (2).enc"]);
    }

    #[test]
    fn progress_reaches_total() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let items = vec![
            BatchItem::new("a", "", b"a".to_vec()),
            BatchItem::new("b", "", b"b".to_vec()),
        ];
        Batch::new(fast())
            .on_progress(move |done, total| sink.lock().unwrap().push((done, total)))
            .encrypt("pw", &items);
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn halt_on_error_skips_the_rest() {
        let items = vec![
            BatchItem::new("a", "", b"a".to_vec()),
            BatchItem::new("b", "", Vec::new()),
            BatchItem::new("c", "", b"c".to_vec()),
        ];
        let outcomes = Batch::new(fast()).halt_on_error(true).encrypt("pw", &items);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(BatchError::Process(ProcessError::EmptyContent))));
        assert_eq!(outcomes[2].result.as_ref().unwrap_err(), &BatchError::Cancelled);
    }

    #[test]
    fn halt_does_not_carry_into_the_next_run() {
        let flag = CancelFlag::new();
        let batch = Batch::new(fast()).halt_on_error(true).with_cancel(flag.clone());

        let first = batch.encrypt("pw", &[BatchItem::new("empty.bin", "", Vec::new())]);
        assert!(matches!(first[0].result, Err(BatchError::Process(ProcessError::EmptyContent))));
        assert!(!flag.is_cancelled());

        let second = batch.encrypt("pw", &[BatchItem::new("a.txt", "text/plain", b"alpha".to_vec())]);
        assert_eq!(second[0].result.as_ref().unwrap().name, "a.txt.enc");
    }

    #[test]
    fn cancelled_batch_starts_nothing() {
        let flag = CancelFlag::new();
        flag.cancel();
        let items = vec![BatchItem::new("a", "", b"a".to_vec())];
        let outcomes = Batch::new(fast()).with_cancel(flag).encrypt("pw", &items);
        assert_eq!(outcomes[0].result.as_ref().unwrap_err(), &BatchError::Cancelled);
    }
}
