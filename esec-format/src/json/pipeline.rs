//! Ordered assembly of literal and pending byte segments.
//!
//! The JSON walker copies untouched text into the pipeline as literals and
//! hands every transformed string to a blocking worker, appending the
//! worker's handle as a pending segment. [`Pipeline::flush`] then awaits the
//! pending segments in append order, so the output is deterministic no
//! matter which worker finishes first.

use crate::error::{FormatError, FormatResult};
use tokio::task::JoinHandle;

enum Segment {
    Literal(Vec<u8>),
    Pending(JoinHandle<FormatResult<Vec<u8>>>),
}

/// Append-ordered byte assembler.
#[derive(Default)]
pub struct Pipeline {
    segments: Vec<Segment>,
    pending: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes copied verbatim into the output.
    pub fn append_literal(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.extend_from_slice(bytes);
        } else {
            self.segments.push(Segment::Literal(bytes.to_vec()));
        }
    }

    /// Appends the eventual result of an already running task.
    pub fn append_pending(&mut self, handle: JoinHandle<FormatResult<Vec<u8>>>) {
        self.pending += 1;
        self.segments.push(Segment::Pending(handle));
    }

    /// Runs `work` on the blocking pool and appends its result.
    pub fn append_task<F>(&mut self, work: F)
    where
        F: FnOnce() -> FormatResult<Vec<u8>> + Send + 'static,
    {
        self.append_pending(tokio::task::spawn_blocking(work));
    }

    /// Number of pending segments appended so far.
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Waits for every pending segment and concatenates all segments in
    /// append order.
    ///
    /// The first failing segment (in append order) aborts the flush and its
    /// error is returned; partial output is discarded.
    pub async fn flush(self) -> FormatResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut segments = self.segments.into_iter();
        while let Some(segment) = segments.next() {
            let result = match segment {
                Segment::Literal(bytes) => Ok(bytes),
                Segment::Pending(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(FormatError::Worker(e.to_string())),
                },
            };
            match result {
                Ok(bytes) => out.extend_from_slice(&bytes),
                Err(e) => {
                    for rest in segments {
                        if let Segment::Pending(handle) = rest {
                            handle.abort();
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(out)
    }
}
