// carves files by running one state machine per potential match over every byte
use std::marker::PhantomData;

use log::{debug, trace};

use crate::carver::{Carver, Detection};

use super::{Candidate, FileType, Step};

/// Generic carver: tracks every candidate of file type `T` in flight and
/// collects the completed ones.
pub struct ByteCarver<T: FileType> {
    // potential matches, in spawn order
    active: Vec<T::Candidate>,

    // what we found so far
    completed: Vec<Detection>,

    // absolute offset of the next byte to process
    cursor: u64,

    // set once finalize() ran, so that a second call does nothing
    finalized: bool,

    _type: PhantomData<T>,
}

impl<T: FileType> Default for ByteCarver<T> {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            completed: Vec::new(),
            cursor: 0,
            finalized: false,
            _type: PhantomData,
        }
    }
}

impl<T: FileType> ByteCarver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of candidates still in flight.
    pub fn pending(&self) -> usize {
        self.active.len()
    }

    // a completed candidate only becomes a detection if it's large enough
    fn promote(completed: &mut Vec<Detection>, start: u64, end: u64) {
        let det = Detection::new(start, end, T::EXT);
        if det.is_empty() || det.len() < T::MIN_SIZE {
            trace!(
                "{} candidate {}-{} too small, dropped",
                T::DISPLAY_NAME,
                start,
                end
            );
            return;
        }

        trace!("found {} at {}-{}", T::DISPLAY_NAME, start, end);
        completed.push(det);
    }

    fn process_byte(&mut self, byte: u8) {
        let offset = self.cursor;

        if let Some(candidate) = T::spawn(byte, offset) {
            self.active.push(candidate);
        }

        // one ordered pass: each candidate sees the byte exactly once, and
        // invalid or completed ones are compacted out in the same sweep
        let completed = &mut self.completed;
        self.active
            .retain_mut(|candidate| match candidate.feed(byte, offset) {
                Step::Continue => true,
                Step::Invalid => false,
                Step::Complete(end) => {
                    Self::promote(completed, candidate.start(), end);
                    false
                }
            });

        self.cursor += 1;
    }
}

impl<T: FileType> Carver for ByteCarver<T> {
    fn process_bytes(&mut self, buffer: &[u8]) {
        for &byte in buffer {
            self.process_byte(byte);
        }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let cursor = self.cursor;
        let before = self.completed.len();
        for candidate in self.active.drain(..) {
            if let Some(end) = candidate.finish(cursor) {
                Self::promote(&mut self.completed, candidate.start(), end);
            }
        }

        debug!(
            "{} finalized at offset {}: {} detections ({} at end of stream)",
            T::DISPLAY_NAME,
            cursor,
            self.completed.len(),
            self.completed.len() - before
        );
    }

    fn reset(&mut self) {
        debug!(
            "{} reset with {} candidates remaining",
            T::DISPLAY_NAME,
            self.active.len()
        );
        self.active.clear();
        self.completed.clear();
        self.cursor = 0;
        self.finalized = false;
    }

    fn detections(&self) -> &[Detection] {
        &self.completed
    }

    fn offset(&self) -> u64 {
        self.cursor
    }

    fn display_name(&self) -> &'static str {
        T::DISPLAY_NAME
    }

    fn ext(&self) -> &'static str {
        T::EXT
    }

    fn category(&self) -> &'static str {
        T::CATEGORY
    }
}
