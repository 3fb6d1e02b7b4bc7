// the contract every format recognizer follows
use std::ops::Range;

/// A carved artefact: the half-open range `[start, end)` of the original
/// stream that looks like a file of format `ext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Detection {
    pub start: u64,
    pub end: u64,
    pub ext: &'static str,
}

impl Detection {
    pub fn new(start: u64, end: u64, ext: &'static str) -> Self {
        Self { start, end, ext }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    /// Bytes of `source` covered by this detection. Ends computed from header
    /// fields can point past the end of the image, so the slice is clamped.
    pub fn slice<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        let len = source.len() as u64;
        let start = self.start.min(len) as usize;
        let end = self.end.min(len) as usize;
        &source[start..end]
    }
}

pub trait Carver {
    fn process_bytes(&mut self, buffer: &[u8]); // feed the next chunk of the stream
    fn finalize(&mut self); // flush candidates which have no explicit terminator
    fn reset(&mut self); // forget everything, ready for a new stream
    fn detections(&self) -> &[Detection]; // completed detections, in completion order
    fn offset(&self) -> u64; // absolute offset of the next byte to be processed
    fn display_name(&self) -> &'static str; // e.g. "PNG"
    fn ext(&self) -> &'static str; // the file extension of what we're trying to carve
    fn category(&self) -> &'static str; // like images/png, used when saving
}
