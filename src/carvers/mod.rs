// building blocks shared by all the byte-at-a-time carvers
pub mod byte_carver;

/// Outcome of feeding one byte to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    // still looks like the file type, keep feeding
    Continue,

    // not a file of this type, drop the candidate
    Invalid,

    // a complete file was recognized, ending at this absolute offset (excluded)
    Complete(u64),
}

/// One in-progress attempt at recognizing a file starting at `start()`.
pub trait Candidate {
    fn start(&self) -> u64;

    /// Consume the byte found at absolute `offset`.
    fn feed(&mut self, byte: u8, offset: u64) -> Step;

    /// Called when the stream ends before the candidate completed. Returning
    /// `Some(end)` promotes it anyway.
    fn finish(&self, _cursor: u64) -> Option<u64> {
        None
    }
}

/// Static description of a file type carved byte by byte.
pub trait FileType {
    type Candidate: Candidate;

    const DISPLAY_NAME: &'static str;
    const EXT: &'static str;
    const CATEGORY: &'static str;

    // completed matches shorter than this are dropped when promoted
    const MIN_SIZE: u64 = 0;

    /// Spawn a candidate if `byte`, found at `start`, can open a file of this type.
    fn spawn(byte: u8, start: u64) -> Option<Self::Candidate>;
}
