use hex_literal::hex;

use crate::carvers::{byte_carver::ByteCarver, Candidate, FileType, Step};

// PNG signature followed by the IHDR chunk header: IHDR must be the first chunk
// and its data is always 13 bytes long, so its length field is fixed too
pub const MAGIC_START: [u8; 16] = hex!("89 50 4E 47 0D 0A 1A 0A 00 00 00 0D 49 48 44 52");

// IEND chunk: zero length, "IEND", and the CRC of "IEND" which never changes
pub const MAGIC_END: [u8; 12] = hex!("00 00 00 00 49 45 4E 44 AE 42 60 82");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PngState {
    ScanningStart,
    ScanningEnd,
}

#[derive(Debug)]
pub struct PngCandidate {
    start: u64,
    state: PngState,
    progress: usize, // number of magic bytes matched so far
}

impl Candidate for PngCandidate {
    fn start(&self) -> u64 {
        self.start
    }

    fn feed(&mut self, byte: u8, offset: u64) -> Step {
        match self.state {
            PngState::ScanningStart => {
                if byte != MAGIC_START[self.progress] {
                    return Step::Invalid;
                }
                self.progress += 1;
                if self.progress == MAGIC_START.len() {
                    self.progress = 0;
                    self.state = PngState::ScanningEnd;
                }
                Step::Continue
            }
            PngState::ScanningEnd => {
                // chunks can hold anything, so a mismatch only restarts the search.
                // The mismatching byte itself is not tried as a new first byte.
                if byte == MAGIC_END[self.progress] {
                    self.progress += 1;
                } else {
                    self.progress = 0;
                }

                if self.progress == MAGIC_END.len() {
                    Step::Complete(offset + 1)
                } else {
                    Step::Continue
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct Png;

impl FileType for Png {
    type Candidate = PngCandidate;

    const DISPLAY_NAME: &'static str = "PNG";
    const EXT: &'static str = "png";
    const CATEGORY: &'static str = "images/png";

    fn spawn(byte: u8, start: u64) -> Option<PngCandidate> {
        (byte == MAGIC_START[0]).then_some(PngCandidate {
            start,
            state: PngState::ScanningStart,
            progress: 0,
        })
    }
}

pub type PngCarver = ByteCarver<Png>;
