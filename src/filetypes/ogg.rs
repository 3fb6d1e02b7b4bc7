// Ogg carving: the first page must be a beginning-of-stream page, the file
// ends with the end-of-stream page whose size is given by its segment table.
use hex_literal::hex;

use crate::carvers::{byte_carver::ByteCarver, Candidate, FileType, Step};

// "OggS" capture pattern, version 0, header type BOS
const MAGIC_BOS: [u8; 6] = hex!("4F 67 67 53 00 02");

// "OggS" capture pattern, version 0; the header type follows
const MAGIC_PAGE: [u8; 5] = hex!("4F 67 67 53 00");

// EOS is a flag, it can be combined with continuation and BOS
const EOS_FLAG: u8 = 0x04;

// granule position, serial number, sequence number and CRC lie between the
// header type and the number of segments
const SEGMENT_COUNT_SKIP: u64 = 20;

fn is_eos(header_type: u8) -> bool {
    (EOS_FLAG..=EOS_FLAG | 0x03).contains(&header_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OggState {
    // matching the BOS page magic
    Start,

    // looking for the EOS page magic
    End,

    // reading the number of segments of the EOS page
    SegmentCount,

    // summing the segment table
    SegmentTable,
}

#[derive(Debug)]
pub struct OggCandidate {
    start: u64,
    state: OggState,
    progress: usize,
    skip: u64,

    // segment table entries left to read
    segments: u8,

    // sum of the segment sizes read so far
    payload: u64,
}

impl OggCandidate {
    fn end_magic(&mut self, byte: u8) {
        let matched = match MAGIC_PAGE.get(self.progress) {
            Some(expected) => byte == *expected,
            None => is_eos(byte),
        };

        if !matched {
            self.progress = 0;
            return;
        }

        self.progress += 1;
        if self.progress > MAGIC_PAGE.len() {
            self.skip = SEGMENT_COUNT_SKIP;
            self.state = OggState::SegmentCount;
        }
    }
}

impl Candidate for OggCandidate {
    fn start(&self) -> u64 {
        self.start
    }

    fn feed(&mut self, byte: u8, offset: u64) -> Step {
        if self.skip > 0 {
            self.skip -= 1;
            return Step::Continue;
        }

        match self.state {
            OggState::Start => {
                if byte != MAGIC_BOS[self.progress] {
                    return Step::Invalid;
                }
                self.progress += 1;
                if self.progress == MAGIC_BOS.len() {
                    self.progress = 0;
                    self.state = OggState::End;
                }
            }
            OggState::End => self.end_magic(byte),
            OggState::SegmentCount => {
                // an empty segment table ends the page right here
                if byte == 0 {
                    return Step::Complete(offset + 1);
                }
                self.segments = byte;
                self.state = OggState::SegmentTable;
            }
            OggState::SegmentTable => {
                self.payload += byte as u64;
                self.segments -= 1;
                if self.segments == 0 {
                    return Step::Complete(offset + 1 + self.payload);
                }
            }
        }

        Step::Continue
    }
}

#[derive(Debug)]
pub struct Ogg;

impl FileType for Ogg {
    type Candidate = OggCandidate;

    const DISPLAY_NAME: &'static str = "Ogg";
    const EXT: &'static str = "ogg";
    const CATEGORY: &'static str = "audio/ogg";

    fn spawn(byte: u8, start: u64) -> Option<OggCandidate> {
        (byte == MAGIC_BOS[0]).then_some(OggCandidate {
            start,
            state: OggState::Start,
            progress: 0,
            skip: 0,
            segments: 0,
            payload: 0,
        })
    }
}

pub type OggCarver = ByteCarver<Ogg>;
