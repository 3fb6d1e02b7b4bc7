use byteorder::{BigEndian, ByteOrder};

use crate::carvers::{byte_carver::ByteCarver, Candidate, FileType, Step};

// always starts with SOI followed by the first segment marker
const MAGIC_START: [u8; 3] = [0xFF, 0xD8, 0xFF];

// second byte of the markers which can legitimately follow SOI or another segment
const VALID_MARKERS: [u8; 27] = [
    0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, // SOF0-3, DHT, SOF5-6
    0xDA, 0xDB, 0xDD, // SOS, DQT, DRI
    0xE0, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, // APP0-7
    0xE8, 0xE9, 0xEA, 0xEB, 0xEC, 0xED, 0xEE, 0xEF, // APP8-15
    0xFE, // COM
];

const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const DRI: u8 = 0xDD;

// a match shorter than the smallest possible JPEG is a false positive
pub const MIN_JPEG_SIZE: u64 = 120;

fn is_restart(marker: u8) -> bool {
    (0xD0..=0xD7).contains(&marker)
}

// payload length of a marker: Some(n) when it's fixed, None when it's given
// by the 2 bytes following the marker
fn marker_length(marker: u8) -> Option<u16> {
    match marker {
        DRI => Some(4),
        0xD8 | EOI => Some(0),
        m if is_restart(m) => Some(0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JpegState {
    // matching FF D8 FF
    Magic(usize),

    // 4th byte: must be one of VALID_MARKERS
    FirstMarker,

    // looking for FF + marker
    FindMarker,

    // reading the 2 bytes of a variable length
    GetLength,

    // skipping a segment payload
    Wait,
}

#[derive(Debug)]
pub struct JpegCandidate {
    start: u64,
    state: JpegState,

    // last byte was a FF while looking for a marker
    pending_ff: bool,

    // high byte of the segment length
    length_hi: Option<u8>,

    // payload bytes left to skip
    remaining: u16,

    // after SOS, entropy-coded data may follow the segment
    expect_entropy: bool,
}

impl JpegCandidate {
    // switch to the state required by the marker just read
    fn enter_segment(&mut self, marker: u8) {
        self.expect_entropy = marker == SOS;

        self.state = match marker_length(marker) {
            Some(0) => JpegState::FindMarker,
            Some(n) => {
                self.remaining = n;
                JpegState::Wait
            }
            None => {
                self.length_hi = None;
                JpegState::GetLength
            }
        };
    }

    fn find_marker(&mut self, byte: u8, offset: u64) -> Step {
        if !self.pending_ff {
            if byte == 0xFF {
                self.pending_ff = true;
            } else if !self.expect_entropy {
                // data where a marker should be
                return Step::Invalid;
            }
            return Step::Continue;
        }

        self.pending_ff = false;

        if byte == EOI {
            return Step::Complete(offset + 1);
        }

        if VALID_MARKERS.contains(&byte) {
            self.enter_segment(byte);
            return Step::Continue;
        }

        // inside entropy-coded data, FF is either stuffed (FF 00) or a restart marker
        if self.expect_entropy && (byte == 0x00 || is_restart(byte)) {
            return Step::Continue;
        }

        Step::Invalid
    }
}

impl Candidate for JpegCandidate {
    fn start(&self) -> u64 {
        self.start
    }

    fn feed(&mut self, byte: u8, offset: u64) -> Step {
        match self.state {
            JpegState::Magic(progress) => {
                if byte != MAGIC_START[progress] {
                    return Step::Invalid;
                }
                self.state = if progress + 1 == MAGIC_START.len() {
                    JpegState::FirstMarker
                } else {
                    JpegState::Magic(progress + 1)
                };
                Step::Continue
            }
            JpegState::FirstMarker => {
                if !VALID_MARKERS.contains(&byte) {
                    return Step::Invalid;
                }
                self.enter_segment(byte);
                Step::Continue
            }
            JpegState::GetLength => match self.length_hi {
                None => {
                    self.length_hi = Some(byte);
                    Step::Continue
                }
                Some(hi) => {
                    // the length includes its own 2 bytes
                    let length = BigEndian::read_u16(&[hi, byte]);
                    if length < 2 {
                        return Step::Invalid;
                    }
                    self.remaining = length - 2;
                    self.state = if self.remaining == 0 {
                        JpegState::FindMarker
                    } else {
                        JpegState::Wait
                    };
                    Step::Continue
                }
            },
            JpegState::Wait => {
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = JpegState::FindMarker;
                }
                Step::Continue
            }
            JpegState::FindMarker => self.find_marker(byte, offset),
        }
    }
}

#[derive(Debug)]
pub struct Jpeg;

impl FileType for Jpeg {
    type Candidate = JpegCandidate;

    const DISPLAY_NAME: &'static str = "JPG";
    const EXT: &'static str = "jpg";
    const CATEGORY: &'static str = "images/jpg";
    const MIN_SIZE: u64 = MIN_JPEG_SIZE;

    fn spawn(byte: u8, start: u64) -> Option<JpegCandidate> {
        (byte == MAGIC_START[0]).then_some(JpegCandidate {
            start,
            state: JpegState::Magic(0),
            pending_ff: false,
            length_hi: None,
            remaining: 0,
            expect_entropy: false,
        })
    }
}

pub type JpegCarver = ByteCarver<Jpeg>;
