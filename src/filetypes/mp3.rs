// MP3 carving: optional ID3v2 tag, a run of MPEG audio frames, optional ID3v1 tag.
//
// ID3v2: http://id3lib.sourceforge.net/id3/id3v2com-00.html
// frame header: http://www.mpgedit.org/mpgedit/mpeg_format/mpeghdr.htm
use crate::carvers::{byte_carver::ByteCarver, Candidate, FileType, Step};

const ID3V2: [u8; 3] = *b"ID3";
const ID3V1: [u8; 3] = *b"TAG";

// ID3v1 is a fixed size trailer
const ID3V1_SIZE: u64 = 128;

// version and layer bits of the frame header
const MPEG1: u8 = 0b11;
const MPEG2: u8 = 0b10;
const LAYER1: u8 = 0b11;
const LAYER2: u8 = 0b10;
const LAYER3: u8 = 0b01;

// bitrates in kbps, 0 marks the "free" and "bad" indexes
const BITRATES_V1_L1: [u16; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
];
const BITRATES_V1_L2: [u16; 16] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0,
];
const BITRATES_V1_L3: [u16; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];
const BITRATES_V2_L1: [u16; 16] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0,
];
const BITRATES_V2_L2_L3: [u16; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
];

// sampling rates in Hz, index 3 is reserved
const SAMPLING_RATES_V1: [u32; 3] = [44100, 48000, 32000];
const SAMPLING_RATES_V2: [u32; 3] = [22050, 24000, 16000];

/// Bitrate in bps, None for the free/bad indexes or an invalid version/layer.
pub fn bitrate(version: u8, layer: u8, index: u8) -> Option<u32> {
    let table = match (version, layer) {
        (MPEG1, LAYER1) => &BITRATES_V1_L1,
        (MPEG1, LAYER2) => &BITRATES_V1_L2,
        (MPEG1, LAYER3) => &BITRATES_V1_L3,
        (MPEG2, LAYER1) => &BITRATES_V2_L1,
        (MPEG2, LAYER2 | LAYER3) => &BITRATES_V2_L2_L3,
        _ => return None,
    };

    match table.get(index as usize)? {
        0 => None,
        kbps => Some(*kbps as u32 * 1000),
    }
}

/// Sampling rate in Hz. MPEG 2.5 is not supported.
pub fn sampling_rate(version: u8, index: u8) -> Option<u32> {
    let table = match version {
        MPEG1 => &SAMPLING_RATES_V1,
        MPEG2 => &SAMPLING_RATES_V2,
        _ => return None,
    };
    table.get(index as usize).copied()
}

/// Decode the 28-bit synch-safe integer of an ID3v2 size field. None if a
/// byte has its high bit set.
pub fn synchsafe(bytes: &[u8; 4]) -> Option<u32> {
    if bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    Some(bytes.iter().fold(0u32, |acc, &b| (acc << 7) | b as u32))
}

/// The fields of an MPEG audio frame header needed to compute the frame length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub layer: u8,
    pub bitrate: u32,
    pub sampling_rate: u32,
    pub padding: bool,
}

impl FrameHeader {
    /// Checks are made in this order: sync, version, layer, bitrate, sampling rate.
    pub fn parse(bytes: &[u8; 4]) -> Option<Self> {
        // 11 bits of frame sync
        if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        // 01 is reserved and 00 is the unofficial MPEG 2.5
        let version = (bytes[1] >> 3) & 0b11;
        if version != MPEG1 && version != MPEG2 {
            return None;
        }

        let layer = (bytes[1] >> 1) & 0b11;
        if layer == 0b00 {
            return None;
        }

        let bitrate = bitrate(version, layer, bytes[2] >> 4)?;
        let sampling_rate = sampling_rate(version, (bytes[2] >> 2) & 0b11)?;
        let padding = bytes[2] & 0b10 != 0;

        Some(Self {
            version,
            layer,
            bitrate,
            sampling_rate,
            padding,
        })
    }

    /// Frame length in bytes, header included.
    pub fn frame_length(&self) -> u64 {
        let bitrate = self.bitrate as u64;
        let rate = self.sampling_rate as u64;
        let padding = self.padding as u64;

        if self.layer == LAYER1 {
            (12 * bitrate / rate + 4 * padding) * 4
        } else {
            144 * bitrate / rate + padding
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mp3State {
    // verifying the ID3v2 tag header
    Id3v2,

    // reading frame headers until one is invalid
    Frame,

    // looking for an ID3v1 tag right after the last frame
    Id3v1,
}

#[derive(Debug)]
pub struct Mp3Candidate {
    start: u64,
    state: Mp3State,
    progress: usize,

    // bytes to skip before looking at the data again
    skip: u64,

    // ID3v2 size field
    tag_size: [u8; 4],

    // frame header being read
    header: [u8; 4],

    // at least one valid frame was seen: an invalid header now means the end
    // of the file instead of a false positive
    potentially_valid: bool,
}

impl Mp3Candidate {
    fn new(start: u64, state: Mp3State) -> Self {
        Self {
            start,
            state,
            progress: 0,
            skip: 0,
            tag_size: [0; 4],
            header: [0; 4],
            potentially_valid: false,
        }
    }

    fn id3v2(&mut self, byte: u8) -> Step {
        let progress = self.progress;
        self.progress += 1;

        match progress {
            0..=2 if byte != ID3V2[progress] => Step::Invalid,
            // magic, then version and flags which are not checked
            0..=5 => Step::Continue,
            _ => {
                self.tag_size[progress - 6] = byte;
                if progress < 9 {
                    return Step::Continue;
                }

                match synchsafe(&self.tag_size) {
                    Some(size) => {
                        self.skip = size as u64;
                        self.progress = 0;
                        self.state = Mp3State::Frame;
                        Step::Continue
                    }
                    None => Step::Invalid,
                }
            }
        }
    }

    fn frame(&mut self, byte: u8) -> Step {
        self.header[self.progress] = byte;
        self.progress += 1;
        if self.progress < self.header.len() {
            return Step::Continue;
        }
        self.progress = 0;

        let skip = FrameHeader::parse(&self.header)
            .and_then(|header| header.frame_length().checked_sub(self.header.len() as u64));

        match skip {
            Some(skip) => {
                self.skip = skip;
                self.potentially_valid = true;
                Step::Continue
            }
            // we ran out of frames
            None if self.potentially_valid => {
                self.state = Mp3State::Id3v1;
                Step::Continue
            }
            None => Step::Invalid,
        }
    }

    // the 4 bytes which failed as a frame header are already buffered, so
    // this is called on the byte right after them
    fn id3v1(&self, offset: u64) -> Step {
        if self.header[..3] == ID3V1 {
            // the tag started with the buffered header
            Step::Complete(offset + ID3V1_SIZE - self.header.len() as u64)
        } else {
            // the byte just read isn't part of the file
            Step::Complete(offset)
        }
    }
}

impl Candidate for Mp3Candidate {
    fn start(&self) -> u64 {
        self.start
    }

    fn feed(&mut self, byte: u8, offset: u64) -> Step {
        if self.skip > 0 {
            self.skip -= 1;
            return Step::Continue;
        }

        match self.state {
            Mp3State::Id3v2 => self.id3v2(byte),
            Mp3State::Frame => self.frame(byte),
            Mp3State::Id3v1 => self.id3v1(offset),
        }
    }

    // the last frame may end exactly with the stream
    fn finish(&self, cursor: u64) -> Option<u64> {
        self.potentially_valid.then_some(cursor)
    }
}

#[derive(Debug)]
pub struct Mp3;

impl FileType for Mp3 {
    type Candidate = Mp3Candidate;

    const DISPLAY_NAME: &'static str = "MP3";
    const EXT: &'static str = "mp3";
    const CATEGORY: &'static str = "audio/mp3";

    // either an ID3v2 tag or directly the first frame
    fn spawn(byte: u8, start: u64) -> Option<Mp3Candidate> {
        match byte {
            b'I' => Some(Mp3Candidate::new(start, Mp3State::Id3v2)),
            0xFF => Some(Mp3Candidate::new(start, Mp3State::Frame)),
            _ => None,
        }
    }
}

pub type Mp3Carver = ByteCarver<Mp3>;

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::carver::Carver;

    // MPEG1 layer III, 128 kbps, 44.1 kHz, no padding: 417 bytes
    const HEADER: [u8; 4] = hex!("FF FB 90 00");
    const FRAME_LEN: usize = 417;

    fn frame() -> Vec<u8> {
        let mut data = HEADER.to_vec();
        data.resize(FRAME_LEN, 0x00);
        data
    }

    fn carve(data: &[u8]) -> (Vec<(u64, u64)>, Vec<(u64, u64)>) {
        let mut carver = Mp3Carver::new();
        carver.process_bytes(data);
        let before = ranges(&carver);
        carver.finalize();
        (before, ranges(&carver))
    }

    fn ranges(carver: &Mp3Carver) -> Vec<(u64, u64)> {
        carver
            .detections()
            .iter()
            .map(|d| (d.start, d.end))
            .collect()
    }

    #[test]
    fn header_fields() {
        let h = FrameHeader::parse(&HEADER).unwrap();
        assert_eq!(h.version, MPEG1);
        assert_eq!(h.layer, LAYER3);
        assert_eq!(h.bitrate, 128_000);
        assert_eq!(h.sampling_rate, 44_100);
        assert!(!h.padding);
        assert_eq!(h.frame_length(), 417);

        let h = FrameHeader::parse(&hex!("FF FB 92 00")).unwrap();
        assert_eq!(h.frame_length(), 418);

        // MPEG2 layer III 64 kbps 22.05 kHz
        let h = FrameHeader::parse(&hex!("FF F3 80 00")).unwrap();
        assert_eq!(h.version, MPEG2);
        assert_eq!(h.frame_length(), 417);

        // MPEG1 layer I 8 kbps 44.1 kHz, then with padding
        let h = FrameHeader::parse(&hex!("FF FF 10 00")).unwrap();
        assert_eq!(h.layer, LAYER1);
        assert_eq!(h.bitrate, 8_000);
        assert_eq!(h.frame_length(), 8);
        let h = FrameHeader::parse(&hex!("FF FF 12 00")).unwrap();
        assert_eq!(h.frame_length(), 24);
    }

    #[test]
    fn layer1_frames() {
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend_from_slice(&hex!("FF FF 10 00 00 00 00 00"));
        }
        data.extend_from_slice(b"abcdefgh");

        // every frame also opens its own candidate
        let (before, after) = carve(&data);
        assert_eq!(before, vec![(0, 28), (8, 28), (16, 28)]);
        assert_eq!(before, after);
    }

    #[test]
    fn invalid_headers() {
        assert!(FrameHeader::parse(&hex!("FE FB 90 00")).is_none()); // sync
        assert!(FrameHeader::parse(&hex!("FF 1B 90 00")).is_none()); // sync
        assert!(FrameHeader::parse(&hex!("FF EB 90 00")).is_none()); // reserved version
        assert!(FrameHeader::parse(&hex!("FF E3 90 00")).is_none()); // MPEG 2.5
        assert!(FrameHeader::parse(&hex!("FF F9 90 00")).is_none()); // layer
        assert!(FrameHeader::parse(&hex!("FF FB 00 00")).is_none()); // free bitrate
        assert!(FrameHeader::parse(&hex!("FF FB F0 00")).is_none()); // bad bitrate
        assert!(FrameHeader::parse(&hex!("FF FB 9C 00")).is_none()); // reserved rate
    }

    #[test]
    fn tables() {
        assert_eq!(bitrate(MPEG1, LAYER1, 1), Some(8_000));
        assert_eq!(bitrate(MPEG1, LAYER1, 14), Some(160_000));
        assert_eq!(bitrate(MPEG1, LAYER2, 14), Some(384_000));
        assert_eq!(bitrate(MPEG2, LAYER1, 13), Some(224_000));
        assert_eq!(bitrate(MPEG2, LAYER2, 1), Some(8_000));
        assert_eq!(bitrate(0b01, LAYER3, 9), None);
        assert_eq!(sampling_rate(MPEG2, 2), Some(16_000));
        assert_eq!(sampling_rate(MPEG1, 3), None);
    }

    #[test]
    fn synchsafe_size() {
        assert_eq!(synchsafe(&[0x00, 0x00, 0x02, 0x01]), Some(257));
        assert_eq!(synchsafe(&[0x01, 0x00, 0x00, 0x00]), Some(1 << 21));
        assert_eq!(synchsafe(&[0x7F, 0x7F, 0x7F, 0x7F]), Some((1 << 28) - 1));
        assert_eq!(synchsafe(&[0x00, 0x80, 0x00, 0x00]), None);
    }

    #[test]
    fn single_frame_at_end_of_stream() {
        let (before, after) = carve(&frame());
        assert!(before.is_empty());
        assert_eq!(after, vec![(0, FRAME_LEN as u64)]);
    }

    #[test]
    fn frames_then_garbage() {
        let mut data = b"xyz".to_vec();
        data.extend_from_slice(&frame());
        data.extend_from_slice(&frame());
        data.extend_from_slice(b"abcde");

        // the candidate ends on the byte after the failed header, which is not kept
        let end = 3 + 2 * FRAME_LEN as u64 + 4;
        let (before, after) = carve(&data);
        assert_eq!(before, vec![(3, end), (3 + FRAME_LEN as u64, end)]);
        assert_eq!(before, after);
    }

    #[test]
    fn id3v1_trailer() {
        let mut data = frame();
        data.extend_from_slice(b"TAG");
        data.resize(FRAME_LEN + 128, 0x00);

        let (_, after) = carve(&data);
        assert_eq!(after, vec![(0, FRAME_LEN as u64 + 128)]);
    }

    #[test]
    fn id3v2_prefix_is_not_deduplicated() {
        let mut data = b"ID3".to_vec();
        data.extend_from_slice(&hex!("03 00 00 00 00 00 0A"));
        data.extend_from_slice(&[0x00; 10]);
        data.extend_from_slice(&frame());

        // one detection with the tag, one for the bare frames inside it
        let (_, after) = carve(&data);
        let end = 20 + FRAME_LEN as u64;
        assert_eq!(after, vec![(0, end), (20, end)]);
    }

    #[test]
    fn id3v2_bad_size() {
        let mut data = b"ID3".to_vec();
        data.extend_from_slice(&hex!("03 00 00 00 00 80 00"));
        data.resize(100, 0x00);
        let (_, after) = carve(&data);
        assert!(after.is_empty());
    }

    #[test]
    fn id3v2_without_frames() {
        let mut data = b"ID3".to_vec();
        data.extend_from_slice(&hex!("03 00 00 00 00 00 02"));
        data.extend_from_slice(b"..");
        data.extend_from_slice(b"not a frame");
        let (_, after) = carve(&data);
        assert!(after.is_empty());
    }

    #[test]
    fn lone_sync_bytes() {
        let (_, after) = carve(&hex!("FF 00 FF FB FF E0 00"));
        assert!(after.is_empty());
    }
}
