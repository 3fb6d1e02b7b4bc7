use byteorder::{ByteOrder, LittleEndian};
use hex_literal::hex;

use crate::carvers::{byte_carver::ByteCarver, Candidate, FileType, Step};

// see: https://docs.fileformat.com/audio/wav/
const RIFF: [u8; 4] = hex!("52 49 46 46");
const WAVEFMT: [u8; 7] = hex!("57 41 56 45 66 6D 74");

// "RIFF" and the size field itself are not counted in the RIFF size
const UNTALLIED: u64 = 8;

#[derive(Debug)]
pub struct WavCandidate {
    start: u64,
    progress: usize, // header bytes matched so far
    size: [u8; 4], // RIFF size in little endian
}

impl Candidate for WavCandidate {
    fn start(&self) -> u64 {
        self.start
    }

    fn feed(&mut self, byte: u8, _offset: u64) -> Step {
        let progress = self.progress;
        self.progress += 1;

        match progress {
            0..=3 if byte == RIFF[progress] => Step::Continue,
            4..=7 => {
                self.size[progress - 4] = byte;
                Step::Continue
            }
            8..=14 if byte == WAVEFMT[progress - 8] => {
                if progress < 14 {
                    return Step::Continue;
                }

                // the whole file length comes from the header, no need to read further
                let size = LittleEndian::read_u32(&self.size) as u64;
                Step::Complete(self.start + size + UNTALLIED)
            }
            _ => Step::Invalid,
        }
    }
}

#[derive(Debug)]
pub struct Wav;

impl FileType for Wav {
    type Candidate = WavCandidate;

    const DISPLAY_NAME: &'static str = "WAV";
    const EXT: &'static str = "wav";
    const CATEGORY: &'static str = "audio/wav";

    fn spawn(byte: u8, start: u64) -> Option<WavCandidate> {
        (byte == RIFF[0]).then_some(WavCandidate {
            start,
            progress: 0,
            size: [0; 4],
        })
    }
}

pub type WavCarver = ByteCarver<Wav>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carver::Carver;

    fn carve(data: &[u8]) -> Vec<(u64, u64)> {
        let mut carver = WavCarver::new();
        carver.process_bytes(data);
        carver.finalize();
        carver
            .detections()
            .iter()
            .map(|d| (d.start, d.end))
            .collect()
    }

    fn header(size: u32) -> Vec<u8> {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&size.to_le_bytes());
        data.extend_from_slice(b"WAVEfmt ");
        data
    }

    #[test]
    fn size_from_header() {
        assert_eq!(carve(&header(36)), vec![(0, 44)]);
        // the declared size may well exceed what we have
        assert_eq!(carve(&header(0x0012_3456)), vec![(0, 0x0012_3456 + 8)]);
    }

    #[test]
    fn offset() {
        let mut data = b"RRRIFRIF".to_vec();
        data.extend_from_slice(&header(100));
        data.extend_from_slice(&[0xAA; 100]);
        assert_eq!(carve(&data), vec![(8, 116)]);
    }

    #[test]
    fn not_wave() {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&36u32.to_le_bytes());
        data.extend_from_slice(b"AVI LIST");
        assert!(carve(&data).is_empty());

        assert!(carve(b"RIFF\x24\x00\x00\x00WAVE").is_empty());
    }

    #[test]
    fn size_bytes_are_not_checked() {
        // size bytes containing 'R' must not disturb the match
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(b"RRRR");
        data.extend_from_slice(b"WAVEfmt");
        let size = u32::from_le_bytes(*b"RRRR") as u64;
        assert_eq!(carve(&data), vec![(0, size + 8)]);
    }
}
