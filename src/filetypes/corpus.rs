use std::ops::{Deref, DerefMut};

use log::debug;

use crate::carver::{Carver, Detection};

use super::{JpegCarver, Mp3Carver, OggCarver, PngCarver, WavCarver};

// a carver which can be handed over to a worker thread
pub type BoxedCarver = Box<dyn Carver + Send>;

// the list of all file types that we can carve. Registration order is also the
// order in which detections are numbered and listed
pub struct Corpus(Vec<BoxedCarver>);

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl Corpus {
    // define all file types to carve
    pub fn new() -> Self {
        let mut corpus = Self::empty();

        corpus.register(Box::new(PngCarver::new()));
        corpus.register(Box::new(JpegCarver::new()));
        corpus.register(Box::new(WavCarver::new()));
        corpus.register(Box::new(Mp3Carver::new()));
        corpus.register(Box::new(OggCarver::new()));

        corpus
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn register(&mut self, carver: BoxedCarver) {
        debug!("registering carver for {}", carver.display_name());
        self.0.push(carver);
    }

    // only keep the file types whose extension is in the list. An empty list keeps everything
    pub fn retain<S: AsRef<str>>(&mut self, ext_list: &[S]) {
        if ext_list.is_empty() {
            return;
        }

        self.0.retain(|carver| {
            ext_list
                .iter()
                .any(|ext| ext.as_ref().eq_ignore_ascii_case(carver.ext()))
        });
    }

    // feed the same chunk to every carver
    pub fn process_bytes(&mut self, buffer: &[u8]) {
        for carver in self.0.iter_mut() {
            carver.process_bytes(buffer);
        }
    }

    pub fn finalize(&mut self) {
        for carver in self.0.iter_mut() {
            carver.finalize();
        }
    }

    pub fn reset(&mut self) {
        for carver in self.0.iter_mut() {
            carver.reset();
        }
    }

    // total number of detections, all carvers included
    pub fn detection_count(&self) -> usize {
        self.0.iter().map(|carver| carver.detections().len()).sum()
    }

    // all detections, carver by carver
    pub fn detections(&self) -> impl Iterator<Item = (&dyn Carver, &Detection)> + '_ {
        self.0.iter().flat_map(|carver| {
            let carver: &dyn Carver = &**carver;
            carver.detections().iter().map(move |det| (carver, det))
        })
    }

    // the detection at position `index` in the flattened list
    pub fn detection(&self, mut index: usize) -> Option<(&dyn Carver, &Detection)> {
        for carver in self.0.iter() {
            let carver: &dyn Carver = &**carver;
            let found = carver.detections();
            if index < found.len() {
                return Some((carver, &found[index]));
            }
            index -= found.len();
        }
        None
    }

    // "<DisplayName> \t <size>" for each detection
    pub fn labels(&self) -> Vec<String> {
        self.detections()
            .map(|(carver, det)| label(carver, det))
            .collect()
    }
}

impl Deref for Corpus {
    type Target = Vec<BoxedCarver>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Corpus {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

pub fn label(carver: &dyn Carver, det: &Detection) -> String {
    format!("{} \t {}", carver.display_name(), human_size(det.len()))
}

// format a byte count with base 1000 units, rounded to 2 decimals: 1500 => 1.5KB
pub fn human_size(amount: u64) -> String {
    const SUFFIXES: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

    let mut index = 0;
    let mut unit = 1u64;
    while index + 1 < SUFFIXES.len() && amount / unit >= 1000 {
        unit *= 1000;
        index += 1;
    }

    let number = (amount as f64 / unit as f64 * 100.0).round() / 100.0;
    format!("{}{}", number, SUFFIXES[index])
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::filetypes::png::{MAGIC_END, MAGIC_START};

    #[test]
    fn sizes() {
        assert_eq!(human_size(0), "0B");
        assert_eq!(human_size(28), "28B");
        assert_eq!(human_size(999), "999B");
        assert_eq!(human_size(1000), "1KB");
        assert_eq!(human_size(1500), "1.5KB");
        assert_eq!(human_size(1234), "1.23KB");
        assert_eq!(human_size(999_999), "1000KB");
        assert_eq!(human_size(2_500_000), "2.5MB");
        assert_eq!(human_size(7_000_000_000_000), "7TB");
        assert_eq!(human_size(u64::MAX), "18.45EB");
    }

    #[test]
    fn registration_order() {
        let corpus = Corpus::new();
        let exts: Vec<_> = corpus.iter().map(|c| c.ext()).collect();
        assert_eq!(exts, vec!["png", "jpg", "wav", "mp3", "ogg"]);
    }

    #[test]
    fn retain() {
        let mut corpus = Corpus::new();
        corpus.retain::<String>(&[]);
        assert_eq!(corpus.len(), 5);

        corpus.retain(&["OGG", "png", "bmp"]);
        let exts: Vec<_> = corpus.iter().map(|c| c.ext()).collect();
        assert_eq!(exts, vec!["png", "ogg"]);
    }

    // a WAV header, then a PNG: the PNG carver is registered first so it's listed first
    fn stream() -> Vec<u8> {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&2000u32.to_le_bytes());
        data.extend_from_slice(b"WAVEfmt ");
        data.extend_from_slice(&MAGIC_START);
        data.extend_from_slice(&hex!("00 00 00 01 73 52 47 42 00 AE CE 1C E9"));
        data.extend_from_slice(&MAGIC_END);
        data
    }

    #[test]
    fn flattened_detections() {
        let mut corpus = Corpus::new();
        for chunk in stream().chunks(7) {
            corpus.process_bytes(chunk);
        }
        corpus.finalize();

        assert_eq!(corpus.detection_count(), 2);

        let (carver, png) = corpus.detection(0).unwrap();
        assert_eq!(carver.display_name(), "PNG");
        assert_eq!((png.start, png.end), (16, 57));

        let (carver, wav) = corpus.detection(1).unwrap();
        assert_eq!(carver.ext(), "wav");
        assert_eq!((wav.start, wav.end), (0, 2008));

        assert!(corpus.detection(2).is_none());

        assert_eq!(corpus.labels(), vec!["PNG \t 41B", "WAV \t 2.01KB"]);

        // the PNG lies inside the WAV, both are kept
        let all: Vec<_> = corpus.detections().map(|(_, det)| det.ext).collect();
        assert_eq!(all, vec!["png", "wav"]);
    }

    #[test]
    fn reset() {
        let mut corpus = Corpus::new();
        corpus.process_bytes(&stream());
        corpus.finalize();
        assert_eq!(corpus.detection_count(), 2);

        corpus.reset();
        assert_eq!(corpus.detection_count(), 0);
        assert!(corpus.iter().all(|c| c.offset() == 0));

        corpus.process_bytes(&stream());
        corpus.finalize();
        assert_eq!(corpus.detection_count(), 2);
    }

    #[test]
    fn open_registry() {
        let mut corpus = Corpus::empty();
        corpus.register(Box::new(WavCarver::new()));
        corpus.process_bytes(&stream());
        corpus.finalize();
        assert_eq!(corpus.detection_count(), 1);
        assert_eq!(corpus.detection(0).unwrap().1.ext, "wav");
    }
}
