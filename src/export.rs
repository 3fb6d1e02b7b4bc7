// save carved files on disk, one sub-directory per category
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::carver::{Carver, Detection};

#[derive(Debug)]
pub struct Exporter {
    // where category directories are created
    root: PathBuf,

    // the current index of the file being carved, per extension
    index: HashMap<&'static str, usize>,
}

impl Exporter {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index: HashMap::new(),
        }
    }

    // copy the detected range of `image` into <root>/<category>/<ext>_<index>.<ext>
    pub fn save(
        &mut self,
        image: &[u8],
        carver: &dyn Carver,
        det: &Detection,
    ) -> anyhow::Result<PathBuf> {
        let payload = det.slice(image);
        if (payload.len() as u64) < det.len() {
            warn!(
                "{} at offset {} is truncated: {} bytes declared, {} available",
                carver.display_name(),
                det.start,
                det.len(),
                payload.len()
            );
        }

        // test sub-directory for category: create it including subdirs
        let dir = self.root.join(carver.category());
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        // now we can build file name
        let ext = carver.ext();
        let index = self.index.entry(ext).or_insert(0);
        let file_name = dir.join(format!("{}_{:08}.{}", ext, index, ext));

        let file = File::create(&file_name)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(payload)?;
        writer.flush()?; // Ensure everything is written

        // add 1 to our per extension counter
        *index += 1;

        debug!("saved {} bytes into {}", payload.len(), file_name.display());
        Ok(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetypes::{PngCarver, WavCarver};

    #[test]
    fn save_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = Exporter::new(dir.path());

        let image = b"0123456789abcdef";
        let png = PngCarver::new();
        let wav = WavCarver::new();

        let first = exporter
            .save(image, &png, &Detection::new(2, 6, "png"))
            .unwrap();
        let second = exporter
            .save(image, &png, &Detection::new(10, 12, "png"))
            .unwrap();
        // declared past the end of the image: truncated
        let third = exporter
            .save(image, &wav, &Detection::new(12, 100, "wav"))
            .unwrap();

        assert_eq!(first, dir.path().join("images/png/png_00000000.png"));
        assert_eq!(second, dir.path().join("images/png/png_00000001.png"));
        assert_eq!(third, dir.path().join("audio/wav/wav_00000000.wav"));

        assert_eq!(fs::read(first).unwrap(), b"2345");
        assert_eq!(fs::read(second).unwrap(), b"ab");
        assert_eq!(fs::read(third).unwrap(), b"cdef");
    }
}
