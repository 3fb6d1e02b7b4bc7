// audit related definitions

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::carver::Detection;

// this will hold all audit figures
#[derive(Debug)]
pub struct AuditFile {
    writer: BufWriter<File>,
}

impl AuditFile {
    // create a new instance of the audit file
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let f = File::create(path)?;

        Ok(Self {
            writer: BufWriter::new(f),
        })
    }

    // add metadata
    pub fn add_metadata<P: AsRef<Path>>(&mut self, path: P, length: usize) -> anyhow::Result<()> {
        write!(
            self.writer,
            "image name: {}, file length: {}\n\n",
            path.as_ref().display(),
            length
        )?;

        Ok(())
    }

    // add new data
    pub fn add_artefact(&mut self, data: &AuditData<'_>) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "{}: {}-{} (0x{:X}-0x{:X}) {}",
            data.artefact,
            data.offset_start,
            data.offset_end,
            data.offset_start,
            data.offset_end,
            data.length
        )?;
        self.writer.flush()?;

        Ok(())
    }
}

// interesting data to know for each artefact
pub struct AuditData<'a> {
    // artefact label
    pub artefact: &'a str,

    // starting offset in the image file
    pub offset_start: u64,

    // end offset in the image file
    pub offset_end: u64,

    // artefact length
    pub length: u64,
}

impl<'a> AuditData<'a> {
    pub fn new(artefact: &'a str, det: &Detection) -> Self {
        Self {
            artefact,
            offset_start: det.start,
            offset_end: det.end,
            length: det.len(),
        }
    }
}
