// main function for feeding an image to a carver
// the image is given chunk by chunk, exactly like a stream would be

use indicatif::ProgressBar;
use log::debug;

use crate::carver::Carver;

pub struct Context<'a> {
    pub mmap: &'a [u8],      // the image to search
    pub buffer_size: usize,  // length of the chunks given to the carver
    pub pb: &'a ProgressBar, // ref on progress bar
}

impl Context<'_> {
    // feed the whole image then finalize. Returns the number of files found
    pub fn search(&self, carver: &mut dyn Carver) -> usize {
        debug!(
            "{}: searching {} bytes, chunks of {} bytes",
            carver.display_name(),
            self.mmap.len(),
            self.buffer_size
        );

        let mut found = carver.detections().len();

        for chunk in self.mmap.chunks(self.buffer_size.max(1)) {
            carver.process_bytes(chunk);
            self.pb.inc(chunk.len() as u64);

            // update progress bar when something new shows up
            let now = carver.detections().len();
            if now != found {
                found = now;
                self.pb
                    .set_message(format!("{}: {} found", carver.display_name(), found));
            }
        }

        carver.finalize();
        carver.detections().len()
    }
}
