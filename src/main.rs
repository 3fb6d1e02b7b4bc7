use std::{fs::File, thread, time::Instant};

use anyhow::anyhow;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, trace};
use memmap2::MmapOptions;

use bytecarve::{
    audit::{AuditData, AuditFile},
    export::Exporter,
    filetypes::corpus::label,
    search::Context,
    Corpus,
};

mod args;
use args::CliOptions;

fn main() -> anyhow::Result<()> {
    // harvest cli arguments
    let opts = CliOptions::new()?;
    trace!("args: {:?}", opts);
    let now = Instant::now();

    // open image and build mmap
    let file = File::open(&opts.input_file)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let image: &[u8] = &mmap;

    // build our carvers and optionally retain only file types that are passed in the cli
    let mut corpus = Corpus::new();
    corpus.retain(&opts.ext_list);
    if corpus.is_empty() {
        return Err(anyhow!("no carver left for extensions {:?}", opts.ext_list));
    }

    // carvers don't share anything, so each one gets its own thread over the whole image
    let multi_progress = MultiProgress::new();

    thread::scope(|s| -> anyhow::Result<()> {
        let mut handles = vec![];

        for carver in corpus.iter_mut() {
            let pb = if opts.progress_bar {
                multi_pbar(&multi_progress, image.len(), carver.display_name())
            } else {
                ProgressBar::hidden()
            };
            let buffer_size = opts.buffer_size;

            handles.push(s.spawn(move || {
                info!("starting thread for {}", carver.display_name());

                let ctx = Context {
                    mmap: image,
                    buffer_size,
                    pb: &pb,
                };
                let found = ctx.search(&mut **carver);

                // end of thread
                pb.finish_with_message(format!("{}: {} found", carver.display_name(), found));
                found
            }));
        }

        // Wait for all threads to complete
        for handle in handles {
            let found = handle
                .join()
                .map_err(|_| anyhow!("a carving thread panicked"))?;
            debug!("thread finished, {} files found", found);
        }

        Ok(())
    })?;

    // optional outputs
    let mut exporter = opts.extract_dir.as_ref().map(Exporter::new);
    let mut audit = match &opts.audit_file {
        Some(path) => {
            let mut audit = AuditFile::new(path)?;
            audit.add_metadata(&opts.input_file, image.len())?;
            Some(audit)
        }
        None => None,
    };

    // list what we found, numbered the same way whatever the filters
    let mut reported = 0usize;
    for (index, (carver, det)) in corpus.detections().enumerate() {
        if det.len() < opts.min_size {
            continue;
        }
        reported += 1;

        let label = label(carver, det);
        println!(
            "{:>6}: {} \t {}-{} (0x{:X}-0x{:X})",
            index, label, det.start, det.end, det.start, det.end
        );

        if let Some(exporter) = exporter.as_mut() {
            exporter.save(image, carver, det)?;
        }
        if let Some(audit) = audit.as_mut() {
            audit.add_artefact(&AuditData::new(&label, det))?;
        }
    }

    // print out statistics
    for carver in corpus.iter() {
        println!("Found {} {}s", carver.detections().len(), carver.display_name());
    }
    println!(
        "{} files reported out of {}",
        reported,
        corpus.detection_count()
    );

    let elapsed = now.elapsed();
    println!("total time: {:?}", elapsed);

    Ok(())
}

// define multi-progress bars, one for each carver
fn multi_pbar(mp: &MultiProgress, length: usize, name: &str) -> ProgressBar {
    let pb = mp.add(ProgressBar::new(length as u64));

    if let Ok(style) =
        ProgressStyle::default_bar().template("[{msg}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
    {
        pb.set_style(style);
    }

    pb.set_message(format!("{}: searching", name));

    pb
}
