//! Manage command line arguments here.
use std::fs::OpenOptions;
use std::path::PathBuf;

use clap::builder::styling;
use clap::{Arg, ArgAction, ArgMatches, Command};
use simplelog::*;

/// This structure holds the command line arguments.
#[derive(Debug, Default)]
pub struct CliOptions {
    // input file to analyze
    pub input_file: PathBuf,

    // size of the chunks fed to the carvers
    pub buffer_size: usize,

    // minimum file size to report or extract
    pub min_size: u64,

    // only carve those file types
    pub ext_list: Vec<String>,

    // display progress bar
    pub progress_bar: bool,

    // save carved files under this directory
    pub extract_dir: Option<PathBuf>,

    // write the list of carved files in this file
    pub audit_file: Option<PathBuf>,
}

impl CliOptions {
    pub fn new() -> anyhow::Result<CliOptions> {
        let matches = command().get_matches();
        let options = CliOptions::from_matches(&matches);

        // manage debugging
        let level = match matches.get_count("verbose") {
            0 => log::LevelFilter::Off,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            3..=255 => log::LevelFilter::Trace,
        };
        if let Some(path) = matches.get_one::<PathBuf>("log") {
            init_write_logger(path, level)?;
        } else {
            init_term_logger(level)?;
        }

        Ok(options)
    }

    // save all cli options into a structure
    fn from_matches(matches: &ArgMatches) -> CliOptions {
        CliOptions {
            input_file: matches
                .get_one::<PathBuf>("input")
                .cloned()
                .unwrap_or_default(),
            buffer_size: matches.get_one::<u64>("buffer").copied().unwrap_or(4096) as usize,
            min_size: matches.get_one::<u64>("minsize").copied().unwrap_or(0),
            ext_list: matches
                .get_many::<String>("ext")
                .map(|exts| exts.cloned().collect())
                .unwrap_or_default(),
            progress_bar: matches.get_flag("pb"),
            extract_dir: matches.get_one::<PathBuf>("extract").cloned(),
            audit_file: matches.get_one::<PathBuf>("audit").cloned(),
        }
    }
}

fn command() -> Command {
    const STYLES: styling::Styles = styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default().bold())
        .usage(styling::AnsiColor::Green.on_default().bold())
        .literal(styling::AnsiColor::Blue.on_default().bold())
        .placeholder(styling::AnsiColor::Cyan.on_default());

    Command::new("bytecarve")
        .version(clap::crate_version!())
        .styles(STYLES)
        .about(
            r#"Streaming file carver.

            Finds PNG, JPEG, WAV, MP3 and Ogg files in any byte stream: disk images,
            unallocated space or plain files.
            "#,
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .long_help("Name and path of the input file to be carved")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("buffer")
                .short('b')
                .long("buffer")
                .long_help("Length in bytes of the chunks given to the carvers")
                .value_name("BUFFER")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("4096"),
        )
        .arg(
            Arg::new("minsize")
                .short('m')
                .long("minsize")
                .long_help("If discovered file length is less than SIZE, it'll be neither reported nor carved")
                .value_name("SIZE")
                .value_parser(clap::value_parser!(u64))
                .required(false),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .long_help("Save debugging info into the file LOG.")
                .action(ArgAction::Set)
                .value_name("LOG")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .long_help("Verbose mode, from info (-v) to trace (-vvv).")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("pb")
                .long("progress")
                .short('p')
                .action(ArgAction::SetTrue)
                .long_help("Display progress bar"),
        )
        .arg(
            Arg::new("ext")
                .short('e')
                .long("ext")
                .help("Comma-separated list of extensions to carve (png,jpg,wav,mp3,ogg)")
                .num_args(1)
                .value_delimiter(',')
                .required(false),
        )
        .arg(
            Arg::new("extract")
                .short('x')
                .long("extract")
                .long_help("Save carved files under DIR, one sub-directory per category")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("audit")
                .short('a')
                .long("audit")
                .long_help("Write the list of carved files into AUDIT")
                .value_name("AUDIT")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

// Initialize write logger: either create it or use it
fn init_write_logger(logfile: &PathBuf, level: log::LevelFilter) -> anyhow::Result<()> {
    if level == log::LevelFilter::Off {
        return Ok(());
    }

    // initialize logger
    let writable = OpenOptions::new().create(true).append(true).open(logfile)?;

    WriteLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_rfc3339()
            .build(),
        writable,
    )?;

    Ok(())
}

// Initialize terminal logger
fn init_term_logger(level: log::LevelFilter) -> anyhow::Result<()> {
    if level == log::LevelFilter::Off {
        return Ok(());
    }
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    Ok(())
}
