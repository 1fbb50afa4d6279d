use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::Level;

use jpeg_carve::carving::ResumePolicy;
use jpeg_carve::config::{CarveOptions, DEFAULT_INPUT};
use jpeg_carve::recovery;
use jpeg_carve::source::DEFAULT_WINDOW_SIZE;
use jpeg_carve::types::{MarkerPair, MarkerSignature};

#[derive(Parser)]
#[command(name = "jpeg-carve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recover JPEG images from raw disk and memory images", long_about = None)]
struct Cli {
    /// Disk image, memory dump or block device to scan
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Directory for recovered images
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// File name prefix for recovered images
    #[arg(long, default_value = "Image")]
    prefix: String,

    /// File extension for recovered images
    #[arg(long, default_value = "jpeg")]
    extension: String,

    /// Header signature as hex bytes
    #[arg(long, default_value = "ffd8")]
    header: String,

    /// Footer signature as hex bytes
    #[arg(long, default_value = "ffd9")]
    footer: String,

    /// Read window in bytes (0 reads the input once per offset)
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    buffer_size: usize,

    /// Memory-map the input instead of reading it
    #[arg(long)]
    mmap: bool,

    /// Only list candidates, do not write files
    #[arg(long)]
    scan_only: bool,

    /// Resume the header search at the end of each recovered image
    #[arg(long)]
    resume_at_end: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

impl Cli {
    fn to_options(&self) -> Result<CarveOptions> {
        let markers = MarkerPair::new(
            MarkerSignature::from_hex(&self.header).context("Invalid --header")?,
            MarkerSignature::from_hex(&self.footer).context("Invalid --footer")?,
        )?;

        let mut options = CarveOptions::new(&self.input)
            .with_output_dir(&self.output)
            .with_file_naming(&self.prefix, &self.extension)
            .with_markers(markers)
            .with_window_size(self.buffer_size);

        if self.mmap {
            options = options.mmap();
        }
        if self.scan_only {
            options = options.scan_only();
        }
        if self.resume_at_end {
            options = options.with_resume(ResumePolicy::AfterRecord);
        }

        Ok(options)
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        Level::TRACE
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let options = cli.to_options()?;

    let input_size = std::fs::metadata(&options.input).map_or(0, |m| m.len());
    let pb = ProgressBar::new(input_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("=>-"),
    );

    pb.set_message("Scanning");

    let report = recovery::recover(&options, |position, total| {
        pb.set_length(total);
        pb.set_position(position);
    })?;

    pb.finish_and_clear();

    if cli.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    print!("{}", report.render_table());

    if report.failed() > 0 {
        println!(
            "[!] {} images could not be written",
            style(report.failed()).yellow()
        );
    }
    if report.stats.unreadable_offsets > 0 {
        println!(
            "[!] {} unreadable offsets skipped",
            style(report.stats.unreadable_offsets).yellow()
        );
    }

    Ok(())
}
