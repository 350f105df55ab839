use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::process;

use pdf_compress::cli::Args;
use pdf_compress::config::Settings;
use pdf_compress::{check_backends, compress_file, CompressError, Progress};

/// Progress lines on stderr, rewritten in place for each page
struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn page(&mut self, index: usize, total: usize) {
        eprint!("Processing page {}/{}...\r", index, total);
        let _ = io::stderr().flush();
    }

    fn saving(&mut self) {
        eprintln!("\nSaving compressed PDF...");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Err(e) = check_backends() {
        eprintln!("Error: {}", e);
        eprintln!("The PDF and JPEG backends failed a self-test; reinstall pdf-compress.");
        process::exit(1);
    }

    let settings = Settings::from_args(&args).with_context(|| "Invalid save options")?;
    let output_path = args.output_path();

    log::info!(
        "Compressing {} -> {} (quality {}, max dimension {})",
        args.input.display(),
        output_path.display(),
        settings.quality,
        settings.max_dimension
    );

    let summary = match compress_file(&args.input, &output_path, &settings, &mut ConsoleProgress) {
        Ok(summary) => summary,
        // A missing input is reported but is not a failure exit
        Err(e @ CompressError::InputNotFound(_)) => {
            println!("Error: {}", e);
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to compress {}", args.input.display())
            })
        }
    };

    log::info!(
        "Image data: {} -> {} bytes; cleanup {:?}",
        summary.stats.bytes_before,
        summary.stats.bytes_after,
        summary.cleanup
    );
    if summary.stats.failed > 0 {
        log::warn!(
            "{} image(s) could not be re-encoded and were left unchanged",
            summary.stats.failed
        );
    }

    println!("{}", summary.sizes);

    Ok(())
}
