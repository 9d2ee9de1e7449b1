//! qrtracker - add QR progress trackers to EPUB chapters

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use qrtracker::{annotate, read_epub, write_epub, Error, Mode, Prefs};

#[derive(Parser)]
#[command(name = "qrtracker")]
#[command(version, about = "Add QR progress trackers to EPUB chapters", long_about = None)]
#[command(after_help = "EXAMPLES:
    qrtracker book.epub tracked.epub             Annotate every chapter
    qrtracker book.epub out.epub -p text/ch3.xhtml   Annotate a single page
    qrtracker book.epub --dry-run                Report without writing")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output EPUB file
    #[arg(value_name = "OUTPUT", required_unless_present = "dry_run")]
    output: Option<PathBuf>,

    /// Process only this entry (name relative to the OPF directory)
    #[arg(short, long, value_name = "NAME")]
    page: Option<String>,

    /// Preferences file (JSON; missing fields keep their defaults)
    #[arg(long, value_name = "FILE")]
    prefs: Option<PathBuf>,

    /// Run the pipeline and report, but write nothing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Abort(msg)) => {
            eprintln!("Operation was cancelled: {msg}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let prefs = match &cli.prefs {
        Some(path) => Prefs::load(path)?,
        None => Prefs::default(),
    };

    let mode = match cli.page {
        Some(name) => Mode::SingleFile(name),
        None => Mode::WholeBook,
    };

    let mut book = read_epub(&cli.input)?;
    let report = annotate(&mut book, &prefs, &mode)?;

    if !report.errors.is_empty() {
        eprintln!("The following items could not be processed:");
        for msg in &report.errors {
            eprintln!("  - {msg}");
        }
    }
    println!(
        "{} QR images were added out of {}.",
        report.processed, report.attempted
    );

    // The input is never touched; the output only appears on success
    if let Some(output) = &cli.output {
        if !cli.dry_run {
            write_epub(&book, output)?;
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
