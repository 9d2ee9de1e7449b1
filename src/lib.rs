//! # qrtracker
//!
//! Inserts QR "progress tracker" images into the content chapters of an
//! EPUB. Each eligible chapter gets a small PNG encoding
//! `Completed {book title} - {chapter title}`, linked from a dedicated
//! placeholder element; rerunning replaces markers instead of stacking
//! them.
//!
//! ## Pipeline
//!
//! 1. **Candidate selection** — content documents in reading order, minus
//!    the cover, filtered by a content-probability heuristic.
//! 2. **Title resolution** — semantic headings first, then `<title>`,
//!    plain headings, and finally the filename.
//! 3. **Placeholder management** — find or create the insertion node and
//!    drop any marker left by a previous run.
//! 4. **Image generation & embedding** — render the QR symbol to PNG,
//!    register it as a book asset, and link it from the placeholder.
//!
//! ## Quick start
//!
//! ```no_run
//! use qrtracker::{annotate, read_epub, write_epub, Mode, Prefs};
//!
//! let mut book = read_epub("input.epub")?;
//! let report = annotate(&mut book, &Prefs::default(), &Mode::WholeBook)?;
//! println!("{} of {} pages annotated", report.processed, report.attempted);
//! write_epub(&book, "output.epub")?;
//! # Ok::<(), qrtracker::Error>(())
//! ```

pub mod annotate;
pub mod book;
pub mod config;
pub mod dom;
pub mod epub;
pub mod error;
pub(crate) mod util;

pub use annotate::{annotate, Mode, RunReport};
pub use book::{Book, Metadata, Resource, SpineItem};
pub use config::{Prefs, ScoreConfig};
pub use epub::{read_epub, write_epub};
pub use error::{Error, Result};
