//! The annotation pipeline: candidate selection, per-page title/QR work,
//! and the run report.
//!
//! One invocation walks the book's reading order, decides which pages are
//! real content chapters, and gives each one a QR marker image encoding
//! "Completed {book} - {chapter}". A page that already carries a marker
//! gets it replaced, never duplicated.

pub mod placeholder;
pub mod qr;
pub mod score;
pub mod title;

use tracing::{debug, info, warn};

use crate::book::{is_document_type, Book};
use crate::config::Prefs;
use crate::dom::{local_name, parse_page, serialize_page, PageDom};
use crate::error::{Error, Result};

/// What to process in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Every eligible document in the reading order.
    WholeBook,
    /// Exactly one named entry.
    SingleFile(String),
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Pages successfully annotated.
    pub processed: usize,
    /// Candidates attempted.
    pub attempted: usize,
    /// Per-page failure messages, `"name: message"`.
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run the full pipeline against `book`.
///
/// Whole-run precondition failures return [`Error::Abort`] before any
/// mutation. Per-page failures are isolated: they are collected into the
/// report and the batch continues. Any other error is fatal and the book
/// must be considered half-mutated; callers should discard it rather than
/// persist it.
pub fn annotate(book: &mut Book, prefs: &Prefs, mode: &Mode) -> Result<RunReport> {
    let book_title = book.display_title().ok_or_else(|| {
        Error::abort("Please set a title and/or a series name in the book metadata")
    })?;

    let names = match mode {
        Mode::SingleFile(name) => {
            let is_doc = book.media_type(name).is_some_and(is_document_type);
            if !is_doc {
                return Err(Error::abort(
                    "No file open for editing or the current file is not an (x)html file.",
                ));
            }
            vec![name.clone()]
        }
        Mode::WholeBook => {
            let names = candidate_names(book);
            if names.is_empty() {
                return Err(Error::abort(
                    "This book does not seem to reference html files in its spine.",
                ));
            }
            names
        }
    };

    let names = score::probable_chapters(book, &names, &prefs.score);
    if names.is_empty() {
        return Err(Error::abort(
            "Found no suitable candidate HTML page to process in the book spine.",
        ));
    }

    let mut report = RunReport {
        attempted: names.len(),
        ..RunReport::default()
    };

    for name in &names {
        match annotate_page(book, prefs, name, &book_title) {
            Ok(()) => report.processed += 1,
            Err(Error::Abort(msg)) => {
                warn!(page = %name, %msg, "page skipped");
                report.errors.push(format!("{}: {}", name, msg));
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        processed = report.processed,
        attempted = report.attempted,
        "annotation run finished"
    );
    Ok(report)
}

/// Documents in reading order, minus the cover page.
///
/// Prefers the cover page the OPF guide declares; without one, a leading
/// page that is just a wrapper around a single image is dropped instead.
fn candidate_names(book: &Book) -> Vec<String> {
    let mut names: Vec<String> = book.documents().map(String::from).collect();

    if let Some(cover) = book.cover_page_name() {
        let cover = cover.to_string();
        names.retain(|name| *name != cover);
    } else if let Some(first) = names.first() {
        if is_simple_cover_wrapper(book, first) {
            debug!(page = %first, "skipping leading cover wrapper");
            names.remove(0);
        }
    }
    names
}

/// Whether a page is a lone wrapper around a single image: exactly one
/// `img`/`svg` element and no rendered text.
fn is_simple_cover_wrapper(book: &Book, name: &str) -> bool {
    let raw = match book.raw_data(name) {
        Some(raw) => raw,
        None => return false,
    };
    let dom = match parse_page(raw) {
        Ok(dom) => dom,
        Err(_) => return false,
    };
    if score::image_element_count(&dom) != 1 {
        return false;
    }
    body_text_is_empty(&dom)
}

fn body_text_is_empty(dom: &PageDom) -> bool {
    match dom.find_element(|tag, _| local_name(tag) == "body") {
        Some(body) => dom.rendered_text(body).is_empty(),
        None => false,
    }
}

/// Process one page: resolve its title, prepare the insertion node
/// (removing any previous marker), then generate and link the QR image.
fn annotate_page(book: &mut Book, prefs: &Prefs, name: &str, book_title: &str) -> Result<()> {
    let raw = book
        .raw_data(name)
        .ok_or_else(|| Error::abort("entry disappeared from the book"))?;
    let mut dom = parse_page(raw)?;

    let chapter = title::chapter_title(&dom, name);
    debug!(page = %name, title = %chapter, "resolved chapter title");

    // prepare_node removes the previous marker, so the new image must only
    // be registered afterwards
    let node = placeholder::prepare_node(book, &mut dom, name, prefs)?;

    let text = qr::marker_text(book_title, &chapter);
    let image_name = qr::generate_marker(book, name, &text, prefs)?;
    qr::embed_marker(book, &mut dom, name, node, &image_name);

    book.set_data(name, serialize_page(&dom));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Vec<u8> {
        format!(
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title>T</title></head><body>{}</body></html>"#,
            body
        )
        .into_bytes()
    }

    fn demo_book() -> Book {
        let mut book = Book::new();
        book.metadata.title = "Demo".to_string();
        // A few KB of prose, so the page stays above the score threshold
        // even once it carries the marker image
        book.add_resource(
            "ch1.xhtml",
            page(&"<p>Words and more words.</p>".repeat(150)),
            "application/xhtml+xml",
        );
        book.add_spine_item("ch1", "ch1.xhtml", "application/xhtml+xml");
        book
    }

    #[test]
    fn test_missing_title_aborts_before_mutation() {
        let mut book = demo_book();
        book.metadata.title.clear();
        let err = annotate(&mut book, &Prefs::default(), &Mode::WholeBook).unwrap_err();
        assert!(matches!(err, Error::Abort(_)));
        assert!(!book.is_dirty("ch1.xhtml"));
    }

    #[test]
    fn test_single_file_requires_document() {
        let mut book = demo_book();
        book.add_resource("style.css", b"body{}".to_vec(), "text/css");
        let err = annotate(
            &mut book,
            &Prefs::default(),
            &Mode::SingleFile("style.css".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Abort(_)));
    }

    #[test]
    fn test_whole_book_processes_chapter() {
        let mut book = demo_book();
        let report = annotate(&mut book, &Prefs::default(), &Mode::WholeBook).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.attempted, 1);
        assert!(report.all_succeeded());
        assert!(book.get_resource("filidelqr-ch1.png").is_some());
        assert!(book.is_dirty("ch1.xhtml"));

        let html = String::from_utf8(book.raw_data("ch1.xhtml").unwrap().to_vec()).unwrap();
        assert!(html.contains(r#"<aside id="qrtracker" class="qrtracker">"#));
        assert!(html.contains(r#"src="filidelqr-ch1.png""#));
    }

    #[test]
    fn test_cover_wrapper_skipped() {
        let mut book = Book::new();
        book.metadata.title = "Demo".to_string();
        book.add_resource(
            "cover.xhtml",
            page(r#"<img src="cover.jpg"/>"#),
            "application/xhtml+xml",
        );
        book.add_resource("ch1.xhtml", page("<p>Words.</p>"), "application/xhtml+xml");
        book.add_spine_item("cover", "cover.xhtml", "application/xhtml+xml");
        book.add_spine_item("ch1", "ch1.xhtml", "application/xhtml+xml");

        let names = candidate_names(&book);
        assert_eq!(names, vec!["ch1.xhtml"]);
    }

    #[test]
    fn test_guide_cover_excluded() {
        let mut book = Book::new();
        book.metadata.title = "Demo".to_string();
        book.metadata.cover_page = Some("front.xhtml".to_string());
        book.add_resource("front.xhtml", page("<p>Front matter.</p>"), "application/xhtml+xml");
        book.add_resource("ch1.xhtml", page("<p>Words.</p>"), "application/xhtml+xml");
        book.add_spine_item("front", "front.xhtml", "application/xhtml+xml");
        book.add_spine_item("ch1", "ch1.xhtml", "application/xhtml+xml");

        let names = candidate_names(&book);
        assert_eq!(names, vec!["ch1.xhtml"]);
    }

    #[test]
    fn test_page_failure_does_not_stop_batch() {
        let mut book = Book::new();
        book.metadata.title = "Demo".to_string();
        // no <body>: per-page abort
        book.add_resource(
            "bad.xhtml",
            br#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title>B</title></head></html>"#
                .to_vec(),
            "application/xhtml+xml",
        );
        book.add_resource("ch1.xhtml", page("<p>Words.</p>"), "application/xhtml+xml");
        book.add_spine_item("bad", "bad.xhtml", "application/xhtml+xml");
        book.add_spine_item("ch1", "ch1.xhtml", "application/xhtml+xml");

        let report = annotate(&mut book, &Prefs::default(), &Mode::WholeBook).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("bad.xhtml:"));
    }

    #[test]
    fn test_idempotent_rerun() {
        let mut book = demo_book();
        annotate(&mut book, &Prefs::default(), &Mode::WholeBook).unwrap();
        let first = book.raw_data("filidelqr-ch1.png").unwrap().to_vec();

        annotate(&mut book, &Prefs::default(), &Mode::WholeBook).unwrap();
        let second = book.raw_data("filidelqr-ch1.png").unwrap().to_vec();
        assert_eq!(first, second);

        let html = String::from_utf8(book.raw_data("ch1.xhtml").unwrap().to_vec()).unwrap();
        assert_eq!(html.matches("<img").count(), 1);
        assert_eq!(html.matches("<aside").count(), 1);
    }
}
