//! In-memory book container.
//!
//! [`Book`] plays the role the editing host's container played for the
//! original tool: an ordered spine, named resources, relative-reference
//! resolution, and explicit dirty tracking for mutated pages.

use std::collections::{HashMap, HashSet};

use crate::util::normalize_name;

/// Media types treated as content documents (markup pages).
pub const OEB_DOC_TYPES: &[&str] = &["application/xhtml+xml", "text/html"];

/// Whether a media type identifies a content document.
pub fn is_document_type(media_type: &str) -> bool {
    OEB_DOC_TYPES.contains(&media_type)
}

/// An ebook held fully in memory.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub spine: Vec<SpineItem>,
    pub resources: HashMap<String, Resource>,
    /// Entry names whose in-memory content diverged from the source file.
    dirty: HashSet<String>,
}

/// Book metadata (Dublin Core + calibre series extension).
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    pub description: Option<String>,
    /// calibre `calibre:series` meta, when present.
    pub series: Option<String>,
    /// calibre `calibre:series_index` meta, when present.
    pub series_index: Option<f32>,
    /// Name of the cover image resource.
    pub cover_image: Option<String>,
    /// Name of the cover page document (from the OPF guide), when declared.
    pub cover_page: Option<String>,
}

/// An item in the reading order (spine).
#[derive(Debug, Clone)]
pub struct SpineItem {
    pub id: String,
    pub name: String,
    pub media_type: String,
}

/// A named resource (content document, image, CSS, font, etc.).
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
    /// OPF manifest `properties` attribute (e.g. `nav`, `cover-image`),
    /// preserved for re-serialization.
    pub properties: Option<String>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under a name.
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
        media_type: impl Into<String>,
    ) {
        self.resources.insert(
            name.into(),
            Resource {
                data,
                media_type: media_type.into(),
                properties: None,
            },
        );
    }

    /// Deregister a resource. Returns whether it existed.
    pub fn remove_resource(&mut self, name: &str) -> bool {
        self.dirty.remove(name);
        self.resources.remove(name).is_some()
    }

    pub fn get_resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Raw bytes of an entry.
    pub fn raw_data(&self, name: &str) -> Option<&[u8]> {
        self.resources.get(name).map(|r| r.data.as_slice())
    }

    pub fn media_type(&self, name: &str) -> Option<&str> {
        self.resources.get(name).map(|r| r.media_type.as_str())
    }

    /// Replace an entry's bytes and mark it dirty.
    pub fn set_data(&mut self, name: &str, data: Vec<u8>) {
        if let Some(resource) = self.resources.get_mut(name) {
            resource.data = data;
            self.dirty.insert(name.to_string());
        }
    }

    /// Append a spine item.
    pub fn add_spine_item(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        media_type: impl Into<String>,
    ) {
        self.spine.push(SpineItem {
            id: id.into(),
            name: name.into(),
            media_type: media_type.into(),
        });
    }

    /// Content documents in reading order.
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.spine
            .iter()
            .filter(|item| is_document_type(&item.media_type))
            .map(|item| item.name.as_str())
    }

    /// Mark an entry as mutated so re-serialization persists it.
    pub fn mark_dirty(&mut self, name: &str) {
        self.dirty.insert(name.to_string());
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    /// Entries that must never be deregistered during marker cleanup:
    /// spine documents and the declared cover image.
    pub fn is_protected(&self, name: &str) -> bool {
        if self.metadata.cover_image.as_deref() == Some(name) {
            return true;
        }
        self.spine.iter().any(|item| item.name == name)
    }

    /// Resolve a relative (or root-absolute) href found in `base` to an
    /// entry name. Fragments and queries are dropped, percent-escapes
    /// decoded. Returns `None` for unresolvable escapes.
    pub fn href_to_name(&self, href: &str, base: &str) -> Option<String> {
        let href = href.split(['#', '?']).next().unwrap_or(href);
        let decoded = percent_encoding::percent_decode_str(href)
            .decode_utf8()
            .ok()?;
        let joined = if let Some(rest) = decoded.strip_prefix('/') {
            rest.to_string()
        } else {
            match base.rfind('/') {
                Some(i) => format!("{}/{}", &base[..i], decoded),
                None => decoded.into_owned(),
            }
        };
        Some(normalize_name(&joined))
    }

    /// Relative href that resolves to `name` from `base`'s directory.
    pub fn name_to_href(&self, name: &str, base: &str) -> String {
        let base_dir: Vec<&str> = match base.rfind('/') {
            Some(i) => base[..i].split('/').collect(),
            None => Vec::new(),
        };
        let parts: Vec<&str> = name.split('/').collect();

        let common = base_dir
            .iter()
            .zip(parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut href = String::new();
        for _ in common..base_dir.len() {
            href.push_str("../");
        }
        href.push_str(&parts[common..].join("/"));
        href
    }

    /// Book title for marker text: the metadata title, else the series
    /// (with its index when set), else nothing.
    pub fn display_title(&self) -> Option<String> {
        if !self.metadata.title.trim().is_empty() {
            return Some(self.metadata.title.trim().to_string());
        }
        let series = self.metadata.series.as_deref()?.trim();
        if series.is_empty() {
            return None;
        }
        match self.metadata.series_index {
            Some(index) if index.fract() == 0.0 => Some(format!("{} #{:.0}", series, index)),
            Some(index) => Some(format!("{} #{}", series, index)),
            None => Some(series.to_string()),
        }
    }

    /// Name of the cover page document, when the OPF guide declares one.
    pub fn cover_page_name(&self) -> Option<&str> {
        self.metadata.cover_page.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> Book {
        let mut book = Book::new();
        book.metadata.title = "Demo".to_string();
        book.add_resource("text/ch1.xhtml", b"<html/>".to_vec(), "application/xhtml+xml");
        book.add_resource("images/pic.png", vec![1, 2, 3], "image/png");
        book.add_resource("style.css", b"body{}".to_vec(), "text/css");
        book.add_spine_item("ch1", "text/ch1.xhtml", "application/xhtml+xml");
        book
    }

    #[test]
    fn test_documents_filters_spine() {
        let mut book = sample_book();
        book.add_spine_item("css", "style.css", "text/css");
        let docs: Vec<_> = book.documents().collect();
        assert_eq!(docs, vec!["text/ch1.xhtml"]);
    }

    #[test]
    fn test_href_to_name() {
        let book = sample_book();
        assert_eq!(
            book.href_to_name("../images/pic.png", "text/ch1.xhtml"),
            Some("images/pic.png".to_string())
        );
        assert_eq!(
            book.href_to_name("pic%20copy.png#frag", "images/pic.png"),
            Some("images/pic copy.png".to_string())
        );
        assert_eq!(
            book.href_to_name("/style.css", "text/ch1.xhtml"),
            Some("style.css".to_string())
        );
    }

    #[test]
    fn test_name_to_href() {
        let book = sample_book();
        assert_eq!(
            book.name_to_href("images/pic.png", "text/ch1.xhtml"),
            "../images/pic.png"
        );
        assert_eq!(book.name_to_href("style.css", "ch1.xhtml"), "style.css");
        assert_eq!(
            book.name_to_href("text/qr.png", "text/ch1.xhtml"),
            "qr.png"
        );
    }

    #[test]
    fn test_protection() {
        let mut book = sample_book();
        book.metadata.cover_image = Some("images/pic.png".to_string());
        assert!(book.is_protected("text/ch1.xhtml"));
        assert!(book.is_protected("images/pic.png"));
        assert!(!book.is_protected("style.css"));
    }

    #[test]
    fn test_display_title_series_fallback() {
        let mut book = Book::new();
        assert_eq!(book.display_title(), None);
        book.metadata.series = Some("Saga".to_string());
        assert_eq!(book.display_title(), Some("Saga".to_string()));
        book.metadata.series_index = Some(2.0);
        assert_eq!(book.display_title(), Some("Saga #2".to_string()));
        book.metadata.series_index = Some(2.5);
        assert_eq!(book.display_title(), Some("Saga #2.5".to_string()));
        book.metadata.title = "Demo".to_string();
        assert_eq!(book.display_title(), Some("Demo".to_string()));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut book = sample_book();
        assert!(!book.is_dirty("text/ch1.xhtml"));
        book.mark_dirty("text/ch1.xhtml");
        assert!(book.is_dirty("text/ch1.xhtml"));
        book.remove_resource("text/ch1.xhtml");
        assert!(!book.is_dirty("text/ch1.xhtml"));
    }
}
