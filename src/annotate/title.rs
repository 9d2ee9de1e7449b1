//! Chapter title resolution.

use crate::dom::PageDom;
use crate::util::basename;

const TITLE_HEADINGS: &[&str] = &["h1", "h2", "h3", "h4"];

/// Best-effort display title for one page. Never empty.
///
/// Precedence, first non-empty match wins:
/// 1. `h1`..`h4` (in that order) typed `epub:type="title"`, rendered text;
/// 2. any element typed `epub:type="chapter"` with a non-empty `title`
///    attribute, trimmed;
/// 3. any `<title>` element with non-empty text;
/// 4. `h1`..`h4` without the semantic requirement;
/// 5. the entry's filename.
pub fn chapter_title(dom: &PageDom, name: &str) -> String {
    if dom.has_epub_ns() {
        for heading in TITLE_HEADINGS {
            if let Some(title) = rendered_heading(dom, heading, true) {
                return title;
            }
        }
        for id in dom.descendants(dom.document()) {
            if dom.get_attr(id, "epub:type") != Some("chapter") {
                continue;
            }
            if let Some(title) = dom.get_attr(id, "title") {
                let title = title.trim();
                if !title.is_empty() {
                    return title.to_string();
                }
            }
        }
    }

    for id in dom.descendants(dom.document()) {
        if dom.element_local_name(id) != Some("title") {
            continue;
        }
        let text = dom.rendered_text(id);
        if !text.is_empty() {
            return text;
        }
    }

    for heading in TITLE_HEADINGS {
        if let Some(title) = rendered_heading(dom, heading, false) {
            return title;
        }
    }

    basename(name).to_string()
}

/// Rendered text of the first matching heading, if non-empty.
fn rendered_heading(dom: &PageDom, heading: &str, require_semantic: bool) -> Option<String> {
    let id = dom.descendants(dom.document()).find(|&id| {
        dom.element_local_name(id) == Some(heading)
            && (!require_semantic || dom.get_attr(id, "epub:type") == Some("title"))
    })?;
    let text = dom.rendered_text(id);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_page;

    const EPUB_NS: &str =
        r#"xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops""#;

    fn title_of(page: &str) -> String {
        let dom = parse_page(page.as_bytes()).unwrap();
        chapter_title(&dom, "text/ch1.xhtml")
    }

    #[test]
    fn test_semantic_heading_beats_title_tag() {
        let page = format!(
            r#"<html {}>
<head><title>File Title</title></head>
<body><h1 epub:type="title">Chapter One</h1></body>
</html>"#,
            EPUB_NS
        );
        assert_eq!(title_of(&page), "Chapter One");
    }

    #[test]
    fn test_h1_priority_over_earlier_h2() {
        // h2 appears first in the document, h1 still wins
        let page = format!(
            r#"<html {}>
<body><h2 epub:type="title">Sub</h2><h1 epub:type="title">Main</h1></body>
</html>"#,
            EPUB_NS
        );
        assert_eq!(title_of(&page), "Main");
    }

    #[test]
    fn test_chapter_type_title_attribute() {
        let page = format!(
            r#"<html {}>
<body><section epub:type="chapter" title="  The Journey "><p>x</p></section></body>
</html>"#,
            EPUB_NS
        );
        assert_eq!(title_of(&page), "The Journey");
    }

    #[test]
    fn test_title_tag_fallback() {
        let page = r#"<html xmlns="http://www.w3.org/1999/xhtml">
<head><title> Page Nine </title></head><body><p>x</p></body></html>"#;
        assert_eq!(title_of(page), "Page Nine");
    }

    #[test]
    fn test_plain_heading_fallback() {
        let page = r#"<html xmlns="http://www.w3.org/1999/xhtml">
<body><h3>Down <span>the</span> Rabbit Hole</h3></body></html>"#;
        assert_eq!(title_of(page), "Down the Rabbit Hole");
    }

    #[test]
    fn test_filename_fallback() {
        let page = r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p>x</p></body></html>"#;
        assert_eq!(title_of(page), "ch1.xhtml");
    }

    #[test]
    fn test_empty_semantic_heading_skipped() {
        let page = format!(
            r#"<html {}>
<head><title>Real</title></head>
<body><h1 epub:type="title"></h1></body></html>"#,
            EPUB_NS
        );
        assert_eq!(title_of(&page), "Real");
    }
}
