//! Chapter-content probability heuristic.
//!
//! Scores how likely a page is to be a real content chapter, as opposed to
//! a cover or illustration gallery. The constants live in [`ScoreConfig`];
//! they are tuned values, not derived ones.

use tracing::debug;

use crate::book::Book;
use crate::config::ScoreConfig;
use crate::dom::{parse_page, PageDom};

/// Filter `names` down to the pages that look like content chapters.
pub fn probable_chapters(book: &Book, names: &[String], cfg: &ScoreConfig) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            let score = chapter_probability(book, name, cfg);
            debug!(page = %name, score, "content probability");
            score >= cfg.min_score
        })
        .cloned()
        .collect()
}

/// Probability in [0, 1] that `name` is a chapter with textual content.
///
/// Pages that fail to parse score 0.
pub fn chapter_probability(book: &Book, name: &str, cfg: &ScoreConfig) -> f32 {
    let raw = match book.raw_data(name) {
        Some(raw) => raw,
        None => return 0.0,
    };

    let mut score = cfg.base;
    if raw.len() >= cfg.large_page_bytes {
        // Quite positive it is a chapter
        return score;
    }

    let dom = match parse_page(raw) {
        Ok(dom) => dom,
        Err(_) => return 0.0,
    };

    if dom.has_epub_ns() {
        score += cfg.semantic_bonus;
        score -= cfg.introduction_penalty * introduction_count(&dom) as f32;
    }

    // Score down pages which look like an illustration gallery
    let images = image_element_count(&dom);
    if images == 0 {
        score += cfg.no_image_bonus;
    } else {
        score -= images as f32 / raw.len() as f32 * cfg.image_density_scale;
    }

    score.clamp(0.0, 1.0)
}

/// Number of elements typed `introduction` (case-insensitive).
fn introduction_count(dom: &PageDom) -> usize {
    dom.descendants(dom.document())
        .filter(|&id| {
            dom.get_attr(id, "epub:type")
                .is_some_and(|t| t.eq_ignore_ascii_case("introduction"))
        })
        .count()
}

/// Number of `svg`/`img` elements, namespace-agnostic.
pub fn image_element_count(dom: &PageDom) -> usize {
    dom.descendants(dom.document())
        .filter(|&id| {
            dom.element_local_name(id)
                .is_some_and(|local| local == "svg" || local == "img")
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_page(content: &str) -> Book {
        let mut book = Book::new();
        book.add_resource(
            "ch1.xhtml",
            content.as_bytes().to_vec(),
            "application/xhtml+xml",
        );
        book.add_spine_item("ch1", "ch1.xhtml", "application/xhtml+xml");
        book
    }

    fn score_of(content: &str) -> f32 {
        chapter_probability(&book_with_page(content), "ch1.xhtml", &ScoreConfig::default())
    }

    #[test]
    fn test_large_page_scores_base() {
        let filler = "x".repeat(11000);
        let page = format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body><img src=\"a.png\"/>{}</body></html>",
            filler
        );
        // Markup content is irrelevant past the size gate
        assert_eq!(score_of(&page), 0.8);
    }

    #[test]
    fn test_plain_text_page_scores_one() {
        // No epub namespace, no images: 0.8 + 0.3 clamped to 1.0
        let page = "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body><p>Words.</p></body></html>";
        assert_eq!(score_of(page), 1.0);
    }

    #[test]
    fn test_introduction_penalty() {
        // 0.8 + 0.3 (ns) - 0.7 (introduction) + 0.3 (no images) = 0.7
        let page = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body><section epub:type="Introduction"><p>Intro.</p></section></body></html>"#;
        assert!((score_of(page) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_image_gallery_scores_low() {
        let mut imgs = String::new();
        for i in 0..20 {
            imgs.push_str(&format!("<img src=\"p{}.png\"/>", i));
        }
        let page = format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body>{}</body></html>",
            imgs
        );
        let score = score_of(&page);
        assert!(score < 0.3, "gallery scored {}", score);
    }

    #[test]
    fn test_unparseable_page_scores_zero() {
        assert_eq!(score_of("<html><body></html>"), 0.0);
    }

    #[test]
    fn test_probable_chapters_filters() {
        let mut book = Book::new();
        book.add_resource(
            "good.xhtml",
            b"<html><body><p>Text</p></body></html>".to_vec(),
            "application/xhtml+xml",
        );
        let mut gallery = String::from("<html><body>");
        for i in 0..30 {
            gallery.push_str(&format!("<img src=\"{}.png\"/>", i));
        }
        gallery.push_str("</body></html>");
        book.add_resource(
            "gallery.xhtml",
            gallery.into_bytes(),
            "application/xhtml+xml",
        );

        let names = vec!["good.xhtml".to_string(), "gallery.xhtml".to_string()];
        let kept = probable_chapters(&book, &names, &ScoreConfig::default());
        assert_eq!(kept, vec!["good.xhtml"]);
    }

    proptest::proptest! {
        #[test]
        fn score_always_clamped(body in "[a-zA-Z <>/=\"]{0,400}") {
            let page = format!("<html><body><p>{}</p></body></html>", body);
            let score = score_of(&page);
            proptest::prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
