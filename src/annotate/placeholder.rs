//! Insertion-node management and prior-marker cleanup.

use tracing::debug;

use crate::book::Book;
use crate::config::Prefs;
use crate::dom::{Attr, NodeId, PageDom};
use crate::error::{Error, Result};

/// Locate or create the insertion node for a page, removing any marker
/// left behind by a previous run first.
///
/// The returned node always carries `id` and `class` attributes and the
/// page is marked dirty. Fails with a per-page abort when a node has to be
/// created but the page has no `body` element.
pub fn prepare_node(
    book: &mut Book,
    dom: &mut PageDom,
    name: &str,
    prefs: &Prefs,
) -> Result<NodeId> {
    let existing = find_insertion_node(dom, prefs);
    remove_previous_marker(book, dom, name, existing, prefs);
    create_placeholder(book, dom, name, existing, prefs)
}

/// First element (document order) whose `id` is one of the accepted
/// identifiers.
fn find_insertion_node(dom: &PageDom, prefs: &Prefs) -> Option<NodeId> {
    dom.find_element(|_, attrs| {
        attrs
            .iter()
            .any(|a| a.name == "id" && prefs.node_element_id.iter().any(|id| *id == a.value))
    })
}

/// Remove a previously generated marker.
///
/// The deterministic marker asset for this page is always deregistered,
/// referenced or not, so repeated runs never accumulate orphans. When an
/// insertion node exists, the first `img` below it is resolved and its
/// asset deregistered as well, unless the document still needs that entry.
fn remove_previous_marker(
    book: &mut Book,
    dom: &PageDom,
    name: &str,
    node: Option<NodeId>,
    prefs: &Prefs,
) {
    let marker = prefs.marker_name(name);
    if book.remove_resource(&marker) {
        debug!(page = %name, asset = %marker, "removed stale marker asset");
    }

    let node = match node {
        Some(node) => node,
        None => return,
    };

    for id in dom.descendants(node) {
        if dom.element_local_name(id) != Some("img") {
            continue;
        }
        if let Some(src) = dom.get_attr(id, "src") {
            if let Some(target) = book.href_to_name(src, name) {
                if !book.is_protected(&target) && book.remove_resource(&target) {
                    debug!(page = %name, asset = %target, "removed linked marker image");
                }
            }
        }
        // Only the first image is ours to clean up
        break;
    }
}

fn create_placeholder(
    book: &mut Book,
    dom: &mut PageDom,
    name: &str,
    existing: Option<NodeId>,
    prefs: &Prefs,
) -> Result<NodeId> {
    if let Some(node) = existing {
        if dom.get_attr(node, "id").is_none() {
            dom.set_attr(node, "id", prefs.primary_id());
        }
        if dom.get_attr(node, "class").is_none() {
            dom.set_attr(node, "class", prefs.primary_id());
        }
        book.mark_dirty(name);
        return Ok(node);
    }

    let body = dom
        .find_element(|tag, _| crate::dom::local_name(tag) == "body")
        .ok_or_else(|| {
            Error::abort(format!(
                "{} does not have a <body> tag, please check the book before annotating.",
                name
            ))
        })?;

    let node = dom.create_element(
        prefs.node_element_tagname.clone(),
        vec![
            Attr {
                name: "id".into(),
                value: prefs.primary_id().to_string(),
            },
            Attr {
                name: "class".into(),
                value: prefs.primary_id().to_string(),
            },
        ],
    );
    dom.append(body, node);
    let tail = dom.create_text("\n");
    dom.append(body, tail);

    if let Some(ref epub_type) = prefs.node_element_type {
        if dom.has_epub_ns() {
            dom.set_attr(node, "epub:type", epub_type);
        }
    }

    book.mark_dirty(name);
    Ok(node)
}
