//! Arena tree -> XHTML bytes.

use crate::dom::{NodeData, NodeId, PageDom};

/// Serialize a page back to bytes.
///
/// Text and attribute values are re-escaped; empty elements are written
/// self-closed. The XML declaration, doctype, comments, processing
/// instructions and entity references survive a parse/serialize round trip.
pub fn serialize_page(dom: &PageDom) -> Vec<u8> {
    let mut out = String::new();
    if let Some(decl) = &dom.xml_decl {
        out.push_str("<?");
        out.push_str(decl);
        out.push_str("?>");
    }
    for child in dom.children(dom.document()) {
        write_node(dom, child, &mut out);
    }
    out.into_bytes()
}

fn write_node(dom: &PageDom, id: NodeId, out: &mut String) {
    let node = match dom.get(id) {
        Some(n) => n,
        None => return,
    };
    match &node.data {
        NodeData::Document => {}
        NodeData::Element { name, attrs } => {
            out.push('<');
            out.push_str(name);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape_attr(&attr.value));
                out.push('"');
            }
            if node.first_child.is_none() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in dom.children(id) {
                    write_node(dom, child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::EntityRef(name) => {
            out.push('&');
            out.push_str(name);
            out.push(';');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Doctype(body) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(body);
            out.push('>');
        }
        NodeData::ProcessingInstruction(body) => {
            out.push_str("<?");
            out.push_str(body);
            out.push_str("?>");
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
