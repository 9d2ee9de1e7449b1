//! XHTML page parsing (quick-xml events -> arena tree).

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::dom::{Attr, NodeData, NodeId, PageDom};
use crate::error::Result;
use crate::util::{decode_text, extract_xml_encoding, strip_bom};

/// Parse a page's raw bytes into a [`PageDom`].
///
/// Entity references are kept as distinct nodes so a later serialization
/// does not mangle them. Namespace declarations on the root element are
/// collected into the page's `nsmap`.
pub fn parse_page(bytes: &[u8]) -> Result<PageDom> {
    let hint = extract_xml_encoding(bytes);
    let text = decode_text(strip_bom(bytes), hint);

    let mut reader = Reader::from_str(&text);
    let mut dom = PageDom::new();
    let document = dom.document();
    let mut stack: Vec<NodeId> = vec![document];

    loop {
        let parent = stack.last().copied().unwrap_or(document);
        match reader.read_event()? {
            Event::Decl(e) => {
                dom.xml_decl = Some(String::from_utf8_lossy(&e).into_owned());
            }
            Event::DocType(e) => {
                let body = String::from_utf8_lossy(e.as_ref()).trim_start().to_string();
                let node = dom.create_node(NodeData::Doctype(body));
                dom.append(parent, node);
            }
            Event::Start(e) => {
                let node = element_from_event(&mut dom, e.name().as_ref(), e.attributes());
                dom.append(parent, node);
                stack.push(node);
            }
            Event::Empty(e) => {
                let node = element_from_event(&mut dom, e.name().as_ref(), e.attributes());
                dom.append(parent, node);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(e) => {
                let node = dom.create_text(String::from_utf8_lossy(e.as_ref()));
                dom.append(parent, node);
            }
            Event::CData(e) => {
                let node = dom.create_text(String::from_utf8_lossy(e.as_ref()));
                dom.append(parent, node);
            }
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(e.as_ref()).into_owned();
                let node = dom.create_node(NodeData::EntityRef(name));
                dom.append(parent, node);
            }
            Event::Comment(e) => {
                let node =
                    dom.create_node(NodeData::Comment(String::from_utf8_lossy(e.as_ref()).into_owned()));
                dom.append(parent, node);
            }
            Event::PI(e) => {
                let node = dom.create_node(NodeData::ProcessingInstruction(
                    String::from_utf8_lossy(e.as_ref()).into_owned(),
                ));
                dom.append(parent, node);
            }
            Event::Eof => break,
        }
    }

    collect_nsmap(&mut dom);
    Ok(dom)
}

fn element_from_event(
    dom: &mut PageDom,
    name: &[u8],
    attributes: quick_xml::events::attributes::Attributes,
) -> NodeId {
    let name = String::from_utf8_lossy(name).into_owned();
    let mut attrs = Vec::new();
    for attr in attributes.flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(attr.value.as_ref()).into_owned();
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(unescaped) => unescaped.into_owned(),
            Err(_) => raw,
        };
        attrs.push(Attr { name: key, value });
    }
    dom.create_element(name, attrs)
}

/// Collect `xmlns` / `xmlns:prefix` declarations from the root element.
fn collect_nsmap(dom: &mut PageDom) {
    let root = match dom.root_element() {
        Some(id) => id,
        None => return,
    };
    let mut nsmap = Vec::new();
    if let Some(node) = dom.get(root) {
        if let NodeData::Element { attrs, .. } = &node.data {
            for attr in attrs {
                if attr.name == "xmlns" {
                    nsmap.push((String::new(), attr.value.clone()));
                } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                    nsmap.push((prefix.to_string(), attr.value.clone()));
                }
            }
        }
    }
    dom.nsmap.extend(nsmap);
}
