//! In-memory XML tree for one parsed page.
//!
//! Pages are parsed into an arena-allocated tree, mutated in place, and
//! serialized back to bytes. The tree keeps everything a round trip needs:
//! the XML declaration, doctype, comments, processing instructions, and
//! entity references.

mod arena;
mod parser;
mod serializer;

pub use arena::{Attr, ChildrenIter, DescendantsIter, Node, NodeData, NodeId, PageDom};
pub use parser::parse_page;
pub use serializer::serialize_page;

/// Local part of a possibly prefixed XML name (`epub:type` -> `type`).
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
