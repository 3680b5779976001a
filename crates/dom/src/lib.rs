pub mod entities;
pub mod parser;
pub mod selector;
pub mod serialize;
pub mod tokenizer;

mod types;

pub use parser::{ParsedDocument, is_full_document, parse_document, parse_fragment};
pub use selector::{Selector, SelectorList, closest, matches, select_all, select_first};
pub use serialize::{serialize_children, serialize_node};
pub use types::{Document, NodeId, NodeKind, RawId};
