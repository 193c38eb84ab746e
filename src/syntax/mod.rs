//! Surface grammar: raw sfz text into a flat list of header, opcode and
//! directive nodes.

pub mod node;
pub mod parse;

pub use node::{HeaderKind, Node, Span};
pub use parse::Parser;
