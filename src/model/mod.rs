//! Resolved document model.
//!
//! Headers are siblings in source order. Scope is established by which kind
//! precedes which, so each header only carries a link to the nearest preceding
//! header of broader scope plus the nearest preceding `<control>`:
//!
//! - `<global>` resets the master and group cursors
//! - `<master>` inherits from the current global and resets the group cursor
//! - `<group>` inherits from the current master, else the global
//! - `<region>` inherits from the current group, else master, else global
//! - `<control>`, `<curve>`, `<effect>`, `<midi>` are independent scopes

use crate::diag::Position;
use crate::syntax::HeaderKind;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Index of a header inside its [`Document`].
pub type HeaderId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Macro-expanded, lowercased name.
    pub name: String,
    /// Macro-expanded value; undefined `$name` sigils are left in place.
    pub value: String,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct Header {
    pub kind: HeaderKind,
    pub position: Position,
    pub opcodes: Vec<Assignment>,
    /// Nearest preceding header of broader scope.
    pub parent: Option<HeaderId>,
    /// Nearest preceding `<control>` header.
    pub control: Option<HeaderId>,
}

impl Header {
    /// Last local assignment of `name`.
    pub fn get(&self, name: &str) -> Option<&Assignment> {
        self.opcodes.iter().rev().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub value: String,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct Document {
    root: PathBuf,
    headers: Vec<Header>,
    macros: Vec<Macro>,
}

impl Document {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn header(&self, id: HeaderId) -> Option<&Header> {
        self.headers.get(id)
    }

    /// Definitions in the order they were read.
    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    /// Every assignment with the header it belongs to, in source order.
    pub fn assignments(&self) -> impl Iterator<Item = (HeaderId, &Assignment)> {
        self.headers
            .iter()
            .enumerate()
            .flat_map(|(id, h)| h.opcodes.iter().map(move |a| (id, a)))
    }

    /// Effective value of `name` for a header: local first, then up the
    /// parent chain.
    pub fn lookup(&self, id: HeaderId, name: &str) -> Option<&Assignment> {
        let mut cursor = Some(id);
        while let Some(header) = cursor.and_then(|i| self.headers.get(i)) {
            if let Some(found) = header.get(name) {
                return Some(found);
            }
            cursor = header.parent;
        }
        None
    }

    pub fn control_of(&self, id: HeaderId) -> Option<&Header> {
        self.headers
            .get(id)
            .and_then(|h| h.control)
            .and_then(|c| self.headers.get(c))
    }

    /// Indices declared by `<curve>` headers.
    pub fn curve_indices(&self) -> BTreeSet<u32> {
        self.headers
            .iter()
            .filter(|h| h.kind == HeaderKind::Curve)
            .filter_map(|h| h.get("curve_index"))
            .filter_map(|a| a.value.trim().parse().ok())
            .collect()
    }
}

/// Linear-scan builder holding the scope cursors.
#[derive(Debug)]
pub struct DocumentBuilder {
    root: PathBuf,
    headers: Vec<Header>,
    macros: Vec<Macro>,
    global: Option<HeaderId>,
    master: Option<HeaderId>,
    group: Option<HeaderId>,
    control: Option<HeaderId>,
}

impl DocumentBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            headers: Vec::new(),
            macros: Vec::new(),
            global: None,
            master: None,
            group: None,
            control: None,
        }
    }

    pub fn open(&mut self, kind: HeaderKind, position: Position) -> HeaderId {
        let id = self.headers.len();
        let parent = match kind {
            HeaderKind::Global => {
                self.global = Some(id);
                self.master = None;
                self.group = None;
                None
            }
            HeaderKind::Master => {
                self.master = Some(id);
                self.group = None;
                self.global
            }
            HeaderKind::Group => {
                let parent = self.master.or(self.global);
                self.group = Some(id);
                parent
            }
            HeaderKind::Region => self.group.or(self.master).or(self.global),
            HeaderKind::Control => {
                self.control = Some(id);
                None
            }
            HeaderKind::Curve | HeaderKind::Effect | HeaderKind::Midi => None,
        };
        self.headers.push(Header {
            kind,
            position,
            opcodes: Vec::new(),
            parent,
            control: self.control,
        });
        id
    }

    /// The header assignments are currently appended to.
    pub fn current(&mut self) -> Option<&mut Header> {
        self.headers.last_mut()
    }

    pub fn define(&mut self, definition: Macro) {
        self.macros.push(definition);
    }

    pub fn finish(self) -> Document {
        Document {
            root: self.root,
            headers: self.headers,
            macros: self.macros,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(line: usize) -> Position {
        Position::new("x.sfz", line, 1)
    }

    fn assign(builder: &mut DocumentBuilder, name: &str, value: &str, line: usize) {
        if let Some(h) = builder.current() {
            h.opcodes.push(Assignment {
                name: name.to_string(),
                value: value.to_string(),
                position: at(line),
            });
        }
    }

    #[test]
    fn scope_follows_source_order() {
        let mut b = DocumentBuilder::new("x.sfz");
        let control = b.open(HeaderKind::Control, at(1));
        let global = b.open(HeaderKind::Global, at(2));
        let group = b.open(HeaderKind::Group, at(3));
        let region = b.open(HeaderKind::Region, at(4));
        let master = b.open(HeaderKind::Master, at(5));
        let orphan = b.open(HeaderKind::Region, at(6));
        let doc = b.finish();

        let parents: Vec<Option<HeaderId>> = doc.headers().iter().map(|h| h.parent).collect();
        assert_eq!(
            parents,
            vec![None, None, Some(global), Some(group), Some(global), Some(master)]
        );
        assert_eq!(doc.header(region).and_then(|h| h.control), Some(control));
        assert_eq!(doc.header(orphan).and_then(|h| h.control), Some(control));
    }

    #[test]
    fn new_global_resets_group() {
        let mut b = DocumentBuilder::new("x.sfz");
        b.open(HeaderKind::Group, at(1));
        let global = b.open(HeaderKind::Global, at(2));
        let region = b.open(HeaderKind::Region, at(3));
        let doc = b.finish();
        assert_eq!(doc.header(region).and_then(|h| h.parent), Some(global));
    }

    #[test]
    fn lookup_walks_parents_and_prefers_local() {
        let mut b = DocumentBuilder::new("x.sfz");
        b.open(HeaderKind::Global, at(1));
        assign(&mut b, "lokey", "10", 1);
        assign(&mut b, "hikey", "20", 1);
        b.open(HeaderKind::Group, at(2));
        assign(&mut b, "hikey", "30", 2);
        let region = b.open(HeaderKind::Region, at(3));
        assign(&mut b, "sample", "a.wav", 3);
        let doc = b.finish();

        assert_eq!(doc.lookup(region, "sample").map(|a| a.value.as_str()), Some("a.wav"));
        assert_eq!(doc.lookup(region, "hikey").map(|a| a.value.as_str()), Some("30"));
        assert_eq!(doc.lookup(region, "lokey").map(|a| a.value.as_str()), Some("10"));
        assert!(doc.lookup(region, "pan").is_none());
    }

    #[test]
    fn curve_indices_come_from_curve_headers() {
        let mut b = DocumentBuilder::new("x.sfz");
        b.open(HeaderKind::Curve, at(1));
        assign(&mut b, "curve_index", "9", 1);
        b.open(HeaderKind::Region, at(2));
        assign(&mut b, "curve_index", "12", 2);
        let doc = b.finish();
        assert_eq!(doc.curve_indices().into_iter().collect::<Vec<_>>(), vec![9]);
    }
}
