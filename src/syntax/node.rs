use crate::spec::Version;
use std::fmt;
use std::str::FromStr;

/// 1-based line/column of a node in its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeaderKind {
    Region,
    Group,
    Control,
    Global,
    Curve,
    Effect,
    Master,
    Midi,
}

impl HeaderKind {
    pub const ALL: [HeaderKind; 8] = [
        HeaderKind::Region,
        HeaderKind::Group,
        HeaderKind::Control,
        HeaderKind::Global,
        HeaderKind::Curve,
        HeaderKind::Effect,
        HeaderKind::Master,
        HeaderKind::Midi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HeaderKind::Region => "region",
            HeaderKind::Group => "group",
            HeaderKind::Control => "control",
            HeaderKind::Global => "global",
            HeaderKind::Curve => "curve",
            HeaderKind::Effect => "effect",
            HeaderKind::Master => "master",
            HeaderKind::Midi => "midi",
        }
    }

    /// First format revision that introduced the header.
    pub fn version(self) -> Version {
        match self {
            HeaderKind::Region | HeaderKind::Group => Version::V1,
            HeaderKind::Control | HeaderKind::Global | HeaderKind::Curve | HeaderKind::Effect => {
                Version::V2
            }
            HeaderKind::Master | HeaderKind::Midi => Version::Aria,
        }
    }

    /// Headers that may appear at most once per document.
    pub fn is_single(self) -> bool {
        matches!(
            self,
            HeaderKind::Control | HeaderKind::Global | HeaderKind::Midi
        )
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeaderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// One element of a parsed file, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Header {
        kind: HeaderKind,
        span: Span,
    },
    Opcode {
        name: String,
        value: String,
        span: Span,
    },
    Define {
        name: String,
        value: String,
        span: Span,
    },
    Include {
        path: String,
        span: Span,
    },
}
