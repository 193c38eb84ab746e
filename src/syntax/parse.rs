use crate::error::SyntaxError;
use crate::syntax::node::{HeaderKind, Node, Span};
use regex::{Captures, Regex};

/// Line scanner for the sfz surface grammar.
///
/// Comments are blanked first (keeping every newline and column in place),
/// then each line is scanned left to right for directives, header tags and
/// `name=value` pairs.
#[derive(Debug, Clone)]
pub struct Parser {
    define: Regex,
    include: Regex,
    header: Regex,
    opcode: Regex,
    value_end: Regex,
}

impl Parser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            define: Regex::new(r"^\s*#define\s+\$([A-Za-z0-9_]+)(?:\s+(.*?))?\s*$")?,
            include: Regex::new(r#"^\s*#include\s+(?:"([^"]*)"|(\S+))\s*$"#)?,
            header: Regex::new(r"^<([^<>\s]*)>")?,
            opcode: Regex::new(r"^([A-Za-z0-9_$]+)=")?,
            // A value runs until the next `name=` or header tag.
            value_end: Regex::new(r"\s+[A-Za-z0-9_$]+=|<[^<>\s]*>")?,
        })
    }

    pub fn parse(&self, text: &str) -> Result<Vec<Node>, SyntaxError> {
        let text = blank_comments(text)?;

        let mut nodes = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let lno = lineno + 1;
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            let span = Span::new(lno, column_of(line, line.len() - trimmed.len()));

            if trimmed.starts_with("#define") {
                let caps = self
                    .define
                    .captures(line)
                    .ok_or_else(|| SyntaxError::new(lno, span.column, "malformed #define"))?;
                nodes.push(Node::Define {
                    name: group(&caps, 1).to_string(),
                    value: group(&caps, 2).to_string(),
                    span,
                });
                continue;
            }

            if trimmed.starts_with("#include") {
                let caps = self
                    .include
                    .captures(line)
                    .ok_or_else(|| SyntaxError::new(lno, span.column, "malformed #include"))?;
                let path = match caps.get(1) {
                    Some(quoted) => quoted.as_str(),
                    None => group(&caps, 2),
                };
                nodes.push(Node::Include {
                    path: path.to_string(),
                    span,
                });
                continue;
            }

            self.scan_line(line, lno, &mut nodes)?;
        }

        Ok(nodes)
    }

    fn scan_line(&self, line: &str, lno: usize, nodes: &mut Vec<Node>) -> Result<(), SyntaxError> {
        let mut pos = 0;
        while pos < line.len() {
            let rest = &line[pos..];
            let skipped = rest.len() - rest.trim_start().len();
            if skipped > 0 {
                pos += skipped;
                continue;
            }

            let span = Span::new(lno, column_of(line, pos));

            if let Some(caps) = self.header.captures(rest) {
                let name = group(&caps, 1);
                let kind = name.parse::<HeaderKind>().map_err(|_| {
                    SyntaxError::new(lno, span.column, format!("unknown header <{}>", name))
                })?;
                nodes.push(Node::Header { kind, span });
                pos += caps.get(0).map_or(rest.len(), |m| m.end());
                continue;
            }

            if let Some(caps) = self.opcode.captures(rest) {
                let head = caps.get(0).map_or(rest.len(), |m| m.end());
                let after = &rest[head..];
                let value_len = self.value_end.find(after).map_or(after.len(), |m| m.start());
                nodes.push(Node::Opcode {
                    name: group(&caps, 1).to_string(),
                    value: unquote(after[..value_len].trim()).to_string(),
                    span,
                });
                pos += head + value_len;
                continue;
            }

            return Err(SyntaxError::new(lno, span.column, "unexpected input"));
        }
        Ok(())
    }
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn column_of(line: &str, byte: usize) -> usize {
    line[..byte].chars().count() + 1
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Replace `//` and `/* */` comments with spaces.
fn blank_comments(text: &str) -> Result<String, SyntaxError> {
    enum State {
        Code,
        Line,
        Block(Span),
    }

    fn blank(c: char) -> char {
        if c == '\n' || c == '\r' { c } else { ' ' }
    }

    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let (mut line, mut column) = (1, 1);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => {
                if c == '/' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    column += 2;
                    state = State::Line;
                    continue;
                }
                if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Block(Span::new(line, column));
                    column += 2;
                    continue;
                }
                out.push(c);
            }
            State::Line => {
                out.push(blank(c));
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::Block(_) => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    column += 2;
                    state = State::Code;
                    continue;
                }
                out.push(blank(c));
            }
        }

        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    if let State::Block(start) = state {
        return Err(SyntaxError::new(
            start.line,
            start.column,
            "unterminated block comment",
        ));
    }
    Ok(out)
}
