//! Line-oriented N-Triples / N-Quads reader.
//!
//! One statement per line: subject, predicate, object, optional graph,
//! terminating `.`. Covers IRIs, blank nodes, and plain, language-tagged
//! and typed literals with the usual string escapes. Malformed lines are
//! logged and skipped; this is not a conformant RDF parser.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

use quadload_core::statement::RDF_LANG_STRING;
use quadload_core::{Object, Statement, StatementHandler, is_shutdown_requested};

/// Read buffer size for input files
const READ_BUFFER: usize = 1 << 20;

/// Malformed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

fn err<T>(msg: impl Into<String>) -> Result<T, ParseError> {
    Err(ParseError(msg.into()))
}

/// Counters for one pass over the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub lines: u64,
    pub statements: u64,
    pub skipped: u64,
    /// Reading stopped early on a shutdown request
    pub interrupted: bool,
}

/// Open `path` for reading; `-` is stdin, `*.gz` is decompressed on the fly.
pub fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::with_capacity(READ_BUFFER, io::stdin())));
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
    let gz = path.extension().is_some_and(|ext| ext == "gz");
    Ok(if gz {
        Box::new(BufReader::with_capacity(READ_BUFFER, MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(READ_BUFFER, file))
    })
}

/// Push every statement in `reader` into `handler`.
///
/// `on_end` runs even when reading fails midway, so batches already handed
/// out are still written and the store is closed.
pub fn read_statements<R: BufRead, H: StatementHandler>(
    reader: R,
    handler: &mut H,
) -> Result<SourceStats> {
    let mut stats = SourceStats::default();
    handler.on_start();
    let res = pump(reader, handler, &mut stats);
    handler.on_end();
    res.map(|()| stats)
}

fn pump<R: BufRead, H: StatementHandler>(
    mut reader: R,
    handler: &mut H,
    stats: &mut SourceStats,
) -> Result<()> {
    let mut buf = Vec::with_capacity(4096);
    loop {
        if is_shutdown_requested() {
            log::warn!("Shutdown requested, stopping after {} lines", stats.lines);
            stats.interrupted = true;
            break;
        }
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read line {}", stats.lines + 1))?;
        if n == 0 {
            break;
        }
        stats.lines += 1;
        let parsed = match std::str::from_utf8(&buf) {
            Ok(line) => parse_line(line),
            Err(e) => err(format!("invalid UTF-8: {e}")),
        };
        match parsed {
            Ok(Some(st)) => {
                stats.statements += 1;
                handler.handle(st);
            }
            Ok(None) => {}
            Err(e) => {
                stats.skipped += 1;
                log::warn!("line {}: {e}, skipping", stats.lines);
            }
        }
    }
    Ok(())
}

/// Parse one line. Blank lines and comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Statement>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut cur = Cursor { rest: line };
    let subject = cur.resource("subject")?;
    let predicate = cur.iri("predicate")?;
    let object = cur.object()?;

    cur.skip_ws();
    let graph = if cur.rest.starts_with(['<', '_']) {
        Some(cur.resource("graph")?)
    } else {
        None
    };

    cur.skip_ws();
    if cur.rest != "." {
        return err(format!("expected '.' at end of statement, got {:?}", cur.rest));
    }

    let st = Statement::new(subject, predicate, object);
    Ok(Some(match graph {
        Some(g) => st.in_graph(g),
        None => st,
    }))
}

struct Cursor<'a> {
    rest: &'a str,
}

impl Cursor<'_> {
    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// `<iri>` or `_:label`
    fn resource(&mut self, what: &str) -> Result<String, ParseError> {
        self.skip_ws();
        if self.rest.starts_with("_:") {
            Ok(self.blank_node())
        } else {
            self.iri(what)
        }
    }

    fn iri(&mut self, what: &str) -> Result<String, ParseError> {
        self.skip_ws();
        let Some(body) = self.rest.strip_prefix('<') else {
            return err(format!("expected '<' for {what} IRI"));
        };
        let Some(end) = body.find('>') else {
            return err(format!("missing closing '>' for {what} IRI"));
        };
        let iri = &body[..end];
        if iri.contains(char::is_whitespace) {
            return err(format!("whitespace in {what} IRI"));
        }
        self.rest = &body[end + 1..];
        if iri.contains('\\') {
            unescape(iri)
        } else {
            Ok(iri.to_string())
        }
    }

    fn blank_node(&mut self) -> String {
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || c == '<' || c == '"')
            .unwrap_or(self.rest.len());
        let mut label = &self.rest[..end];
        // `_:b1.` at end of line: the dot terminates the statement
        if end == self.rest.len() {
            label = label.strip_suffix('.').unwrap_or(label);
        }
        self.rest = &self.rest[label.len()..];
        label.to_string()
    }

    fn object(&mut self) -> Result<Object, ParseError> {
        self.skip_ws();
        if self.rest.starts_with('"') {
            self.literal()
        } else {
            self.resource("object").map(Object::Iri)
        }
    }

    fn literal(&mut self) -> Result<Object, ParseError> {
        let body = &self.rest[1..];
        let mut escaped = false;
        let mut close = None;
        for (i, c) in body.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    close = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let Some(close) = close else {
            return err("unterminated literal");
        };
        let lexical = unescape(&body[..close])?;
        self.rest = &body[close + 1..];

        if let Some(tag) = self.rest.strip_prefix('@') {
            let end = tag
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                .unwrap_or(tag.len());
            if end == 0 {
                return err("empty language tag");
            }
            self.rest = &tag[end..];
            Ok(Object::literal(lexical, RDF_LANG_STRING))
        } else if let Some(dt) = self.rest.strip_prefix("^^") {
            self.rest = dt;
            let datatype = self.iri("datatype")?;
            Ok(Object::literal(lexical, datatype))
        } else {
            Ok(Object::string(lexical))
        }
    }
}

/// Resolve N-Triples string escapes (`\t`, `\n`, `\"`, `\uXXXX`, ...)
fn unescape(s: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next() {
            Some('t') => '\t',
            Some('b') => '\u{8}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('f') => '\u{c}',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some('u') => hex_char(&mut chars, 4)?,
            Some('U') => hex_char(&mut chars, 8)?,
            Some(other) => return err(format!("invalid escape '\\{other}'")),
            None => return err("dangling '\\'"),
        };
        out.push(decoded);
    }
    Ok(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, len: usize) -> Result<char, ParseError> {
    let digits: String = chars.take(len).collect();
    if digits.len() != len {
        return err("truncated unicode escape");
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .map_or_else(|| err(format!("invalid unicode escape '{digits}'")), Ok)
}
