//! Format selection, parsing (via Sophia) and file-level serialization.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use sophia::api::prelude::*;

use crate::error::RdfError;
use crate::graph::Graph;
use crate::term::{
    BlankId as RdfBlankId, Iri as RdfIri, Literal as RdfLiteral, Node as RdfNode, Term as RdfTerm,
};
use crate::vocab::XSD_STRING_IRI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    Turtle,
    NTriples,
}

impl RdfFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "ttl" | "turtle" => Some(Self::Turtle),
            "nt" | "ntriples" => Some(Self::NTriples),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Turtle => "Turtle",
            Self::NTriples => "N-Triples",
        }
    }
}

impl std::str::FromStr for RdfFormat {
    type Err = RdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "turtle" | "ttl" => Ok(Self::Turtle),
            "ntriples" | "n-triples" | "nt" => Ok(Self::NTriples),
            other => Err(RdfError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct ParseSinkError {
    message: String,
}

impl ParseSinkError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

enum ParsedTerm {
    Iri(String),
    Blank(String),
    Literal(RdfLiteral),
}

/// Decodes N-Triples `ECHAR` and `UCHAR` escapes in a literal body.
fn decode_escapes(body: &str) -> Result<String, ParseSinkError> {
    let mut decoded = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(at) = rest.find('\\') {
        decoded.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        let Some(marker) = tail.chars().next() else {
            return Err(ParseSinkError::new("dangling escape at end of literal"));
        };
        let (ch, used) = match marker {
            'n' => ('\n', 1),
            'r' => ('\r', 1),
            't' => ('\t', 1),
            'b' => ('\u{8}', 1),
            'f' => ('\u{c}', 1),
            '"' | '\'' | '\\' => (marker, 1),
            'u' => (code_point(tail, 4)?, 5),
            'U' => (code_point(tail, 8)?, 9),
            other => {
                return Err(ParseSinkError::new(format!(
                    "unknown escape \\{other} in literal"
                )))
            }
        };
        decoded.push(ch);
        rest = &tail[used..];
    }
    decoded.push_str(rest);
    Ok(decoded)
}

/// Reads the `digits` hex digits after a `u`/`U` marker.
fn code_point(tail: &str, digits: usize) -> Result<char, ParseSinkError> {
    let hex = tail
        .get(1..=digits)
        .filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| ParseSinkError::new(format!("truncated \\{} escape", &tail[..1])))?;
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| ParseSinkError::new(format!("escape \\{}{hex} is not a scalar value", &tail[..1])))
}

/// Parses a term from its N-Triples-style display form.
fn parse_term_display(term: &str) -> Result<ParsedTerm, ParseSinkError> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(ParsedTerm::Iri(rest.to_string()));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(ParsedTerm::Blank(rest.to_string()));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !escaped {
                end_quote = Some(i);
                break;
            }
            escaped = ch == '\\' && !escaped;
        }
        let Some(end) = end_quote else {
            return Err(ParseSinkError::new(format!(
                "invalid literal term (missing closing quote): {s}"
            )));
        };

        let lexical = decode_escapes(&s[1..end])?;
        let rest = s[end + 1..].trim();

        if let Some(lang) = rest.strip_prefix('@') {
            return Ok(ParsedTerm::Literal(RdfLiteral::with_language(lexical, lang)));
        }
        if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            if !dt.is_empty() && dt != XSD_STRING_IRI {
                return Ok(ParsedTerm::Literal(RdfLiteral::typed(lexical, RdfIri::new(dt))));
            }
        }
        return Ok(ParsedTerm::Literal(RdfLiteral::plain(lexical)));
    }

    Err(ParseSinkError::new(format!("unsupported RDF term form: {s}")))
}

/// Adds parsed statements to a graph, giving every blank-node label of this
/// one document a fresh id in `graph`.
struct ScopedSink<'g> {
    graph: &'g mut Graph,
    blanks: HashMap<String, RdfBlankId>,
    added: usize,
}

impl ScopedSink<'_> {
    fn node(&mut self, term: ParsedTerm) -> Result<RdfNode, ParseSinkError> {
        match term {
            ParsedTerm::Iri(iri) => Ok(RdfNode::Iri(RdfIri::new(iri))),
            ParsedTerm::Blank(label) => {
                let graph = &mut *self.graph;
                let id = *self
                    .blanks
                    .entry(label)
                    .or_insert_with(|| graph.fresh_blank());
                Ok(RdfNode::Blank(id))
            }
            ParsedTerm::Literal(lit) => Err(ParseSinkError::new(format!(
                "expected IRI/blank node, got literal: {:?}",
                lit.lexical()
            ))),
        }
    }

    fn statement(&mut self, s: &str, p: &str, o: &str) -> Result<(), ParseSinkError> {
        let subject = self.node(parse_term_display(s)?)?;
        let RdfNode::Iri(predicate) = self.node(parse_term_display(p)?)? else {
            return Ok(());
        };
        let object: RdfTerm = match parse_term_display(o)? {
            ParsedTerm::Literal(lit) => lit.into(),
            other => self.node(other)?.into(),
        };
        if self.graph.add(subject, &predicate, object) {
            self.added += 1;
        }
        Ok(())
    }
}

/// Parses one document into `graph`; returns the number of new triples.
pub fn parse_into<R: BufRead>(
    graph: &mut Graph,
    reader: R,
    format: RdfFormat,
) -> Result<usize, RdfError> {
    let mut sink = ScopedSink {
        graph,
        blanks: HashMap::new(),
        added: 0,
    };

    match format {
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> Result<(), ParseSinkError> {
                    sink.statement(&t.s().to_string(), &t.p().to_string(), &t.o().to_string())
                })
                .map_err(|e| RdfError::Parse {
                    format: format.name(),
                    message: e.to_string(),
                })?;
        }
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> Result<(), ParseSinkError> {
                    sink.statement(&t.s().to_string(), &t.p().to_string(), &t.o().to_string())
                })
                .map_err(|e| RdfError::Parse {
                    format: format.name(),
                    message: e.to_string(),
                })?;
        }
    }

    Ok(sink.added)
}

pub fn parse_file(graph: &mut Graph, path: &Path, format: RdfFormat) -> Result<usize, RdfError> {
    let file = File::open(path).map_err(|e| RdfError::io(path, e))?;
    let added = parse_into(graph, BufReader::new(file), format)?;
    tracing::debug!(path = %path.display(), format = format.name(), added, "parsed graph");
    Ok(added)
}

pub fn write_graph<W: Write>(graph: &Graph, out: W, format: RdfFormat) -> Result<(), RdfError> {
    match format {
        RdfFormat::Turtle => crate::turtle::write_turtle(graph, out),
        RdfFormat::NTriples => crate::ntriples::write_ntriples(graph, out),
    }
    .map_err(RdfError::Write)
}

pub fn write_file(graph: &Graph, path: &Path, format: RdfFormat) -> Result<(), RdfError> {
    let file = File::create(path).map_err(|e| RdfError::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_graph(graph, &mut out, format)?;
    out.flush().map_err(RdfError::Write)?;
    tracing::debug!(path = %path.display(), format = format.name(), triples = graph.len(), "wrote graph");
    Ok(())
}
