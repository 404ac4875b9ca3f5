//! Line-oriented N-Triples writer.

use std::io::{self, Write};

use crate::graph::Graph;
use crate::term::{Literal, Node, Term};
use crate::vocab::XSD_STRING_IRI;

pub fn write_ntriples<W: Write>(graph: &Graph, mut out: W) -> io::Result<()> {
    for triple in graph.iter() {
        write_node(&mut out, &triple.subject)?;
        write!(out, " <{}> ", escape_iri(triple.predicate.as_str()))?;
        match &triple.object {
            Term::Node(node) => write_node(&mut out, node)?,
            Term::Literal(lit) => write_literal(&mut out, lit, |w, dt| {
                write!(w, "<{}>", escape_iri(dt))
            })?,
        }
        out.write_all(b" .\n")?;
    }
    out.flush()
}

fn write_node<W: Write>(out: &mut W, node: &Node) -> io::Result<()> {
    match node {
        Node::Iri(iri) => write!(out, "<{}>", escape_iri(iri.as_str())),
        Node::Blank(id) => write!(out, "_:{id}"),
    }
}

/// Writes a literal; `write_datatype` renders the datatype IRI so Turtle can
/// compact it.
pub(crate) fn write_literal<W, F>(out: &mut W, lit: &Literal, write_datatype: F) -> io::Result<()>
where
    W: Write,
    F: FnOnce(&mut W, &str) -> io::Result<()>,
{
    write!(out, "\"{}\"", escape_literal(lit.lexical()))?;
    if let Some(lang) = lit.language() {
        write!(out, "@{lang}")?;
    } else if let Some(dt) = lit.datatype() {
        if dt.as_str() != XSD_STRING_IRI {
            out.write_all(b"^^")?;
            write_datatype(out, dt.as_str())?;
        }
    }
    Ok(())
}

pub(crate) fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_iri(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c if (c as u32) <= 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
