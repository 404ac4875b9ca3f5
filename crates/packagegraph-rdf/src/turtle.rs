//! Turtle writer and textual Turtle concatenation.
//!
//! Blank nodes that are referenced exactly once (and are not part of a
//! reference cycle) are written inline as `[ ... ]`. The pipeline only ever
//! produces such nodes (dependency relations, changelog entries), which is
//! what makes textual concatenation of independently written documents safe:
//! there are no `_:` labels that could collide across files.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::error::RdfError;
use crate::graph::Graph;
use crate::ntriples::{escape_iri, write_literal};
use crate::term::{BlankId, Iri, Node, Term, Triple};
use crate::vocab::RDF_TYPE_IRI;

pub fn write_turtle<W: Write>(graph: &Graph, mut out: W) -> io::Result<()> {
    let mut by_subject: BTreeMap<&Node, Vec<&Triple>> = BTreeMap::new();
    for triple in graph.iter() {
        by_subject.entry(&triple.subject).or_default().push(triple);
    }
    let inline = inline_blank_nodes(graph);

    let mut used_prefixes = false;
    for (prefix, ns) in graph.prefixes() {
        writeln!(out, "@prefix {prefix}: <{}> .", escape_iri(ns))?;
        used_prefixes = true;
    }
    if used_prefixes {
        writeln!(out)?;
    }

    let writer = TurtleWriter {
        graph,
        by_subject: &by_subject,
        inline: &inline,
    };
    for (subject, triples) in &by_subject {
        if let Node::Blank(id) = subject {
            if inline.contains(id) {
                continue;
            }
        }
        writer.write_subject(&mut out, subject)?;
        out.write_all(b"\n    ")?;
        writer.write_predicate_objects(&mut out, triples, "\n    ")?;
        out.write_all(b" .\n\n")?;
    }
    out.flush()
}

struct TurtleWriter<'a> {
    graph: &'a Graph,
    by_subject: &'a BTreeMap<&'a Node, Vec<&'a Triple>>,
    inline: &'a HashSet<BlankId>,
}

impl TurtleWriter<'_> {
    fn write_subject<W: Write>(&self, out: &mut W, node: &Node) -> io::Result<()> {
        match node {
            Node::Iri(iri) => self.write_iri(out, iri),
            Node::Blank(id) => write!(out, "_:{id}"),
        }
    }

    fn write_iri<W: Write>(&self, out: &mut W, iri: &Iri) -> io::Result<()> {
        self.write_iri_str(out, iri.as_str())
    }

    fn write_iri_str<W: Write>(&self, out: &mut W, iri: &str) -> io::Result<()> {
        match self.graph.compact(iri) {
            Some((prefix, local)) => write!(out, "{prefix}:{local}"),
            None => write!(out, "<{}>", escape_iri(iri)),
        }
    }

    fn write_predicate_objects<W: Write>(
        &self,
        out: &mut W,
        triples: &[&Triple],
        separator: &str,
    ) -> io::Result<()> {
        let mut by_predicate: Vec<(&Iri, Vec<&Term>)> = Vec::new();
        for triple in triples {
            let continues = by_predicate
                .last()
                .is_some_and(|(p, _)| *p == &triple.predicate);
            match by_predicate.last_mut() {
                Some((_, objects)) if continues => objects.push(&triple.object),
                _ => by_predicate.push((&triple.predicate, vec![&triple.object])),
            }
        }

        for (i, (predicate, objects)) in by_predicate.iter().enumerate() {
            if i > 0 {
                write!(out, " ;{separator}")?;
            }
            if predicate.as_str() == RDF_TYPE_IRI {
                out.write_all(b"a")?;
            } else {
                self.write_iri(out, predicate)?;
            }
            out.write_all(b" ")?;
            for (j, object) in objects.iter().enumerate() {
                if j > 0 {
                    out.write_all(b", ")?;
                }
                self.write_object(out, object)?;
            }
        }
        Ok(())
    }

    fn write_object<W: Write>(&self, out: &mut W, term: &Term) -> io::Result<()> {
        match term {
            Term::Node(Node::Blank(id)) if self.inline.contains(id) => {
                let key = Node::Blank(*id);
                match self.by_subject.get(&key) {
                    Some(triples) => {
                        out.write_all(b"[ ")?;
                        self.write_predicate_objects(out, triples, " ")?;
                        out.write_all(b" ]")
                    }
                    None => out.write_all(b"[]"),
                }
            }
            Term::Node(node) => self.write_subject(out, node),
            Term::Literal(lit) => {
                write_literal(out, lit, |w, dt| self.write_iri_str(w, dt))
            }
        }
    }
}

/// Blank nodes that can be written as `[ ... ]`: exactly one incoming
/// reference and no cycle back to themselves through other inline nodes.
fn inline_blank_nodes(graph: &Graph) -> HashSet<BlankId> {
    let mut incoming: HashMap<BlankId, usize> = HashMap::new();
    let mut parent: HashMap<BlankId, &Node> = HashMap::new();
    for triple in graph.iter() {
        if let Some(id) = triple.object.as_blank() {
            *incoming.entry(id).or_default() += 1;
            parent.insert(id, &triple.subject);
        }
    }

    let candidates: HashSet<BlankId> = incoming
        .into_iter()
        .filter_map(|(id, count)| (count == 1).then_some(id))
        .collect();

    candidates
        .iter()
        .copied()
        .filter(|&start| {
            let mut current = start;
            let mut steps = 0usize;
            loop {
                match parent.get(&current) {
                    Some(Node::Blank(up)) if candidates.contains(up) => {
                        if *up == start || steps > candidates.len() {
                            return false;
                        }
                        current = *up;
                        steps += 1;
                    }
                    _ => return true,
                }
            }
        })
        .collect()
}

/// Concatenates Turtle documents textually, without parsing them.
///
/// Prefix declarations at the head of each input are collected and written
/// once at the head of the output; everything after an input's prefix block is
/// copied verbatim. When all inputs bind the same prefixes this is exactly
/// "keep the prefixes of the first file". Conflicting bindings for the same
/// prefix are an error. Returns the number of inputs copied.
pub fn concat_turtle_files<P: AsRef<Path>, W: Write>(
    inputs: &[P],
    mut out: W,
) -> Result<usize, RdfError> {
    let mut bindings: BTreeMap<String, (String, String)> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        let reader = BufReader::new(File::open(path).map_err(|e| RdfError::io(path, e))?);
        for line in reader.lines() {
            let line = line.map_err(|e| RdfError::io(path, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some((prefix, decl)) = prefix_declaration(trimmed) else {
                break;
            };
            match bindings.get(&prefix) {
                Some((existing, _)) if *existing != decl => {
                    return Err(RdfError::PrefixConflict {
                        prefix,
                        first: existing.clone(),
                        second: decl,
                        path: path.to_path_buf(),
                    });
                }
                Some(_) => {}
                None => {
                    order.push(prefix.clone());
                    bindings.insert(prefix, (decl, trimmed.to_string()));
                }
            }
        }
    }

    let write_err = |e: io::Error| RdfError::Write(e);
    for prefix in &order {
        if let Some((_, line)) = bindings.get(prefix) {
            writeln!(out, "{line}").map_err(write_err)?;
        }
    }
    if !order.is_empty() {
        writeln!(out).map_err(write_err)?;
    }

    for input in inputs {
        let path = input.as_ref();
        let mut reader = BufReader::new(File::open(path).map_err(|e| RdfError::io(path, e))?);
        let mut line = String::new();
        let mut in_header = true;
        let mut ends_with_newline = true;
        loop {
            line.clear();
            let n = reader
                .read_line(&mut line)
                .map_err(|e| RdfError::io(path, e))?;
            if n == 0 {
                break;
            }
            if in_header {
                let trimmed = line.trim();
                if trimmed.is_empty() || prefix_declaration(trimmed).is_some() {
                    continue;
                }
                in_header = false;
            }
            out.write_all(line.as_bytes()).map_err(write_err)?;
            ends_with_newline = line.ends_with('\n');
        }
        if !ends_with_newline {
            writeln!(out).map_err(write_err)?;
        }
    }
    out.flush().map_err(write_err)?;
    Ok(inputs.len())
}

/// Parses `@prefix p: <ns> .` or `PREFIX p: <ns>`, returning `(p, ns)`.
fn prefix_declaration(line: &str) -> Option<(String, String)> {
    let rest = line
        .strip_prefix("@prefix")
        .or_else(|| line.strip_prefix("PREFIX"))
        .or_else(|| line.strip_prefix("prefix"))?;
    let rest = rest.trim_start();
    let (prefix, rest) = rest.split_once(':')?;
    let rest = rest.trim_start().strip_prefix('<')?;
    let (ns, _) = rest.split_once('>')?;
    Some((prefix.trim().to_string(), ns.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Literal;

    fn sample() -> Graph {
        let mut g = Graph::new();
        g.bind_prefix("ex", "http://example.org/");
        let s = Iri::new("http://example.org/pkg");
        let dep = Iri::new("http://example.org/depends");
        let on = Iri::new("http://example.org/onPackage");
        let ty = Iri::new(RDF_TYPE_IRI);
        g.add(&s, &ty, Iri::new("http://example.org/Package"));
        let b = g.fresh_blank();
        g.add(&s, &dep, b);
        g.add(b, &on, Iri::new("http://example.org/libc"));
        g.add(b, &Iri::new("http://example.org/constraint"), Literal::plain(">= 2"));
        g
    }

    #[test]
    fn inlines_singly_referenced_blank_nodes() {
        let mut buf = Vec::new();
        write_turtle(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("@prefix ex: <http://example.org/> ."));
        assert!(text.contains(
            "ex:depends [ ex:constraint \">= 2\" ; ex:onPackage ex:libc ]"
        ));
        assert!(text.contains("a ex:Package"));
        assert!(!text.contains("_:"));
    }

    #[test]
    fn shared_blank_nodes_keep_labels() {
        let mut g = Graph::new();
        let p = Iri::new("http://example.org/p");
        let b = g.fresh_blank();
        g.add(Iri::new("http://example.org/a"), &p, b);
        g.add(Iri::new("http://example.org/b"), &p, b);
        let mut buf = Vec::new();
        write_turtle(&g, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches("_:b0").count(), 2);
    }

    #[test]
    fn concat_writes_prefixes_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ttl");
        let b = dir.path().join("b.ttl");
        std::fs::write(&a, "@prefix ex: <http://example.org/> .\n\nex:a ex:p \"1\" .\n").unwrap();
        std::fs::write(&b, "@prefix ex: <http://example.org/> .\n\nex:b ex:p \"2\" .\n").unwrap();

        let mut buf = Vec::new();
        assert_eq!(concat_turtle_files(&[&a, &b], &mut buf).unwrap(), 2);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "@prefix ex: <http://example.org/> .\n\nex:a ex:p \"1\" .\nex:b ex:p \"2\" .\n"
        );
    }

    #[test]
    fn concat_rejects_conflicting_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ttl");
        let b = dir.path().join("b.ttl");
        std::fs::write(&a, "@prefix ex: <http://example.org/> .\nex:a ex:p 1 .\n").unwrap();
        std::fs::write(&b, "@prefix ex: <http://example.net/> .\nex:b ex:p 2 .\n").unwrap();
        let err = concat_turtle_files(&[&a, &b], Vec::new()).unwrap_err();
        assert!(matches!(err, RdfError::PrefixConflict { .. }));
    }
}
