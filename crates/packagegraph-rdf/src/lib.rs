//! Graph store for packagegraph.
//!
//! A deliberately small triple store: an ordered in-memory set of triples
//! with graph-local blank nodes, writers for Turtle and N-Triples, and a
//! Sophia-backed parser for reading graphs back in.
//!
//! - [`Graph`] is the store (`add`, `len`, `absorb` for merging).
//! - [`write_graph`] / [`write_file`] serialize; [`parse_into`] / [`parse_file`] parse.
//! - [`concat_turtle_files`] merges Turtle documents as text, for inputs too
//!   large to load.

pub mod codec;
pub mod error;
pub mod graph;
pub mod ntriples;
pub mod term;
pub mod turtle;
pub mod vocab;

pub use codec::{parse_file, parse_into, write_file, write_graph, RdfFormat};
pub use error::RdfError;
pub use graph::Graph;
pub use term::{BlankId, Iri, Literal, Node, Term, Triple};
pub use turtle::concat_turtle_files;
