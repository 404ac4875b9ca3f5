use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use packagegraph_rdf::{concat_turtle_files, parse_file, write_file, Graph, RdfFormat};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Graph files (Turtle, or N-Triples by `.nt` extension).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Concatenate Turtle inputs as text into one Turtle file instead of
    /// loading them.
    #[arg(long)]
    pub concat: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConvertReport {
    pub loaded: usize,
    pub skipped: Vec<PathBuf>,
    pub triples: usize,
}

/// Loads every parseable input into one graph. An input that fails to parse
/// contributes nothing.
pub fn consolidate(inputs: &[PathBuf]) -> (Graph, ConvertReport) {
    let mut graph = Graph::new();
    let mut report = ConvertReport::default();
    for input in inputs {
        let format = RdfFormat::from_path(input).unwrap_or(RdfFormat::Turtle);
        let mut scratch = Graph::new();
        match parse_file(&mut scratch, input, format) {
            Ok(_) => {
                graph.absorb(scratch);
                report.loaded += 1;
            }
            Err(e) => {
                tracing::warn!(path = %input.display(), error = %e, "skipping unparseable input");
                report.skipped.push(input.clone());
            }
        }
    }
    report.triples = graph.len();
    (graph, report)
}

pub fn cmd_convert(args: &ConvertArgs) -> Result<()> {
    if args.concat {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        let mut out = BufWriter::new(file);
        let copied = concat_turtle_files(args.inputs.as_slice(), &mut out)?;
        out.flush()
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        println!(
            "{} {} Turtle file(s) into {}",
            "Concatenated".green().bold(),
            copied,
            args.output.display().to_string().bold()
        );
        return Ok(());
    }

    let (graph, report) = consolidate(&args.inputs);
    write_file(&graph, &args.output, RdfFormat::NTriples)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "{} {} of {} input(s), {} triples -> {}",
        "Converted".green().bold(),
        report.loaded,
        args.inputs.len(),
        report.triples,
        args.output.display().to_string().bold()
    );
    for skipped in &report.skipped {
        println!("  {} {}", "skipped".yellow(), skipped.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_inputs_are_skipped_whole() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.ttl");
        let bad = dir.path().join("bad.ttl");
        std::fs::write(
            &good,
            "@prefix ex: <http://example.org/> .\nex:a ex:p ex:b .\nex:a ex:q [ ex:r \"x\" ] .\n",
        )
        .unwrap();
        std::fs::write(
            &bad,
            "@prefix ex: <http://example.org/> .\nex:c ex:p ex:d .\nex:broken ex:p \n",
        )
        .unwrap();

        let (graph, report) = consolidate(&[good.clone(), bad.clone()]);
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped, vec![bad]);
        assert_eq!(report.triples, 3);
        assert_eq!(graph.len(), 3);
    }
}
