use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use packagegraph_collect::{
    collect, CollectConfig, CollectContext, CollectSummary, Coordinator, DebianCollector,
    DebianSelector, Diagnostics, Ecosystem, HandOff, HttpConfig, ManifestStatus, MirrorFetcher,
    ParallelConfig, RpmCollector,
};
use packagegraph_rdf::{parse_file, write_file, Graph, RdfFormat};
use url::Url;

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Repository flavour: `debian` or `rpm`.
    #[arg(long)]
    pub ecosystem: Ecosystem,

    /// Mirror base URL (`http(s)://`, `file://`, or a local directory).
    #[arg(long)]
    pub repo_url: String,

    /// Debian distribution under `dists/`.
    #[arg(long, default_value = "stable")]
    pub distribution: String,

    /// Debian archive component.
    #[arg(long, default_value = "main")]
    pub component: String,

    /// Debian binary architecture directory (`binary-<arch>`).
    #[arg(long, default_value = "binary-amd64")]
    pub arch: String,

    /// Existing graph files to load before collecting.
    #[arg(long = "input", value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Output graph file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format; defaults to the output file extension, then Turtle.
    #[arg(long)]
    pub format: Option<RdfFormat>,

    /// Process every chunk on the calling thread.
    #[arg(long)]
    pub no_parallel: bool,

    #[arg(long, default_value_t = packagegraph_collect::config::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, default_value_t = packagegraph_collect::config::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Hand partial graphs back through temporary N-Triples files in DIR.
    #[arg(long, value_name = "DIR")]
    pub spool_dir: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub http_timeout: Option<u64>,

    /// Log per-step timings and a summary table.
    #[arg(long)]
    pub profile: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl CollectArgs {
    pub fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            enabled: !self.no_parallel,
            chunk_size: self.chunk_size,
            workers: self.workers,
            handoff: match &self.spool_dir {
                Some(dir) => HandOff::Spool { dir: dir.clone() },
                None => HandOff::InMemory,
            },
        }
    }

    pub fn collect_config(&self) -> Result<CollectConfig> {
        Ok(CollectConfig {
            repo_url: normalize_repo_url(&self.repo_url)?,
            parallel: self.parallel_config(),
            http: HttpConfig {
                timeout_secs: self.http_timeout,
                ..HttpConfig::default()
            },
        })
    }

    fn debian_selector(&self) -> DebianSelector {
        DebianSelector {
            distribution: self.distribution.clone(),
            component: self.component.clone(),
            arch: self.arch.clone(),
        }
    }
}

/// Accepts URLs as given and turns local directories into `file://` URLs.
pub fn normalize_repo_url(raw: &str) -> Result<String> {
    if let Ok(url) = Url::parse(raw) {
        return match url.scheme() {
            "http" | "https" | "file" => Ok(raw.to_string()),
            other => bail!("unsupported repository URL scheme `{other}`"),
        };
    }
    let path = Path::new(raw);
    let absolute = path
        .canonicalize()
        .with_context(|| format!("repository path {} not found", path.display()))?;
    let url = Url::from_directory_path(&absolute)
        .map_err(|()| anyhow::anyhow!("cannot express {} as a URL", absolute.display()))?;
    Ok(url.to_string())
}

fn output_format(args: &CollectArgs) -> RdfFormat {
    args.format
        .or_else(|| RdfFormat::from_path(&args.output))
        .unwrap_or(RdfFormat::Turtle)
}

fn input_format(path: &Path) -> RdfFormat {
    RdfFormat::from_path(path).unwrap_or(RdfFormat::Turtle)
}

pub fn cmd_collect(args: &CollectArgs) -> Result<()> {
    let config = args.collect_config()?;
    let format = output_format(args);
    let coordinator = Coordinator::new(config.parallel.clone())
        .context("invalid parallel collection settings")?;
    let fetcher = MirrorFetcher::new(&config.http)?;
    let diagnostics = Diagnostics::new(args.profile);

    let mut graph = Graph::new();
    for input in &args.inputs {
        let added = parse_file(&mut graph, input, input_format(input))
            .with_context(|| format!("failed to load {}", input.display()))?;
        tracing::info!(path = %input.display(), added, "loaded input graph");
    }

    let ctx = CollectContext::new(&config.repo_url, &fetcher, &coordinator, &diagnostics);
    let summary = match args.ecosystem {
        Ecosystem::Debian => collect(&DebianCollector::new(args.debian_selector()), &ctx, &mut graph),
        Ecosystem::Rpm => collect(&RpmCollector::new(), &ctx, &mut graph),
    }
    .with_context(|| format!("collecting {} failed", config.repo_url))?;

    {
        let _step = diagnostics.step("serialize");
        write_file(&graph, &args.output, format)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
    }
    diagnostics.log_summary();

    if args.json {
        let report = serde_json::json!({
            "summary": summary,
            "output": args.output,
            "format": format.name(),
            "triples": graph.len(),
            "timings": diagnostics
                .summary()
                .iter()
                .map(|t| serde_json::json!({
                    "step": t.name,
                    "seconds": t.total.as_secs_f64(),
                    "calls": t.count,
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&summary, &graph, args, format);
    }
    Ok(())
}

fn print_summary(summary: &CollectSummary, graph: &Graph, args: &CollectArgs, format: RdfFormat) {
    println!(
        "{} {} packages from {} ({} rejected)",
        "Collected".green().bold(),
        summary.packages,
        summary.repo_url,
        summary.rejected
    );
    for manifest in &summary.manifests {
        match &manifest.status {
            ManifestStatus::Linked { url, stats } => println!(
                "  {} {}: {} entries, {} triples ({})",
                "linked".green(),
                manifest.resource,
                stats.entries,
                stats.triples_added,
                url
            ),
            ManifestStatus::Unavailable { reason } => println!(
                "  {} {}: {}",
                "skipped".yellow(),
                manifest.resource,
                reason
            ),
        }
    }
    println!(
        "{} {} ({} triples, {})",
        "wrote".green().bold(),
        args.output.display().to_string().bold(),
        graph.len(),
        format.name()
    );
}
