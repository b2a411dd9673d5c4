// src/main.rs

mod cli;

use anyhow::{Context, Result};
use binresolve::graph::GraphFile;
use binresolve::{BinaryAnalyzer, BinaryDecision, BuildMode, DepsGraph, HttpFetcher, ResolverConfig};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One node of the JSON report
#[derive(Serialize)]
struct NodeReport {
    reference: String,
    package: Option<String>,
    binary: BinaryDecision,
    remote: Option<String>,
}

#[derive(Serialize)]
struct Report {
    nodes: Vec<NodeReport>,
    summary: BTreeMap<BinaryDecision, usize>,
}

fn default_config_path() -> Option<PathBuf> {
    let path = dirs::home_dir()?.join(".binresolve").join("config.toml");
    path.exists().then_some(path)
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig> {
    match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            ResolverConfig::load(&path)
        }
        None => Ok(ResolverConfig::default()),
    }
}

fn build_report(graph: &DepsGraph) -> Report {
    let nodes = graph
        .nodes()
        .filter(|(_, node)| node.kind.has_binary())
        .map(|(_, node)| NodeReport {
            reference: node.recipe.reference.to_string(),
            package: node.pref.as_ref().map(ToString::to_string),
            binary: node.binary,
            remote: node.binary_remote.as_ref().map(|r| r.name.clone()),
        })
        .collect();
    Report {
        nodes,
        summary: graph.decision_summary(),
    }
}

fn print_report(report: &Report) {
    for node in &report.nodes {
        let name = node.package.as_deref().unwrap_or(&node.reference);
        match &node.remote {
            Some(remote) => println!("{} {} {}", name, node.binary, remote),
            None => println!("{} {}", name, node.binary),
        }
    }

    println!();
    let summary: Vec<String> = report
        .summary
        .iter()
        .map(|(decision, count)| format!("{}: {}", decision, count))
        .collect();
    println!("{}", summary.join(", "));
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            graph,
            config,
            build,
            update,
            remote,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let cache = config.open_cache()?;
            let registry = config.remote_registry()?;
            let workspace = config.workspace()?;
            let fetcher = HttpFetcher::new().context("Failed to initialize HTTP fetcher")?;
            let mode = BuildMode::parse(build.as_deref()).context("Invalid --build value")?;

            let mut deps = GraphFile::load(&graph)?.into_graph()?;
            info!("Resolving binaries for {} nodes", deps.len());

            BinaryAnalyzer::new(&cache, &registry, &fetcher)
                .with_workspace(&workspace)
                .resolve(&mut deps, &mode, update, remote.as_deref())
                .context("Binary resolution failed")?;
            mode.report_matches();

            let report = build_report(&deps);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            let missing = report.summary.get(&BinaryDecision::Missing).copied().unwrap_or(0);
            if missing > 0 {
                anyhow::bail!(
                    "{} package(s) have no binary available; try '--build missing'",
                    missing
                );
            }
            Ok(())
        }
    }
}
