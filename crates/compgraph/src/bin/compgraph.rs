//! compgraph launcher
//!
//! Usage:
//!   compgraph graphs/demo.yaml
//!   compgraph graphs/demo.yaml -a as_of:=2023-01-02
//!   compgraph graphs/demo.yaml --dry-run --format dot

use anyhow::{bail, Context};
use compgraph::cli::OutputFormat;
use compgraph::{Graph, GraphArgs, GraphConfig, NodeRegistry, SubstitutionContext};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: GraphArgs = argh::from_env();

    let env = env_logger::Env::default().default_filter_or(args.log_filter());
    env_logger::init_from_env(env);

    log::info!("Loading graph config: {}", args.config);
    let ctx = SubstitutionContext::new().with_args(args.arg_overrides());
    let config = GraphConfig::from_file_with(&args.config, &ctx)
        .with_context(|| format!("Failed to load graph config '{}'", args.config))?;

    let registry = NodeRegistry::with_builtins();

    if args.validate {
        let unknown: Vec<&str> = config
            .nodes
            .values()
            .map(|record| record.locator.as_str())
            .filter(|locator| !registry.contains(locator))
            .collect();
        if !unknown.is_empty() {
            bail!("Unknown node types: {}", unknown.join(", "));
        }

        println!("Graph config '{}' is valid", args.config);
        println!("  Nodes: {}", config.nodes.len());
        for (namespace, record) in &config.nodes {
            println!("    {} ({})", namespace, record.locator);
        }
        return Ok(());
    }

    if args.dry_run {
        let graph = Graph::assemble(&config, &registry).context("Failed to wire graph")?;
        let plan = graph.dependency_graph();
        match args.format {
            OutputFormat::Text => println!("{}", plan),
            OutputFormat::Dot => print!("{}", plan.to_dot()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        }
        return Ok(());
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(());
    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, initiating shutdown...");
        let _ = shutdown_tx.send(());
    })
    .context("Error setting Ctrl+C handler")?;

    let graph = tokio::select! {
        built = Graph::build_from_config(&config, &registry) => built?,
        _ = shutdown_rx.changed() => {
            log::info!("Shutdown requested during setup");
            return Ok(());
        }
    };

    tokio::select! {
        result = graph.run() => result?,
        _ = shutdown_rx.changed() => log::info!("Shutdown signal received"),
    }

    log::info!("compgraph exiting");
    Ok(())
}
