//! validate-alignment CLI - compile a validation config and submit its DAG

use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use tracing::info;

use tkal_allinone::constants::{DEFAULT_SUBMIT_CMD, SUBMIT_CMD_ENV};
use tkal_allinone::{
    AllInOneError, ConfigTree, CondorSubmitter, FixSuggestion, JobGraph, JobGraphBuilder,
    Materializer, Submitter,
};

const EXAMPLE_CONFIG: &str = include_str!("../demos/example.info");

#[derive(Parser)]
#[command(name = "validate-alignment")]
#[command(about = "Set up tracker alignment validation jobs and submit them as one DAG")]
#[command(version)]
struct Cli {
    /// INFO config file (.json / .yaml are converted)
    #[arg(required_unless_present = "example")]
    config: Option<PathBuf>,

    /// Set up all configs and jobs, but don't submit
    #[arg(short, long)]
    dry: bool,

    /// Log every step
    #[arg(short, long, conflicts_with = "silent")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    silent: bool,

    /// Print an example config and exit
    #[arg(short, long)]
    example: bool,

    /// Print the job graph as JSON
    #[arg(long)]
    json: bool,

    /// Command the DAG file is appended to for submission
    #[arg(long, env = SUBMIT_CMD_ENV, default_value = DEFAULT_SUBMIT_CMD)]
    submit_cmd: String,
}

fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.silent {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.example {
        print!("{EXAMPLE_CONFIG}");
        return;
    }

    if let Err(e) = run(&cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), AllInOneError> {
    let Some(config) = cli.config.as_deref() else {
        return Ok(());
    };

    info!(config = %config.display(), "Reading the config");
    let tree = ConfigTree::from_file(config)?;

    let builder = JobGraphBuilder::new(&tree)?;
    let mut materializer = Materializer::create(builder.root())?;
    let graph = builder.build(&mut materializer)?;
    let dag = materializer.finish()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&graph.summary())?);
    } else {
        print_summary(&graph, &dag);
    }

    if cli.dry {
        info!("Dry run, exiting now");
        return Ok(());
    }

    CondorSubmitter::new(cli.submit_cmd.as_str()).submit(&dag)
}

fn print_summary(graph: &JobGraph, dag: &Path) {
    println!(
        "{} {} jobs written to '{}'",
        "✓".green(),
        graph.len(),
        graph.root().display()
    );
    println!("  DAG: {}", dag.display());
    println!("  Edges: {}", graph.edge_count());
    if !graph.plots().is_empty() {
        let names: Vec<&str> = graph.plots().iter().map(|p| p.name.as_str()).collect();
        println!("  Plots: {}", names.join(", "));
    }
}
