//! # docindex
//!
//! Builds hierarchical section trees from long documents and answers
//! questions by letting a reasoning model pick the relevant sections.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docindex normalize <input>` | Promote bold title lines to headings |
//! | `docindex build <input>` | Build and save a document tree |
//! | `docindex inspect <tree.json>` | Print a saved tree's outline |
//! | `docindex query <tree.json> <question>` | Answer a question from a tree |
//!
//! ## Configuration
//!
//! Settings come from `--config`, else `./docindex.toml`, else
//! `<config dir>/docindex/config.toml`. API keys are read from the
//! environment; a `.env` file in the working directory is honored.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docindex_outline::BuildStrategy;
use tracing_subscriber::EnvFilter;

use crate::commands::BuildRequest;
use crate::config::{API_KEY_ENV_VARS, Config, resolve_config};

#[derive(Parser)]
#[command(name = "docindex", version, about = "Reasoning-based document indexing and retrieval")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a document and promote emphasized titles to headings
    Normalize {
        /// Input document (.md, .markdown, .txt, .docx)
        input: PathBuf,

        /// Write the normalized text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a section tree and save it as JSON
    Build(BuildArgs),

    /// Print the outline and statistics of a saved tree
    Inspect {
        /// Tree JSON file
        tree: PathBuf,
    },

    /// Answer a question from a saved tree
    Query {
        /// Tree JSON file
        tree: PathBuf,

        /// The question to answer
        question: String,

        /// Print the model's reasoning for its section choice
        #[arg(long)]
        show_thinking: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Input document (.md, .markdown, .txt, .docx)
    input: PathBuf,

    /// structural (headings) or reasoning (model-inferred)
    #[arg(long, default_value_t = BuildStrategy::Structural)]
    strategy: BuildStrategy,

    /// Output path; defaults to `<stem>_tree.json` next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip heading normalization
    #[arg(long)]
    no_normalize: bool,

    #[arg(long)]
    no_node_summary: bool,

    #[arg(long)]
    no_doc_description: bool,

    #[arg(long)]
    no_node_text: bool,

    #[arg(long)]
    no_node_id: bool,

    /// Fold sections smaller than this many tokens into their parent
    #[arg(long)]
    min_token_threshold: Option<usize>,

    /// Model used for summaries and reasoning builds
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let _ = dotenvy::dotenv();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Normalize { input, output } => {
            let out = commands::normalize(&input, output.as_deref(), config.normalizer)?;
            print!("{out}");
        }
        Commands::Build(args) => run_build(args, config).await?,
        Commands::Inspect { tree } => {
            print!("{}", commands::inspect(&tree)?);
        }
        Commands::Query {
            tree,
            question,
            show_thinking,
        } => {
            let provider = config.provider.build_provider()?.with_context(|| {
                format!(
                    "query needs a reasoning provider; set one of {}",
                    API_KEY_ENV_VARS.join(", ")
                )
            })?;
            let outcome = commands::query(&tree, &question, config.retrieval, provider).await?;
            print!("{}", commands::render_outcome(&outcome, show_thinking));
        }
    }

    Ok(())
}

async fn run_build(args: BuildArgs, config: Config) -> Result<()> {
    let mut options = config.build;
    if args.no_node_summary {
        options.add_node_summary = false;
    }
    if args.no_doc_description {
        options.add_doc_description = false;
    }
    if args.no_node_text {
        options.add_node_text = false;
    }
    if args.no_node_id {
        options.add_node_id = false;
    }
    if let Some(threshold) = args.min_token_threshold {
        options = options.with_min_token_threshold(threshold);
    }
    if let Some(model) = args.model {
        options = options.with_model(model);
    }

    let provider = config.provider.build_provider()?;
    let request = BuildRequest {
        input: &args.input,
        output: args.output.as_deref(),
        strategy: args.strategy,
        normalize: !args.no_normalize,
        options,
        normalizer: config.normalizer,
    };
    let (tree, path) = commands::build(request, provider).await?;
    println!(
        "Built {} nodes for `{}` -> {}",
        tree.node_count(),
        tree.doc_name(),
        path.display()
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
