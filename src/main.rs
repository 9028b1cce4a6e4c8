//! ontobridge CLI: offline tooling around the classification bridge.
//!
//! Classification itself needs the external engine; these commands cover the
//! parts that are useful without one: encoding preflight over a store
//! snapshot, and offline diffing of inferred-relationship exports.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ontobridge::concept::{Relationship, RelationshipKey};
use ontobridge::encode;
use ontobridge::reconcile;
use ontobridge::run::RunConfig;
use ontobridge::source::MemorySource;

#[derive(Parser)]
#[command(name = "ontobridge", version, about = "Terminology classification bridge tooling")]
struct Cli {
    /// Run configuration (TOML with root, isa, role_root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a store snapshot and print preflight statistics.
    ///
    /// Fails with the same diagnostics a live run would produce: sentinel
    /// collisions, out-of-scope relationships, the role-count guard.
    Inspect {
        /// JSON snapshot file (MemorySource format).
        #[arg(long)]
        snapshot: PathBuf,
    },

    /// Diff two inferred-relationship exports into a change set.
    Diff {
        /// Previously committed relationships (JSON array).
        #[arg(long)]
        prior: PathBuf,
        /// Candidate relationships from a new run (JSON array).
        #[arg(long)]
        candidate: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig> {
    let path = path.ok_or_else(|| miette::miette!("--config is required for this command"))?;
    let text = std::fs::read_to_string(path).into_diagnostic()?;
    RunConfig::from_toml_str(&text).map_err(Into::into)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { snapshot } => {
            let config = load_config(cli.config.as_ref())?;
            let text = std::fs::read_to_string(&snapshot).into_diagnostic()?;
            let source = MemorySource::from_json(&text).into_diagnostic()?;

            let (space, ontology) = encode::encode(&source.concepts, &config.encode_params())?;

            println!("snapshot:       {}", snapshot.display());
            println!("concepts:       {}", ontology.populated);
            println!("array capacity: {}", ontology.concepts.len());
            println!("roles:          {}", ontology.roles.len());
            println!("relationships:  {}", ontology.relationships.len());
            println!("defined:        {}", ontology.defined.len());
            println!("prior inferred: {}", source.inferred.len());
            println!(
                "root in scope:  {}",
                space.handle_of(config.root).is_some()
            );
        }

        Commands::Diff { prior, candidate } => {
            let prior: Vec<Relationship> = read_relationships(&prior)?;
            let candidate: Vec<Relationship> = read_relationships(&candidate)?;
            let candidate_keys: BTreeSet<RelationshipKey> =
                candidate.iter().map(Relationship::key).collect();

            let changes = reconcile::diff(&candidate_keys, &prior);
            println!(
                "{}",
                serde_json::to_string_pretty(&changes).into_diagnostic()?
            );
        }
    }

    Ok(())
}

fn read_relationships(path: &std::path::Path) -> Result<Vec<Relationship>> {
    let text = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&text).into_diagnostic()
}
