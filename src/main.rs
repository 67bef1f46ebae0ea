use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use tracking_plan_gen::analyzer::SchemaAnalyzer;
use tracking_plan_gen::config::ExtractionConfig;

const LOG_ENV_VAR: &str = "TRACKING_PLAN_GEN_LOG";

/// Infer tracking plans from captured event schemas.
///
/// Reads schema records saved by the schema fetch client and generates
/// events, properties, custom types, and per-write-key tracking plan YAML
/// documents.
#[derive(Parser)]
#[command(name = "tracking-plan-gen", version, about)]
struct Cli {
    /// Log debug details, including skipped schemas and path errors.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze schemas and write the YAML documents.
    Generate {
        /// JSON file with schema records (array or `{"results": [...]}`).
        #[arg(long)]
        input: PathBuf,

        /// Output directory for generated documents.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Path of the analyzed sub-tree; overrides the config file.
        #[arg(long, env = "TRACKING_PLAN_GEN_JSON_PATH")]
        json_path: Option<String>,

        /// YAML extraction config with per-event-type paths.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Drop schemas whose path does not resolve instead of keeping them
        /// unfiltered.
        #[arg(long)]
        skip_failed: bool,

        /// Render documents without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print each schema's unflattened tree as JSON.
    Unflatten {
        /// JSON file with schema records.
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");

        // Print cause chain.
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }

        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn run(cli: Cli) -> tracking_plan_gen::error::Result<()> {
    match cli.command {
        Commands::Generate {
            input,
            output_dir,
            json_path,
            config,
            skip_failed,
            dry_run,
        } => {
            let mut extraction = match &config {
                Some(path) => ExtractionConfig::load(path)?,
                None => ExtractionConfig::default(),
            };
            if let Some(json_path) = json_path {
                extraction.json_path = json_path;
            }
            extraction.skip_failed |= skip_failed;

            info!(path = %input.display(), "loading schemas");
            let schemas = tracking_plan_gen::schema::load_schemas(&input)?;
            info!(count = schemas.len(), "loaded schemas");

            let mut analyzer = SchemaAnalyzer::new(extraction);
            analyzer.analyze_schemas(&schemas)?;

            let stats = analyzer.stats();
            info!(
                analyzed = stats.schemas_analyzed,
                skipped = stats.skipped_on_path_error,
                kept_unfiltered = stats.kept_unfiltered,
                duplicate_events = stats.duplicate_events,
                "schema selection"
            );
            if cli.verbose {
                for message in &stats.path_errors {
                    info!("{message}");
                }
            }

            let generated =
                tracking_plan_gen::codegen::write_documents(&analyzer, &output_dir, dry_run)?;
            info!(
                documents = generated.documents,
                written = generated.documents_written,
                events = generated.events,
                properties = generated.properties,
                custom_types = generated.custom_types,
                tracking_plans = generated.tracking_plans,
                rules = generated.rules,
                dry_run,
                "done"
            );
        }

        Commands::Unflatten { input } => {
            let schemas = tracking_plan_gen::schema::load_schemas(&input)?;
            let trees: Vec<serde_json::Value> = schemas
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "uid": s.uid,
                        "tree": tracking_plan_gen::unflatten::unflatten(&s.schema),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&trees)?);
        }
    }

    Ok(())
}
