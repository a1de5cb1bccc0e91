//! Curator CLI - run curation pipelines over monitoring datasets
//!
//! # Commands
//!
//! ```bash
//! curator run lake.csv river.csv --pipeline pipeline.json   # Run a pipeline
//! curator run data/*.csv -p pipeline.json --feedback        # ... and write provider feedback
//! curator operations                                        # List registered operations
//! curator template -o pipeline.json                         # Pipeline file skeleton
//! ```
//!
//! Settings come from the environment (`.env` honored): `CURATOR_EXPORT_DIR`,
//! `CURATOR_CONSOLE_LEVEL`, `CURATOR_CHANGELOG`. Developer logging is
//! controlled with `RUST_LOG`.

use clap::{Parser, Subcommand};
use curator::{
    ChangelogExporter, ConsoleEcho, CsvLoader, DataStructure, FeedbackExporter, FilterOptions, OperationRegistry,
    PipelineConfig, Session, Settings, SpreadsheetExporter, Workflow,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "curator")]
#[command(about = "Validate, transform and export monitoring datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline over one or more data files
    Run {
        /// Input data files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Pipeline definition file (JSON)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Data type reported for every input (e.g. "physicalchemical")
        #[arg(long)]
        data_type: Option<String>,

        /// Data structure of the inputs: row or column (default: column)
        #[arg(long)]
        structure: Option<String>,

        /// Directory for exported artifacts (overrides CURATOR_EXPORT_DIR)
        #[arg(short, long)]
        export_dir: Option<PathBuf>,

        /// Save the effective pipeline definition to file
        #[arg(long)]
        save_pipeline: Option<PathBuf>,

        /// Write the feedback report for data providers
        #[arg(long)]
        feedback: bool,

        /// Write the diagnostics spreadsheet
        #[arg(long)]
        spreadsheet: bool,

        /// One spreadsheet row per item instead of grouped counts
        #[arg(long)]
        itemized: bool,

        /// Restrict exported diagnostics (e.g. ">warning", "validation")
        #[arg(long)]
        filter: Vec<String>,
    },

    /// List registered operations as JSON
    Operations {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a pipeline definition skeleton
    Template {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options of `curator run`.
struct RunArgs {
    inputs: Vec<PathBuf>,
    pipeline: PathBuf,
    data_type: Option<String>,
    structure: Option<String>,
    export_dir: Option<PathBuf>,
    save_pipeline: Option<PathBuf>,
    feedback: bool,
    spreadsheet: bool,
    itemized: bool,
    filter: Vec<String>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            inputs,
            pipeline,
            data_type,
            structure,
            export_dir,
            save_pipeline,
            feedback,
            spreadsheet,
            itemized,
            filter,
        } => cmd_run(RunArgs {
            inputs,
            pipeline,
            data_type,
            structure,
            export_dir,
            save_pipeline,
            feedback,
            spreadsheet,
            itemized,
            filter,
        }),

        Commands::Operations { output } => cmd_operations(output.as_deref()),

        Commands::Template { output } => cmd_template(output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(dir) = args.export_dir {
        settings = settings.with_export_dir(dir);
    }
    let mut session = Session::new(settings);
    ConsoleEcho::new(session.settings.console_level).attach(&mut session.bus, 0);

    let registry = OperationRegistry::with_builtins();
    let config = PipelineConfig::load(&args.pipeline)?;

    let mut loader = CsvLoader::new();
    if let Some(data_type) = args.data_type {
        loader = loader.with_data_type(data_type);
    }
    if let Some(structure) = args.structure {
        loader = loader.with_structure(structure.parse::<DataStructure>()?);
    }

    let mut workflow = Workflow::new(config, Box::new(loader)).with_sources(args.inputs.iter());
    if let Some(path) = args.save_pipeline {
        workflow = workflow.save_config_to(path);
    }

    eprintln!("📄 Processing {} files with {}", args.inputs.len(), args.pipeline.display());
    let outcome = workflow.run(&registry, &mut session);

    // Diagnostics are written even when the run was aborted.
    let changelog = ChangelogExporter::new(session.settings.changelog_path.clone());
    if let Some(path) = session.log.export(&changelog)? {
        eprintln!("   💾 Changelog: {}", path.display());
    }

    if !args.filter.is_empty() {
        session.log.filter(&args.filter, FilterOptions::default());
        eprintln!("   🔎 {} of {} log entries selected", session.log.len(), session.log.total_len());
    }

    let export_dir = session.settings.export_dir.clone();
    if args.spreadsheet {
        let exporter = SpreadsheetExporter::new(&export_dir).itemized(args.itemized);
        if let Some(path) = session.log.export(&exporter)? {
            eprintln!("   💾 Spreadsheet: {}", path.display());
        }
    }
    if args.feedback {
        let exporter = FeedbackExporter::new(&export_dir);
        if let Some(path) = session.log.export(&exporter)? {
            eprintln!("   💾 Feedback: {}", path.display());
        }
    }

    let report = outcome?;
    eprintln!(
        "\n✨ Done! {} datasets processed, {} failed",
        report.succeeded(),
        report.failed()
    );
    if let Some(level) = session.log.max_level() {
        eprintln!("   Highest diagnostic level: {}", level);
    }
    Ok(())
}

fn cmd_operations(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = OperationRegistry::with_builtins();
    let json = serde_json::to_string_pretty(&registry.catalog())?;
    write_output(&json, output)
}

fn cmd_template(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = OperationRegistry::with_builtins();
    let json = PipelineConfig::template(&registry).to_json()?;
    write_output(&json, output)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
