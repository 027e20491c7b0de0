//! reflkit command line tool
//!
//! Formats and checks JSON documents through the reflected document
//! model, and lists what the built-in registry knows about.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reflkit_core::{builtins, Json, ReflectConfig, Registry, TypeIdentity};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reflkit")]
#[command(about = "Runtime reflection registry and JSON tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Log registry activity
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Registry config file (TOML), created with defaults if missing
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reformat a JSON document
    Fmt {
        /// Input file, stdin when omitted
        file: Option<PathBuf>,
        /// Print objects on a single line
        #[arg(long)]
        compact: bool,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report structural problems in a JSON document
    Check {
        /// Input file, stdin when omitted
        file: Option<PathBuf>,
    },

    /// List registered classes
    Classes {
        /// Only names containing this text
        filter: Option<String>,
        /// Also list each class's methods
        #[arg(short, long)]
        methods: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ReflectConfig> {
    match path {
        Some(path) => ReflectConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ReflectConfig::default()),
    }
}

fn build_registry(config: ReflectConfig) -> Registry {
    let registry = Registry::with_config(config);
    builtins::init(&registry);
    registry
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn source_name(file: Option<&Path>) -> String {
    file.map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string())
}

fn format_document(
    mut config: ReflectConfig,
    file: Option<&Path>,
    compact: bool,
    output: Option<&Path>,
) -> Result<()> {
    if compact {
        config.json.indent = false;
    }
    let registry = build_registry(config);
    let doc = Json::parse(&registry, &read_input(file)?);
    let issues = registry.diagnostics().recent().len();
    debug!(issues, "Formatted {}", source_name(file));

    match output {
        Some(path) => {
            let mut out = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            doc.write_to(&mut out)?;
            writeln!(out)?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut out = io::stdout().lock();
            doc.write_to(&mut out)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn check_document(config: ReflectConfig, file: Option<&Path>) -> Result<()> {
    let registry = build_registry(config);
    let (_, issues) = Json::parse_with_issues(&registry, &read_input(file)?);
    let name = source_name(file);
    for issue in &issues {
        println!("{}:{}:{}: {}", name, issue.line, issue.column, issue.message);
    }
    if !issues.is_empty() {
        bail!("{} problem(s) found in {}", issues.len(), name);
    }
    println!("{name}: ok");
    Ok(())
}

fn list_classes(config: ReflectConfig, filter: Option<&str>, methods: bool) -> Result<()> {
    let registry = build_registry(config);
    let mut out = io::stdout().lock();
    for name in registry.class_names() {
        if filter.is_some_and(|text| !name.contains(text)) {
            continue;
        }
        let Some(class) = registry.class(TypeIdentity::raw(name)) else {
            continue;
        };
        if class.identity().name() != name {
            writeln!(out, "{name} -> {}", class.name())?;
            continue;
        }
        writeln!(out, "{name}")?;
        if methods {
            for method in registry.methods_of(class.identity()) {
                writeln!(out, "    {method}")?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Fmt {
            file,
            compact,
            output,
        } => format_document(config, file.as_deref(), compact, output.as_deref()),
        Commands::Check { file } => check_document(config, file.as_deref()),
        Commands::Classes { filter, methods } => list_classes(config, filter.as_deref(), methods),
    }
}
