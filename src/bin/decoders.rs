//! Schema Decoders CLI
//!
//! Generates TypeScript decoders from a JSON Schema definitions map and checks
//! documents against a definition.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use schema_decoders::codegen::load_schema;
use schema_decoders::{DecoderConfig, DecoderRegistry, Generator, WriteMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-decoders")]
#[command(about = "Generate typed decoders from JSON Schema definitions")]
struct Cli {
    /// Config file layered over decoders.toml and the user config
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate index.ts (and validator files in pack mode)
    Generate {
        /// Input schema file (defaults to paths.input)
        input: Option<PathBuf>,
        /// Output folder (defaults to paths.output)
        output: Option<PathBuf>,
        /// Registry class name
        #[arg(long)]
        decoder_name: Option<String>,
        /// Embed the schema instead of emitting validator files
        #[arg(long)]
        no_pack: bool,
        /// Report stale files without writing; exits non-zero if any
        #[arg(long)]
        check: bool,
    },

    /// Decode a JSON document with one definition
    Check {
        /// Input schema file
        input: PathBuf,
        /// Definition name (derived identifier)
        definition: String,
        /// JSON document to check
        document: PathBuf,
    },

    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        #[arg(default_value = "decoders.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = DecoderConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            input,
            output,
            decoder_name,
            no_pack,
            check,
        } => {
            let input = input
                .or_else(|| config.paths.input.clone())
                .ok_or_else(|| anyhow!("No input schema given (argument or paths.input)"))?;
            let output = output
                .or_else(|| config.paths.output.clone())
                .ok_or_else(|| anyhow!("No output folder given (argument or paths.output)"))?;

            let mut options = config.generate.clone();
            if decoder_name.is_some() {
                options.decoder_name = decoder_name;
            }
            if no_pack {
                options.pack = false;
            }

            let mode = if check { WriteMode::Check } else { WriteMode::Write };
            let schema = load_schema(&input)?;
            let report = Generator::new(options)
                .with_write_mode(mode)
                .generate(&schema, &output)?;

            for entry in report.degraded() {
                println!("⚠️  {} uses pointer lookup (no standalone validator)", entry.name);
            }

            if check {
                let stale = report.stale();
                if stale.is_empty() {
                    println!("✅ {} is up to date", output.display());
                    return Ok(());
                }
                for (path, diff) in &stale {
                    println!("❌ {} is out of date", path.display());
                    print!("{}", diff);
                }
                bail!("{} generated file(s) out of date", stale.len());
            }

            println!(
                "✅ {} → {} ({} definitions, {} written, {} unchanged)",
                input.display(),
                output.display(),
                report.entries.len(),
                report.written().count(),
                report.unchanged().count()
            );
        }

        Commands::Check {
            input,
            definition,
            document,
        } => {
            let schema = load_schema(&input)?;
            let registry = DecoderRegistry::from_schema(&schema, &config.generate)?;
            let json = read_json(&document)?;

            match registry.decode(&definition, json) {
                Ok(_) => println!("✅ {} is a valid {}", document.display(), definition),
                Err(e) => {
                    for issue in &e.errors {
                        println!("   {}", issue);
                    }
                    bail!("{}", e.message);
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", config.to_toml()?);
            }
            ConfigAction::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                let path_str = path
                    .to_str()
                    .ok_or_else(|| anyhow!("Config path is not valid UTF-8"))?;
                DecoderConfig::default().save(path_str)?;
                println!("📝 Wrote {}", path.display());
            }
        },
    }

    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
