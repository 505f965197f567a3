//! Cascade Developer Tools
//!
//! Command-line tools for cascade developers:
//! - Generate JSON Schema for configuration, manifest and options files
//! - Print the resolved configuration of a file
//! - Validate a configuration against plugin manifests

mod config_inspector;
mod schema_generator;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config_inspector::{ConfigInspector, InspectorInput};
use schema_generator::{SchemaGenerator, SchemaKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cascade-devtools")]
#[command(about = "Developer tools for cascade", version = cascade_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Root configuration file
    #[arg(short, long, default_value = ".eslintrc.json")]
    config: PathBuf,

    /// Plugin manifest (repeatable); a manifest without a namespace holds built-in rules
    #[arg(short, long = "plugin")]
    plugins: Vec<PathBuf>,

    /// Engine options file
    #[arg(long)]
    options: Option<PathBuf>,
}

impl ConfigArgs {
    fn input(self) -> InspectorInput {
        InspectorInput {
            config: self.config,
            manifests: self.plugins,
            options: self.options,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a JSON Schema
    Schema {
        #[arg(value_enum, default_value = "config")]
        kind: SchemaKind,

        /// Output path for schema file
        #[arg(short, long, default_value = "docs/schema/config.json")]
        output: PathBuf,
    },

    /// Generate every JSON Schema into a directory
    SchemaAll {
        #[arg(short, long, default_value = "docs/schema")]
        output_dir: PathBuf,
    },

    /// Print the resolved configuration of a file
    PrintConfig {
        #[command(flatten)]
        config: ConfigArgs,

        /// File to resolve
        path: PathBuf,
    },

    /// Check every rule entry and override pattern of a configuration
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() -> Result<()> {
    cascade_core::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Schema { kind, output } => {
            SchemaGenerator::generate(kind, &output)?;
        }

        Commands::SchemaAll { output_dir } => {
            SchemaGenerator::generate_all(&output_dir)?;
        }

        Commands::PrintConfig { config, path } => {
            let inspector = ConfigInspector::open(&config.input())?;
            println!("{}", inspector.print_config(&path)?);
        }

        Commands::Validate { config } => {
            ConfigInspector::open(&config.input())?.validate()?;
        }
    }

    Ok(())
}
