//! JSON Schema generator for cascade documents
//!
//! Generates JSON Schema from the Rust document types using schemars.

use anyhow::Result;
use cascade_core::{EngineOptions, FragmentDocument, PluginManifest};
use clap::ValueEnum;
use schemars::schema_for;
use serde_json::json;
use std::fs;
use std::path::Path;

/// Which document type to describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaKind {
    /// `.eslintrc.*` configuration fragments
    Config,
    /// Plugin manifests
    Manifest,
    /// Engine options files
    Options,
}

impl SchemaKind {
    fn title(self) -> &'static str {
        match self {
            SchemaKind::Config => "Cascade Configuration Fragment",
            SchemaKind::Manifest => "Cascade Plugin Manifest",
            SchemaKind::Options => "Cascade Engine Options",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            SchemaKind::Config => "config.json",
            SchemaKind::Manifest => "manifest.json",
            SchemaKind::Options => "options.json",
        }
    }
}

/// Schema generator for configuration files
pub struct SchemaGenerator;

impl SchemaGenerator {
    /// Build the schema for one document type, with metadata
    pub fn schema(kind: SchemaKind) -> Result<serde_json::Value> {
        let schema = match kind {
            SchemaKind::Config => schema_for!(FragmentDocument),
            SchemaKind::Manifest => schema_for!(PluginManifest),
            SchemaKind::Options => schema_for!(EngineOptions),
        };

        let mut schema_json = serde_json::to_value(schema)?;
        schema_json["$schema"] = json!("http://json-schema.org/draft-07/schema#");
        schema_json["title"] = json!(kind.title());
        Ok(schema_json)
    }

    /// Generate one schema and write it to `output_path`
    pub fn generate(kind: SchemaKind, output_path: &Path) -> Result<()> {
        tracing::info!("Generating JSON Schema: {}", kind.title());

        let schema_json = Self::schema(kind)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, serde_json::to_string_pretty(&schema_json)?)?;

        println!("✓ Generated JSON Schema: {}", output_path.display());
        Ok(())
    }

    /// Generate every schema into `output_dir`
    pub fn generate_all(output_dir: &Path) -> Result<()> {
        for kind in [SchemaKind::Config, SchemaKind::Manifest, SchemaKind::Options] {
            Self::generate(kind, &output_dir.join(kind.file_name()))?;
        }
        Ok(())
    }
}
