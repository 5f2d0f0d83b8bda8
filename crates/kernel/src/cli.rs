//! Command-line front end for block documents stored as JSON files.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tessera_sdk::BlockId;
use tracing::{info, warn};

use crate::content::{BlockTypeRegistry, ContentDocumentModel};
use crate::viewer::ContentViewer;

/// Inspect, render and rearrange block documents.
#[derive(Parser, Debug)]
#[command(name = "tessera", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered block types in menu order.
    Types,

    /// Render a document to HTML.
    Render {
        /// JSON document: a block array or `{ "blocks": [...] }`.
        file: PathBuf,
    },

    /// Validate every block; fails if any block is invalid.
    Validate { file: PathBuf },

    /// Move a block and print the resulting document.
    Move {
        file: PathBuf,

        /// Id of the block to move.
        #[arg(long)]
        id: String,

        /// Target position in the resulting document.
        #[arg(long)]
        to: usize,

        /// Write the result back to the file instead of stdout.
        #[arg(long)]
        in_place: bool,
    },
}

/// Run one command against the standard block types.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let registry = BlockTypeRegistry::with_standard_types();

    match cli.command {
        Command::Types => {
            for (type_name, label) in registry.labels() {
                writeln!(out, "{type_name}\t{label}")?;
            }
        }
        Command::Render { file } => {
            let model = open(&registry, &file)?;
            let html = ContentViewer::new(registry).render_html(model.blocks());
            writeln!(out, "{html}")?;
        }
        Command::Validate { file } => {
            let model = open(&registry, &file)?;
            let mut invalid = 0;
            for block in model.blocks() {
                let result = registry.validate_block(block.block_type(), block.data());
                for error in result.errors() {
                    writeln!(out, "{} ({}): {error}", block.id(), block.block_type())?;
                }
                if !result.is_valid() {
                    invalid += 1;
                }
            }
            if invalid > 0 {
                bail!("{invalid} of {} blocks failed validation", model.len());
            }
            writeln!(out, "{} blocks valid", model.len())?;
        }
        Command::Move {
            file,
            id,
            to,
            in_place,
        } => {
            let mut model = open(&registry, &file)?;
            model
                .move_block(&BlockId::new(id.as_str()), to)
                .with_context(|| format!("moving block '{id}'"))?;
            let json = serde_json::to_string_pretty(&model.to_json())?;
            if in_place {
                std::fs::write(&file, format!("{json}\n"))
                    .with_context(|| format!("failed to write {}", file.display()))?;
                info!(block_id = %id, to, file = %file.display(), "block moved");
            } else {
                writeln!(out, "{json}")?;
            }
        }
    }

    Ok(())
}

fn open(registry: &BlockTypeRegistry, path: &Path) -> Result<ContentDocumentModel> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let mut model = ContentDocumentModel::new(registry.clone());
    let report = model.load_json(&value);
    for warning in &report.warnings {
        warn!(file = %path.display(), "{warning}");
    }
    Ok(model)
}
