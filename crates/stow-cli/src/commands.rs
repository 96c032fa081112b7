//! CLI subcommands.

use anyhow::{Context as _, Result};
use clap::Subcommand;
use stow_store::{Context, Document, Storer, StorerExt};
use tracing::debug;

use crate::formatter::{format_document, format_documents, format_names, OutputFormat};

/// A store operation.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a JSON object; its string `id` field is the record ID
    Put {
        /// Collection name
        collection: String,
        /// JSON object, e.g. '{"id":"w1","color":"red"}'
        json: String,
    },
    /// Print one record
    Get {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },
    /// Delete one record
    Rm {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },
    /// Print every record in a collection
    Ls {
        /// Collection name
        collection: String,
    },
    /// Print the names of all provisioned collections
    Collections,
}

impl Command {
    /// Executes the command and returns the text to print.
    pub fn execute(
        &self,
        store: &dyn Storer,
        ctx: &Context,
        format: OutputFormat,
    ) -> Result<String> {
        match self {
            Command::Put { collection, json } => {
                let doc: Document = serde_json::from_str(json)
                    .context("expected a JSON object with a string \"id\" field")?;
                debug!(collection = %collection, id = %doc.id, "writing document");
                store.write(ctx, collection, &doc)?;
                Ok(format!("wrote {}/{}", collection, doc.id))
            }

            Command::Get { collection, id } => {
                match store.read(ctx, collection, id, Document::default)? {
                    Some(doc) => Ok(format_document(&doc, format)),
                    None => Ok(format!("{}/{} not found", collection, id)),
                }
            }

            Command::Rm { collection, id } => {
                store.delete(ctx, collection, id)?;
                Ok(format!("deleted {}/{}", collection, id))
            }

            Command::Ls { collection } => {
                let mut docs: Vec<Document> = store.list(ctx, collection, Document::default)?;
                docs.sort_by(|a, b| a.id.cmp(&b.id));
                Ok(format_documents(&docs, format))
            }

            Command::Collections => {
                let names = store.collections(ctx)?;
                Ok(format_names(&names, format))
            }
        }
    }
}
