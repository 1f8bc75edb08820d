//! Rendering citations for output.
//!
//! Three layouts are supported:
//! - JSON array: `[{"@type": "ScholarlyArticle", ...}, ...]`
//! - JSON-LD document: `{"@context": "...", "citation": [...]}`, ready to be
//!   merged into a `codemeta.json`
//! - JSONL: one citation object per line

use crate::citation::Citation;
use clap::ValueEnum;
use serde::Serialize;

/// JSON-LD context of CodeMeta documents.
pub const CODEMETA_CONTEXT: &str = "https://w3id.org/codemeta/3.0";

/// Output layout for rendered citations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// CodeMeta fragment with a `citation` property
    #[value(name = "jsonld")]
    JsonLd,
    /// One compact JSON object per line
    Jsonl,
}

#[derive(Serialize)]
struct CodeMetaFragment<'a> {
    #[serde(rename = "@context")]
    context: &'static str,
    citation: &'a [Citation],
}

/// Renders citations in the requested layout.
///
/// # Arguments
///
/// * `citations` - The citations, in output order
/// * `format` - The layout to use
///
/// # Returns
///
/// The rendered text, ending with a newline unless it is empty JSONL.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_citations(
    citations: &[Citation],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let mut rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(citations)?,
        OutputFormat::JsonLd => serde_json::to_string_pretty(&CodeMetaFragment {
            context: CODEMETA_CONTEXT,
            citation: citations,
        })?,
        OutputFormat::Jsonl => {
            let lines = citations
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            lines.join("\n")
        }
    };

    if !rendered.is_empty() {
        rendered.push('\n');
    }
    Ok(rendered)
}
