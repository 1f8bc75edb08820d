//! Package `DESCRIPTION` files.
//!
//! These use the Debian control format: `Field: value` lines, with
//! continuation lines indented by whitespace.

use crate::citefile::Meta;
use encoding_rs::{Encoding, UTF_8};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when reading a `DESCRIPTION` file.
#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed DESCRIPTION at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Parsed `DESCRIPTION` fields, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    fields: Vec<(String, String)>,
}

impl Description {
    /// Reads and parses a `DESCRIPTION` file.
    pub fn load(path: &Path) -> Result<Description, DescriptionError> {
        let bytes = fs::read(path)?;
        let description = Description::parse(&String::from_utf8_lossy(&bytes))?;

        // Field names are ASCII, so a first lossy pass is enough to find Encoding.
        match description
            .encoding()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
        {
            Some(encoding) if encoding != UTF_8 => {
                let (text, _, _) = encoding.decode(&bytes);
                Description::parse(&text)
            }
            _ => Ok(description),
        }
    }

    /// Parses DCF text.
    pub fn parse(content: &str) -> Result<Description, DescriptionError> {
        let mut fields: Vec<(String, String)> = Vec::new();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with([' ', '\t']) {
                let Some((_, value)) = fields.last_mut() else {
                    return Err(DescriptionError::Malformed {
                        line: index + 1,
                        message: "continuation line before any field".to_string(),
                    });
                };
                let continuation = line.trim();
                if continuation != "." {
                    value.push('\n');
                    value.push_str(continuation);
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(DescriptionError::Malformed {
                    line: index + 1,
                    message: format!("expected 'Field: value', got '{}'", line),
                });
            };
            fields.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Description { fields })
    }

    /// Returns a field value, or `None` when the field is missing or empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn package(&self) -> Option<&str> {
        self.get("Package")
    }

    /// The declared character encoding, e.g. `latin1`.
    pub fn encoding(&self) -> Option<&str> {
        self.get("Encoding")
    }

    /// All fields as the `meta` object seen by citation files.
    pub fn to_meta(&self) -> Meta {
        self.fields.iter().cloned().collect()
    }
}
