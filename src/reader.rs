//! Reading citation files, with a repair path for self-citing files.
//!
//! Some packages put `citation(auto = meta)` in their `CITATION` file, which
//! asks for the package's own auto-generated citation and cannot be
//! evaluated while that file is being read. When the direct parse fails for
//! exactly that reason, the offending lines are removed into a temporary copy
//! and the parse is retried once. Every other failure is final.

use crate::citefile::{parse_citation_source, Meta, ParseError};
use crate::entry::BibEntry;
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::NamedTempFile;
use thiserror::Error;

static SELF_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"citation\s*\(\s*auto\s*=\s*meta\s*\)").expect("self-citation pattern is valid")
});

/// Errors that can occur when reading a citation file.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("Unreadable citation file '{}': {source}", .path.display())]
    UnreadableSourceFile { path: PathBuf, source: ParseError },
}

/// Options shared by the direct parse and the repaired retry.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Encoding label such as `UTF-8` or `latin1`; UTF-8 when unset.
    pub encoding: Option<String>,
    /// Package metadata exposed to the file as `meta`.
    pub meta: Meta,
}

impl ReadOptions {
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    fn resolve_encoding(&self) -> Result<&'static Encoding, ReadError> {
        match &self.encoding {
            None => Ok(UTF_8),
            Some(label) => Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| ReadError::UnknownEncoding(label.clone())),
        }
    }
}

/// Where the reader is in its parse-or-repair sequence.
#[derive(Debug)]
enum ReadPhase {
    DirectParse,
    /// Holding the repaired copy; it is deleted when this phase is left.
    RepairAttempted(NamedTempFile),
    Failed(ParseError),
}

/// Source bytes with the self-citation lines taken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub bytes: Vec<u8>,
    /// Number of lines removed.
    pub removed: usize,
}

/// Drops every line containing a `citation(auto = meta)` call.
///
/// Works on raw bytes so the repaired copy keeps the source encoding.
pub fn repair_source(source: &[u8]) -> Repaired {
    let mut bytes = Vec::with_capacity(source.len());
    let mut removed = 0;

    for line in source.split_inclusive(|b| *b == b'\n') {
        if SELF_CITATION.is_match(line) {
            removed += 1;
        } else {
            bytes.extend_from_slice(line);
        }
    }

    Repaired { bytes, removed }
}

/// Reads bibliographic entries from a citation file.
///
/// # Arguments
///
/// * `path` - Path to the citation file
/// * `options` - Encoding and `meta` used for the parse and any retry
///
/// # Returns
///
/// The entries declared in the file, in order.
///
/// # Errors
///
/// * [`ReadError::IoError`] if the file (or the temporary copy) cannot be read or written
/// * [`ReadError::UnknownEncoding`] if the encoding label is not recognized
/// * [`ReadError::UnreadableSourceFile`] if parsing fails, after the one repair if applicable
pub fn read_citation_file(path: &Path, options: &ReadOptions) -> Result<Vec<BibEntry>, ReadError> {
    let mut phase = ReadPhase::DirectParse;

    loop {
        phase = match phase {
            ReadPhase::DirectParse => {
                tracing::debug!(path = %path.display(), "parsing citation file");
                match parse_file(path, options)? {
                    Ok(entries) => return Ok(entries),
                    Err(err) if err.is_self_referential() => {
                        let repaired = repair_source(&fs::read(path)?);
                        if repaired.removed == 0 {
                            tracing::debug!(
                                path = %path.display(),
                                line = err.line(),
                                "no citation(auto = meta) line to remove; not retrying"
                            );
                            ReadPhase::Failed(err)
                        } else {
                            tracing::warn!(
                                path = %path.display(),
                                line = err.line(),
                                "citation file calls citation(auto = meta); retrying without it"
                            );
                            ReadPhase::RepairAttempted(write_repaired(&repaired)?)
                        }
                    }
                    Err(err) => ReadPhase::Failed(err),
                }
            }
            ReadPhase::RepairAttempted(repaired) => {
                tracing::debug!(copy = %repaired.path().display(), "parsing repaired copy");
                match parse_file(repaired.path(), options)? {
                    Ok(entries) => return Ok(entries),
                    Err(err) => ReadPhase::Failed(err),
                }
            }
            ReadPhase::Failed(source) => {
                return Err(ReadError::UnreadableSourceFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
    }
}

/// Decodes and parses one file. The outer error is I/O or encoding, the
/// inner one is a parse failure the state machine decides about.
fn parse_file(
    path: &Path,
    options: &ReadOptions,
) -> Result<Result<Vec<BibEntry>, ParseError>, ReadError> {
    let encoding = options.resolve_encoding()?;
    let bytes = fs::read(path)?;

    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        tracing::warn!(
            path = %path.display(),
            encoding = encoding.name(),
            "citation file contains invalid byte sequences"
        );
    }

    Ok(parse_citation_source(&text, &options.meta))
}

fn write_repaired(repaired: &Repaired) -> Result<NamedTempFile, ReadError> {
    tracing::debug!(removed = repaired.removed, "removed self-citation lines");

    let mut file = tempfile::Builder::new()
        .prefix("CITATION-")
        .tempfile()?;
    file.write_all(&repaired.bytes)?;
    file.flush()?;
    Ok(file)
}
