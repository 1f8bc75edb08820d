//! Choosing where a package's citations come from.

use crate::citation::{Citation, CitationBuilder};
use crate::description::{Description, DescriptionError};
use crate::entry::BibEntry;
use crate::installed::InstalledCitations;
use crate::people::{AuthorParser, SchemaPeople};
use crate::reader::{read_citation_file, ReadError, ReadOptions};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while resolving a package's citations.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Invalid DESCRIPTION: {0}")]
    Description(#[from] DescriptionError),
}

/// Finds a package's citation entries and converts them.
pub struct CitationResolver<I, P = SchemaPeople> {
    builder: CitationBuilder<P>,
    installed: I,
}

impl<I: InstalledCitations, P: AuthorParser> CitationResolver<I, P> {
    pub fn new(builder: CitationBuilder<P>, installed: I) -> Self {
        CitationResolver { builder, installed }
    }

    /// Raw entries for a package, or `None` when no source has any.
    ///
    /// `package` is a package source directory or a bare package name. A
    /// directory's `inst/CITATION` wins; otherwise the installed copy of
    /// the package is asked.
    pub fn entries(&self, package: &str) -> Result<Option<Vec<BibEntry>>, ResolveError> {
        let dir = Path::new(package);
        let description_path = dir.join("DESCRIPTION");
        let description = if description_path.is_file() {
            Some(Description::load(&description_path)?)
        } else {
            None
        };

        let citation = dir.join("inst").join("CITATION");
        if citation.is_file() {
            tracing::info!(path = %citation.display(), "reading citation file");
            let mut options = ReadOptions::default();
            if let Some(description) = &description {
                options = options.with_meta(description.to_meta());
                if let Some(encoding) = description.encoding() {
                    options = options.with_encoding(encoding);
                }
            }
            return Ok(Some(read_citation_file(&citation, &options)?));
        }

        let name = description
            .as_ref()
            .and_then(|d| d.package())
            .map(String::from)
            .or_else(|| dir.file_name().and_then(|n| n.to_str()).map(String::from));

        if let Some(name) = name {
            if let Some(entries) = self.installed.citation_entries(&name)? {
                tracing::info!(package = %name, "using installed package metadata");
                return Ok(Some(entries));
            }
        }

        tracing::info!(package = %package, "no citation source found");
        Ok(None)
    }

    /// Citations for a package, in source order; empty when none are declared.
    pub fn guess_citations(&self, package: &str) -> Result<Vec<Citation>, ResolveError> {
        Ok(self
            .entries(package)?
            .map(|entries| self.builder.build_all(&entries))
            .unwrap_or_default())
    }
}
