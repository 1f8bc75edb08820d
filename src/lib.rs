//! codemeta-cite: convert R package citations into schema.org / CodeMeta objects.
//!
//! This library provides functionality to:
//! - Parse `CITATION` files and `DESCRIPTION` metadata
//! - Repair citation files that call `citation(auto = meta)` on themselves
//! - Map BibTeX-style entries to schema.org citation objects
//! - Resolve the citations of source or installed packages

pub mod citation;
pub mod citefile;
pub mod description;
pub mod doi;
pub mod entry;
pub mod installed;
pub mod journal;
pub mod output;
pub mod people;
pub mod reader;
pub mod resolver;

pub use citation::{Citation, CitationBuilder};
pub use citefile::{parse_citation_source, Meta, ParseError};
pub use description::{Description, DescriptionError};
pub use doi::{normalize_doi, DOI_BASE_URL};
pub use entry::{BibEntry, EntryType, FieldValue, Person, UnrecognizedEntryType};
pub use installed::{auto_citation, InstalledCitations, RLibrary};
pub use journal::{nest_journal, PublicationIssue, PublicationVolume};
pub use output::{render_citations, OutputFormat};
pub use people::{AuthorParser, SchemaPeople};
pub use reader::{read_citation_file, ReadError, ReadOptions};
pub use resolver::{CitationResolver, ResolveError};
