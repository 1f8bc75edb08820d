//! Building schema.org citation objects from bibliographic entries.

use crate::doi::{normalize_doi, DOI_BASE_URL};
use crate::entry::{BibEntry, FieldValue};
use crate::journal::{nest_journal, PublicationIssue};
use crate::people::{AuthorParser, Context, SchemaPeople};
use serde::Serialize;
use serde_json::Value;

/// A schema.org / CodeMeta citation.
///
/// Absent properties are skipped when serializing, so a serialized citation
/// never carries a `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    #[serde(rename = "@type")]
    pub schema_type: &'static str,
    #[serde(rename = "datePublished", skip_serializing_if = "Option::is_none")]
    pub date_published: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The DOI exactly as declared on the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<FieldValue>,
    /// Canonical DOI URL.
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Same value as `id`, for consumers following cross-references.
    #[serde(rename = "sameAs", skip_serializing_if = "Option::is_none")]
    pub same_as: Option<String>,
    #[serde(rename = "isPartOf", skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<PublicationIssue>,
}

/// Turns [`BibEntry`] values into [`Citation`] values.
pub struct CitationBuilder<P = SchemaPeople> {
    doi_base: String,
    people: P,
}

impl Default for CitationBuilder<SchemaPeople> {
    fn default() -> Self {
        CitationBuilder::new()
    }
}

impl CitationBuilder<SchemaPeople> {
    /// A builder using the public DOI resolver and [`SchemaPeople`].
    pub fn new() -> Self {
        CitationBuilder {
            doi_base: DOI_BASE_URL.to_string(),
            people: SchemaPeople,
        }
    }
}

impl<P: AuthorParser> CitationBuilder<P> {
    /// Replaces the author parser.
    pub fn with_author_parser<Q: AuthorParser>(self, people: Q) -> CitationBuilder<Q> {
        CitationBuilder {
            doi_base: self.doi_base,
            people,
        }
    }

    /// Replaces the DOI resolver base URL.
    pub fn with_doi_base(mut self, base: impl Into<String>) -> Self {
        self.doi_base = base.into();
        self
    }

    pub fn doi_base(&self) -> &str {
        &self.doi_base
    }

    /// Builds the citation for one entry.
    pub fn build(&self, entry: &BibEntry) -> Citation {
        let author = self
            .people
            .parse_people(&entry.author, Context::new())
            .remove("author")
            .filter(|a| !is_empty_value(a));

        let canonical_doi = normalize_doi(entry.doi.as_deref(), &self.doi_base);

        Citation {
            schema_type: entry.entry_type.schema_type(),
            date_published: entry.year.clone(),
            author,
            name: entry.title.clone(),
            identifier: entry.doi.clone(),
            url: entry.url.clone(),
            description: entry.note.clone(),
            pagination: entry.pages.clone(),
            id: canonical_doi.clone(),
            same_as: canonical_doi,
            is_part_of: nest_journal(entry),
        }
    }

    /// Builds citations for a sequence of entries, keeping their order.
    pub fn build_all(&self, entries: &[BibEntry]) -> Vec<Citation> {
        entries.iter().map(|e| self.build(e)).collect()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
