//! Bibliographic entries and the entry-type table.
//!
//! A [`BibEntry`] is the loosely-typed record read from a `CITATION` file or
//! derived from package metadata. Only the fields that end up in a citation
//! object are kept.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when an entry-type tag is not part of the fixed table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized entry type '{0}'")]
pub struct UnrecognizedEntryType(pub String);

/// The bibliographic entry types a citation can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Article,
    Book,
    Booklet,
    Inbook,
    Incollection,
    Inproceedings,
    Manual,
    Mastersthesis,
    Misc,
    Phdthesis,
    Proceedings,
    Techreport,
    Unpublished,
}

/// Single source of truth for entry types: (variant, tag, schema.org type).
const ENTRY_TYPES: &[(EntryType, &str, &str)] = &[
    (EntryType::Article, "Article", "ScholarlyArticle"),
    (EntryType::Book, "Book", "Book"),
    (EntryType::Booklet, "Booklet", "Book"),
    (EntryType::Inbook, "Inbook", "Chapter"),
    (EntryType::Incollection, "Incollection", "CreativeWork"),
    (EntryType::Inproceedings, "Inproceedings", "ScholarlyArticle"),
    (EntryType::Manual, "Manual", "SoftwareSourceCode"),
    (EntryType::Mastersthesis, "Mastersthesis", "Thesis"),
    (EntryType::Misc, "Misc", "CreativeWork"),
    (EntryType::Phdthesis, "Phdthesis", "Thesis"),
    (EntryType::Proceedings, "Proceedings", "ScholarlyArticle"),
    (EntryType::Techreport, "Techreport", "ScholarlyArticle"),
    (EntryType::Unpublished, "Unpublished", "CreativeWork"),
];

impl EntryType {
    /// Every entry type, in table order.
    pub fn all() -> impl Iterator<Item = EntryType> {
        ENTRY_TYPES.iter().map(|(ty, _, _)| *ty)
    }

    fn row(self) -> &'static (EntryType, &'static str, &'static str) {
        ENTRY_TYPES
            .iter()
            .find(|(ty, _, _)| *ty == self)
            .unwrap_or_else(|| unreachable!("every variant has a table row"))
    }

    /// The title-case tag, e.g. `"Inproceedings"`.
    pub fn tag(self) -> &'static str {
        self.row().1
    }

    /// The schema.org type label this entry type maps to.
    pub fn schema_type(self) -> &'static str {
        self.row().2
    }

    /// Looks up a raw `bibtype` value after normalizing it to title case.
    ///
    /// `"article"`, `"ARTICLE"` and `"Article"` all resolve to
    /// [`EntryType::Article`]. Anything outside the table is rejected.
    pub fn from_bibtype(raw: &str) -> Result<EntryType, UnrecognizedEntryType> {
        let raw = raw.trim();
        let mut chars = raw.chars();
        let normalized: String = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        normalized
            .parse::<EntryType>()
            .map_err(|_| UnrecognizedEntryType(raw.to_string()))
    }
}

impl FromStr for EntryType {
    type Err = UnrecognizedEntryType;

    /// Case-sensitive lookup of a title-case tag.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ENTRY_TYPES
            .iter()
            .find(|(_, t, _)| *t == tag)
            .map(|(ty, _, _)| *ty)
            .ok_or_else(|| UnrecognizedEntryType(tag.to_string()))
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A scalar field value that keeps the numeric/text distinction of the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// Builds a text value, treating blank strings as absent.
    pub fn text(value: impl Into<String>) -> Option<FieldValue> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(FieldValue::Text(value))
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// A person or organization named on an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub given: Vec<String>,
    pub family: Option<String>,
    pub email: Option<String>,
    pub role: Vec<String>,
    /// Free-form comments keyed by name, e.g. `ORCID`.
    pub comment: BTreeMap<String, String>,
}

impl Person {
    /// True when the person carries the given role code (e.g. `"aut"`).
    pub fn has_role(&self, role: &str) -> bool {
        self.role.iter().any(|r| r == role)
    }
}

/// One bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: EntryType,
    pub title: Option<String>,
    pub author: Vec<Person>,
    pub year: Option<FieldValue>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub note: Option<String>,
    pub pages: Option<FieldValue>,
    pub journal: Option<String>,
    pub volume: Option<FieldValue>,
    pub number: Option<FieldValue>,
}

impl BibEntry {
    /// Creates an entry with only its type set.
    pub fn new(entry_type: EntryType) -> Self {
        BibEntry {
            entry_type,
            title: None,
            author: Vec::new(),
            year: None,
            doi: None,
            url: None,
            note: None,
            pages: None,
            journal: None,
            volume: None,
            number: None,
        }
    }
}
