//! Nested journal / volume / issue structure for `isPartOf`.

use crate::entry::{BibEntry, FieldValue};
use serde::Serialize;

/// The issue an article appeared in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationIssue {
    #[serde(rename = "@type")]
    pub schema_type: &'static str,
    #[serde(rename = "issueNumber", skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<FieldValue>,
    #[serde(rename = "datePublished", skip_serializing_if = "Option::is_none")]
    pub date_published: Option<FieldValue>,
    #[serde(rename = "isPartOf")]
    pub is_part_of: PublicationVolume,
}

/// The volume of a periodical; typed as both `PublicationVolume` and `Periodical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationVolume {
    #[serde(rename = "@type")]
    pub schema_type: [&'static str; 2],
    #[serde(rename = "volumeNumber", skip_serializing_if = "Option::is_none")]
    pub volume_number: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Builds the `isPartOf` fragment for an entry.
///
/// Returns `None` when the entry names no journal. Otherwise the issue and
/// volume levels are always present with their `@type` markers, and only
/// the data fields the entry actually has are filled in.
pub fn nest_journal(entry: &BibEntry) -> Option<PublicationIssue> {
    let journal = entry.journal.as_ref()?;

    Some(PublicationIssue {
        schema_type: "PublicationIssue",
        issue_number: entry.number.clone(),
        date_published: entry.year.clone(),
        is_part_of: PublicationVolume {
            schema_type: ["PublicationVolume", "Periodical"],
            volume_number: entry.volume.clone(),
            name: Some(journal.clone()),
        },
    })
}
