//! Citations of installed packages.
//!
//! An installed package lives in a library directory as `<lib>/<pkg>/` with
//! its `DESCRIPTION` and, when the package ships one, its `CITATION` file.
//! Packages without a `CITATION` file get a `Manual` entry generated from
//! their `DESCRIPTION`.

use crate::citefile::{parse_author_field, parse_people_expr};
use crate::description::Description;
use crate::entry::{BibEntry, EntryType, FieldValue, Person};
use crate::reader::{read_citation_file, ReadOptions};
use crate::resolver::ResolveError;
use std::env;
use std::path::PathBuf;

/// Fields tried, in order, for the publication year of an auto-generated citation.
const DATE_FIELDS: &[&str] = &["Date/Publication", "Packaged", "Date"];

/// A source of citation entries for packages that are installed somewhere.
pub trait InstalledCitations {
    /// Returns the package's entries, or `None` when it is not installed.
    fn citation_entries(&self, package: &str) -> Result<Option<Vec<BibEntry>>, ResolveError>;
}

/// Installed packages found in a list of library directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RLibrary {
    paths: Vec<PathBuf>,
}

impl RLibrary {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        RLibrary { paths }
    }

    /// Library directories from `R_LIBS` and `R_LIBS_USER`, in that order.
    pub fn from_env() -> Self {
        let paths = ["R_LIBS", "R_LIBS_USER"]
            .iter()
            .filter_map(|var| env::var_os(var))
            .flat_map(|value| env::split_paths(&value).collect::<Vec<_>>())
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        RLibrary { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Directory of the first installed copy of `package`.
    pub fn find(&self, package: &str) -> Option<PathBuf> {
        self.paths
            .iter()
            .map(|lib| lib.join(package))
            .find(|dir| dir.join("DESCRIPTION").is_file())
    }
}

impl InstalledCitations for RLibrary {
    fn citation_entries(&self, package: &str) -> Result<Option<Vec<BibEntry>>, ResolveError> {
        let Some(dir) = self.find(package) else {
            return Ok(None);
        };
        let description = Description::load(&dir.join("DESCRIPTION"))?;

        let citation = dir.join("CITATION");
        if citation.is_file() {
            tracing::debug!(path = %citation.display(), "using installed CITATION file");
            let mut options = ReadOptions::default().with_meta(description.to_meta());
            if let Some(encoding) = description.encoding() {
                options = options.with_encoding(encoding);
            }
            return Ok(Some(read_citation_file(&citation, &options)?));
        }

        tracing::debug!(package = %package, "generating citation from installed DESCRIPTION");
        Ok(Some(vec![auto_citation(&description, package)]))
    }
}

/// Builds the default `Manual` citation for a package from its metadata.
///
/// Missing fields are left out; in particular a package without any date
/// field simply gets no year.
pub fn auto_citation(description: &Description, fallback_name: &str) -> BibEntry {
    let name = description.package().unwrap_or(fallback_name);
    let mut entry = BibEntry::new(EntryType::Manual);

    entry.title = Some(match description.get("Title") {
        Some(title) => format!("{}: {}", name, collapse_whitespace(title)),
        None => name.to_string(),
    });
    entry.author = package_authors(description);
    entry.year = DATE_FIELDS
        .iter()
        .filter_map(|field| description.get(field))
        .find_map(leading_year);
    entry.note = description
        .get("Version")
        .map(|v| format!("R package version {}", v));
    entry.url = description.get("URL").and_then(|urls| {
        urls.split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .find(|u| !u.is_empty())
            .map(String::from)
    });

    entry
}

/// Authors from `Authors@R` (authors and maintainer only), falling back to the
/// free-text `Author` field.
fn package_authors(description: &Description) -> Vec<Person> {
    if let Some(source) = description.get("Authors@R") {
        match parse_people_expr(source, &description.to_meta()) {
            Ok(people) => {
                let authors: Vec<Person> = people
                    .into_iter()
                    .filter(|p| p.has_role("aut") || p.has_role("cre"))
                    .map(|p| Person {
                        role: Vec::new(),
                        ..p
                    })
                    .collect();
                if !authors.is_empty() {
                    return authors;
                }
            }
            Err(err) => tracing::warn!(error = %err, "ignoring unparseable Authors@R"),
        }
    }

    // Unannotated names count as authors, as with person()'s default role.
    description
        .get("Author")
        .map(|text| {
            parse_author_field(text)
                .into_iter()
                .filter(|p| p.role.is_empty() || p.has_role("aut") || p.has_role("cre"))
                .map(|p| Person {
                    role: Vec::new(),
                    ..p
                })
                .collect()
        })
        .unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn leading_year(value: &str) -> Option<FieldValue> {
    let year = value.trim().get(..4)?;
    if year.chars().all(|c| c.is_ascii_digit()) {
        year.parse().ok().map(FieldValue::Integer)
    } else {
        None
    }
}
