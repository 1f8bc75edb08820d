//! Citation-file parsing.
//!
//! A `CITATION` file declares entries with R-style calls:
//!
//! ```text
//! citHeader("To cite mypkg in publications use:")
//!
//! bibentry(bibtype = "Article",
//!          title   = "A Grammar of Things",
//!          author  = c(person("Jane", "Doe"), person("John", "Smith")),
//!          journal = "Journal of Things",
//!          year    = 2020,
//!          volume  = 12,
//!          doi     = "10.1000/xyz")
//! ```
//!
//! Only the subset of the language such files use in practice is understood:
//! literals, variables, `meta$Field`, and a fixed set of functions
//! (`bibentry`, `citEntry`, `citHeader`, `citFooter`, `person`, `as.person`,
//! `c`, `paste`, `paste0`, `sprintf`, `sub`, `gsub`, `format`, `I`).
//! Anything else is an error.

mod eval;
mod lexer;
mod parser;

use crate::entry::{BibEntry, Person, UnrecognizedEntryType};
use std::collections::BTreeMap;
use thiserror::Error;

/// Package metadata visible to the file as `meta`, e.g. `meta$Version`.
pub type Meta = BTreeMap<String, String>;

/// Errors raised while reading citation source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: could not find function \"{name}\"")]
    UnknownFunction { line: usize, name: String },

    #[error("line {line}: object '{name}' not found")]
    UnknownVariable { line: usize, name: String },

    #[error("line {line}: recursive citation(auto = meta) call")]
    SelfReferentialCitation { line: usize },

    #[error("line {line}: {source}")]
    EntryType {
        line: usize,
        source: UnrecognizedEntryType,
    },

    #[error("line {line}: invalid arguments to {function}(): {message}")]
    InvalidArgument {
        line: usize,
        function: String,
        message: String,
    },
}

impl ParseError {
    /// The 1-based line the error was found on.
    pub fn line(&self) -> usize {
        match self {
            ParseError::Syntax { line, .. }
            | ParseError::UnknownFunction { line, .. }
            | ParseError::UnknownVariable { line, .. }
            | ParseError::SelfReferentialCitation { line }
            | ParseError::EntryType { line, .. }
            | ParseError::InvalidArgument { line, .. } => *line,
        }
    }

    /// True for the `citation(auto = meta)` failure that can be repaired.
    pub fn is_self_referential(&self) -> bool {
        matches!(self, ParseError::SelfReferentialCitation { .. })
    }
}

/// Parses citation source text into bibliographic entries, in declaration order.
///
/// # Arguments
///
/// * `source` - The decoded file content
/// * `meta` - Package metadata exposed to the file as `meta`
///
/// # Errors
///
/// Returns the first syntax or evaluation error encountered.
pub fn parse_citation_source(source: &str, meta: &Meta) -> Result<Vec<BibEntry>, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let statements = parser::parse(tokens)?;
    eval::Evaluator::new(meta).run(&statements)
}

/// Evaluates a single expression that yields people, such as an
/// `Authors@R` field.
pub fn parse_people_expr(source: &str, meta: &Meta) -> Result<Vec<Person>, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let statements = parser::parse(tokens)?;
    let evaluator = eval::Evaluator::new(meta);

    let mut people = Vec::new();
    for stmt in &statements {
        let parser::Stmt::Expr(expr) = stmt else {
            continue;
        };
        match evaluator.eval(expr)? {
            eval::Value::People(found) => people.extend(found),
            eval::Value::Text(text) => people.extend(eval::parse_person_text(&text)),
            _ => {}
        }
    }
    Ok(people)
}

/// Parses a free-text author list, such as a `DESCRIPTION` `Author` field,
/// where names are separated by commas, newlines or `and`.
pub fn parse_author_field(text: &str) -> Vec<Person> {
    eval::split_names(text, true)
        .into_iter()
        .filter_map(eval::person_from_text)
        .collect()
}
