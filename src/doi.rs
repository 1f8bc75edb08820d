//! DOI canonicalization.

use regex::Regex;
use std::sync::LazyLock;

/// Base URL of the DOI resolution service.
pub const DOI_BASE_URL: &str = "https://doi.org/";

static BARE_DOI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.").expect("bare DOI pattern is valid"));

/// Normalizes a DOI to its canonical resolver URL.
///
/// # Arguments
///
/// * `doi` - The raw DOI as found on the entry, if any
/// * `base` - The resolver base URL (usually [`DOI_BASE_URL`])
///
/// # Returns
///
/// * the input unchanged when it already starts with `base`
/// * `base` followed by the DOI when it is a bare `10.` DOI
/// * `None` otherwise; an unrecognized DOI is dropped, not reported
pub fn normalize_doi(doi: Option<&str>, base: &str) -> Option<String> {
    let doi = doi?;

    if doi.starts_with(base) {
        return Some(doi.to_string());
    }

    if BARE_DOI.is_match(doi) {
        return Some(format!("{}{}", base, doi));
    }

    tracing::debug!(doi = %doi, "discarding DOI that is neither a resolver URL nor a bare DOI");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_doi_absent() {
        assert_eq!(normalize_doi(None, DOI_BASE_URL), None);
    }

    #[test]
    fn test_normalize_doi_canonical_unchanged() {
        // Given: a DOI already in resolver URL form
        let doi = "https://doi.org/10.1000/xyz";

        // When: we normalize it
        let result = normalize_doi(Some(doi), DOI_BASE_URL);

        // Then: it is returned as-is
        assert_eq!(result.as_deref(), Some(doi));
    }

    #[test]
    fn test_normalize_doi_bare() {
        let result = normalize_doi(Some("10.1000/xyz"), DOI_BASE_URL);
        assert_eq!(result.as_deref(), Some("https://doi.org/10.1000/xyz"));
    }

    #[test]
    fn test_normalize_doi_unrecognized_is_dropped() {
        assert_eq!(normalize_doi(Some("doi:10.1000/xyz"), DOI_BASE_URL), None);
        assert_eq!(
            normalize_doi(Some("http://dx.doi.org/10.1000/xyz"), DOI_BASE_URL),
            None
        );
        assert_eq!(normalize_doi(Some("not a doi"), DOI_BASE_URL), None);
    }

    #[test]
    fn test_normalize_doi_requires_literal_dot() {
        // "10" followed by anything other than "." is not a DOI prefix
        assert_eq!(normalize_doi(Some("10/1000"), DOI_BASE_URL), None);
    }

    #[test]
    fn test_normalize_doi_custom_base() {
        let base = "https://resolver.example/";
        assert_eq!(
            normalize_doi(Some("10.5281/zenodo.1"), base).as_deref(),
            Some("https://resolver.example/10.5281/zenodo.1")
        );
        assert_eq!(
            normalize_doi(Some("https://resolver.example/10.1/a"), base).as_deref(),
            Some("https://resolver.example/10.1/a")
        );
    }
}
