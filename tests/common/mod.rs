//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;

use encoding_rs::Encoding;
use tempfile::{NamedTempFile, TempDir};

/// A DESCRIPTION for a small package without a CITATION file.
pub const DESCRIPTION: &str = "Package: mypkg
Title: Does Useful
    Things
Version: 1.2.3
Authors@R: c(person(\"Jane\", \"Doe\", role = c(\"aut\", \"cre\")),
    person(\"Cal\", \"Contrib\", role = \"ctb\"))
URL: https://example.org/mypkg
Date/Publication: 2024-02-03 12:00:00 UTC
";

/// A citation file declaring one article with a bare DOI.
pub const ARTICLE_CITATION: &str = r#"citHeader("To cite mypkg in publications use:")

bibentry(bibtype = "Article",
         title   = "A Grammar of Things",
         author  = c(person("Jane", "Doe"), person("John", "Smith")),
         journal = "Journal of Things",
         year    = 2020,
         volume  = 12,
         number  = 3,
         doi     = "10.1000/xyz")
"#;

/// Writes citation source to a temporary file.
///
/// With an `encoding` label the UTF-8 source is re-encoded first, so the file
/// holds the bytes a package using that encoding would ship.
pub fn citation_file(content: &str, encoding: Option<&str>) -> NamedTempFile {
    let bytes = match encoding.and_then(|label| Encoding::for_label(label.as_bytes())) {
        Some(encoding) => encoding.encode(content).0.into_owned(),
        None => content.as_bytes().to_vec(),
    };

    let mut file = tempfile::Builder::new()
        .prefix("CITATION")
        .tempfile()
        .unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Creates a package source directory with a DESCRIPTION and, optionally,
/// an `inst/CITATION` file.
pub fn package_dir(description: &str, citation: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("DESCRIPTION"), description).unwrap();
    if let Some(citation) = citation {
        fs::create_dir(dir.path().join("inst")).unwrap();
        fs::write(dir.path().join("inst").join("CITATION"), citation).unwrap();
    }
    dir
}

/// Installs a package into a library directory as `<lib>/<name>/`.
pub fn install_package(lib: &Path, name: &str, description: &str, citation: Option<&str>) {
    let dir = lib.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("DESCRIPTION"), description).unwrap();
    if let Some(citation) = citation {
        fs::write(dir.join("CITATION"), citation).unwrap();
    }
}
