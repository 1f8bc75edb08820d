//! CLI integration tests.
//!
//! Tests the command-line interface by running the binary as a subprocess.

mod common;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

/// A command for the compiled binary with a clean logging and library environment.
fn command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_codemeta-cite"));
    cmd.env_remove("RUST_LOG")
        .env_remove("R_LIBS")
        .env_remove("R_LIBS_USER")
        .env_remove("CODEMETA_DOI_BASE");
    cmd
}

fn run(args: &[&str]) -> Output {
    command()
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, stdout))
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================
// Tests for CLI argument parsing
// ============================================

#[test]
fn test_cli_help() {
    // Given: The CLI binary
    let output = run(&["--help"]);

    // Then: Help is displayed with the subcommands
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Help should exit with success");
    assert!(stdout.contains("codemeta-cite"), "{}", stdout);
    for sub in ["guess", "convert", "types"] {
        assert!(stdout.contains(sub), "Help should list '{}': {}", sub, stdout);
    }
}

#[test]
fn test_cli_convert_missing_args() {
    let output = run(&["convert"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FILE"), "{}", stderr);
}

#[test]
fn test_cli_rejects_unknown_format() {
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    let output = run(&["convert", path_str(file.path()), "--format", "xml"]);

    assert!(!output.status.success());
}

// ============================================
// Tests for the types subcommand
// ============================================

#[test]
fn test_types_subcommand() {
    // When: listing entry types
    let output = run(&["types"]);

    // Then: every type is printed with its schema.org type
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[0], "Article\tScholarlyArticle");
    assert!(lines.contains(&"Manual\tSoftwareSourceCode"));
    assert!(lines.contains(&"Phdthesis\tThesis"));
}

// ============================================
// Tests for the convert subcommand
// ============================================

#[test]
fn test_convert_article() {
    // Given: a citation file declaring an article with a bare DOI
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    // When: converting it
    let output = run(&["convert", path_str(file.path())]);

    // Then: a JSON array with the citation object is printed
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value = stdout_json(&output);
    let citation = &value[0];
    assert_eq!(citation["@type"], "ScholarlyArticle");
    assert_eq!(citation["@id"], "https://doi.org/10.1000/xyz");
    assert_eq!(citation["sameAs"], "https://doi.org/10.1000/xyz");
    assert_eq!(citation["identifier"], "10.1000/xyz");
    assert_eq!(citation["isPartOf"]["issueNumber"], 3);
    assert_eq!(citation["isPartOf"]["isPartOf"]["name"], "Journal of Things");
    assert_eq!(citation["isPartOf"]["isPartOf"]["volumeNumber"], 12);
    assert_eq!(citation["author"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_convert_custom_doi_base() {
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    let output = run(&[
        "convert",
        path_str(file.path()),
        "--doi-base",
        "https://dx.doi.org/",
    ]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[0]["@id"], "https://dx.doi.org/10.1000/xyz");
}

#[test]
fn test_convert_doi_base_from_env() {
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    let output = command()
        .env("CODEMETA_DOI_BASE", "https://resolver.example/")
        .args(["convert", path_str(file.path())])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output)[0]["sameAs"],
        "https://resolver.example/10.1000/xyz"
    );
}

#[test]
fn test_convert_jsonld() {
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    let output = run(&["convert", path_str(file.path()), "--format", "jsonld"]);

    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["@context"], "https://w3id.org/codemeta/3.0");
    assert_eq!(value["citation"][0]["name"], "A Grammar of Things");
}

#[test]
fn test_convert_jsonl() {
    let source = "bibentry(\"Manual\", title = \"One\")\nbibentry(\"Misc\", title = \"Two\")\n";
    let file = common::citation_file(source, None);

    let output = run(&["convert", path_str(file.path()), "-f", "jsonl"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"@type":"SoftwareSourceCode","name":"One"}"#,
            r#"{"@type":"CreativeWork","name":"Two"}"#
        ]
    );
}

#[test]
fn test_convert_with_encoding() {
    // Given: a latin1 file
    let file = common::citation_file(
        "bibentry(\"Manual\", title = \"Caf\u{e9}\")\n",
        Some("latin1"),
    );

    // When: converting it with the right encoding
    let output = run(&["convert", path_str(file.path()), "--encoding", "latin1"]);

    // Then: the text is decoded correctly
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[0]["name"], "Caf\u{e9}");
}

#[test]
fn test_convert_self_citation_is_repaired() {
    // Given: a file that calls citation(auto = meta)
    let source = format!("citation(auto = meta)\n{}", common::ARTICLE_CITATION);
    let file = common::citation_file(&source, None);

    // When: converting it
    let output = run(&["convert", path_str(file.path())]);

    // Then: it succeeds and the repair is reported on stderr
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout_json(&output)[0]["name"], "A Grammar of Things");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("citation(auto = meta)"), "{}", stderr);
}

#[test]
fn test_convert_output_file() {
    // Given: an output path in a temporary directory
    let file = common::citation_file(common::ARTICLE_CITATION, None);
    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().join("citation.json");

    // When: converting with -o
    let output = run(&["convert", path_str(file.path()), "-o", path_str(&out_path)]);

    // Then: the file holds the JSON, stdout is empty and stderr confirms
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let written: Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(written[0]["@type"], "ScholarlyArticle");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("converted 1 citation(s)"), "{}", stderr);
}

#[test]
fn test_verbose_logs_to_stderr() {
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    let output = run(&["-v", "convert", path_str(file.path())]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parsing citation file"), "{}", stderr);
    // stdout stays machine-readable
    stdout_json(&output);
}

// ============================================
// Tests for the guess subcommand
// ============================================

#[test]
fn test_guess_source_package() {
    // Given: a package source directory with inst/CITATION
    let pkg = common::package_dir(common::DESCRIPTION, Some(common::ARTICLE_CITATION));

    // When: guessing its citations
    let output = run(&["guess", path_str(pkg.path())]);

    // Then: the CITATION file is converted
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value.as_array().map(Vec::len), Some(1));
    assert_eq!(value[0]["name"], "A Grammar of Things");
}

#[test]
fn test_guess_uses_description_as_meta() {
    let citation = "bibentry(\"Manual\", title = paste0(meta$Package, \": \", meta$Title),\n         note = paste(\"R package version\", meta$Version))\n";
    let pkg = common::package_dir(common::DESCRIPTION, Some(citation));

    let output = run(&["guess", path_str(pkg.path())]);

    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value[0]["description"], "R package version 1.2.3");
}

#[test]
fn test_guess_installed_package_without_citation() {
    // Given: a library with a package that ships no CITATION file
    let lib = TempDir::new().unwrap();
    common::install_package(lib.path(), "mypkg", common::DESCRIPTION, None);
    let cwd = TempDir::new().unwrap();

    // When: guessing by name
    let output = command()
        .current_dir(cwd.path())
        .args(["guess", "mypkg", "--lib", path_str(lib.path())])
        .output()
        .expect("Failed to execute command");

    // Then: a citation is generated from DESCRIPTION
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        stdout_json(&output),
        json!([{
            "@type": "SoftwareSourceCode",
            "datePublished": 2024,
            "author": [{"@type": "Person", "givenName": "Jane", "familyName": "Doe"}],
            "name": "mypkg: Does Useful Things",
            "url": "https://example.org/mypkg",
            "description": "R package version 1.2.3"
        }])
    );
}

#[test]
fn test_guess_installed_package_from_r_libs() {
    let lib = TempDir::new().unwrap();
    common::install_package(
        lib.path(),
        "mypkg",
        common::DESCRIPTION,
        Some(common::ARTICLE_CITATION),
    );
    let cwd = TempDir::new().unwrap();

    let output = command()
        .current_dir(cwd.path())
        .env("R_LIBS", lib.path())
        .args(["guess", "mypkg"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[0]["@type"], "ScholarlyArticle");
}

#[test]
fn test_guess_unknown_package_is_empty() {
    // Given: an empty library
    let lib = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();

    // When: guessing an unknown package
    let output = command()
        .current_dir(cwd.path())
        .args(["guess", "nosuchpkg", "--lib", path_str(lib.path())])
        .output()
        .expect("Failed to execute command");

    // Then: the result is an empty list, not an error
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_json(&output), json!([]));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no citations found for 'nosuchpkg'"), "{}", stderr);
}

// ============================================
// Tests for exit codes and hints
// ============================================

#[test]
fn test_exit_code_10_input_file_not_found() {
    let output = run(&["convert", "/nonexistent/CITATION"]);

    assert_eq!(
        output.status.code(),
        Some(10),
        "Expected exit code 10 for missing input file, got {:?}",
        output.status.code()
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("hint: verify the file path"), "{}", stderr);
}

#[test]
fn test_exit_code_10_unknown_encoding() {
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    let output = run(&["convert", path_str(file.path()), "--encoding", "klingon-8"]);

    assert_eq!(output.status.code(), Some(10));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown encoding 'klingon-8'"), "{}", stderr);
}

#[test]
fn test_exit_code_11_unparseable_citation_file() {
    // Given: a file with a syntax error unrelated to citation(auto = meta)
    let file = common::citation_file("bibentry(\"Manual\", title = \"x\"\n", None);

    // When: converting it
    let output = run(&["convert", path_str(file.path())]);

    // Then: the dedicated exit code and hint are used
    assert_eq!(
        output.status.code(),
        Some(11),
        "Expected exit code 11 for unparseable citation file, got {:?}",
        output.status.code()
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unreadable citation file"), "{}", stderr);
    assert!(stderr.contains("supported entry types: Article"), "{}", stderr);
}

#[test]
fn test_exit_code_11_unknown_entry_type() {
    let file = common::citation_file("bibentry(\"Online\", title = \"x\")\n", None);

    let output = run(&["convert", path_str(file.path())]);

    assert_eq!(output.status.code(), Some(11));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized entry type 'Online'"), "{}", stderr);
}

#[test]
fn test_exit_code_12_malformed_description() {
    let pkg = common::package_dir("Package: broken\nthis is not a field\n", None);

    let output = run(&["guess", path_str(pkg.path())]);

    assert_eq!(
        output.status.code(),
        Some(12),
        "Expected exit code 12 for malformed DESCRIPTION, got {:?}",
        output.status.code()
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("hint: DESCRIPTION must use"), "{}", stderr);
}

#[test]
fn test_exit_code_15_output_dir_not_writable() {
    let file = common::citation_file(common::ARTICLE_CITATION, None);

    let output = run(&[
        "convert",
        path_str(file.path()),
        "-o",
        "/nonexistent/dir/citation.json",
    ]);

    assert_eq!(
        output.status.code(),
        Some(15),
        "Expected exit code 15 for unwritable output, got {:?}",
        output.status.code()
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("hint: check that the output directory exists"), "{}", stderr);
}
