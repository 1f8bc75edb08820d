//! CLI for codemeta-cite - Convert R package citations into CodeMeta objects.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use codemeta_cite::{
    read_citation_file, render_citations, Citation, CitationBuilder, CitationResolver, EntryType,
    OutputFormat, RLibrary, ReadError, ReadOptions, ResolveError, DOI_BASE_URL,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Convert R package citations into schema.org / CodeMeta objects
#[derive(Parser)]
#[command(name = "codemeta-cite")]
#[command(version)]
#[command(after_help = "\
Examples:
  codemeta-cite guess path/to/mypkg
  codemeta-cite guess ggplot2 --lib ~/R/library --format jsonld
  codemeta-cite convert inst/CITATION --encoding latin1 -o citation.json
  codemeta-cite types")]
struct Cli {
    /// Log progress to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find and convert the citations of a package
    #[command(after_help = "\
PACKAGE is a package source directory or the name of an installed package.
A source directory's inst/CITATION is used first; otherwise the installed
copy is looked up in --lib directories (default: R_LIBS, R_LIBS_USER).")]
    Guess {
        /// Package source directory or installed package name
        package: String,

        /// Library directory to search for installed packages (repeatable)
        #[arg(short, long = "lib", value_name = "DIR")]
        libs: Vec<PathBuf>,

        /// Output layout
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base URL prepended to bare DOIs
        #[arg(long, env = "CODEMETA_DOI_BASE", default_value = DOI_BASE_URL)]
        doi_base: String,
    },

    /// Convert a single citation file
    Convert {
        /// Citation file to read
        file: PathBuf,

        /// Character encoding of the file (default: UTF-8)
        #[arg(short, long)]
        encoding: Option<String>,

        /// Output layout
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base URL prepended to bare DOIs
        #[arg(long, env = "CODEMETA_DOI_BASE", default_value = DOI_BASE_URL)]
        doi_base: String,
    },

    /// List supported entry types and their schema.org types
    Types,
}

// ---------------------------------------------------------------------------
// AppError: semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10: input file not found / unreadable
    InputFile(String),
    /// Exit 11: citation file cannot be parsed
    CitationFile(String),
    /// Exit 12: package DESCRIPTION invalid
    PackageMetadata(String),
    /// Exit 15: cannot write output
    OutputFile(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::InputFile(_) => 10,
            AppError::CitationFile(_) => 11,
            AppError::PackageMetadata(_) => 12,
            AppError::OutputFile(_) => 15,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputFile(msg) => {
                write!(f, "{}\n  hint: verify the file path and encoding are correct", msg)
            }
            AppError::CitationFile(msg) => {
                let types: Vec<_> = EntryType::all().map(EntryType::tag).collect();
                write!(
                    f,
                    "{}\n  supported entry types: {}\n  hint: citation files may only use bibentry(), citEntry(), person(), c(), paste(), sprintf(), sub()/gsub(), format() and meta$Field",
                    msg,
                    types.join(", ")
                )
            }
            AppError::PackageMetadata(msg) => {
                write!(
                    f,
                    "{}\n  hint: DESCRIPTION must use 'Field: value' lines with indented continuations",
                    msg
                )
            }
            AppError::OutputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
        }
    }
}

impl From<ReadError> for AppError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::UnreadableSourceFile { .. } => AppError::CitationFile(e.to_string()),
            ReadError::IoError(_) | ReadError::UnknownEncoding(_) => {
                AppError::InputFile(e.to_string())
            }
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Read(inner) => inner.into(),
            ResolveError::Description(_) => AppError::PackageMetadata(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Guess {
            package,
            libs,
            format,
            output,
            doi_base,
        } => {
            guess_command(&package, libs, format, output.as_deref(), doi_base)?;
        }
        Commands::Convert {
            file,
            encoding,
            format,
            output,
            doi_base,
        } => {
            convert_command(&file, encoding, format, output.as_deref(), doi_base)?;
        }
        Commands::Types => {
            types_command();
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Resolve and convert a package's citations.
fn guess_command(
    package: &str,
    libs: Vec<PathBuf>,
    format: OutputFormat,
    output: Option<&Path>,
    doi_base: String,
) -> Result<(), AppError> {
    let library = if libs.is_empty() {
        RLibrary::from_env()
    } else {
        RLibrary::new(libs)
    };
    tracing::debug!(paths = ?library.paths(), "library search path");

    let resolver = CitationResolver::new(CitationBuilder::new().with_doi_base(doi_base), library);
    let citations = resolver.guess_citations(package)?;
    if citations.is_empty() {
        eprintln!("no citations found for '{}'", package);
    }

    write_citations(&citations, format, output)
}

/// Convert a single citation file.
fn convert_command(
    file: &Path,
    encoding: Option<String>,
    format: OutputFormat,
    output: Option<&Path>,
    doi_base: String,
) -> Result<(), AppError> {
    if !file.is_file() {
        return Err(AppError::InputFile(format!(
            "'{}': no such file",
            file.display()
        )));
    }

    let options = ReadOptions {
        encoding,
        ..ReadOptions::default()
    };
    let entries = read_citation_file(file, &options)?;
    let citations = CitationBuilder::new()
        .with_doi_base(doi_base)
        .build_all(&entries);

    write_citations(&citations, format, output)
}

/// Print the entry-type table.
fn types_command() {
    for ty in EntryType::all() {
        println!("{}\t{}", ty.tag(), ty.schema_type());
    }
}

fn write_citations(
    citations: &[Citation],
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), AppError> {
    let rendered = render_citations(citations, format)
        .map_err(|e| AppError::OutputFile(format!("failed to serialize citations: {}", e)))?;

    if let Some(output_path) = output {
        fs::write(output_path, &rendered).map_err(|e| {
            AppError::OutputFile(format!("'{}': {}", output_path.display(), e))
        })?;
        eprintln!(
            "converted {} citation(s), wrote {}",
            citations.len(),
            output_path.display()
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write!(handle, "{}", rendered)
            .map_err(|e| AppError::OutputFile(format!("stdout: {}", e)))?;
    }

    Ok(())
}
