use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sfzlint::catalog::{self, Filter};
use sfzlint::render::{self, Format, entry::render_entry};
use sfzlint::spec::Version;
use sfzlint::{LintConfig, Linter, Registry, Result, find_sfz_files};

#[derive(Parser, Debug)]
#[command(name = "sfzlint")]
#[command(about = "Lint sfz sample-instrument files", long_about = None)]
struct Cli {
    /// Repeat for more logging on stderr (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Opcode table to use instead of the built-in one.
    #[arg(long, global = true)]
    spec: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lint a file, or every .sfz file under a directory.
    Lint {
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Default)]
        format: Format,

        /// Target revisions; each one implies its ancestors.
        #[arg(long, value_enum, num_args = 1..)]
        spec_version: Vec<Version>,

        /// Base directory for the root file's includes and samples.
        #[arg(long)]
        rel_path: Option<PathBuf>,

        /// Skip sample file existence checks.
        #[arg(long)]
        no_file_check: bool,

        /// Stop starting new files after the first one with an error.
        #[arg(long)]
        fail_fast: bool,
    },

    /// List known opcodes.
    List {
        /// Substring of the opcode name or one of its aliases.
        #[arg(long)]
        search: Option<String>,

        /// key=value with key one of version, type, modulates.
        #[arg(long)]
        filter: Vec<Filter>,

        /// Only list opcodes used by the sfz files under this path.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sfzlint: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let registry = load_registry(cli.spec.as_deref())?;

    match cli.cmd {
        Commands::Lint {
            path,
            format,
            spec_version,
            rel_path,
            no_file_check,
            fail_fast,
        } => {
            let config = LintConfig {
                rel_path,
                spec_versions: spec_version,
                check_files: !no_file_check,
                fail_fast,
            };
            let linter = Linter::new(registry, config)?;
            let files = find_sfz_files(&path)?;
            tracing::info!(files = files.len(), "linting");

            let reports = linter.lint_files(&files, &AtomicBool::new(false));
            let mut failed = false;
            for file in reports {
                for d in file.report {
                    failed |= d.is_error();
                    println!("{}", render::render_diagnostic(&d, format)?);
                }
            }
            Ok(if failed {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }

        Commands::List {
            search,
            filter,
            path,
        } => {
            let selected = catalog::select(&registry, search.as_deref(), &filter);
            match path {
                None => {
                    for entry in selected {
                        println!("{}", render_entry(entry));
                    }
                }
                Some(dir) => {
                    let linter = Linter::new(registry.clone(), LintConfig::default())?;
                    let files = find_sfz_files(&dir)?;
                    for name in catalog::used_opcodes(linter.parser(), &files) {
                        match registry.lookup(&name) {
                            Some(found) if selected.iter().any(|e| std::ptr::eq(*e, found.entry)) => {
                                println!("{:<28} {}", name, render_entry(found.entry));
                            }
                            Some(_) => {}
                            None if search.is_none() && filter.is_empty() => {
                                println!("{:<28} unknown", name);
                            }
                            None => {}
                        }
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_registry(path: Option<&Path>) -> Result<Registry> {
    let registry = match path {
        Some(path) => Registry::load(path)
            .with_context(|| format!("load opcode table {}", path.display()))?,
        None => Registry::builtin().context("load built-in opcode table")?,
    };
    tracing::debug!(entries = registry.len(), "opcode table ready");
    Ok(registry)
}
