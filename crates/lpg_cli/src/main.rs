//! lpgc: Runs annotation handlers over serialized Java compilation units.
//!
//! Usage:
//!   lpgc [options] [unit.json | dir...]
//!
//! Without inputs, the nearest lpg.json (searched upward from the current
//! directory) names them. Set `LPG_LOG` to a tracing filter such as
//! `lpg_transformers=debug` for handler traces.

use clap::Parser as ClapParser;
use lpg_compiler::Program;
use lpg_diagnostics::{Diagnostic, DiagnosticCollection};
use lpg_emitter::Emitter;
use lpg_options::{find_config, PrinterConfig, TransformOptions, CONFIG_FILE_NAME};
use lpg_transformers::HandlerRegistry;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "lpgc", about = "lpgc - Java AST synthesis from annotations", disable_version_flag = true)]
struct Cli {
    /// Compilation units (JSON) or directories holding them.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Path to lpg.json.
    #[arg(short = 'p', long = "project")]
    project: Option<PathBuf>,

    /// Redirect output to the directory.
    #[arg(long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Print transformed Java to stdout instead of writing files.
    #[arg(long)]
    print: bool,

    /// Do not emit outputs.
    #[arg(long = "no-emit")]
    no_emit: bool,

    /// Also write each transformed tree as `<name>.ast.json`.
    #[arg(long = "emit-ast")]
    emit_ast: bool,

    /// Skip a handler by name (repeatable).
    #[arg(long = "disable", value_name = "HANDLER")]
    disable: Vec<String>,

    /// Spaces per indentation level in printed Java.
    #[arg(long)]
    indent: Option<usize>,

    /// List the handlers that would run.
    #[arg(long = "list-handlers")]
    list_handlers: bool,

    /// List all units that are part of the run.
    #[arg(long = "list-files")]
    list_files: bool,

    /// Plain diagnostics even on a terminal.
    #[arg(long = "no-pretty")]
    no_pretty: bool,

    /// Write a default lpg.json into the current directory.
    #[arg(long)]
    init: bool,

    /// Print the version.
    #[arg(short = 'v', long)]
    version: bool,
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const DEFAULT_CONFIG: &str = r#"{
  "transformOptions": {
    "builder": { "entryMethod": "create", "convenientMethods": true },
    "yield": { "optimizeStates": true },
    "singleton": { "style": "ENUM" }
  },
  "include": ["src"],
  "outDir": "generated"
}
"#;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if cli.version {
        println!("lpgc Version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if cli.init {
        return run_init();
    }

    let exit_code = run_compile(&cli)?;
    if exit_code != 0 {
        process::exit(exit_code);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LPG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_init() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(miette!("An {} file already exists in the current directory.", CONFIG_FILE_NAME));
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to create {CONFIG_FILE_NAME}"))?;
    println!("Successfully created an {CONFIG_FILE_NAME} file.");
    Ok(())
}

fn run_compile(cli: &Cli) -> Result<i32> {
    let start = Instant::now();

    let mut program = resolve_program(cli)?;
    apply_overrides(cli, &mut program.options);
    program
        .options
        .validate()
        .into_diagnostic()
        .wrap_err("Invalid handler options")?;

    if cli.list_handlers {
        for name in HandlerRegistry::new(&program.options).names() {
            println!("{name}");
        }
        return Ok(0);
    }

    if program.root_files.is_empty() {
        print_error("No input files found.");
        return Ok(1);
    }

    program
        .load_root_files()
        .into_diagnostic()
        .wrap_err("Failed to load compilation units")?;

    if cli.list_files {
        for name in program.file_names() {
            println!("{name}");
        }
    }

    let diagnostics = program.transform();

    let use_color = !cli.no_pretty && atty_is_terminal();
    for diag in diagnostics.diagnostics() {
        print_diagnostic(diag, use_color);
    }

    if diagnostics.has_errors() {
        print_summary(&diagnostics, use_color);
        return Ok(2);
    }

    if !cli.no_emit {
        let emitter = Emitter {
            out_dir: cli.out_dir.clone().or_else(|| program.out_dir.clone()),
            indent: program.options.indent(),
            emit_ast: cli.emit_ast,
        };
        if cli.print {
            for result in program.emit(&emitter).into_diagnostic()? {
                print!("{}", result.java);
            }
        } else {
            let written = program.write(&emitter).into_diagnostic()?;
            tracing::info!(files = written.len(), "output written");
        }
    }

    if use_color {
        eprintln!(
            "{}Processed {} unit{} in {:.2}s.{}",
            GRAY,
            program.units().len(),
            if program.units().len() == 1 { "" } else { "s" },
            start.elapsed().as_secs_f64(),
            RESET
        );
    }
    Ok(0)
}

/// `-p` wins, then explicit files, then the nearest lpg.json.
fn resolve_program(cli: &Cli) -> Result<Program> {
    if let Some(project) = &cli.project {
        return Program::from_config(project)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read project '{}'", project.display()));
    }
    if !cli.files.is_empty() {
        return Ok(Program::new(cli.files.clone(), TransformOptions::default()));
    }
    let cwd = std::env::current_dir().into_diagnostic()?;
    match find_config(&cwd) {
        Some(config) => Program::from_config(&config)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {}", config.display())),
        None => Ok(Program::new(Vec::new(), TransformOptions::default())),
    }
}

/// Command line flags override lpg.json.
fn apply_overrides(cli: &Cli, options: &mut TransformOptions) {
    if !cli.disable.is_empty() {
        options
            .disabled_handlers
            .get_or_insert_with(Vec::new)
            .extend(cli.disable.iter().cloned());
    }
    if let Some(indent) = cli.indent {
        options.printer.get_or_insert_with(PrinterConfig::default).indent = Some(indent);
    }
}

fn print_summary(diagnostics: &DiagnosticCollection, use_color: bool) {
    let count = diagnostics.error_count();
    let plural = if count == 1 { "" } else { "s" };
    if use_color {
        eprintln!("\n{RED}Found {count} error{plural}.{RESET}");
    } else {
        eprintln!("\nFound {count} error{plural}.");
    }
}

fn print_diagnostic(diag: &Diagnostic, use_color: bool) {
    if use_color {
        let color = if diag.is_error() { RED } else { YELLOW };
        if let Some(ref file) = diag.file {
            eprint!("{}{}{}", CYAN, file, RESET);
            if let Some(span) = diag.span {
                eprint!("({})", span.start);
            }
            eprint!(": ");
        }
        eprintln!(
            "{}{}{}{} {}LPG{}{}: {}",
            BOLD, color, diag.category, RESET, CYAN, diag.code, RESET, diag.message_text
        );
    } else {
        eprintln!("{}", diag);
    }
}

fn print_error(msg: &str) {
    if atty_is_terminal() {
        eprintln!("{}{}error{}: {}", BOLD, RED, RESET, msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

fn atty_is_terminal() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::isatty(2) != 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::parse_from(["lpgc", "--disable", "Yield", "--disable", "Builder", "--indent", "2", "units"]);
        let mut options = TransformOptions::default();
        apply_overrides(&cli, &mut options);
        assert!(options.is_handler_disabled("yield"));
        assert!(options.is_handler_disabled("builder"));
        assert_eq!(options.indent(), 2);
        assert_eq!(cli.files, vec![PathBuf::from("units")]);
    }

    #[test]
    fn test_default_config_parses() {
        let config = lpg_options::parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.out_dir.as_deref(), Some("generated"));
        assert!(config.options().optimize_states());
    }
}
