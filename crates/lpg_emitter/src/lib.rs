//! lpg_emitter: Java and AST output.
//!
//! Prints each transformed compilation unit with [`lpg_printer`] and decides
//! where the result lands: under `out_dir` in the package's directory when
//! one is configured, otherwise next to the input file.

use lpg_ast::CompilationUnit;
use lpg_printer::{Printer, PrinterOptions};
use std::path::{Path, PathBuf};

/// The emitter produces output files from compilation units.
#[derive(Debug, Clone)]
pub struct Emitter {
    /// Output directory override.
    pub out_dir: Option<PathBuf>,
    /// Spaces per indentation level in printed Java.
    pub indent: usize,
    /// Also write the transformed unit as JSON next to the Java file.
    pub emit_ast: bool,
}

/// The result of emitting a compilation unit.
#[derive(Debug, Clone)]
pub struct EmitResult {
    /// The printed Java source.
    pub java: String,
    /// Output file paths and contents.
    pub output_files: Vec<OutputFile>,
}

/// A file produced by the emitter.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub text: String,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            out_dir: None,
            indent: 4,
            emit_ast: false,
        }
    }

    /// Emit a unit as Java (and optionally its JSON tree).
    pub fn emit(&self, unit: &CompilationUnit) -> Result<EmitResult, serde_json::Error> {
        let mut printer = Printer::with_options(PrinterOptions::with_indent(self.indent));
        let java = printer.print_unit(unit);

        let mut output_files = vec![OutputFile {
            path: self.get_output_path(unit, ".java"),
            text: java.clone(),
        }];

        if self.emit_ast {
            let mut text = serde_json::to_string_pretty(unit)?;
            text.push('\n');
            output_files.push(OutputFile {
                path: self.get_output_path(unit, ".ast.json"),
                text,
            });
        }

        tracing::debug!(file = %unit.file_name, outputs = output_files.len(), "emitted unit");
        Ok(EmitResult { java, output_files })
    }

    /// Write output files to disk.
    pub fn write_output_files(&self, result: &EmitResult) -> std::io::Result<()> {
        for file in &result.output_files {
            if let Some(parent) = file.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file.path, &file.text)?;
        }
        Ok(())
    }

    fn get_output_path(&self, unit: &CompilationUnit, ext: &str) -> PathBuf {
        let source = Path::new(&unit.file_name);
        let stem = output_stem(unit);
        let base_dir = match &self.out_dir {
            Some(out_dir) => match &unit.package {
                Some(package) => package.split('.').fold(out_dir.clone(), |dir, part| dir.join(part)),
                None => out_dir.clone(),
            },
            None => source.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        };
        base_dir.join(format!("{stem}{ext}"))
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

/// File stem of the emitted Java file. Units read from `Foo.json` or
/// `Foo.java` both become `Foo`; an unnamed unit takes its first type's name.
fn output_stem(unit: &CompilationUnit) -> String {
    let source = Path::new(&unit.file_name);
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_suffix(".java").map(str::to_string).unwrap_or(stem);
    if !stem.is_empty() {
        return stem;
    }
    unit.types
        .first()
        .map(|ty| ty.name.clone())
        .unwrap_or_else(|| "Unnamed".to_string())
}
