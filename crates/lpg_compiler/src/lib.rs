//! lpg_compiler: Program orchestration.
//!
//! A [`Program`] owns the compilation units of one run. Units arrive as
//! JSON-serialized trees (files or whole directories), every handler runs
//! over them in parallel against a resolver that sees all units, and the
//! emitter turns the results into Java files.

mod error;

pub use error::{CompileError, CompileResult};

use lpg_ast::CompilationUnit;
use lpg_diagnostics::DiagnosticCollection;
use lpg_emitter::{EmitResult, Emitter};
use lpg_options::{parse_config_file, TransformOptions, CONFIG_FILE_NAME};
use lpg_transformers::{Transformer, UnitResolver};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Extension of serialized compilation units.
pub const UNIT_EXTENSION: &str = "json";

/// Suffix of trees written by the emitter; never read back as input.
const EMITTED_AST_SUFFIX: &str = ".ast.json";

/// All compilation units of one run.
pub struct Program {
    /// Handler options.
    pub options: TransformOptions,
    /// Unit files or directories to load.
    pub root_files: Vec<PathBuf>,
    /// Paths skipped while expanding directories.
    pub exclude: Vec<PathBuf>,
    /// Output directory from lpg.json, relative paths already resolved.
    pub out_dir: Option<PathBuf>,
    units: Vec<CompilationUnit>,
}

impl Program {
    pub fn new(root_files: Vec<PathBuf>, options: TransformOptions) -> Self {
        Self {
            options,
            root_files,
            exclude: Vec::new(),
            out_dir: None,
            units: Vec::new(),
        }
    }

    /// Create a program from an lpg.json file. `include`, `exclude` and
    /// `outDir` are relative to the file's directory; a missing `include`
    /// means the whole directory.
    pub fn from_config(config_path: &Path) -> CompileResult<Self> {
        let config = parse_config_file(config_path)?;
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let root_files = match &config.include {
            Some(include) => include.iter().map(|p| base.join(p)).collect(),
            None => vec![base.to_path_buf()],
        };
        let mut program = Self::new(root_files, config.options());
        program.exclude = config
            .exclude
            .iter()
            .flatten()
            .map(|p| base.join(p))
            .collect();
        program.out_dir = config.out_dir.as_ref().map(|dir| base.join(dir));
        tracing::debug!(config = %config_path.display(), roots = program.root_files.len(), "loaded config");
        Ok(program)
    }

    /// Add a unit that is already in memory.
    pub fn add_unit(&mut self, unit: CompilationUnit) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<CompilationUnit> {
        self.units
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.file_name.as_str())
    }

    /// Load all root files from disk, expanding directories recursively.
    pub fn load_root_files(&mut self) -> CompileResult<()> {
        let mut files = Vec::new();
        for root in &self.root_files {
            if root.is_dir() {
                collect_unit_files(root, &self.exclude, &mut files)?;
            } else {
                files.push(root.clone());
            }
        }
        for file in files {
            let unit = load_unit_file(&file)?;
            self.units.push(unit);
        }
        tracing::debug!(units = self.units.len(), "root files loaded");
        Ok(())
    }

    /// Run every handler over every unit. Returns all diagnostics, sorted.
    pub fn transform(&mut self) -> DiagnosticCollection {
        let _span = tracing::info_span!("transform", units = self.units.len()).entered();
        let resolver = UnitResolver::from_units(&self.units);
        let options = &self.options;

        let per_unit: Vec<DiagnosticCollection> = self
            .units
            .par_iter_mut()
            .map(|unit| Transformer::new(options.clone(), &resolver).transform_unit(unit))
            .collect();

        let mut all_diagnostics = DiagnosticCollection::new();
        for diagnostics in per_unit {
            all_diagnostics.extend(diagnostics);
        }
        all_diagnostics.sort();
        tracing::info!(
            errors = all_diagnostics.error_count(),
            warnings = all_diagnostics.warning_count(),
            "transform finished"
        );
        all_diagnostics
    }

    /// Print every unit. Nothing is written; see [`Program::write`].
    pub fn emit(&self, emitter: &Emitter) -> CompileResult<Vec<EmitResult>> {
        self.units
            .iter()
            .map(|unit| {
                emitter.emit(unit).map_err(|source| CompileError::Serialize {
                    file: unit.file_name.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Emit and write every unit, returning the paths written.
    pub fn write(&self, emitter: &Emitter) -> CompileResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for result in self.emit(emitter)? {
            emitter.write_output_files(&result).map_err(|source| CompileError::Write {
                path: result
                    .output_files
                    .first()
                    .map(|f| f.path.clone())
                    .unwrap_or_default(),
                source,
            })?;
            written.extend(result.output_files.into_iter().map(|f| f.path));
        }
        Ok(written)
    }
}

/// Read one serialized unit. A unit without a file name is named after
/// the file it came from, minus the `.json` extension.
pub fn load_unit_file(path: &Path) -> CompileResult<CompilationUnit> {
    let content = std::fs::read_to_string(path).map_err(|source| CompileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut unit: CompilationUnit = serde_json::from_str(&content).map_err(|source| CompileError::Unit {
        path: path.to_path_buf(),
        source,
    })?;
    if unit.file_name.is_empty() {
        unit.file_name = path.with_extension("").to_string_lossy().into_owned();
    }
    Ok(unit)
}

fn is_unit_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.extension().is_some_and(|ext| ext == UNIT_EXTENSION)
        && name != CONFIG_FILE_NAME
        && !name.ends_with(EMITTED_AST_SUFFIX)
}

fn collect_unit_files(dir: &Path, exclude: &[PathBuf], files: &mut Vec<PathBuf>) -> CompileResult<()> {
    let read_error = |source| CompileError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(read_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;
    entries.sort();
    for path in entries {
        if exclude.iter().any(|skip| path.starts_with(skip)) {
            continue;
        }
        if path.is_dir() {
            collect_unit_files(&path, exclude, files)?;
        } else if is_unit_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}
