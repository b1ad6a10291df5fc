use lpg_options::OptionsError;
use std::path::PathBuf;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a compilation unit: {source}")]
    Unit {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize {file}: {source}")]
    Serialize {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Options(#[from] OptionsError),
}
