//! Error types for the generation driver.

use rxgen_codegen::CodegenError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, RxgenError>;

/// Problems with `rxgen.toml` or builder settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("`{0}` must not be empty")]
    Empty(&'static str),
}

/// Top-level error of a generation run.
///
/// Declaration problems never show up here; they are diagnostics in the
/// run's output. These are failures of the environment around the run.
#[derive(Error, Debug)]
pub enum RxgenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("failed to serialize diagnostics: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no output directory: set one on the builder or run inside a build script")]
    MissingOutDir,

    #[error("source path `{0}` is neither a file nor a directory")]
    InvalidSource(PathBuf),
}
