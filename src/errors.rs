use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("Input directory not found: {path}")]
    InputDirNotFound { path: PathBuf },

    #[error("Input file not found: {path}")]
    InputFileNotFound { path: PathBuf },

    #[error("Sweep dimension '{name}' has no values")]
    EmptyDimension { name: String },

    #[error("Repetition count must be at least 1")]
    ZeroRepetitions,

    #[error("Could not create working directory: {source}")]
    WorkdirCreate { source: std::io::Error },

    #[error("Could not remove working directory {path}: {source}")]
    WorkdirRemove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to launch `{command}`: {source}")]
    ToolSpawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status})\n{output}")]
    ToolFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Failed to read config file {path}: {detail}")]
    ConfigError { path: PathBuf, detail: String },

    #[error("Failed to write results to {path}: {source}")]
    TableWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read results table {path}: {detail}")]
    TableRead { path: PathBuf, detail: String },

    #[error(
        "Not all points have {expected} replicates: command={command} numseqs={numseqs} k={k} ss={ss} has {found}"
    )]
    ReplicateMismatch {
        command: String,
        numseqs: String,
        k: String,
        ss: String,
        expected: usize,
        found: usize,
    },
}
