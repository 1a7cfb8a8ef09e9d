use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::BenchError;

pub const DEFAULT_TOOL: &str = "dvs";
pub const DEFAULT_SUFFIX: &str = "fa";
pub const DEFAULT_REPS: usize = 3;
pub const DEFAULT_NUMSEQS: &[u64] = &[50, 100, 200, 300, 400, 500];
pub const DEFAULT_K: &[u64] = &[8, 12, 16];
pub const DEFAULT_SS: &[u64] = &[500, 750, 1000, 2500, 5000, 7500, 10000];

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub tool: Option<PathBuf>,
    pub threads: Option<u32>,
    pub suffix: Option<String>,
    pub reps: Option<usize>,
    pub numseqs: Option<Vec<u64>>,
    pub k: Option<Vec<u64>>,
    pub ss: Option<Vec<u64>>,
}

/// Fully resolved settings for a sweep, after defaults and file values are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub tool: PathBuf,
    pub threads: Option<u32>,
    pub suffix: String,
    pub reps: usize,
    pub numseqs: Vec<u64>,
    pub k: Vec<u64>,
    pub ss: Vec<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tool: PathBuf::from(DEFAULT_TOOL),
            threads: None,
            suffix: DEFAULT_SUFFIX.to_string(),
            reps: DEFAULT_REPS,
            numseqs: DEFAULT_NUMSEQS.to_vec(),
            k: DEFAULT_K.to_vec(),
            ss: DEFAULT_SS.to_vec(),
        }
    }
}

impl Settings {
    pub fn merge(mut self, file: FileConfig) -> Self {
        if let Some(tool) = file.tool {
            self.tool = tool;
        }
        if file.threads.is_some() {
            self.threads = file.threads;
        }
        if let Some(suffix) = file.suffix {
            self.suffix = suffix;
        }
        if let Some(reps) = file.reps {
            self.reps = reps;
        }
        if let Some(v) = file.numseqs {
            self.numseqs = v;
        }
        if let Some(v) = file.k {
            self.k = v;
        }
        if let Some(v) = file.ss {
            self.ss = v;
        }
        self
    }
}

pub fn parse_config(path: &Path, text: &str) -> Result<FileConfig, BenchError> {
    toml::from_str(text).map_err(|e| BenchError::ConfigError {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// `<config_dir>/sweepbench/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sweepbench").join("config.toml"))
}

/// Loads the explicit config file, or the default one when it exists.
///
/// An explicit path that cannot be read is an error; a missing default file is not.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig, BenchError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.is_file() => p,
            _ => return Ok(FileConfig::default()),
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|e| BenchError::ConfigError {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    parse_config(&path, &text)
}
