use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::errors::BenchError;
use crate::timer::Elapsed;

/// One axis of the sweep. Values are passed to the tool exactly as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepDimension {
    name: String,
    values: Vec<u64>,
}

impl SweepDimension {
    pub fn new(name: &str, values: Vec<u64>) -> Result<Self, BenchError> {
        if values.is_empty() {
            return Err(BenchError::EmptyDimension {
                name: name.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: an empty dimension cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Which tool subcommand produced a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CommandLabel {
    Prepare,
    Ctree,
}

impl CommandLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandLabel::Prepare => "prepare",
            CommandLabel::Ctree => "ctree",
        }
    }
}

impl fmt::Display for CommandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prepare" => Ok(CommandLabel::Prepare),
            "ctree" => Ok(CommandLabel::Ctree),
            other => Err(format!("unknown command label '{}'", other)),
        }
    }
}

/// A single timed invocation: one value per active dimension plus the repetition index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPoint {
    pub rep: usize,
    pub command: CommandLabel,
    pub numseqs: Option<u64>,
    pub k: Option<u64>,
    pub ss: Option<u64>,
}

impl SweepPoint {
    pub fn prepare(rep: usize, numseqs: u64) -> Self {
        Self {
            rep,
            command: CommandLabel::Prepare,
            numseqs: Some(numseqs),
            k: None,
            ss: None,
        }
    }

    pub fn ctree(rep: usize, numseqs: u64, k: u64, ss: u64) -> Self {
        Self {
            rep,
            command: CommandLabel::Ctree,
            numseqs: Some(numseqs),
            k: Some(k),
            ss: Some(ss),
        }
    }

    /// A repeated-run point carries no dimension values.
    pub fn repeat(rep: usize) -> Self {
        Self {
            rep,
            command: CommandLabel::Ctree,
            numseqs: None,
            k: None,
            ss: None,
        }
    }

    pub fn measured(&self, elapsed: Elapsed) -> Measurement {
        Measurement {
            command: self.command,
            numseqs: self.numseqs,
            k: self.k,
            ss: self.ss,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

/// One row of the result table. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    command: CommandLabel,
    numseqs: Option<u64>,
    k: Option<u64>,
    ss: Option<u64>,
    elapsed_secs: f64,
}

impl Measurement {
    /// Rebuilds a measurement read back from a persisted table.
    ///
    /// Negative or non-finite times are rejected.
    pub fn from_parts(
        command: CommandLabel,
        numseqs: Option<u64>,
        k: Option<u64>,
        ss: Option<u64>,
        elapsed_secs: f64,
    ) -> Option<Self> {
        if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
            return None;
        }
        Some(Self {
            command,
            numseqs,
            k,
            ss,
            elapsed_secs,
        })
    }

    pub fn command(&self) -> CommandLabel {
        self.command
    }

    pub fn numseqs(&self) -> Option<u64> {
        self.numseqs
    }

    pub fn k(&self) -> Option<u64> {
        self.k
    }

    pub fn ss(&self) -> Option<u64> {
        self.ss
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}
