use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::BenchError;
use crate::types::{CommandLabel, Measurement};

pub const TIME_COLUMN: &str = "time(s)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    /// Comma for `.csv`, tab for everything else.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Delimiter::Comma,
            _ => Delimiter::Tab,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
        }
    }
}

/// Which columns a table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// `command numseqs k ss time(s)`
    Sweep,
    /// `time(s)` only, for repeated runs of one configuration.
    TimeOnly,
}

impl Schema {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Schema::Sweep => &["command", "numseqs", "k", "ss", TIME_COLUMN],
            Schema::TimeOnly => &[TIME_COLUMN],
        }
    }
}

/// Measurements in the order they were taken.
///
/// A table is collecting until [`ResultTable::finalize`] consumes it, after which no
/// further rows can be appended.
#[derive(Debug, Clone)]
pub struct ResultTable {
    schema: Schema,
    rows: Vec<Measurement>,
}

impl ResultTable {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, measurement: Measurement) {
        self.rows.push(measurement);
    }

    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(Measurement::elapsed_secs).collect()
    }

    pub fn write_to<W: Write>(&self, w: &mut W, delimiter: Delimiter) -> std::io::Result<()> {
        let sep = delimiter.as_char().to_string();
        writeln!(w, "{}", self.schema.header().join(&sep))?;
        for row in &self.rows {
            match self.schema {
                Schema::Sweep => writeln!(
                    w,
                    "{}{sep}{}{sep}{}{sep}{}{sep}{}",
                    row.command(),
                    cell(row.numseqs()),
                    cell(row.k()),
                    cell(row.ss()),
                    row.elapsed_secs(),
                )?,
                Schema::TimeOnly => writeln!(w, "{}", row.elapsed_secs())?,
            }
        }
        Ok(())
    }

    /// Writes the table to `path` and ends collection.
    pub fn finalize(self, path: &Path) -> Result<PathBuf, BenchError> {
        let write = || -> std::io::Result<()> {
            let mut w = BufWriter::new(File::create(path)?);
            self.write_to(&mut w, Delimiter::for_path(path))?;
            w.flush()
        };
        write().map_err(|source| BenchError::TableWrite {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "wrote results");
        Ok(path.to_path_buf())
    }
}

/// `50.0` reads as 50; fractional, negative or out-of-range floats do not.
fn whole_float(s: &str) -> Option<u64> {
    let f = s.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64).then_some(f as u64)
}

fn cell(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

/// Mean and sample standard deviation of repeated timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    /// `None` when fewer than two timings exist.
    pub stdev: Option<f64>,
}

impl Summary {
    pub fn from_times(times: &[f64]) -> Option<Self> {
        if times.is_empty() {
            return None;
        }
        let n = times.len();
        let mean = times.iter().sum::<f64>() / n as f64;
        let stdev = if n < 2 {
            None
        } else {
            let ss: f64 = times.iter().map(|t| (t - mean).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        };
        Some(Self { n, mean, stdev })
    }
}

/// Reads a persisted table back into measurements.
///
/// Columns are located by header name; only `time(s)` is required. Rows without a
/// `command` column are treated as `ctree`.
pub fn read_table(path: &Path) -> Result<Vec<Measurement>, BenchError> {
    let err = |detail: String| BenchError::TableRead {
        path: path.to_path_buf(),
        detail,
    };

    let file = File::open(path).map_err(|e| err(e.to_string()))?;
    let delimiter = Delimiter::for_path(path).as_char();
    let mut lines = BufReader::new(file).lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| err(e.to_string()))?,
        None => return Err(err("file is empty".to_string())),
    };
    let columns: Vec<&str> = header.split(delimiter).map(str::trim).collect();
    let index_of = |name: &str| columns.iter().position(|c| *c == name);
    let time_idx = index_of(TIME_COLUMN)
        .ok_or_else(|| err(format!("missing '{}' column", TIME_COLUMN)))?;
    let command_idx = index_of("command");
    let numseqs_idx = index_of("numseqs");
    let k_idx = index_of("k");
    let ss_idx = index_of("ss");

    let mut rows = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let line = line.map_err(|e| err(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = lineno + 2;
        let cells: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        let get = |idx: Option<usize>| {
            idx.and_then(|i| cells.get(i).copied())
                .filter(|c| !c.is_empty())
        };
        let int = |idx: Option<usize>, name: &str| -> Result<Option<u64>, BenchError> {
            get(idx)
                .map(|c| {
                    // tables written by other tools may carry integers as floats
                    c.parse::<u64>()
                        .ok()
                        .or_else(|| whole_float(c))
                        .ok_or_else(|| err(format!("line {}: bad {} value '{}'", row, name, c)))
                })
                .transpose()
        };

        let command = match get(command_idx) {
            Some(c) => c
                .parse::<CommandLabel>()
                .map_err(|e| err(format!("line {}: {}", row, e)))?,
            None => CommandLabel::Ctree,
        };
        let time_cell = get(Some(time_idx))
            .ok_or_else(|| err(format!("line {}: missing time", row)))?;
        let time: f64 = time_cell
            .parse()
            .map_err(|_| err(format!("line {}: bad time value '{}'", row, time_cell)))?;

        let m = Measurement::from_parts(
            command,
            int(numseqs_idx, "numseqs")?,
            int(k_idx, "k")?,
            int(ss_idx, "ss")?,
            time,
        )
        .ok_or_else(|| err(format!("line {}: time must be a non-negative number", row)))?;
        rows.push(m);
    }
    Ok(rows)
}

/// Timings sharing one (command, numseqs, k, ss) configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicateGroup {
    pub command: CommandLabel,
    pub numseqs: Option<u64>,
    pub k: Option<u64>,
    pub ss: Option<u64>,
    pub count: usize,
    pub mean: f64,
    pub stdev: Option<f64>,
}

type GroupKey = (CommandLabel, Option<u64>, Option<u64>, Option<u64>);

/// Groups rows by configuration in first-seen order, optionally keeping one command.
pub fn group_replicates(
    rows: &[Measurement],
    command: Option<CommandLabel>,
) -> Vec<ReplicateGroup> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut times: HashMap<GroupKey, Vec<f64>> = HashMap::new();

    for row in rows {
        if command.is_some_and(|c| c != row.command()) {
            continue;
        }
        let key = (row.command(), row.numseqs(), row.k(), row.ss());
        times
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row.elapsed_secs());
    }

    order
        .into_iter()
        .filter_map(|key| {
            let t = times.get(&key)?;
            let summary = Summary::from_times(t)?;
            Some(ReplicateGroup {
                command: key.0,
                numseqs: key.1,
                k: key.2,
                ss: key.3,
                count: summary.n,
                mean: summary.mean,
                stdev: summary.stdev,
            })
        })
        .collect()
}

/// Fails on the first configuration whose replicate count differs from `expected`.
pub fn check_replicates(groups: &[ReplicateGroup], expected: usize) -> Result<(), BenchError> {
    match groups.iter().find(|g| g.count != expected) {
        Some(g) => Err(BenchError::ReplicateMismatch {
            command: g.command.to_string(),
            numseqs: cell(g.numseqs),
            k: cell(g.k),
            ss: cell(g.ss),
            expected,
            found: g.count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn row(command: CommandLabel, n: u64, k: Option<u64>, ss: Option<u64>, t: f64) -> Measurement {
        Measurement::from_parts(command, Some(n), k, ss, t).unwrap()
    }

    fn sample_table() -> ResultTable {
        let mut table = ResultTable::new(Schema::Sweep);
        table.push(row(CommandLabel::Prepare, 25, None, None, 0.5));
        table.push(row(CommandLabel::Ctree, 25, Some(6), Some(500), 1.25));
        table
    }

    #[test]
    fn summary_mean_and_sample_stdev() {
        let s = Summary::from_times(&[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(s.n, 3);
        assert!((s.mean - 4.0).abs() < 1e-12);
        assert!((s.stdev.unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn summary_single_and_empty() {
        let s = Summary::from_times(&[3.5]).unwrap();
        assert_eq!(s.mean, 3.5);
        assert!(s.stdev.is_none());
        assert!(Summary::from_times(&[]).is_none());
    }

    #[test]
    fn sweep_table_rendering() {
        let mut buf = Vec::new();
        sample_table().write_to(&mut buf, Delimiter::Tab).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "command\tnumseqs\tk\tss\ttime(s)\nprepare\t25\t\t\t0.5\nctree\t25\t6\t500\t1.25\n"
        );
    }

    #[test]
    fn time_only_table_rendering() {
        let mut table = ResultTable::new(Schema::TimeOnly);
        table.push(Measurement::from_parts(CommandLabel::Ctree, None, None, None, 2.0).unwrap());
        let mut buf = Vec::new();
        table.write_to(&mut buf, Delimiter::Comma).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "time(s)\n2\n");
    }

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(Delimiter::for_path(Path::new("a.csv")), Delimiter::Comma);
        assert_eq!(Delimiter::for_path(Path::new("a.CSV")), Delimiter::Comma);
        assert_eq!(Delimiter::for_path(Path::new("a.tsv")), Delimiter::Tab);
        assert_eq!(Delimiter::for_path(Path::new("results")), Delimiter::Tab);
    }

    #[test]
    fn finalize_then_read_back() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        let table = sample_table();
        let expected = table.rows().to_vec();
        table.finalize(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("command,numseqs,k,ss,time(s)\n"));
        assert_eq!(read_table(&path).unwrap(), expected);
    }

    #[test]
    fn finalize_into_missing_directory_fails() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("nope").join("out.tsv");
        let err = sample_table().finalize(&path).unwrap_err();
        assert!(matches!(err, BenchError::TableWrite { .. }));
    }

    #[test]
    fn read_table_accepts_spaced_header_and_float_ints() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("t.csv");
        let text = "command, numseqs, k, ss, time(s)\nctree, 50.0, 8, 1000, 3.5\n\n";
        fs::write(&path, text).unwrap();
        let rows = read_table(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].numseqs(), Some(50));
        assert_eq!(rows[0].ss(), Some(1000));
    }

    #[test]
    fn read_table_rejects_bad_rows() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("t.tsv");
        fs::write(&path, "command\ttime(s)\nfold\t1.0\n").unwrap();
        assert!(read_table(&path).unwrap_err().to_string().contains("line 2"));

        fs::write(&path, "command\tk\nctree\t3\n").unwrap();
        assert!(read_table(&path).unwrap_err().to_string().contains("time(s)"));

        fs::write(&path, "time(s)\n-1\n").unwrap();
        assert!(read_table(&path).is_err());
    }

    #[test]
    fn read_table_rejects_non_integral_dimensions() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("t.csv");

        for bad in ["50.7", "-3.0", "1e30", "NaN"] {
            fs::write(&path, format!("command,numseqs,time(s)\nprepare,{},1.0\n", bad)).unwrap();
            let msg = read_table(&path).unwrap_err().to_string();
            assert!(msg.contains("bad numseqs value"), "{bad}: {msg}");
        }

        fs::write(&path, "command,numseqs,time(s)\nprepare,50.0,1.0\n").unwrap();
        assert_eq!(read_table(&path).unwrap()[0].numseqs(), Some(50));
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let rows = vec![
            row(CommandLabel::Prepare, 25, None, None, 9.0),
            row(CommandLabel::Ctree, 25, Some(8), Some(500), 1.0),
            row(CommandLabel::Ctree, 25, Some(6), Some(500), 2.0),
            row(CommandLabel::Ctree, 25, Some(8), Some(500), 3.0),
            row(CommandLabel::Ctree, 25, Some(6), Some(500), 4.0),
        ];
        let groups = group_replicates(&rows, Some(CommandLabel::Ctree));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].k, Some(8));
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].mean, 2.0);
        assert_eq!(groups[1].k, Some(6));
        assert_eq!(groups[1].mean, 3.0);

        assert_eq!(group_replicates(&rows, None).len(), 3);
    }

    #[test]
    fn replicate_check_reports_offender() {
        let rows = vec![
            row(CommandLabel::Ctree, 25, Some(6), Some(500), 1.0),
            row(CommandLabel::Ctree, 25, Some(6), Some(500), 1.0),
            row(CommandLabel::Ctree, 25, Some(6), Some(1000), 1.0),
        ];
        let groups = group_replicates(&rows, None);
        let err = check_replicates(&groups, 2).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ss=1000"), "{msg}");
        assert!(msg.contains("has 1"), "{msg}");
        assert!(check_replicates(&groups[..1], 2).is_ok());
    }
}
