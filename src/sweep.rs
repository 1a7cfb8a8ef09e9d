use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::errors::BenchError;
use crate::invoke::{Invocation, ToolRunner};
use crate::progress::Progress;
use crate::results::ResultTable;
use crate::timer::{Elapsed, ScopedTimer};
use crate::types::{SweepDimension, SweepPoint};
use crate::workdir::ScopedWorkdir;

pub const DEFAULT_REPEAT_K: u64 = 12;
pub const DEFAULT_REPEAT_SS: u64 = 3000;
pub const DEFAULT_REPEAT_REPS: usize = 5;

/// A full prepare + ctree sweep over a directory of sequence files.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub input_dir: PathBuf,
    pub suffix: String,
    pub numseqs: SweepDimension,
    pub k: SweepDimension,
    pub ss: SweepDimension,
    pub reps: usize,
    pub threads: Option<u32>,
}

impl SweepPlan {
    pub fn new(input_dir: &Path, settings: &Settings) -> Result<Self, BenchError> {
        if !input_dir.is_dir() {
            return Err(BenchError::InputDirNotFound {
                path: input_dir.to_path_buf(),
            });
        }
        if settings.reps == 0 {
            return Err(BenchError::ZeroRepetitions);
        }
        // the tool runs inside a scratch directory, so relative paths would break
        let input_dir =
            std::fs::canonicalize(input_dir).map_err(|_| BenchError::InputDirNotFound {
                path: input_dir.to_path_buf(),
            })?;

        Ok(Self {
            input_dir,
            suffix: settings.suffix.clone(),
            numseqs: SweepDimension::new("numseqs", settings.numseqs.clone())?,
            k: SweepDimension::new("k", settings.k.clone())?,
            ss: SweepDimension::new("ss", settings.ss.clone())?,
            reps: settings.reps,
            threads: settings.threads,
        })
    }

    /// One prepare row plus the k × ss cross product per numseqs value, per repetition.
    pub fn expected_rows(&self) -> usize {
        self.reps * self.numseqs.len() * (1 + self.k.len() * self.ss.len())
    }
}

/// Repeated timing of one fixed ctree configuration.
#[derive(Debug, Clone)]
pub struct RepeatPlan {
    pub input_file: PathBuf,
    pub k: u64,
    pub ss: u64,
    pub reps: usize,
    pub threads: Option<u32>,
}

impl RepeatPlan {
    pub fn new(
        input_file: &Path,
        k: u64,
        ss: u64,
        reps: usize,
        threads: Option<u32>,
    ) -> Result<Self, BenchError> {
        if !input_file.is_file() {
            return Err(BenchError::InputFileNotFound {
                path: input_file.to_path_buf(),
            });
        }
        if reps == 0 {
            return Err(BenchError::ZeroRepetitions);
        }
        let input_file =
            std::fs::canonicalize(input_file).map_err(|_| BenchError::InputFileNotFound {
                path: input_file.to_path_buf(),
            })?;
        Ok(Self {
            input_file,
            k,
            ss,
            reps,
            threads,
        })
    }

    fn tree_name(&self) -> String {
        let name = self
            .input_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        format!("{}.tre", name)
    }
}

/// Drives every sweep point through a fresh workdir, a timer and the tool runner.
pub struct SweepController<'a> {
    runner: &'a dyn ToolRunner,
    progress: &'a dyn Progress,
    scratch_root: Option<PathBuf>,
}

impl<'a> SweepController<'a> {
    pub fn new(runner: &'a dyn ToolRunner, progress: &'a dyn Progress) -> Self {
        Self {
            runner,
            progress,
            scratch_root: None,
        }
    }

    /// Create workdirs under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn measure(&self, invocation: &Invocation, cwd: &Path) -> Result<Elapsed, BenchError> {
        let timer = ScopedTimer::start();
        self.runner.run(invocation, cwd)?;
        Ok(timer.stop())
    }

    /// Runs the sweep, appending one row per invocation to `table`.
    ///
    /// Order is repetition, numseqs (with its prepare row first), k, then ss. The first
    /// failing invocation stops the sweep; `table` then holds exactly the rows measured
    /// before it.
    pub fn run(&self, plan: &SweepPlan, table: &mut ResultTable) -> Result<(), BenchError> {
        tracing::info!(
            reps = plan.reps,
            numseqs = plan.numseqs.len(),
            k = plan.k.len(),
            ss = plan.ss.len(),
            rows = plan.expected_rows(),
            "starting sweep"
        );

        let reps_scope = self.progress.root("repetitions", plan.reps as u64);
        for rep in 0..plan.reps {
            let sizes_scope = reps_scope.child("numseqs", plan.numseqs.len() as u64);
            for &numseqs in plan.numseqs.values() {
                let outer = ScopedWorkdir::acquire(self.scratch_root.as_deref())?;
                let prepared = outer.join(format!("{}.dvseqs", numseqs));

                let prepare = Invocation::prepare(
                    &plan.input_dir,
                    &prepared,
                    &plan.suffix,
                    numseqs,
                    plan.threads,
                );
                let elapsed = self.measure(&prepare, outer.path())?;
                table.push(SweepPoint::prepare(rep, numseqs).measured(elapsed));

                let k_label = format!("k (numseqs={})", numseqs);
                let k_scope = sizes_scope.child(&k_label, plan.k.len() as u64);
                for &k in plan.k.values() {
                    let ss_label = format!("sketch size (k={})", k);
                    let ss_scope = k_scope.child(&ss_label, plan.ss.len() as u64);
                    for &ss in plan.ss.values() {
                        let point = SweepPoint::ctree(rep, numseqs, k, ss);
                        let wd = outer.nested()?;
                        let tree = wd.join(format!("{}.tre", numseqs));
                        let ctree = Invocation::ctree(&prepared, &tree, k, ss, plan.threads);

                        let elapsed = self.measure(&ctree, wd.path())?;
                        table.push(point.measured(elapsed));
                        wd.close()?;
                        ss_scope.advance(1);
                    }
                    drop(ss_scope);
                    k_scope.advance(1);
                }
                drop(k_scope);

                outer.close()?;
                sizes_scope.advance(1);
                tracing::info!(rep, numseqs, rows = table.len(), "finished numseqs");
            }
            drop(sizes_scope);
            reps_scope.advance(1);
        }
        Ok(())
    }

    /// Times the same ctree invocation `plan.reps` times, each in a fresh workdir.
    pub fn run_repeated(
        &self,
        plan: &RepeatPlan,
        table: &mut ResultTable,
    ) -> Result<(), BenchError> {
        tracing::info!(
            input = %plan.input_file.display(),
            k = plan.k,
            ss = plan.ss,
            reps = plan.reps,
            "starting repeated ctree"
        );

        let scope = self.progress.root("Running ctree", plan.reps as u64);
        for rep in 0..plan.reps {
            let wd = ScopedWorkdir::acquire(self.scratch_root.as_deref())?;
            let tree = wd.join(plan.tree_name());
            let ctree = Invocation::ctree(&plan.input_file, &tree, plan.k, plan.ss, plan.threads);

            let elapsed = self.measure(&ctree, wd.path())?;
            table.push(SweepPoint::repeat(rep).measured(elapsed));
            wd.close()?;
            scope.advance(1);
        }
        Ok(())
    }
}
