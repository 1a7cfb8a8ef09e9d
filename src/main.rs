use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sweepbench::config::{self, Settings};
use sweepbench::display;
use sweepbench::invoke::ProcessRunner;
use sweepbench::progress::{BarProgress, Progress, SilentProgress};
use sweepbench::results::{self, ResultTable, Schema, Summary};
use sweepbench::sweep::{
    DEFAULT_REPEAT_K, DEFAULT_REPEAT_REPS, DEFAULT_REPEAT_SS, RepeatPlan, SweepController,
    SweepPlan,
};
use sweepbench::types::CommandLabel;

#[derive(Parser)]
#[command(
    name = "sweepbench",
    version,
    about = "Time an external sequence tool across a parameter sweep"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Time `prepare` and `ctree` over numseqs × k × sketch size
    Sweep(SweepArgs),
    /// Time one ctree configuration repeatedly on a prepared file
    Repeat(RepeatArgs),
    /// Summarise replicates in a results table
    Report(ReportArgs),
}

#[derive(Args)]
struct SweepArgs {
    /// Directory of sequence files passed to `prepare`
    input_dir: PathBuf,

    /// Results table (.tsv or .csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sequence file suffix passed to `prepare -sf`
    #[arg(long)]
    suffix: Option<String>,

    #[arg(long)]
    reps: Option<usize>,

    /// Comma separated sequence counts
    #[arg(long, value_delimiter = ',')]
    numseqs: Vec<u64>,

    /// Comma separated k-mer sizes
    #[arg(short, long, value_delimiter = ',')]
    k: Vec<u64>,

    /// Comma separated sketch sizes
    #[arg(long, value_delimiter = ',')]
    ss: Vec<u64>,

    /// Worker count passed to the tool as `-np`
    #[arg(short = 'n', long)]
    threads: Option<u32>,

    #[command(flatten)]
    common: CommonArgs,

    /// On failure, still write the rows measured before it
    #[arg(long)]
    write_partial: bool,
}

#[derive(Args)]
struct RepeatArgs {
    /// Prepared `.dvseqs` file
    input_file: PathBuf,

    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, default_value_t = DEFAULT_REPEAT_K)]
    k: u64,

    #[arg(long, default_value_t = DEFAULT_REPEAT_SS)]
    ss: u64,

    #[arg(long, default_value_t = DEFAULT_REPEAT_REPS)]
    reps: usize,

    #[arg(short = 'n', long)]
    threads: Option<u32>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Tool executable
    #[arg(long, env = "SWEEPBENCH_TOOL")]
    tool: Option<PathBuf>,

    /// Create scratch directories here instead of the system temp dir
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Config file (TOML); `tool` and `threads` also apply to `repeat`
    #[arg(long)]
    config: Option<PathBuf>,
}

impl CommonArgs {
    /// Config file merged over the defaults, with `--tool` on top.
    fn settings(&self) -> Result<Settings> {
        let file = config::load(self.config.as_deref())?;
        let mut s = Settings::default().merge(file);
        if let Some(tool) = &self.tool {
            s.tool = tool.clone();
        }
        Ok(s)
    }
}

#[derive(Args)]
struct ReportArgs {
    /// Results table written by `sweep` or `repeat`
    table: PathBuf,

    #[arg(long, default_value = "ctree", conflicts_with = "all")]
    command: CommandLabel,

    /// Include every command
    #[arg(long)]
    all: bool,

    /// Expected replicates per configuration
    #[arg(long)]
    reps: Option<usize>,

    #[arg(long)]
    json: bool,
}

impl SweepArgs {
    fn settings(&self) -> Result<Settings> {
        let mut s = self.common.settings()?;
        if self.threads.is_some() {
            s.threads = self.threads;
        }
        if let Some(suffix) = &self.suffix {
            s.suffix = suffix.clone();
        }
        if let Some(reps) = self.reps {
            s.reps = reps;
        }
        if !self.numseqs.is_empty() {
            s.numseqs = self.numseqs.clone();
        }
        if !self.k.is_empty() {
            s.k = self.k.clone();
        }
        if !self.ss.is_empty() {
            s.ss = self.ss.clone();
        }
        Ok(s)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sweepbench={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn make_progress(quiet: bool) -> Box<dyn Progress> {
    if quiet || !std::io::stderr().is_terminal() {
        Box::new(SilentProgress)
    } else {
        Box::new(BarProgress::new())
    }
}

fn controller<'a>(
    runner: &'a ProcessRunner,
    progress: &'a dyn Progress,
    common: &CommonArgs,
) -> SweepController<'a> {
    let c = SweepController::new(runner, progress);
    match &common.scratch_dir {
        Some(dir) => c.with_scratch_root(dir),
        None => c,
    }
}

fn default_sweep_output() -> PathBuf {
    PathBuf::from(format!(
        "ctree_sweep_{}.tsv",
        Local::now().format("%Y%m%d-%H%M%S")
    ))
}

fn default_repeat_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    PathBuf::from(format!("benchmark_ctree_{}.tsv", stem))
}

fn run_sweep(args: SweepArgs, progress: &dyn Progress) -> Result<()> {
    let settings = args.settings()?;
    let plan = SweepPlan::new(&args.input_dir, &settings)?;
    let output = args.output.clone().unwrap_or_else(default_sweep_output);
    let runner = ProcessRunner::new(&settings.tool);

    let mut table = ResultTable::new(Schema::Sweep);
    let outcome = controller(&runner, progress, &args.common).run(&plan, &mut table);

    if let Err(err) = outcome {
        if args.write_partial && !table.is_empty() {
            let rows = table.len();
            match table.finalize(&output) {
                Ok(path) => eprintln!(
                    "Wrote {} rows measured before the failure to {}",
                    rows,
                    path.display()
                ),
                Err(write_err) => {
                    tracing::warn!(error = %write_err, "could not save partial results")
                }
            }
        }
        return Err(err.into());
    }

    let path = table.finalize(&output)?;
    println!("{}", display::success_line(&format!("Wrote {}!", path.display())));
    Ok(())
}

fn run_repeat(args: RepeatArgs, progress: &dyn Progress) -> Result<()> {
    let settings = args.common.settings()?;
    let threads = args.threads.or(settings.threads);
    let plan = RepeatPlan::new(&args.input_file, args.k, args.ss, args.reps, threads)?;
    let runner = ProcessRunner::new(&settings.tool);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_repeat_output(&args.input_file));

    let mut table = ResultTable::new(Schema::TimeOnly);
    controller(&runner, progress, &args.common).run_repeated(&plan, &mut table)?;

    let summary = Summary::from_times(&table.times());
    let path = table.finalize(&output)?;
    if let Some(summary) = summary {
        println!("{}", display::info_line(&display::format_summary(&summary)));
    }
    println!("{}", display::success_line(&format!("Wrote {}!", path.display())));
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<()> {
    let rows = results::read_table(&args.table)?;
    let filter = if args.all { None } else { Some(args.command) };
    let groups = results::group_replicates(&rows, filter);

    if args.json {
        println!("{}", display::format_report_json(&groups, args.reps));
    } else {
        print!("{}", display::format_report(&groups));
    }

    if let Some(expected) = args.reps {
        results::check_replicates(&groups, expected)?;
    }
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let progress = make_progress(cli.quiet);

    match cli.command {
        Commands::Sweep(args) => run_sweep(args, progress.as_ref()),
        Commands::Repeat(args) => run_repeat(args, progress.as_ref()),
        Commands::Report(args) => run_report(args),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {}", display::error_line("error:"), err);
        process::exit(1);
    }
}
