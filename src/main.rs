use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mergediff::areas::repository::Repository;
use mergediff::artifacts::core::telemetry;
use mergediff::artifacts::diff::DEFAULT_CONTEXT_LINES;
use mergediff::artifacts::merge::merge_base::MergeBaseStrategy;
use mergediff::artifacts::report::DiffReport;
use mergediff::commands::porcelain::merge_diff::{DiffOptions, default_jobs};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "mergediff",
    version,
    about = "Merge diffs between branches, as JSON",
    long_about = "Compares a source branch with its merge base against a target branch \
    and prints the changed files, hunks and lines as a JSON document.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RepoArgs {
    #[arg(long = "repo", default_value = ".", help = "Path inside the repository")]
    path: PathBuf,
}

#[derive(Args)]
struct DiffArgs {
    #[command(flatten)]
    repo: RepoArgs,

    #[arg(long, env = "MERGEDIFF_CONTEXT", default_value_t = DEFAULT_CONTEXT_LINES,
        help = "Unchanged lines shown around each change")]
    context: usize,

    #[arg(long, env = "MERGEDIFF_JOBS", help = "Files diffed in parallel [default: CPU count]")]
    jobs: Option<usize>,

    #[arg(long, env = "MERGEDIFF_STRATEGY", value_enum, default_value_t = MergeBaseStrategy::Best)]
    strategy: MergeBaseStrategy,

    #[arg(long, help = "Abort the query after this many seconds")]
    timeout_secs: Option<u64>,

    #[arg(long, help = "Print the report on one line")]
    compact: bool,
}

impl DiffArgs {
    fn options(&self) -> DiffOptions {
        DiffOptions::new(
            self.context,
            self.jobs.unwrap_or_else(default_jobs),
            self.strategy,
            self.timeout_secs.map(Duration::from_secs),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "merge-diff",
        about = "Diff a source branch against its merge base with a target",
        long_about = "Finds the merge base of SOURCE and TARGET, then reports every change \
        SOURCE made since that base. SOURCE defaults to the checked-out branch."
    )]
    MergeDiff {
        #[arg(index = 1)]
        target: String,
        #[arg(index = 2)]
        source: Option<String>,
        #[command(flatten)]
        args: DiffArgs,
    },
    #[command(
        name = "commit-diff",
        about = "Diff two commits directly",
        long_about = "Reports the changes from the tree of FROM to the tree of TO, \
        without looking for a merge base."
    )]
    CommitDiff {
        #[arg(index = 1)]
        from: String,
        #[arg(index = 2)]
        to: String,
        #[command(flatten)]
        args: DiffArgs,
    },
    #[command(name = "merge-base", about = "Print the merge base of two revisions")]
    MergeBase {
        #[arg(index = 1)]
        left: String,
        #[arg(index = 2)]
        right: String,
        #[arg(long, value_enum, default_value_t = MergeBaseStrategy::Best)]
        strategy: MergeBaseStrategy,
        #[command(flatten)]
        repo: RepoArgs,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "Prints a stored blob, tree or commit. The object can be named by id, \
        unique id prefix or revision."
    )]
    CatFile {
        #[arg(short = 'p', long, help = "The object to print")]
        sha: String,
        #[command(flatten)]
        repo: RepoArgs,
    },
}

fn print_report(report: &DiffReport, compact: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    report.write_json(&mut stdout, compact)?;
    writeln!(stdout)?;

    Ok(())
}

fn open(repo: &RepoArgs) -> Result<Repository> {
    Repository::discover(&repo.path)
        .with_context(|| format!("cannot open repository at {}", repo.path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match &cli.command {
        Commands::MergeDiff {
            target,
            source,
            args,
        } => {
            let repository = open(&args.repo)?;
            let report = repository
                .compute_merge_diff(target, source.as_deref(), &args.options())
                .await?;

            print_report(&report, args.compact)?
        }
        Commands::CommitDiff { from, to, args } => {
            let repository = open(&args.repo)?;
            let report = repository
                .compute_commit_diff(from, to, &args.options())
                .await?;

            print_report(&report, args.compact)?
        }
        Commands::MergeBase {
            left,
            right,
            strategy,
            repo,
        } => {
            let repository = open(repo)?;
            let base = repository.find_merge_base(left, right, *strategy)?;

            println!("{base}");
        }
        Commands::CatFile { sha, repo } => {
            let repository = open(repo)?;

            repository.cat_file(sha, std::io::stdout().lock())?
        }
    }

    Ok(())
}
