use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, builder::TypedValueParser};
use clap_complete::Shell;

use crate::{
    classify::{
        DEFAULT_BATCH_SIZE,
        DEFAULT_KEYWORD_LIMIT,
        DEFAULT_MAX_RETRIES,
        DEFAULT_RETRY_DELAY,
    },
    rank::{DEFAULT_TOP_K, MonthSelection},
    walker::DEFAULT_PATTERN,
};

#[derive(Debug, Parser)]
#[command(
    name = "logsearch",
    about = "Rank per-user search keywords from log snapshots and classify them"
)]
pub struct Cli {
    /// Override the output directory (default: ./outputs)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank each user's keywords and write the top-K and top-1 tables
    TopKeywords(TopKeywordsArgs),
    /// Pivot each user's top keyword per month
    ByMonth(ByMonthArgs),
    /// Write every ranked table from a single read of the logs
    Run(RunArgs),
    /// Classify top keywords into content categories
    Classify(ClassifyArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Input --

#[derive(Debug, Clone, Parser)]
pub struct InputArgs {
    /// Root directory holding the parquet snapshots
    #[arg(short, long)]
    pub input: PathBuf,

    /// Glob applied to file names under the input root
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pub pattern: String,
}

// -- Top keywords --

#[derive(Debug, Parser)]
pub struct TopKeywordsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Keywords kept per user
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Print the first N rows of each table
    #[arg(long, default_value = "0")]
    pub show: usize,
}

// -- By month --

#[derive(Debug, Parser)]
pub struct ByMonthArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub months: MonthsArg,

    /// Print the first N rows of the pivot
    #[arg(long, default_value = "0")]
    pub show: usize,
}

#[derive(Debug, Clone, Parser)]
pub struct MonthsArg {
    /// Comma-separated months to pivot (e.g. 6,7); defaults to every month
    /// present in the data
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = clap::value_parser!(u32).range(1..=12)
    )]
    pub months: Vec<u32>,
}

impl MonthsArg {
    pub fn selection(&self) -> MonthSelection {
        if self.months.is_empty() {
            MonthSelection::Observed
        } else {
            MonthSelection::Fixed(self.months.clone())
        }
    }
}

// -- Run --

#[derive(Debug, Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Keywords kept per user
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    #[command(flatten)]
    pub months: MonthsArg,
}

// -- Classify --

#[derive(Debug, Parser)]
pub struct ClassifyArgs {
    /// Ranked CSV to read keywords from (default: the top-1 table in the
    /// output directory)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Number of leading rows to take keywords from
    #[arg(long, default_value_t = DEFAULT_KEYWORD_LIMIT)]
    pub limit: usize,

    /// Keywords per request
    #[arg(
        long,
        default_value_t = DEFAULT_BATCH_SIZE,
        value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize)
    )]
    pub batch_size: usize,

    /// Attempts per batch before falling back to "Other"
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs())]
    pub retry_delay_secs: u64,

    /// Override the model ID sent to the service
    #[arg(long)]
    pub model: Option<String>,

    /// Where to write keyword,category rows (default:
    /// <output-dir>/keyword_classified.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "logsearch",
            &mut std::io::stdout(),
        );
    }
}
