use std::{collections::BTreeMap, path::Path, time::Duration};

use clap::Parser;
use logsearch::{
    Error,
    OutputDir,
    Result,
    classify::{self, Classifier, ClassifierSettings},
    cli::{
        ByMonthArgs,
        ClassifyArgs,
        Cli,
        Command,
        InputArgs,
        RunArgs,
        TopKeywordsArgs,
    },
    completion::OpenAiCompatibleClient,
    config::CompletionSettings,
    rank::{self, MonthlyPivot, RankedKeyword},
    sink,
    source::{self, EventTable},
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("LOGSEARCH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = run(cli);
    if let Err(err) = &result {
        tracing::error!("{err}");
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    // Classification checks its credentials before touching the filesystem.
    if let Command::Classify(args) = &cli.command {
        let settings = CompletionSettings::resolve(args.model.as_deref())?;
        let output_dir = OutputDir::resolve(cli.output_dir.as_deref())?;
        return cmd_classify(&output_dir, &settings, args);
    }

    let output_dir = OutputDir::resolve(cli.output_dir.as_deref())?;

    match cli.command {
        Command::TopKeywords(args) => cmd_top_keywords(&output_dir, &args),
        Command::ByMonth(args) => cmd_by_month(&output_dir, &args),
        Command::Run(args) => cmd_run(&output_dir, &args),
        Command::Classify(_) | Command::Completions(_) => Ok(()),
    }
}

fn load_events(input: &InputArgs) -> Result<EventTable> {
    source::read_events(&input.input, &input.pattern)
}

fn write_top_tables(
    output_dir: &OutputDir,
    table: &EventTable,
    top_k: usize,
) -> Result<(Vec<RankedKeyword>, Vec<RankedKeyword>)> {
    let ranked = rank::top_k_per_user(&table.events, top_k);
    let top1 = rank::top1_view(&ranked);

    let path = sink::write_ranked(&output_dir.top_keywords_dir(), &ranked)?;
    println!("Wrote {} rows to {}", ranked.len(), path.display());
    let path = sink::write_ranked(&output_dir.top1_keywords_dir(), &top1)?;
    println!("Wrote {} rows to {}", top1.len(), path.display());

    Ok((ranked, top1))
}

fn write_pivot(
    output_dir: &OutputDir,
    table: &EventTable,
    months: &rank::MonthSelection,
) -> Result<MonthlyPivot> {
    let pivot = rank::top_keyword_by_month(&table.events, months);
    let path = sink::write_monthly(&output_dir.monthly_dir(), &pivot)?;
    println!(
        "Wrote {} rows x {} month(s) to {}",
        pivot.rows.len(),
        pivot.months.len(),
        path.display()
    );
    Ok(pivot)
}

fn cmd_top_keywords(
    output_dir: &OutputDir,
    args: &TopKeywordsArgs,
) -> Result<()> {
    let table = load_events(&args.input)?;
    let (ranked, top1) = write_top_tables(output_dir, &table, args.top_k)?;

    if args.show > 0 {
        println!("\nTop {} keywords per user:", args.top_k);
        print_ranked(&ranked, args.show);
        println!("\nTop keyword per user:");
        print_ranked(&top1, args.show);
    }
    Ok(())
}

fn cmd_by_month(output_dir: &OutputDir, args: &ByMonthArgs) -> Result<()> {
    let table = load_events(&args.input)?;
    let pivot = write_pivot(output_dir, &table, &args.months.selection())?;

    if args.show > 0 {
        println!();
        print_pivot(&pivot, args.show);
    }
    Ok(())
}

fn cmd_run(output_dir: &OutputDir, args: &RunArgs) -> Result<()> {
    let table = load_events(&args.input)?;
    write_top_tables(output_dir, &table, args.top_k)?;
    write_pivot(output_dir, &table, &args.months.selection())?;
    Ok(())
}

fn cmd_classify(
    output_dir: &OutputDir,
    settings: &CompletionSettings,
    args: &ClassifyArgs,
) -> Result<()> {
    let input = args.input.clone().unwrap_or_else(|| output_dir.top1_csv());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| output_dir.classified_csv());

    let rows = read_keyword_source(&input)?;
    let keywords = classify::top_keywords(&rows, args.limit);
    if keywords.is_empty() {
        tracing::warn!(input = %input.display(), "no keywords to classify");
    }

    let client = OpenAiCompatibleClient::new(settings)?;
    tracing::info!(
        model = client.model(),
        keywords = keywords.len(),
        "starting classification"
    );
    let classifier = Classifier::new(
        client,
        ClassifierSettings {
            batch_size: args.batch_size,
            max_retries: args.max_retries,
            retry_delay: Duration::from_secs(args.retry_delay_secs),
        },
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;
    let categories = runtime.block_on(classifier.classify_all(&keywords));

    sink::write_categories(&output, &categories)?;
    println!(
        "Classified {} keyword(s) -> {}",
        categories.len(),
        output.display()
    );

    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for category in categories.values() {
        *totals.entry(category.label()).or_default() += 1;
    }
    for (label, count) in totals {
        println!("  {label}: {count}");
    }
    Ok(())
}

fn read_keyword_source(path: &Path) -> Result<Vec<sink::RankedKeywordRecord>> {
    if !path.is_file() {
        return Err(Error::Config(format!(
            "keyword source not found: {} (run `logsearch top-keywords` first \
             or pass --input)",
            path.display()
        )));
    }
    sink::read_ranked(path)
}

fn print_ranked(rows: &[RankedKeyword], limit: usize) {
    println!("user_id\tkeyword\tsearch_count\trank");
    for row in rows.iter().take(limit) {
        println!(
            "{}\t{}\t{}\t{}",
            row.user_id, row.keyword, row.search_count, row.rank
        );
    }
    if rows.len() > limit {
        println!("... {} more row(s)", rows.len() - limit);
    }
}

fn print_pivot(pivot: &MonthlyPivot, limit: usize) {
    let mut header = vec!["user_id".to_string()];
    header.extend(pivot.column_names());
    println!("{}", header.join("\t"));

    for row in pivot.rows.iter().take(limit) {
        let cells: Vec<&str> = std::iter::once(row.user_id.as_str())
            .chain(
                pivot
                    .months
                    .iter()
                    .map(|&m| row.keyword_for(m).unwrap_or_default()),
            )
            .collect();
        println!("{}", cells.join("\t"));
    }
    if pivot.rows.len() > limit {
        println!("... {} more row(s)", pivot.rows.len() - limit);
    }
}
