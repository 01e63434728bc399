use bqio::{BigQueryConnector, Config, Connector, Dataframe, Outcome, Result, TableIo};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

const DEFAULT_PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "bqio")]
#[command(about = "Read BigQuery tables into dataframes and write them back", long_about = None)]
#[command(version)]
struct Cli {
    /// Service account key file; application default credentials otherwise
    #[arg(long, global = true, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    key_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TableArgs {
    #[arg(long, env = "BQIO_PROJECT")]
    project: String,

    #[arg(long, env = "BQIO_DATASET")]
    dataset: String,

    #[arg(long)]
    table: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a whole table
    Read {
        #[command(flatten)]
        target: TableArgs,

        /// Rows to print (table format previews 5 by default, json prints all)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Write rows from a JSON array or JSON lines file
    Write {
        #[command(flatten)]
        target: TableArgs,

        #[arg(short, long)]
        input: PathBuf,

        /// replace, append or fail
        #[arg(long, default_value = "replace")]
        policy: String,
    },

    /// Copy the rows of one table whose column matches a value into another table
    CopyFiltered {
        #[arg(long, env = "BQIO_PROJECT")]
        project: String,

        #[arg(long, env = "BQIO_DATASET")]
        dataset: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        column: String,

        /// Compared case-insensitively
        #[arg(long)]
        equals: String,

        #[arg(long, default_value = "replace")]
        policy: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "bqio=debug,info" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn render_table(frame: &Dataframe) -> String {
    let mut builder = Builder::default();
    builder.push_record(frame.column_names().into_iter().map(String::from));
    for row in frame.rows() {
        builder.push_record(row.values().map(|v| v.to_string()));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn print_frame(frame: &Dataframe, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let shown = frame.head(limit.unwrap_or(DEFAULT_PREVIEW_ROWS));
            println!("{}", render_table(&shown));
            println!("{}", frame.info());
        }
        OutputFormat::Json => {
            let shown = match limit {
                Some(n) => frame.head(n),
                None => frame.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&shown.to_json_rows())?);
        }
    }
    Ok(())
}

async fn read_frame<C: Connector>(
    io: &TableIo<C>,
    project: &str,
    dataset: &str,
    table: &str,
) -> Result<Dataframe> {
    let outcome = io
        .try_run(project, dataset, table, "read", None, "replace")
        .await?;
    Ok(outcome.into_frame().unwrap_or_default())
}

async fn write_frame<C: Connector>(
    io: &TableIo<C>,
    project: &str,
    dataset: &str,
    table: &str,
    frame: Dataframe,
    policy: &str,
) -> Result<()> {
    let outcome = io
        .try_run(project, dataset, table, "write", Some(frame), policy)
        .await?;
    if let Outcome::Written(report) = outcome {
        println!(
            "{} {} rows written to {} ({})",
            "✓".green(),
            report.rows_written,
            report.address,
            report.disposition
        );
    }
    Ok(())
}

async fn run<C: Connector>(io: &TableIo<C>, command: Commands) -> Result<()> {
    match command {
        Commands::Read {
            target,
            limit,
            format,
        } => {
            let frame = read_frame(io, &target.project, &target.dataset, &target.table).await?;
            print_frame(&frame, limit, format)
        }
        Commands::Write {
            target,
            input,
            policy,
        } => {
            let text = std::fs::read_to_string(&input)?;
            let frame = Dataframe::from_json_str(&text)?;
            write_frame(
                io,
                &target.project,
                &target.dataset,
                &target.table,
                frame,
                &policy,
            )
            .await
        }
        Commands::CopyFiltered {
            project,
            dataset,
            from,
            to,
            column,
            equals,
            policy,
        } => {
            let source = read_frame(io, &project, &dataset, &from).await?;
            let matching = source.filter_eq_ignore_case(&column, &equals)?;
            println!(
                "{} {} of {} rows match {} = '{}'",
                "→".cyan(),
                matching.num_rows(),
                source.num_rows(),
                column,
                equals
            );
            write_frame(io, &project, &dataset, &to, matching, &policy).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::from_env();
    if let Some(key_file) = cli.key_file {
        config = config.with_key_file(key_file);
    }
    let io = TableIo::new(BigQueryConnector::new(config));

    match run(&io, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
