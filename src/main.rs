use clap::{Parser as ClapParser, Subcommand};
use querymatch::{
    DEFAULT_MAX_DEPTH,
    cli::{self, CheckOptions, CliError, MatchOptions, SqlOptions},
};
use serde_json::Value as Json;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "querymatch")]
#[command(about = "querymatch - Match JSON records against Mongo-style filters and render them as SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records that match a filter
    Match {
        /// The filter document, e.g. '{"num": {"$gt": 42}}'
        filter: String,

        /// JSON array of records (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Maximum nesting depth of the filter
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Print the SQL condition and bind parameters for a filter
    Sql {
        /// The filter document
        filter: String,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Maximum nesting depth of the filter
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Validate a filter and print its operator tree
    Check {
        /// The filter document
        filter: String,

        /// Maximum nesting depth of the filter
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Match {
            filter,
            input,
            pretty,
            max_depth,
        } => run_match(filter, input, pretty, max_depth),
        Commands::Sql {
            filter,
            pretty,
            max_depth,
        } => run_sql(filter, pretty, max_depth),
        Commands::Check { filter, max_depth } => run_check(filter, max_depth),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so that stdout stays valid JSON. Filter with `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_match(
    filter: String,
    input: Option<String>,
    pretty: bool,
    max_depth: usize,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = MatchOptions {
        filter,
        input,
        max_depth,
    };

    let selected = cli::execute_match(&options)?;
    print_json(&Json::Array(selected), pretty)
}

fn run_sql(filter: String, pretty: bool, max_depth: usize) -> Result<(), CliError> {
    let query = cli::execute_sql(&SqlOptions { filter, max_depth })?;
    print_json(&cli::query_to_json(&query), pretty)
}

fn run_check(filter: String, max_depth: usize) -> Result<(), CliError> {
    let operators = cli::execute_check(&CheckOptions { filter, max_depth })?;
    println!("Filter is valid");
    println!("{:#?}", operators);
    Ok(())
}

fn print_json(value: &Json, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    println!("{}", json);
    Ok(())
}
