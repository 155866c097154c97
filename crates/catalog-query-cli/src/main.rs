//! Catalog Query Command-Line Tool
//!
//! Tokenizes, parses and compiles catalog search queries from the shell.

mod executor;
mod formatter;

use catalog_query::{Builder, TableConfig};
use clap::{Parser, Subcommand, ValueEnum};
use executor::{Action, ExecuteError};
use formatter::OutputFormat;
use std::path::PathBuf;

/// Catalog Query Command-Line Tool
#[derive(Parser, Debug)]
#[command(name = "catalog-query")]
#[command(version, about = "Compile catalog search queries to SQL")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Table the query is compiled for
    #[arg(long, default_value = "assets", value_enum, global = true)]
    pub table: TableKind,

    /// JSON column mapping, overrides --table columns
    #[arg(long, global = true)]
    pub table_config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the tokens of a query
    Tokenize {
        /// Search query text
        query: String,
    },
    /// Print the parsed query tree
    Parse {
        /// Search query text
        query: String,
    },
    /// Print the ranked search statement and its parameters
    Sql {
        /// Search query text
        query: String,

        /// Statement prefix ending in the FROM clause; uses $1 for ranking
        #[arg(long)]
        base: Option<String>,
    },
}

/// Built-in table layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableKind {
    Assets,
    SearchIndex,
}

impl TableKind {
    fn table_name(self) -> &'static str {
        match self {
            TableKind::Assets => "assets",
            TableKind::SearchIndex => "search_index",
        }
    }

    fn config(self) -> TableConfig {
        match self {
            TableKind::Assets => TableConfig::assets(),
            TableKind::SearchIndex => TableConfig::search_index(),
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("catalog_query_cli=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        match e.downcast_ref::<ExecuteError>() {
            // Already rendered against the query text
            Some(ExecuteError::Query(rendered)) => eprint!("{}", rendered),
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.table_config {
        Some(path) => executor::load_table_config(path)?,
        None => args.table.config(),
    };
    tracing::debug!(table = args.table.table_name(), ?config, "using table layout");

    let (action, query, base) = match args.command {
        Command::Tokenize { query } => (Action::Tokenize, query, None),
        Command::Parse { query } => (Action::Parse, query, None),
        Command::Sql { query, base } => (Action::Sql, query, base),
    };
    let base = base.unwrap_or_else(|| executor::default_base_query(args.table.table_name(), &config));

    let builder = Builder::with_config(config);
    let formatter = formatter::create_formatter(args.format);

    let output = executor::execute(action, &query, &builder, &base, &*formatter)?;
    println!("{}", output);
    Ok(())
}
