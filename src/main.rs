use clap::builder::{RangedI64ValueParser, TypedValueParser};
use clap::{Args, Parser, Subcommand};
use malsearch::backend::{SqliteBackend, Storage};
use malsearch::error::SearchError;
use malsearch::model::ObjectKind;
use malsearch::output::{
    json_response, params_to_json, ErrorResponse, ExplainResponse, OutputFormat, SearchResponse,
};
use malsearch::output_common::{
    format_object_line, format_total_header, is_json_format, render_json_response,
};
use malsearch::query::{build_object_query, compile_query, QueryPlan, SearchOptions, DEFAULT_LIMIT};
use malsearch::SortMode;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Custom value parser for ranged usize - clap doesn't provide RangedUsizeValueParser
fn ranged_usize(min: i64, max: i64) -> impl TypedValueParser<Value = usize> {
    let inner = RangedI64ValueParser::new().range(min..=max);
    inner.map(|v: i64| v as usize)
}

#[derive(Parser)]
#[command(
    name = "malsearch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Lucene-style search over a malware object repository"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = OutputFormat::Human)]
    output: OutputFormat,

    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a query and list the matching objects
    #[command(after_help = SEARCH_EXAMPLES)]
    Search {
        #[command(flatten)]
        args: QueryArgs,
    },

    /// Compile a query and print the SQL it would run
    #[command(after_help = EXPLAIN_EXAMPLES)]
    Explain {
        #[command(flatten)]
        args: QueryArgs,
    },

    /// Create the repository schema in --db
    InitDb,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Lucene query, e.g. 'file.type:PE32* AND tag:trojan'
    #[arg(long)]
    query: String,

    /// Login of the user the search runs as
    #[arg(long)]
    user: String,

    /// Restrict the search to one object type
    #[arg(long = "type", value_enum)]
    kind: Option<ObjectKind>,

    #[arg(long, default_value_t = DEFAULT_LIMIT, value_parser = ranged_usize(1, DEFAULT_LIMIT as i64))]
    limit: usize,

    /// Next page: only objects after the one with this dhash in sort order
    #[arg(long, value_name = "DHASH")]
    older_than: Option<String>,

    #[arg(long, value_enum, default_value = "newest")]
    sort: SortMode,
}

impl QueryArgs {
    fn options(&self) -> SearchOptions {
        SearchOptions {
            object_kind: self.kind,
            limit: self.limit,
            sort_by: self.sort,
            older_than: self.older_than.clone(),
        }
    }
}

const SEARCH_EXAMPLES: &str = r#"
EXAMPLES:
  # Files by type and tag
  malsearch --db repo.db search --user alice --query 'file.type:PE32* AND tag:trojan'

  # Configs of one family, JSON output
  malsearch --db repo.db search --user alice --query 'static.family:emotet' --output json

  # Next page, older than the last object seen
  malsearch --db repo.db search --user alice --query 'tag:ransomware' --older-than 9f86d08
"#;

const EXPLAIN_EXAMPLES: &str = r#"
EXAMPLES:
  # Show the SQL and parameters for a query
  malsearch --db repo.db explain --user alice --query 'meta.malware_family:emotet'
"#;

fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(err) = dispatch(&cli) {
        emit_error(&cli, &err);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if let Err(e) = subscriber.try_init() {
        eprintln!("Failed to init tracing subscriber: {e}");
    }
}

fn dispatch(cli: &Cli) -> Result<(), SearchError> {
    let db_path = cli.db.as_deref().ok_or_else(|| {
        SearchError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "No database given. Use --db PATH.",
        ))
    })?;

    match &cli.command {
        Command::InitDb => run_init_db(cli, db_path),
        Command::Search { args } => run_search(cli, &open_existing(db_path)?, args),
        Command::Explain { args } => run_explain(cli, &open_existing(db_path)?, args),
    }
}

fn open_existing(db_path: &Path) -> Result<SqliteBackend, SearchError> {
    if !db_path.is_file() {
        return Err(SearchError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Database not found: {}", db_path.display()),
        )));
    }
    SqliteBackend::open(db_path)
}

fn compile(backend: &SqliteBackend, args: &QueryArgs) -> Result<QueryPlan, SearchError> {
    let principal = backend.load_principal(&args.user)?;
    compile_query(&args.query, &principal, backend, &args.options())
}

fn run_init_db(cli: &Cli, db_path: &Path) -> Result<(), SearchError> {
    let backend = SqliteBackend::open(db_path)?;
    backend.ensure_schema()?;
    if is_json_format(cli.output) {
        let data = serde_json::json!({ "database": db_path.display().to_string() });
        println!("{}", render_json_response(&data, cli.output)?);
    } else {
        println!("initialized {}", db_path.display());
    }
    Ok(())
}

fn run_search(cli: &Cli, backend: &SqliteBackend, args: &QueryArgs) -> Result<(), SearchError> {
    let plan = compile(backend, args)?;
    let results = backend.execute(&plan)?;
    let total_count = backend.count(&plan)?;

    if is_json_format(cli.output) {
        let response = SearchResponse {
            results,
            query: args.query.clone(),
            object_type: plan.kind,
            total_count,
            limit: plan.limit,
        };
        println!("{}", render_json_response(&response, cli.output)?);
    } else {
        println!("{}", format_total_header(total_count));
        for row in &results {
            println!("{}", format_object_line(row));
        }
    }
    Ok(())
}

fn run_explain(cli: &Cli, backend: &SqliteBackend, args: &QueryArgs) -> Result<(), SearchError> {
    let plan = compile(backend, args)?;
    let (sql, params) = build_object_query(&plan, false);
    let steps = backend.explain_query_plan(&plan)?;

    if is_json_format(cli.output) {
        let response = ExplainResponse {
            query: args.query.clone(),
            object_type: plan.kind,
            sql,
            params: params_to_json(&params),
            plan: steps,
        };
        println!("{}", render_json_response(&response, cli.output)?);
    } else {
        println!("{}", sql);
        println!();
        for (idx, param) in params_to_json(&params).iter().enumerate() {
            println!("?{} = {}", idx + 1, param);
        }
        println!();
        for step in steps {
            println!("plan: {}", step);
        }
    }
    Ok(())
}

fn emit_error(cli: &Cli, err: &SearchError) {
    match cli.output {
        OutputFormat::Human => {
            eprintln!("ERROR [{}]: {}", err.error_code(), err);
            if let Some(hint) = err.remediation() {
                eprintln!("Hint: {}", hint);
            }
        }
        OutputFormat::Json | OutputFormat::Pretty => {
            let error = ErrorResponse {
                code: err.error_code().to_string(),
                error: err.severity().to_string(),
                message: err.to_string(),
                offset: err.offset(),
                remediation: err.remediation().map(|s| s.to_string()),
            };
            let response = json_response(error);
            let result = if matches!(cli.output, OutputFormat::Pretty) {
                serde_json::to_string_pretty(&response)
            } else {
                serde_json::to_string(&response)
            };
            match result {
                Ok(payload) => println!("{}", payload),
                Err(ser_err) => eprintln!("ERROR: {}", ser_err),
            }
        }
    }
}
