//! CLI entry point for `sqlspan`.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sqlspan::catalog::{database_from_ddl, InMemoryCatalog, RequestContext};
use sqlspan::config::AnalyzerConfig;
use sqlspan::lineage::query_span_for_statement;
use sqlspan::masking::{masked_fields_for_statement, MaskingLevel, MaskingPolicy};
use sqlspan::output::{formatter, Analysis, AnalyzedStatement};
use sqlspan::parser::dialect::Dialect;
use sqlspan::parser::lowering::Lowering;
use sqlspan::parser::sql_parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Source columns of every output column
    Lineage,
    /// Masking level of every output column
    Masking,
}

#[derive(Parser)]
#[command(
    name = "sqlspan",
    about = "Compute column lineage or masking levels for SQL queries"
)]
struct Cli {
    /// Input SQL files
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Catalog metadata as JSON
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// CREATE TABLE / CREATE VIEW script describing the catalog
    #[arg(long)]
    schema_sql: Option<PathBuf>,

    /// Masking policy as JSON (masking mode)
    #[arg(long)]
    masking_policy: Option<PathBuf>,

    /// SQL dialect
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Default database for unqualified names
    #[arg(long)]
    database: Option<String>,

    /// Default schema for unqualified names
    #[arg(long)]
    schema: Option<String>,

    /// What to compute
    #[arg(long, value_enum, default_value = "lineage")]
    mode: Mode,

    /// Output directory
    #[arg(long, default_value = "sqlspan-output")]
    output_dir: PathBuf,

    /// Analyzer configuration as JSON; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(2);
        }
    };

    let catalog = match load_catalog(&cli, &config) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading catalog: {e}");
            process::exit(2);
        }
    };

    let policy = match (&cli.masking_policy, cli.mode) {
        (Some(path), _) => match MaskingPolicy::from_file(path) {
            Ok(policy) => policy,
            Err(e) => {
                eprintln!("Error loading masking policy: {e}");
                process::exit(2);
            }
        },
        (None, Mode::Masking) => {
            eprintln!("--masking-policy is required in masking mode");
            process::exit(2);
        }
        (None, Mode::Lineage) => MaskingPolicy::new(MaskingLevel::None),
    };

    let ctx = RequestContext::new();
    let lowering = Lowering::new(config.dialect);
    let mut analyzed = Vec::new();
    for path in &cli.input {
        let sql = match std::fs::read_to_string(path) {
            Ok(sql) => sql,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                process::exit(2);
            }
        };
        let statements = match sql_parser::parse_statements(config.dialect, &sql) {
            Ok(statements) => statements,
            Err(e) => {
                eprintln!("SQL parse error in {}: {e}", path.display());
                process::exit(2);
            }
        };
        debug!(file = %path.display(), statements = statements.len(), "parsed input");

        for statement in &statements {
            let analysis = lowering.statement(statement).and_then(|lowered| match cli.mode {
                Mode::Lineage => query_span_for_statement(&lowered, &catalog, &ctx, &config)
                    .map(Analysis::Lineage),
                Mode::Masking => {
                    masked_fields_for_statement(&lowered, &catalog, &policy, &ctx, &config)
                        .map(|fields| Analysis::Masking { fields })
                }
            });
            let analysis = analysis.unwrap_or_else(|e| Analysis::Failed {
                error: e.to_string(),
            });
            analyzed.push(AnalyzedStatement {
                sql: statement.to_string(),
                analysis,
            });
        }
    }

    if cli.verbose {
        for statement in &analyzed {
            eprintln!("{}: {:?}", statement.sql, statement.analysis);
        }
    }

    let name = cli
        .input
        .first()
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    if let Err(e) = formatter::write_output(&cli.output_dir, name, &analyzed) {
        eprintln!("Error writing output: {e}");
        process::exit(2);
    }
    info!(statements = analyzed.len(), output = %cli.output_dir.display(), "analysis written");

    if analyzed.iter().any(AnalyzedStatement::is_failed) {
        process::exit(2);
    }
    if analyzed.iter().any(AnalyzedStatement::is_incomplete) {
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig, String> {
    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::from_file(path).map_err(|e| e.to_string())?,
        None => AnalyzerConfig::default(),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }
    if let Some(database) = &cli.database {
        config.default_database.clone_from(database);
    }
    if let Some(schema) = &cli.schema {
        config.default_schema = Some(schema.clone());
    }
    if config.default_database.is_empty() {
        config.default_database = "default".to_string();
    }
    Ok(config)
}

fn load_catalog(cli: &Cli, config: &AnalyzerConfig) -> Result<InMemoryCatalog, String> {
    let mut catalog = match &cli.catalog {
        Some(path) => InMemoryCatalog::from_json(&read(path)?).map_err(|e| e.to_string())?,
        None => InMemoryCatalog::new(),
    };
    if let Some(path) = &cli.schema_sql {
        let database = database_from_ddl(config.dialect, &config.default_database, &read(path)?)
            .map_err(|e| e.to_string())?;
        catalog.merge(InMemoryCatalog::new().with_database(database));
    }
    Ok(catalog)
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}
