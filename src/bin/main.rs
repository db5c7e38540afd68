//! Quarry CLI - compile JSON read requests to plans and SQL
//!
//! Usage:
//!   quarry plan <request.json> [--catalog <file>] [--dialect <dialect>]
//!   quarry sql <request.json> [--catalog <file>] [--dialect <dialect>]
//!   quarry tree [--depth <n>]
//!   quarry fields <entity> [--depth <n>]
//!
//! Examples:
//!   quarry --catalog demos/sakila.toml sql demos/film_request.json
//!   quarry --catalog demos/sakila.toml --dialect mysql sql demos/film_request.json
//!   quarry --catalog demos/sakila.toml tree --depth 2

use clap::{Parser, Subcommand, ValueEnum};
use quarry::catalog::SchemaCatalog;
use quarry::compiler::PlanAssembler;
use quarry::config::Settings;
use quarry::introspect::SchemaIntrospector;
use quarry::request::QueryRequest;
use quarry::sql::{Dialect, PlanRenderer};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - compile declarative read requests to query plans and SQL")]
#[command(version)]
struct Cli {
    /// Path to the catalog TOML (overrides the config file)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// SQL dialect to generate (overrides the config file)
    #[arg(short, long, global = true)]
    dialect: Option<DialectArg>,

    /// Path to a quarry.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request and print the query plan as JSON
    Plan {
        /// Path to the request JSON
        file: PathBuf,
    },
    /// Compile a request and print the rows and count statements
    Sql {
        /// Path to the request JSON
        file: PathBuf,
    },
    /// Print the schema tree of every entity
    Tree {
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },
    /// List every field path reachable from an entity
    Fields {
        entity: String,

        #[arg(long, default_value_t = 1)]
        depth: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Mysql,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);

    let catalog_path = match cli.catalog.clone() {
        Some(path) => path,
        None => match settings.catalog_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Config error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };
    let catalog = match SchemaCatalog::from_file(&catalog_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading catalog '{}': {}", catalog_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let dialect = cli.dialect.map(Dialect::from).unwrap_or(settings.query.dialect);

    match cli.command {
        Commands::Plan { file } => cmd_plan(&catalog, &settings, file),
        Commands::Sql { file } => cmd_sql(&catalog, &settings, dialect, file),
        Commands::Tree { depth } => print_json(&SchemaIntrospector::new(&catalog).forest(depth)),
        Commands::Fields { entity, depth } => {
            match SchemaIntrospector::new(&catalog).field_paths(&entity, depth) {
                Ok(paths) => {
                    for path in paths {
                        println!("{}", path);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_env("QUARRY_LOG")
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(file: &PathBuf) -> Result<QueryRequest, ExitCode> {
    let source = fs::read_to_string(file).map_err(|e| {
        eprintln!("Error reading file '{}': {}", file.display(), e);
        ExitCode::FAILURE
    })?;
    QueryRequest::from_json(&source).map_err(|e| {
        eprintln!("Invalid request: {}", e);
        ExitCode::FAILURE
    })
}

fn cmd_plan(catalog: &SchemaCatalog, settings: &Settings, file: PathBuf) -> ExitCode {
    let request = match read_request(&file) {
        Ok(r) => r,
        Err(code) => return code,
    };

    match PlanAssembler::new(catalog)
        .with_options(settings.query.compile_options())
        .assemble(&request)
    {
        Ok(plan) => print_json(&plan),
        Err(e) => {
            eprintln!("Compilation error [{}]: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_sql(
    catalog: &SchemaCatalog,
    settings: &Settings,
    dialect: Dialect,
    file: PathBuf,
) -> ExitCode {
    let request = match read_request(&file) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let plan = match PlanAssembler::new(catalog)
        .with_options(settings.query.compile_options())
        .assemble(&request)
    {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Compilation error [{}]: {}", e.kind(), e);
            return ExitCode::FAILURE;
        }
    };

    let renderer = PlanRenderer::new(catalog, dialect);
    let rendered = renderer
        .render(&plan)
        .and_then(|rows| renderer.render_count(&plan).map(|count| (rows, count)));

    match rendered {
        Ok((rows, count)) => {
            println!("-- Quarry rows statement");
            println!("-- Source: {}", file.display());
            println!("-- Dialect: {:?}", dialect);
            println!("{};", rows);
            println!();
            println!("-- Quarry count statement");
            println!("{};", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Render error [{}]: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            ExitCode::FAILURE
        }
    }
}
