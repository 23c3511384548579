//! CLI entry point over `ouvidoria_core`.
//!
//! # Responsibility
//! - Bootstrap schema and run read-only queries from the shell.
//! - Print one JSON object per record on stdout; errors go to stderr.

mod args;

use args::{Cli, Command};
use clap::Parser;
use log::info;
use ouvidoria_core::{
    init_logging, open_db, AnyRecord, AppConfig, ConfigError, DbError, Filter, FilterError,
    Predicate, QueryExecutor, RecordService, RepoError,
};
use rusqlite::types::Value;
use std::fmt::{Display, Formatter};
use std::process::ExitCode;

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(String),
    Db(DbError),
    Repo(RepoError),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "config error: {err}"),
            Self::Logging(message) => write!(f, "logging error: {message}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to encode record: {err}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<FilterError> for CliError {
    fn from(value: FilterError) -> Self {
        Self::Repo(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_json_file(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(db) = cli.db {
        config.db.database_path = Some(db);
    }

    init_logging(&config.logging).map_err(CliError::Logging)?;
    let db = open_db(&config.db)?;

    match cli.command {
        Command::InitSchema { script } => {
            let applied = db.create_schema_from_script(script.as_deref())?;
            info!("event=cli_init_schema module=cli status=ok statements={applied}");
            println!("{}", serde_json::json!({ "statements": applied }));
        }
        Command::List { entity } => {
            let records = RecordService::new(&db).list(&entity)?;
            print_records(&records)?;
        }
        Command::Find {
            entity,
            field,
            value,
        } => {
            let records = find(&db, &entity, &field, &value)?;
            print_records(&records)?;
        }
    }
    Ok(())
}

fn find<'db>(
    db: &'db QueryExecutor,
    entity: &str,
    field: &str,
    value: &str,
) -> Result<Vec<AnyRecord<'db>>, CliError> {
    let filter = Filter::new(entity, vec![Predicate::equal_to(field, parse_value(value))])?;
    Ok(RecordService::new(db).find(&filter)?)
}

fn parse_value(raw: &str) -> Value {
    raw.trim()
        .parse::<i64>()
        .map(Value::Integer)
        .unwrap_or_else(|_| Value::Text(raw.to_string()))
}

fn print_records(records: &[AnyRecord<'_>]) -> Result<(), CliError> {
    for record in records {
        println!("{}", serde_json::to_string(&record.to_json()?)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_value;
    use crate::args::{Cli, Command};
    use clap::Parser;
    use rusqlite::types::Value;

    #[test]
    fn integer_arguments_bind_as_integers() {
        assert_eq!(parse_value("42"), Value::Integer(42));
        assert_eq!(parse_value("DF"), Value::Text("DF".into()));
        assert_eq!(parse_value("61-9999"), Value::Text("61-9999".into()));
    }

    #[test]
    fn global_flags_are_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["ouvidoria", "list", "cargo", "--db", "/tmp/o.db"])
            .expect("arguments should parse");
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/o.db")));
        assert!(matches!(cli.command, Command::List { entity } if entity == "cargo"));
    }

    #[test]
    fn find_requires_field_and_value() {
        assert!(Cli::try_parse_from(["ouvidoria", "find", "cargo", "nome"]).is_err());
        let cli = Cli::try_parse_from(["ouvidoria", "find", "cargo", "nome", "Manager"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Find { field, value, .. } if field == "nome" && value == "Manager"
        ));
    }
}
