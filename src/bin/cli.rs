//! ShowDB - CLI Client

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use showdb::catalog::Catalog;
use showdb::executor::{ExecutionEngine, QueryResult};
use showdb::Config;

const DEFAULT_CONFIG_PATH: &str = "showdb.json";

/// Print welcome banner
fn print_banner() {
    println!(
        r#"
 ShowDB - descriptive statements over a live SQL catalog
 Type '.help' for help, '.quit' to exit
"#
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit              Exit (the catalog is saved if a path is configured)
  .tables            SHOW TABLES in the current database
  .user <name>       Run following statements as <name>
  .json              Toggle JSON output

Introspection:
  SHOW ALL | SHOW <variable>
  SHOW COLUMNS FROM <table>
  SHOW TABLES [FROM <database>]
  SHOW DATABASES
  SHOW GRANTS [ON DATABASE <db> | ON [TABLE] <table>] [FOR <user>, ...]
  SHOW INDEX FROM <table>
  SHOW CONSTRAINTS FROM <table>
  SHOW CREATE TABLE <table> | SHOW CREATE VIEW <view>
  SHOW USERS
  HELP <function>

Examples:
  CREATE DATABASE shop;
  SET DATABASE = shop;
  CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100) NOT NULL);
  SHOW CREATE TABLE users;
"#
    );
}

/// Render a cell; tabs are expanded so column widths line up
fn cell_lines(value: &str) -> Vec<String> {
    value.replace('\t', "    ").lines().map(str::to_string).collect()
}

/// Format query results as a table
fn format_results(result: &QueryResult) -> String {
    let columns = &result.columns;
    if columns.is_empty() {
        return String::new();
    }

    let rows: Vec<Vec<Vec<String>>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| cell_lines(&v.to_string())).collect())
        .collect();

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.name.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                for line in cell {
                    *width = (*width).max(line.chars().count());
                }
            }
        }
    }

    let mut output = String::new();

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    // Header
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c.name, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    // Rows; a multi-line cell stretches its row
    for row in &rows {
        let height = row.iter().map(Vec::len).max().unwrap_or(1).max(1);
        for line in 0..height {
            let row_str: String = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| {
                    let text = cell.get(line).map(String::as_str).unwrap_or("");
                    format!(" {:<width$} ", text, width = *w)
                })
                .collect::<Vec<_>>()
                .join("|");
            output.push_str(&format!("|{}|\n", row_str));
        }
    }

    if !rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned\n", rows.len()));

    output
}

struct Repl {
    engine: ExecutionEngine,
    config: Config,
    json: bool,
}

impl Repl {
    /// Execute SQL and print its outcome
    fn execute_sql(&mut self, sql: &str) {
        let sql = sql.trim();
        if sql.is_empty() {
            return;
        }

        match self.engine.execute(sql) {
            Ok(result) => {
                if self.json {
                    match serde_json::to_string_pretty(&result) {
                        Ok(json) => println!("{}", json),
                        Err(e) => eprintln!("Serialization error: {}", e),
                    }
                } else if let Some(msg) = &result.message {
                    println!("{}", msg);
                } else {
                    print!("{}", format_results(&result));
                }
            }
            Err(e) => eprintln!("ERROR ({}): {}", e.code(), e),
        }
    }

    /// Handle special dot commands; returns false to leave the loop
    fn handle_special_command(&mut self, cmd: &str) -> bool {
        let parts: Vec<&str> = cmd.split_whitespace().collect();

        match parts.first().copied() {
            Some(".help") => print_help(),
            Some(".quit") | Some(".exit") => return false,
            Some(".tables") => self.execute_sql("SHOW TABLES"),
            Some(".json") => {
                self.json = !self.json;
                println!("JSON output {}", if self.json { "on" } else { "off" });
            }
            Some(".user") => match parts.get(1) {
                Some(user) => {
                    self.engine.set_user(*user);
                    println!("Now running as {}", user);
                }
                None => println!("Current user: {}", self.engine.session().user),
            },
            Some(cmd) => {
                eprintln!("Unknown command: {}", cmd);
                eprintln!("Type '.help' for available commands.");
            }
            None => {}
        }
        true
    }

    fn save(&self) {
        if let Some(path) = &self.config.catalog_path {
            match self.engine.catalog().save_to_disk(path) {
                Ok(()) => info!(%path, "catalog saved"),
                Err(e) => eprintln!("Failed to save catalog to {}: {}", path, e),
            }
        }
    }
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    match &config.catalog_path {
        Some(path) if Path::new(path).exists() => Catalog::load_from_disk(path)
            .with_context(|| format!("loading catalog from {}", path)),
        _ => Ok(Catalog::new()),
    }
}

/// Main REPL loop
fn run_repl(config: Config) -> Result<()> {
    let catalog = Arc::new(load_catalog(&config)?);
    let engine = ExecutionEngine::with_config(catalog, &config)
        .context("invalid session configuration")?;
    let mut repl = Repl {
        engine,
        config,
        json: false,
    };
    let mut editor = DefaultEditor::new().context("initializing line editor")?;

    print_banner();

    let mut input_buffer = String::new();

    loop {
        let prompt = if input_buffer.is_empty() {
            "showdb> "
        } else {
            "...> "
        };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                warn!(error = %e, "readline failed");
                break;
            }
        };

        let trimmed = line.trim();

        // Handle special commands
        if input_buffer.is_empty() && trimmed.starts_with('.') {
            let _ = editor.add_history_entry(trimmed);
            if !repl.handle_special_command(trimmed) {
                break;
            }
            continue;
        }

        if trimmed.is_empty() {
            if !input_buffer.is_empty() {
                // Empty line in multiline mode - execute the buffer
                let sql = std::mem::take(&mut input_buffer);
                repl.execute_sql(&sql);
            }
            continue;
        }

        input_buffer.push_str(&line);
        input_buffer.push('\n');

        // Check if statement is complete (ends with semicolon)
        if trimmed.ends_with(';') {
            let sql = std::mem::take(&mut input_buffer);
            let _ = editor.add_history_entry(sql.trim());
            repl.execute_sql(&sql);
        }
    }

    repl.save();
    println!("\nGoodbye!");
    Ok(())
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("reading config {}", config_path))?;

    let filter = EnvFilter::try_new(&config.log_filter)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run_repl(config)
}
