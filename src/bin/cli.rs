//! gigstore - CLI Client
//!
//! Runs statements directly against a data file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gigstore::server::DEFAULT_DATA_PATH;
use gigstore::sql::Statement;
use gigstore::storage::Record;
use gigstore::Database;

#[derive(Parser, Debug)]
#[command(name = "gigstore-cli", version, about = "Interactive shell over a gigstore document")]
struct Args {
    /// JSON document to open
    #[arg(short, long, env = "GIGSTORE_DATA", default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,
}

/// Print welcome banner
fn print_banner(data: &std::path::Path) {
    println!(
        r#"
       _              _
  __ _(_) __ _ ___| |_ ___  _ __ ___
 / _` | |/ _` / __| __/ _ \| '__/ _ \
| (_| | | (_| \__ \ || (_) | | |  __/
 \__, |_|\__, |___/\__\___/|_|  \___|
 |___/   |___/

 Document store: {}
 Type '.help' for help, '.quit' to exit
"#,
        data.display()
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help                Show this help message
  .quit                Exit
  .collections         List all collections
  .dump <name>         Print every record of a collection
  .params <json>       Bind a JSON array of parameters to the next statement

Statements:
  CREATE TABLE ...     Declare a collection
  INSERT INTO ...      Insert a record
  SELECT ...           Query records
  UPDATE ...           Update records
  DELETE FROM ...      Delete records

Examples:
  .params ["open"]
  SELECT * FROM projects WHERE status = ? ORDER BY created_at DESC;
"#
    );
}

/// Format records as a table; columns are the union of field names
fn format_results(rows: &[Record]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for field in row.keys() {
            if !columns.contains(&field.as_str()) {
                columns.push(field);
            }
        }
    }

    let cell = |row: &Record, column: &str| match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in rows {
        for (i, column) in columns.iter().enumerate() {
            widths[i] = widths[i].max(cell(row, *column).chars().count());
        }
    }

    let mut output = String::new();
    if !columns.is_empty() {
        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let separator = format!("+{}+\n", separator);

        output.push_str(&separator);
        let header: String = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", header));
        output.push_str(&separator);

        for row in rows {
            let row_str: String = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!(" {:<width$} ", cell(row, *c), width = *w))
                .collect::<Vec<_>>()
                .join("|");
            output.push_str(&format!("|{}|\n", row_str));
        }
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned\n", rows.len()));
    output
}

/// Execute a statement with the pending parameters
fn execute_sql(sql: &str, db: &Database, params: &[Value]) {
    let sql = sql.trim();
    if sql.is_empty() {
        return;
    }

    let prepared = db.prepare(sql);
    match prepared.statement() {
        None => eprintln!("Statement not recognised"),
        Some(Statement::Select(_)) => print!("{}", format_results(&prepared.all(params))),
        Some(Statement::CreateTable(_)) => match db.exec(sql) {
            Ok(()) => println!("OK"),
            Err(e) => eprintln!("Execution error: {}", e),
        },
        Some(_) => match prepared.run(params) {
            Ok(result) => println!("{} row(s) affected", result.changes),
            Err(e) => eprintln!("Execution error: {}", e),
        },
    }
}

/// Outcome of a dot command
enum Command {
    Continue,
    Params(Vec<Value>),
    Quit,
}

/// Handle special dot commands
fn handle_special_command(cmd: &str, db: &Database) -> Command {
    let (name, rest) = cmd.split_once(char::is_whitespace).unwrap_or((cmd, ""));

    match name {
        ".help" => print_help(),
        ".quit" | ".exit" => return Command::Quit,
        ".collections" => {
            for name in db.collection_names() {
                println!("  {} ({} records)", name, db.snapshot(&name).len());
            }
        }
        ".dump" => match rest.trim() {
            "" => eprintln!("Usage: .dump <collection>"),
            collection => print!("{}", format_results(&db.snapshot(collection))),
        },
        ".params" => match serde_json::from_str::<Vec<Value>>(rest.trim()) {
            Ok(params) => {
                println!("{} parameter(s) bound", params.len());
                return Command::Params(params);
            }
            Err(e) => eprintln!("Parameters must be a JSON array: {}", e),
        },
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Type '.help' for available commands.");
        }
    }
    Command::Continue
}

/// Main REPL loop
fn run_repl(db: &Database) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new().context("failed to initialise line editor")?;

    let mut input_buffer = String::new();
    let mut params: Vec<Value> = Vec::new();

    loop {
        let prompt = if input_buffer.is_empty() {
            "gigstore> "
        } else {
            "     ...> "
        };

        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let trimmed = line.trim();

        if input_buffer.is_empty() && trimmed.starts_with('.') {
            let _ = rl.add_history_entry(trimmed);
            match handle_special_command(trimmed, db) {
                Command::Continue => {}
                Command::Params(bound) => params = bound,
                Command::Quit => break,
            }
            continue;
        }

        if trimmed.is_empty() {
            if !input_buffer.is_empty() {
                let sql = std::mem::take(&mut input_buffer);
                execute_sql(&sql, db, &std::mem::take(&mut params));
            }
            continue;
        }

        input_buffer.push_str(&line);
        input_buffer.push('\n');

        if trimmed.ends_with(';') {
            let sql = std::mem::take(&mut input_buffer);
            let _ = rl.add_history_entry(sql.trim());
            execute_sql(&sql, db, &std::mem::take(&mut params));
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let db = Database::open(&args.data);

    print_banner(&args.data);
    run_repl(&db)
}
