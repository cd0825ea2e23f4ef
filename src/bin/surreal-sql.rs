//! Interactive SQL shell
//!
//! Runs SurrealQL against a server over the RPC WebSocket and prints the
//! results as tab-separated rows.
//!
//! Usage: surreal-sql [OPTIONS]
//!
//! Options:
//!   -u, --url <DSN>           Connection DSN (env: SURREAL_URL)
//!   -t, --timeout-ms <MS>     Response timeout in milliseconds
//!   -e, --execute <SQL>       Run one query and exit

use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use surreal_sql::{Connection, ConnectionConfig, DriverError, SqlValue, Vars};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "surreal-sql")]
#[command(about = "Interactive SurrealQL shell", long_about = None)]
struct Args {
    /// Connection DSN, e.g. ws://root:root@localhost:8000/rpc?ns=test&db=test
    #[arg(short, long, env = "SURREAL_URL", default_value = "ws://root:root@localhost:8000/rpc")]
    url: String,

    /// Response timeout in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Run one query and exit
    #[arg(short, long)]
    execute: Option<String>,
}

fn print_banner(config: &ConnectionConfig) {
    println!(
        "  {} {}",
        "SurrealQL shell".white().bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!("  {} {}", "Connected to:".dimmed(), config.endpoint.as_str().white());
    println!(
        "  Type {} for help, {} to quit\n",
        ".help".yellow(),
        ".exit".yellow()
    );
}

fn print_help() {
    println!("\n{}", "Commands:".white().bold());
    println!("  {}        Show this help", ".help".yellow());
    println!("  {}        Exit the shell", ".exit".yellow());
    println!("  {}      Show current connection", ".status".yellow());

    println!("\n{}", "Examples:".white().bold());
    println!("  {}", "SELECT * FROM books;".green());
    println!("  {}", "CREATE books:eragon SET title = 'Eragon';".green());
    println!();
}

fn format_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".dimmed().to_string(),
        SqlValue::Bool(b) => b.to_string().yellow().to_string(),
        SqlValue::Int(_) | SqlValue::Float(_) => value.to_string().yellow().to_string(),
        SqlValue::Text(s) => s.green().to_string(),
        other => other.to_string(),
    }
}

async fn run_query(conn: &mut Connection, sql: &str) -> Result<(), DriverError> {
    let mut rows = conn.query(sql, Vars::new()).await?;
    let mut header_for = None;
    let mut count = 0usize;

    loop {
        match rows.next_row() {
            Ok(Some(values)) => {
                let statement = rows.statement_index();
                if header_for != Some(statement) {
                    header_for = Some(statement);
                    println!("{}", rows.columns().join("\t").cyan().bold());
                }
                let cells: Vec<String> = values.iter().map(format_value).collect();
                println!("{}", cells.join("\t"));
                count += 1;
            }
            Ok(None) => break,
            Err(e @ DriverError::Statement { .. }) => {
                println!("{} {}", "Error:".red().bold(), e);
            }
            Err(e) => return Err(e),
        }
    }

    println!("{}", format!("  ({} rows)", count).dimmed());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surreal_sql=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ConnectionConfig::from_dsn(&args.url)?;
    if let Some(ms) = args.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    let mut conn = Connection::connect(&config).await?;

    if let Some(sql) = args.execute {
        run_query(&mut conn, &sql).await?;
        conn.close().await?;
        return Ok(());
    }

    print_banner(&config);

    let mut rl = DefaultEditor::new()?;
    let history_file = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".surreal_sql_history"))
        .unwrap_or_else(|_| std::path::PathBuf::from(".surreal_sql_history"));
    let _ = rl.load_history(&history_file);

    loop {
        match rl.readline(&format!("{} ", "sql>".cyan())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    ".exit" | ".quit" | ".q" => {
                        println!("{}", "Goodbye!".dimmed());
                        break;
                    }
                    ".help" | ".h" | ".?" => print_help(),
                    ".status" => {
                        println!("  {} {}", "Server:".dimmed(), config.endpoint.as_str().white());
                        println!(
                            "  {} {}",
                            "Auth:".dimmed(),
                            config.credentials.method.to_string().cyan()
                        );
                        println!(
                            "  {} {}",
                            "Transaction:".dimmed(),
                            if conn.in_transaction() { "open" } else { "none" }
                        );
                        let health = match conn.ping().await {
                            Ok(()) => "ok".green(),
                            Err(e) => e.to_string().red(),
                        };
                        println!("  {} {}", "Ping:".dimmed(), health);
                    }
                    cmd if cmd.starts_with('.') => {
                        println!("  {} {}", "Unknown command:".red(), cmd);
                        println!("  Type {} for help", ".help".yellow());
                    }
                    sql => {
                        if let Err(e) = run_query(&mut conn, sql).await {
                            println!("{} {}", "Error:".red().bold(), e);
                            if !conn.is_valid() {
                                println!("{}", "Connection lost, exiting".red());
                                break;
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Type .exit to quit".dimmed());
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("{} {}", "Error:".red().bold(), e);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_file);
    conn.close().await?;
    Ok(())
}
