//! desk-runner: headless front end for the BankSight desk.
//!
//! Usage:
//!   desk-runner --db bank.db --seed-dir ./data --counts
//!   desk-runner --db bank.db --browse customers --limit 20
//!   desk-runner --db bank.db --report Q5
//!   desk-runner --config desk.json --ipc-mode

use anyhow::{Context, Result};
use banksight_core::{
    command::DeskCommand, config::DeskConfig, desk::Desk, entity::Table, report::Report,
    store::ResultGrid,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let show_counts = args.iter().any(|a| a == "--counts");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => DeskConfig::load(path)?,
        None => DeskConfig::default(),
    };
    if let Some(db) = flag_value(&args, "--db") {
        config.db_path = db.to_string();
    }
    config.explorer_row_limit = parse_arg(&args, "--limit", config.explorer_row_limit);
    config.validate()?;

    if !ipc_mode {
        println!("BankSight desk-runner");
        println!("  db:      {}", config.db_path);
        println!("  floor:   {:.2}", config.min_balance_floor);
        println!();
    }

    let mut desk = Desk::open(config)?;

    if let Some(dir) = flag_value(&args, "--seed-dir") {
        let report = desk
            .load_seed(Path::new(dir))
            .with_context(|| format!("loading seed data from {dir}"))?;
        if !ipc_mode {
            println!("=== SEED LOAD ===");
            for t in &report.tables {
                println!("  {:<16} {}", t.table.name(), serde_json::to_string(&t.outcome)?);
            }
            println!();
        }
    }

    if ipc_mode {
        return run_ipc_loop(&mut desk);
    }

    if show_counts {
        print_counts(&desk)?;
    }
    if let Some(name) = flag_value(&args, "--browse") {
        let table: Table = name.parse()?;
        let page = desk.store.browse(table, None, desk.config.explorer_row_limit)?;
        println!("=== {} ({} records) ===", table.label(), page.total_records);
        print_grid(&page.grid);
    }
    if let Some(id) = flag_value(&args, "--report") {
        let report: Report = id.parse()?;
        println!("=== {report} ===");
        print_grid(&report.run(&desk.store)?);
    }
    Ok(())
}

/// One JSON command per line in, one JSON reply per line out.
/// A rejected command answers `{"error": ...}` and the loop carries on.
fn run_ipc_loop(desk: &mut Desk) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }

        let reply = match serde_json::from_str::<DeskCommand>(line) {
            Ok(cmd) => match desk.execute(cmd) {
                Ok(value) => serde_json::json!({ "ok": value }),
                Err(e) => serde_json::json!({ "error": e.to_string(), "kind": e.kind() }),
            },
            Err(e) => serde_json::json!({ "error": e.to_string(), "kind": "parse" }),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_counts(desk: &Desk) -> Result<()> {
    println!("=== ROW COUNTS ===");
    for c in desk.row_counts(&Table::ALL)? {
        println!("  {:<20} {}", c.label, c.rows);
    }
    println!();
    Ok(())
}

fn print_grid(grid: &ResultGrid) {
    if grid.is_empty() {
        println!("  (no rows)");
        return;
    }
    println!("  {}", grid.columns.join(" | "));
    for row in &grid.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        println!("  {}", cells.join(" | "));
    }
    println!("  ({} rows)", grid.rows.len());
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
