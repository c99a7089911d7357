//! Lambdasheet - calculate spreadsheet cells with sandboxed lambda formulas

mod config;
mod report;

use anyhow::{Context, bail};
use lambdasheet_core::storage::{load_tsv, save_tsv};
use lambdasheet_core::{CellInput, CellRef, Sheet, SheetBounds, batch, build_sheet};
use std::env;
use std::io::Read;
use std::path::PathBuf;

fn print_usage() {
    eprintln!("Usage: lambdasheet [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    TSV grid to calculate (header row and label column are skipped)");
    eprintln!();
    eprintln!("Without FILE or --cell, reads COLUMN<TAB>ROW<TAB>TEXT lines from stdin.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --cell <REF=TEXT>     Add a cell, e.g. -c 'A3=lambda: a1 + a2' (can be repeated)");
    eprintln!("  --columns <N>             Column bound (columns must be < N)");
    eprintln!("  --rows <N>                Row bound (rows must be < N)");
    eprintln!("  --config <FILE>           Read configuration from FILE");
    eprintln!("  --no-config               Ignore the user configuration file");
    eprintln!("  --json                    Print cells as JSON");
    eprintln!("  -o, --output <FILE>       Also write the calculated grid as TSV");
    eprintln!("  -h, --help                Print help");
}

#[derive(Debug, Default, PartialEq)]
struct Options {
    file: Option<PathBuf>,
    cells: Vec<CellInput>,
    columns: Option<u32>,
    rows: Option<u32>,
    config: Option<PathBuf>,
    no_config: bool,
    json: bool,
    output: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Run(Options),
}

/// Split `REF=TEXT` into a cell input. Only the first `=` separates.
fn parse_cell_arg(arg: &str) -> Result<CellInput, String> {
    let (name, text) = arg
        .split_once('=')
        .ok_or_else(|| format!("--cell expects REF=TEXT, got '{}'", arg))?;
    let at = CellRef::from_str(name.trim())
        .ok_or_else(|| format!("Invalid cell reference: '{}'", name))?;
    Ok(CellInput::new(&at.column(), at.row as i64, text))
}

fn parse_bound(flag: &str, value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(n) if n >= 2 => Ok(n),
        _ => Err(format!("{} expects an integer of at least 2, got '{}'", flag, value)),
    }
}

/// Advance past a flag and return the value that follows it.
fn next_value<'a>(
    args: &'a [String],
    i: &mut usize,
    flag: &str,
    what: &str,
) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires {}", flag, what))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut opts = Options::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => return Ok(Command::Help),
            "-c" | "--cell" => {
                let arg = next_value(args, &mut i, flag, "a REF=TEXT value")?;
                opts.cells.push(parse_cell_arg(arg)?);
            }
            "--columns" => {
                let arg = next_value(args, &mut i, flag, "a value")?;
                opts.columns = Some(parse_bound(flag, arg)?);
            }
            "--rows" => {
                let arg = next_value(args, &mut i, flag, "a value")?;
                opts.rows = Some(parse_bound(flag, arg)?);
            }
            "--config" => {
                opts.config = Some(PathBuf::from(next_value(args, &mut i, flag, "a file path")?));
            }
            "--no-config" => opts.no_config = true,
            "--json" => opts.json = true,
            "-o" | "--output" => {
                opts.output = Some(PathBuf::from(next_value(args, &mut i, flag, "a file path")?));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => {
                if opts.file.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                opts.file = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    if opts.file.is_some() && !opts.cells.is_empty() {
        return Err("FILE and --cell cannot be combined".to_string());
    }
    Ok(Command::Run(opts))
}

/// Parse `COLUMN<TAB>ROW<TAB>TEXT` lines; blank lines are skipped.
fn parse_triples(text: &str) -> anyhow::Result<Vec<CellInput>> {
    let mut inputs = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, '\t');
        let (Some(column), Some(row), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            bail!("line {}: expected COLUMN<TAB>ROW<TAB>TEXT", idx + 1);
        };
        let row = row
            .trim()
            .parse::<i64>()
            .with_context(|| format!("line {}: invalid row '{}'", idx + 1, row))?;
        inputs.push(CellInput::new(column.trim(), row, value));
    }
    Ok(inputs)
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        let filter = EnvFilter::from_default_env();
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .init();
    }
}

fn with_overrides(base: SheetBounds, opts: &Options) -> SheetBounds {
    SheetBounds::new(
        opts.columns.unwrap_or(base.max_columns),
        opts.rows.unwrap_or(base.max_rows),
    )
}

fn build(opts: &Options, config: &config::Config) -> anyhow::Result<Sheet> {
    if let Some(path) = &opts.file {
        let bounds = with_overrides(config.import, opts);
        return load_tsv(path, bounds)
            .with_context(|| format!("Failed to load {}", path.display()));
    }

    let bounds = with_overrides(config.sheet, opts);
    let inputs = if opts.cells.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        parse_triples(&text)?
    } else {
        opts.cells.clone()
    };
    Ok(build_sheet(&inputs, bounds)?)
}

/// Returns whether every formula evaluated.
fn run(opts: Options) -> anyhow::Result<bool> {
    let config = if opts.no_config {
        config::Config::default()
    } else {
        let (config, warnings) = config::load_config(opts.config.as_deref());
        for warning in warnings {
            eprintln!("Warning: {}", warning);
        }
        config
    };

    let mut sheet = build(&opts, &config)?;
    let summary = sheet.calculate();
    tracing::info!(
        cells = sheet.len(),
        evaluated = summary.evaluated,
        failed = summary.failed,
        "sheet calculated"
    );

    let outputs = batch::outputs(&sheet);
    if opts.json {
        print!("{}", report::render_json(&outputs)?);
    } else {
        print!("{}", report::render_text(&outputs));
    }

    if let Some(path) = &opts.output {
        save_tsv(path, &sheet).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(summary.failed == 0)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let opts = match parse_args(&args) {
        Ok(Command::Help) => {
            print_usage();
            return;
        }
        Ok(Command::Run(opts)) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    init_tracing();

    match run(opts) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
