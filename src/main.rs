use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use treelox::ast_printer::AstPrinter;
use treelox::config::InterpreterConfig;
use treelox::error::LoxError;
use treelox::scanner::Scanner;
use treelox::Lox;

/// Exit code for errors found before execution (scan, parse, resolve).
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit code for errors raised while the program runs.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Write debug logs to FILE (app.log when no FILE is given)
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "app.log"
    )]
    log: Option<PathBuf>,

    /// JSON file with interpreter settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum nesting of function calls before a stack overflow error
    #[arg(long, global = true, value_name = "N")]
    max_call_depth: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a file and prints its syntax tree
    Parse {
        filename: PathBuf,

        /// Print the tree as JSON instead of prefix form
        #[arg(long)]
        json: bool,
    },

    /// Evaluates a single expression from a file and prints its value
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program
    Run { filename: PathBuf },

    /// Reads programs line by line from stdin
    Repl,
}

/// Reads a source file through a memory map and checks it is UTF‑8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once, immediately, and copied out; concurrent
    // truncation of a script while it is being loaded is not supported.
    let map = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let source = std::str::from_utf8(&map)
        .map_err(LoxError::from)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", len, filename);

    Ok(source.to_owned())
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("treelox::").unwrap_or(module);
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // RUST_LOG below overrides
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<InterpreterConfig> {
    let mut config = match &cli.config {
        Some(path) => InterpreterConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => InterpreterConfig::default(),
    };

    if let Some(depth) = cli.max_call_depth {
        config = config.with_max_call_depth(depth);
    }

    debug!("Interpreter config: {:?}", config);
    Ok(config)
}

/// Print every error and pick the exit code from the first one.
fn report(errors: &[LoxError]) -> i32 {
    for e in errors {
        eprintln!("{}", e);
    }

    match errors.first() {
        Some(e) if !e.is_static() => EXIT_RUNTIME_ERROR,
        _ => EXIT_STATIC_ERROR,
    }
}

fn tokenize(filename: &Path) -> Result<()> {
    info!("Running Tokenize subcommand");

    let source = read_source(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => println!("{}", token),

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        process::exit(EXIT_STATIC_ERROR);
    }

    Ok(())
}

fn parse(filename: &Path, json: bool) -> Result<()> {
    info!("Running Parse subcommand");

    let source = read_source(filename)?;

    let statements = match treelox::parse_program(&source) {
        Ok(statements) => statements,
        Err(errors) => process::exit(report(&errors)),
    };

    if json {
        let text = serde_json::to_string_pretty(&statements).context("Failed to encode AST")?;
        println!("{}", text);
    } else {
        for stmt in &statements {
            println!("{}", AstPrinter::print_stmt(stmt));
        }
    }

    Ok(())
}

fn evaluate(filename: &Path, config: InterpreterConfig) -> Result<()> {
    info!("Running Evaluate subcommand");

    let source = read_source(filename)?;
    let mut lox = Lox::new().with_config(config);

    match lox.evaluate(&source) {
        Ok(value) => println!("{}", value),
        Err(errors) => process::exit(report(&errors)),
    }

    Ok(())
}

fn run(filename: &Path, config: InterpreterConfig) -> Result<()> {
    info!("Running Run subcommand");

    let source = read_source(filename)?;
    let mut lox = Lox::new().with_config(config);

    if let Err(errors) = lox.run(&source) {
        process::exit(report(&errors));
    }

    info!("Program executed successfully");
    Ok(())
}

fn repl(config: InterpreterConfig) -> Result<()> {
    info!("Running Repl subcommand");

    let mut lox = Lox::new().with_config(config);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        // Each line stands alone: an error is reported and the session goes on.
        if let Err(errors) = lox.run(&line) {
            report(&errors);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli: Cli = Cli::parse();

    match &cli.log {
        Some(path) => init_logger(path)?,
        None => Builder::new().filter_level(log::LevelFilter::Off).init(),
    }

    info!("CLI arguments: {:?}", cli);

    let config = load_config(&cli)?;

    match &cli.commands {
        Commands::Tokenize { filename } => tokenize(filename),
        Commands::Parse { filename, json } => parse(filename, *json),
        Commands::Evaluate { filename } => evaluate(filename, config),
        Commands::Run { filename } => run(filename, config),
        Commands::Repl => repl(config),
    }
}
