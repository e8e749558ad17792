use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use fox::ast_printer::AstPrinter;
use fox::error::Diagnostics;
use fox::parser::Parser;
use fox::scanner::{self, Scanner};
use fox::session::{Session, EXIT_STATIC_ERROR};

/// Exit code when the input file cannot be read.
const EXIT_IO_ERROR: i32 = 74;

#[derive(ClapParser, Debug)]
#[command(version, about = "Fox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Log file used with --log
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a file and prints its AST
    Parse {
        filename: PathBuf,

        /// Dump the whole program as JSON instead of printing one expression
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Fox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Reads the contents of a file as UTF‑8 text.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

/// Like [`read_file`] but exits with the I/O code on failure.
fn read_source(filename: &Path) -> String {
    match read_file(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(EXIT_IO_ERROR);
        }
    }
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    // Default to Debug, override with RUST_LOG
    Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("fox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
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
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn tokenize(filename: &Path) {
    let source = read_source(filename);
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
        std::process::exit(EXIT_STATIC_ERROR);
    }
}

fn parse(filename: &Path, json: bool) -> Result<()> {
    let source = read_source(filename);
    let mut diagnostics = Diagnostics::new();
    let tokens = scanner::scan(&source, &mut diagnostics);
    let mut parser = Parser::new(&tokens);

    if json {
        let program = parser.parse(&mut diagnostics);

        if !diagnostics.has_errors() {
            println!("{}", serde_json::to_string_pretty(&program)?);
        }
    } else if let Some(expr) = parser.parse_expression(&mut diagnostics) {
        if !diagnostics.has_errors() {
            println!("{}", AstPrinter::print(&expr));
        }
    }

    if diagnostics.has_errors() {
        diagnostics.sort_by_line();
        eprintln!("{}", diagnostics);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    Ok(())
}

fn evaluate(filename: &Path) {
    let source = read_source(filename);
    let mut session = Session::new();

    match session.evaluate(&source) {
        Ok(value) => println!("{}", value),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn run(filename: &Path) {
    let source = read_source(filename);
    let mut session = Session::new();

    if let Err(e) = session.run(&source) {
        debug!("Run failed: {}", e);
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }

    info!("Program executed successfully");
}

fn repl() -> Result<()> {
    let mut session = Session::new();
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

        // Errors are shown and the prompt continues; state is kept.
        if let Err(e) = session.run(&line) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger(&args.log_file)?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename } => tokenize(filename),
        Commands::Parse { filename, json } => parse(filename, *json)?,
        Commands::Evaluate { filename } => evaluate(filename),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl()?,
    }

    Ok(())
}
