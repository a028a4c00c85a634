//! ctrace CLI

use clap::{Parser, Subcommand};
use ctrace::debugger::parse_query;
use ctrace::opt::{OptLevel, OptimizationPipeline};
use ctrace::repl::Repl;
use ctrace::{Program, Session, SessionConfig, TranslationUnit};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctrace", version, about = "Line-stepping interpreter and debugger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program to completion
    Run {
        /// Translation unit as JSON
        file: PathBuf,
        /// Session configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Fold constants and eliminate dead stores first
        #[arg(long)]
        optimize: bool,
    },
    /// Dump each function's control-flow graph
    Graph {
        file: PathBuf,
        #[arg(long)]
        optimize: bool,
        /// Emit JSON instead of a text listing
        #[arg(long)]
        json: bool,
    },
    /// Step through a program interactively
    Debug {
        file: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Step a number of lines, then print or trace variables
    Inspect {
        file: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Lines to execute before answering queries
        #[arg(long, default_value_t = 1)]
        steps: usize,
        /// Variable to print; `*p`, `&x` and `a[1]` forms are accepted
        #[arg(long = "print", value_name = "NAME")]
        prints: Vec<String>,
        /// Variable whose history to show
        #[arg(long = "trace", value_name = "NAME")]
        traces: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            file,
            config,
            optimize,
        } => run_file(&file, config.as_deref(), optimize),
        Command::Graph {
            file,
            optimize,
            json,
        } => graph_file(&file, optimize, json),
        Command::Debug { file, config } => debug_file(&file, config.as_deref()),
        Command::Inspect {
            file,
            config,
            steps,
            prints,
            traces,
        } => inspect_file(&file, config.as_deref(), steps, &prints, &traces),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_unit(path: &Path) -> Result<TranslationUnit, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&source)?)
}

fn load_config(path: Option<&Path>) -> ctrace::Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load(path),
        None => Ok(SessionConfig::default()),
    }
}

fn run_file(path: &Path, config: Option<&Path>, optimize: bool) -> Result<(), Box<dyn std::error::Error>> {
    let unit = read_unit(path)?;
    let mut config = load_config(config)?;
    if optimize {
        config = config.opt_level(OptLevel::Release);
    }

    let mut session = Session::new(&unit, config)?;
    let result = session.run_to_end();
    print!("{}", session.output());
    let steps = result?;
    eprintln!("{steps} steps");
    Ok(())
}

fn graph_file(path: &Path, optimize: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let unit = read_unit(path)?;
    let mut program = Program::build(&unit)?;
    if optimize {
        OptimizationPipeline::for_level(OptLevel::Release).optimize(&mut program);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&program.cfg)?);
    } else {
        print!("{}", program.render());
    }
    Ok(())
}

fn debug_file(path: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let unit = read_unit(path)?;
    let session = Session::new(&unit, load_config(config)?)?;
    Repl::new(session)?.run()?;
    Ok(())
}

fn inspect_file(
    path: &Path,
    config: Option<&Path>,
    steps: usize,
    prints: &[String],
    traces: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let unit = read_unit(path)?;
    let mut session = Session::new(&unit, load_config(config)?)?;

    session.begin()?;
    let progress = session.next(steps)?;
    println!("{progress}");

    for query in prints {
        let (name, index) = parse_query(query).ok_or_else(|| format!("bad query `{query}`"))?;
        println!("{}", session.print(name, index));
    }
    for query in traces {
        let (name, index) = parse_query(query).ok_or_else(|| format!("bad query `{query}`"))?;
        println!("{}", session.trace(name, index));
    }
    Ok(())
}
