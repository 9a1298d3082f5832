//! `bytelog` CLI: parse a ByteLog program and either execute it in-process
//! or compile it to a WebAssembly text module.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bytelog::config::Config;
use bytelog::engine::{Engine, QueryResult};
use bytelog::parser::parse_program;
use bytelog::wat_gen::WatGen;

#[derive(Parser)]
#[command(name = "bytelog", about = "A small bottom-up Datalog-style deductive system")]
struct Cli {
    /// Increase log verbosity (stacks: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, execute, and print derived facts and query results.
    Demo {
        /// Source file to run. Defaults to `example_family.bl`.
        file: Option<PathBuf>,
    },
    /// Compile a ByteLog program to a WebAssembly text module.
    WatGen {
        input: PathBuf,
        output: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "bytelog=info",
        1 => "bytelog=debug",
        _ => "bytelog=trace",
    };
    let filter = EnvFilter::try_from_env("BYTELOG_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().unwrap_or_default();

    match cli.command {
        Command::Demo { file } => run_demo(file, &config),
        Command::WatGen { input, output } => run_wat_gen(&input, &output, &config),
    }
}

fn run_demo(file: Option<PathBuf>, config: &Config) -> Result<()> {
    let path = file.unwrap_or_else(|| PathBuf::from("example_family.bl"));
    let source = fs::read_to_string(&path)
        .with_context(|| format!("reading source file {}", path.display()))?;

    let program = parse_program(&source).map_err(|e| anyhow::anyhow!("parse error: {e}"))?;
    tracing::info!(statements = program.statements.len(), "parsed program");

    let mut engine = Engine::new(config.engine.clone());
    let results = engine
        .run(&program)
        .map_err(|e| anyhow::anyhow!("engine error: {e}"))?;

    for stmt in program.queries() {
        if let bytelog::ast::Statement::Query { relation, a, b, .. } = stmt {
            println!("QUERY {relation} {} {}", describe_arg(a), describe_arg(b));
        }
    }

    for result in &results {
        match result {
            QueryResult::Membership(found) => println!("  -> {found}"),
            QueryResult::Column(values) => println!("  -> {values:?}"),
            QueryResult::Pairs(pairs) => println!("  -> {pairs:?}"),
        }
    }

    Ok(())
}

fn describe_arg(arg: &bytelog::ast::Arg) -> String {
    if arg.is_wildcard() {
        "?".to_string()
    } else if let Some(atom) = &arg.atom {
        atom.clone()
    } else {
        arg.num.to_string()
    }
}

fn run_wat_gen(input: &PathBuf, output: &PathBuf, config: &Config) -> Result<()> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("reading source file {}", input.display()))?;
    let program = parse_program(&source).map_err(|e| anyhow::anyhow!("parse error: {e}"))?;

    let mut out = fs::File::create(output)
        .with_context(|| format!("creating output file {}", output.display()))?;
    let mut gen = WatGen::new(config.wat.clone());
    gen.generate(&program, &mut out)
        .map_err(|e| anyhow::anyhow!("wat generation error: {e}"))?;

    tracing::info!(output = %output.display(), "wrote WAT module");
    Ok(())
}
