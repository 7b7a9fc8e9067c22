//! # Ash
//!
//! The command line driver for Ash. It runs the full pipeline on a source
//! file and either evaluates the program or emits host source text for a
//! separate toolchain.

use std::fmt::Display;

use anyhow::{anyhow, Context};
use clap::{Parser as ClapParser, ValueEnum};
use colored::Colorize;
use log::debug;

use ash_lang::analyzer::Analyzer;
use ash_lang::codegen;
use ash_lang::interpreter::{stdlib, Interpreter};
use ash_lang::lexer::Lexer;
use ash_lang::parser::Parser;

#[derive(ClapParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The path to the Ash source file.
    file: std::path::PathBuf,

    /// Emit host source text instead of evaluating the program.
    #[arg(short, long)]
    emit: bool,

    /// Print the result of the evaluation.
    #[arg(short, long)]
    print_result: bool,

    /// Specify the log level of the pipeline.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,
}

#[derive(ValueEnum, Clone, Default, Debug)]
enum LogLevel {
    /// Only critical errors are logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings.
    #[value(alias("1"))]
    Warn,

    /// Also log the output of the `log` builtin.
    #[value(alias("2"))]
    Info,

    /// Log the state of every pipeline stage.
    #[value(alias("3"))]
    Debug,

    /// Log everything that happens internally.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    simple_logger::init_with_level((&args.verbosity).into())?;

    let input = std::fs::read_to_string(&args.file)
        .with_context(|| format!("could not read '{}'", args.file.display()))?;

    let tokens = Lexer::new(&input).lex().map_err(|e| fail("lex", e))?;
    debug!("lexed {} token(s)", tokens.len());

    let source = Parser::parse(tokens).map_err(|e| fail("parse", e))?;
    debug!("parsed {} top-level statement(s)", source.statements.len());

    let typed = Analyzer::analyze(&source, stdlib::type_scope()).map_err(|e| fail("analyze", e))?;

    if args.emit {
        print!("{}", codegen::generate(&typed));
        return Ok(());
    }

    let result =
        Interpreter::evaluate(&source, stdlib::runtime_scope()).map_err(|e| fail("evaluate", e))?;
    if args.print_result {
        println!("{result}");
    }

    Ok(())
}

fn fail(stage: &str, error: impl Display) -> anyhow::Error {
    anyhow!("{}", format!("{stage} error: {error}").red())
}
