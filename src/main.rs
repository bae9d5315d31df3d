// main.rs - compiler front-end CLI entry point
// Reads one source file, runs it through the lexer/parser/analyzer pipeline,
// and prints tokens, the AST, or diagnostics. Everything past this point
// (code emission, a REPL, a real build pipeline) is out of scope: this is a
// thin driver, not a product.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use stack_forgec::{compile, Ast, BuiltinConfig, CompileUnit};

/// stack-forgec - front-end driver for a stack-based Forth-like language
#[derive(ClapParser)]
#[command(name = "stack-forgec")]
#[command(version)]
#[command(about = "Lexes, parses, and infers stack effects for a Forth-like source file", long_about = None)]
struct Cli {
    /// Source file to compile
    input: PathBuf,

    /// Print the token stream before parsing
    #[arg(long)]
    dump_tokens: bool,

    /// Print the parsed syntax tree
    #[arg(long)]
    dump_ast: bool,

    /// Print extra detail (source location on every diagnostic, per-word effects)
    #[arg(short, long)]
    verbose: bool,

    /// Print word/diagnostic counts after compiling
    #[arg(long)]
    stats: bool,

    /// Built-in vocabulary tier to seed the dictionary with
    #[arg(long, value_enum, default_value = "standard")]
    builtins: BuiltinsArg,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum BuiltinsArg {
    Minimal,
    Standard,
    MathEnhanced,
    Extended,
}

impl From<BuiltinsArg> for BuiltinConfig {
    fn from(arg: BuiltinsArg) -> Self {
        match arg {
            BuiltinsArg::Minimal => BuiltinConfig::Minimal,
            BuiltinsArg::Standard => BuiltinConfig::Standard,
            BuiltinsArg::MathEnhanced => BuiltinConfig::MathEnhanced,
            BuiltinsArg::Extended => BuiltinConfig::Extended,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(had_errors) => {
            if had_errors {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "verbose-logging")]
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(not(feature = "verbose-logging"))]
fn init_logging(_verbose: bool) {}

fn run(cli: &Cli) -> Result<bool, String> {
    let source = std::fs::read_to_string(&cli.input)
        .map_err(|e| format!("could not read {}: {e}", cli.input.display()))?;

    tracing::info!(path = %cli.input.display(), bytes = source.len(), "compiling");

    if cli.dump_tokens {
        dump_tokens(&source)?;
    }

    let unit = compile(&source, cli.builtins.into()).map_err(|e| e.to_string())?;

    if cli.dump_ast {
        dump_ast(&unit);
    }

    for diag in &unit.diagnostics {
        if diag.is_error() {
            eprintln!("error: {diag}");
        } else {
            println!("warning: {diag}");
        }
    }

    if cli.stats {
        print_stats(&unit);
    }

    Ok(unit.has_errors())
}

fn dump_tokens(source: &str) -> Result<(), String> {
    let tokens = stack_forgec::Lexer::new(source).tokenize().map_err(|e| e.to_string())?;
    println!("-- tokens --");
    for token in &tokens {
        println!("{:>4}:{:<3} {:?} {:?}", token.line, token.column, token.kind, token.lexeme);
    }
    println!();
    Ok(())
}

fn dump_ast(unit: &CompileUnit) {
    println!("-- ast --");
    for statement in &unit.program.statements {
        print_node(statement, 0);
    }
    println!();
}

fn print_node(node: &Ast, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        Ast::Program(statements) => {
            println!("{indent}Program");
            for s in statements {
                print_node(s, depth + 1);
            }
        }
        Ast::WordDefinition { name, body, .. } => {
            println!("{indent}WordDefinition {name}");
            for s in body.iter() {
                print_node(s, depth + 1);
            }
        }
        Ast::WordCall { name, .. } => println!("{indent}WordCall {name}"),
        Ast::NumberLiteral { text, is_float, .. } => {
            println!("{indent}NumberLiteral {text} (float={is_float})");
        }
        Ast::StringLiteral { text, is_print, .. } => {
            println!("{indent}StringLiteral {text:?} (print={is_print})");
        }
        Ast::IfStatement {
            then_branch,
            else_branch,
            ..
        } => {
            println!("{indent}If");
            for s in then_branch {
                print_node(s, depth + 1);
            }
            if let Some(else_branch) = else_branch {
                println!("{indent}Else");
                for s in else_branch {
                    print_node(s, depth + 1);
                }
            }
        }
        Ast::BeginUntilLoop { body, .. } => {
            println!("{indent}BeginUntil");
            for s in body {
                print_node(s, depth + 1);
            }
        }
        Ast::MathOperation { op, .. } => println!("{indent}MathOperation {op:?}"),
        Ast::VariableDeclaration { name, is_constant, .. } => {
            let kind = if *is_constant { "Constant" } else { "Variable" };
            println!("{indent}{kind} {name}");
        }
    }
}

fn print_stats(unit: &CompileUnit) {
    let word_count = unit.program.definitions().count();
    let error_count = unit.diagnostics.iter().filter(|d| d.is_error()).count();
    let warning_count = unit.diagnostics.len() - error_count;

    println!("-- stats --");
    println!("words defined: {word_count}");
    println!("errors:        {error_count}");
    println!("warnings:      {warning_count}");
    for (name, _, _) in unit.program.definitions() {
        if let Some(effect) = unit.dictionary.effect_of(name) {
            println!("  {name}: {effect}");
        }
    }
}
