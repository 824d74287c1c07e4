// Standard Imports
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use cminus_compiler::compiler;
use cminus_compiler::compiler::diagnostics::Diagnostics;
use cminus_compiler::compiler::Compiler;

// Basic Compiler Configuration
type PARSER = compiler::PestCMinusParser;
type ANALYSER = compiler::CMinusSemanticAnalyser;
type GENERATOR = compiler::TinyCodeGenerator;

const KNOWN_OPTIONS: &[&str] = &["-h", "-d", "-D", "-p", "-P", "-M"];

/// Command Line interface struct
/// Describes possible arguments using the clap library
#[derive(Parser)]
#[clap(name = "cminusc", disable_help_flag = true)]
struct CompilerCLIOptions {
    /// Path of file to compile. C- source files end in .c-
    #[clap(parse(from_os_str))]
    path: Option<PathBuf>,

    /// Print this usage message
    #[clap(short = 'h', action)]
    help: bool,

    /// Turn on parser debugging
    #[clap(short = 'd', action)]
    debug_parser: bool,

    /// Turn on symbol table debugging
    #[clap(short = 'D', action)]
    debug_symbol_table: bool,

    /// Print the abstract syntax tree
    #[clap(short = 'p', action)]
    print_ast: bool,

    /// Print the abstract syntax tree plus type information
    #[clap(short = 'P', action)]
    print_typed_ast: bool,

    /// Print the abstract syntax tree plus type and memory information
    #[clap(short = 'M', action)]
    print_memory_ast: bool,
}

impl CompilerCLIOptions {
    /// Raise the log level for the module a debug flag targets; everything
    /// else stays quiet.
    fn init_logging(&self) {
        let mut builder = env_logger::Builder::new();
        builder.format_timestamp(None);
        builder.filter_level(LevelFilter::Warn);
        if self.debug_parser {
            builder.filter_module("cminus_compiler::compiler::parser", LevelFilter::Debug);
        }
        if self.debug_symbol_table {
            builder.filter_module(
                "cminus_compiler::compiler::semantic_analyser::symbol_table",
                LevelFilter::Debug,
            );
        }
        builder.init();
    }
}

fn print_usage() {
    println!("usage: cminusc [options] [sourcefile]");
    println!("options:");
    println!("-d \t- turn on parser debugging");
    println!("-D \t- turn on symbol table debugging");
    println!("-h \t- print this usage message");
    println!("-p \t- print the abstract syntax tree");
    println!("-P \t- print the abstract syntax tree plus type information");
    println!("-M \t- print the abstract syntax tree plus type and memory information");
}

fn print_totals(diagnostics: &Diagnostics) {
    println!("Number of warnings: {}", diagnostics.warning_count());
    println!("Number of errors: {}", diagnostics.error_count());
}

fn main() {
    // An unknown option is reported but does not stop the compile; the
    // remaining arguments are still processed.
    let mut arguments = vec![];
    for (index, argument) in std::env::args().enumerate() {
        if index > 0
            && argument.starts_with('-')
            && !KNOWN_OPTIONS.contains(&argument.as_str())
        {
            println!("'{}' is not a known option", argument);
            println!("type '-h' for help");
        } else {
            arguments.push(argument);
        }
    }

    let cli_args = CompilerCLIOptions::parse_from(arguments);
    cli_args.init_logging();

    if cli_args.help || cli_args.path.is_none() {
        print_usage();
        std::process::exit(exitcode::OK);
    }

    let path = cli_args.path.as_ref().unwrap(); // Can unwrap as the missing-path case exited above
    let mut diagnostics = Diagnostics::new();

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(_) => {
            diagnostics.arglist_error(format!(
                "source file \"{}\" could not be opened.",
                path.display()
            ));
            diagnostics.flush_to(&mut std::io::stdout());
            print_totals(&diagnostics);
            std::process::exit(exitcode::OK);
        }
    };

    let compiler: Compiler<PARSER, ANALYSER, GENERATOR> = Compiler::default()
        .set_print_ast(cli_args.print_ast)
        .set_print_typed_ast(cli_args.print_typed_ast)
        .set_print_memory_ast(cli_args.print_memory_ast)
        .set_reporting(true);

    let program = compiler.compile_str(source.as_str(), &mut diagnostics);
    diagnostics.flush_to(&mut std::io::stdout());
    print_totals(&diagnostics);

    // Code is emitted only for a run with zero errors.
    if let Some(program) = program {
        let dest_path = path.with_extension("tm");
        if let Err(why) = std::fs::write(&dest_path, format!("{}", program)) {
            println!("Couldn't write to {}: {}", dest_path.display(), why);
            std::process::exit(exitcode::IOERR);
        }
    }

    std::process::exit(exitcode::OK);
}
