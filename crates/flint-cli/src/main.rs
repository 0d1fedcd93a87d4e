use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use clap::Parser;
use owo_colors::OwoColorize;

use flint_codegen::Generator;
use flint_lexer::Lexer;
use flint_parser::Parser as FlintParser;
use flint_syntax::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "flint",
    about = "Compile Flint source files to native Linux executables"
)]
struct Cli {
    /// Source file to compile
    input: PathBuf,

    /// Path of the produced executable
    #[arg(short = 'o', long = "output", default_value = "a.out")]
    output: PathBuf,

    /// Stop after writing the assembly file and print its path
    #[arg(long = "emit-asm", default_value_t = false)]
    emit_asm: bool,

    /// Dump the token stream to stderr
    #[arg(long = "dump-tokens", default_value_t = false)]
    dump_tokens: bool,

    /// Dump the parse tree to stderr
    #[arg(long = "dump-ast", default_value_t = false)]
    dump_ast: bool,

    /// Keep the intermediate .s and .o files
    #[arg(long = "keep", default_value_t = false)]
    keep: bool,
}

fn render_error(source: &str, err: &Error) {
    eprintln!("{}: {}", err.category.label().red().bold(), err.msg);
    if let Some((line, col)) = err.span {
        match source.lines().nth(line - 1) {
            Some(text) => {
                let prefix = format!("{line} | ");
                eprintln!("  {}{}", prefix.bright_black(), text);
                eprintln!("  {}{}", " ".repeat(prefix.len() + col - 1), "^".red());
            }
            None => eprintln!("  at {line}:{col}"),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let src = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "{}: failed to read {}: {e}",
                "error".red().bold(),
                cli.input.display()
            );
            std::process::exit(1);
        }
    };

    let mut lexer = Lexer::new(&src);
    let tokens = match lexer.tokenize() {
        Ok(t) => t,
        Err(e) => {
            render_error(&src, &e);
            std::process::exit(1);
        }
    };
    if cli.dump_tokens {
        for token in &tokens {
            eprintln!("{token:?}");
        }
    }

    let mut parser = FlintParser::new(tokens);
    let program = match parser.parse_program() {
        Ok(p) => p,
        Err(e) => {
            render_error(&src, &e);
            std::process::exit(1);
        }
    };
    if cli.dump_ast {
        eprintln!("{program:#?}");
    }

    let mut generator = Generator::new();
    let asm = match generator.generate(&program) {
        Ok(a) => a,
        Err(e) => {
            render_error(&src, &e);
            std::process::exit(1);
        }
    };
    for warning in generator.warnings() {
        eprintln!("{}: {warning}", "warning".yellow().bold());
    }

    if let Err(e) = build(&cli, &asm) {
        render_error(&src, &e);
        std::process::exit(1);
    }
}

/// Write the assembly next to the requested output and hand it to the
/// external assembler and linker.
fn build(cli: &Cli, asm: &str) -> Result<()> {
    let asm_path = cli.output.with_extension("s");
    let obj_path = cli.output.with_extension("o");

    fs::write(&asm_path, asm)
        .map_err(|e| Error::driver(format!("failed to write {}: {e}", asm_path.display())))?;
    if cli.emit_asm {
        println!("{}", asm_path.display());
        return Ok(());
    }

    assemble(&asm_path, &obj_path)?;
    link(&obj_path, &cli.output)?;

    if !cli.keep {
        let _ = fs::remove_file(&asm_path);
        let _ = fs::remove_file(&obj_path);
    }
    Ok(())
}

fn assemble(asm_path: &Path, obj_path: &Path) -> Result<()> {
    let status = Command::new("as")
        .arg("-o")
        .arg(obj_path)
        .arg(asm_path)
        .status()
        .map_err(|e| Error::driver(format!("failed to run 'as': {e}")))?;
    if !status.success() {
        return Err(Error::driver(format!("'as' failed on {}", asm_path.display())));
    }
    Ok(())
}

fn link(obj_path: &Path, exe_path: &Path) -> Result<()> {
    let status = Command::new("ld")
        .arg("-o")
        .arg(exe_path)
        .arg(obj_path)
        .status()
        .map_err(|e| Error::driver(format!("failed to run 'ld': {e}")))?;
    if !status.success() {
        return Err(Error::driver(format!("'ld' failed on {}", obj_path.display())));
    }
    Ok(())
}
