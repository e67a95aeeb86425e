#![deny(clippy::all)]

use std::{fs, io::Write, path::PathBuf, process};

use anyhow::Context;
use structopt::StructOpt;
use tgq::error::SourceError;
use tgq::Compiler;

/// TGQ shader compiler, producing TGQ GPU bytecode plus textual token/AST
/// dumps. `spec.md` §6.
#[derive(Debug, StructOpt)]
#[structopt(name = "tgqc")]
struct Opt {
    /// Path to the source code file.
    #[structopt(parse(from_os_str))]
    input_file: PathBuf,

    /// Print the filtered token stream.
    #[structopt(short = "t", long = "tokens")]
    tokens: bool,

    /// Print the parsed AST.
    #[structopt(short = "a", long = "ast")]
    ast: bool,

    /// Redirect textual (token/AST) output to a file instead of stdout.
    #[structopt(short = "o", long = "out", parse(from_os_str))]
    output_path: Option<PathBuf>,
}

fn read_file(path: &PathBuf) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Interleave a space every 4 bytes and a newline every 16, per `spec.md`
/// §6's hex-dump description.
fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 && i % 16 == 0 {
            out.push('\n');
        } else if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

fn run(opt: Opt) -> anyhow::Result<bool> {
    let source = read_file(&opt.input_file)?;
    let (print_tokens, print_ast) = if !opt.tokens && !opt.ast {
        (true, true)
    } else {
        (opt.tokens, opt.ast)
    };

    let mut textual = String::new();
    let tokens = tgq::token::filter_comments(tgq::token::Lexer::new(&source).tokenize());

    if print_tokens {
        textual.push_str("=== Tokens ===\n");
        for token in &tokens {
            textual.push_str(&format!("{:?} {:?}\n", token.kind, token.lexeme));
        }
    }

    let compiled = match Compiler::compile(source.clone()) {
        Ok(compiled) => compiled,
        Err(with_source) => {
            for error in with_source.errors() {
                eprintln!(
                    "[{}] {}",
                    if error.error().is_warning() {
                        "Warn"
                    } else {
                        "Err "
                    },
                    error
                );
            }
            write_textual(&opt.output_path, &textual)?;
            return Ok(false);
        }
    };

    if print_ast {
        textual.push_str("=== AST ===\n");
        if let Ok(program) = tgq::parse::Parser::new(&tokens).parse_program() {
            textual.push_str(&format!("{:#?}\n", program));
        }
    }

    for warning in compiled.warnings() {
        eprintln!("[Warn] {}", warning);
    }

    write_textual(&opt.output_path, &textual)?;

    let code_path = output_sibling(&opt.input_file, "code.bin");
    let data_path = output_sibling(&opt.input_file, "data.hex");
    fs::write(&code_path, compiled.code())
        .with_context(|| format!("Failed to write {:?}", code_path))?;
    fs::write(&data_path, compiled.data())
        .with_context(|| format!("Failed to write {:?}", data_path))?;

    println!("{}", hex_dump(compiled.code()));
    Ok(true)
}

fn output_sibling(input: &PathBuf, suffix: &str) -> PathBuf {
    let mut path = input.clone();
    path.set_extension(suffix);
    path
}

fn write_textual(output_path: &Option<PathBuf>, textual: &str) -> anyhow::Result<()> {
    match output_path {
        Some(path) => {
            let mut file =
                fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            file.write_all(textual.as_bytes())?;
        }
        None => print!("{}", textual),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let exit_code = match run(Opt::from_args()) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    };
    process::exit(exit_code);
}
