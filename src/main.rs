// civet: tree-walking interpreter for a subset of C

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use civet::{interpret_with, Options, ReplContext};

#[derive(Parser, Debug)]
#[command(name = "civet")]
#[command(version)]
#[command(about = "Interpret a subset of C with a simulated heap", long_about = None)]
struct Args {
    /// C source file to run; starts the interactive mode when omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Report heap blocks that were never freed as LeakWarnings
    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.input {
        Some(path) => run_file(&path, args.strict),
        None => repl(),
    }
}

fn run_file(path: &Path, strict: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read '{}': {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let options = Options {
        strict,
        cancel: None,
    };
    let outcome = interpret_with(&source, None, &options);

    print!("{}", outcome.stdout);
    for diagnostic in &outcome.diagnostics {
        eprintln!("{}", diagnostic);
    }

    ExitCode::from(outcome.exit_code.rem_euclid(256) as u8)
}

fn repl() -> ExitCode {
    eprintln!("civet interactive mode; enter C fragments, 'exit' to quit");

    let mut context = ReplContext::new();
    let stdin = io::stdin();

    loop {
        eprint!("civet> ");
        let _ = io::stderr().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let step = context.step(line);
        print!("{}", step.stdout_delta);
        let _ = io::stdout().flush();
        for diagnostic in &step.diagnostics {
            eprintln!("{}", diagnostic);
        }
    }

    ExitCode::SUCCESS
}
