//! # Introduction
//!
//! Civet parses and executes a substantial subset of C directly, with no
//! machine code or bytecode in between. Pointers, arrays and `malloc`'d
//! blocks live in a simulated byte-addressable heap, which makes every
//! out-of-range or dangling access mechanically detectable.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Evaluator → stdout + exit code
//! ```
//!
//! 1. [`parser`] — tokenises the source and builds an AST.
//! 2. [`interpreter`] — walks the AST with lexical scoping, call frames
//!    and explicit control-flow signals.
//! 3. [`memory`] — tagged runtime values plus the simulated heap shared
//!    by `malloc` blocks, frame storage and string literals.
//!
//! ## Supported C subset
//!
//! Types: `int`, `float`, `char`, `void`, one level of pointers,
//! fixed-size arrays. Control flow: `if`/`else`, `while`, `do`-`while`,
//! `for`, `break`, `continue`, `return`. Built-ins: `printf`, `puts`,
//! `scanf`, `gets`, `strlen`, `strcpy`, `strcmp`, `malloc`, `free`,
//! `realloc`.
//!
//! ## Driver API
//!
//! [`interpret`] runs a whole program (its `main` supplies the exit
//! code); [`ReplContext`] executes fragments against a persistent context
//! and rolls back on failure. Errors surface as [`Diagnostic`] values.
//!
//! ```
//! let outcome = civet::interpret(
//!     "int main() { printf(\"2 + 2 = %d\\n\", 2 + 2); return 0; }",
//!     None,
//! );
//! assert_eq!(outcome.exit_code, 0);
//! assert_eq!(outcome.stdout, "2 + 2 = 4\n");
//! ```

pub mod interpreter;
pub mod memory;
pub mod parser;

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use interpreter::errors::RuntimeError;
use memory::value::{Address, Value};
use parser::lexer::{LexError, Lexer};
use parser::parser::{ParseError, Parser};

pub use interpreter::engine::{CancelToken, Interpreter};

/// What kind of problem a diagnostic reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    LexError,
    ParseError,
    RuntimeError,
    LeakWarning,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::LexError => write!(f, "LexError"),
            DiagnosticKind::ParseError => write!(f, "ParseError"),
            DiagnosticKind::RuntimeError => write!(f, "RuntimeError"),
            DiagnosticKind::LeakWarning => write!(f, "LeakWarning"),
        }
    }
}

/// A single problem surfaced to the driver. `line`/`column` are 1-based;
/// line 0 means the diagnostic has no source position (leak warnings).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    fn lex(err: &LexError) -> Self {
        Diagnostic {
            kind: DiagnosticKind::LexError,
            message: err.message.clone(),
            line: err.location.line,
            column: err.location.column,
        }
    }

    fn parse(err: &ParseError) -> Self {
        Diagnostic {
            kind: DiagnosticKind::ParseError,
            message: err.message.clone(),
            line: err.location.line,
            column: err.location.column,
        }
    }

    fn runtime(err: &RuntimeError) -> Self {
        let location = err.location();
        Diagnostic {
            kind: DiagnosticKind::RuntimeError,
            message: err.to_string(),
            line: location.line,
            column: location.column,
        }
    }

    fn leak(addr: Address, size: usize) -> Self {
        Diagnostic {
            kind: DiagnosticKind::LeakWarning,
            message: format!("{} byte(s) allocated at {:#x} were never freed", size, addr),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "{}: {} at line {}, column {}",
                self.kind, self.message, self.line, self.column
            )
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// Knobs for a single interpretation
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Report heap blocks that were never freed as [`LeakWarning`]
    /// diagnostics after a successful run.
    ///
    /// [`LeakWarning`]: DiagnosticKind::LeakWarning
    pub strict: bool,
    /// Cancellation flag checked at statement boundaries.
    pub cancel: Option<CancelToken>,
}

/// Result of interpreting a whole program
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// `main`'s return value, or non-zero when a diagnostic aborted the
    /// run
    pub exit_code: i32,
    /// Everything the program printed before finishing or failing
    pub stdout: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Interpret a complete C program: all top-level items are processed,
/// globals are initialised, and `main` is called for the exit code.
pub fn interpret(source: &str, stdin: Option<&str>) -> RunOutcome {
    interpret_with(source, stdin, &Options::default())
}

/// [`interpret`] with explicit [`Options`]
pub fn interpret_with(source: &str, stdin: Option<&str>, options: &Options) -> RunOutcome {
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            return RunOutcome {
                exit_code: 1,
                stdout: String::new(),
                diagnostics: vec![Diagnostic::lex(&err)],
            };
        }
    };

    let program = match Parser::from_tokens(tokens).parse_program() {
        Ok(program) => program,
        Err(err) => {
            return RunOutcome {
                exit_code: 1,
                stdout: String::new(),
                diagnostics: vec![Diagnostic::parse(&err)],
            };
        }
    };

    let mut interp = Interpreter::new(stdin);
    if let Some(token) = &options.cancel {
        interp.set_cancel_token(token.clone());
    }

    let mut diagnostics = Vec::new();
    let exit_code = match interp
        .run_program(&program)
        .and_then(|_| interp.call_main())
    {
        Ok(value) => exit_code_from(&value),
        Err(err) => {
            diagnostics.push(Diagnostic::runtime(&err));
            1
        }
    };

    if options.strict && diagnostics.is_empty() {
        for (addr, size) in interp.heap().leaked_blocks() {
            diagnostics.push(Diagnostic::leak(addr, size));
        }
    }

    RunOutcome {
        exit_code,
        stdout: interp.output().to_string(),
        diagnostics,
    }
}

/// Interpret the program in the given file
pub fn interpret_file<P: AsRef<Path>>(path: P) -> io::Result<RunOutcome> {
    let source = fs::read_to_string(path)?;
    Ok(interpret(&source, None))
}

fn exit_code_from(value: &Value) -> i32 {
    match value {
        Value::Int(n) => *n as i32,
        Value::Char(c) => *c as i32,
        Value::Float(x) => *x as i32,
        _ => 0,
    }
}

/// Result of one REPL step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Output emitted by this fragment (kept even when the fragment
    /// fails)
    pub stdout_delta: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl StepOutcome {
    fn failed(diagnostic: Diagnostic) -> Self {
        StepOutcome {
            stdout_delta: String::new(),
            diagnostics: vec![diagnostic],
        }
    }
}

/// Persistent interactive context. Fragments are parsed permissively
/// (statements and expressions may appear at top level) and executed
/// against shared state; a failing fragment rolls every state change
/// back, keeping only the output it had already emitted.
#[derive(Debug, Clone)]
pub struct ReplContext {
    interp: Interpreter,
}

impl ReplContext {
    pub fn new() -> Self {
        Self::with_stdin(None)
    }

    pub fn with_stdin(stdin: Option<&str>) -> Self {
        ReplContext {
            interp: Interpreter::new(stdin),
        }
    }

    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.interp.set_cancel_token(token);
    }

    /// Parse and execute one source fragment.
    pub fn step(&mut self, fragment: &str) -> StepOutcome {
        let tokens = match Lexer::new(fragment).tokenize() {
            Ok(tokens) => tokens,
            Err(err) => return StepOutcome::failed(Diagnostic::lex(&err)),
        };
        let program = match Parser::from_tokens(tokens).parse_fragment() {
            Ok(program) => program,
            Err(err) => return StepOutcome::failed(Diagnostic::parse(&err)),
        };

        let saved = self.interp.clone();
        let emitted = self.interp.output().len();

        match self.interp.run_program(&program) {
            Ok(()) => StepOutcome {
                stdout_delta: self.interp.output()[emitted..].to_string(),
                diagnostics: Vec::new(),
            },
            Err(err) => {
                let stdout_delta = self.interp.output()[emitted..].to_string();
                // roll the context back, but keep what was printed
                self.interp = saved;
                self.interp.output.push_str(&stdout_delta);
                StepOutcome {
                    stdout_delta,
                    diagnostics: vec![Diagnostic::runtime(&err)],
                }
            }
        }
    }
}

impl Default for ReplContext {
    fn default() -> Self {
        Self::new()
    }
}
