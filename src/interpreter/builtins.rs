//! Built-in function implementations
//!
//! Builtins are first-class entries in the function table (see
//! [`Builtin`](super::env::Builtin)); a call site dispatches here after a
//! single lookup. All builtins receive already-evaluated argument values
//! and validate pointer liveness through the memory model, so a bad
//! pointer surfaces as `SegFault` rather than corrupting state.

use super::engine::Interpreter;
use super::env::Builtin;
use super::errors::RuntimeError;
use super::format::format_printf;
use crate::memory::heap::{AllocKind, Heap};
use crate::memory::value::{Address, Value};
use crate::parser::ast::{CType, SourceLocation};

/// Read the null-terminated byte string starting at `addr`. The scan is
/// bounded by the enclosing allocation, so a missing terminator is a
/// `SegFault` rather than an endless walk.
pub(crate) fn read_c_string(
    heap: &Heap,
    addr: Address,
    location: SourceLocation,
) -> Result<String, RuntimeError> {
    let mut out = String::new();
    let mut cur = addr;
    loop {
        let byte = heap
            .read_byte(cur)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        if byte == 0 {
            return Ok(out);
        }
        out.push(byte as char);
        cur += 1;
    }
}

impl Interpreter {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match builtin {
            Builtin::Printf => self.builtin_printf(args, location),
            Builtin::Puts => self.builtin_puts(args, location),
            Builtin::Scanf => self.builtin_scanf(args, location),
            Builtin::Gets => self.builtin_gets(args, location),
            Builtin::Strlen => self.builtin_strlen(args, location),
            Builtin::Strcpy => self.builtin_strcpy(args, location),
            Builtin::Strcmp => self.builtin_strcmp(args, location),
            Builtin::Malloc => self.builtin_malloc(args, location),
            Builtin::Free => self.builtin_free(args, location),
            Builtin::Realloc => self.builtin_realloc(args, location),
        }
    }

    fn builtin_printf(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if args.is_empty() {
            return Err(RuntimeError::ArityMismatch {
                name: "printf".to_string(),
                expected: 1,
                got: 0,
                location,
            });
        }

        let fmt_addr = pointer_arg("printf", &args[0], location)?;
        let fmt = read_c_string(&self.heap, fmt_addr, location)?;

        let heap = &self.heap;
        let text = format_printf(&fmt, &args[1..], location, |addr| {
            read_c_string(heap, addr, location)
        })?;

        let written = text.chars().count() as i64;
        self.output.push_str(&text);
        Ok(Value::Int(written))
    }

    fn builtin_puts(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("puts", 1, &args, location)?;
        let addr = pointer_arg("puts", &args[0], location)?;
        let text = read_c_string(&self.heap, addr, location)?;
        self.output.push_str(&text);
        self.output.push('\n');
        Ok(Value::Int(0))
    }

    /// `scanf` with the conversions `%d %f %c %s`, reading from the stdin
    /// text injected into the context. Returns the number of conversions
    /// stored, or -1 when input is exhausted before the first one.
    fn builtin_scanf(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if args.is_empty() {
            return Err(RuntimeError::ArityMismatch {
                name: "scanf".to_string(),
                expected: 1,
                got: 0,
                location,
            });
        }

        let fmt_addr = pointer_arg("scanf", &args[0], location)?;
        let fmt = read_c_string(&self.heap, fmt_addr, location)?;

        let mut stored = 0i64;
        let mut arg_index = 1;
        let mut chars = fmt.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '%' {
                continue;
            }
            let Some(conv) = chars.next() else { break };
            if conv == '%' {
                continue;
            }

            let target = match args.get(arg_index) {
                Some(value) => pointer_arg("scanf", value, location)?,
                None => {
                    return Err(RuntimeError::ArityMismatch {
                        name: "scanf".to_string(),
                        expected: arg_index + 1,
                        got: args.len(),
                        location,
                    });
                }
            };
            arg_index += 1;

            let converted = match conv {
                'd' => match self.stdin.next_token().and_then(|t| t.parse::<i64>().ok()) {
                    Some(n) => {
                        self.heap
                            .store(target, &CType::Int, &Value::Int(n))
                            .map_err(|e| RuntimeError::from_memory(e, location))?;
                        true
                    }
                    None => false,
                },
                'f' => match self.stdin.next_token().and_then(|t| t.parse::<f64>().ok()) {
                    Some(x) => {
                        self.heap
                            .store(target, &CType::Float, &Value::Float(x))
                            .map_err(|e| RuntimeError::from_memory(e, location))?;
                        true
                    }
                    None => false,
                },
                'c' => match self.stdin.next_byte() {
                    Some(b) => {
                        self.heap
                            .write_byte(target, b)
                            .map_err(|e| RuntimeError::from_memory(e, location))?;
                        true
                    }
                    None => false,
                },
                's' => match self.stdin.next_token() {
                    Some(token) => {
                        self.write_c_string(target, &token, location)?;
                        true
                    }
                    None => false,
                },
                other => {
                    return Err(RuntimeError::TypeMismatch {
                        message: format!("scanf: unsupported conversion '%{}'", other),
                        location,
                    });
                }
            };

            if !converted {
                break;
            }
            stored += 1;
        }

        if stored == 0 && self.stdin.at_end() {
            return Ok(Value::Int(-1));
        }
        Ok(Value::Int(stored))
    }

    fn builtin_gets(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("gets", 1, &args, location)?;
        let buf = args[0].clone();
        let addr = pointer_arg("gets", &buf, location)?;

        match self.stdin.next_line() {
            Some(line) => {
                self.write_c_string(addr, &line, location)?;
                Ok(buf)
            }
            None => Ok(Value::null()),
        }
    }

    fn builtin_strlen(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("strlen", 1, &args, location)?;
        let addr = pointer_arg("strlen", &args[0], location)?;

        let mut len = 0i64;
        let mut cur = addr;
        loop {
            let byte = self
                .heap
                .read_byte(cur)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
            if byte == 0 {
                return Ok(Value::Int(len));
            }
            len += 1;
            cur += 1;
        }
    }

    /// Copy bytes including the terminating null; no overlap check.
    fn builtin_strcpy(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("strcpy", 2, &args, location)?;
        let dst_value = args[0].clone();
        let dst = pointer_arg("strcpy", &dst_value, location)?;
        let src = pointer_arg("strcpy", &args[1], location)?;

        let mut offset = 0u64;
        loop {
            let byte = self
                .heap
                .read_byte(src + offset)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
            self.heap
                .write_byte(dst + offset, byte)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
            if byte == 0 {
                return Ok(dst_value);
            }
            offset += 1;
        }
    }

    fn builtin_strcmp(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("strcmp", 2, &args, location)?;
        let a = pointer_arg("strcmp", &args[0], location)?;
        let b = pointer_arg("strcmp", &args[1], location)?;

        let mut offset = 0u64;
        loop {
            let x = self
                .heap
                .read_byte(a + offset)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
            let y = self
                .heap
                .read_byte(b + offset)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
            if x != y {
                return Ok(Value::Int(x as i64 - y as i64));
            }
            if x == 0 {
                return Ok(Value::Int(0));
            }
            offset += 1;
        }
    }

    fn builtin_malloc(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("malloc", 1, &args, location)?;
        let size = size_arg("malloc", &args[0], location)?;

        let addr = self
            .heap
            .allocate(size, AllocKind::Heap)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        Ok(Value::Pointer {
            addr,
            pointee: CType::Char,
        })
    }

    fn builtin_free(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("free", 1, &args, location)?;

        // free(NULL) is a no-op
        if args[0].is_null_pointer() {
            return Ok(Value::Void);
        }
        let addr = pointer_arg("free", &args[0], location)?;
        self.heap
            .free(addr)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        Ok(Value::Void)
    }

    fn builtin_realloc(
        &mut self,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        expect_arity("realloc", 2, &args, location)?;
        let addr = match &args[0] {
            value if value.is_null_pointer() => 0,
            value => pointer_arg("realloc", value, location)?,
        };
        let size = size_arg("realloc", &args[1], location)?;

        let new_addr = self
            .heap
            .reallocate(addr, size)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        Ok(Value::Pointer {
            addr: new_addr,
            pointee: CType::Char,
        })
    }

    fn write_c_string(
        &mut self,
        addr: Address,
        text: &str,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        for (i, ch) in text.chars().enumerate() {
            self.heap
                .write_byte(addr + i as u64, ch as u8)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
        }
        self.heap
            .write_byte(addr + text.chars().count() as u64, 0)
            .map_err(|e| RuntimeError::from_memory(e, location))
    }
}

fn expect_arity(
    name: &str,
    expected: usize,
    args: &[Value],
    location: SourceLocation,
) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected,
            got: args.len(),
            location,
        });
    }
    Ok(())
}

/// Extract a non-null pointer argument
fn pointer_arg(
    name: &str,
    value: &Value,
    location: SourceLocation,
) -> Result<Address, RuntimeError> {
    match value {
        Value::Pointer { addr: 0, .. } => Err(RuntimeError::NullDereference { location }),
        Value::Pointer { addr, .. } => Ok(*addr),
        other => Err(RuntimeError::TypeMismatch {
            message: format!(
                "{}: expected a pointer argument, got {}",
                name,
                other.type_name()
            ),
            location,
        }),
    }
}

/// Extract a non-negative size argument
fn size_arg(name: &str, value: &Value, location: SourceLocation) -> Result<usize, RuntimeError> {
    match value.as_int() {
        Some(n) if n >= 0 => Ok(n as usize),
        Some(n) => Err(RuntimeError::TypeMismatch {
            message: format!("{}: size must be non-negative, got {}", name, n),
            location,
        }),
        None => Err(RuntimeError::TypeMismatch {
            message: format!(
                "{}: expected an integer size, got {}",
                name,
                value.type_name()
            ),
            location,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parser::Parser;

    fn run_main_with_stdin(source: &str, stdin: &str) -> (Value, String) {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(Some(stdin));
        interp.run_program(&program).unwrap();
        let value = interp.call_main().unwrap();
        let output = interp.output().to_string();
        (value, output)
    }

    fn run_main(source: &str) -> (Value, String) {
        run_main_with_stdin(source, "")
    }

    #[test]
    fn test_printf_returns_chars_written() {
        let (value, output) = run_main(
            r#"int main() { int n = printf("ab%d", 42); return n; }"#,
        );
        assert_eq!(output, "ab42");
        assert_eq!(value, Value::Int(4));
    }

    #[test]
    fn test_puts_appends_newline() {
        let (_, output) = run_main(r#"int main() { puts("hi"); return 0; }"#);
        assert_eq!(output, "hi\n");
    }

    #[test]
    fn test_strlen_and_strcmp() {
        let (value, _) = run_main(r#"int main() { return strlen("hello"); }"#);
        assert_eq!(value, Value::Int(5));

        let (value, _) = run_main(r#"int main() { return strcmp("abc", "abc"); }"#);
        assert_eq!(value, Value::Int(0));

        let (value, _) = run_main(r#"int main() { return strcmp("abd", "abc"); }"#);
        assert_eq!(value, Value::Int(1));

        let (value, _) = run_main(r#"int main() { return strcmp("ab", "abc"); }"#);
        assert_eq!(value, Value::Int(-(b'c' as i64)));
    }

    #[test]
    fn test_malloc_free_roundtrip() {
        let (value, _) = run_main(
            "int main() { char *p = malloc(4); *p = 7; int v = *p; free(p); return v; }",
        );
        assert_eq!(value, Value::Int(7));
    }

    #[test]
    fn test_free_null_is_noop() {
        let (value, _) = run_main("int main() { char *p = 0; free(p); return 0; }");
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn test_double_free_detected() {
        let source = "int main() { char *p = malloc(4); free(p); free(p); return 0; }";
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(None);
        interp.run_program(&program).unwrap();
        let err = interp.call_main().unwrap_err();
        assert!(matches!(err, RuntimeError::DoubleFree { .. }));
    }

    #[test]
    fn test_free_interior_pointer_is_invalid() {
        let source = "int main() { char *p = malloc(4); free(p + 1); return 0; }";
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(None);
        interp.run_program(&program).unwrap();
        let err = interp.call_main().unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidFree { .. }));
    }

    #[test]
    fn test_use_after_free_is_segfault() {
        let source = "int main() { char *p = malloc(4); free(p); return *p; }";
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(None);
        interp.run_program(&program).unwrap();
        let err = interp.call_main().unwrap_err();
        assert!(matches!(err, RuntimeError::SegFault { .. }));
    }

    #[test]
    fn test_realloc_preserves_contents() {
        let (value, _) = run_main(
            r#"int main() {
                char *p = malloc(4);
                strcpy(p, "abc");
                char *q = realloc(p, 16);
                return strcmp(q, "abc");
            }"#,
        );
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn test_scanf_reads_tokens() {
        let (value, output) = run_main_with_stdin(
            r#"int main() {
                int a;
                int b;
                int n = scanf("%d %d", &a, &b);
                printf("%d %d %d\n", n, a, b);
                return 0;
            }"#,
            "12 30\n",
        );
        assert_eq!(output, "2 12 30\n");
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn test_scanf_string_and_char() {
        let (_, output) = run_main_with_stdin(
            r#"int main() {
                char word[16];
                char c;
                scanf("%s", word);
                scanf("%c", &c);
                printf("[%s][%c]", word, c);
                return 0;
            }"#,
            "hey there",
        );
        // %c reads the very next byte, the separating space
        assert_eq!(output, "[hey][ ]");
    }

    #[test]
    fn test_scanf_eof_returns_minus_one() {
        let (_, output) = run_main_with_stdin(
            r#"int main() { int x; printf("%d", scanf("%d", &x)); return 0; }"#,
            "",
        );
        assert_eq!(output, "-1");
    }

    #[test]
    fn test_gets_reads_line() {
        let (_, output) = run_main_with_stdin(
            r#"int main() { char buf[32]; gets(buf); puts(buf); return 0; }"#,
            "a line with spaces\nrest",
        );
        assert_eq!(output, "a line with spaces\n");
    }

    #[test]
    fn test_strcpy_overflow_is_segfault() {
        let source = r#"int main() { char *p = malloc(2); strcpy(p, "toolong"); return 0; }"#;
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(None);
        interp.run_program(&program).unwrap();
        let err = interp.call_main().unwrap_err();
        assert!(matches!(err, RuntimeError::SegFault { .. }));
    }

    #[test]
    fn test_malloc_zero_is_unique_and_not_dereferenceable() {
        let (value, _) = run_main(
            "int main() { char *a = malloc(0); char *b = malloc(0); return a != b && a != 0; }",
        );
        assert_eq!(value, Value::Int(1));

        let source = "int main() { char *p = malloc(0); return *p; }";
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(None);
        interp.run_program(&program).unwrap();
        let err = interp.call_main().unwrap_err();
        assert!(matches!(err, RuntimeError::SegFault { .. }));
    }
}
