// End-to-end tests driving whole programs through the public API

use civet::interpret;

fn run_ok(source: &str) -> (i32, String) {
    let outcome = interpret(source, None);
    assert!(
        outcome.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        outcome.diagnostics
    );
    (outcome.exit_code, outcome.stdout)
}

#[test]
fn test_hello_world() {
    let (exit, stdout) = run_ok(r#"int main(){ printf("Hello, %s!\n","world"); return 0; }"#);
    assert_eq!(stdout, "Hello, world!\n");
    assert_eq!(exit, 0);
}

#[test]
fn test_recursive_factorial() {
    let (exit, stdout) = run_ok(
        r#"int fact(int n){ if(n<=1) return 1; return n*fact(n-1);} int main(){ printf("%d\n", fact(6)); return 0;}"#,
    );
    assert_eq!(stdout, "720\n");
    assert_eq!(exit, 0);
}

#[test]
fn test_array_sum_of_squares() {
    let (exit, stdout) = run_ok(
        r#"int main(){ int a[5]; for(int i=0;i<5;i++) a[i]=i*i; int s=0; for(int i=0;i<5;i++) s+=a[i]; printf("%d\n",s); return 0;}"#,
    );
    assert_eq!(stdout, "30\n");
    assert_eq!(exit, 0);
}

#[test]
fn test_malloc_strcpy_strlen() {
    let (exit, stdout) = run_ok(
        r#"int main(){ char *p = malloc(12); strcpy(p,"abc"); strcpy(p+3,"def"); printf("%s len=%d\n", p, strlen(p)); free(p); return 0;}"#,
    );
    assert_eq!(stdout, "abcdef len=6\n");
    assert_eq!(exit, 0);
}

#[test]
fn test_exit_code_is_mains_return_value() {
    let outcome = interpret("int main() { return 42; }", None);
    assert_eq!(outcome.exit_code, 42);
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn test_operator_precedence_end_to_end() {
    let (_, stdout) = run_ok(
        r#"int main(){ printf("%d %d %d\n", 2 + 3 * 4, (2 + 3) * 4, 10 - 4 - 3); return 0; }"#,
    );
    assert_eq!(stdout, "14 20 3\n");
}

#[test]
fn test_mutual_recursion_registered_before_execution() {
    // is_even calls is_odd, which is defined later
    let (_, stdout) = run_ok(
        r#"
        int is_even(int n) { if (n == 0) return 1; return is_odd(n - 1); }
        int is_odd(int n) { if (n == 0) return 0; return is_even(n - 1); }
        int main() { printf("%d%d%d\n", is_even(10), is_odd(10), is_even(7)); return 0; }
        "#,
    );
    assert_eq!(stdout, "100\n");
}

#[test]
fn test_fibonacci() {
    let (_, stdout) = run_ok(
        r#"
        int fib(int n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
        int main() {
            for (int i = 0; i < 10; i++) printf("%d ", fib(i));
            printf("\n");
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "0 1 1 2 3 5 8 13 21 34 \n");
}

#[test]
fn test_globals_and_compound_assignment() {
    let (_, stdout) = run_ok(
        r#"
        int total = 0;
        void add(int n) { total += n; }
        int main() {
            add(3); add(4); add(5);
            printf("%d\n", total);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "12\n");
}

#[test]
fn test_while_break_continue() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            int i = 0;
            int sum = 0;
            while (1) {
                i++;
                if (i > 10) break;
                if (i % 2 == 0) continue;
                sum += i;
            }
            printf("%d\n", sum);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "25\n");
}

#[test]
fn test_do_while_runs_at_least_once() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            int n = 0;
            do { printf("x"); n++; } while (n < 0);
            printf("%d\n", n);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "x1\n");
}

#[test]
fn test_two_dimensional_array_with_initializer() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            int grid[3][3] = {{1, 2, 3}, {4, 5, 6}, {7, 8, 9}};
            int trace = 0;
            for (int i = 0; i < 3; i++) trace += grid[i][i];
            printf("%d\n", trace);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "15\n");
}

#[test]
fn test_swap_through_pointers() {
    let (_, stdout) = run_ok(
        r#"
        void swap(int *a, int *b) { int t = *a; *a = *b; *b = t; }
        int main() {
            int x = 1;
            int y = 2;
            swap(&x, &y);
            printf("%d %d\n", x, y);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "2 1\n");
}

#[test]
fn test_array_walk_with_pointer() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            int a[4] = {2, 4, 6, 8};
            int *p = a;
            int sum = 0;
            for (int i = 0; i < 4; i++) sum += *p++;
            printf("%d %d\n", sum, p - a);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "20 4\n");
}

#[test]
fn test_char_arithmetic_and_conversion() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            char c = 'a';
            printf("%c%c %d\n", c, c + 1, 'z' - 'a');
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "ab 25\n");
}

#[test]
fn test_float_arithmetic_and_formatting() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            float r = 2.5;
            float area = 3.14159 * r * r;
            printf("%.2f %.3e %g\n", area, area, 100.0);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "19.63 1.963e+01 100\n");
}

#[test]
fn test_string_literals_are_interned() {
    let (_, stdout) = run_ok(
        r#"int main() { printf("%d\n", "same" == "same"); return 0; }"#,
    );
    assert_eq!(stdout, "1\n");
}

#[test]
fn test_strcpy_strcmp_roundtrip() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            char buf[32];
            strcpy(buf, "round trip");
            printf("%d %d\n", strcmp(buf, "round trip"), strlen(buf));
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "0 10\n");
}

#[test]
fn test_realloc_preserves_bytes() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            char *p = malloc(8);
            strcpy(p, "seven!!");
            char *q = realloc(p, 64);
            strcpy(q + 7, " more");
            printf("%s\n", q);
            free(q);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "seven!! more\n");
}

#[test]
fn test_sizeof_drives_malloc() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            int *xs = (int*)malloc(4 * sizeof(int));
            for (int i = 0; i < 4; i++) xs[i] = i + 1;
            printf("%d\n", xs[0] + xs[1] + xs[2] + xs[3]);
            free(xs);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "10\n");
}

#[test]
fn test_ternary_and_logical_operators() {
    let (_, stdout) = run_ok(
        r#"
        int max(int a, int b) { return a > b ? a : b; }
        int main() {
            printf("%d %d %d\n", max(3, 9), 0 && 5, 2 || 0);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "9 0 1\n");
}

#[test]
fn test_scanf_end_to_end() {
    let outcome = interpret(
        r#"
        int main() {
            int a;
            int b;
            scanf("%d %d", &a, &b);
            printf("%d\n", a * b);
            return 0;
        }
        "#,
        Some("6 7\n"),
    );
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.stdout, "42\n");
}

#[test]
fn test_gets_and_puts_end_to_end() {
    let outcome = interpret(
        r#"
        int main() {
            char line[64];
            gets(line);
            puts(line);
            return 0;
        }
        "#,
        Some("first line\nsecond line\n"),
    );
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.stdout, "first line\n");
}

#[test]
fn test_printf_width_flags_end_to_end() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            printf("[%5d][%-5d][%05d][%+d]\n", 42, 42, 42, 42);
            printf("[%x][%#X][%o][%u]\n", 255, 255, 8, 7);
            printf("[%8.3f][%.1f]\n", 3.14159, 2.55);
            return 0;
        }
        "#,
    );
    assert_eq!(
        stdout,
        "[   42][42   ][00042][+42]\n[ff][0XFF][10][7]\n[   3.142][2.5]\n"
    );
}

#[test]
fn test_multiple_declarators_and_shadowing() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            int a = 1, b = 2, c;
            c = a + b;
            {
                int c = 100;
                printf("%d ", c);
            }
            printf("%d\n", c);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "100 3\n");
}

#[test]
fn test_nested_loops_with_break() {
    let (_, stdout) = run_ok(
        r#"
        int main() {
            int found = 0;
            for (int i = 1; i <= 5 && !found; i++) {
                for (int j = 1; j <= 5; j++) {
                    if (i * j == 12) { found = i * 10 + j; break; }
                }
            }
            printf("%d\n", found);
            return 0;
        }
        "#,
    );
    assert_eq!(stdout, "34\n");
}

#[test]
fn test_void_function_and_empty_statement() {
    let (_, stdout) = run_ok(
        r#"
        void greet(void) { printf("hi\n"); }
        int main() { ; greet(); return 0; }
        "#,
    );
    assert_eq!(stdout, "hi\n");
}

#[test]
fn test_hex_octal_and_char_literals() {
    let (_, stdout) = run_ok(
        r#"int main() { printf("%d %d %d\n", 0x10, 010, '\n'); return 0; }"#,
    );
    assert_eq!(stdout, "16 8 10\n");
}
