//! `printf`-style formatter
//!
//! Re-implemented from scratch rather than delegating to the host's
//! formatter so the output is stable across platforms. Supports the
//! conversions `%d %i %u %o %x %X %c %s %f %e %g %%`, the flags
//! `- + space 0 #`, width and precision fields (including `*`), and the
//! length modifier `l` (ignored: all integers are 64-bit internally).

use super::errors::RuntimeError;
use crate::memory::value::{Address, Value};
use crate::parser::ast::SourceLocation;

#[derive(Debug, Default)]
struct Spec {
    minus: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Render `fmt` with `args`. `read_str` resolves a `%s` pointer to the
/// null-terminated string it points at.
pub fn format_printf<F>(
    fmt: &str,
    args: &[Value],
    location: SourceLocation,
    mut read_str: F,
) -> Result<String, RuntimeError>
where
    F: FnMut(Address) -> Result<String, RuntimeError>,
{
    let chars: Vec<char> = fmt.chars().collect();
    let mut output = String::new();
    let mut pos = 0;
    let mut arg_index = 0;

    fn next_arg<'a>(
        args: &'a [Value],
        index: &mut usize,
        location: SourceLocation,
    ) -> Result<&'a Value, RuntimeError> {
        let arg = args.get(*index).ok_or_else(|| RuntimeError::TypeMismatch {
            message: "printf: not enough arguments for format string".to_string(),
            location,
        })?;
        *index += 1;
        Ok(arg)
    }

    while pos < chars.len() {
        let ch = chars[pos];
        pos += 1;

        if ch != '%' {
            output.push(ch);
            continue;
        }

        let mut spec = Spec::default();

        // flags
        loop {
            match chars.get(pos) {
                Some('-') => spec.minus = true,
                Some('+') => spec.plus = true,
                Some(' ') => spec.space = true,
                Some('0') => spec.zero = true,
                Some('#') => spec.alt = true,
                _ => break,
            }
            pos += 1;
        }

        // width
        if chars.get(pos) == Some(&'*') {
            pos += 1;
            let w = int_arg(next_arg(args, &mut arg_index, location)?, 'd', location)?;
            if w < 0 {
                // a negative '*' width means left-justify
                spec.minus = true;
                spec.width = Some(w.unsigned_abs() as usize);
            } else {
                spec.width = Some(w as usize);
            }
        } else {
            let mut width = None;
            while let Some(d) = chars.get(pos).and_then(|c| c.to_digit(10)) {
                width = Some(width.unwrap_or(0) * 10 + d as usize);
                pos += 1;
            }
            spec.width = width;
        }

        // precision
        if chars.get(pos) == Some(&'.') {
            pos += 1;
            if chars.get(pos) == Some(&'*') {
                pos += 1;
                let p = int_arg(next_arg(args, &mut arg_index, location)?, 'd', location)?;
                // a negative '*' precision means no precision at all
                spec.precision = if p < 0 { None } else { Some(p as usize) };
            } else {
                let mut precision = 0;
                while let Some(d) = chars.get(pos).and_then(|c| c.to_digit(10)) {
                    precision = precision * 10 + d as usize;
                    pos += 1;
                }
                spec.precision = Some(precision);
            }
        }

        // length modifier, ignored
        while chars.get(pos) == Some(&'l') {
            pos += 1;
        }

        let conv = *chars.get(pos).ok_or_else(|| RuntimeError::TypeMismatch {
            message: "printf: format string ends inside a conversion".to_string(),
            location,
        })?;
        pos += 1;

        match conv {
            '%' => output.push('%'),
            'd' | 'i' => {
                let n = int_arg(next_arg(args, &mut arg_index, location)?, conv, location)?;
                let (sign, digits) = signed_decimal(&spec, n);
                let zero_pad = spec.precision.is_none();
                push_padded(&mut output, &spec, sign, "", &with_precision(&spec, digits), zero_pad);
            }
            'u' => {
                let n = int_arg(next_arg(args, &mut arg_index, location)?, conv, location)? as u64;
                let zero_pad = spec.precision.is_none();
                push_padded(&mut output, &spec, "", "", &with_precision(&spec, n.to_string()), zero_pad);
            }
            'o' => {
                let n = int_arg(next_arg(args, &mut arg_index, location)?, conv, location)? as u64;
                let prefix = if spec.alt && n != 0 { "0" } else { "" };
                push_padded(
                    &mut output,
                    &spec,
                    "",
                    prefix,
                    &with_precision(&spec, format!("{:o}", n)),
                    spec.precision.is_none(),
                );
            }
            'x' | 'X' => {
                let n = int_arg(next_arg(args, &mut arg_index, location)?, conv, location)? as u64;
                let digits = if conv == 'x' {
                    format!("{:x}", n)
                } else {
                    format!("{:X}", n)
                };
                let prefix = match (spec.alt, n != 0, conv) {
                    (true, true, 'x') => "0x",
                    (true, true, 'X') => "0X",
                    _ => "",
                };
                push_padded(
                    &mut output,
                    &spec,
                    "",
                    prefix,
                    &with_precision(&spec, digits),
                    spec.precision.is_none(),
                );
            }
            'c' => {
                let n = int_arg(next_arg(args, &mut arg_index, location)?, conv, location)?;
                push_padded(&mut output, &spec, "", "", &((n as u8) as char).to_string(), false);
            }
            's' => {
                let arg = next_arg(args, &mut arg_index, location)?;
                let mut s = match arg {
                    Value::Pointer { addr, .. } if *addr != 0 => read_str(*addr)?,
                    Value::Pointer { .. } => {
                        return Err(RuntimeError::NullDereference { location });
                    }
                    other => {
                        return Err(RuntimeError::TypeMismatch {
                            message: format!(
                                "printf: '%s' expects a pointer argument, got {}",
                                other.type_name()
                            ),
                            location,
                        });
                    }
                };
                if let Some(p) = spec.precision {
                    s.truncate(p);
                }
                push_padded(&mut output, &spec, "", "", &s, false);
            }
            'f' => {
                let x = float_arg(next_arg(args, &mut arg_index, location)?, conv, location)?;
                let precision = spec.precision.unwrap_or(6);
                let (sign, body) = float_sign(&spec, x);
                push_padded(
                    &mut output,
                    &spec,
                    sign,
                    "",
                    &format!("{:.*}", precision, body),
                    true,
                );
            }
            'e' => {
                let x = float_arg(next_arg(args, &mut arg_index, location)?, conv, location)?;
                let precision = spec.precision.unwrap_or(6);
                let (sign, body) = float_sign(&spec, x);
                push_padded(&mut output, &spec, sign, "", &exponential(body, precision), true);
            }
            'g' => {
                let x = float_arg(next_arg(args, &mut arg_index, location)?, conv, location)?;
                let precision = spec.precision.unwrap_or(6).max(1);
                let (sign, body) = float_sign(&spec, x);
                push_padded(&mut output, &spec, sign, "", &general(body, precision), true);
            }
            other => {
                return Err(RuntimeError::TypeMismatch {
                    message: format!("printf: unsupported conversion '%{}'", other),
                    location,
                });
            }
        }
    }

    Ok(output)
}

/// Integer conversions take `int` or `char` arguments; a float here is a
/// type error rather than a silent coercion.
fn int_arg(value: &Value, conv: char, location: SourceLocation) -> Result<i64, RuntimeError> {
    value.as_int().ok_or_else(|| RuntimeError::TypeMismatch {
        message: format!(
            "printf: '%{}' expects an integer argument, got {}",
            conv,
            value.type_name()
        ),
        location,
    })
}

/// Float conversions silently widen integer arguments.
fn float_arg(value: &Value, conv: char, location: SourceLocation) -> Result<f64, RuntimeError> {
    value.as_float().ok_or_else(|| RuntimeError::TypeMismatch {
        message: format!(
            "printf: '%{}' expects a numeric argument, got {}",
            conv,
            value.type_name()
        ),
        location,
    })
}

fn signed_decimal(spec: &Spec, n: i64) -> (&'static str, String) {
    let digits = (n as i128).unsigned_abs().to_string();
    let sign = if n < 0 {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    (sign, digits)
}

fn float_sign(spec: &Spec, x: f64) -> (&'static str, f64) {
    if x.is_sign_negative() {
        ("-", -x)
    } else if spec.plus {
        ("+", x)
    } else if spec.space {
        (" ", x)
    } else {
        ("", x)
    }
}

/// Apply an integer precision: minimum digit count, zero-padded.
fn with_precision(spec: &Spec, digits: String) -> String {
    match spec.precision {
        Some(0) if digits == "0" => String::new(),
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

/// Pad to the field width. `zero_pad_ok` marks numeric conversions where
/// the `0` flag pads between the sign and the digits; integer call sites
/// clear it when an explicit precision is present, per C.
fn push_padded(
    output: &mut String,
    spec: &Spec,
    sign: &str,
    prefix: &str,
    body: &str,
    zero_pad_ok: bool,
) {
    let content = sign.len() + prefix.len() + body.chars().count();
    let fill = spec.width.map_or(0, |w| w.saturating_sub(content));

    if fill == 0 {
        output.push_str(sign);
        output.push_str(prefix);
        output.push_str(body);
    } else if spec.minus {
        output.push_str(sign);
        output.push_str(prefix);
        output.push_str(body);
        output.push_str(&" ".repeat(fill));
    } else if spec.zero && zero_pad_ok {
        output.push_str(sign);
        output.push_str(prefix);
        output.push_str(&"0".repeat(fill));
        output.push_str(body);
    } else {
        output.push_str(&" ".repeat(fill));
        output.push_str(sign);
        output.push_str(prefix);
        output.push_str(body);
    }
}

/// C-style `%e`: one leading digit, `precision` fractional digits, and an
/// exponent of at least two digits with an explicit sign.
fn exponential(x: f64, precision: usize) -> String {
    let sci = format!("{:.*e}", precision, x);
    let (mantissa, exp) = sci.split_once('e').expect("float e-format has an exponent");
    let exp: i32 = exp.parse().expect("float exponent is an integer");
    let exp_sign = if exp < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, exp_sign, exp.unsigned_abs())
}

/// C-style `%g`: `%e` or `%f` depending on the exponent, with trailing
/// zeros removed.
fn general(x: f64, precision: usize) -> String {
    let sci = format!("{:.*e}", precision - 1, x);
    let (mantissa, exp) = sci.split_once('e').expect("float e-format has an exponent");
    let exp: i32 = exp.parse().expect("float exponent is an integer");

    if exp < -4 || exp >= precision as i32 {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(mantissa), exp_sign, exp.unsigned_abs())
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, x))
    }
}

fn strip_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}
