//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! parser. The stream is fully materialised and terminated by a single
//! [`TokenKind::Eof`] token. Whitespace and `//` / `/* */` comments are
//! skipped.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    CharLiteral(u8),
    StringLiteral(String),

    // Identifiers
    Ident(String),

    // Keywords
    Int,
    Float,
    Char,
    Void,
    If,
    Else,
    For,
    While,
    Do,
    Return,
    Break,
    Continue,
    Sizeof,

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Logical
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    Shl,   // <<
    Shr,   // >>

    // Assignment
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=

    // Increment/Decrement
    PlusPlus,   // ++
    MinusMinus, // --

    // Member access (recognised but rejected by the parser: no structs)
    Arrow, // ->

    // Ternary
    Question, // ?
    Colon,    // :

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,

    // End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLiteral(n) => write!(f, "integer literal {}", n),
            TokenKind::FloatLiteral(x) => write!(f, "float literal {}", x),
            TokenKind::CharLiteral(c) => {
                if c.is_ascii_graphic() || *c == b' ' {
                    write!(f, "char literal '{}'", *c as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", c)
                }
            }
            TokenKind::StringLiteral(s) => write!(f, "string literal \"{}\"", s),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Int => write!(f, "'int'"),
            TokenKind::Float => write!(f, "'float'"),
            TokenKind::Char => write!(f, "'char'"),
            TokenKind::Void => write!(f, "'void'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::While => write!(f, "'while'"),
            TokenKind::Do => write!(f, "'do'"),
            TokenKind::Return => write!(f, "'return'"),
            TokenKind::Break => write!(f, "'break'"),
            TokenKind::Continue => write!(f, "'continue'"),
            TokenKind::Sizeof => write!(f, "'sizeof'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Amp => write!(f, "'&'"),
            TokenKind::Pipe => write!(f, "'|'"),
            TokenKind::Caret => write!(f, "'^'"),
            TokenKind::Tilde => write!(f, "'~'"),
            TokenKind::Shl => write!(f, "'<<'"),
            TokenKind::Shr => write!(f, "'>>'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::PlusEq => write!(f, "'+='"),
            TokenKind::MinusEq => write!(f, "'-='"),
            TokenKind::StarEq => write!(f, "'*='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::PercentEq => write!(f, "'%='"),
            TokenKind::PlusPlus => write!(f, "'++'"),
            TokenKind::MinusMinus => write!(f, "'--'"),
            TokenKind::Arrow => write!(f, "'->'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token together with the position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLocation,
}

impl Token {
    fn new(kind: TokenKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("{message} at {location}")]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "unexpected end of input".to_string(),
            location: loc,
        })?;

        let kind = match ch {
            '"' => return self.string_literal(loc),
            '\'' => return self.char_literal(loc),
            '0'..='9' => return self.number_literal(ch, loc),
            'a'..='z' | 'A'..='Z' | '_' => return Ok(self.identifier_or_keyword(ch, loc)),

            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::Le
                } else if self.eat('<') {
                    TokenKind::Shl
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Ge
                } else if self.eat('>') {
                    TokenKind::Shr
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::OrOr
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            _ => {
                return Err(LexError {
                    message: format!("unexpected character: '{}'", ch),
                    location: loc,
                });
            }
        };

        Ok(Token::new(kind, loc))
    }

    /// Parse string literal (opening quote already consumed)
    fn string_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            if ch == '"' {
                self.advance();
                return Ok(Token::new(TokenKind::StringLiteral(string), loc));
            }

            if ch == '\n' {
                break;
            }

            if ch == '\\' {
                self.advance();
                let escaped = self.advance().ok_or_else(|| LexError {
                    message: "unexpected end of input in string literal".to_string(),
                    location: self.current_location(),
                })?;
                string.push(self.unescape(escaped)?);
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(LexError {
            message: "unterminated string literal".to_string(),
            location: loc,
        })
    }

    /// Parse character literal (opening quote already consumed)
    fn char_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let ch = self.advance().ok_or_else(|| LexError {
            message: "unexpected end of input in character literal".to_string(),
            location: self.current_location(),
        })?;

        let value = if ch == '\\' {
            let escaped = self.advance().ok_or_else(|| LexError {
                message: "unexpected end of input in character literal".to_string(),
                location: self.current_location(),
            })?;
            self.unescape(escaped)? as u8
        } else {
            ch as u8
        };

        if self.advance() != Some('\'') {
            return Err(LexError {
                message: "expected closing quote in character literal".to_string(),
                location: self.current_location(),
            });
        }

        Ok(Token::new(TokenKind::CharLiteral(value), loc))
    }

    fn unescape(&self, escaped: char) -> Result<char, LexError> {
        match escaped {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '\\' => Ok('\\'),
            '\'' => Ok('\''),
            '"' => Ok('"'),
            '0' => Ok('\0'),
            _ => Err(LexError {
                message: format!("unknown escape sequence: \\{}", escaped),
                location: self.current_location(),
            }),
        }
    }

    /// Parse a numeric literal: decimal, `0x` hex or `0` octal integers,
    /// or a float with `.` and/or an exponent.
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<Token, LexError> {
        // Hex literals
        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            let mut digits = String::new();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_hexdigit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(LexError {
                    message: "hex literal has no digits".to_string(),
                    location: loc,
                });
            }
            let value = i64::from_str_radix(&digits, 16).map_err(|_| LexError {
                message: format!("integer literal out of range: 0x{}", digits),
                location: loc,
            })?;
            return Ok(Token::new(TokenKind::IntLiteral(value), loc));
        }

        let mut digits = String::new();
        digits.push(first);
        let mut is_float = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Fractional part
        if self.peek() == Some('.') {
            is_float = true;
            digits.push('.');
            self.advance();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // Exponent
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(self.peek_ahead(1), Some('+') | Some('-')) {
                lookahead = 2;
            }
            if self.peek_ahead(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                digits.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    digits.push(sign);
                    self.advance();
                }
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        digits.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            let value = digits.parse::<f64>().map_err(|_| LexError {
                message: format!("invalid float literal: {}", digits),
                location: loc,
            })?;
            return Ok(Token::new(TokenKind::FloatLiteral(value), loc));
        }

        // A leading zero makes the literal octal
        let value = if first == '0' && digits.len() > 1 {
            i64::from_str_radix(&digits[1..], 8).map_err(|_| LexError {
                message: format!("invalid octal literal: {}", digits),
                location: loc,
            })?
        } else {
            digits.parse::<i64>().map_err(|_| LexError {
                message: format!("integer literal out of range: {}", digits),
                location: loc,
            })?
        };

        Ok(Token::new(TokenKind::IntLiteral(value), loc))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match ident.as_str() {
            "int" => TokenKind::Int,
            "float" => TokenKind::Float,
            "char" => TokenKind::Char,
            "void" => TokenKind::Void,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "sizeof" => TokenKind::Sizeof,
            _ => TokenKind::Ident(ident),
        };

        Token::new(kind, loc)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Consume the current character if it matches
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("int main() { return 0; }");

        assert_eq!(tokens[0], TokenKind::Int);
        assert_eq!(tokens[1], TokenKind::Ident("main".to_string()));
        assert_eq!(tokens[2], TokenKind::LParen);
        assert_eq!(tokens[3], TokenKind::RParen);
        assert_eq!(tokens[4], TokenKind::LBrace);
        assert_eq!(tokens[5], TokenKind::Return);
        assert_eq!(tokens[6], TokenKind::IntLiteral(0));
        assert_eq!(tokens[7], TokenKind::Semicolon);
        assert_eq!(tokens[8], TokenKind::RBrace);
        assert_eq!(tokens[9], TokenKind::Eof);
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("++ -- += -= == != && || << >> -> %=");

        assert_eq!(
            tokens[..12],
            [
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::Arrow,
                TokenKind::PercentEq,
            ]
        );
    }

    #[test]
    fn test_integer_bases() {
        assert_eq!(kinds("255")[0], TokenKind::IntLiteral(255));
        assert_eq!(kinds("0xff")[0], TokenKind::IntLiteral(255));
        assert_eq!(kinds("0x1F")[0], TokenKind::IntLiteral(31));
        assert_eq!(kinds("0777")[0], TokenKind::IntLiteral(511));
        assert_eq!(kinds("0")[0], TokenKind::IntLiteral(0));
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(kinds("1.5")[0], TokenKind::FloatLiteral(1.5));
        assert_eq!(kinds("2.")[0], TokenKind::FloatLiteral(2.0));
        assert_eq!(kinds("1e3")[0], TokenKind::FloatLiteral(1000.0));
        assert_eq!(kinds("2.5e-1")[0], TokenKind::FloatLiteral(0.25));
        // '3e' with no exponent digits is an int followed by an identifier
        let tokens = kinds("3e");
        assert_eq!(tokens[0], TokenKind::IntLiteral(3));
        assert_eq!(tokens[1], TokenKind::Ident("e".to_string()));
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(kinds("'a'")[0], TokenKind::CharLiteral(b'a'));
        assert_eq!(kinds(r"'\n'")[0], TokenKind::CharLiteral(b'\n'));
        assert_eq!(kinds(r"'\0'")[0], TokenKind::CharLiteral(0));
    }

    #[test]
    fn test_string_literal() {
        let tokens = kinds(r#""hello\nworld""#);
        assert_eq!(
            tokens[0],
            TokenKind::StringLiteral("hello\nworld".to_string())
        );
    }

    #[test]
    fn test_comments() {
        let tokens = kinds("int x; // comment\nint y; /* block\ncomment */ int z;");

        assert_eq!(tokens[0], TokenKind::Int);
        assert_eq!(tokens[1], TokenKind::Ident("x".to_string()));
        assert_eq!(tokens[2], TokenKind::Semicolon);
        assert_eq!(tokens[3], TokenKind::Int);
        assert_eq!(tokens[4], TokenKind::Ident("y".to_string()));
        assert_eq!(tokens[5], TokenKind::Semicolon);
        assert_eq!(tokens[6], TokenKind::Int);
        assert_eq!(tokens[7], TokenKind::Ident("z".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = Lexer::new("/* abc").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated block comment"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("int x = $;").tokenize().unwrap_err();
        assert!(err.message.contains("unexpected character"));
        assert_eq!(err.location.line, 1);
    }

    #[test]
    fn test_locations() {
        let tokens = Lexer::new("int\n  x;").tokenize().unwrap();
        assert_eq!(tokens[0].loc, SourceLocation::new(1, 1));
        assert_eq!(tokens[1].loc, SourceLocation::new(2, 3));
    }
}
