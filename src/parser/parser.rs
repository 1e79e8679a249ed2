//! Recursive descent parser for the C subset
//!
//! Precedence climbing for binary operators, one parse function per
//! precedence level. The parser is non-recovering: the first error aborts
//! parsing and is surfaced verbatim.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("{message} at {location}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the C subset
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Tokenize and wrap the given source.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self::from_tokens(tokens))
    }

    /// Wrap an already-lexed token stream.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse a whole program: function definitions and global declarations.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        while !self.is_at_end() {
            if !self.is_type_keyword() {
                return Err(self.error_here(format!(
                    "expected type specifier at top level, found {}",
                    self.peek_kind()
                )));
            }
            if self.is_function_ahead() {
                program.items.push(Item::Function(self.parse_function()?));
            } else {
                program.items.push(Item::Globals(self.parse_declaration()?));
            }
        }

        Ok(program)
    }

    /// Parse a REPL fragment: function definitions, declarations,
    /// statements and bare expressions may all appear at top level. A
    /// trailing expression may omit its semicolon.
    pub fn parse_fragment(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        while !self.is_at_end() {
            if self.is_type_keyword() && self.is_function_ahead() {
                program.items.push(Item::Function(self.parse_function()?));
            } else if self.starts_statement() {
                program.items.push(Item::Statement(self.parse_statement()?));
            } else {
                let expr = self.parse_expression()?;
                if !self.eat(&TokenKind::Semicolon) && !self.is_at_end() {
                    return Err(self.error_here(format!(
                        "expected ';' after expression, found {}",
                        self.peek_kind()
                    )));
                }
                program.items.push(Item::Statement(Stmt::Expression(expr)));
            }
        }

        Ok(program)
    }

    /// Whether the upcoming tokens begin a function definition:
    /// type-specifier `*`* identifier `(`.
    fn is_function_ahead(&self) -> bool {
        let mut offset = 1;
        while matches!(
            self.peek_kind_ahead(offset),
            Some(TokenKind::Star)
        ) {
            offset += 1;
        }
        matches!(self.peek_kind_ahead(offset), Some(TokenKind::Ident(_)))
            && matches!(self.peek_kind_ahead(offset + 1), Some(TokenKind::LParen))
    }

    /// Whether the current token can begin a statement other than a bare
    /// expression (used by fragment mode).
    fn starts_statement(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Char
                | TokenKind::Void
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::LBrace
                | TokenKind::Semicolon
        )
    }

    /// Parse function definition: type `*`? name(params) { body }
    fn parse_function(&mut self) -> Result<FunctionDef, ParseError> {
        let location = self.loc();
        let base = self.parse_type_specifier()?;
        let return_type = self.parse_pointer_suffix(base)?;
        let (name, _) = self.expect_identifier()?;

        self.expect(&TokenKind::LParen, "expected '(' after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect(&TokenKind::RParen, "expected ')' after parameters")?;
        self.expect(&TokenKind::LBrace, "expected '{' before function body")?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace, "expected '}' after function body")?;

        Ok(FunctionDef {
            name,
            params,
            return_type,
            body,
            location,
        })
    }

    /// Parse parameter list: (type name, type name, ...)
    fn parse_parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(params);
        }

        // (void) means no parameters
        if self.check(&TokenKind::Void)
            && matches!(self.peek_kind_ahead(1), Some(TokenKind::RParen))
        {
            self.advance();
            return Ok(params);
        }

        loop {
            let location = self.loc();
            let base = self.parse_type_specifier()?;
            let mut ty = self.parse_pointer_suffix(base)?;
            let (name, _) = self.expect_identifier()?;

            // Array parameters decay to pointers; the first dimension may
            // be empty, further dimensions must be sized.
            if self.check(&TokenKind::LBracket) {
                let dims = self.parse_array_dimensions(true)?;
                let mut elem = ty;
                for &dim in dims.iter().skip(1).rev() {
                    elem = elem.array_of(dim.unwrap_or(0));
                }
                ty = elem.pointer_to();
            }

            params.push(Param { name, ty, location });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    /// Consume at most one `*` after a type specifier. A second level of
    /// indirection is out of scope everywhere a type can appear.
    fn parse_pointer_suffix(&mut self, base: CType) -> Result<CType, ParseError> {
        if !self.eat(&TokenKind::Star) {
            return Ok(base);
        }
        if self.check(&TokenKind::Star) {
            return Err(self.error_here("multi-level pointers are not supported".to_string()));
        }
        Ok(base.pointer_to())
    }

    /// Parse the type-specifier keyword
    fn parse_type_specifier(&mut self) -> Result<CType, ParseError> {
        let kind = self.peek_kind().clone();
        let ty = match kind {
            TokenKind::Int => CType::Int,
            TokenKind::Float => CType::Float,
            TokenKind::Char => CType::Char,
            TokenKind::Void => CType::Void,
            other => {
                return Err(self.error_here(format!("expected type specifier, found {}", other)));
            }
        };
        self.advance();
        Ok(ty)
    }

    /// Parse a declaration: type declarator (',' declarator)* ';'
    fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
        let location = self.loc();
        let base = self.parse_type_specifier()?;

        let mut declarators = Vec::new();
        loop {
            declarators.push(self.parse_declarator(&base)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::Semicolon, "expected ';' after declaration")?;

        Ok(Declaration {
            declarators,
            location,
        })
    }

    /// Parse one declarator: `*`? name (`[` N `]`)* (`=` initializer)?
    fn parse_declarator(&mut self, base: &CType) -> Result<Declarator, ParseError> {
        let mut ty = self.parse_pointer_suffix(base.clone())?;

        let (name, location) = self.expect_identifier()?;

        if self.check(&TokenKind::LBracket) {
            let dims = self.parse_array_dimensions(false)?;
            for &dim in dims.iter().rev() {
                // sized dimensions are guaranteed by parse_array_dimensions
                ty = ty.array_of(dim.unwrap_or(0));
            }
        }

        let init = if self.eat(&TokenKind::Eq) {
            Some(self.parse_initializer()?)
        } else {
            None
        };

        Ok(Declarator {
            name,
            ty,
            init,
            location,
        })
    }

    /// Parse one or more `[N]` suffixes. `allow_unsized` permits an empty
    /// first dimension (function parameters only).
    fn parse_array_dimensions(
        &mut self,
        allow_unsized: bool,
    ) -> Result<Vec<Option<usize>>, ParseError> {
        let mut dims = Vec::new();

        while self.eat(&TokenKind::LBracket) {
            if self.check(&TokenKind::RBracket) {
                if !allow_unsized || !dims.is_empty() {
                    return Err(
                        self.error_here("array dimension must be a positive integer".to_string())
                    );
                }
                self.advance();
                dims.push(None);
                continue;
            }

            let loc = self.loc();
            let size = match self.peek_kind().clone() {
                TokenKind::IntLiteral(n) if n > 0 => {
                    self.advance();
                    n as usize
                }
                _ => {
                    return Err(ParseError {
                        message: "array dimension must be a positive integer literal".to_string(),
                        location: loc,
                    });
                }
            };
            self.expect(&TokenKind::RBracket, "expected ']' after array dimension")?;
            dims.push(Some(size));
        }

        Ok(dims)
    }

    /// Parse initializer: expression or nested brace list
    fn parse_initializer(&mut self) -> Result<Initializer, ParseError> {
        if self.check(&TokenKind::LBrace) {
            let location = self.loc();
            self.advance();

            let mut items = Vec::new();
            if !self.check(&TokenKind::RBrace) {
                loop {
                    items.push(self.parse_initializer()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                    // allow a trailing comma before '}'
                    if self.check(&TokenKind::RBrace) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RBrace, "expected '}' after initializer list")?;
            return Ok(Initializer::List(items, location));
        }

        Ok(Initializer::Expr(self.parse_assignment()?))
    }

    /// Parse a statement
    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.loc();

        match self.peek_kind() {
            TokenKind::LBrace => {
                self.advance();
                let mut statements = Vec::new();
                while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                    statements.push(self.parse_statement()?);
                }
                self.expect(&TokenKind::RBrace, "expected '}' after block")?;
                Ok(Stmt::Block(statements, loc))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty(loc))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&TokenKind::Semicolon, "expected ';' after return")?;
                Ok(Stmt::Return {
                    value,
                    location: loc,
                })
            }
            TokenKind::Break => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "expected ';' after 'break'")?;
                Ok(Stmt::Break(loc))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "expected ';' after 'continue'")?;
                Ok(Stmt::Continue(loc))
            }
            TokenKind::If => {
                self.advance();
                self.parse_if_statement(loc)
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement(loc)
            }
            TokenKind::Do => {
                self.advance();
                self.parse_do_while_statement(loc)
            }
            TokenKind::For => {
                self.advance();
                self.parse_for_statement(loc)
            }
            TokenKind::Int | TokenKind::Float | TokenKind::Char | TokenKind::Void => {
                Ok(Stmt::Declaration(self.parse_declaration()?))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "expected ';' after expression")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LParen, "expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "expected ')' after if condition")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LParen, "expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "expected ')' after while condition")?;

        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::While {
            condition,
            body,
            location: loc,
        })
    }

    fn parse_do_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let body = Box::new(self.parse_statement()?);

        self.expect(&TokenKind::While, "expected 'while' after do body")?;
        self.expect(&TokenKind::LParen, "expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "expected ')' after do-while condition")?;
        self.expect(&TokenKind::Semicolon, "expected ';' after do-while")?;

        Ok(Stmt::DoWhile {
            body,
            condition,
            location: loc,
        })
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::LParen, "expected '(' after 'for'")?;

        let init = if self.eat(&TokenKind::Semicolon) {
            None
        } else if self.is_type_keyword() {
            // declaration consumes its own ';'
            Some(Box::new(ForInit::Declaration(self.parse_declaration()?)))
        } else {
            let expr = self.parse_expression()?;
            self.expect(&TokenKind::Semicolon, "expected ';' after for initializer")?;
            Some(Box::new(ForInit::Expression(expr)))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "expected ';' after for condition")?;

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen, "expected ')' after for clauses")?;

        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            init,
            condition,
            step,
            body,
            location: loc,
        })
    }

    // ===== Expressions =====

    /// Parse expression (top-level entry point)
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment (right-associative)
    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_ternary()?;

        let loc = self.loc();
        let op = match self.peek_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => return Ok(expr),
        };
        self.advance();

        let value = Box::new(self.parse_assignment()?);
        Ok(Expr::Assign {
            target: Box::new(expr),
            op,
            value,
            location: loc,
        })
    }

    /// Parse ternary: condition ? then_expr : else_expr
    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_logical_or()?;

        if self.check(&TokenKind::Question) {
            let loc = self.loc();
            self.advance();
            let then_expr = Box::new(self.parse_expression()?);
            self.expect(&TokenKind::Colon, "expected ':' in ternary expression")?;
            let else_expr = Box::new(self.parse_ternary()?);

            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_expr,
                else_expr,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Left-associative binary chain: parse `next` operands joined by any
    /// of the given operators. One call per precedence level.
    fn parse_binary_chain(
        &mut self,
        ops: &[(TokenKind, BinOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;

        'scan: loop {
            for (kind, op) in ops {
                if self.check(kind) {
                    let loc = self.loc();
                    self.advance();
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                        location: loc,
                    };
                    continue 'scan;
                }
            }
            break;
        }

        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(&[(TokenKind::OrOr, BinOp::Or)], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(&[(TokenKind::AndAnd, BinOp::And)], Self::parse_bitwise_or)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(&[(TokenKind::Pipe, BinOp::BitOr)], Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(&[(TokenKind::Caret, BinOp::BitXor)], Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(&[(TokenKind::Amp, BinOp::BitAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(
            &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::NotEq, BinOp::Ne)],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Le, BinOp::Le),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::Ge, BinOp::Ge),
            ],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(
            &[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_chain(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
            Self::parse_cast,
        )
    }

    /// Parse cast: (type `*`?) expr
    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LParen)
            && matches!(
                self.peek_kind_ahead(1),
                Some(TokenKind::Int)
                    | Some(TokenKind::Float)
                    | Some(TokenKind::Char)
                    | Some(TokenKind::Void)
            )
        {
            let loc = self.loc();
            self.advance(); // '('
            let base = self.parse_type_specifier()?;
            let target = self.parse_pointer_suffix(base)?;
            self.expect(&TokenKind::RParen, "expected ')' after cast type")?;
            let operand = Box::new(self.parse_cast()?);

            return Ok(Expr::Cast {
                target,
                operand,
                location: loc,
            });
        }

        self.parse_unary()
    }

    /// Parse prefix unary operators and sizeof
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.loc();

        let op = match self.peek_kind() {
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Tilde => Some(UnOp::BitNot),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Amp => Some(UnOp::AddrOf),
            TokenKind::Star => Some(UnOp::Deref),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            TokenKind::Plus => {
                // unary plus is a no-op
                self.advance();
                return self.parse_unary();
            }
            TokenKind::Sizeof => {
                self.advance();
                return self.parse_sizeof(loc);
            }
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op,
                operand,
                location: loc,
            });
        }

        self.parse_postfix()
    }

    fn parse_sizeof(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen, "expected '(' after 'sizeof'")?;

        if self.is_type_keyword() {
            let base = self.parse_type_specifier()?;
            let target = self.parse_pointer_suffix(base)?;
            self.expect(&TokenKind::RParen, "expected ')' after sizeof type")?;
            return Ok(Expr::SizeofType {
                target,
                location: loc,
            });
        }

        let operand = Box::new(self.parse_expression()?);
        self.expect(&TokenKind::RParen, "expected ')' after sizeof expression")?;
        Ok(Expr::SizeofExpr {
            operand,
            location: loc,
        })
    }

    /// Parse postfix: ++ -- [] ()
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.loc();

            match self.peek_kind() {
                TokenKind::PlusPlus => {
                    self.advance();
                    expr = Expr::Unary {
                        op: UnOp::PostInc,
                        operand: Box::new(expr),
                        location: loc,
                    };
                }
                TokenKind::MinusMinus => {
                    self.advance();
                    expr = Expr::Unary {
                        op: UnOp::PostDec,
                        operand: Box::new(expr),
                        location: loc,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = Box::new(self.parse_expression()?);
                    self.expect(&TokenKind::RBracket, "expected ']' after array index")?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index,
                        location: loc,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_argument_list()?;
                    self.expect(&TokenKind::RParen, "expected ')' after arguments")?;

                    let callee = match expr {
                        Expr::Identifier(name, _) => name,
                        _ => {
                            return Err(ParseError {
                                message: "function call requires a function name".to_string(),
                                location: loc,
                            });
                        }
                    };

                    expr = Expr::Call {
                        callee,
                        args,
                        location: loc,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse argument list: expr, expr, ...
    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary: literals, identifiers, parenthesized expressions
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.loc();

        let expr = match self.peek_kind().clone() {
            TokenKind::IntLiteral(n) => {
                self.advance();
                Expr::IntLiteral(n, loc)
            }
            TokenKind::FloatLiteral(x) => {
                self.advance();
                Expr::FloatLiteral(x, loc)
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                Expr::CharLiteral(c, loc)
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Expr::StringLiteral(s, loc)
            }
            TokenKind::Ident(name) => {
                self.advance();
                Expr::Identifier(name, loc)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "expected ')' after expression")?;
                expr
            }
            other => {
                return Err(self.error_here(format!("expected expression, found {}", other)));
            }
        };

        Ok(expr)
    }

    // ===== Helpers =====

    fn is_type_keyword(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Int | TokenKind::Float | TokenKind::Char | TokenKind::Void
        )
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.position].kind
    }

    fn peek_kind_ahead(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + n).map(|t| &t.kind)
    }

    fn loc(&self) -> SourceLocation {
        self.tokens[self.position].loc
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(format!("{}, found {}", message, self.peek_kind())))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, SourceLocation), ParseError> {
        let loc = self.loc();
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            self.advance();
            Ok((name, loc))
        } else {
            Err(self.error_here(format!("expected identifier, found {}", self.peek_kind())))
        }
    }

    fn error_here(&self, message: String) -> ParseError {
        ParseError {
            message,
            location: self.loc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    fn parse_expr(source: &str) -> Expr {
        let fragment = format!("{};", source);
        let program = Parser::new(&fragment).unwrap().parse_fragment().unwrap();
        match program.items.into_iter().next() {
            Some(Item::Statement(Stmt::Expression(expr))) => expr,
            other => panic!("expected expression item, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse("int main() { return 0; }");

        assert_eq!(program.items.len(), 1);
        match &program.items[0] {
            Item::Function(def) => {
                assert_eq!(def.name, "main");
                assert!(def.params.is_empty());
                assert_eq!(def.return_type, CType::Int);
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_mul_over_add() {
        // a + b * c parses as a + (b * c)
        let expr = parse_expr("a + b * c");
        match expr {
            Expr::Binary {
                op: BinOp::Add,
                right,
                ..
            } => {
                assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected '+' at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_deref_binds_looser_than_postfix_inc() {
        // *p++ parses as *(p++)
        let expr = parse_expr("*p++");
        match expr {
            Expr::Unary {
                op: UnOp::Deref,
                operand,
                ..
            } => {
                assert!(matches!(
                    *operand,
                    Expr::Unary {
                        op: UnOp::PostInc,
                        ..
                    }
                ));
            }
            other => panic!("expected deref at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_right_associative() {
        // a = b = c parses as a = (b = c)
        let expr = parse_expr("a = b = c");
        match expr {
            Expr::Assign { op: None, value, .. } => {
                assert!(matches!(*value, Expr::Assign { op: None, .. }));
            }
            other => panic!("expected assignment at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_declarators() {
        let program = parse("int main() { int a, *p, grid[2][3]; return 0; }");
        let Item::Function(def) = &program.items[0] else {
            panic!("expected function");
        };
        let Stmt::Declaration(decl) = &def.body[0] else {
            panic!("expected declaration");
        };

        assert_eq!(decl.declarators.len(), 3);
        assert_eq!(decl.declarators[0].ty, CType::Int);
        assert_eq!(decl.declarators[1].ty, CType::Int.pointer_to());
        assert_eq!(
            decl.declarators[2].ty,
            CType::Int.array_of(3).array_of(2)
        );
    }

    #[test]
    fn test_nested_array_initializer() {
        let program = parse("int main() { int m[2][2] = {{1, 2}, {3, 4}}; return 0; }");
        let Item::Function(def) = &program.items[0] else {
            panic!("expected function");
        };
        let Stmt::Declaration(decl) = &def.body[0] else {
            panic!("expected declaration");
        };
        let Some(Initializer::List(rows, _)) = &decl.declarators[0].init else {
            panic!("expected initializer list");
        };
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], Initializer::List(ref r, _) if r.len() == 2));
    }

    #[test]
    fn test_for_with_declaration() {
        let program = parse("int main() { for (int i = 0; i < 5; i++) { } return 0; }");
        let Item::Function(def) = &program.items[0] else {
            panic!("expected function");
        };
        match &def.body[0] {
            Stmt::For { init, condition, step, .. } => {
                assert!(matches!(init.as_deref(), Some(ForInit::Declaration(_))));
                assert!(condition.is_some());
                assert!(step.is_some());
            }
            other => panic!("expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn test_global_declaration() {
        let program = parse("int counter = 0; int main() { return counter; }");
        assert!(matches!(program.items[0], Item::Globals(_)));
        assert!(matches!(program.items[1], Item::Function(_)));
    }

    #[test]
    fn test_pointer_function_and_params() {
        let program = parse("char *first(char *s, int n[]) { return s; }");
        let Item::Function(def) = &program.items[0] else {
            panic!("expected function");
        };
        assert_eq!(def.return_type, CType::Char.pointer_to());
        assert_eq!(def.params[0].ty, CType::Char.pointer_to());
        assert_eq!(def.params[1].ty, CType::Int.pointer_to());
    }

    #[test]
    fn test_cast_and_sizeof() {
        let expr = parse_expr("(char*)malloc(sizeof(int) * 4)");
        match expr {
            Expr::Cast { target, operand, .. } => {
                assert_eq!(target, CType::Char.pointer_to());
                assert!(matches!(*operand, Expr::Call { .. }));
            }
            other => panic!("expected cast, got {:?}", other),
        }
    }

    #[test]
    fn test_ternary() {
        let expr = parse_expr("a > b ? a : b");
        assert!(matches!(expr, Expr::Ternary { .. }));
    }

    #[test]
    fn test_rejects_multi_level_pointer() {
        let err = Parser::new("int main() { char **p; return 0; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("multi-level pointers"));
    }

    #[test]
    fn test_rejects_multi_level_pointer_return_type() {
        let err = Parser::new("int **table() { return 0; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("multi-level pointers"));
    }

    #[test]
    fn test_rejects_multi_level_pointer_parameter() {
        let err = Parser::new("void walk(char **argv) { }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("multi-level pointers"));
    }

    #[test]
    fn test_rejects_multi_level_pointer_cast() {
        let err = Parser::new("int main() { int x = (int**)0; return x; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("multi-level pointers"));
    }

    #[test]
    fn test_rejects_multi_level_pointer_sizeof() {
        let err = Parser::new("int main() { return sizeof(int**); }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("multi-level pointers"));
    }

    #[test]
    fn test_rejects_statement_at_top_level_in_strict_mode() {
        let err = Parser::new("x = 1;").unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("expected type specifier"));
    }

    #[test]
    fn test_fragment_allows_statements_and_expressions() {
        let program = Parser::new("int x = 2; x * 3")
            .unwrap()
            .parse_fragment()
            .unwrap();
        assert_eq!(program.items.len(), 2);
        assert!(matches!(program.items[0], Item::Statement(Stmt::Declaration(_))));
        assert!(matches!(program.items[1], Item::Statement(Stmt::Expression(_))));
    }

    #[test]
    fn test_parse_error_reports_location() {
        let err = Parser::new("int main() { return 0 }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("expected ';'"));
        assert_eq!(err.location.line, 1);
    }
}
