// AST definitions for the C interpreter

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Types supported by the interpreter.
///
/// There are no user-defined types; function signatures live in the
/// interpreter's function table rather than in this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    Int,
    Float,
    Char,
    Void,
    Pointer(Box<CType>),
    Array(Box<CType>, usize),
}

impl CType {
    pub fn pointer_to(self) -> CType {
        CType::Pointer(Box::new(self))
    }

    pub fn array_of(self, len: usize) -> CType {
        CType::Array(Box::new(self), len)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CType::Array(_, _))
    }

    /// The type an array parameter or array rvalue decays to.
    pub fn decayed(&self) -> CType {
        match self {
            CType::Array(elem, _) => CType::Pointer(elem.clone()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Int => write!(f, "int"),
            CType::Float => write!(f, "float"),
            CType::Char => write!(f, "char"),
            CType::Void => write!(f, "void"),
            CType::Pointer(inner) => write!(f, "{}*", inner),
            CType::Array(inner, len) => write!(f, "{}[{}]", inner, len),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

/// Expression nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    CharLiteral(u8, SourceLocation),
    StringLiteral(String, SourceLocation),
    Identifier(String, SourceLocation),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    /// Plain (`op == None`) or compound (`op == Some(..)`) assignment
    Assign {
        target: Box<Expr>,
        op: Option<BinOp>,
        value: Box<Expr>,
        location: SourceLocation,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        location: SourceLocation,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    Cast {
        target: CType,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    SizeofExpr {
        operand: Box<Expr>,
        location: SourceLocation,
    },
    SizeofType {
        target: CType,
        location: SourceLocation,
    },
}

impl Expr {
    /// Get the source location of this expression
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::IntLiteral(_, loc)
            | Expr::FloatLiteral(_, loc)
            | Expr::CharLiteral(_, loc)
            | Expr::StringLiteral(_, loc)
            | Expr::Identifier(_, loc) => *loc,
            Expr::Unary { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Assign { location, .. }
            | Expr::Ternary { location, .. }
            | Expr::Index { location, .. }
            | Expr::Call { location, .. }
            | Expr::Cast { location, .. }
            | Expr::SizeofExpr { location, .. }
            | Expr::SizeofType { location, .. } => *location,
        }
    }
}

/// Variable initializer: a single expression or a brace-enclosed list,
/// nested for multi-dimensional arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Initializer>, SourceLocation),
}

impl Initializer {
    pub fn location(&self) -> SourceLocation {
        match self {
            Initializer::Expr(e) => e.location(),
            Initializer::List(_, loc) => *loc,
        }
    }
}

/// One declarator inside a declaration: `int a, *p, grid[2][3];` has three.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub ty: CType,
    pub init: Option<Initializer>,
    pub location: SourceLocation,
}

/// A declaration statement with one or more declarators
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub declarators: Vec<Declarator>,
    pub location: SourceLocation,
}

/// The init clause of a `for` statement
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Declaration(Declaration),
    Expression(Expr),
}

/// Statement nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>, SourceLocation),
    Declaration(Declaration),
    Expression(Expr),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        location: SourceLocation,
    },
    For {
        init: Option<Box<ForInit>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    Break(SourceLocation),
    Continue(SourceLocation),
    Empty(SourceLocation),
}

impl Stmt {
    /// Get the source location of this statement
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::Block(_, loc) | Stmt::Break(loc) | Stmt::Continue(loc) | Stmt::Empty(loc) => {
                *loc
            }
            Stmt::Declaration(decl) => decl.location,
            Stmt::Expression(expr) => expr.location(),
            Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::DoWhile { location, .. }
            | Stmt::For { location, .. }
            | Stmt::Return { location, .. } => *location,
        }
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: CType,
    pub location: SourceLocation,
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: CType,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Top-level item.
///
/// `Statement` items only appear in permissive (REPL) mode, where loose
/// statements and expressions may sit alongside function definitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDef),
    Globals(Declaration),
    Statement(Stmt),
}

/// Top-level program structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
}
