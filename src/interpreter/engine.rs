//! Tree-walking execution engine
//!
//! Statement execution returns an explicit [`Control`] signal rather than
//! abusing host-language control flow, which keeps `break`/`continue`/
//! `return` orthogonal to runtime error propagation. Expression evaluation
//! is split into an rvalue path (with array-to-pointer decay) and an
//! lvalue path producing [`Place`]s, i.e. `(address, type)` pairs into the
//! simulated memory.
//!
//! One `Interpreter` owns everything a run touches: environment, memory,
//! the output buffer and the stdin cursor. Cloning it snapshots the whole
//! context, which is how the REPL rolls back failed fragments.

use super::env::{Binding, Callable, Env};
use super::errors::RuntimeError;
use crate::memory::heap::{AllocKind, Heap};
use crate::memory::value::{Address, Value};
use crate::memory::{pointer_distance, pointer_offset, size_of};
use crate::parser::ast::*;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Native-stack safety margin for recursive interpreted calls.
const MAX_CALL_DEPTH: usize = 128;

/// Outcome of executing one statement
#[derive(Debug, Clone)]
pub enum Control {
    Normal,
    Break(SourceLocation),
    Continue(SourceLocation),
    Return(Value),
}

/// Shared cancellation flag, checked before each statement and each loop
/// iteration. Cancelling aborts the run with an `Interrupted` error.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cursor over the stdin text handed to [`Interpreter::new`]
#[derive(Debug, Clone, Default)]
pub(crate) struct StdinReader {
    bytes: Vec<u8>,
    pos: usize,
}

impl StdinReader {
    fn new(text: Option<&str>) -> Self {
        StdinReader {
            bytes: text.unwrap_or("").as_bytes().to_vec(),
            pos: 0,
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Next whitespace-delimited token
    pub(crate) fn next_token(&mut self) -> Option<String> {
        while !self.at_end() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.at_end() {
            return None;
        }
        let start = self.pos;
        while !self.at_end() && !self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        Some(
            self.bytes[start..self.pos]
                .iter()
                .map(|&b| b as char)
                .collect(),
        )
    }

    /// Next raw byte, whitespace included
    pub(crate) fn next_byte(&mut self) -> Option<u8> {
        if self.at_end() {
            return None;
        }
        let b = self.bytes[self.pos];
        self.pos += 1;
        Some(b)
    }

    /// Next line, without its terminator
    pub(crate) fn next_line(&mut self) -> Option<String> {
        if self.at_end() {
            return None;
        }
        let start = self.pos;
        while !self.at_end() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
        let line = self.bytes[start..self.pos]
            .iter()
            .map(|&b| b as char)
            .collect();
        if !self.at_end() {
            self.pos += 1;
        }
        Some(line)
    }
}

/// An lvalue: a storage location together with the type stored there
#[derive(Debug, Clone)]
pub struct Place {
    pub addr: Address,
    pub ty: CType,
}

/// One interpretation context
#[derive(Debug, Clone)]
pub struct Interpreter {
    pub(crate) env: Env,
    pub(crate) heap: Heap,
    pub(crate) output: String,
    pub(crate) stdin: StdinReader,
    strings: FxHashMap<String, Address>,
    cancel: Option<CancelToken>,
    call_depth: usize,
}

impl Interpreter {
    pub fn new(stdin: Option<&str>) -> Self {
        Interpreter {
            env: Env::new(),
            heap: Heap::default(),
            output: String::new(),
            stdin: StdinReader::new(stdin),
            strings: FxHashMap::default(),
            cancel: None,
            call_depth: 0,
        }
    }

    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = Some(token);
    }

    /// Everything printed so far
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Register every function definition, then execute global
    /// declarations and (in permissive mode) top-level statements in
    /// source order. Functions are all registered before anything runs,
    /// so mutual recursion works regardless of definition order.
    pub fn run_program(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for item in &program.items {
            if let Item::Function(def) = item {
                self.env.define_function(def.clone())?;
            }
        }

        for item in &program.items {
            match item {
                Item::Function(_) => {}
                Item::Globals(decl) => self.exec_declaration(decl)?,
                Item::Statement(stmt) => match self.exec_stmt(stmt)? {
                    Control::Normal => {}
                    // a top-level `return` ends the fragment
                    Control::Return(_) => break,
                    Control::Break(location) => {
                        return Err(RuntimeError::StrayControlFlow {
                            keyword: "break",
                            location,
                        });
                    }
                    Control::Continue(location) => {
                        return Err(RuntimeError::StrayControlFlow {
                            keyword: "continue",
                            location,
                        });
                    }
                },
            }
        }

        Ok(())
    }

    pub fn has_main(&self) -> bool {
        matches!(self.env.function("main"), Some(Callable::User(_)))
    }

    /// Call `main` with no arguments and return its value.
    pub fn call_main(&mut self) -> Result<Value, RuntimeError> {
        let location = match self.env.function("main") {
            Some(Callable::User(def)) => def.location,
            _ => {
                return Err(RuntimeError::Undeclared {
                    name: "main".to_string(),
                    location: SourceLocation::new(1, 1),
                });
            }
        };
        self.call_function("main", Vec::new(), location)
    }

    // ===== Statements =====

    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Control, RuntimeError> {
        self.check_cancelled(stmt.location())?;

        match stmt {
            Stmt::Empty(_) => Ok(Control::Normal),

            Stmt::Expression(expr) => {
                self.eval_rvalue(expr)?;
                Ok(Control::Normal)
            }

            Stmt::Declaration(decl) => {
                self.exec_declaration(decl)?;
                Ok(Control::Normal)
            }

            Stmt::Block(stmts, _) => {
                self.env.push_scope();
                let result = self.exec_sequence(stmts);
                for addr in self.env.pop_scope() {
                    self.heap.release(addr);
                }
                result
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_condition(condition)? {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(Control::Normal)
                }
            }

            Stmt::While {
                condition,
                body,
                location,
            } => {
                loop {
                    self.check_cancelled(*location)?;
                    if !self.eval_condition(condition)? {
                        break;
                    }
                    match self.exec_stmt(body)? {
                        Control::Normal | Control::Continue(_) => {}
                        Control::Break(_) => break,
                        ret @ Control::Return(_) => return Ok(ret),
                    }
                }
                Ok(Control::Normal)
            }

            Stmt::DoWhile {
                body,
                condition,
                location,
            } => {
                loop {
                    self.check_cancelled(*location)?;
                    match self.exec_stmt(body)? {
                        Control::Normal | Control::Continue(_) => {}
                        Control::Break(_) => break,
                        ret @ Control::Return(_) => return Ok(ret),
                    }
                    if !self.eval_condition(condition)? {
                        break;
                    }
                }
                Ok(Control::Normal)
            }

            Stmt::For {
                init,
                condition,
                step,
                body,
                location,
            } => {
                // the init declaration gets its own scope
                self.env.push_scope();
                let result = self.exec_for(init.as_deref(), condition.as_ref(), step.as_ref(), body, *location);
                for addr in self.env.pop_scope() {
                    self.heap.release(addr);
                }
                result
            }

            Stmt::Return { value, location: _ } => {
                let value = match value {
                    Some(expr) => self.eval_rvalue(expr)?,
                    None => Value::Void,
                };
                Ok(Control::Return(value))
            }

            Stmt::Break(loc) => Ok(Control::Break(*loc)),
            Stmt::Continue(loc) => Ok(Control::Continue(*loc)),
        }
    }

    fn exec_sequence(&mut self, stmts: &[Stmt]) -> Result<Control, RuntimeError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Control::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Control::Normal)
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        condition: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<Control, RuntimeError> {
        match init {
            Some(ForInit::Declaration(decl)) => self.exec_declaration(decl)?,
            Some(ForInit::Expression(expr)) => {
                self.eval_rvalue(expr)?;
            }
            None => {}
        }

        loop {
            self.check_cancelled(location)?;
            if let Some(condition) = condition {
                if !self.eval_condition(condition)? {
                    break;
                }
            }
            match self.exec_stmt(body)? {
                // `continue` still runs the step expression
                Control::Normal | Control::Continue(_) => {}
                Control::Break(_) => break,
                ret @ Control::Return(_) => return Ok(ret),
            }
            if let Some(step) = step {
                self.eval_rvalue(step)?;
            }
        }

        Ok(Control::Normal)
    }

    pub(crate) fn exec_declaration(&mut self, decl: &Declaration) -> Result<(), RuntimeError> {
        for declarator in &decl.declarators {
            if declarator.ty == CType::Void {
                return Err(RuntimeError::TypeMismatch {
                    message: format!("cannot declare '{}' as void", declarator.name),
                    location: declarator.location,
                });
            }

            let addr = self
                .heap
                .allocate(size_of(&declarator.ty), AllocKind::Frame)
                .map_err(|e| RuntimeError::from_memory(e, declarator.location))?;

            // storage is zero-filled, so uninitialised variables read as 0
            if let Some(init) = &declarator.init {
                self.init_storage(addr, &declarator.ty, init)?;
            }

            self.env.declare(
                &declarator.name,
                Binding {
                    ty: declarator.ty.clone(),
                    addr,
                },
                declarator.location,
            )?;
            self.env.record_storage(addr);
        }
        Ok(())
    }

    /// Fill freshly allocated storage from an initializer. Missing array
    /// elements stay zero; excess elements are an error.
    fn init_storage(
        &mut self,
        addr: Address,
        ty: &CType,
        init: &Initializer,
    ) -> Result<(), RuntimeError> {
        match (ty, init) {
            (CType::Array(elem, len), Initializer::List(items, location)) => {
                if items.len() > *len {
                    return Err(RuntimeError::InitializerOverflow {
                        got: items.len(),
                        len: *len,
                        location: *location,
                    });
                }
                let stride = size_of(elem) as Address;
                for (i, item) in items.iter().enumerate() {
                    self.init_storage(addr + i as Address * stride, elem, item)?;
                }
                Ok(())
            }

            // char buf[N] = "literal"
            (CType::Array(elem, len), Initializer::Expr(Expr::StringLiteral(s, location)))
                if **elem == CType::Char =>
            {
                if s.len() + 1 > *len {
                    return Err(RuntimeError::InitializerOverflow {
                        got: s.len() + 1,
                        len: *len,
                        location: *location,
                    });
                }
                self.heap
                    .write_bytes(addr, s.as_bytes())
                    .map_err(|e| RuntimeError::from_memory(e, *location))
            }

            (CType::Array(_, _), Initializer::Expr(expr)) => Err(RuntimeError::TypeMismatch {
                message: "array initializer must be a brace-enclosed list".to_string(),
                location: expr.location(),
            }),

            (_, Initializer::List(items, location)) => {
                // braces around a scalar initializer
                if items.len() == 1 {
                    self.init_storage(addr, ty, &items[0])
                } else {
                    Err(RuntimeError::TypeMismatch {
                        message: format!("too many initializers for '{}'", ty),
                        location: *location,
                    })
                }
            }

            (_, Initializer::Expr(expr)) => {
                let value = self.eval_rvalue(expr)?;
                let converted = self.convert(value, ty, expr.location())?;
                self.heap
                    .store(addr, ty, &converted)
                    .map_err(|e| RuntimeError::from_memory(e, expr.location()))
            }
        }
    }

    // ===== Function calls =====

    pub(crate) fn call_function(
        &mut self,
        name: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let callable = match self.env.function(name) {
            Some(callable) => callable.clone(),
            None if self.env.lookup(name).is_some() => {
                return Err(RuntimeError::NotAFunction {
                    name: name.to_string(),
                    location,
                });
            }
            None => {
                return Err(RuntimeError::Undeclared {
                    name: name.to_string(),
                    location,
                });
            }
        };

        match callable {
            Callable::Builtin(builtin) => self.call_builtin(builtin, args, location),
            Callable::User(def) => {
                if args.len() != def.params.len() {
                    return Err(RuntimeError::ArityMismatch {
                        name: name.to_string(),
                        expected: def.params.len(),
                        got: args.len(),
                        location,
                    });
                }
                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::SegFault {
                        message: format!("stack overflow: call depth exceeds {}", MAX_CALL_DEPTH),
                        location,
                    });
                }

                self.call_depth += 1;
                self.env
                    .push_frame(def.name.clone(), def.return_type.clone());
                let result = self.run_function(&def, args);
                for addr in self.env.pop_frame() {
                    self.heap.release(addr);
                }
                self.call_depth -= 1;
                result
            }
        }
    }

    fn run_function(&mut self, def: &FunctionDef, args: Vec<Value>) -> Result<Value, RuntimeError> {
        for (param, arg) in def.params.iter().zip(args) {
            let addr = self
                .heap
                .allocate(size_of(&param.ty), AllocKind::Frame)
                .map_err(|e| RuntimeError::from_memory(e, param.location))?;
            let converted = self.convert(arg, &param.ty, param.location)?;
            self.heap
                .store(addr, &param.ty, &converted)
                .map_err(|e| RuntimeError::from_memory(e, param.location))?;
            self.env.declare(
                &param.name,
                Binding {
                    ty: param.ty.clone(),
                    addr,
                },
                param.location,
            )?;
            self.env.record_storage(addr);
        }

        match self.exec_sequence(&def.body)? {
            Control::Return(value) => self.convert_return(value, def),
            Control::Normal => Ok(Self::zero_value(&def.return_type)),
            Control::Break(location) => Err(RuntimeError::StrayControlFlow {
                keyword: "break",
                location,
            }),
            Control::Continue(location) => Err(RuntimeError::StrayControlFlow {
                keyword: "continue",
                location,
            }),
        }
    }

    fn convert_return(&mut self, value: Value, def: &FunctionDef) -> Result<Value, RuntimeError> {
        if def.return_type == CType::Void {
            return Ok(Value::Void);
        }
        if value == Value::Void {
            // bare `return;` in a value-returning function
            return Ok(Self::zero_value(&def.return_type));
        }
        self.convert(value, &def.return_type, def.location)
    }

    fn zero_value(ty: &CType) -> Value {
        match ty {
            CType::Int => Value::Int(0),
            CType::Float => Value::Float(0.0),
            CType::Char => Value::Char(0),
            CType::Pointer(pointee) => Value::Pointer {
                addr: 0,
                pointee: (**pointee).clone(),
            },
            CType::Void | CType::Array(_, _) => Value::Void,
        }
    }

    // ===== Expressions =====

    /// Evaluate to an rvalue; array handles decay to pointers here.
    pub(crate) fn eval_rvalue(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        Ok(Self::decay(self.eval_value(expr)?))
    }

    fn decay(value: Value) -> Value {
        match value {
            Value::Array { addr, elem, .. } => Value::Pointer {
                addr,
                pointee: elem,
            },
            other => other,
        }
    }

    /// Evaluate without the final decay, so `sizeof` and indexing can
    /// still see array handles.
    fn eval_value(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::IntLiteral(n, _) => Ok(Value::Int(*n)),
            Expr::FloatLiteral(x, _) => Ok(Value::Float(*x)),
            Expr::CharLiteral(c, _) => Ok(Value::Char(*c)),

            Expr::StringLiteral(s, location) => {
                let addr = self.intern_string(s, *location)?;
                Ok(Value::Pointer {
                    addr,
                    pointee: CType::Char,
                })
            }

            Expr::Identifier(name, location) => {
                let binding = match self.env.lookup(name) {
                    Some(binding) => binding.clone(),
                    None => {
                        return Err(RuntimeError::Undeclared {
                            name: name.clone(),
                            location: *location,
                        });
                    }
                };
                self.heap
                    .load(binding.addr, &binding.ty)
                    .map_err(|e| RuntimeError::from_memory(e, *location))
            }

            Expr::Unary {
                op: UnOp::Deref, ..
            }
            | Expr::Index { .. } => {
                let place = self.eval_place(expr)?;
                self.load_place(&place, expr.location())
            }

            Expr::Unary {
                op: UnOp::AddrOf,
                operand,
                ..
            } => {
                let place = self.eval_place(operand)?;
                // &array yields a pointer to the first element
                let pointee = match place.ty {
                    CType::Array(elem, _) => *elem,
                    other => other,
                };
                Ok(Value::Pointer {
                    addr: place.addr,
                    pointee,
                })
            }

            Expr::Unary {
                op,
                operand,
                location,
            } => self.eval_unary(*op, operand, *location),

            Expr::Binary {
                op,
                left,
                right,
                location,
            } => self.eval_binary(*op, left, right, *location),

            Expr::Assign {
                target,
                op,
                value,
                location,
            } => self.eval_assign(target, *op, value, *location),

            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                if self.eval_condition(condition)? {
                    self.eval_value(then_expr)
                } else {
                    self.eval_value(else_expr)
                }
            }

            Expr::Call {
                callee,
                args,
                location,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_rvalue(arg)?);
                }
                self.call_function(callee, values, *location)
            }

            Expr::Cast {
                target,
                operand,
                location,
            } => {
                let value = self.eval_rvalue(operand)?;
                self.cast_value(value, target, *location)
            }

            Expr::SizeofExpr { operand, .. } => {
                let ty = self.infer_type(operand)?;
                Ok(Value::Int(size_of(&ty) as i64))
            }

            Expr::SizeofType { target, .. } => Ok(Value::Int(size_of(target) as i64)),
        }
    }

    /// Evaluate an lvalue to its place. Identifiers, dereferences and
    /// index expressions designate storage; everything else does not.
    fn eval_place(&mut self, expr: &Expr) -> Result<Place, RuntimeError> {
        match expr {
            Expr::Identifier(name, location) => match self.env.lookup(name) {
                Some(binding) => Ok(Place {
                    addr: binding.addr,
                    ty: binding.ty.clone(),
                }),
                None => Err(RuntimeError::Undeclared {
                    name: name.clone(),
                    location: *location,
                }),
            },

            Expr::Unary {
                op: UnOp::Deref,
                operand,
                location,
            } => {
                let value = self.eval_rvalue(operand)?;
                match value {
                    Value::Pointer { addr: 0, .. } => {
                        Err(RuntimeError::NullDereference { location: *location })
                    }
                    Value::Pointer { addr, pointee } => {
                        if pointee == CType::Void {
                            return Err(RuntimeError::TypeMismatch {
                                message: "cannot dereference a void pointer".to_string(),
                                location: *location,
                            });
                        }
                        Ok(Place { addr, ty: pointee })
                    }
                    other => Err(RuntimeError::TypeMismatch {
                        message: format!("cannot dereference {}", other.type_name()),
                        location: *location,
                    }),
                }
            }

            Expr::Index {
                base,
                index,
                location,
            } => {
                let base_value = self.eval_value(base)?;
                let idx = self.eval_index(index)?;
                match base_value {
                    // arrays are bounds-checked
                    Value::Array { addr, elem, len } => {
                        if idx < 0 || idx as usize >= len {
                            return Err(RuntimeError::IndexOutOfBounds {
                                index: idx,
                                len,
                                location: *location,
                            });
                        }
                        Ok(Place {
                            addr: pointer_offset(addr, idx, &elem),
                            ty: elem,
                        })
                    }
                    Value::Pointer { addr: 0, .. } => {
                        Err(RuntimeError::NullDereference { location: *location })
                    }
                    // raw pointers are range-checked by the memory model
                    Value::Pointer { addr, pointee } => {
                        if pointee == CType::Void {
                            return Err(RuntimeError::TypeMismatch {
                                message: "cannot index a void pointer".to_string(),
                                location: *location,
                            });
                        }
                        Ok(Place {
                            addr: pointer_offset(addr, idx, &pointee),
                            ty: pointee,
                        })
                    }
                    other => Err(RuntimeError::TypeMismatch {
                        message: format!("cannot index {}", other.type_name()),
                        location: *location,
                    }),
                }
            }

            other => Err(RuntimeError::TypeMismatch {
                message: "expression is not an lvalue".to_string(),
                location: other.location(),
            }),
        }
    }

    fn eval_index(&mut self, index: &Expr) -> Result<i64, RuntimeError> {
        let value = self.eval_rvalue(index)?;
        value.as_int().ok_or_else(|| RuntimeError::TypeMismatch {
            message: format!("array index must be an integer, got {}", value.type_name()),
            location: index.location(),
        })
    }

    fn load_place(&self, place: &Place, location: SourceLocation) -> Result<Value, RuntimeError> {
        self.heap
            .load(place.addr, &place.ty)
            .map_err(|e| RuntimeError::from_memory(e, location))
    }

    fn store_place(
        &mut self,
        place: &Place,
        value: &Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.heap
            .store(place.addr, &place.ty, value)
            .map_err(|e| RuntimeError::from_memory(e, location))
    }

    fn eval_condition(&mut self, expr: &Expr) -> Result<bool, RuntimeError> {
        let value = self.eval_rvalue(expr)?;
        value.truthiness().ok_or_else(|| RuntimeError::TypeMismatch {
            message: "void value used in a condition".to_string(),
            location: expr.location(),
        })
    }

    fn eval_unary(
        &mut self,
        op: UnOp,
        operand: &Expr,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match op {
            UnOp::Neg => {
                let value = self.eval_rvalue(operand)?;
                match value {
                    Value::Float(x) => Ok(Value::Float(-x)),
                    other => match other.as_int() {
                        Some(n) => Ok(Value::Int(n.wrapping_neg())),
                        None => Err(RuntimeError::TypeMismatch {
                            message: format!("cannot negate {}", other.type_name()),
                            location,
                        }),
                    },
                }
            }

            UnOp::Not => {
                let truthy = self.eval_condition(operand)?;
                Ok(Value::Int(if truthy { 0 } else { 1 }))
            }

            UnOp::BitNot => {
                let value = self.eval_rvalue(operand)?;
                match value.as_int() {
                    Some(n) => Ok(Value::Int(!n)),
                    None => Err(RuntimeError::TypeMismatch {
                        message: format!("cannot complement {}", value.type_name()),
                        location,
                    }),
                }
            }

            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                let place = self.eval_place(operand)?;
                let old = self.load_place(&place, location)?;
                let delta = if matches!(op, UnOp::PreInc | UnOp::PostInc) {
                    BinOp::Add
                } else {
                    BinOp::Sub
                };
                let bumped = self.binary_values(delta, old.clone(), Value::Int(1), location)?;
                let converted = self.convert(bumped, &place.ty, location)?;
                self.store_place(&place, &converted, location)?;
                if matches!(op, UnOp::PreInc | UnOp::PreDec) {
                    Ok(converted)
                } else {
                    Ok(old)
                }
            }

            // handled structurally in eval_value
            UnOp::Deref | UnOp::AddrOf => unreachable!("handled by eval_value"),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        // short-circuit operators evaluate the right operand lazily
        if op == BinOp::And {
            if !self.eval_condition(left)? {
                return Ok(Value::Int(0));
            }
            return Ok(Value::Int(self.eval_condition(right)? as i64));
        }
        if op == BinOp::Or {
            if self.eval_condition(left)? {
                return Ok(Value::Int(1));
            }
            return Ok(Value::Int(self.eval_condition(right)? as i64));
        }

        let lhs = self.eval_rvalue(left)?;
        let rhs = self.eval_rvalue(right)?;
        self.binary_values(op, lhs, rhs, location)
    }

    /// Apply a (non-short-circuit) binary operator to two rvalues,
    /// following C's promotion rules.
    fn binary_values(
        &mut self,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        use BinOp::*;

        // pointer arithmetic and comparisons
        if let Value::Pointer { addr, ref pointee } = lhs {
            match (&op, &rhs) {
                (Add, _) | (Sub, _) if rhs.as_int().is_some() => {
                    let n = rhs.as_int().expect("checked by the match guard");
                    let n = if op == Sub { n.wrapping_neg() } else { n };
                    return Ok(Value::Pointer {
                        addr: pointer_offset(addr, n, pointee),
                        pointee: pointee.clone(),
                    });
                }
                (
                    Sub,
                    Value::Pointer {
                        addr: rhs_addr,
                        pointee: rhs_pointee,
                    },
                ) => {
                    if pointee != rhs_pointee {
                        return Err(RuntimeError::TypeMismatch {
                            message: format!(
                                "cannot subtract {}* from {}*",
                                rhs_pointee, pointee
                            ),
                            location,
                        });
                    }
                    return Ok(Value::Int(pointer_distance(addr, *rhs_addr, pointee)));
                }
                _ => {}
            }
        }
        if let (Add, Value::Pointer { addr, pointee }) = (&op, &rhs) {
            if let Some(n) = lhs.as_int() {
                return Ok(Value::Pointer {
                    addr: pointer_offset(*addr, n, pointee),
                    pointee: pointee.clone(),
                });
            }
        }
        if lhs.is_pointer_like() || rhs.is_pointer_like() {
            return self.compare_pointers(op, &lhs, &rhs, location);
        }

        // float promotion
        if matches!(lhs, Value::Float(_)) || matches!(rhs, Value::Float(_)) {
            let l = lhs.as_float().ok_or_else(|| RuntimeError::TypeMismatch {
                message: format!("invalid operand {} for float arithmetic", lhs.type_name()),
                location,
            })?;
            let r = rhs.as_float().ok_or_else(|| RuntimeError::TypeMismatch {
                message: format!("invalid operand {} for float arithmetic", rhs.type_name()),
                location,
            })?;
            return match op {
                Add => Ok(Value::Float(l + r)),
                Sub => Ok(Value::Float(l - r)),
                Mul => Ok(Value::Float(l * r)),
                Div => {
                    if r == 0.0 {
                        Err(RuntimeError::DivisionByZero {
                            operation: "division",
                            location,
                        })
                    } else {
                        Ok(Value::Float(l / r))
                    }
                }
                Eq => Ok(Value::Int((l == r) as i64)),
                Ne => Ok(Value::Int((l != r) as i64)),
                Lt => Ok(Value::Int((l < r) as i64)),
                Le => Ok(Value::Int((l <= r) as i64)),
                Gt => Ok(Value::Int((l > r) as i64)),
                Ge => Ok(Value::Int((l >= r) as i64)),
                Mod | BitAnd | BitOr | BitXor | Shl | Shr => Err(RuntimeError::TypeMismatch {
                    message: "operator requires integer operands".to_string(),
                    location,
                }),
                And | Or => unreachable!("short-circuit operators handled earlier"),
            };
        }

        // integer arithmetic; char promotes to int
        let l = lhs.as_int().ok_or_else(|| RuntimeError::TypeMismatch {
            message: format!("invalid operand {} for arithmetic", lhs.type_name()),
            location,
        })?;
        let r = rhs.as_int().ok_or_else(|| RuntimeError::TypeMismatch {
            message: format!("invalid operand {} for arithmetic", rhs.type_name()),
            location,
        })?;

        match op {
            Add => Ok(Value::Int(l.wrapping_add(r))),
            Sub => Ok(Value::Int(l.wrapping_sub(r))),
            Mul => Ok(Value::Int(l.wrapping_mul(r))),
            Div => {
                if r == 0 {
                    Err(RuntimeError::DivisionByZero {
                        operation: "division",
                        location,
                    })
                } else {
                    Ok(Value::Int(l.wrapping_div(r)))
                }
            }
            Mod => {
                if r == 0 {
                    Err(RuntimeError::DivisionByZero {
                        operation: "modulo",
                        location,
                    })
                } else {
                    Ok(Value::Int(l.wrapping_rem(r)))
                }
            }
            Shl | Shr => {
                if !(0..64).contains(&r) {
                    Err(RuntimeError::ShiftOutOfRange { count: r, location })
                } else if op == Shl {
                    Ok(Value::Int(l.wrapping_shl(r as u32)))
                } else {
                    Ok(Value::Int(l.wrapping_shr(r as u32)))
                }
            }
            BitAnd => Ok(Value::Int(l & r)),
            BitOr => Ok(Value::Int(l | r)),
            BitXor => Ok(Value::Int(l ^ r)),
            Eq => Ok(Value::Int((l == r) as i64)),
            Ne => Ok(Value::Int((l != r) as i64)),
            Lt => Ok(Value::Int((l < r) as i64)),
            Le => Ok(Value::Int((l <= r) as i64)),
            Gt => Ok(Value::Int((l > r) as i64)),
            Ge => Ok(Value::Int((l >= r) as i64)),
            And | Or => unreachable!("short-circuit operators handled earlier"),
        }
    }

    /// Pointer comparisons; an integer operand compares against the raw
    /// address, which covers `p == 0`.
    fn compare_pointers(
        &self,
        op: BinOp,
        lhs: &Value,
        rhs: &Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let as_addr = |v: &Value| -> Option<u64> {
            match v {
                Value::Pointer { addr, .. } => Some(*addr),
                other => other.as_int().map(|n| n as u64),
            }
        };
        let (Some(l), Some(r)) = (as_addr(lhs), as_addr(rhs)) else {
            return Err(RuntimeError::TypeMismatch {
                message: format!(
                    "invalid operands {} and {} for pointer comparison",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                location,
            });
        };

        let result = match op {
            BinOp::Eq => l == r,
            BinOp::Ne => l != r,
            BinOp::Lt => l < r,
            BinOp::Le => l <= r,
            BinOp::Gt => l > r,
            BinOp::Ge => l >= r,
            _ => {
                return Err(RuntimeError::TypeMismatch {
                    message: "invalid arithmetic on pointer operands".to_string(),
                    location,
                });
            }
        };
        Ok(Value::Int(result as i64))
    }

    fn eval_assign(
        &mut self,
        target: &Expr,
        op: Option<BinOp>,
        value: &Expr,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let place = self.eval_place(target)?;
        if place.ty.is_array() {
            return Err(RuntimeError::TypeMismatch {
                message: "cannot assign to an array".to_string(),
                location,
            });
        }

        let rhs = self.eval_rvalue(value)?;
        let new = match op {
            None => rhs,
            Some(op) => {
                let current = self.load_place(&place, location)?;
                self.binary_values(op, current, rhs, location)?
            }
        };

        let converted = self.convert(new, &place.ty, location)?;
        self.store_place(&place, &converted, location)?;
        Ok(converted)
    }

    /// Implicit conversion to a declared type, used by assignment,
    /// initialization, argument passing and `return`.
    pub(crate) fn convert(
        &self,
        value: Value,
        ty: &CType,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match ty {
            CType::Int => match value {
                Value::Float(x) => Ok(Value::Int(x as i64)),
                other => match other.as_int() {
                    Some(n) => Ok(Value::Int(n)),
                    None => Err(self.conversion_error(&other, ty, location)),
                },
            },
            CType::Char => match value {
                Value::Float(x) => Ok(Value::Char(x as i64 as u8)),
                other => match other.as_int() {
                    Some(n) => Ok(Value::Char(n as u8)),
                    None => Err(self.conversion_error(&other, ty, location)),
                },
            },
            CType::Float => match value.as_float() {
                Some(x) => Ok(Value::Float(x)),
                None => Err(self.conversion_error(&value, ty, location)),
            },
            CType::Pointer(pointee) => match value {
                Value::Pointer { addr, .. } => Ok(Value::Pointer {
                    addr,
                    pointee: (**pointee).clone(),
                }),
                // the integer constant 0 is a null pointer
                other if other.as_int() == Some(0) => Ok(Value::Pointer {
                    addr: 0,
                    pointee: (**pointee).clone(),
                }),
                other => Err(self.conversion_error(&other, ty, location)),
            },
            CType::Void => match value {
                Value::Void => Ok(Value::Void),
                other => Err(self.conversion_error(&other, ty, location)),
            },
            CType::Array(_, _) => Err(RuntimeError::TypeMismatch {
                message: "cannot convert to an array type".to_string(),
                location,
            }),
        }
    }

    fn conversion_error(
        &self,
        value: &Value,
        ty: &CType,
        location: SourceLocation,
    ) -> RuntimeError {
        RuntimeError::TypeMismatch {
            message: format!("cannot convert {} to {}", value.type_name(), ty),
            location,
        }
    }

    /// Explicit cast; more permissive than implicit conversion:
    /// pointer-to-int, int-to-pointer and pointer retagging are allowed.
    fn cast_value(
        &self,
        value: Value,
        target: &CType,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match (target, &value) {
            (CType::Int, Value::Pointer { addr, .. }) => Ok(Value::Int(*addr as i64)),
            (CType::Pointer(pointee), Value::Pointer { addr, .. }) => Ok(Value::Pointer {
                addr: *addr,
                pointee: (**pointee).clone(),
            }),
            (CType::Pointer(pointee), _) => match value.as_int() {
                Some(n) => Ok(Value::Pointer {
                    addr: n as u64,
                    pointee: (**pointee).clone(),
                }),
                None => Err(self.conversion_error(&value, target, location)),
            },
            (CType::Void, _) => Ok(Value::Void),
            _ => self.convert(value, target, location),
        }
    }

    /// Infer the static type of an expression without evaluating it.
    /// Needed by `sizeof(expr)`, which must not run its operand.
    fn infer_type(&mut self, expr: &Expr) -> Result<CType, RuntimeError> {
        match expr {
            Expr::IntLiteral(_, _) => Ok(CType::Int),
            Expr::FloatLiteral(_, _) => Ok(CType::Float),
            Expr::CharLiteral(_, _) => Ok(CType::Char),
            Expr::StringLiteral(_, _) => Ok(CType::Char.pointer_to()),

            Expr::Identifier(name, location) => match self.env.lookup(name) {
                Some(binding) => Ok(binding.ty.clone()),
                None => Err(RuntimeError::Undeclared {
                    name: name.clone(),
                    location: *location,
                }),
            },

            Expr::Unary {
                op,
                operand,
                location,
            } => match op {
                UnOp::Deref => match self.infer_type(operand)?.decayed() {
                    CType::Pointer(pointee) => Ok(*pointee),
                    other => Err(RuntimeError::TypeMismatch {
                        message: format!("cannot dereference {}", other),
                        location: *location,
                    }),
                },
                UnOp::AddrOf => Ok(self.infer_type(operand)?.decayed().pointer_to()),
                UnOp::Not => Ok(CType::Int),
                _ => self.infer_type(operand),
            },

            Expr::Binary {
                op, left, right, ..
            } => match op {
                BinOp::And
                | BinOp::Or
                | BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge => Ok(CType::Int),
                _ => {
                    let lt = self.infer_type(left)?.decayed();
                    let rt = self.infer_type(right)?.decayed();
                    if lt.is_pointer() && rt.is_pointer() {
                        Ok(CType::Int) // pointer difference
                    } else if lt.is_pointer() {
                        Ok(lt)
                    } else if rt.is_pointer() {
                        Ok(rt)
                    } else if lt == CType::Float || rt == CType::Float {
                        Ok(CType::Float)
                    } else {
                        Ok(CType::Int)
                    }
                }
            },

            Expr::Assign { target, .. } => self.infer_type(target),
            Expr::Ternary { then_expr, .. } => self.infer_type(then_expr),

            Expr::Index { base, location, .. } => match self.infer_type(base)?.decayed() {
                CType::Pointer(elem) => Ok(*elem),
                other => Err(RuntimeError::TypeMismatch {
                    message: format!("cannot index {}", other),
                    location: *location,
                }),
            },

            Expr::Call {
                callee, location, ..
            } => match self.env.function(callee) {
                Some(Callable::User(def)) => Ok(def.return_type.clone()),
                Some(Callable::Builtin(builtin)) => Ok(Self::builtin_return_type(*builtin)),
                None => Err(RuntimeError::Undeclared {
                    name: callee.clone(),
                    location: *location,
                }),
            },

            Expr::Cast { target, .. } => Ok(target.clone()),
            Expr::SizeofExpr { .. } | Expr::SizeofType { .. } => Ok(CType::Int),
        }
    }

    fn builtin_return_type(builtin: super::env::Builtin) -> CType {
        use super::env::Builtin::*;
        match builtin {
            Printf | Puts | Scanf | Strlen | Strcmp => CType::Int,
            Strcpy | Gets | Malloc | Realloc => CType::Char.pointer_to(),
            Free => CType::Void,
        }
    }

    pub(crate) fn intern_string(
        &mut self,
        s: &str,
        location: SourceLocation,
    ) -> Result<Address, RuntimeError> {
        if let Some(&addr) = self.strings.get(s) {
            return Ok(addr);
        }
        let addr = self
            .heap
            .allocate(s.len() + 1, AllocKind::Static)
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        self.heap
            .write_bytes(addr, s.as_bytes())
            .map_err(|e| RuntimeError::from_memory(e, location))?;
        self.strings.insert(s.to_string(), addr);
        Ok(addr)
    }

    fn check_cancelled(&self, location: SourceLocation) -> Result<(), RuntimeError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(RuntimeError::Interrupted { location }),
            _ => Ok(()),
        }
    }
}

impl Value {
    fn is_pointer_like(&self) -> bool {
        matches!(self, Value::Pointer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parser::Parser;

    fn run(source: &str) -> Interpreter {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(None);
        interp.run_program(&program).unwrap();
        interp
    }

    fn run_main(source: &str) -> Result<Value, RuntimeError> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interp = Interpreter::new(None);
        interp.run_program(&program)?;
        interp.call_main()
    }

    #[test]
    fn test_arithmetic_promotion() {
        let v = run_main("int main() { return 7 / 2; }").unwrap();
        assert_eq!(v, Value::Int(3));

        let v = run_main("float half() { return 7 / 2.0; } int main() { return half() == 3.5; }")
            .unwrap();
        assert_eq!(v, Value::Int(1));

        // char + char promotes to int
        let v = run_main("int main() { char a = 1; char b = 2; return a + b; }").unwrap();
        assert_eq!(v, Value::Int(3));
    }

    #[test]
    fn test_truncation_at_store() {
        let v = run_main("int main() { char c = 300; return c; }").unwrap();
        assert_eq!(v, Value::Int(44));
    }

    #[test]
    fn test_division_by_zero() {
        let err = run_main("int main() { int y = 0; return 1 / y; }").unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));

        let err = run_main("int main() { int y = 0; return 1 % y; }").unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
    }

    #[test]
    fn test_shift_out_of_range() {
        let err = run_main("int main() { return 1 << 64; }").unwrap_err();
        assert!(matches!(err, RuntimeError::ShiftOutOfRange { count: 64, .. }));

        let err = run_main("int main() { return 1 >> -1; }").unwrap_err();
        assert!(matches!(err, RuntimeError::ShiftOutOfRange { count: -1, .. }));
    }

    #[test]
    fn test_array_bounds() {
        let v = run_main("int main() { int a[3]; a[2] = 9; return a[2]; }").unwrap();
        assert_eq!(v, Value::Int(9));

        let err = run_main("int main() { int a[3]; return a[3]; }").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::IndexOutOfBounds { index: 3, len: 3, .. }
        ));

        let err = run_main("int main() { int a[3]; return a[-1]; }").unwrap_err();
        assert!(matches!(err, RuntimeError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_initializer_overflow_and_zero_fill() {
        let v = run_main("int main() { int a[4] = {1, 2}; return a[0] + a[1] + a[2] + a[3]; }")
            .unwrap();
        assert_eq!(v, Value::Int(3));

        let err = run_main("int main() { int a[2] = {1, 2, 3}; return 0; }").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InitializerOverflow { got: 3, len: 2, .. }
        ));
    }

    #[test]
    fn test_two_dimensional_arrays() {
        let v = run_main(
            "int main() { int m[2][3] = {{1, 2, 3}, {4, 5, 6}}; return m[1][2] * 10 + m[0][1]; }",
        )
        .unwrap();
        assert_eq!(v, Value::Int(62));
    }

    #[test]
    fn test_pointer_arithmetic_scaling() {
        let v = run_main(
            "int main() { int a[4] = {10, 20, 30, 40}; int *p = a; p = p + 2; return *p; }",
        )
        .unwrap();
        assert_eq!(v, Value::Int(30));

        let v = run_main(
            "int main() { int a[4]; int *p = &a[3]; int *q = &a[1]; return p - q; }",
        )
        .unwrap();
        assert_eq!(v, Value::Int(2));
    }

    #[test]
    fn test_pointer_subtraction_type_mismatch() {
        let err = run_main(
            "int main() { int a[2]; char c[2]; int *p = a; char *q = c; return p - q; }",
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_stray_control_flow() {
        let err = run_main("int main() { break; return 0; }").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::StrayControlFlow { keyword: "break", .. }
        ));

        let err = run_main("int main() { continue; return 0; }").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::StrayControlFlow { keyword: "continue", .. }
        ));
    }

    #[test]
    fn test_undeclared_and_redeclaration() {
        let err = run_main("int main() { return missing; }").unwrap_err();
        assert!(matches!(err, RuntimeError::Undeclared { .. }));

        let err = run_main("int main() { int x; int x; return 0; }").unwrap_err();
        assert!(matches!(err, RuntimeError::Redeclaration { .. }));
    }

    #[test]
    fn test_shadowing_in_nested_scope() {
        let v = run_main("int main() { int x = 1; { int x = 2; } return x; }").unwrap();
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn test_call_errors() {
        let err = run_main("int main() { return missing(); }").unwrap_err();
        assert!(matches!(err, RuntimeError::Undeclared { .. }));

        let err = run_main("int main() { int x = 1; return x(); }").unwrap_err();
        assert!(matches!(err, RuntimeError::NotAFunction { .. }));

        let err =
            run_main("int f(int a) { return a; } int main() { return f(1, 2); }").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ArityMismatch { expected: 1, got: 2, .. }
        ));
    }

    #[test]
    fn test_frame_isolation_and_fall_off() {
        // the callee cannot see the caller's locals
        let err = run_main("int f() { return x; } int main() { int x = 1; return f(); }")
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Undeclared { .. }));

        // body fall-off returns 0 for int functions
        let v = run_main("int f() { } int main() { return f(); }").unwrap();
        assert_eq!(v, Value::Int(0));
    }

    #[test]
    fn test_short_circuit() {
        // the right operand must not run when the left decides
        let source = "
            int hits = 0;
            int bump() { hits = hits + 1; return 1; }
            int main() {
                int a = 0 && bump();
                int b = 1 || bump();
                return hits * 10 + a + b;
            }
        ";
        let v = run_main(source).unwrap();
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn test_ternary_evaluates_one_branch() {
        let source = "
            int hits = 0;
            int bump(int v) { hits = hits + 1; return v; }
            int main() { int r = 1 ? bump(5) : bump(9); return hits * 10 + r; }
        ";
        let v = run_main(source).unwrap();
        assert_eq!(v, Value::Int(15));
    }

    #[test]
    fn test_sizeof_semantics() {
        let v = run_main("int main() { return sizeof(int); }").unwrap();
        assert_eq!(v, Value::Int(4));
        let v = run_main("int main() { return sizeof(char*); }").unwrap();
        assert_eq!(v, Value::Int(8));
        let v = run_main("int main() { int a[6]; return sizeof(a); }").unwrap();
        assert_eq!(v, Value::Int(24));
        // array parameters decay
        let v = run_main("int f(int a[]) { return sizeof(a); } int main() { int b[6]; return f(b); }")
            .unwrap();
        assert_eq!(v, Value::Int(8));
        // sizeof does not evaluate its operand
        let v = run_main("int hits = 0; int bump() { hits = 1; return 0; } int main() { int n = sizeof(bump()); return hits; }")
            .unwrap();
        assert_eq!(v, Value::Int(0));
    }

    #[test]
    fn test_increment_decrement() {
        let v = run_main("int main() { int x = 5; int a = x++; int b = ++x; return a * 100 + b * 10 + x; }")
            .unwrap();
        assert_eq!(v, Value::Int(5 * 100 + 7 * 10 + 7));
    }

    #[test]
    fn test_pointer_increment_scales() {
        let v = run_main(
            "int main() { int a[3] = {5, 6, 7}; int *p = a; p++; return *p; }",
        )
        .unwrap();
        assert_eq!(v, Value::Int(6));
    }

    #[test]
    fn test_null_dereference() {
        let err = run_main("int main() { int *p = 0; return *p; }").unwrap_err();
        assert!(matches!(err, RuntimeError::NullDereference { .. }));
    }

    #[test]
    fn test_globals_visible_in_functions() {
        let v = run_main(
            "int counter = 3; int bump() { counter = counter + 1; return counter; } int main() { bump(); return bump(); }",
        )
        .unwrap();
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn test_recursion_depth_limit() {
        let err = run_main("int f(int n) { return f(n + 1); } int main() { return f(0); }")
            .unwrap_err();
        assert!(matches!(err, RuntimeError::SegFault { .. }));
    }

    #[test]
    fn test_cancellation() {
        let program = Parser::new("int main() { while (1) { } return 0; }")
            .unwrap()
            .parse_program()
            .unwrap();
        let mut interp = Interpreter::new(None);
        let token = CancelToken::new();
        interp.set_cancel_token(token.clone());
        token.cancel();
        interp.run_program(&program).unwrap();
        let err = interp.call_main().unwrap_err();
        assert!(matches!(err, RuntimeError::Interrupted { .. }));
    }

    #[test]
    fn test_scope_storage_released() {
        let mut interp = run(
            "int scratch() { { int a[100]; a[0] = 1; } return 0; } int main() { return scratch(); }",
        );
        interp.call_main().unwrap();
        // no globals and no string literals here, so every frame byte must
        // have been handed back after main returned
        assert_eq!(interp.heap().live_bytes(), 0);
    }
}
