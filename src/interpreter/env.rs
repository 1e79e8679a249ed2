//! Lexical environment: scopes, call frames and the function table
//!
//! Frames form a stack; each frame holds a stack of scopes; each scope maps
//! identifiers to bindings. Lookup walks the scopes of the *current* frame
//! outward and then consults the globals, never the caller's locals. The
//! function table is global only and holds both user definitions and
//! builtin handles.
//!
//! Every scope also records the frame-storage addresses allocated for its
//! variables, so scope exit can hand them back to the memory model.

use super::errors::RuntimeError;
use crate::memory::value::Address;
use crate::parser::ast::{CType, FunctionDef, SourceLocation};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// A declared variable: its type and where it lives.
#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: CType,
    pub addr: Address,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    bindings: FxHashMap<String, Binding>,
    storage: Vec<Address>,
}

/// A call frame: the activation record of one function call.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function: String,
    pub return_type: CType,
    scopes: Vec<Scope>,
}

impl Frame {
    fn new(function: String, return_type: CType) -> Self {
        Frame {
            function,
            return_type,
            // every frame starts with its parameter scope
            scopes: vec![Scope::default()],
        }
    }
}

/// Builtin function handles, stored in the function table next to user
/// definitions so a call site dispatches with a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Printf,
    Puts,
    Scanf,
    Gets,
    Strlen,
    Strcpy,
    Strcmp,
    Malloc,
    Free,
    Realloc,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Printf => "printf",
            Builtin::Puts => "puts",
            Builtin::Scanf => "scanf",
            Builtin::Gets => "gets",
            Builtin::Strlen => "strlen",
            Builtin::Strcpy => "strcpy",
            Builtin::Strcmp => "strcmp",
            Builtin::Malloc => "malloc",
            Builtin::Free => "free",
            Builtin::Realloc => "realloc",
        }
    }

    fn all() -> &'static [Builtin] {
        &[
            Builtin::Printf,
            Builtin::Puts,
            Builtin::Scanf,
            Builtin::Gets,
            Builtin::Strlen,
            Builtin::Strcpy,
            Builtin::Strcmp,
            Builtin::Malloc,
            Builtin::Free,
            Builtin::Realloc,
        ]
    }
}

/// An entry in the function table
#[derive(Debug, Clone)]
pub enum Callable {
    User(Rc<FunctionDef>),
    Builtin(Builtin),
}

/// The whole lexical environment of one interpretation context
#[derive(Debug, Clone)]
pub struct Env {
    globals: Scope,
    functions: FxHashMap<String, Callable>,
    frames: Vec<Frame>,
}

impl Env {
    pub fn new() -> Self {
        let mut functions = FxHashMap::default();
        for &builtin in Builtin::all() {
            functions.insert(builtin.name().to_string(), Callable::Builtin(builtin));
        }
        Env {
            globals: Scope::default(),
            functions,
            frames: Vec::new(),
        }
    }

    /// Declare a name in the innermost scope (or globals outside any
    /// frame). Fails if the name is already bound in that same scope.
    pub fn declare(
        &mut self,
        name: &str,
        binding: Binding,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let scope = self.innermost_scope_mut();
        if scope.bindings.contains_key(name) {
            return Err(RuntimeError::Redeclaration {
                name: name.to_string(),
                location,
            });
        }
        scope.bindings.insert(name.to_string(), binding);
        Ok(())
    }

    /// Record a frame-storage address owned by the innermost scope.
    pub fn record_storage(&mut self, addr: Address) {
        self.innermost_scope_mut().storage.push(addr);
    }

    /// Look a name up in the current frame's scopes (innermost first),
    /// then in the globals. Lower frames are invisible.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        if let Some(frame) = self.frames.last() {
            for scope in frame.scopes.iter().rev() {
                if let Some(binding) = scope.bindings.get(name) {
                    return Some(binding);
                }
            }
        }
        self.globals.bindings.get(name)
    }

    /// Register a user function. Redefinition (including shadowing a
    /// builtin) is an error.
    pub fn define_function(&mut self, def: FunctionDef) -> Result<(), RuntimeError> {
        if self.functions.contains_key(&def.name) {
            return Err(RuntimeError::Redeclaration {
                name: def.name.clone(),
                location: def.location,
            });
        }
        self.functions
            .insert(def.name.clone(), Callable::User(Rc::new(def)));
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<&Callable> {
        self.functions.get(name)
    }

    pub fn push_frame(&mut self, function: String, return_type: CType) {
        self.frames.push(Frame::new(function, return_type));
    }

    /// Pop the current frame, returning every storage address it owned.
    pub fn pop_frame(&mut self) -> Vec<Address> {
        match self.frames.pop() {
            Some(frame) => frame
                .scopes
                .into_iter()
                .flat_map(|scope| scope.storage)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn push_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.push(Scope::default());
        } else {
            // block scopes of top-level REPL statements
            self.frames.push(Frame::new(String::new(), CType::Void));
        }
    }

    /// Pop the innermost scope, returning its storage addresses.
    pub fn pop_scope(&mut self) -> Vec<Address> {
        if let Some(frame) = self.frames.last_mut() {
            if frame.scopes.len() > 1 {
                return frame.scopes.pop().map(|s| s.storage).unwrap_or_default();
            }
            // last scope of a synthetic top-level frame
            if frame.function.is_empty() {
                return self.pop_frame();
            }
        }
        Vec::new()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    fn innermost_scope_mut(&mut self) -> &mut Scope {
        match self.frames.last_mut() {
            Some(frame) => frame
                .scopes
                .last_mut()
                .expect("frame always has at least one scope"),
            None => &mut self.globals,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(addr: Address) -> Binding {
        Binding {
            ty: CType::Int,
            addr,
        }
    }

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    #[test]
    fn test_globals_and_frame_lookup() {
        let mut env = Env::new();
        env.declare("g", binding(0x1000), loc()).unwrap();

        env.push_frame("f".to_string(), CType::Int);
        env.declare("x", binding(0x2000), loc()).unwrap();

        assert_eq!(env.lookup("x").unwrap().addr, 0x2000);
        // globals remain visible from inside a frame
        assert_eq!(env.lookup("g").unwrap().addr, 0x1000);
    }

    #[test]
    fn test_caller_locals_are_invisible() {
        let mut env = Env::new();
        env.push_frame("caller".to_string(), CType::Int);
        env.declare("x", binding(0x2000), loc()).unwrap();

        env.push_frame("callee".to_string(), CType::Int);
        assert!(env.lookup("x").is_none());

        env.pop_frame();
        assert_eq!(env.lookup("x").unwrap().addr, 0x2000);
    }

    #[test]
    fn test_shadowing_across_scopes() {
        let mut env = Env::new();
        env.push_frame("f".to_string(), CType::Int);
        env.declare("x", binding(0x2000), loc()).unwrap();

        env.push_scope();
        env.declare("x", binding(0x3000), loc()).unwrap();
        assert_eq!(env.lookup("x").unwrap().addr, 0x3000);

        env.pop_scope();
        assert_eq!(env.lookup("x").unwrap().addr, 0x2000);
    }

    #[test]
    fn test_redeclaration_in_same_scope_fails() {
        let mut env = Env::new();
        env.push_frame("f".to_string(), CType::Int);
        env.declare("x", binding(0x2000), loc()).unwrap();
        assert!(matches!(
            env.declare("x", binding(0x3000), loc()),
            Err(RuntimeError::Redeclaration { .. })
        ));
    }

    #[test]
    fn test_scope_storage_released_on_pop() {
        let mut env = Env::new();
        env.push_frame("f".to_string(), CType::Int);
        env.record_storage(0x2000);
        env.push_scope();
        env.record_storage(0x3000);

        assert_eq!(env.pop_scope(), vec![0x3000]);
        assert_eq!(env.pop_frame(), vec![0x2000]);
    }

    #[test]
    fn test_builtins_preregistered_and_protected() {
        let mut env = Env::new();
        assert!(matches!(
            env.function("printf"),
            Some(Callable::Builtin(Builtin::Printf))
        ));

        let def = FunctionDef {
            name: "malloc".to_string(),
            params: vec![],
            return_type: CType::Int,
            body: vec![],
            location: loc(),
        };
        assert!(matches!(
            env.define_function(def),
            Err(RuntimeError::Redeclaration { .. })
        ));
    }
}
