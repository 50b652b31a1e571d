//! Nested-scope symbol table.

use std::collections::HashMap;

use cranelift_module::FuncId;
use kale_reader::Symbol;

/// A routine with a fixed arity that can be called directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionRef {
    pub id: FuncId,
    pub arity: usize,
}

/// What a symbol resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<V> {
    /// An already generated run-time value.
    Value(V),
    Function(FunctionRef),
}

/// Stack of lexical scopes, innermost last, over a flat global table.
#[derive(Debug)]
pub struct ScopeEnv<V> {
    scopes: Vec<HashMap<Symbol, Entry<V>>>,
    globals: HashMap<Symbol, Entry<V>>,
}

impl<V> Default for ScopeEnv<V> {
    fn default() -> Self {
        ScopeEnv {
            scopes: Vec::new(),
            globals: HashMap::new(),
        }
    }
}

impl<V> ScopeEnv<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_global(&mut self, sym: Symbol, entry: Entry<V>) {
        self.globals.insert(sym, entry);
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Bind `sym` in the innermost scope, or globally when none is open.
    pub fn bind(&mut self, sym: Symbol, entry: Entry<V>) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(sym, entry);
            }
            None => self.define_global(sym, entry),
        }
    }

    pub fn lookup(&self, sym: Symbol) -> Option<&Entry<V>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&sym))
            .or_else(|| self.globals.get(&sym))
    }

    /// True when `sym` resolves to the global table, i.e. it is global and
    /// no open scope shadows it.
    pub fn is_global(&self, sym: Symbol) -> bool {
        self.globals.contains_key(&sym) && !self.scopes.iter().any(|s| s.contains_key(&sym))
    }
}
