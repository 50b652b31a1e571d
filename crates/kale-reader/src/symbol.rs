//! Symbol interning.
//!
//! Every identifier the reader sees goes through an [`Interner`], which hands
//! out small `Copy` handles. Two interned handles are equal iff they name the
//! same text, so the rest of the compiler compares, hashes and orders symbols
//! without ever touching the strings. [`Interner::gensym`] makes handles that
//! no source text can name.

use std::collections::HashMap;
use std::fmt;

/// Interned identifier handle.
///
/// Ordering follows interning order, which keeps any iteration over a set of
/// symbols deterministic for a given input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owned interning table. Lives for a whole compilation run and is passed by
/// reference to whoever needs to create or name symbols.
#[derive(Default, Clone)]
pub struct Interner {
    names: Vec<Box<str>>,
    lookup: HashMap<Box<str>, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(name) {
            return sym;
        }
        let sym = Symbol(self.names.len() as u32);
        self.names.push(name.into());
        self.lookup.insert(name.into(), sym);
        sym
    }

    /// A fresh symbol distinct from every other, interned or not. Its name
    /// is `base#N`, which is for display only: it is never entered in the
    /// lookup table, so reading that text yields a different symbol.
    pub fn gensym(&mut self, base: &str) -> Symbol {
        let sym = Symbol(self.names.len() as u32);
        self.names.push(format!("{}#{}", base, sym.0).into());
        sym
    }

    /// Look up a symbol without interning it.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, sym: Symbol) -> &str {
        &self.names[sym.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_handle() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        let c = interner.intern("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.name(b), "bar");
    }

    #[test]
    fn order_is_interning_order() {
        let mut interner = Interner::new();
        let z = interner.intern("z");
        let a = interner.intern("a");
        assert!(z < a);
        assert_eq!(interner.get("a"), Some(a));
        assert_eq!(interner.get("missing"), None);
    }

    #[test]
    fn gensyms_are_unreadable() {
        let mut interner = Interner::new();
        let k = interner.intern("k");
        let g1 = interner.gensym("k");
        let g2 = interner.gensym("k");
        assert_ne!(g1, k);
        assert_ne!(g1, g2);
        assert_eq!(interner.name(g1), "k#1");
        assert_eq!(interner.get("k#1"), None);
        assert_ne!(interner.intern("k#1"), g1);
    }
}
