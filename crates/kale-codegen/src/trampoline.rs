//! Closure-call trampolines, one per argument count.

use std::collections::BTreeMap;

use cranelift_module::FuncId;

/// Link name of the trampoline for `arity` arguments.
pub fn trampoline_name(arity: usize) -> String {
    format!("kale_call_closure_{}", arity)
}

/// Routines generated so far, keyed by arity. Never invalidated.
#[derive(Debug, Default)]
pub struct TrampolineCache {
    by_arity: BTreeMap<usize, FuncId>,
}

impl TrampolineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, arity: usize) -> Option<FuncId> {
        self.by_arity.get(&arity).copied()
    }

    /// Record the routine for `arity`. The first routine recorded for an
    /// arity is kept.
    pub fn insert(&mut self, arity: usize, id: FuncId) -> FuncId {
        *self.by_arity.entry(arity).or_insert(id)
    }

    pub fn len(&self) -> usize {
        self.by_arity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_arity.is_empty()
    }

    /// Arities with a generated trampoline, ascending.
    pub fn arities(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_arity.keys().copied()
    }
}
