//! Free-variable analysis.
//!
//! Each sub-form's set is computed on its own and the results are unioned;
//! a binder only removes symbols from the sets of the construct that binds
//! it. Sets are `BTreeSet`s so iteration follows interning order, which keeps
//! the order of injected parameters and environment slots stable.

use std::collections::BTreeSet;

use kale_parser::{Form, FunctionBinding};
use kale_reader::Symbol;

pub type FreeVars = BTreeSet<Symbol>;

/// Symbols referenced in `form` that are neither global nor bound inside
/// `form` itself.
pub fn free_vars(form: &Form, is_global: &dyn Fn(Symbol) -> bool) -> FreeVars {
    match form {
        Form::Number(_) | Form::Quote(_) => FreeVars::new(),
        Form::Symbol(s) => {
            let mut set = FreeVars::new();
            if !is_global(*s) {
                set.insert(*s);
            }
            set
        }
        Form::If {
            cond,
            then,
            otherwise,
        } => {
            let mut set = free_vars(cond, is_global);
            set.extend(free_vars(then, is_global));
            set.extend(free_vars(otherwise, is_global));
            set
        }
        Form::Application { callee, args } => {
            let mut set = free_vars(callee, is_global);
            for arg in args {
                set.extend(free_vars(arg, is_global));
            }
            set
        }
        // Nested single bindings, innermost first: a binder hides itself from
        // the body and from every later definition.
        Form::Let { bindings, body } => {
            let mut set = free_vars(body, is_global);
            for binding in bindings.iter().rev() {
                set.remove(&binding.binder);
                set.extend(free_vars(&binding.definition, is_global));
            }
            set
        }
        Form::Letrec { bindings, body } => {
            let mut set = free_vars(body, is_global);
            set.extend(binding_free_vars(bindings, is_global));
            for binding in bindings {
                set.remove(&binding.binder);
            }
            set
        }
        Form::Lambda { params, body } => lambda_free_vars(params, body, is_global),
    }
}

/// Free variables of a letrec's definitions alone, ignoring its body.
pub fn letrec_free_vars(
    bindings: &[FunctionBinding],
    is_global: &dyn Fn(Symbol) -> bool,
) -> FreeVars {
    let mut set = binding_free_vars(bindings, is_global);
    for binding in bindings {
        set.remove(&binding.binder);
    }
    set
}

/// Free variables of `(lambda params body)`.
pub fn lambda_free_vars(
    params: &[Symbol],
    body: &Form,
    is_global: &dyn Fn(Symbol) -> bool,
) -> FreeVars {
    let mut set = free_vars(body, is_global);
    for p in params {
        set.remove(p);
    }
    set
}

fn binding_free_vars(bindings: &[FunctionBinding], is_global: &dyn Fn(Symbol) -> bool) -> FreeVars {
    let mut set = FreeVars::new();
    for binding in bindings {
        let mut own = free_vars(&binding.definition, is_global);
        for p in &binding.parameters {
            own.remove(p);
        }
        set.extend(own);
    }
    set
}
