//! Capture rewriting for `letrec` functions.
//!
//! A letrec routine receives its captured variables as extra trailing
//! parameters, so every direct call to it has to pass them. This pass appends
//! one symbol reference per captured variable to each application whose
//! callee is the target binder, and stops wherever the target is rebound.
//! It runs before any code is generated for the letrec.

use kale_parser::{Form, FunctionBinding};
use kale_reader::Symbol;

/// Append `captures` to every direct call of `target` inside `form`.
pub fn inject_captures(form: &mut Form, target: Symbol, captures: &[Symbol]) {
    match form {
        Form::Number(_) | Form::Symbol(_) | Form::Quote(_) => {}
        Form::If {
            cond,
            then,
            otherwise,
        } => {
            inject_captures(cond, target, captures);
            inject_captures(then, target, captures);
            inject_captures(otherwise, target, captures);
        }
        Form::Application { callee, args } => {
            for arg in args.iter_mut() {
                inject_captures(arg, target, captures);
            }
            if callee.as_symbol() == Some(target) {
                args.extend(captures.iter().map(|&s| Form::Symbol(s)));
            } else {
                inject_captures(callee, target, captures);
            }
        }
        Form::Let { bindings, body } => {
            for binding in bindings.iter_mut() {
                inject_captures(&mut binding.definition, target, captures);
                if binding.binder == target {
                    return;
                }
            }
            inject_captures(body, target, captures);
        }
        Form::Letrec { bindings, body } => {
            if bindings.iter().any(|b| b.binder == target) {
                return;
            }
            for binding in bindings.iter_mut() {
                inject_into_binding(binding, target, captures);
            }
            inject_captures(body, target, captures);
        }
        Form::Lambda { params, body } => {
            if !params.contains(&target) {
                inject_captures(body, target, captures);
            }
        }
    }
}

/// Rewrite one letrec definition, unless its own parameters shadow `target`.
pub fn inject_into_binding(binding: &mut FunctionBinding, target: Symbol, captures: &[Symbol]) {
    if !binding.parameters.contains(&target) {
        inject_captures(&mut binding.definition, target, captures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kale_reader::Interner;
    use pretty_assertions::assert_eq;

    fn parse(src: &str, interner: &mut Interner) -> Form {
        let datum = kale_reader::read(src, interner).unwrap();
        kale_parser::parse(&datum, interner).unwrap()
    }

    fn check(src: &str, target: &str, captures: &[&str], expected: &str) {
        let mut interner = Interner::new();
        let mut form = parse(src, &mut interner);
        let want = parse(expected, &mut interner);
        let target = interner.intern(target);
        let captures: Vec<Symbol> = captures.iter().map(|c| interner.intern(c)).collect();
        inject_captures(&mut form, target, &captures);
        assert_eq!(form, want);
    }

    #[test]
    fn appends_to_direct_calls() {
        check("(f (f 1))", "f", &["a", "b"], "(f (f 1 a b) a b)");
    }

    #[test]
    fn leaves_other_callees_and_references_alone() {
        check("(g f (h 1))", "f", &["a"], "(g f (h 1))");
    }

    #[test]
    fn descends_into_if_and_computed_callees() {
        check(
            "(if (f) ((lambda () (f)) ) 0)",
            "f",
            &["a"],
            "(if (f a) ((lambda () (f a))) 0)",
        );
    }

    #[test]
    fn let_stops_after_shadowing_definition() {
        check(
            "(let ((x (f)) (f (f)) (y (f))) (f))",
            "f",
            &["a"],
            "(let ((x (f a)) (f (f a)) (y (f))) (f))",
        );
    }

    #[test]
    fn letrec_rebinding_target_is_skipped() {
        check(
            "(letrec ((f () 1)) (f))",
            "f",
            &["a"],
            "(letrec ((f () 1)) (f))",
        );
    }

    #[test]
    fn nested_letrec_rewrites_definitions_and_body() {
        check(
            "(letrec ((g () (f)) (h (f) (f))) (f))",
            "f",
            &["a"],
            "(letrec ((g () (f a)) (h (f) (f))) (f a))",
        );
    }

    #[test]
    fn lambda_parameter_shadows_target() {
        check("(lambda (f) (f))", "f", &["a"], "(lambda (f) (f))");
    }
}
