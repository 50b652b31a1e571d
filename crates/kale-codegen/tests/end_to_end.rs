// Integration tests: compile kale programs with the JIT and check the values
// they produce.
use kale_codegen::{jit_module, object_module, CompileError, CompileOptions, Compiler};
use kale_parser::Form;
use kale_reader::Interner;
use pretty_assertions::assert_eq;
use test_case::test_case;

fn parse_all(src: &str, interner: &mut Interner) -> Vec<Form> {
    kale_reader::read_all(src, interner)
        .unwrap_or_else(|e| panic!("read error in {:?}: {}", src, e))
        .iter()
        .map(|d| kale_parser::parse(d, interner).unwrap_or_else(|e| panic!("{}", e)))
        .collect()
}

fn run_with(src: &str, options: CompileOptions) -> Result<String, CompileError> {
    let mut interner = Interner::new();
    let mut forms = parse_all(src, &mut interner);
    let module = jit_module(&options)?;
    let mut compiler = Compiler::new(module, &mut interner, options)?;
    compiler.compile_program(&mut forms)?;
    let value = compiler.finalize()?.run()?;
    Ok(value.to_string())
}

fn run(src: &str) -> String {
    run_with(src, CompileOptions::default()).unwrap_or_else(|e| panic!("{}: {}", src, e))
}

fn compile_error(src: &str) -> CompileError {
    match run_with(src, CompileOptions::default()) {
        Ok(v) => panic!("{} compiled and produced {}", src, v),
        Err(e) => e,
    }
}

const EVEN_ODD: &str = "
(letrec ((even (n) (if (equal n 0) 't (odd (sub n 1))))
         (odd (n) (if (equal n 0) nil (even (sub n 1)))))
  (even 10))";

// ─── Basic forms ──────────────────────────────────────────────────────

#[test_case("42", "42" ; "integer literal")]
#[test_case("(add 1 2)", "3" ; "add")]
#[test_case("(sub 1 3)", "-2" ; "sub")]
#[test_case("(mul 4 2.5)", "10" ; "mul")]
#[test_case("(div 1 2)", "0.5" ; "div")]
#[test_case("'sym", "sym" ; "quoted symbol")]
#[test_case("nil", "nil" ; "nil")]
#[test_case("'(1 (2 . 3) x)", "(1 (2 . 3) x)" ; "quoted structure")]
#[test_case("(cons 1 (cons 2 nil))", "(1 2)" ; "cons builds lists")]
#[test_case("(car (cdr '(1 2 3)))", "2" ; "car of cdr")]
#[test_case("(print 7)", "7" ; "print returns its argument")]
fn evaluates(src: &str, expected: &str) {
    assert_eq!(run(src), expected);
}

#[test_case("(if 0 'a 'b)", "a" ; "zero is true")]
#[test_case("(if nil 'a 'b)", "b" ; "nil is false")]
#[test_case("(if '(1) 'a 'b)", "a" ; "non-empty list is true")]
#[test_case("(if (equal 1 2) 'a 'b)", "b" ; "failed comparison is false")]
fn only_nil_is_false(src: &str, expected: &str) {
    assert_eq!(run(src), expected);
}

#[test_case("(equal '(1 2 3) (cons 1 (cons 2 (cons 3 nil))))", "t" ; "quoted and built lists")]
#[test_case("(equal 'a 'a)", "t" ; "same symbol")]
#[test_case("(equal 'a 'b)", "nil" ; "different symbols")]
#[test_case("(equal '(1 2) '(1 2 3))", "nil" ; "different lengths")]
fn structural_equality(src: &str, expected: &str) {
    assert_eq!(run(src), expected);
}

#[test]
fn let_bindings_see_earlier_ones() {
    assert_eq!(run("(let ((x 1)) (let ((x 2) (y x)) y))"), "2");
    assert_eq!(run("(let ((x 1) (x (add x 1))) x)"), "2");
}

#[test]
fn top_level_forms_run_in_order() {
    assert_eq!(run("(add 1 2) 'done"), "done");
    assert_eq!(run(""), "nil");
}

// ─── letrec ───────────────────────────────────────────────────────────

#[test]
fn mutual_recursion() {
    assert_eq!(run(EVEN_ODD), "t");
}

#[test]
fn mutual_recursion_with_captured_variable() {
    let src = "
(let ((z 100))
  (letrec ((f (n) (if (equal n 0) z (g (sub n 1))))
           (g (n) (f n)))
    (f 3)))";
    assert_eq!(run(src), "100");
}

#[test]
fn letrec_arity_is_checked() {
    let src = "(letrec ((f (a b) (add a b))) (f 1))";
    assert!(matches!(
        compile_error(src),
        CompileError::ArityMismatch { ref name, expected: 2, found: 1 } if name == "f"
    ));
    let src = "(letrec ((f (a b) (add a b))) (f 1 2 3))";
    assert!(matches!(
        compile_error(src),
        CompileError::ArityMismatch { expected: 2, found: 3, .. }
    ));
    assert_eq!(run("(letrec ((f (a b) (add a b))) (f 1 2))"), "3");
}

#[test]
fn global_arity_is_checked() {
    assert!(matches!(
        compile_error("(car '(1) '(2))"),
        CompileError::ArityMismatch { ref name, expected: 1, found: 2 } if name == "car"
    ));
}

fn compile_single(src: &str, interner: &mut Interner) -> Form {
    let mut forms = parse_all(src, interner);
    let options = CompileOptions::default();
    let module = jit_module(&options).unwrap();
    let mut compiler = Compiler::new(module, interner, options).unwrap();
    compiler.compile(&mut forms[0]).unwrap();
    forms.remove(0)
}

fn letrec_params(form: &Form) -> Vec<kale_reader::Symbol> {
    match form {
        Form::Let { body, .. } => letrec_params(body),
        Form::Letrec { bindings, .. } => bindings[0].parameters.clone(),
        other => panic!("no letrec in {:?}", other),
    }
}

#[test]
fn captured_variables_become_trailing_parameters() {
    let mut interner = Interner::new();
    let n = interner.intern("n");
    let k = interner.intern("k");
    let src = "(let ((k 10)) (letrec ((f (n) (add n k))) (f 5)))";
    let form = compile_single(src, &mut interner);
    let params = letrec_params(&form);
    assert_eq!(params.len(), 2);
    assert_eq!(params[0], n);
    assert_ne!(params[1], k);
    assert!(interner.name(params[1]).starts_with("k#"), "{:?}", params);
    assert_eq!(run(src), "15");
}

#[test]
fn declared_parameter_wins_over_capture() {
    let src = "(let ((n 5)) (letrec ((f (n) n) (g () (add n (f 3)))) (g)))";
    assert_eq!(run(src), "8");
}

#[test_case("(let ((k 1)) (letrec ((f () k)) ((lambda (k) (f)) 2)))", "1" ; "lambda parameter")]
#[test_case("(let ((k 1)) (letrec ((f () k)) (let ((k 2)) (f))))", "1" ; "inner let")]
#[test_case("(let ((k 1)) (letrec ((f () k) (g (k) (f))) (g 2)))", "1" ; "sibling parameter")]
#[test_case("(let ((k 1)) (letrec ((f () k)) (letrec ((h (k) (f))) (h 2))))", "1" ; "inner letrec parameter")]
fn captures_are_not_shadowed_at_call_sites(src: &str, expected: &str) {
    assert_eq!(run(src), expected);
}

#[test]
fn functions_are_not_captured() {
    let mut interner = Interner::new();
    let n = interner.intern("n");
    let src = "(letrec ((f (n) (if n (f (cdr n)) 0))) (f (quote (1 2))))";
    let form = compile_single(src, &mut interner);
    assert_eq!(letrec_params(&form), vec![n]);
    assert_eq!(run(src), "0");
}

#[test]
fn inner_letrec_captures_outer_parameter() {
    let src = "
(letrec ((outer (x)
           (letrec ((inner (y) (add x y)))
             (inner 1))))
  (outer 41))";
    assert_eq!(run(src), "42");
}

// ─── lambda ───────────────────────────────────────────────────────────

#[test_case("((lambda (x) (mul x x)) 4)", "16" ; "immediate application")]
#[test_case("((lambda () 'k))", "k" ; "zero arguments")]
#[test_case("(let ((x 5)) ((lambda (y) (add x y)) 1))", "6" ; "captures let variable")]
#[test_case("(((lambda (a) (lambda (b) (sub a b))) 10) 4)", "6" ; "nested closures")]
#[test_case("(letrec ((adder (n) (lambda (m) (add n m)))) ((adder 2) 3))", "5" ; "returned from letrec")]
#[test_case("(letrec ((sq (x) (mul x x))) ((lambda (y) (sq y)) 3))", "9" ; "calls letrec function directly")]
#[test_case("(lambda (x y) x)", "#<closure/2>" ; "closure value")]
fn closures(src: &str, expected: &str) {
    assert_eq!(run(src), expected);
}

#[test]
fn closures_keep_their_captured_values() {
    let src = "
(letrec ((make (n) (lambda () n))
         (collect (n acc)
           (if (equal n 0) acc (collect (sub n 1) (cons (make n) acc))))
         (call-all (fs)
           (if fs (cons ((car fs)) (call-all (cdr fs))) nil)))
  (call-all (collect 3 nil)))";
    assert_eq!(run(src), "(1 2 3)");
}

#[test]
fn one_trampoline_per_arity() {
    let src = "
(let ((f (lambda (x) x))
      (g (lambda (a b) (cons a b))))
  (cons (f 1) (g (f 2) 3)))";
    let mut interner = Interner::new();
    let mut forms = parse_all(src, &mut interner);
    let options = CompileOptions::default();
    let module = jit_module(&options).unwrap();
    let mut compiler = Compiler::new(module, &mut interner, options).unwrap();
    compiler.compile_program(&mut forms).unwrap();

    assert_eq!(compiler.trampolines().len(), 2);
    assert_eq!(compiler.trampolines().arities().collect::<Vec<_>>(), vec![1, 2]);
    let value = compiler.finalize().unwrap().run().unwrap();
    assert_eq!(value.to_string(), "(1 2 . 3)");
}

// ─── Errors ───────────────────────────────────────────────────────────

#[test]
fn unbound_variables_are_reported() {
    assert!(matches!(
        compile_error("(add x 1)"),
        CompileError::UnboundVariable(ref n) if n == "x"
    ));
    assert!(matches!(
        compile_error("(lambda () (h 1))"),
        CompileError::UnboundVariable(ref n) if n == "h"
    ));
}

#[test]
fn functions_are_not_values() {
    assert!(matches!(
        compile_error("(letrec ((f () 1)) f)"),
        CompileError::NotAValue(ref n) if n == "f"
    ));
    assert!(matches!(
        compile_error("(cons add nil)"),
        CompileError::NotAValue(ref n) if n == "add"
    ));
}

// ─── Backends ─────────────────────────────────────────────────────────

#[test]
fn optimized_code_agrees() {
    let options = CompileOptions::optimized();
    assert_eq!(run_with(EVEN_ODD, options).unwrap(), "t");
    assert_eq!(
        run_with("(let ((x 5)) ((lambda (y) (add x y)) 1))", options).unwrap(),
        "6"
    );
}

#[test]
fn ir_dump_does_not_change_results() {
    let options = CompileOptions {
        dump_ir: true,
        ..CompileOptions::default()
    };
    assert_eq!(run_with("(add 40 2)", options).unwrap(), "42");
}

#[test]
fn object_file_is_emitted() {
    let mut interner = Interner::new();
    let mut forms = parse_all(EVEN_ODD, &mut interner);
    let options = CompileOptions::default();
    let module = object_module(&options, "even_odd").unwrap();
    let mut compiler = Compiler::new(module, &mut interner, options).unwrap();
    compiler.compile_program(&mut forms).unwrap();
    let bytes = compiler.finalize().unwrap().emit().unwrap();
    assert!(!bytes.is_empty());
}
