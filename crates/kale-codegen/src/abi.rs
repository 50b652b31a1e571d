//! Machine-level calling convention shared by generated code and
//! `kale-runtime`.
//!
//! A kale value crosses every call boundary as two `i64` words, `(tag, data)`,
//! which is how the C ABI passes and returns a 16-byte `repr(C)` struct of
//! that shape.

use cranelift_codegen::ir::{types, AbiParam, Signature, Type};

/// The pointer type on the target (always 64-bit for now).
pub const PTR: Type = types::I64;

/// One argument or result slot of a runtime primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    /// A kale value, two `i64` words.
    Value,
    F64,
    I64,
    Ptr,
    /// A C `bool`-ish `i8`.
    Flag,
}

impl Word {
    fn push_to(self, list: &mut Vec<AbiParam>) {
        match self {
            Word::Value => {
                list.push(AbiParam::new(types::I64));
                list.push(AbiParam::new(types::I64));
            }
            Word::F64 => list.push(AbiParam::new(types::F64)),
            Word::I64 => list.push(AbiParam::new(types::I64)),
            Word::Ptr => list.push(AbiParam::new(PTR)),
            Word::Flag => list.push(AbiParam::new(types::I8)),
        }
    }
}

/// Fill in `sig` with the given parameter and result slots.
pub fn fill_signature(sig: &mut Signature, params: &[Word], returns: &[Word]) {
    for p in params {
        p.push_to(&mut sig.params);
    }
    for r in returns {
        r.push_to(&mut sig.returns);
    }
}

/// Signature of a compiled kale routine: an optional leading environment
/// pointer, then `arity` values, returning one value.
pub fn fill_routine_signature(sig: &mut Signature, with_env: bool, arity: usize) {
    if with_env {
        Word::Ptr.push_to(&mut sig.params);
    }
    for _ in 0..arity {
        Word::Value.push_to(&mut sig.params);
    }
    Word::Value.push_to(&mut sig.returns);
}

/// An `extern "C"` function exported by `kale-runtime`.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeFunc {
    pub name: &'static str,
    pub params: &'static [Word],
    pub returns: &'static [Word],
}

const fn rt(name: &'static str, params: &'static [Word], returns: &'static [Word]) -> RuntimeFunc {
    RuntimeFunc {
        name,
        params,
        returns,
    }
}

use Word::{Flag, Ptr, Value, F64, I64};

/// Every runtime primitive generated code may call.
pub const RUNTIME_FUNCS: &[RuntimeFunc] = &[
    rt("kale_make_number", &[F64], &[Value]),
    rt("kale_make_symbol", &[Ptr, I64], &[Value]),
    rt("kale_is_nil", &[Value], &[Flag]),
    rt("kale_add", &[Value, Value], &[Value]),
    rt("kale_sub", &[Value, Value], &[Value]),
    rt("kale_mul", &[Value, Value], &[Value]),
    rt("kale_div", &[Value, Value], &[Value]),
    rt("kale_print", &[Value], &[Value]),
    rt("kale_equal", &[Value, Value], &[Value]),
    rt("kale_cons", &[Value, Value], &[Value]),
    rt("kale_car", &[Value], &[Value]),
    rt("kale_cdr", &[Value], &[Value]),
    rt("kale_make_closure", &[Ptr, Ptr, I64, I64], &[Value]),
    rt("kale_closure_code", &[Value, I64], &[Ptr]),
    rt("kale_closure_env", &[Value], &[Ptr]),
    rt("kale_env_slot", &[Ptr, I64], &[Value]),
];

/// A name visible everywhere, bound to a runtime primitive that takes and
/// returns only values.
#[derive(Debug, Clone, Copy)]
pub struct Global {
    pub name: &'static str,
    pub link_name: &'static str,
    pub arity: usize,
}

const fn global(name: &'static str, link_name: &'static str, arity: usize) -> Global {
    Global {
        name,
        link_name,
        arity,
    }
}

pub const GLOBALS: &[Global] = &[
    global("add", "kale_add", 2),
    global("sub", "kale_sub", 2),
    global("mul", "kale_mul", 2),
    global("div", "kale_div", 2),
    global("cons", "kale_cons", 2),
    global("equal", "kale_equal", 2),
    global("car", "kale_car", 1),
    global("cdr", "kale_cdr", 1),
    global("print", "kale_print", 1),
];

/// Tag word of the empty list.
pub const TAG_NIL: i64 = kale_runtime::TAG_NIL as i64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_runtime_func_is_exported_by_the_runtime() {
        let exported: Vec<&str> = kale_runtime::exported_symbols()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        for f in RUNTIME_FUNCS {
            assert!(exported.contains(&f.name), "{} is not exported", f.name);
        }
    }

    #[test]
    fn globals_match_their_primitive_signatures() {
        for g in GLOBALS {
            let f = RUNTIME_FUNCS
                .iter()
                .find(|f| f.name == g.link_name)
                .unwrap_or_else(|| panic!("{} has no runtime function", g.name));
            assert_eq!(f.params.len(), g.arity, "{}", g.name);
            assert!(f.params.iter().all(|w| *w == Word::Value), "{}", g.name);
            assert_eq!(f.returns, &[Word::Value][..], "{}", g.name);
        }
    }
}
