//! Kale Runtime Library
//!
//! Runtime support for kale programs compiled by `kale-codegen`, both when
//! they are JIT-compiled in-process and when an emitted object file is linked
//! against the `staticlib` build of this crate.
//!
//! # Value Representation
//!
//! Every kale value is a [`KaleValue`]: a 16-byte tagged union. Generated
//! code passes it around as two `i64` words `(tag, data)`, which matches the
//! C calling convention for a `repr(C)` struct of that shape.
//!
//! # Memory
//!
//! Pairs, closures and symbol names are allocated with `Box::into_raw` and
//! never freed. Symbols are interned process-wide, so two symbol values are
//! equal exactly when their payload pointers are.

// Every `extern "C" fn` here receives raw pointers from generated code and
// checks them with `fatal!`/`null_check!` before dereferencing.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

/// Print `fatal: ...` and abort. Generated code calls into this crate through
/// the C ABI, so unwinding out of it is never allowed.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        eprintln!("fatal: {}", format_args!($($arg)*));
        std::process::abort()
    }};
}

/// Null-pointer check for `extern "C"` functions.
#[macro_export]
macro_rules! null_check {
    ($ptr:expr, $msg:literal) => {
        if $ptr.is_null() {
            $crate::fatal!($msg);
        }
    };
}

pub mod builtins;
pub mod closure;
pub mod pair;
pub mod symbol;
pub mod value;

pub use closure::KaleClosure;
pub use pair::KalePair;
pub use symbol::KaleSymbol;
pub use value::{KaleValue, KaleValueData};

pub use value::{TAG_CLOSURE, TAG_NIL, TAG_NUMBER, TAG_PAIR, TAG_SYMBOL};

/// Link name and address of every primitive generated code may import.
///
/// A JIT registers these with its symbol resolver; object files resolve the
/// same names against the static library at link time.
pub fn exported_symbols() -> Vec<(&'static str, *const u8)> {
    vec![
        ("kale_make_number", builtins::kale_make_number as *const u8),
        ("kale_make_symbol", symbol::kale_make_symbol as *const u8),
        ("kale_is_nil", builtins::kale_is_nil as *const u8),
        ("kale_add", builtins::kale_add as *const u8),
        ("kale_sub", builtins::kale_sub as *const u8),
        ("kale_mul", builtins::kale_mul as *const u8),
        ("kale_div", builtins::kale_div as *const u8),
        ("kale_print", builtins::kale_print as *const u8),
        ("kale_equal", builtins::kale_equal as *const u8),
        ("kale_cons", pair::kale_cons as *const u8),
        ("kale_car", pair::kale_car as *const u8),
        ("kale_cdr", pair::kale_cdr as *const u8),
        ("kale_make_closure", closure::kale_make_closure as *const u8),
        ("kale_closure_code", closure::kale_closure_code as *const u8),
        ("kale_closure_env", closure::kale_closure_env as *const u8),
        ("kale_env_slot", closure::kale_env_slot as *const u8),
    ]
}
