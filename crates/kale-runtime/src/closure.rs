//! Closure type.
//!
//! A closure pairs a code pointer with a copy of the values it captured at
//! creation time. The code behind `code` takes the environment pointer as its
//! first argument, followed by `arity` values.

use crate::value::KaleValue;

// ═══════════════════════════════════════════════════════════════
// KaleClosure
// ═══════════════════════════════════════════════════════════════

#[repr(C)]
pub struct KaleClosure {
    /// Pointer to the compiled routine.
    pub code: *const u8,
    /// Captured values, in slot order.
    pub env: Box<[KaleValue]>,
    /// Number of parameters the routine accepts, not counting the environment.
    pub arity: u32,
}

// Safety: code is an immutable code pointer and env is never mutated after
// construction.
unsafe impl Send for KaleClosure {}
unsafe impl Sync for KaleClosure {}

impl KaleClosure {
    pub fn alloc(code: *const u8, env: Box<[KaleValue]>, arity: u32) -> *mut KaleClosure {
        Box::into_raw(Box::new(KaleClosure { code, env, arity }))
    }
}

fn expect_closure(v: KaleValue, op: &str) -> &'static KaleClosure {
    match v.as_closure() {
        Some(c) => c,
        None => fatal!("{}: cannot call {} `{}`", op, v.type_name(), v),
    }
}

// ═══════════════════════════════════════════════════════════════
// extern "C" API
// ═══════════════════════════════════════════════════════════════

/// Build a closure, copying `count` values out of the caller's `env` array.
#[no_mangle]
pub extern "C" fn kale_make_closure(
    code: *const u8,
    env: *const KaleValue,
    count: i64,
    arity: i64,
) -> KaleValue {
    null_check!(code, "kale_make_closure: null code pointer");
    let captured: Box<[KaleValue]> = if count <= 0 {
        Box::new([])
    } else {
        null_check!(env, "kale_make_closure: null environment");
        unsafe { std::slice::from_raw_parts(env, count as usize) }.into()
    };
    KaleValue::from_closure(KaleClosure::alloc(code, captured, arity as u32))
}

/// Entry point of `closure`, aborting unless it takes exactly `arity`
/// arguments.
#[no_mangle]
pub extern "C" fn kale_closure_code(closure: KaleValue, arity: i64) -> *const u8 {
    let c = expect_closure(closure, "kale_closure_code");
    if c.arity as i64 != arity {
        fatal!(
            "closure expects {} argument(s), called with {}",
            c.arity,
            arity
        );
    }
    c.code
}

#[no_mangle]
pub extern "C" fn kale_closure_env(closure: KaleValue) -> *const KaleValue {
    expect_closure(closure, "kale_closure_env").env.as_ptr()
}

/// Read slot `index` of an environment returned by [`kale_closure_env`].
#[no_mangle]
pub extern "C" fn kale_env_slot(env: *const KaleValue, index: i64) -> KaleValue {
    null_check!(env, "kale_env_slot: null environment");
    unsafe { *env.add(index as usize) }
}

// ═══════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_closure_copies_env() {
        let mut env = [KaleValue::from_number(1.0), KaleValue::from_number(2.0)];
        let c = kale_make_closure(0x1234 as *const u8, env.as_ptr(), 2, 1);
        env[0] = KaleValue::nil();

        let slots = kale_closure_env(c);
        assert_eq!(kale_env_slot(slots, 0).as_number(), Some(1.0));
        assert_eq!(kale_env_slot(slots, 1).as_number(), Some(2.0));
    }

    #[test]
    fn test_closure_code_with_matching_arity() {
        let c = kale_make_closure(0xABCD as *const u8, std::ptr::null(), 0, 3);
        assert_eq!(kale_closure_code(c, 3), 0xABCD as *const u8);
        assert_eq!(format!("{}", c), "#<closure/3>");
    }
}
