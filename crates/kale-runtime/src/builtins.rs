//! Numeric, printing and predicate primitives.

use crate::symbol;
use crate::value::KaleValue;

fn expect_number(v: KaleValue, op: &str) -> f64 {
    match v.as_number() {
        Some(n) => n,
        None => fatal!("{}: expected a number, found {} `{}`", op, v.type_name(), v),
    }
}

fn arith(a: KaleValue, b: KaleValue, op: &str, f: impl Fn(f64, f64) -> f64) -> KaleValue {
    KaleValue::from_number(f(expect_number(a, op), expect_number(b, op)))
}

#[no_mangle]
pub extern "C" fn kale_make_number(n: f64) -> KaleValue {
    KaleValue::from_number(n)
}

/// 1 when `v` is the empty list, else 0. Everything else, `0` included, is
/// true.
#[no_mangle]
pub extern "C" fn kale_is_nil(v: KaleValue) -> i8 {
    v.is_nil() as i8
}

#[no_mangle]
pub extern "C" fn kale_add(a: KaleValue, b: KaleValue) -> KaleValue {
    arith(a, b, "add", |x, y| x + y)
}

#[no_mangle]
pub extern "C" fn kale_sub(a: KaleValue, b: KaleValue) -> KaleValue {
    arith(a, b, "sub", |x, y| x - y)
}

#[no_mangle]
pub extern "C" fn kale_mul(a: KaleValue, b: KaleValue) -> KaleValue {
    arith(a, b, "mul", |x, y| x * y)
}

#[no_mangle]
pub extern "C" fn kale_div(a: KaleValue, b: KaleValue) -> KaleValue {
    arith(a, b, "div", |x, y| x / y)
}

/// Print `v` on its own line and return it.
#[no_mangle]
pub extern "C" fn kale_print(v: KaleValue) -> KaleValue {
    println!("{}", v);
    v
}

/// `t` when the two values are structurally equal, else nil.
#[no_mangle]
pub extern "C" fn kale_equal(a: KaleValue, b: KaleValue) -> KaleValue {
    if a.equal(&b) {
        symbol::t()
    } else {
        KaleValue::nil()
    }
}

// ═══════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::kale_cons;

    fn num(n: f64) -> KaleValue {
        kale_make_number(n)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(kale_add(num(2.0), num(3.0)).as_number(), Some(5.0));
        assert_eq!(kale_sub(num(2.0), num(3.0)).as_number(), Some(-1.0));
        assert_eq!(kale_mul(num(2.0), num(3.0)).as_number(), Some(6.0));
        assert_eq!(kale_div(num(3.0), num(2.0)).as_number(), Some(1.5));
    }

    #[test]
    fn test_only_nil_is_false() {
        assert_eq!(kale_is_nil(KaleValue::nil()), 1);
        assert_eq!(kale_is_nil(num(0.0)), 0);
        assert_eq!(kale_is_nil(kale_cons(KaleValue::nil(), KaleValue::nil())), 0);
    }

    #[test]
    fn test_equal_returns_t_or_nil() {
        let a = kale_cons(num(1.0), KaleValue::nil());
        let b = kale_cons(num(1.0), KaleValue::nil());
        assert_eq!(format!("{}", kale_equal(a, b)), "t");
        assert!(kale_equal(a, num(1.0)).is_nil());
    }

    #[test]
    fn test_print_returns_argument() {
        let v = num(7.0);
        assert_eq!(kale_print(v).as_number(), Some(7.0));
    }
}
