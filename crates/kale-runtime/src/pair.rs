//! Cons cells.

use crate::value::KaleValue;

#[repr(C)]
pub struct KalePair {
    pub car: KaleValue,
    pub cdr: KaleValue,
}

impl KalePair {
    pub fn alloc(car: KaleValue, cdr: KaleValue) -> *mut KalePair {
        Box::into_raw(Box::new(KalePair { car, cdr }))
    }
}

fn expect_pair(v: KaleValue, op: &str) -> &'static KalePair {
    match v.as_pair() {
        Some(p) => p,
        None => fatal!("{}: expected a pair, found {} `{}`", op, v.type_name(), v),
    }
}

// ═══════════════════════════════════════════════════════════════
// extern "C" API
// ═══════════════════════════════════════════════════════════════

#[no_mangle]
pub extern "C" fn kale_cons(car: KaleValue, cdr: KaleValue) -> KaleValue {
    KaleValue::from_pair(KalePair::alloc(car, cdr))
}

#[no_mangle]
pub extern "C" fn kale_car(v: KaleValue) -> KaleValue {
    expect_pair(v, "car").car
}

#[no_mangle]
pub extern "C" fn kale_cdr(v: KaleValue) -> KaleValue {
    expect_pair(v, "cdr").cdr
}
