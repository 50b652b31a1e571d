//! Process-wide symbol table.
//!
//! Symbol values carry a pointer to a leaked [`KaleSymbol`]; interning the
//! same name twice yields the same pointer.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::value::KaleValue;

pub struct KaleSymbol {
    name: Box<str>,
}

impl KaleSymbol {
    pub fn name(&self) -> &str {
        &self.name
    }
}

// Addresses of leaked `KaleSymbol`s, keyed by name.
static SYMBOLS: Lazy<Mutex<HashMap<Box<str>, usize>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Intern `name`, returning a symbol value.
pub fn intern(name: &str) -> KaleValue {
    let mut table = SYMBOLS.lock();
    let addr = match table.get(name) {
        Some(&addr) => addr,
        None => {
            let sym = Box::into_raw(Box::new(KaleSymbol { name: name.into() }));
            table.insert(name.into(), sym as usize);
            sym as usize
        }
    };
    KaleValue::from_symbol(addr as *const KaleSymbol)
}

/// The canonical true value, the symbol `t`.
pub fn t() -> KaleValue {
    intern("t")
}

// ═══════════════════════════════════════════════════════════════
// extern "C" API
// ═══════════════════════════════════════════════════════════════

/// Intern the UTF-8 name `ptr[..len]`.
#[no_mangle]
pub extern "C" fn kale_make_symbol(ptr: *const u8, len: i64) -> KaleValue {
    null_check!(ptr, "kale_make_symbol: null name");
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len.max(0) as usize) };
    match std::str::from_utf8(bytes) {
        Ok(name) => intern(name),
        Err(_) => fatal!("kale_make_symbol: name is not valid UTF-8"),
    }
}

// ═══════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_identity() {
        let a = intern("foo");
        let b = intern("foo");
        let c = intern("bar");
        assert_eq!(a.bits(), b.bits());
        assert_ne!(a.bits(), c.bits());
        assert_eq!(a.as_symbol().map(|s| s.name()), Some("foo"));
    }

    #[test]
    fn test_make_symbol_from_bytes() {
        let name = "hello";
        let v = kale_make_symbol(name.as_ptr(), name.len() as i64);
        assert_eq!(v.bits(), intern("hello").bits());
        assert_eq!(format!("{}", v), "hello");
    }
}
