//! Tagged union `KaleValue`.
//!
//! Layout: 16 bytes, an 8-byte tag slot (u8 tag + padding) followed by an
//! 8-byte payload.

use std::fmt;

use crate::closure::KaleClosure;
use crate::pair::KalePair;
use crate::symbol::KaleSymbol;

// ═══════════════════════════════════════════════════════════════
// Tag constants
// ═══════════════════════════════════════════════════════════════

pub const TAG_NIL: u8 = 0;
pub const TAG_NUMBER: u8 = 1;
pub const TAG_SYMBOL: u8 = 2;
pub const TAG_PAIR: u8 = 3;
pub const TAG_CLOSURE: u8 = 4;

// ═══════════════════════════════════════════════════════════════
// KaleValue
// ═══════════════════════════════════════════════════════════════

#[repr(C)]
#[derive(Copy, Clone)]
pub union KaleValueData {
    pub number: f64,
    pub symbol_ptr: *const KaleSymbol,
    pub pair_ptr: *mut KalePair,
    pub closure_ptr: *mut KaleClosure,
    pub _raw: u64,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct KaleValue {
    pub tag: u8,
    _pad: [u8; 7],
    pub data: KaleValueData,
}

// Safety: payload pointers refer to leaked, immutable-after-construction
// objects.
unsafe impl Send for KaleValue {}
unsafe impl Sync for KaleValue {}

impl KaleValue {
    fn with(tag: u8, data: KaleValueData) -> Self {
        KaleValue {
            tag,
            _pad: [0; 7],
            data,
        }
    }

    pub fn nil() -> Self {
        Self::with(TAG_NIL, KaleValueData { _raw: 0 })
    }

    pub fn from_number(n: f64) -> Self {
        Self::with(TAG_NUMBER, KaleValueData { number: n })
    }

    pub fn from_symbol(p: *const KaleSymbol) -> Self {
        Self::with(TAG_SYMBOL, KaleValueData { symbol_ptr: p })
    }

    pub fn from_pair(p: *mut KalePair) -> Self {
        Self::with(TAG_PAIR, KaleValueData { pair_ptr: p })
    }

    pub fn from_closure(p: *mut KaleClosure) -> Self {
        Self::with(TAG_CLOSURE, KaleValueData { closure_ptr: p })
    }

    pub fn is_nil(&self) -> bool {
        self.tag == TAG_NIL
    }

    pub fn as_number(&self) -> Option<f64> {
        (self.tag == TAG_NUMBER).then(|| unsafe { self.data.number })
    }

    pub fn as_symbol(&self) -> Option<&'static KaleSymbol> {
        if self.tag != TAG_SYMBOL {
            return None;
        }
        unsafe { self.data.symbol_ptr.as_ref() }
    }

    pub fn as_pair(&self) -> Option<&'static KalePair> {
        if self.tag != TAG_PAIR {
            return None;
        }
        unsafe { self.data.pair_ptr.as_ref() }
    }

    pub fn as_closure(&self) -> Option<&'static KaleClosure> {
        if self.tag != TAG_CLOSURE {
            return None;
        }
        unsafe { self.data.closure_ptr.as_ref() }
    }

    /// Raw payload word, as generated code sees it.
    pub fn bits(&self) -> u64 {
        unsafe { self.data._raw }
    }

    /// Structural equality: numbers by value, symbols and closures by
    /// identity, pairs element-wise.
    pub fn equal(&self, other: &KaleValue) -> bool {
        if self.tag != other.tag {
            return false;
        }
        match (self.as_pair(), other.as_pair()) {
            (Some(a), Some(b)) => a.car.equal(&b.car) && a.cdr.equal(&b.cdr),
            _ => match self.tag {
                TAG_NIL => true,
                TAG_NUMBER => self.as_number() == other.as_number(),
                _ => self.bits() == other.bits(),
            },
        }
    }

    /// Type name as a string slice.
    pub fn type_name(&self) -> &'static str {
        match self.tag {
            TAG_NIL => "nil",
            TAG_NUMBER => "number",
            TAG_SYMBOL => "symbol",
            TAG_PAIR => "pair",
            TAG_CLOSURE => "closure",
            _ => "unknown",
        }
    }
}

impl fmt::Display for KaleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.as_number() {
            return write!(f, "{}", n);
        }
        if let Some(s) = self.as_symbol() {
            return write!(f, "{}", s.name());
        }
        if let Some(c) = self.as_closure() {
            return write!(f, "#<closure/{}>", c.arity);
        }
        let Some(mut pair) = self.as_pair() else {
            return match self.tag {
                TAG_NIL => write!(f, "nil"),
                _ => write!(f, "#<unknown>"),
            };
        };
        write!(f, "(")?;
        loop {
            write!(f, "{}", pair.car)?;
            match pair.cdr.as_pair() {
                Some(next) => {
                    write!(f, " ")?;
                    pair = next;
                }
                None if pair.cdr.is_nil() => break,
                None => {
                    write!(f, " . {}", pair.cdr)?;
                    break;
                }
            }
        }
        write!(f, ")")
    }
}

impl fmt::Debug for KaleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KaleValue(tag={}, {})", self.tag, self)
    }
}

impl Default for KaleValue {
    fn default() -> Self {
        Self::nil()
    }
}

impl PartialEq for KaleValue {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

// ═══════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::kale_cons;
    use crate::symbol::intern;
    use pretty_assertions::assert_eq;

    fn list(items: &[KaleValue]) -> KaleValue {
        items
            .iter()
            .rev()
            .fold(KaleValue::nil(), |tail, &head| kale_cons(head, tail))
    }

    #[test]
    fn test_size() {
        assert_eq!(std::mem::size_of::<KaleValue>(), 16);
        assert_eq!(std::mem::align_of::<KaleValue>(), 8);
    }

    #[test]
    fn test_nil() {
        let v = KaleValue::nil();
        assert!(v.is_nil());
        assert_eq!(v.bits(), 0);
        assert_eq!(format!("{}", v), "nil");
    }

    #[test]
    fn test_numbers_print_without_trailing_zero() {
        assert_eq!(format!("{}", KaleValue::from_number(3.0)), "3");
        assert_eq!(format!("{}", KaleValue::from_number(-1.5)), "-1.5");
        assert_eq!(format!("{}", KaleValue::from_number(0.25)), "0.25");
    }

    #[test]
    fn test_list_display() {
        let one = KaleValue::from_number(1.0);
        let two = KaleValue::from_number(2.0);
        assert_eq!(format!("{}", list(&[one, intern("a"), two])), "(1 a 2)");
        assert_eq!(format!("{}", kale_cons(one, two)), "(1 . 2)");
        assert_eq!(format!("{}", list(&[list(&[one]), two])), "((1) 2)");
    }

    #[test]
    fn test_structural_equality() {
        let a = list(&[KaleValue::from_number(1.0), intern("x")]);
        let b = list(&[KaleValue::from_number(1.0), intern("x")]);
        assert_eq!(a, b);
        assert_ne!(a, list(&[KaleValue::from_number(1.0)]));
        assert_ne!(KaleValue::from_number(0.0), KaleValue::nil());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(KaleValue::nil().type_name(), "nil");
        assert_eq!(KaleValue::from_number(1.0).type_name(), "number");
        assert_eq!(intern("s").type_name(), "symbol");
    }
}
