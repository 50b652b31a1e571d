//! S-expression data produced by the reader.
//!
//! The same type doubles as the literal payload of `quote`.

use std::fmt;

use crate::symbol::{Interner, Symbol};

#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Number(f64),
    Symbol(Symbol),
    Pair(Box<Datum>, Box<Datum>),
    /// The empty list. `nil` and `()` both read as this.
    Nil,
}

impl Datum {
    pub fn cons(car: Datum, cdr: Datum) -> Datum {
        Datum::Pair(Box::new(car), Box::new(cdr))
    }

    /// Build a proper list from the given elements.
    pub fn list(items: impl IntoIterator<Item = Datum>) -> Datum {
        let items: Vec<Datum> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Datum::Nil, |tail, head| Datum::cons(head, tail))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Datum::Nil)
    }

    /// Elements of a proper list, or `None` if this is not one.
    pub fn as_list(&self) -> Option<Vec<&Datum>> {
        let mut items = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Datum::Nil => return Some(items),
                Datum::Pair(car, cdr) => {
                    items.push(car.as_ref());
                    cur = cdr;
                }
                _ => return None,
            }
        }
    }

    /// Render with symbol names resolved through `interner`.
    pub fn display<'a>(&'a self, interner: &'a Interner) -> DisplayDatum<'a> {
        DisplayDatum {
            datum: self,
            interner,
        }
    }
}

pub struct DisplayDatum<'a> {
    datum: &'a Datum,
    interner: &'a Interner,
}

impl fmt::Display for DisplayDatum<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.datum {
            Datum::Number(n) => write!(f, "{}", n),
            Datum::Symbol(s) => write!(f, "{}", self.interner.name(*s)),
            Datum::Nil => write!(f, "nil"),
            Datum::Pair(..) => {
                write!(f, "(")?;
                let mut cur = self.datum;
                let mut first = true;
                while let Datum::Pair(car, cdr) = cur {
                    if !first {
                        write!(f, " ")?;
                    }
                    first = false;
                    write!(f, "{}", car.display(self.interner))?;
                    cur = cdr;
                }
                if !cur.is_nil() {
                    write!(f, " . {}", cur.display(self.interner))?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_builds_nil_terminated_chain() {
        let l = Datum::list([Datum::Number(1.0), Datum::Number(2.0)]);
        assert_eq!(
            l,
            Datum::cons(
                Datum::Number(1.0),
                Datum::cons(Datum::Number(2.0), Datum::Nil)
            )
        );
        assert_eq!(l.as_list().map(|v| v.len()), Some(2));
    }

    #[test]
    fn dotted_pair_is_not_a_list() {
        let d = Datum::cons(Datum::Number(1.0), Datum::Number(2.0));
        assert!(d.as_list().is_none());
        let interner = Interner::new();
        assert_eq!(d.display(&interner).to_string(), "(1 . 2)");
    }
}
